//! Contract tests run against every backend.
//!
//! The S3 backend runs over `object_store`'s in-memory store and the blob
//! backend over `InMemoryBlobContainer`, both with tiny listing pages so every
//! listing crosses several pages.

use cross_storage::{
    BlobContainerProvider, Bytes, InMemoryBlobContainer, ObjectStorageProvider, SearchScope,
    SizeUnit, StorageError, StorageProvider,
};
use object_store::memory::InMemory;
use std::collections::HashSet;
use std::sync::Arc;
use tempfile::TempDir;

struct Backend {
    storage: Arc<dyn StorageProvider>,
    _temp: Option<TempDir>,
}

async fn backends() -> Vec<Backend> {
    let temp = TempDir::new().unwrap();
    let local = cross_storage::LocalFileSystemProvider::new(temp.path()).unwrap();

    let s3 = ObjectStorageProvider::from_store(Arc::new(InMemory::new()), "memory://contract")
        .with_page_size(2);

    let container = Arc::new(InMemoryBlobContainer::new("contract").with_page_size(2));
    let blob = BlobContainerProvider::new(container).await.unwrap();

    vec![
        Backend {
            storage: Arc::new(local),
            _temp: Some(temp),
        },
        Backend {
            storage: Arc::new(s3),
            _temp: None,
        },
        Backend {
            storage: Arc::new(blob),
            _temp: None,
        },
    ]
}

#[tokio::test]
async fn test_round_trip() {
    for backend in backends().await {
        let storage = &backend.storage;
        let name = storage.backend_name();

        storage.write("notes/a.txt", "plain text").await.unwrap();
        assert_eq!(storage.read("notes/a.txt").await.unwrap(), "plain text", "{}", name);

        let data = Bytes::from_static(&[0, 1, 2, 254, 255]);
        storage.write_binary("notes/b.bin", data.clone()).await.unwrap();
        assert_eq!(storage.read_binary("notes/b.bin").await.unwrap(), data, "{}", name);
    }
}

#[tokio::test]
async fn test_missing_key_is_not_found() {
    for backend in backends().await {
        let storage = &backend.storage;
        let name = storage.backend_name();

        assert!(!storage.exists("nope.txt").await.unwrap(), "{}", name);
        assert!(
            matches!(storage.read("nope.txt").await, Err(StorageError::NotFound(_))),
            "{}",
            name
        );
        assert!(
            matches!(storage.open_read_stream("nope.txt").await, Err(StorageError::NotFound(_))),
            "{}",
            name
        );
        assert!(
            storage.size("nope.txt").await.unwrap_err().is_not_found(),
            "{}",
            name
        );
    }
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    for backend in backends().await {
        let storage = &backend.storage;

        storage.write("gone.txt", "x").await.unwrap();
        storage.delete("gone.txt").await.unwrap();
        storage.delete("gone.txt").await.unwrap();
        assert!(!storage.exists("gone.txt").await.unwrap(), "{}", storage.backend_name());
    }
}

#[tokio::test]
async fn test_overwrite_replaces_content() {
    for backend in backends().await {
        let storage = &backend.storage;

        storage.write("over.txt", "a much longer first version").await.unwrap();
        storage.write("over.txt", "short").await.unwrap();
        assert_eq!(storage.read("over.txt").await.unwrap(), "short", "{}", storage.backend_name());
    }
}

#[tokio::test]
async fn test_move_keeps_source_when_copy_fails() {
    for backend in backends().await {
        let storage = &backend.storage;
        let name = storage.backend_name();

        storage.write("m/src.txt", "payload").await.unwrap();
        storage.move_file("m/src.txt", "m/dst.txt").await.unwrap();
        assert!(!storage.exists("m/src.txt").await.unwrap(), "{}", name);
        assert_eq!(storage.read("m/dst.txt").await.unwrap(), "payload", "{}", name);

        let result = storage.move_file("m/absent.txt", "m/other.txt").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))), "{}", name);
        assert!(!storage.exists("m/other.txt").await.unwrap(), "{}", name);
        assert!(storage.exists("m/dst.txt").await.unwrap(), "{}", name);
    }
}

#[tokio::test]
async fn test_prefix_deletion() {
    for backend in backends().await {
        let storage = &backend.storage;
        let name = storage.backend_name();

        for key in ["a/1.txt", "a/2.txt", "b/1.txt"] {
            storage.write(key, "data").await.unwrap();
        }

        assert_eq!(storage.delete_by_prefix(None).await.unwrap(), 0, "{}", name);
        assert_eq!(storage.delete_by_prefix(Some("a/")).await.unwrap(), 2, "{}", name);
        assert_eq!(storage.search("").await.unwrap(), vec!["b/1.txt".to_string()], "{}", name);
    }
}

#[tokio::test]
async fn test_depth_scoped_listing() {
    for backend in backends().await {
        let storage = &backend.storage;
        let name = storage.backend_name();

        storage.write("root/x.txt", "x").await.unwrap();
        storage.write("root/sub/y.txt", "y").await.unwrap();

        let top = storage
            .list_paths("root", "*", SearchScope::TopLevelOnly)
            .await
            .unwrap();
        assert_eq!(top, vec!["root/x.txt".to_string()], "{}", name);

        let all = storage
            .list_paths(r"root\", "*", SearchScope::AllLevels)
            .await
            .unwrap();
        assert_eq!(
            all,
            vec!["root/sub/y.txt".to_string(), "root/x.txt".to_string()],
            "{}",
            name
        );
    }
}

#[tokio::test]
async fn test_listing_drains_every_page() {
    for backend in backends().await {
        let storage = &backend.storage;
        let name = storage.backend_name();

        let mut expected = Vec::new();
        for i in 0..11 {
            let key = format!("many/{:02}.dat", i);
            storage.write(&key, "x").await.unwrap();
            expected.push(key);
        }

        assert_eq!(storage.search("many/").await.unwrap(), expected, "{}", name);

        let keep: HashSet<String> = [expected[0].clone()].into_iter().collect();
        assert_eq!(storage.delete_all_except("many", &keep).await.unwrap(), 10, "{}", name);
        assert_eq!(storage.search("many/").await.unwrap(), vec![expected[0].clone()], "{}", name);
    }
}

#[tokio::test]
async fn test_directory_deletes() {
    for backend in backends().await {
        let storage = &backend.storage;
        let name = storage.backend_name();

        storage.create_directory("tree").await.unwrap();
        for key in ["tree/a.txt", "tree/b.txt", "tree/sub/c.txt", "treehouse/d.txt"] {
            storage.write(key, "data").await.unwrap();
        }

        storage.delete_directory("tree", false).await.unwrap();
        assert_eq!(
            storage.search("tree").await.unwrap(),
            vec!["tree/sub/c.txt".to_string(), "treehouse/d.txt".to_string()],
            "{}",
            name
        );

        storage.delete_directory("tree", true).await.unwrap();
        assert_eq!(
            storage.search("tree").await.unwrap(),
            vec!["treehouse/d.txt".to_string()],
            "{}",
            name
        );
    }
}

#[tokio::test]
async fn test_file_size_formatting() {
    for backend in backends().await {
        let storage = &backend.storage;

        storage
            .write_binary("sized.bin", Bytes::from(vec![0u8; 2048]))
            .await
            .unwrap();
        assert_eq!(
            storage.file_size("sized.bin", SizeUnit::Kb).await.unwrap(),
            "2.00",
            "{}",
            storage.backend_name()
        );
    }
}

#[tokio::test]
async fn test_pattern_listing() {
    for backend in backends().await {
        let storage = &backend.storage;
        let name = storage.backend_name();

        for key in ["img/a.jpg", "img/b.png", "img/c.gif"] {
            storage.write(key, "px").await.unwrap();
        }

        let images = storage
            .list_paths("img", "*.jpg|*.png", SearchScope::TopLevelOnly)
            .await
            .unwrap();
        assert_eq!(images, vec!["img/a.jpg".to_string(), "img/b.png".to_string()], "{}", name);
    }
}

#[tokio::test]
async fn test_files_by_mask() {
    for backend in backends().await {
        let storage = &backend.storage;
        let name = storage.backend_name();

        for key in ["reports/q1.csv", "reports/q2.csv", "reports/notes.txt", "reports/2023/q4.csv"] {
            storage.write(key, "rows").await.unwrap();
        }

        let found = storage.files_by_mask("reports", r"^q\d\.csv$").await.unwrap();
        assert_eq!(
            found,
            vec!["reports/q1.csv".to_string(), "reports/q2.csv".to_string()],
            "{}",
            name
        );
        assert_eq!(storage.canonical_key(r".\reports\q1.csv"), "reports/q1.csv", "{}", name);
    }
}

#[tokio::test]
async fn test_double_close() {
    for backend in backends().await {
        let storage = &backend.storage;

        storage.close().await.unwrap();
        storage.close().await.unwrap();
        assert!(
            matches!(storage.read("a.txt").await, Err(StorageError::Closed)),
            "{}",
            storage.backend_name()
        );
    }
}
