//! Directory commands.

use anyhow::Result;
use cross_storage::{SearchScope, StorageProvider};

/// List keys under `root` matching `pattern`.
pub async fn run_ls(
    storage: &dyn StorageProvider,
    root: &str,
    pattern: &str,
    recursive: bool,
) -> Result<()> {
    let scope = if recursive {
        SearchScope::AllLevels
    } else {
        SearchScope::TopLevelOnly
    };

    let keys = storage.list_paths(root, pattern, scope).await?;
    for key in &keys {
        println!("{}", key);
    }
    tracing::debug!(root, pattern, count = keys.len(), "Listed paths");
    Ok(())
}

/// List direct children of `path` whose file name matches `mask`.
pub async fn run_mask(storage: &dyn StorageProvider, path: &str, mask: &str) -> Result<()> {
    for key in storage.files_by_mask(path, mask).await? {
        println!("{}", key);
    }
    Ok(())
}

pub async fn run_mkdir(storage: &dyn StorageProvider, path: &str) -> Result<()> {
    storage.create_directory(path).await?;
    println!("Created {}", path);
    Ok(())
}

pub async fn run_rmdir(storage: &dyn StorageProvider, path: &str, recursive: bool) -> Result<()> {
    storage.delete_directory(path, recursive).await?;
    if recursive {
        println!("Deleted {} and everything below it", path);
    } else {
        println!("Deleted files in {}", path);
    }
    Ok(())
}
