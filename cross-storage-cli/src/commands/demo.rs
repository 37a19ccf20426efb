//! Demo command: exercises every provider operation once, printing results.

use anyhow::{Context, Result};
use cross_storage::{
    bytes_stream, collect_stream, Bytes, SearchScope, SizeUnit, StorageProvider,
};
use std::collections::HashSet;
use std::path::PathBuf;

const MAIN_FILE: &str = "test1.txt";
const BINARY_COPY: &str = "test2.txt";
const DESTINATION_FILE: &str = "test3.txt";
const MOVED_FILE: &str = "sometest4.txt";
const TARGET_IMAGE: &str = "placeholder.png";
const TEST_DATA: &str = "test data";

/// Run the demo sequence against `storage`.
pub async fn run_demo(storage: &dyn StorageProvider, sample: Option<PathBuf>) -> Result<()> {
    println!("Backend: {}", storage.backend_name());
    println!("Base URL: {}", storage.base_url().await?);

    storage.write(MAIN_FILE, TEST_DATA).await?;
    println!("write: {}", TEST_DATA);

    println!("read: {}", storage.read(MAIN_FILE).await?);

    let binary = storage.read_binary(MAIN_FILE).await?;
    let rendered: Vec<String> = binary.iter().map(|b| b.to_string()).collect();
    println!("read_binary: {}", rendered.join(","));
    storage.write_binary(BINARY_COPY, binary).await?;

    let image = match &sample {
        Some(path) => Bytes::from(
            tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read sample {}", path.display()))?,
        ),
        None => Bytes::from(vec![0x89u8; 4096]),
    };
    storage
        .write_stream(TARGET_IMAGE, bytes_stream(image), Some("image/png"))
        .await?;

    let streamed = collect_stream(storage.open_read_stream(TARGET_IMAGE).await?).await?;
    println!("open_read_stream: {} bytes", streamed.len());

    for unit in [SizeUnit::Byte, SizeUnit::Kb, SizeUnit::Tb] {
        println!("file_size ({}): {}", unit, storage.file_size(TARGET_IMAGE, unit).await?);
    }

    storage.copy(BINARY_COPY, DESTINATION_FILE).await?;
    storage.move_file(DESTINATION_FILE, MOVED_FILE).await?;
    println!(
        "exists {}: {}, exists {}: {}",
        MOVED_FILE,
        storage.exists(MOVED_FILE).await?,
        DESTINATION_FILE,
        storage.exists(DESTINATION_FILE).await?
    );

    let found = storage.search("test").await?;
    println!("search: {}", found.len());
    for key in &found {
        println!("  {}", key);
    }

    let paths = storage.list_paths("./", "*", SearchScope::AllLevels).await?;
    println!("list_paths: {}", paths.len());
    for key in &paths {
        println!("  {}", key);
    }

    let masked = storage.files_by_mask("./", r"^test\d\.txt$").await?;
    println!("files_by_mask: {}", masked.len());

    let deleted = storage.delete_by_prefix(Some("some")).await?;
    println!("delete_by_prefix: {} deleted", deleted);

    storage.delete(DESTINATION_FILE).await?;

    let keep: HashSet<String> = [TARGET_IMAGE.to_string()].into_iter().collect();
    let deleted = storage.delete_all_except("./", &keep).await?;
    println!("delete_all_except: {} deleted", deleted);

    match storage.uri(TARGET_IMAGE).await {
        Ok(uri) => println!("uri: {}", uri),
        Err(e) if e.is_unsupported() => println!("uri: not available ({})", e),
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
