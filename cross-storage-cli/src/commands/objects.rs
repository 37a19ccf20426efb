//! Single-object commands.

use anyhow::{bail, Context, Result};
use cross_storage::{Bytes, ByteStream, SizeUnit, StorageError, StorageProvider};
use futures::{StreamExt, TryStreamExt};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

/// Upload a local file or literal text.
pub async fn run_put(
    storage: &dyn StorageProvider,
    key: &str,
    file: Option<PathBuf>,
    text: Option<String>,
    content_type: Option<&str>,
) -> Result<()> {
    match (file, text) {
        (Some(path), _) => {
            let handle = tokio::fs::File::open(&path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?;
            let content: ByteStream = ReaderStream::new(handle)
                .map_err(StorageError::from)
                .boxed();
            storage.write_stream(key, content, content_type).await?;
            println!("Uploaded {} -> {}", path.display(), key);
        }
        (None, Some(text)) => {
            storage
                .write_object(key, Bytes::from(text), content_type)
                .await?;
            println!("Wrote {}", key);
        }
        (None, None) => bail!("put needs --file or --text"),
    }
    Ok(())
}

/// Download a key to stdout or a file.
pub async fn run_get(storage: &dyn StorageProvider, key: &str, output: Option<PathBuf>) -> Result<()> {
    let mut content = storage.open_read_stream(key).await?;

    match output {
        Some(path) => {
            let mut file = tokio::fs::File::create(&path)
                .await
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut total = 0usize;
            while let Some(chunk) = content.try_next().await? {
                total += chunk.len();
                file.write_all(&chunk).await?;
            }
            file.flush().await?;
            println!("Downloaded {} bytes -> {}", total, path.display());
        }
        None => {
            let mut stdout = tokio::io::stdout();
            while let Some(chunk) = content.try_next().await? {
                stdout.write_all(&chunk).await?;
            }
            stdout.flush().await?;
        }
    }
    Ok(())
}

pub async fn run_rm(storage: &dyn StorageProvider, key: &str) -> Result<()> {
    storage.delete(key).await?;
    println!("Deleted {}", key);
    Ok(())
}

pub async fn run_rm_prefix(storage: &dyn StorageProvider, prefix: &str) -> Result<()> {
    let deleted = storage.delete_by_prefix(Some(prefix)).await?;
    println!("Deleted {} objects with prefix '{}'", deleted, prefix);
    Ok(())
}

pub async fn run_cp(storage: &dyn StorageProvider, from: &str, to: &str) -> Result<()> {
    storage.copy(from, to).await?;
    println!("Copied {} -> {}", from, to);
    Ok(())
}

pub async fn run_mv(storage: &dyn StorageProvider, from: &str, to: &str) -> Result<()> {
    storage.move_file(from, to).await?;
    println!("Moved {} -> {}", from, to);
    Ok(())
}

pub async fn run_size(storage: &dyn StorageProvider, key: &str, unit: SizeUnit) -> Result<()> {
    let size = storage.file_size(key, unit).await?;
    println!("{} {}", size, unit);
    Ok(())
}

/// Print the base URL, or a share link when a key is given.
pub async fn run_url(storage: &dyn StorageProvider, key: Option<&str>) -> Result<()> {
    match key {
        Some(key) => match storage.uri(key).await {
            Ok(uri) => println!("{}", uri),
            Err(e) if e.is_unsupported() => {
                bail!("{} storage cannot issue share links", storage.backend_name())
            }
            Err(e) => return Err(e.into()),
        },
        None => println!("{}", storage.base_url().await?),
    }
    Ok(())
}

pub async fn run_search(storage: &dyn StorageProvider, prefix: &str) -> Result<()> {
    let keys = storage.search(prefix).await?;
    for key in &keys {
        println!("{}", key);
    }
    println!("{} keys", keys.len());
    Ok(())
}

pub async fn run_undelete(storage: &dyn StorageProvider, key: &str) -> Result<()> {
    storage.undelete(key).await?;
    println!("Restored {}", key);
    Ok(())
}
