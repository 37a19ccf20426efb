//! Core storage trait definitions.
//!
//! The `StorageProvider` trait is the single contract shared by the local
//! filesystem, S3 and blob container backends. Callers hold one provider for
//! the lifetime of the process and never learn which backend is active.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::{Result, StorageError};
use crate::path::{file_name, normalize_key};

/// Owned stream of object content.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Lifetime of signed share links issued by `uri`.
pub const SIGNED_URL_EXPIRY: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Maximum number of backend deletes in flight during bulk deletes.
pub const DELETE_CONCURRENCY: usize = 16;

/// Depth filter for path listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SearchScope {
    /// Only direct children of the listed directory
    TopLevelOnly,
    /// The whole subtree
    #[default]
    AllLevels,
}

/// Unit used to display object sizes.
///
/// Each step scales the byte count by another factor of 1024.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SizeUnit {
    Byte = 0,
    Kb = 1,
    Mb = 2,
    Gb = 3,
    Tb = 4,
    Pb = 5,
    Eb = 6,
}

impl SizeUnit {
    /// Format a byte count in this unit with exactly two decimals.
    ///
    /// Ties round away from zero, so 1152 bytes is `1.13` kb.
    pub fn format(self, bytes: u64) -> String {
        let scaled = bytes as f64 / 1024f64.powi(self as i32);
        format!("{:.2}", (scaled * 100.0).round() / 100.0)
    }
}

impl fmt::Display for SizeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SizeUnit::Byte => "byte",
            SizeUnit::Kb => "kb",
            SizeUnit::Mb => "mb",
            SizeUnit::Gb => "gb",
            SizeUnit::Tb => "tb",
            SizeUnit::Pb => "pb",
            SizeUnit::Eb => "eb",
        };
        f.write_str(name)
    }
}

impl FromStr for SizeUnit {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "b" | "byte" | "bytes" => Ok(SizeUnit::Byte),
            "kb" => Ok(SizeUnit::Kb),
            "mb" => Ok(SizeUnit::Mb),
            "gb" => Ok(SizeUnit::Gb),
            "tb" => Ok(SizeUnit::Tb),
            "pb" => Ok(SizeUnit::Pb),
            "eb" => Ok(SizeUnit::Eb),
            other => Err(format!("unknown size unit '{}'", other)),
        }
    }
}

/// Uniform file storage contract.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Operations are not serialized
/// against each other: concurrent writes to one key are last-writer-wins.
///
/// # Error Handling
///
/// Reads fail with `StorageError::NotFound` for absent keys. Operations the
/// active backend cannot perform fail with `StorageError::Unsupported`.
/// Backend failures propagate untouched; nothing is retried here.
///
/// # Cancellation
///
/// Bulk operations check the provider's cancellation token between listing
/// pages and between deletes. Work already done stays done.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Read an object as UTF-8 text.
    async fn read(&self, key: &str) -> Result<String> {
        let data = self.read_binary(key).await?;
        String::from_utf8(data.to_vec()).map_err(|e| {
            StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("{} is not valid UTF-8: {}", key, e),
            ))
        })
    }

    /// Read an object's bytes.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the key does not exist.
    async fn read_binary(&self, key: &str) -> Result<Bytes>;

    /// Open an owned stream over an object's content.
    async fn open_read_stream(&self, key: &str) -> Result<ByteStream> {
        let data = self.read_binary(key).await?;
        Ok(bytes_stream(data))
    }

    /// Write UTF-8 text, replacing any existing object.
    async fn write(&self, key: &str, content: &str) -> Result<()> {
        self.write_object(key, Bytes::copy_from_slice(content.as_bytes()), None)
            .await
    }

    /// Write bytes, replacing any existing object.
    async fn write_binary(&self, key: &str, data: Bytes) -> Result<()> {
        self.write_object(key, data, None).await
    }

    /// Write a stream, replacing any existing object.
    async fn write_stream(
        &self,
        key: &str,
        content: ByteStream,
        content_type: Option<&str>,
    ) -> Result<()> {
        let data = collect_stream(content).await?;
        self.write_object(key, data, content_type).await
    }

    /// Write bytes with an optional content type, replacing any existing object.
    async fn write_object(&self, key: &str, data: Bytes, content_type: Option<&str>)
        -> Result<()>;

    /// Check whether a concrete object exists at `key`.
    ///
    /// A backend "not found" becomes `false`; other failures propagate.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Delete an object. Deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Delete every object whose key starts with `prefix`.
    ///
    /// `None` or an empty prefix deletes nothing. Returns the number of
    /// objects deleted.
    async fn delete_by_prefix(&self, prefix: Option<&str>) -> Result<usize>;

    /// Delete every object under `directory` (all levels) not listed in `keep`.
    async fn delete_all_except(&self, directory: &str, keep: &HashSet<String>) -> Result<usize> {
        let keep: HashSet<String> = keep.iter().map(|k| self.canonical_key(k)).collect();
        let doomed: Vec<String> = self
            .list_paths(directory, "*", SearchScope::AllLevels)
            .await?
            .into_iter()
            .filter(|key| !keep.contains(key))
            .collect();

        delete_all(doomed, self.cancellation(), "delete_all_except", |key| async move {
            self.delete(&key).await
        })
        .await
    }

    /// Copy an object, replacing the destination.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the source does not exist.
    async fn copy(&self, from: &str, to: &str) -> Result<()>;

    /// Move an object. The source is deleted only after the copy completed.
    async fn move_file(&self, from: &str, to: &str) -> Result<()> {
        self.copy(from, to).await?;
        self.delete(from).await
    }

    /// Every key starting with `prefix`.
    async fn search(&self, prefix: &str) -> Result<Vec<String>>;

    /// Keys under `root` whose name matches `pattern`.
    ///
    /// See [`NamePattern`](crate::path::NamePattern) for the pattern forms.
    async fn list_paths(&self, root: &str, pattern: &str, scope: SearchScope)
        -> Result<Vec<String>>;

    /// Direct children of `path` whose file name matches the regular
    /// expression `mask`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidPattern` if `mask` is not a valid regex.
    async fn files_by_mask(&self, path: &str, mask: &str) -> Result<Vec<String>> {
        let mask = Regex::new(mask)?;
        Ok(self
            .list_paths(path, "*", SearchScope::TopLevelOnly)
            .await?
            .into_iter()
            .filter(|key| mask.is_match(file_name(key)))
            .collect())
    }

    /// Ensure a directory exists. No-op on flat backends.
    async fn create_directory(&self, path: &str) -> Result<()>;

    /// Delete a directory's content.
    ///
    /// `recursive` deletes every object below `path`; otherwise only direct
    /// children are deleted.
    async fn delete_directory(&self, path: &str, recursive: bool) -> Result<()>;

    /// Delete the direct file children of a directory.
    async fn delete_all_files_from_directory(&self, path: &str) -> Result<()> {
        self.delete_directory(path, false).await
    }

    /// The form listings report for a caller-supplied key.
    fn canonical_key(&self, key: &str) -> String {
        normalize_key(key)
    }

    /// Directory portion of a path.
    fn directory_name(&self, path: &str) -> String {
        crate::path::directory_name(path)
    }

    /// Object size in bytes.
    async fn size(&self, key: &str) -> Result<u64>;

    /// Object size scaled to `unit`, formatted with two decimals.
    async fn file_size(&self, key: &str, unit: SizeUnit) -> Result<String> {
        Ok(unit.format(self.size(key).await?))
    }

    /// Addressable root of this storage.
    async fn base_url(&self) -> Result<String>;

    /// Addressable location of one object.
    ///
    /// Signed URLs expire after [`SIGNED_URL_EXPIRY`].
    async fn uri(&self, key: &str) -> Result<String> {
        let _ = key;
        Err(StorageError::unsupported(self.backend_name(), "uri"))
    }

    /// Restore a soft-deleted object.
    async fn undelete(&self, key: &str) -> Result<()> {
        let _ = key;
        Err(StorageError::unsupported(self.backend_name(), "undelete"))
    }

    /// Release the backend client. Repeated calls are no-ops.
    async fn close(&self) -> Result<()>;

    /// Cancellation signal checked by bulk operations.
    fn cancellation(&self) -> &CancellationToken;

    /// Get a human-readable name for this storage backend.
    fn backend_name(&self) -> &'static str;
}

/// Wrap owned bytes into a single-chunk stream.
pub fn bytes_stream(data: Bytes) -> ByteStream {
    stream::once(async move { Ok(data) }).boxed()
}

/// Drain a stream into one buffer.
pub async fn collect_stream(mut content: ByteStream) -> Result<Bytes> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = content.try_next().await? {
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

pub(crate) fn ensure_not_cancelled(token: &CancellationToken, operation: &str) -> Result<()> {
    if token.is_cancelled() {
        return Err(StorageError::Cancelled(operation.to_string()));
    }
    Ok(())
}

/// Run `delete` for every key with bounded concurrency and wait for all of them.
///
/// Stops at the first error or when `token` is cancelled; deletes that already
/// finished are not rolled back.
pub(crate) async fn delete_all<F, Fut>(
    keys: Vec<String>,
    token: &CancellationToken,
    operation: &str,
    delete: F,
) -> Result<usize>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send,
{
    let total = keys.len();
    let delete = &delete;
    let outcome = stream::iter(keys)
        .map(|key| async move {
            ensure_not_cancelled(token, operation)?;
            delete(key).await
        })
        .buffer_unordered(DELETE_CONCURRENCY)
        .try_collect::<Vec<()>>()
        .await;

    if let Err(e) = &outcome {
        warn!(operation, total, error = %e, "Bulk delete stopped early");
    }
    outcome.map(|_| total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LocalFileSystemProvider;
    use tempfile::TempDir;

    #[test]
    fn test_size_unit_format() {
        assert_eq!(SizeUnit::Kb.format(2048), "2.00");
        assert_eq!(SizeUnit::Byte.format(2048), "2048.00");
        assert_eq!(SizeUnit::Mb.format(1536 * 1024), "1.50");
        assert_eq!(SizeUnit::Kb.format(0), "0.00");
        assert_eq!(SizeUnit::Tb.format(1024), "0.00");
    }

    #[test]
    fn test_size_unit_format_rounds_ties_up() {
        // 1.125 and 2.375 are exact in binary, so these are true ties
        assert_eq!(SizeUnit::Kb.format(1152), "1.13");
        assert_eq!(SizeUnit::Kb.format(2432), "2.38");
        assert_eq!(SizeUnit::Byte.format(1), "1.00");
    }

    #[test]
    fn test_size_unit_parse() {
        assert_eq!("KB".parse::<SizeUnit>().unwrap(), SizeUnit::Kb);
        assert_eq!("byte".parse::<SizeUnit>().unwrap(), SizeUnit::Byte);
        assert!("zb".parse::<SizeUnit>().is_err());
        assert_eq!(SizeUnit::Gb.to_string(), "gb");
    }

    #[test]
    fn test_search_scope_default() {
        assert_eq!(SearchScope::default(), SearchScope::AllLevels);
    }

    #[tokio::test]
    async fn test_collect_stream() {
        let chunks: Vec<Result<Bytes>> = vec![Ok(Bytes::from("hello ")), Ok(Bytes::from("world"))];
        let content: ByteStream = stream::iter(chunks).boxed();
        assert_eq!(collect_stream(content).await.unwrap(), Bytes::from("hello world"));
    }

    #[tokio::test]
    async fn test_delete_all_stops_when_cancelled() {
        let token = CancellationToken::new();
        token.cancel();

        let result = delete_all(
            vec!["a".to_string(), "b".to_string()],
            &token,
            "test",
            |_key| async { Ok(()) },
        )
        .await;
        assert!(matches!(result, Err(StorageError::Cancelled(_))));
    }

    #[tokio::test]
    async fn test_default_delete_all_except() {
        let dir = TempDir::new().unwrap();
        let storage = LocalFileSystemProvider::new(dir.path()).unwrap();

        for key in ["docs/keep.txt", "docs/drop.txt", "docs/sub/drop.txt", "other/stay.txt"] {
            storage.write(key, "data").await.unwrap();
        }

        let keep: HashSet<String> = ["docs/keep.txt".to_string()].into_iter().collect();
        let deleted = storage.delete_all_except("docs", &keep).await.unwrap();
        assert_eq!(deleted, 2);

        assert!(storage.exists("docs/keep.txt").await.unwrap());
        assert!(!storage.exists("docs/drop.txt").await.unwrap());
        assert!(!storage.exists("docs/sub/drop.txt").await.unwrap());
        assert!(storage.exists("other/stay.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_move_file_keeps_content() {
        let dir = TempDir::new().unwrap();
        let storage = LocalFileSystemProvider::new(dir.path()).unwrap();

        storage.write("from.txt", "move me").await.unwrap();
        storage.move_file("from.txt", "to/dest.txt").await.unwrap();

        assert!(!storage.exists("from.txt").await.unwrap());
        assert_eq!(storage.read("to/dest.txt").await.unwrap(), "move me");
    }
}
