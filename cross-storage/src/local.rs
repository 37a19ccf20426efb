//! Local filesystem storage implementation.
//!
//! Keys are `/`-separated paths below a root directory. Writes land in a
//! temporary sibling file that is renamed over the target, so readers never
//! observe a half-written object.

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::error::{Result, StorageError};
use crate::path::{directory_prefix, enclosing_directory, is_direct_child, normalize_key, NamePattern};
use crate::traits::{
    delete_all, ensure_not_cancelled, ByteStream, SearchScope, StorageProvider,
};

const TEMP_SUFFIX: &str = ".cross-tmp";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Local filesystem storage backend.
///
/// Stores objects as plain files below `root`. A key that already carries the
/// root (`/srv/files/a.txt` for root `/srv/files`) is used as is.
#[derive(Debug)]
pub struct LocalFileSystemProvider {
    root: PathBuf,
    cancel: CancellationToken,
    closed: AtomicBool,
}

impl LocalFileSystemProvider {
    /// Create a new local storage backend.
    ///
    /// Relative roots are resolved against the current directory. The root
    /// itself is created lazily by the first write.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if root.as_os_str().is_empty() {
            return Err(StorageError::Config(
                "local storage requires a root path".to_string(),
            ));
        }

        let root = if root.is_absolute() {
            root
        } else {
            std::env::current_dir()?.join(root)
        };

        info!(root = %root.display(), "Local storage provider ready");
        Ok(Self {
            root,
            cancel: CancellationToken::new(),
            closed: AtomicBool::new(false),
        })
    }

    /// Attach a cancellation token checked by bulk operations.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Get the root directory of this storage.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StorageError::Closed);
        }
        Ok(())
    }

    /// Convert a key to a filesystem path below the root.
    fn resolve(&self, key: &str) -> Result<PathBuf> {
        self.ensure_open()?;

        let candidate = Path::new(key);
        if candidate.starts_with(&self.root) {
            if candidate.components().any(|c| c == Component::ParentDir) {
                return Err(StorageError::InvalidPath(key.to_string()));
            }
            return Ok(candidate.to_path_buf());
        }

        let mut path = self.root.clone();
        for part in normalize_key(key).split('/') {
            match part {
                "" | "." => {}
                ".." => return Err(StorageError::InvalidPath(key.to_string())),
                part => path.push(part),
            }
        }
        Ok(path)
    }

    /// Convert a filesystem path back to a `/`-separated key.
    fn to_key(&self, path: &Path) -> Result<String> {
        let relative = path
            .strip_prefix(&self.root)
            .map_err(|_| StorageError::InvalidPath(path.display().to_string()))?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Ok(parts.join("/"))
    }

    /// Ensure parent directories exist for a path.
    async fn ensure_parent(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    fn temp_sibling(path: &Path) -> PathBuf {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let unique = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        path.with_file_name(format!(
            ".{}.{}-{}{}",
            name,
            std::process::id(),
            unique,
            TEMP_SUFFIX
        ))
    }

    /// Whether a file name has the exact shape produced by `temp_sibling`:
    /// `.{name}.{pid}-{counter}.cross-tmp`.
    fn is_temp_name(file_name: &str) -> bool {
        let stem = match file_name
            .strip_prefix('.')
            .and_then(|rest| rest.strip_suffix(TEMP_SUFFIX))
        {
            Some(stem) => stem,
            None => return false,
        };
        let tag = match stem.rsplit_once('.') {
            Some((name, tag)) if !name.is_empty() => tag,
            _ => return false,
        };
        match tag.split_once('-') {
            Some((pid, counter)) => {
                !pid.is_empty()
                    && !counter.is_empty()
                    && pid.bytes().all(|b| b.is_ascii_digit())
                    && counter.bytes().all(|b| b.is_ascii_digit())
            }
            None => false,
        }
    }

    /// Move a finished temporary file over the target.
    async fn commit(&self, tmp: &Path, target: &Path) -> Result<()> {
        if let Err(e) = fs::rename(tmp, target).await {
            let _ = fs::remove_file(tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn is_file(path: &Path) -> Result<bool> {
        match fs::metadata(path).await {
            Ok(m) => Ok(m.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Keys of every file below `dir`.
    async fn keys_under(&self, dir: &Path, operation: &str) -> Result<Vec<String>> {
        let mut results = Vec::new();
        match fs::metadata(dir).await {
            Ok(m) if m.is_dir() => {}
            Ok(_) => return Ok(results),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(results),
            Err(e) => return Err(e.into()),
        }
        self.list_recursive(dir, operation, &mut results).await?;
        results.sort();
        Ok(results)
    }

    /// Recursively list files in a directory.
    #[async_recursion::async_recursion]
    async fn list_recursive(
        &self,
        dir: &Path,
        operation: &str,
        results: &mut Vec<String>,
    ) -> Result<()> {
        ensure_not_cancelled(&self.cancel, operation)?;
        let mut entries = fs::read_dir(dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let file_type = entry.file_type().await?;

            if file_type.is_dir() {
                self.list_recursive(&path, operation, results).await?;
            } else if file_type.is_file() {
                if Self::is_temp_name(&entry.file_name().to_string_lossy()) {
                    continue;
                }
                results.push(self.to_key(&path)?);
            }
        }

        Ok(())
    }

    /// Delete the files directly inside `dir`, leaving subdirectories alone.
    async fn clear_direct_files(&self, dir: &Path) -> Result<usize> {
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut deleted = 0;
        while let Some(entry) = entries.next_entry().await? {
            ensure_not_cancelled(&self.cancel, "delete_directory")?;
            if entry.file_type().await?.is_file() {
                debug!("Deleting {:?}", entry.path());
                fs::remove_file(entry.path()).await?;
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}

#[async_trait]
impl StorageProvider for LocalFileSystemProvider {
    #[instrument(skip(self), fields(key = %key))]
    async fn read_binary(&self, key: &str) -> Result<Bytes> {
        let fs_path = self.resolve(key)?;
        if !Self::is_file(&fs_path).await? {
            return Err(StorageError::NotFound(key.to_string()));
        }

        debug!("Reading from {:?}", fs_path);
        Ok(Bytes::from(fs::read(&fs_path).await?))
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn open_read_stream(&self, key: &str) -> Result<ByteStream> {
        let fs_path = self.resolve(key)?;
        if !Self::is_file(&fs_path).await? {
            return Err(StorageError::NotFound(key.to_string()));
        }

        let file = fs::File::open(&fs_path).await?;
        Ok(ReaderStream::new(file).map_err(StorageError::from).boxed())
    }

    #[instrument(skip(self, data, _content_type), fields(key = %key, size = data.len()))]
    async fn write_object(&self, key: &str, data: Bytes, _content_type: Option<&str>) -> Result<()> {
        let fs_path = self.resolve(key)?;
        self.ensure_parent(&fs_path).await?;

        let tmp = Self::temp_sibling(&fs_path);
        debug!("Writing {} bytes to {:?}", data.len(), fs_path);
        if let Err(e) = fs::write(&tmp, &data).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        self.commit(&tmp, &fs_path).await
    }

    #[instrument(skip(self, content, _content_type), fields(key = %key))]
    async fn write_stream(
        &self,
        key: &str,
        mut content: ByteStream,
        _content_type: Option<&str>,
    ) -> Result<()> {
        let fs_path = self.resolve(key)?;
        self.ensure_parent(&fs_path).await?;

        let tmp = Self::temp_sibling(&fs_path);
        let written: Result<u64> = async {
            let mut file = fs::File::create(&tmp).await?;
            let mut total = 0u64;
            while let Some(chunk) = content.try_next().await? {
                file.write_all(&chunk).await?;
                total += chunk.len() as u64;
            }
            file.flush().await?;
            Ok(total)
        }
        .await;

        match written {
            Ok(total) => {
                debug!("Streamed {} bytes to {:?}", total, fs_path);
                self.commit(&tmp, &fs_path).await
            }
            Err(e) => {
                let _ = fs::remove_file(&tmp).await;
                Err(e)
            }
        }
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn exists(&self, key: &str) -> Result<bool> {
        let fs_path = self.resolve(key)?;
        Self::is_file(&fs_path).await
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn delete(&self, key: &str) -> Result<()> {
        let fs_path = self.resolve(key)?;
        debug!("Deleting {:?}", fs_path);

        match fs::remove_file(&fs_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self))]
    async fn delete_by_prefix(&self, prefix: Option<&str>) -> Result<usize> {
        let prefix = match prefix.map(normalize_key) {
            Some(p) if !p.is_empty() => p,
            _ => return Ok(0),
        };

        let dir = self.resolve(enclosing_directory(&prefix))?;
        let doomed: Vec<String> = self
            .keys_under(&dir, "delete_by_prefix")
            .await?
            .into_iter()
            .filter(|key| key.starts_with(&prefix))
            .collect();

        let deleted = delete_all(doomed, &self.cancel, "delete_by_prefix", |key| async move {
            self.delete(&key).await
        })
        .await?;
        info!(prefix = %prefix, deleted, "Deleted files by prefix");
        Ok(deleted)
    }

    #[instrument(skip(self), fields(from = %from, to = %to))]
    async fn copy(&self, from: &str, to: &str) -> Result<()> {
        let from_path = self.resolve(from)?;
        let to_path = self.resolve(to)?;

        if !Self::is_file(&from_path).await? {
            return Err(StorageError::NotFound(from.to_string()));
        }

        self.ensure_parent(&to_path).await?;
        debug!("Copying {:?} to {:?}", from_path, to_path);
        let tmp = Self::temp_sibling(&to_path);
        if let Err(e) = fs::copy(&from_path, &tmp).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        self.commit(&tmp, &to_path).await
    }

    #[instrument(skip(self), fields(from = %from, to = %to))]
    async fn move_file(&self, from: &str, to: &str) -> Result<()> {
        let from_path = self.resolve(from)?;
        let to_path = self.resolve(to)?;

        if !Self::is_file(&from_path).await? {
            return Err(StorageError::NotFound(from.to_string()));
        }

        self.ensure_parent(&to_path).await?;
        debug!("Renaming {:?} to {:?}", from_path, to_path);
        fs::rename(&from_path, &to_path).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn search(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = normalize_key(prefix);
        let dir = self.resolve(enclosing_directory(&prefix))?;
        Ok(self
            .keys_under(&dir, "search")
            .await?
            .into_iter()
            .filter(|key| key.starts_with(&prefix))
            .collect())
    }

    #[instrument(skip(self))]
    async fn list_paths(&self, root: &str, pattern: &str, scope: SearchScope) -> Result<Vec<String>> {
        let pattern = NamePattern::parse(pattern)?;
        let dir = self.resolve(root)?;
        let prefix = if dir == self.root {
            String::new()
        } else {
            directory_prefix(&self.to_key(&dir)?)
        };

        let keys = self.keys_under(&dir, "list_paths").await?;
        let matched: Vec<String> = keys
            .into_iter()
            .filter(|key| scope == SearchScope::AllLevels || is_direct_child(key, &prefix))
            .filter(|key| pattern.matches(key))
            .collect();

        debug!("Listed {} paths under {:?}", matched.len(), dir);
        Ok(matched)
    }

    #[instrument(skip(self))]
    async fn create_directory(&self, path: &str) -> Result<()> {
        let dir = self.resolve(path)?;
        debug!("Creating directory {:?}", dir);
        fs::create_dir_all(&dir).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_directory(&self, path: &str, recursive: bool) -> Result<()> {
        let dir = self.resolve(path)?;
        match fs::metadata(&dir).await {
            Ok(m) if m.is_dir() => {}
            Ok(_) => return Err(StorageError::InvalidPath(format!("{} is not a directory", path))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        }

        if recursive {
            debug!("Removing directory tree {:?}", dir);
            fs::remove_dir_all(&dir).await?;
            return Ok(());
        }

        let deleted = self.clear_direct_files(&dir).await?;
        // Subdirectories keep the node alive; that is expected here.
        if let Err(e) = fs::remove_dir(&dir).await {
            debug!("Directory {:?} kept: {}", dir, e);
        }
        info!(path = %path, deleted, "Deleted direct children of directory");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_all_files_from_directory(&self, path: &str) -> Result<()> {
        let dir = self.resolve(path)?;
        let deleted = self.clear_direct_files(&dir).await?;
        info!(path = %path, deleted, "Deleted files from directory");
        Ok(())
    }

    fn canonical_key(&self, key: &str) -> String {
        self.resolve(key)
            .and_then(|path| self.to_key(&path))
            .unwrap_or_else(|_| normalize_key(key))
    }

    fn directory_name(&self, path: &str) -> String {
        match self.resolve(path) {
            Ok(resolved) => resolved
                .parent()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            Err(_) => crate::path::directory_name(path),
        }
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn size(&self, key: &str) -> Result<u64> {
        let fs_path = self.resolve(key)?;
        match fs::metadata(&fs_path).await {
            Ok(m) if m.is_file() => Ok(m.len()),
            Ok(_) => Err(StorageError::NotFound(key.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn base_url(&self) -> Result<String> {
        self.ensure_open()?;
        Ok(self.root.display().to_string())
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!(root = %self.root.display(), "Local storage provider closed");
        }
        Ok(())
    }

    fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}
