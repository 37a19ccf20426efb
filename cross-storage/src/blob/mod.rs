//! Blob container storage backend.
//!
//! Blob containers are flat: a "directory" is the set of blobs sharing a name
//! prefix, optionally accompanied by a marker blob that carries metadata.
//! Markers are never reported as files.

mod client;
mod memory;

#[cfg(feature = "azure")]
mod azure;

pub use client::{BlobContainerClient, BlobItem, BlobPageStream};
pub use memory::InMemoryBlobContainer;

#[cfg(feature = "azure")]
pub use azure::AzureBlobContainer;

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::error::{Result, StorageError};
use crate::path::{directory_prefix, is_direct_child, normalize_key, NamePattern};
use crate::traits::{
    delete_all, ensure_not_cancelled, SearchScope, StorageProvider, SIGNED_URL_EXPIRY,
};

/// Storage backend over one blob container.
pub struct BlobContainerProvider {
    client: RwLock<Option<Arc<dyn BlobContainerClient>>>,
    container_url: String,
    cancel: CancellationToken,
}

impl BlobContainerProvider {
    /// Wrap a container client, creating the container if it does not exist.
    pub async fn new(client: Arc<dyn BlobContainerClient>) -> Result<Self> {
        client.create_if_not_exists().await?;
        let container_url = client.container_url();

        info!(container = %container_url, "Blob storage provider ready");
        Ok(Self {
            client: RwLock::new(Some(client)),
            container_url,
            cancel: CancellationToken::new(),
        })
    }

    /// Attach a cancellation token checked by bulk operations.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    fn client(&self) -> Result<Arc<dyn BlobContainerClient>> {
        self.client.read().clone().ok_or(StorageError::Closed)
    }

    fn blob_name(key: &str) -> Result<String> {
        let name = normalize_key(key);
        if name.is_empty() {
            return Err(StorageError::InvalidPath(key.to_string()));
        }
        Ok(name)
    }

    /// Drain every listing page for `prefix`.
    async fn list_items(&self, prefix: &str, operation: &str) -> Result<Vec<BlobItem>> {
        let client = self.client()?;
        let mut pages = client.list_pages((!prefix.is_empty()).then(|| prefix.to_string()));

        let mut items = Vec::new();
        let mut page_count = 0usize;
        loop {
            ensure_not_cancelled(&self.cancel, operation)?;
            match pages.try_next().await? {
                Some(page) => {
                    page_count += 1;
                    items.extend(page);
                }
                None => break,
            }
        }

        debug!(prefix, pages = page_count, items = items.len(), "Listed blobs");
        Ok(items)
    }

    /// Properties of a file blob. Absent blobs and directory markers are `None`.
    async fn file_item(client: &dyn BlobContainerClient, name: &str) -> Result<Option<BlobItem>> {
        Ok(client
            .properties(name)
            .await?
            .filter(|item| !item.is_directory_marker()))
    }

    /// Names of non-marker blobs starting with `prefix`.
    async fn file_names(&self, prefix: &str, operation: &str) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .list_items(prefix, operation)
            .await?
            .into_iter()
            .filter(|item| !item.is_directory_marker())
            .map(|item| item.name)
            .collect();
        names.sort();
        Ok(names)
    }
}

impl std::fmt::Debug for BlobContainerProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobContainerProvider")
            .field("container_url", &self.container_url)
            .finish()
    }
}

#[async_trait]
impl StorageProvider for BlobContainerProvider {
    #[instrument(skip(self), fields(key = %key))]
    async fn read_binary(&self, key: &str) -> Result<Bytes> {
        let name = Self::blob_name(key)?;
        let client = self.client()?;
        if Self::file_item(client.as_ref(), &name).await?.is_none() {
            return Err(StorageError::NotFound(key.to_string()));
        }

        debug!("Downloading blob {}", name);
        client.download(&name).await
    }

    #[instrument(skip(self, data), fields(key = %key, size = data.len()))]
    async fn write_object(&self, key: &str, data: Bytes, content_type: Option<&str>) -> Result<()> {
        let name = Self::blob_name(key)?;
        debug!("Uploading {} bytes to blob {}", data.len(), name);
        self.client()?.upload(&name, data, content_type).await
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn exists(&self, key: &str) -> Result<bool> {
        let name = match Self::blob_name(key) {
            Ok(name) => name,
            Err(StorageError::InvalidPath(_)) => return Ok(false),
            Err(e) => return Err(e),
        };
        let client = self.client()?;
        Ok(Self::file_item(client.as_ref(), &name).await?.is_some())
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn delete(&self, key: &str) -> Result<()> {
        let name = Self::blob_name(key)?;
        let existed = self.client()?.delete_if_exists(&name).await?;
        debug!(existed, "Deleted blob {}", name);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_by_prefix(&self, prefix: Option<&str>) -> Result<usize> {
        let prefix = match prefix.map(normalize_key) {
            Some(p) if !p.is_empty() => p,
            _ => return Ok(0),
        };

        let names: Vec<String> = self
            .list_items(&prefix, "delete_by_prefix")
            .await?
            .into_iter()
            .map(|item| item.name)
            .collect();
        let deleted = delete_all(names, &self.cancel, "delete_by_prefix", |name| async move {
            self.delete(&name).await
        })
        .await?;
        info!(prefix = %prefix, deleted, "Deleted blobs by prefix");
        Ok(deleted)
    }

    #[instrument(skip(self), fields(from = %from, to = %to))]
    async fn copy(&self, from: &str, to: &str) -> Result<()> {
        let source = Self::blob_name(from)?;
        let target = Self::blob_name(to)?;
        let client = self.client()?;
        if Self::file_item(client.as_ref(), &source).await?.is_none() {
            return Err(StorageError::NotFound(from.to_string()));
        }

        debug!("Copying blob {} to {}", source, target);
        client.copy(&source, &target).await
    }

    #[instrument(skip(self))]
    async fn search(&self, prefix: &str) -> Result<Vec<String>> {
        self.file_names(&normalize_key(prefix), "search").await
    }

    #[instrument(skip(self))]
    async fn list_paths(&self, root: &str, pattern: &str, scope: SearchScope) -> Result<Vec<String>> {
        let pattern = NamePattern::parse(pattern)?;
        let prefix = directory_prefix(root);

        Ok(self
            .file_names(&prefix, "list_paths")
            .await?
            .into_iter()
            .filter(|name| scope == SearchScope::AllLevels || is_direct_child(name, &prefix))
            .filter(|name| pattern.matches(name))
            .collect())
    }

    async fn create_directory(&self, path: &str) -> Result<()> {
        self.client()?;
        debug!(path, "Blob containers have no directories to create");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_directory(&self, path: &str, recursive: bool) -> Result<()> {
        if recursive {
            let dir = normalize_key(path).trim_end_matches('/').to_string();
            let nested = format!("{}/", dir);
            let mut names: Vec<String> = self
                .list_items(&dir, "delete_directory")
                .await?
                .into_iter()
                .map(|item| item.name)
                .filter(|name| dir.is_empty() || *name == dir || name.starts_with(&nested))
                .collect();

            // Children sort after their parent marker, so descending order
            // removes the marker last.
            names.sort_by(|a, b| b.cmp(a));
            let client = self.client()?;
            for name in &names {
                ensure_not_cancelled(&self.cancel, "delete_directory")?;
                client.delete_if_exists(name).await?;
            }
            info!(path, deleted = names.len(), "Deleted blob directory tree");
            return Ok(());
        }

        let prefix = directory_prefix(path);
        let names: Vec<String> = self
            .file_names(&prefix, "delete_directory")
            .await?
            .into_iter()
            .filter(|name| is_direct_child(name, &prefix))
            .collect();
        let deleted = delete_all(names, &self.cancel, "delete_directory", |name| async move {
            self.delete(&name).await
        })
        .await?;
        info!(path, deleted, "Deleted blob directory files");
        Ok(())
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn size(&self, key: &str) -> Result<u64> {
        let name = Self::blob_name(key)?;
        let client = self.client()?;
        Self::file_item(client.as_ref(), &name)
            .await?
            .map(|item| item.size)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn base_url(&self) -> Result<String> {
        self.client()?;
        Ok(self.container_url.clone())
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn uri(&self, key: &str) -> Result<String> {
        let name = Self::blob_name(key)?;
        self.client()?.signed_url(&name, SIGNED_URL_EXPIRY).await
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn undelete(&self, key: &str) -> Result<()> {
        let name = Self::blob_name(key)?;
        self.client()?.undelete(&name).await?;
        info!("Restored blob {}", name);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let client = self.client.write().take();
        if let Some(client) = client {
            client.close().await?;
            info!(container = %self.container_url, "Blob storage provider closed");
        }
        Ok(())
    }

    fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    fn backend_name(&self) -> &'static str {
        "blob"
    }
}
