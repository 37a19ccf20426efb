//! Blob container client seam.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::Result;

/// One listed blob.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlobItem {
    /// Full blob name
    pub name: String,
    /// Content length in bytes
    pub size: u64,
    /// User metadata returned with the listing
    pub metadata: HashMap<String, String>,
}

impl BlobItem {
    /// Blobs carrying metadata stand in for directories, not files.
    pub fn is_directory_marker(&self) -> bool {
        !self.metadata.is_empty()
    }
}

/// Listing pages in service order.
pub type BlobPageStream = BoxStream<'static, Result<Vec<BlobItem>>>;

/// Operations of a single blob container.
///
/// Implementations map a missing blob to `StorageError::NotFound` for
/// `download`, `copy` and `undelete`.
#[async_trait]
pub trait BlobContainerClient: Send + Sync {
    /// Create the container unless it already exists.
    async fn create_if_not_exists(&self) -> Result<()>;

    /// List blobs whose names start with `prefix`, one item page at a time.
    ///
    /// Listed items include their metadata.
    fn list_pages(&self, prefix: Option<String>) -> BlobPageStream;

    async fn download(&self, name: &str) -> Result<Bytes>;

    /// Upload a block blob, overwriting any existing one.
    async fn upload(&self, name: &str, data: Bytes, content_type: Option<&str>) -> Result<()>;

    /// Delete a blob; returns whether it existed.
    async fn delete_if_exists(&self, name: &str) -> Result<bool>;

    /// Size and metadata of one live blob, or `None` when it does not exist.
    async fn properties(&self, name: &str) -> Result<Option<BlobItem>>;

    /// Server-side copy.
    async fn copy(&self, from: &str, to: &str) -> Result<()>;

    /// Restore a soft-deleted blob.
    async fn undelete(&self, name: &str) -> Result<()>;

    /// Read-only shared access URL for one blob.
    async fn signed_url(&self, name: &str, expires_in: Duration) -> Result<String>;

    /// Address of the container.
    fn container_url(&self) -> String;

    /// Release connections held by the client.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
