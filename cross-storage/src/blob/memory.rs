//! In-memory blob container.
//!
//! Behaves like a real container as far as the provider can tell: listings are
//! paged and sorted by name, metadata travels with each item, and deletes are
//! soft so `undelete` can bring a blob back.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

use super::client::{BlobContainerClient, BlobItem, BlobPageStream};
use crate::error::{Result, StorageError};

#[derive(Debug, Clone)]
struct StoredBlob {
    data: Bytes,
    content_type: Option<String>,
    metadata: HashMap<String, String>,
    deleted: bool,
}

/// Blob container kept in process memory.
#[derive(Debug)]
pub struct InMemoryBlobContainer {
    name: String,
    blobs: RwLock<BTreeMap<String, StoredBlob>>,
    page_size: usize,
    create_calls: AtomicUsize,
    close_calls: AtomicUsize,
}

impl InMemoryBlobContainer {
    /// Default number of items per listing page.
    pub const DEFAULT_PAGE_SIZE: usize = 5000;

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            blobs: RwLock::new(BTreeMap::new()),
            page_size: Self::DEFAULT_PAGE_SIZE,
            create_calls: AtomicUsize::new(0),
            close_calls: AtomicUsize::new(0),
        }
    }

    /// Override the listing page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Store a directory marker: an empty blob carrying metadata.
    pub fn insert_marker(&self, name: &str, metadata: HashMap<String, String>) {
        self.blobs.write().insert(
            name.to_string(),
            StoredBlob {
                data: Bytes::new(),
                content_type: None,
                metadata,
                deleted: false,
            },
        );
    }

    /// Content type recorded for a live blob.
    pub fn content_type(&self, name: &str) -> Option<String> {
        self.blobs
            .read()
            .get(name)
            .filter(|b| !b.deleted)
            .and_then(|b| b.content_type.clone())
    }

    /// Number of `create_if_not_exists` calls received.
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::Acquire)
    }

    /// Number of `close` calls received.
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::Acquire)
    }

    fn live(&self, name: &str) -> Option<StoredBlob> {
        self.blobs.read().get(name).filter(|b| !b.deleted).cloned()
    }
}

#[async_trait]
impl BlobContainerClient for InMemoryBlobContainer {
    async fn create_if_not_exists(&self) -> Result<()> {
        self.create_calls.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn list_pages(&self, prefix: Option<String>) -> BlobPageStream {
        let prefix = prefix.unwrap_or_default();
        let items: Vec<BlobItem> = self
            .blobs
            .read()
            .iter()
            .filter(|(name, blob)| !blob.deleted && name.starts_with(&prefix))
            .map(|(name, blob)| BlobItem {
                name: name.clone(),
                size: blob.data.len() as u64,
                metadata: blob.metadata.clone(),
            })
            .collect();

        let pages: Vec<Result<Vec<BlobItem>>> = items
            .chunks(self.page_size)
            .map(|page| Ok(page.to_vec()))
            .collect();
        debug!(container = %self.name, prefix = %prefix, pages = pages.len(), "Listing blobs");
        stream::iter(pages).boxed()
    }

    async fn download(&self, name: &str) -> Result<Bytes> {
        self.live(name)
            .map(|b| b.data)
            .ok_or_else(|| StorageError::NotFound(name.to_string()))
    }

    async fn upload(&self, name: &str, data: Bytes, content_type: Option<&str>) -> Result<()> {
        self.blobs.write().insert(
            name.to_string(),
            StoredBlob {
                data,
                content_type: content_type.map(str::to_string),
                metadata: HashMap::new(),
                deleted: false,
            },
        );
        Ok(())
    }

    async fn delete_if_exists(&self, name: &str) -> Result<bool> {
        let mut blobs = self.blobs.write();
        match blobs.get_mut(name) {
            Some(blob) if !blob.deleted => {
                blob.deleted = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn properties(&self, name: &str) -> Result<Option<BlobItem>> {
        Ok(self.live(name).map(|b| BlobItem {
            name: name.to_string(),
            size: b.data.len() as u64,
            metadata: b.metadata,
        }))
    }

    async fn copy(&self, from: &str, to: &str) -> Result<()> {
        let source = self
            .live(from)
            .ok_or_else(|| StorageError::NotFound(from.to_string()))?;
        self.blobs.write().insert(to.to_string(), source);
        Ok(())
    }

    async fn undelete(&self, name: &str) -> Result<()> {
        match self.blobs.write().get_mut(name) {
            Some(blob) => {
                blob.deleted = false;
                Ok(())
            }
            None => Err(StorageError::NotFound(name.to_string())),
        }
    }

    async fn signed_url(&self, name: &str, expires_in: Duration) -> Result<String> {
        Ok(format!(
            "{}/{}?sp=r&expires_in={}",
            self.container_url(),
            name,
            expires_in.as_secs()
        ))
    }

    fn container_url(&self) -> String {
        format!("memory://{}", self.name)
    }

    async fn close(&self) -> Result<()> {
        self.close_calls.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}
