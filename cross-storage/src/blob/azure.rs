//! Azure Blob Storage container client.

use async_trait::async_trait;
use azure_core::error::ErrorKind;
use azure_core::StatusCode;
use azure_storage::prelude::BlobSasPermissions;
use azure_storage::ConnectionString;
use azure_storage_blobs::prelude::{ClientBuilder, ContainerClient};
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use std::time::Duration;
use time::OffsetDateTime;
use tracing::{debug, info};

use super::client::{BlobContainerClient, BlobItem, BlobPageStream};
use crate::error::{Result, StorageError};

/// Container client backed by the Azure SDK.
#[derive(Clone)]
pub struct AzureBlobContainer {
    container: ContainerClient,
}

impl AzureBlobContainer {
    /// Build a client for `container_name` from a storage account connection string.
    pub fn from_connection_string(connection_string: &str, container_name: &str) -> Result<Self> {
        let parsed = ConnectionString::new(connection_string)
            .map_err(|e| StorageError::Config(format!("invalid connection string: {}", e)))?;
        let account = parsed.account_name.ok_or_else(|| {
            StorageError::Config("connection string has no AccountName".to_string())
        })?;
        let credentials = parsed
            .storage_credentials()
            .map_err(|e| StorageError::Config(e.to_string()))?;

        let container = ClientBuilder::new(account, credentials).container_client(container_name);
        info!(account, container = container_name, "Azure container client ready");
        Ok(Self { container })
    }

    /// Wrap an already configured SDK container client.
    pub fn from_client(container: ContainerClient) -> Self {
        Self { container }
    }
}

impl std::fmt::Debug for AzureBlobContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureBlobContainer")
            .field("container", &self.container.container_name())
            .finish()
    }
}

fn is_not_found(e: &azure_core::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::HttpResponse {
            status: StatusCode::NotFound,
            ..
        }
    )
}

fn backend(e: azure_core::Error) -> StorageError {
    StorageError::Backend(e.to_string())
}

fn missing_or_backend(name: &str, e: azure_core::Error) -> StorageError {
    if is_not_found(&e) {
        StorageError::NotFound(name.to_string())
    } else {
        backend(e)
    }
}

#[async_trait]
impl BlobContainerClient for AzureBlobContainer {
    async fn create_if_not_exists(&self) -> Result<()> {
        if self.container.exists().await.map_err(backend)? {
            return Ok(());
        }
        match self.container.create().await {
            Ok(_) => {
                info!(container = self.container.container_name(), "Created blob container");
                Ok(())
            }
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::HttpResponse {
                        status: StatusCode::Conflict,
                        ..
                    }
                ) =>
            {
                Ok(())
            }
            Err(e) => Err(backend(e)),
        }
    }

    fn list_pages(&self, prefix: Option<String>) -> BlobPageStream {
        let mut builder = self.container.list_blobs().include_metadata(true);
        if let Some(prefix) = prefix {
            builder = builder.prefix(prefix);
        }

        builder
            .into_stream()
            .map_err(backend)
            .map_ok(|page| {
                page.blobs
                    .blobs()
                    .map(|blob| BlobItem {
                        name: blob.name.clone(),
                        size: blob.properties.content_length,
                        metadata: blob.metadata.clone().unwrap_or_default(),
                    })
                    .collect()
            })
            .boxed()
    }

    async fn download(&self, name: &str) -> Result<Bytes> {
        let content = self
            .container
            .blob_client(name)
            .get_content()
            .await
            .map_err(|e| missing_or_backend(name, e))?;
        Ok(Bytes::from(content))
    }

    async fn upload(&self, name: &str, data: Bytes, content_type: Option<&str>) -> Result<()> {
        let blob = self.container.blob_client(name);
        let request = blob.put_block_blob(data);
        let request = match content_type {
            Some(content_type) => request.content_type(content_type.to_string()),
            None => request,
        };
        request.await.map_err(backend)?;
        Ok(())
    }

    async fn delete_if_exists(&self, name: &str) -> Result<bool> {
        match self.container.blob_client(name).delete().await {
            Ok(_) => Ok(true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(backend(e)),
        }
    }

    async fn properties(&self, name: &str) -> Result<Option<BlobItem>> {
        match self.container.blob_client(name).get_properties().await {
            Ok(response) => Ok(Some(BlobItem {
                name: name.to_string(),
                size: response.blob.properties.content_length,
                metadata: response.blob.metadata.unwrap_or_default(),
            })),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(backend(e)),
        }
    }

    async fn copy(&self, from: &str, to: &str) -> Result<()> {
        let source = self.container.blob_client(from).url().map_err(backend)?;
        debug!("Copying {} from {}", to, source);
        self.container
            .blob_client(to)
            .copy_from_url(source)
            .await
            .map_err(|e| missing_or_backend(from, e))?;
        Ok(())
    }

    async fn undelete(&self, name: &str) -> Result<()> {
        self.container
            .blob_client(name)
            .undelete()
            .await
            .map_err(|e| missing_or_backend(name, e))?;
        Ok(())
    }

    async fn signed_url(&self, name: &str, expires_in: Duration) -> Result<String> {
        let blob = self.container.blob_client(name);
        let permissions = BlobSasPermissions {
            read: true,
            ..Default::default()
        };
        let expiry = OffsetDateTime::now_utc() + expires_in;
        let sas = blob
            .shared_access_signature(permissions, expiry)
            .await
            .map_err(backend)?;
        let url = blob.generate_signed_blob_url(&sas).map_err(backend)?;
        Ok(url.to_string())
    }

    fn container_url(&self) -> String {
        self.container
            .url()
            .map(|url| url.to_string())
            .unwrap_or_else(|_| self.container.container_name().to_string())
    }
}
