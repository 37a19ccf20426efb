//! Factory for creating storage providers from configuration.

use std::sync::Arc;
use tracing::info;

use crate::config::{expand_tilde, StorageKind, StorageProviderConfiguration};
use crate::error::{Result, StorageError};
use crate::local::LocalFileSystemProvider;
use crate::traits::StorageProvider;

/// Factory for creating storage providers.
///
/// The provider is built once at process start and shared afterwards.
pub struct StorageProviderFactory;

impl StorageProviderFactory {
    /// Validate `config` and construct the selected provider.
    pub async fn create(config: &StorageProviderConfiguration) -> Result<Arc<dyn StorageProvider>> {
        let kind = config.validate()?;
        info!(backend = %kind, "Creating storage provider");

        match kind {
            StorageKind::FileStorage => {
                let root = expand_tilde(&config.file_options()?.root_path)?;
                Ok(Arc::new(LocalFileSystemProvider::new(root)?))
            }
            #[cfg(feature = "s3")]
            StorageKind::AmazonS3Storage => {
                use crate::s3::{ObjectStorageProvider, S3Config};

                let s3_config = S3Config::from(config.s3_options()?);
                Ok(Arc::new(ObjectStorageProvider::new(s3_config)?))
            }
            #[cfg(not(feature = "s3"))]
            StorageKind::AmazonS3Storage => Err(StorageError::Config(
                "Amazon S3 storage requires 's3' feature".to_string(),
            )),
            #[cfg(feature = "azure")]
            StorageKind::AzureBlobStorage => {
                use crate::blob::{AzureBlobContainer, BlobContainerProvider};

                let options = config.azure_options()?;
                let client = AzureBlobContainer::from_connection_string(
                    &options.connection_string,
                    &options.container_name,
                )?;
                Ok(Arc::new(BlobContainerProvider::new(Arc::new(client)).await?))
            }
            #[cfg(not(feature = "azure"))]
            StorageKind::AzureBlobStorage => Err(StorageError::Config(
                "Azure blob storage requires 'azure' feature".to_string(),
            )),
        }
    }
}
