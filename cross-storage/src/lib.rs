//! Uniform file storage over interchangeable backends.
//!
//! This crate provides a common `StorageProvider` trait implemented by a local
//! filesystem backend, an S3-compatible object storage backend and a blob
//! container backend. Application code picks one provider at start-up and
//! never learns which backend is active.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │  Application                                    │
//! │                      │                          │
//! │                      ▼                          │
//! │            ┌─────────────────┐                  │
//! │            │ StorageProvider │  ← Unified trait │
//! │            └────────┬────────┘                  │
//! │                     │                           │
//! │        ┌────────────┼────────────┐              │
//! │        ▼            ▼            ▼              │
//! │  ┌──────────┐ ┌──────────┐ ┌──────────┐        │
//! │  │  Local   │ │   S3     │ │   Blob   │        │
//! │  └──────────┘ └──────────┘ └──────────┘        │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! # Keys
//!
//! Keys are `/`-separated on every backend. Flat backends have no directory
//! entity; directories are derived from key prefixes (see [`path`]).
//!
//! # Quick Start
//!
//! ```no_run
//! use cross_storage::{LocalFileSystemProvider, SearchScope, StorageProvider};
//!
//! # async fn example() -> cross_storage::Result<()> {
//! let storage = LocalFileSystemProvider::new("./data")?;
//!
//! storage.write("avatars/readme.txt", "hello").await?;
//! let text = storage.read("avatars/readme.txt").await?;
//!
//! let images = storage
//!     .list_paths("avatars", "*.jpg|*.png", SearchScope::TopLevelOnly)
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! # From Configuration
//!
//! ```ignore
//! use cross_storage::{StorageProviderConfiguration, StorageProviderFactory};
//!
//! let config = StorageProviderConfiguration::load(path)?.with_env_overrides()?;
//! let storage = StorageProviderFactory::create(&config).await?;
//! ```
//!
//! # Features
//!
//! - `s3` - Build AWS S3 clients (with pre-signed URLs) from configuration
//! - `azure` - Build Azure blob container clients from a connection string
//! - `full` - Enable all features

pub mod blob;
pub mod config;
mod error;
mod factory;
mod local;
pub mod path;
mod s3;
mod traits;

pub use blob::{BlobContainerClient, BlobContainerProvider, BlobItem, InMemoryBlobContainer};
pub use config::{
    AmazonS3StorageOptions, AzureBlobStorageOptions, FileStorageOptions, StorageKind,
    StorageProviderConfiguration,
};
pub use error::{Result, StorageError};
pub use factory::StorageProviderFactory;
pub use local::LocalFileSystemProvider;
pub use s3::{ObjectStorageProvider, S3Config, UrlSigner, DEFAULT_PAGE_SIZE};
pub use traits::{
    bytes_stream, collect_stream, ByteStream, SearchScope, SizeUnit, StorageProvider,
    DELETE_CONCURRENCY, SIGNED_URL_EXPIRY,
};

#[cfg(feature = "azure")]
pub use blob::AzureBlobContainer;

// Re-export bytes and the cancellation token for convenience
pub use bytes::Bytes;
pub use tokio_util::sync::CancellationToken;
