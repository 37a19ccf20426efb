//! S3-compatible object storage backend.
//!
//! Uses the `object_store` crate for S3, MinIO, and other S3-compatible services.
//! Keys map one-to-one onto object names; "directories" only exist as key
//! prefixes.
//!
//! # Configuration
//!
//! ```toml
//! [amazon_s3_storage]
//! bucket_name = "user-uploads"
//! region = "eu-west-1"
//! access_key = "AKIA..."
//! secret_key = "..."
//!
//! # Optional: For MinIO or other S3-compatible services
//! endpoint = "http://localhost:9000"
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use object_store::path::Path as ObjectPath;
use object_store::{
    Attribute, Attributes, ObjectMeta, ObjectStore, PutMultipartOpts, PutOptions, PutPayload,
    WriteMultipart,
};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::error::{Result, StorageError};
use crate::path::{directory_prefix, enclosing_directory, is_direct_child, normalize_key, NamePattern};
use crate::traits::{
    delete_all, ensure_not_cancelled, ByteStream, SearchScope, StorageProvider, SIGNED_URL_EXPIRY,
};

/// Number of keys requested per listing page.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

const UPLOAD_CONCURRENCY: usize = 8;

/// Configuration for S3 storage.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// S3 bucket name
    pub bucket: String,
    /// AWS region
    pub region: String,
    /// Optional custom endpoint (for MinIO, etc.)
    pub endpoint: Option<String>,
    /// Use path-style requests (required for MinIO)
    pub force_path_style: bool,
    /// Optional access key (if not using IAM/env credentials)
    pub access_key_id: Option<String>,
    /// Optional secret key
    pub secret_access_key: Option<String>,
    /// Allow HTTP (non-HTTPS) connections
    pub allow_http: bool,
}

impl S3Config {
    /// Create a new S3 configuration for AWS.
    pub fn aws(bucket: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            region: region.into(),
            endpoint: None,
            force_path_style: false,
            access_key_id: None,
            secret_access_key: None,
            allow_http: false,
        }
    }

    /// Create configuration for MinIO or other S3-compatible services.
    pub fn minio(bucket: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            region: "us-east-1".to_string(),
            endpoint: Some(endpoint.into()),
            force_path_style: true,
            access_key_id: None,
            secret_access_key: None,
            allow_http: true,
        }
    }

    /// Set explicit credentials.
    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.access_key_id = Some(access_key_id.into());
        self.secret_access_key = Some(secret_access_key.into());
        self
    }

    /// Public address of the bucket.
    pub fn bucket_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), self.bucket),
            None => format!("https://{}.s3.{}.amazonaws.com", self.bucket, self.region),
        }
    }
}

/// Issues time-limited download links for object paths.
#[async_trait]
pub trait UrlSigner: Send + Sync {
    /// Sign a GET request for `path` valid for `expires_in`.
    async fn sign_get(&self, path: &ObjectPath, expires_in: Duration) -> Result<String>;
}

#[cfg(feature = "s3")]
#[async_trait]
impl UrlSigner for object_store::aws::AmazonS3 {
    async fn sign_get(&self, path: &ObjectPath, expires_in: Duration) -> Result<String> {
        use object_store::signer::Signer;

        let url = self.signed_url(http::Method::GET, path, expires_in).await?;
        Ok(url.to_string())
    }
}

/// S3-compatible object storage backend.
pub struct ObjectStorageProvider {
    store: RwLock<Option<Arc<dyn ObjectStore>>>,
    signer: Option<Arc<dyn UrlSigner>>,
    base_url: String,
    page_size: usize,
    cancel: CancellationToken,
}

impl ObjectStorageProvider {
    /// Create a new S3 storage backend from configuration.
    #[cfg(feature = "s3")]
    pub fn new(config: S3Config) -> Result<Self> {
        use object_store::aws::AmazonS3Builder;

        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(&config.bucket)
            .with_region(&config.region)
            .with_allow_http(config.allow_http);

        if let Some(endpoint) = &config.endpoint {
            builder = builder.with_endpoint(endpoint);
        }

        if config.force_path_style {
            builder = builder.with_virtual_hosted_style_request(false);
        }

        if let (Some(key_id), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
            builder = builder
                .with_access_key_id(key_id)
                .with_secret_access_key(secret);
        }

        let s3 = Arc::new(
            builder
                .build()
                .map_err(|e| StorageError::Config(e.to_string()))?,
        );

        info!(bucket = %config.bucket, region = %config.region, "S3 storage provider ready");
        Ok(Self::from_store(s3.clone(), config.bucket_url()).with_signer(s3))
    }

    /// Create from an existing ObjectStore instance.
    pub fn from_store(store: Arc<dyn ObjectStore>, base_url: impl Into<String>) -> Self {
        Self {
            store: RwLock::new(Some(store)),
            signer: None,
            base_url: base_url.into(),
            page_size: DEFAULT_PAGE_SIZE,
            cancel: CancellationToken::new(),
        }
    }

    /// Attach the signer used for share links.
    pub fn with_signer(mut self, signer: Arc<dyn UrlSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Override the listing page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Attach a cancellation token checked by bulk operations.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    fn store(&self) -> Result<Arc<dyn ObjectStore>> {
        self.store.read().clone().ok_or(StorageError::Closed)
    }

    /// Convert a key to an object_store path.
    fn to_object_path(key: &str) -> Result<ObjectPath> {
        let normalized = normalize_key(key);
        if normalized.is_empty() || normalized.ends_with('/') {
            return Err(StorageError::InvalidPath(key.to_string()));
        }
        ObjectPath::parse(&normalized).map_err(|e| StorageError::InvalidPath(e.to_string()))
    }

    /// Every object key starting with `prefix`, fetched page by page.
    ///
    /// Listing is segment based, so the enclosing directory is listed and
    /// filtered by the full string prefix.
    async fn list_keys(&self, prefix: &str, operation: &str) -> Result<Vec<String>> {
        let store = self.store()?;
        let dir = enclosing_directory(prefix).trim_end_matches('/');
        let list_prefix = if dir.is_empty() {
            None
        } else {
            Some(ObjectPath::parse(dir).map_err(|e| StorageError::InvalidPath(e.to_string()))?)
        };

        let mut keys = Vec::new();
        let mut continuation: Option<ObjectPath> = None;
        let mut pages = 0usize;
        loop {
            ensure_not_cancelled(&self.cancel, operation)?;

            let listing = match &continuation {
                Some(offset) => store.list_with_offset(list_prefix.as_ref(), offset),
                None => store.list(list_prefix.as_ref()),
            };
            let page: Vec<ObjectMeta> = listing.take(self.page_size).try_collect().await?;
            let fetched = page.len();
            pages += 1;
            continuation = page.last().map(|meta| meta.location.clone());

            keys.extend(
                page.into_iter()
                    .map(|meta| meta.location.to_string())
                    .filter(|key| !key.ends_with('/') && key.starts_with(prefix)),
            );

            if fetched < self.page_size {
                break;
            }
        }

        debug!(prefix, pages, keys = keys.len(), "Listed objects");
        Ok(keys)
    }
}

impl std::fmt::Debug for ObjectStorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStorageProvider")
            .field("base_url", &self.base_url)
            .field("page_size", &self.page_size)
            .field("signed", &self.signer.is_some())
            .finish()
    }
}

fn content_attributes(content_type: Option<&str>) -> Attributes {
    let mut attributes = Attributes::new();
    if let Some(content_type) = content_type {
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
    }
    attributes
}

fn not_found(key: &str, e: object_store::Error) -> StorageError {
    match e {
        object_store::Error::NotFound { .. } => StorageError::NotFound(key.to_string()),
        e => StorageError::from(e),
    }
}

#[async_trait]
impl StorageProvider for ObjectStorageProvider {
    #[instrument(skip(self), fields(key = %key))]
    async fn read_binary(&self, key: &str) -> Result<Bytes> {
        let obj_path = Self::to_object_path(key)?;
        debug!("Reading from s3://{:?}", obj_path);

        let result = self.store()?.get(&obj_path).await.map_err(|e| not_found(key, e))?;
        Ok(result.bytes().await?)
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn open_read_stream(&self, key: &str) -> Result<ByteStream> {
        let obj_path = Self::to_object_path(key)?;
        let result = self.store()?.get(&obj_path).await.map_err(|e| not_found(key, e))?;
        Ok(result.into_stream().map_err(StorageError::from).boxed())
    }

    #[instrument(skip(self, data), fields(key = %key, size = data.len()))]
    async fn write_object(&self, key: &str, data: Bytes, content_type: Option<&str>) -> Result<()> {
        let obj_path = Self::to_object_path(key)?;
        debug!("Writing {} bytes to s3://{:?}", data.len(), obj_path);

        let opts = PutOptions {
            attributes: content_attributes(content_type),
            ..Default::default()
        };
        self.store()?
            .put_opts(&obj_path, PutPayload::from(data), opts)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, content), fields(key = %key))]
    async fn write_stream(
        &self,
        key: &str,
        mut content: ByteStream,
        content_type: Option<&str>,
    ) -> Result<()> {
        let obj_path = Self::to_object_path(key)?;
        let opts = PutMultipartOpts {
            attributes: content_attributes(content_type),
            ..Default::default()
        };
        let upload = self.store()?.put_multipart_opts(&obj_path, opts).await?;
        let mut writer = WriteMultipart::new(upload);

        let mut total = 0usize;
        loop {
            match content.try_next().await {
                Ok(Some(chunk)) => {
                    writer.wait_for_capacity(UPLOAD_CONCURRENCY).await?;
                    total += chunk.len();
                    writer.write(&chunk);
                }
                Ok(None) => break,
                Err(e) => {
                    writer.abort().await?;
                    return Err(e);
                }
            }
        }

        writer.finish().await?;
        debug!("Streamed {} bytes to s3://{:?}", total, obj_path);
        Ok(())
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn exists(&self, key: &str) -> Result<bool> {
        let store = self.store()?;
        // Directory-style and empty keys never name an object.
        let obj_path = match Self::to_object_path(key) {
            Ok(path) => path,
            Err(StorageError::InvalidPath(_)) => return Ok(false),
            Err(e) => return Err(e),
        };

        match store.head(&obj_path).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::from(e)),
        }
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn delete(&self, key: &str) -> Result<()> {
        let obj_path = Self::to_object_path(key)?;
        debug!("Deleting s3://{:?}", obj_path);

        match self.store()?.delete(&obj_path).await {
            Ok(()) => Ok(()),
            Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(StorageError::from(e)),
        }
    }

    #[instrument(skip(self))]
    async fn delete_by_prefix(&self, prefix: Option<&str>) -> Result<usize> {
        let prefix = match prefix.map(normalize_key) {
            Some(p) if !p.is_empty() => p,
            _ => return Ok(0),
        };

        let keys = self.list_keys(&prefix, "delete_by_prefix").await?;
        let deleted = delete_all(keys, &self.cancel, "delete_by_prefix", |key| async move {
            self.delete(&key).await
        })
        .await?;
        info!(prefix = %prefix, deleted, "Deleted objects by prefix");
        Ok(deleted)
    }

    #[instrument(skip(self), fields(from = %from, to = %to))]
    async fn copy(&self, from: &str, to: &str) -> Result<()> {
        let from_path = Self::to_object_path(from)?;
        let to_path = Self::to_object_path(to)?;
        debug!("Copying s3://{:?} to s3://{:?}", from_path, to_path);

        self.store()?
            .copy(&from_path, &to_path)
            .await
            .map_err(|e| not_found(from, e))
    }

    #[instrument(skip(self))]
    async fn search(&self, prefix: &str) -> Result<Vec<String>> {
        self.list_keys(&normalize_key(prefix), "search").await
    }

    #[instrument(skip(self))]
    async fn list_paths(&self, root: &str, pattern: &str, scope: SearchScope) -> Result<Vec<String>> {
        let pattern = NamePattern::parse(pattern)?;
        let prefix = directory_prefix(root);

        Ok(self
            .list_keys(&prefix, "list_paths")
            .await?
            .into_iter()
            .filter(|key| scope == SearchScope::AllLevels || is_direct_child(key, &prefix))
            .filter(|key| pattern.matches(key))
            .collect())
    }

    async fn create_directory(&self, path: &str) -> Result<()> {
        self.store()?;
        debug!(path, "Directories are implicit in object storage");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_directory(&self, path: &str, recursive: bool) -> Result<()> {
        let prefix = directory_prefix(path);
        let keys: Vec<String> = self
            .list_keys(&prefix, "delete_directory")
            .await?
            .into_iter()
            .filter(|key| recursive || is_direct_child(key, &prefix))
            .collect();

        let deleted = delete_all(keys, &self.cancel, "delete_directory", |key| async move {
            self.delete(&key).await
        })
        .await?;
        info!(path, recursive, deleted, "Deleted directory content");
        Ok(())
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn size(&self, key: &str) -> Result<u64> {
        let obj_path = Self::to_object_path(key)?;
        let meta = self
            .store()?
            .head(&obj_path)
            .await
            .map_err(|e| not_found(key, e))?;
        Ok(meta.size as u64)
    }

    async fn base_url(&self) -> Result<String> {
        self.store()?;
        Ok(self.base_url.clone())
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn uri(&self, key: &str) -> Result<String> {
        self.store()?;
        let signer = self
            .signer
            .as_ref()
            .ok_or_else(|| StorageError::unsupported(self.backend_name(), "uri"))?;
        signer
            .sign_get(&Self::to_object_path(key)?, SIGNED_URL_EXPIRY)
            .await
    }

    async fn close(&self) -> Result<()> {
        if self.store.write().take().is_some() {
            info!(base_url = %self.base_url, "S3 storage provider closed");
        }
        Ok(())
    }

    fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::collect_stream;
    use futures::stream;
    use object_store::memory::InMemory;
    use std::collections::HashSet;

    fn create_test_storage() -> ObjectStorageProvider {
        ObjectStorageProvider::from_store(Arc::new(InMemory::new()), "memory://test-bucket")
            .with_page_size(2)
    }

    #[derive(Debug)]
    struct FixedSigner;

    #[async_trait]
    impl UrlSigner for FixedSigner {
        async fn sign_get(&self, path: &ObjectPath, expires_in: Duration) -> Result<String> {
            Ok(format!(
                "https://signed.example/{}?expires={}",
                path,
                expires_in.as_secs()
            ))
        }
    }

    #[test]
    fn test_s3_config_aws() {
        let config = S3Config::aws("my-bucket", "us-west-2");
        assert_eq!(config.bucket, "my-bucket");
        assert_eq!(config.region, "us-west-2");
        assert!(!config.force_path_style);
        assert!(config.endpoint.is_none());
        assert_eq!(
            config.bucket_url(),
            "https://my-bucket.s3.us-west-2.amazonaws.com"
        );
    }

    #[test]
    fn test_s3_config_minio() {
        let config = S3Config::minio("local-bucket", "http://localhost:9000/")
            .with_credentials("minioadmin", "minioadmin");
        assert_eq!(config.bucket, "local-bucket");
        assert!(config.force_path_style);
        assert_eq!(config.access_key_id.as_deref(), Some("minioadmin"));
        assert_eq!(config.bucket_url(), "http://localhost:9000/local-bucket");
    }

    #[test]
    fn test_to_object_path() {
        let path = ObjectStorageProvider::to_object_path(r"./avatars\logo.png").unwrap();
        assert_eq!(path.as_ref(), "avatars/logo.png");

        assert!(ObjectStorageProvider::to_object_path("").is_err());
        assert!(ObjectStorageProvider::to_object_path("folder/").is_err());
    }

    #[tokio::test]
    async fn test_write_read_with_content_type() {
        let storage = create_test_storage();

        storage
            .write_object("docs/a.json", Bytes::from("{}"), Some("application/json"))
            .await
            .unwrap();
        assert_eq!(storage.read("docs/a.json").await.unwrap(), "{}");

        let store = storage.store().unwrap();
        let result = store.get(&ObjectPath::from("docs/a.json")).await.unwrap();
        assert_eq!(
            result.attributes.get(&Attribute::ContentType).map(|v| v.as_ref()),
            Some("application/json")
        );
    }

    #[tokio::test]
    async fn test_read_not_found() {
        let storage = create_test_storage();

        let result = storage.read_binary("missing.bin").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
        assert!(!storage.exists("missing.bin").await.unwrap());
        assert!(matches!(
            storage.size("missing.bin").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_exists_on_directory_keys() {
        let storage = create_test_storage();
        storage.write("folder/a.txt", "a").await.unwrap();

        assert!(!storage.exists("folder/").await.unwrap());
        assert!(!storage.exists("folder").await.unwrap());
        assert!(!storage.exists("").await.unwrap());
        assert!(storage.exists("folder/a.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_stream_roundtrip() {
        let storage = create_test_storage();

        let chunks: Vec<Result<Bytes>> = vec![Ok(Bytes::from("part one ")), Ok(Bytes::from("part two"))];
        storage
            .write_stream("streams/a.txt", stream::iter(chunks).boxed(), Some("text/plain"))
            .await
            .unwrap();

        let content = storage.open_read_stream("streams/a.txt").await.unwrap();
        assert_eq!(
            collect_stream(content).await.unwrap(),
            Bytes::from("part one part two")
        );
    }

    #[tokio::test]
    async fn test_listing_crosses_pages() {
        let storage = create_test_storage();

        for i in 0..5 {
            storage.write(&format!("root/f{}.txt", i), "x").await.unwrap();
        }
        storage.write("root/sub/deep.txt", "x").await.unwrap();

        let all = storage
            .list_paths("root", "*", SearchScope::AllLevels)
            .await
            .unwrap();
        assert_eq!(all.len(), 6);

        let top = storage
            .list_paths("root/", "*.txt", SearchScope::TopLevelOnly)
            .await
            .unwrap();
        assert_eq!(top.len(), 5);
        assert!(!top.contains(&"root/sub/deep.txt".to_string()));
    }

    #[tokio::test]
    async fn test_search_string_prefix() {
        let storage = create_test_storage();

        for key in ["avatars/logo.png", "avatars/login.png", "avatars/other.png", "avatarsx/a.png"] {
            storage.write(key, "px").await.unwrap();
        }

        let found = storage.search("avatars/log").await.unwrap();
        assert_eq!(found, vec!["avatars/login.png", "avatars/logo.png"]);

        let found = storage.search("avatars").await.unwrap();
        assert_eq!(found.len(), 4);
    }

    #[tokio::test]
    async fn test_delete_by_prefix() {
        let storage = create_test_storage();

        for key in ["a/1", "a/2", "a/3", "b/1"] {
            storage.write(key, "data").await.unwrap();
        }

        assert_eq!(storage.delete_by_prefix(None).await.unwrap(), 0);
        assert_eq!(storage.delete_by_prefix(Some("a/")).await.unwrap(), 3);
        assert_eq!(storage.search("").await.unwrap(), vec!["b/1".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_directory() {
        let storage = create_test_storage();

        for key in ["dir/a.txt", "dir/b.txt", "dir/sub/c.txt", "dirx/d.txt"] {
            storage.write(key, "data").await.unwrap();
        }

        storage.delete_directory("dir", false).await.unwrap();
        assert_eq!(
            storage.search("").await.unwrap(),
            vec!["dir/sub/c.txt".to_string(), "dirx/d.txt".to_string()]
        );

        storage.delete_directory("dir", true).await.unwrap();
        assert_eq!(storage.search("").await.unwrap(), vec!["dirx/d.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_all_except() {
        let storage = create_test_storage();

        for key in ["docs/keep.txt", "docs/a.txt", "docs/b.txt"] {
            storage.write(key, "data").await.unwrap();
        }

        let keep: HashSet<String> = ["docs/keep.txt".to_string()].into_iter().collect();
        assert_eq!(storage.delete_all_except("docs", &keep).await.unwrap(), 2);
        assert_eq!(storage.search("docs").await.unwrap(), vec!["docs/keep.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_copy_and_move() {
        let storage = create_test_storage();

        storage.write("src.txt", "payload").await.unwrap();
        storage.copy("src.txt", "copy/dst.txt").await.unwrap();
        assert!(storage.exists("src.txt").await.unwrap());

        storage.move_file("copy/dst.txt", "moved.txt").await.unwrap();
        assert!(!storage.exists("copy/dst.txt").await.unwrap());
        assert_eq!(storage.read("moved.txt").await.unwrap(), "payload");

        let result = storage.copy("missing.txt", "x.txt").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_urls() {
        let storage = create_test_storage();
        assert_eq!(storage.base_url().await.unwrap(), "memory://test-bucket");
        assert!(storage.uri("a.txt").await.unwrap_err().is_unsupported());
        assert!(storage.undelete("a.txt").await.unwrap_err().is_unsupported());

        let signed = create_test_storage().with_signer(Arc::new(FixedSigner));
        assert_eq!(
            signed.uri("a/b.txt").await.unwrap(),
            "https://signed.example/a/b.txt?expires=604800"
        );
    }

    #[tokio::test]
    async fn test_create_directory_is_noop() {
        let storage = create_test_storage();
        storage.create_directory("empty/dir").await.unwrap();
        assert!(storage.search("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_close_releases_client() {
        let storage = create_test_storage();

        storage.close().await.unwrap();
        storage.close().await.unwrap();
        assert!(matches!(storage.read("a.txt").await, Err(StorageError::Closed)));
        assert!(matches!(storage.base_url().await, Err(StorageError::Closed)));
    }

    #[tokio::test]
    async fn test_cancelled_listing() {
        let token = CancellationToken::new();
        let storage = create_test_storage().with_cancellation(token.clone());
        storage.write("a/1", "x").await.unwrap();

        token.cancel();
        let result = storage.delete_by_prefix(Some("a")).await;
        assert!(matches!(result, Err(StorageError::Cancelled(_))));
        assert!(storage.exists("a/1").await.unwrap());
    }

    // Integration tests require actual S3/MinIO - run with:
    // cargo test -p cross-storage --features s3 -- --ignored
    #[cfg(feature = "s3")]
    #[tokio::test]
    #[ignore]
    async fn test_s3_integration() {
        let config = S3Config::minio("test-bucket", "http://localhost:9000")
            .with_credentials("minioadmin", "minioadmin");

        let storage = ObjectStorageProvider::new(config).unwrap();
        let data = Bytes::from("integration test data");

        storage.write_binary("it/integration.bin", data.clone()).await.unwrap();
        assert_eq!(storage.read_binary("it/integration.bin").await.unwrap(), data);
        assert!(storage.uri("it/integration.bin").await.unwrap().contains("X-Amz-Signature"));

        storage.delete("it/integration.bin").await.unwrap();
        assert!(!storage.exists("it/integration.bin").await.unwrap());
    }
}
