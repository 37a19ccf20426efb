//! Storage provider configuration.
//!
//! One backend is selected per process. Keys are snake_case; the PascalCase
//! spellings used by older configuration files are accepted as aliases.
//!
//! # Configuration Examples
//!
//! ## Local Storage
//!
//! ```toml
//! use_storage = "FileStorage"
//!
//! [file_storage]
//! root_path = "~/.cross-storage/files"
//! ```
//!
//! ## S3 Storage
//!
//! ```toml
//! use_storage = "AmazonS3Storage"
//!
//! [amazon_s3_storage]
//! access_key = "AKIA..."
//! secret_key = "..."
//! region = "eu-west-1"
//! bucket_name = "user-uploads"
//! ```
//!
//! ## Azure Blob Storage
//!
//! ```toml
//! UseStorage = "AzureBlobStorage"
//!
//! [AzureBlobStorage]
//! ConnectionString = "DefaultEndpointsProtocol=https;AccountName=...;AccountKey=...;EndpointSuffix=core.windows.net"
//! ContainerName = "uploads"
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Result, StorageError};
use crate::s3::S3Config;

/// Environment variable selecting the backend.
pub const ENV_USE_STORAGE: &str = "CROSS_STORAGE_USE_STORAGE";
/// Environment variable overriding the local root path.
pub const ENV_ROOT_PATH: &str = "CROSS_STORAGE_ROOT_PATH";
pub const ENV_S3_ACCESS_KEY: &str = "CROSS_STORAGE_S3_ACCESS_KEY";
pub const ENV_S3_SECRET_KEY: &str = "CROSS_STORAGE_S3_SECRET_KEY";
pub const ENV_S3_REGION: &str = "CROSS_STORAGE_S3_REGION";
pub const ENV_S3_BUCKET: &str = "CROSS_STORAGE_S3_BUCKET";
pub const ENV_AZURE_CONNECTION_STRING: &str = "CROSS_STORAGE_AZURE_CONNECTION_STRING";
pub const ENV_AZURE_CONTAINER: &str = "CROSS_STORAGE_AZURE_CONTAINER";

/// Backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum StorageKind {
    FileStorage,
    AzureBlobStorage,
    AmazonS3Storage,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageKind::FileStorage => "FileStorage",
            StorageKind::AzureBlobStorage => "AzureBlobStorage",
            StorageKind::AmazonS3Storage => "AmazonS3Storage",
        };
        f.write_str(name)
    }
}

impl FromStr for StorageKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "filestorage" => Ok(StorageKind::FileStorage),
            "azureblobstorage" => Ok(StorageKind::AzureBlobStorage),
            "amazons3storage" => Ok(StorageKind::AmazonS3Storage),
            other => Err(StorageError::Config(format!(
                "unknown storage selector '{}'. Use 'FileStorage', 'AzureBlobStorage' or 'AmazonS3Storage'",
                other
            ))),
        }
    }
}

/// Local filesystem options.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FileStorageOptions {
    /// Root directory; `~` and relative paths are resolved at construction
    #[serde(alias = "DirectoryName", alias = "RootPath")]
    pub root_path: PathBuf,
}

/// S3-compatible bucket options.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AmazonS3StorageOptions {
    #[serde(default, alias = "AccessKey")]
    pub access_key: Option<String>,

    #[serde(default, alias = "SecretKey")]
    pub secret_key: Option<String>,

    /// AWS region
    #[serde(default = "default_region", alias = "Region")]
    pub region: String,

    #[serde(default, alias = "BucketName", alias = "bucket")]
    pub bucket_name: String,

    /// Custom endpoint (for MinIO, etc.)
    #[serde(default, alias = "Endpoint")]
    pub endpoint: Option<String>,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl From<&AmazonS3StorageOptions> for S3Config {
    fn from(options: &AmazonS3StorageOptions) -> Self {
        let mut config = match &options.endpoint {
            Some(endpoint) => {
                let mut config = S3Config::minio(&options.bucket_name, endpoint);
                config.region = options.region.clone();
                config.allow_http = endpoint.starts_with("http://");
                config
            }
            None => S3Config::aws(&options.bucket_name, &options.region),
        };
        if let (Some(key), Some(secret)) = (&options.access_key, &options.secret_key) {
            config = config.with_credentials(key, secret);
        }
        config
    }
}

/// Azure blob container options.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AzureBlobStorageOptions {
    #[serde(default, alias = "ConnectionString")]
    pub connection_string: String,

    #[serde(default, alias = "ContainerName")]
    pub container_name: String,
}

/// Provider selection plus one options block per backend.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StorageProviderConfiguration {
    #[serde(default, alias = "UseStorage")]
    pub use_storage: Option<StorageKind>,

    #[serde(default, alias = "FileStorage")]
    pub file_storage: Option<FileStorageOptions>,

    #[serde(default, alias = "AmazonS3Storage")]
    pub amazon_s3_storage: Option<AmazonS3StorageOptions>,

    #[serde(default, alias = "AzureBlobStorage")]
    pub azure_blob_storage: Option<AzureBlobStorageOptions>,
}

impl StorageProviderConfiguration {
    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| StorageError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StorageError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Apply `CROSS_STORAGE_*` environment variables on top of this configuration.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        self.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(self)
    }

    /// Apply overrides from an arbitrary variable source.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(selector) = lookup(ENV_USE_STORAGE) {
            self.use_storage = Some(selector.parse()?);
        }

        if let Some(root) = lookup(ENV_ROOT_PATH) {
            self.file_storage = Some(FileStorageOptions {
                root_path: PathBuf::from(root),
            });
        }

        let s3_vars = [ENV_S3_ACCESS_KEY, ENV_S3_SECRET_KEY, ENV_S3_REGION, ENV_S3_BUCKET];
        if s3_vars.iter().any(|name| lookup(name).is_some()) {
            let s3 = self.amazon_s3_storage.get_or_insert_with(|| AmazonS3StorageOptions {
                region: default_region(),
                ..Default::default()
            });
            if let Some(v) = lookup(ENV_S3_ACCESS_KEY) {
                s3.access_key = Some(v);
            }
            if let Some(v) = lookup(ENV_S3_SECRET_KEY) {
                s3.secret_key = Some(v);
            }
            if let Some(v) = lookup(ENV_S3_REGION) {
                s3.region = v;
            }
            if let Some(v) = lookup(ENV_S3_BUCKET) {
                s3.bucket_name = v;
            }
        }

        let azure_vars = [ENV_AZURE_CONNECTION_STRING, ENV_AZURE_CONTAINER];
        if azure_vars.iter().any(|name| lookup(name).is_some()) {
            let azure = self.azure_blob_storage.get_or_insert_with(Default::default);
            if let Some(v) = lookup(ENV_AZURE_CONNECTION_STRING) {
                azure.connection_string = v;
            }
            if let Some(v) = lookup(ENV_AZURE_CONTAINER) {
                azure.container_name = v;
            }
        }

        Ok(())
    }

    /// Check that the selected backend has a complete options block.
    pub fn validate(&self) -> Result<StorageKind> {
        let kind = self
            .use_storage
            .ok_or_else(|| StorageError::Config("no storage backend selected".to_string()))?;

        match kind {
            StorageKind::FileStorage => {
                let options = self.file_options()?;
                if options.root_path.as_os_str().is_empty() {
                    return Err(StorageError::Config("file_storage.root_path is empty".to_string()));
                }
            }
            StorageKind::AmazonS3Storage => {
                let options = self.s3_options()?;
                if options.bucket_name.is_empty() {
                    return Err(StorageError::Config(
                        "amazon_s3_storage.bucket_name is empty".to_string(),
                    ));
                }
                if options.access_key.is_some() != options.secret_key.is_some() {
                    return Err(StorageError::Config(
                        "amazon_s3_storage needs both access_key and secret_key".to_string(),
                    ));
                }
            }
            StorageKind::AzureBlobStorage => {
                let options = self.azure_options()?;
                if options.connection_string.is_empty() || options.container_name.is_empty() {
                    return Err(StorageError::Config(
                        "azure_blob_storage needs connection_string and container_name".to_string(),
                    ));
                }
            }
        }

        Ok(kind)
    }

    pub fn file_options(&self) -> Result<&FileStorageOptions> {
        self.file_storage
            .as_ref()
            .ok_or_else(|| missing_block(StorageKind::FileStorage))
    }

    pub fn s3_options(&self) -> Result<&AmazonS3StorageOptions> {
        self.amazon_s3_storage
            .as_ref()
            .ok_or_else(|| missing_block(StorageKind::AmazonS3Storage))
    }

    pub fn azure_options(&self) -> Result<&AzureBlobStorageOptions> {
        self.azure_blob_storage
            .as_ref()
            .ok_or_else(|| missing_block(StorageKind::AzureBlobStorage))
    }
}

fn missing_block(kind: StorageKind) -> StorageError {
    StorageError::Config(format!("{} is selected but its options are missing", kind))
}

/// Expand `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> Result<PathBuf> {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| StorageError::Config("Cannot determine home directory".to_string()))?;
        Ok(home.join(rest))
    } else if s == "~" {
        dirs::home_dir()
            .ok_or_else(|| StorageError::Config("Cannot determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_snake_case() {
        let config = StorageProviderConfiguration::from_toml_str(
            r#"
            use_storage = "AmazonS3Storage"

            [amazon_s3_storage]
            access_key = "key"
            secret_key = "secret"
            bucket_name = "uploads"
            "#,
        )
        .unwrap();

        assert_eq!(config.validate().unwrap(), StorageKind::AmazonS3Storage);
        let s3 = config.s3_options().unwrap();
        assert_eq!(s3.region, "us-east-1");
        assert_eq!(s3.bucket_name, "uploads");
    }

    #[test]
    fn test_parse_pascal_case_aliases() {
        let config = StorageProviderConfiguration::from_toml_str(
            r#"
            UseStorage = "FileStorage"

            [FileStorage]
            DirectoryName = "files"
            "#,
        )
        .unwrap();

        assert_eq!(config.validate().unwrap(), StorageKind::FileStorage);
        assert_eq!(config.file_options().unwrap().root_path, PathBuf::from("files"));
    }

    #[test]
    fn test_unknown_selector_fails() {
        let result = StorageProviderConfiguration::from_toml_str(r#"use_storage = "FloppyDisk""#);
        assert!(matches!(result, Err(StorageError::Config(_))));

        assert!("FloppyDisk".parse::<StorageKind>().is_err());
        assert_eq!(
            "amazons3storage".parse::<StorageKind>().unwrap(),
            StorageKind::AmazonS3Storage
        );
    }

    #[test]
    fn test_missing_selector_or_block() {
        let empty = StorageProviderConfiguration::default();
        assert!(matches!(empty.validate(), Err(StorageError::Config(_))));

        let config = StorageProviderConfiguration {
            use_storage: Some(StorageKind::AzureBlobStorage),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("AzureBlobStorage is selected"));
    }

    #[test]
    fn test_s3_requires_key_pair() {
        let config = StorageProviderConfiguration {
            use_storage: Some(StorageKind::AmazonS3Storage),
            amazon_s3_storage: Some(AmazonS3StorageOptions {
                access_key: Some("key".to_string()),
                bucket_name: "b".to_string(),
                region: default_region(),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_USE_STORAGE, "AzureBlobStorage"),
            (ENV_AZURE_CONNECTION_STRING, "UseDevelopmentStorage=true"),
            (ENV_AZURE_CONTAINER, "media"),
            (ENV_ROOT_PATH, "/srv/files"),
        ]
        .into_iter()
        .collect();

        let mut config = StorageProviderConfiguration::default();
        config
            .apply_overrides(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.validate().unwrap(), StorageKind::AzureBlobStorage);
        assert_eq!(config.azure_options().unwrap().container_name, "media");
        assert_eq!(
            config.file_options().unwrap().root_path,
            PathBuf::from("/srv/files")
        );
        assert!(config.amazon_s3_storage.is_none());
    }

    #[test]
    fn test_bad_selector_override() {
        let mut config = StorageProviderConfiguration::default();
        let result = config.apply_overrides(|name| {
            (name == ENV_USE_STORAGE).then(|| "Tape".to_string())
        });
        assert!(matches!(result, Err(StorageError::Config(_))));
    }

    #[test]
    fn test_s3_config_from_options() {
        let options = AmazonS3StorageOptions {
            access_key: Some("minioadmin".to_string()),
            secret_key: Some("minioadmin".to_string()),
            region: "eu-north-1".to_string(),
            bucket_name: "local".to_string(),
            endpoint: Some("http://localhost:9000".to_string()),
        };

        let config = S3Config::from(&options);
        assert!(config.force_path_style);
        assert!(config.allow_http);
        assert_eq!(config.region, "eu-north-1");
        assert_eq!(config.secret_access_key.as_deref(), Some("minioadmin"));
    }

    #[test]
    fn test_expand_tilde() {
        let path = PathBuf::from("/absolute/path");
        assert_eq!(expand_tilde(&path).unwrap(), path);

        let expanded = expand_tilde(Path::new("~/files")).unwrap();
        assert!(!expanded.to_string_lossy().starts_with('~'));
    }
}
