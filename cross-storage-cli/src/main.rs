use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cross_storage::{
    BlobContainerProvider, InMemoryBlobContainer, SizeUnit, StorageProvider,
    StorageProviderConfiguration, StorageProviderFactory,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "cross-storage")]
#[command(about = "Cross-storage CLI - file operations against the configured backend")]
#[command(version)]
struct Cli {
    /// TOML configuration file; environment overrides apply on top
    #[arg(short, long, global = true, env = "CROSS_STORAGE_CONFIG")]
    config: Option<PathBuf>,

    /// Use a throwaway in-memory blob container instead of the configured backend
    #[arg(long, global = true)]
    in_memory: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Upload a local file or literal text to a key
    Put {
        key: String,

        /// Local file to upload
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Literal text to upload instead of a file
        #[arg(short, long, conflicts_with = "file")]
        text: Option<String>,

        /// Content type recorded with the object
        #[arg(long)]
        content_type: Option<String>,
    },

    /// Download a key to stdout or a file
    Get {
        key: String,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List keys under a directory
    Ls {
        #[arg(default_value = "")]
        root: String,

        /// File name pattern: `*`, `*.jpg|*.png` or a regular expression
        #[arg(short, long, default_value = "*")]
        pattern: String,

        /// Include nested directories
        #[arg(short, long)]
        recursive: bool,
    },

    /// Delete one key
    Rm { key: String },

    /// Delete every key starting with a prefix
    RmPrefix { prefix: String },

    /// Copy a key
    Cp { from: String, to: String },

    /// Move a key
    Mv { from: String, to: String },

    /// Create a directory (no-op on flat backends)
    Mkdir { path: String },

    /// Delete a directory's content
    Rmdir {
        path: String,

        /// Delete nested directories too
        #[arg(short, long)]
        recursive: bool,
    },

    /// Show the size of a key
    Size {
        key: String,

        /// Unit: byte, kb, mb, gb, tb, pb, eb
        #[arg(short, long, default_value = "byte")]
        unit: SizeUnit,
    },

    /// Print the base URL, or a share link for a key
    Url { key: Option<String> },

    /// List files directly in a directory whose name matches a regex
    Mask {
        path: String,
        mask: String,
    },

    /// List every key starting with a prefix
    Search {
        #[arg(default_value = "")]
        prefix: String,
    },

    /// Restore a soft-deleted key
    Undelete { key: String },

    /// Run every operation once against the backend
    Demo {
        /// Sample file uploaded by the demo
        #[arg(long)]
        sample: Option<PathBuf>,
    },
}

async fn open_storage(cli: &Cli) -> Result<Arc<dyn StorageProvider>> {
    if cli.in_memory {
        let container = Arc::new(InMemoryBlobContainer::new("cli"));
        return Ok(Arc::new(BlobContainerProvider::new(container).await?));
    }

    let config = match &cli.config {
        Some(path) => StorageProviderConfiguration::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => StorageProviderConfiguration::default(),
    }
    .with_env_overrides()?;

    StorageProviderFactory::create(&config)
        .await
        .context("Failed to create storage provider")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let storage = open_storage(&cli).await?;
    tracing::debug!(backend = storage.backend_name(), "Storage opened");

    let outcome = match cli.command {
        Commands::Put {
            key,
            file,
            text,
            content_type,
        } => commands::run_put(storage.as_ref(), &key, file, text, content_type.as_deref()).await,
        Commands::Get { key, output } => commands::run_get(storage.as_ref(), &key, output).await,
        Commands::Ls {
            root,
            pattern,
            recursive,
        } => commands::run_ls(storage.as_ref(), &root, &pattern, recursive).await,
        Commands::Rm { key } => commands::run_rm(storage.as_ref(), &key).await,
        Commands::RmPrefix { prefix } => commands::run_rm_prefix(storage.as_ref(), &prefix).await,
        Commands::Cp { from, to } => commands::run_cp(storage.as_ref(), &from, &to).await,
        Commands::Mv { from, to } => commands::run_mv(storage.as_ref(), &from, &to).await,
        Commands::Mkdir { path } => commands::run_mkdir(storage.as_ref(), &path).await,
        Commands::Rmdir { path, recursive } => {
            commands::run_rmdir(storage.as_ref(), &path, recursive).await
        }
        Commands::Size { key, unit } => commands::run_size(storage.as_ref(), &key, unit).await,
        Commands::Url { key } => commands::run_url(storage.as_ref(), key.as_deref()).await,
        Commands::Mask { path, mask } => commands::run_mask(storage.as_ref(), &path, &mask).await,
        Commands::Search { prefix } => commands::run_search(storage.as_ref(), &prefix).await,
        Commands::Undelete { key } => commands::run_undelete(storage.as_ref(), &key).await,
        Commands::Demo { sample } => commands::run_demo(storage.as_ref(), sample).await,
    };

    storage.close().await?;
    outcome
}
