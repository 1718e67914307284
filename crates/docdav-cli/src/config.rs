//! Configuration file support for the docdav binary.
//!
//! Configuration is read from `--config FILE` (or `DOCDAV_CONFIG`), falling
//! back to `~/.config/docdav/config.toml` (XDG standard) or
//! `~/Library/Application Support/com.docdav.docdav/config.toml` on macOS.
//! A missing default file means built-in defaults: in-memory stores on
//! `127.0.0.1:1901`.
//!
//! # Example configuration
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0"
//! port = 1901
//! prefix = "/webdav"
//! upload_url_ttl = "60s"
//!
//! [cache]
//! enabled = true
//! ttl = "10m"
//!
//! [write]
//! mode = "ordered"
//!
//! [records]
//! backend = "sqlite"
//! path = "/var/lib/docdav/documents.db"
//!
//! [blobs]
//! backend = "s3"
//! bucket = "documents"
//! endpoint = "http://minio:9000"
//! access_key_id = "minioadmin"
//! secret_access_key = "minioadmin"
//! force_path_style = true
//! ```

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use docdav_store::{
    BlobStore, MemoryBlobStore, MemoryRecordStore, RecordStore, S3BlobStore, S3Settings,
    SqliteRecordStore,
};
use docdav_webdav::{AdapterConfig, CacheConfig, ServerConfig, WriteMode};
use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerSection,
    pub cache: CacheConfig,
    pub write: WriteSection,
    pub records: RecordsConfig,
    pub blobs: BlobsConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub bind: IpAddr,
    pub port: u16,
    /// URL prefix of the WebDAV tree
    pub prefix: String,
    /// Validity of presigned upload URLs
    #[serde(with = "humantime_serde")]
    pub upload_url_ttl: Duration,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 1901,
            prefix: "/webdav".to_string(),
            upload_url_ttl: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WriteSection {
    pub mode: WriteMode,
}

/// Where document records live
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum RecordsConfig {
    #[default]
    Memory,
    Sqlite { path: PathBuf },
}

/// Where document content lives
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum BlobsConfig {
    #[default]
    Memory,
    S3 {
        bucket: String,
        region: Option<String>,
        endpoint: Option<String>,
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
        #[serde(default)]
        force_path_style: bool,
    },
}

impl AppConfig {
    /// Load configuration from `path`, or from the default path.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let path = config_path()?;
                if !path.exists() {
                    return Ok(Self::default());
                }
                path
            }
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn adapter_config(&self) -> AdapterConfig {
        AdapterConfig {
            cache: self.cache.clone(),
            write_mode: self.write.mode,
        }
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            port: self.server.port,
            bind_address: self.server.bind,
            webdav_prefix: self.server.prefix.clone(),
            upload_url_ttl: self.server.upload_url_ttl,
        }
    }

    /// Open the configured record store.
    pub async fn record_store(&self) -> Result<Arc<dyn RecordStore>> {
        Ok(match &self.records {
            RecordsConfig::Memory => Arc::new(MemoryRecordStore::new()),
            RecordsConfig::Sqlite { path } => Arc::new(
                SqliteRecordStore::new(path)
                    .await
                    .with_context(|| format!("Failed to open record store: {}", path.display()))?,
            ),
        })
    }

    /// Open the configured blob store.
    pub async fn blob_store(&self) -> Result<Arc<dyn BlobStore>> {
        Ok(match &self.blobs {
            BlobsConfig::Memory => Arc::new(MemoryBlobStore::new()),
            BlobsConfig::S3 {
                bucket,
                region,
                endpoint,
                access_key_id,
                secret_access_key,
                force_path_style,
            } => {
                let settings = S3Settings {
                    bucket: bucket.clone(),
                    region: region.clone(),
                    endpoint: endpoint.clone(),
                    access_key_id: access_key_id.clone(),
                    secret_access_key: secret_access_key.clone(),
                    force_path_style: *force_path_style,
                };
                Arc::new(
                    S3BlobStore::new(settings)
                        .await
                        .with_context(|| format!("Failed to configure S3 bucket: {bucket}"))?,
                )
            }
        })
    }
}

/// Get the path to the configuration file.
///
/// Uses XDG config directory on Linux, Application Support on macOS.
pub fn config_path() -> Result<PathBuf> {
    let base_dirs = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;

    #[cfg(target_os = "macos")]
    {
        let config_dir = base_dirs
            .home_dir()
            .join("Library/Application Support/com.docdav.docdav");
        Ok(config_dir.join("config.toml"))
    }

    #[cfg(not(target_os = "macos"))]
    {
        let config_dir = base_dirs.config_dir().join("docdav");
        Ok(config_dir.join("config.toml"))
    }
}
