//! Adapter configuration.

use serde::Deserialize;
use std::time::Duration;

/// Metadata cache settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Serve metadata, size and type lookups from memory. Off by default.
    pub enabled: bool,
    /// Age after which cached data is re-resolved. `None` keeps entries
    /// for the life of the process. Lock and property managers never expire.
    #[serde(with = "humantime_serde")]
    pub ttl: Option<Duration>,
}

/// When a write is acknowledged relative to its blob upload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Upload the blob, then stamp the record, then acknowledge.
    #[default]
    Ordered,
    /// Stamp the record and acknowledge; the upload runs in the background.
    Detached,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdapterConfig {
    pub cache: CacheConfig,
    pub write_mode: WriteMode,
}
