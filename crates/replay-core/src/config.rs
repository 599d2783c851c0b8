//! Configuration types for the replay catalog
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main catalog configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Directory holding the replay files
    ///
    /// An empty path is accepted here and reported as a configuration error
    /// by every pass, so the rest of the engine keeps running.
    #[serde(default)]
    pub replay_directory: PathBuf,

    /// Seconds between periodic passes; 0 disables the periodic timer
    ///
    /// Filesystem notifications trigger passes regardless of this setting.
    #[serde(default = "default_update_interval_secs")]
    pub update_interval_secs: u64,

    /// Participant resolver configuration
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Catalog store configuration
    #[serde(default)]
    pub catalog_store: CatalogStoreConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl CatalogConfig {
    /// Create a new configuration for the given replay directory
    pub fn new(replay_directory: impl Into<PathBuf>) -> Self {
        Self {
            replay_directory: replay_directory.into(),
            update_interval_secs: default_update_interval_secs(),
            resolver: ResolverConfig::default(),
            catalog_store: CatalogStoreConfig::default(),
            engine: EngineConfig::default(),
        }
    }

    /// Set the periodic update interval
    pub fn with_update_interval_secs(mut self, secs: u64) -> Self {
        self.update_interval_secs = secs;
        self
    }

    /// Set the resolver configuration
    pub fn with_resolver(mut self, resolver: ResolverConfig) -> Self {
        self.resolver = resolver;
        self
    }

    /// Set the catalog store configuration
    pub fn with_catalog_store(mut self, catalog_store: CatalogStoreConfig) -> Self {
        self.catalog_store = catalog_store;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.resolver.validate()?;
        self.catalog_store.validate()?;
        self.engine.validate()?;

        Ok(())
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self::new(PathBuf::new())
    }
}

/// Participant resolver configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResolverConfig {
    /// Fixed development roster (round 1 has a single known player)
    #[default]
    Development,

    /// Live roster read from PostgreSQL
    Postgres {
        /// Connection string; checked when a round is resolved, not at startup
        #[serde(default)]
        connection_string: Option<String>,
        /// Upper bound for connect + query, in seconds
        #[serde(default = "default_query_timeout_secs")]
        query_timeout_secs: u64,
    },

    /// Custom resolver
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl ResolverConfig {
    /// Validate the resolver configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ResolverConfig::Development => Ok(()),
            ResolverConfig::Postgres {
                query_timeout_secs, ..
            } => {
                if *query_timeout_secs == 0 {
                    return Err(crate::Error::config(
                        "Postgres resolver query timeout must be > 0",
                    ));
                }
                Ok(())
            }
            ResolverConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("Custom resolver factory cannot be empty"));
                }
                if config.is_null() {
                    return Err(crate::Error::config("Custom resolver config cannot be null"));
                }
                Ok(())
            }
        }
    }

    /// Get the resolver type name used for registry lookups
    pub fn type_name(&self) -> &str {
        match self {
            ResolverConfig::Development => "development",
            ResolverConfig::Postgres { .. } => "postgres",
            ResolverConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Catalog store configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CatalogStoreConfig {
    /// File-based catalog
    File {
        /// Path to the catalog file
        path: PathBuf,
    },

    /// In-memory catalog (not persistent)
    #[default]
    Memory,

    /// Custom catalog store
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl CatalogStoreConfig {
    /// Validate the catalog store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            CatalogStoreConfig::File { path } => {
                if path.as_os_str().is_empty() {
                    return Err(crate::Error::config("Catalog file path cannot be empty"));
                }
                Ok(())
            }
            CatalogStoreConfig::Memory => Ok(()),
            CatalogStoreConfig::Custom { factory, .. } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom catalog store factory cannot be empty",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the store type name used for registry lookups
    pub fn type_name(&self) -> &str {
        match self {
            CatalogStoreConfig::File { .. } => "file",
            CatalogStoreConfig::Memory => "memory",
            CatalogStoreConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Capacity of the engine event channel
    ///
    /// When full, new engine events are dropped (with a warning log).
    ///
    /// Default: 1000 events
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Capacity of the pass request channel
    ///
    /// A full request channel already guarantees a follow-up pass, so
    /// requests that do not fit are coalesced rather than queued.
    ///
    /// Default: 16 requests
    #[serde(default = "default_request_channel_capacity")]
    pub request_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        if self.request_channel_capacity == 0 {
            return Err(crate::Error::config("Request channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
            request_channel_capacity: default_request_channel_capacity(),
        }
    }
}

fn default_update_interval_secs() -> u64 {
    60
}

fn default_query_timeout_secs() -> u64 {
    30
}

fn default_event_channel_capacity() -> usize {
    1000
}

fn default_request_channel_capacity() -> usize {
    16
}
