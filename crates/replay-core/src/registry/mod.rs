//! Plugin-based component registry
//!
//! The registry lets participant resolvers and catalog stores be chosen from
//! configuration at startup, avoiding hardcoded if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use replay_core::registry::ComponentRegistry;
//! use replay_core::config::ResolverConfig;
//!
//! let registry = ComponentRegistry::with_builtins();
//!
//! // Plugin crates register themselves
//! replay_roster_postgres::register(&registry);
//!
//! let resolver = registry.create_resolver(&ResolverConfig::Development)?;
//! ```

use crate::catalog::{FileCatalogStoreFactory, MemoryCatalogStoreFactory};
use crate::config::{CatalogStoreConfig, ResolverConfig};
use crate::error::{Error, Result};
use crate::resolver::FixedParticipantResolverFactory;
use crate::traits::{CatalogStore, CatalogStoreFactory, ParticipantResolver, ParticipantResolverFactory};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Registry of resolver and catalog store factories
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct ComponentRegistry {
    /// Registered participant resolver factories
    resolvers: RwLock<HashMap<String, Box<dyn ParticipantResolverFactory>>>,

    /// Registered catalog store factories
    catalog_stores: RwLock<HashMap<String, Arc<dyn CatalogStoreFactory>>>,
}

impl ComponentRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the components shipped in this crate
    ///
    /// Registers the `development` resolver and the `file` and `memory`
    /// catalog stores.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register_resolver("development", Box::new(FixedParticipantResolverFactory));
        registry.register_catalog_store("file", Box::new(FileCatalogStoreFactory));
        registry.register_catalog_store("memory", Box::new(MemoryCatalogStoreFactory));
        registry
    }

    /// Register a participant resolver factory
    ///
    /// # Parameters
    ///
    /// - `name`: Resolver type name (e.g., "development", "postgres")
    /// - `factory`: Factory object for creating resolver instances
    pub fn register_resolver(
        &self,
        name: impl Into<String>,
        factory: Box<dyn ParticipantResolverFactory>,
    ) {
        let mut resolvers = self
            .resolvers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        resolvers.insert(name.into(), factory);
    }

    /// Register a catalog store factory
    ///
    /// # Parameters
    ///
    /// - `name`: Catalog store type name (e.g., "file", "memory")
    /// - `factory`: Factory object for creating catalog store instances
    pub fn register_catalog_store(
        &self,
        name: impl Into<String>,
        factory: Box<dyn CatalogStoreFactory>,
    ) {
        let mut stores = self
            .catalog_stores
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        stores.insert(name.into(), Arc::from(factory));
    }

    /// Create a participant resolver from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn ParticipantResolver>)`: Created resolver instance
    /// - `Err(Error)`: If the resolver type is not registered or creation fails
    pub fn create_resolver(&self, config: &ResolverConfig) -> Result<Box<dyn ParticipantResolver>> {
        let resolver_type = config.type_name();
        let resolvers = self
            .resolvers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let factory = resolvers
            .get(resolver_type)
            .ok_or_else(|| Error::config(format!("Unknown resolver type: {}", resolver_type)))?;

        factory.create(config)
    }

    /// Create a catalog store from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn CatalogStore>)`: Created catalog store instance
    /// - `Err(Error)`: If the store type is not registered or creation fails
    pub async fn create_catalog_store(
        &self,
        config: &CatalogStoreConfig,
    ) -> Result<Box<dyn CatalogStore>> {
        let store_type = config.type_name();

        let factory = {
            let stores = self
                .catalog_stores
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            stores
                .get(store_type)
                .ok_or_else(|| {
                    Error::config(format!("Unknown catalog store type: {}", store_type))
                })?
                .clone()
        };

        // Lock released before the async create
        let config_json = serde_json::to_value(config)?;
        factory.create(&config_json).await
    }

    /// Check if a resolver type is registered
    pub fn has_resolver(&self, name: &str) -> bool {
        let resolvers = self
            .resolvers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        resolvers.contains_key(name)
    }

    /// Check if a catalog store type is registered
    pub fn has_catalog_store(&self, name: &str) -> bool {
        let stores = self
            .catalog_stores
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        stores.contains_key(name)
    }
}
