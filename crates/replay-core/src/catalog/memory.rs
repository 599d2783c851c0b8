// # Memory Catalog Store
//
// In-memory implementation of CatalogStore.
//
// ## Purpose
//
// Provides a simple, fast catalog that doesn't persist across restarts.
// Useful for testing and development deployments.
//
// ## Crash Behavior
//
// - The whole catalog is lost on restart
// - The first pass after a restart rediscovers every replay and resolves
//   its participants again

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::catalog_store::{CatalogStore, CatalogStoreFactory, EntryPredicate, ReplayEntry};

/// In-memory catalog store implementation
///
/// Clones share the same underlying catalog, which lets tests keep a handle
/// while the engine owns another.
///
/// # Example
///
/// ```rust,no_run
/// use replay_core::catalog::MemoryCatalogStore;
/// use replay_core::traits::{CatalogStore, ReplayEntry};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryCatalogStore::new();
///
///     store.insert_all(vec![ReplayEntry::new("/r/a.zip", [])]).await?;
///     assert_eq!(store.len().await, 1);
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalogStore {
    inner: Arc<RwLock<BTreeMap<String, ReplayEntry>>>,
}

impl MemoryCatalogStore {
    /// Create a new empty memory catalog store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of entries in the catalog
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the catalog is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Locations of all entries, in order
    pub async fn locations(&self) -> Vec<String> {
        self.inner.read().await.keys().cloned().collect()
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn list_all(&self) -> Result<Vec<ReplayEntry>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.values().cloned().collect())
    }

    async fn exists(&self, location: &str) -> Result<bool, Error> {
        let guard = self.inner.read().await;
        Ok(guard.contains_key(location))
    }

    async fn remove_where(&self, predicate: EntryPredicate<'_>) -> Result<usize, Error> {
        let mut guard = self.inner.write().await;
        let before = guard.len();
        guard.retain(|_, entry| !predicate(entry));
        Ok(before - guard.len())
    }

    async fn insert_all(&self, entries: Vec<ReplayEntry>) -> Result<usize, Error> {
        let mut guard = self.inner.write().await;

        // Validate the whole batch before touching the map
        let mut batch = BTreeMap::new();
        for entry in entries {
            if guard.contains_key(&entry.location) || batch.contains_key(&entry.location) {
                return Err(Error::commit_conflict(entry.location));
            }
            batch.insert(entry.location.clone(), entry);
        }

        let inserted = batch.len();
        guard.append(&mut batch);
        Ok(inserted)
    }

    async fn flush(&self) -> Result<(), Error> {
        // No-op for memory store (everything is already "persisted")
        Ok(())
    }
}

/// Factory for creating memory catalog stores
pub struct MemoryCatalogStoreFactory;

#[async_trait]
impl CatalogStoreFactory for MemoryCatalogStoreFactory {
    async fn create(&self, _config: &serde_json::Value) -> Result<Box<dyn CatalogStore>, Error> {
        Ok(Box::new(MemoryCatalogStore::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryCatalogStore::new();
        assert!(store.is_empty().await);

        store
            .insert_all(vec![
                ReplayEntry::new("/r/a.zip", [Uuid::from_u128(1)]),
                ReplayEntry::new("/r/b.zip", []),
            ])
            .await
            .unwrap();

        assert_eq!(store.len().await, 2);
        assert!(store.exists("/r/a.zip").await.unwrap());
        assert!(!store.exists("/r/c.zip").await.unwrap());

        let removed = store
            .remove_where(&|entry: &ReplayEntry| entry.location == "/r/a.zip")
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.locations().await, vec!["/r/b.zip".to_string()]);
    }

    #[tokio::test]
    async fn test_memory_store_conflict_is_atomic() {
        let store = MemoryCatalogStore::new();
        store
            .insert_all(vec![ReplayEntry::new("/r/a.zip", [])])
            .await
            .unwrap();

        let result = store
            .insert_all(vec![
                ReplayEntry::new("/r/b.zip", []),
                ReplayEntry::new("/r/a.zip", []),
            ])
            .await;

        assert!(matches!(result, Err(Error::CommitConflict(_))));
        assert_eq!(store.locations().await, vec!["/r/a.zip".to_string()]);
    }

    #[tokio::test]
    async fn test_list_for_participant() {
        let alice = Uuid::from_u128(1);
        let bob = Uuid::from_u128(2);

        let store = MemoryCatalogStore::new();
        store
            .insert_all(vec![
                ReplayEntry::new("/r/a.zip", [alice, bob]),
                ReplayEntry::new("/r/b.zip", [bob]),
                ReplayEntry::new("/r/c.zip", []),
            ])
            .await
            .unwrap();

        let for_alice = store.list_for_participant(alice).await.unwrap();
        assert_eq!(for_alice.len(), 1);
        assert_eq!(for_alice[0].location, "/r/a.zip");

        assert_eq!(store.list_for_participant(bob).await.unwrap().len(), 2);
    }
}
