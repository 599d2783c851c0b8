// # Catalog Store Trait
//
// Defines the interface for the persisted replay catalog.
//
// ## Purpose
//
// The catalog records every replay file the engine has seen, keyed by its
// location on disk, together with the players that took part in the round.
// Entries are only ever created or deleted, never updated in place.
//
// ## Implementations
//
// - File-based: JSON file with atomic rename
// - In-memory: tests and development
//
// ## Usage
//
// ```rust,ignore
// use replay_core::CatalogStore;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let store = /* CatalogStore implementation */;
//
//     let known = store.list_all().await?;
//     store.remove_where(&|entry| entry.location.ends_with("old.zip")).await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::collections::BTreeSet;
use uuid::Uuid;

/// Catalog entry for a single replay file
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ReplayEntry {
    /// Location of the replay file; primary key of the catalog
    pub location: String,
    /// Players that took part in the round
    pub participants: BTreeSet<Uuid>,
}

impl ReplayEntry {
    /// Create a new catalog entry
    pub fn new(location: impl Into<String>, participants: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            location: location.into(),
            participants: participants.into_iter().collect(),
        }
    }

    /// Check if a player took part in this replay's round
    pub fn has_participant(&self, player: &Uuid) -> bool {
        self.participants.contains(player)
    }
}

/// Predicate used by [`CatalogStore::remove_where`]
pub type EntryPredicate<'a> = &'a (dyn Fn(&ReplayEntry) -> bool + Send + Sync);

/// Trait for catalog store implementations
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently from multiple tasks, but
/// mutation only ever happens from inside a synchronization pass, and at most
/// one pass runs at a time.
///
/// # Commits
///
/// `remove_where` and `insert_all` are each one transaction: after they return
/// `Ok` the change is durable, after they return `Err` nothing changed.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// List every catalog entry
    async fn list_all(&self) -> Result<Vec<ReplayEntry>, crate::Error>;

    /// Check if a location is cataloged
    async fn exists(&self, location: &str) -> Result<bool, crate::Error>;

    /// Remove every entry matching the predicate in one commit
    ///
    /// # Returns
    ///
    /// - `Ok(usize)`: Number of removed entries (zero is not an error)
    /// - `Err(Error)`: Storage error; nothing was removed
    async fn remove_where(&self, predicate: EntryPredicate<'_>) -> Result<usize, crate::Error>;

    /// Insert a batch of new entries in one commit
    ///
    /// All-or-nothing: if any location is already cataloged, or appears twice
    /// in the batch, the whole batch is rejected with
    /// [`Error::CommitConflict`](crate::Error::CommitConflict).
    ///
    /// # Returns
    ///
    /// - `Ok(usize)`: Number of inserted entries
    /// - `Err(Error)`: Conflict or storage error; nothing was inserted
    async fn insert_all(&self, entries: Vec<ReplayEntry>) -> Result<usize, crate::Error>;

    /// Persist any pending changes
    async fn flush(&self) -> Result<(), crate::Error>;

    /// List the entries a player took part in
    async fn list_for_participant(&self, player: Uuid) -> Result<Vec<ReplayEntry>, crate::Error> {
        let entries = self.list_all().await?;
        Ok(entries
            .into_iter()
            .filter(|entry| entry.has_participant(&player))
            .collect())
    }
}

/// Helper trait for constructing catalog stores from configuration
#[async_trait]
pub trait CatalogStoreFactory: Send + Sync {
    /// Create a CatalogStore instance from configuration
    ///
    /// # Parameters
    ///
    /// - `config`: Configuration specific to this catalog store, as JSON
    async fn create(&self, config: &serde_json::Value) -> Result<Box<dyn CatalogStore>, crate::Error>;
}
