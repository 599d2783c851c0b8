// # File Catalog Store
//
// File-based implementation of CatalogStore with crash recovery.
//
// ## Purpose
//
// Keeps the replay catalog across daemon restarts. Every commit is written
// to disk before it becomes visible to readers.
//
// ## Crash Recovery
//
// - Atomic writes: Uses write-then-rename for atomicity
// - Corruption detection: Validates JSON on load
// - Automatic backup: Keeps .backup of last known good catalog
// - Recovery: Falls back to backup if corruption detected
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "replays": {
//     "/srv/replays/2025_01_03-11_59-round_42.zip": {
//       "participants": ["0f80cf86-fdc6-4fc1-a075-4d872578b3cc"]
//     }
//   }
// }
// ```

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::Error;
use crate::config::CatalogStoreConfig;
use crate::traits::catalog_store::{CatalogStore, CatalogStoreFactory, EntryPredicate, ReplayEntry};

/// Catalog file format version
/// Used for future migration if format changes
const CATALOG_FILE_VERSION: &str = "1.0";

type Replays = BTreeMap<String, StoredReplay>;

/// File-based catalog store with crash recovery
///
/// Entries are kept ordered by location so that writing an unchanged catalog
/// produces byte-identical output.
///
/// # Example
///
/// ```rust,no_run
/// use replay_core::catalog::FileCatalogStore;
/// use replay_core::traits::{CatalogStore, ReplayEntry};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileCatalogStore::new("/var/lib/replays/catalog.json").await?;
///
///     store
///         .insert_all(vec![ReplayEntry::new("/srv/replays/2025_01_03-11_59-round_42.zip", [])])
///         .await?;
///
///     assert!(store.exists("/srv/replays/2025_01_03-11_59-round_42.zip").await?);
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileCatalogStore {
    path: PathBuf,
    state: Arc<RwLock<FileState>>,
}

/// Internal state for file-based store
#[derive(Debug)]
struct FileState {
    replays: Replays,
    dirty: bool,
}

/// Serializable catalog file format
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct CatalogFileFormat {
    version: String,
    replays: Replays,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct StoredReplay {
    participants: BTreeSet<Uuid>,
}

/// Why a catalog file could not be loaded
enum LoadError {
    /// File exists but its content is not a catalog
    Corrupt(Error),
    /// File could not be read at all
    Unreadable(Error),
}

impl FileCatalogStore {
    /// Create or load a file catalog store
    ///
    /// This will:
    /// 1. Try to load existing catalog file
    /// 2. If corruption detected, try to load from backup
    /// 3. If both fail, start with an empty catalog
    /// 4. Create parent directories if needed
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::config(format!(
                    "Failed to create catalog directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let replays = Self::load_with_recovery(&path).await?;

        Ok(Self {
            state: Arc::new(RwLock::new(FileState {
                replays,
                dirty: !path.exists(),
            })),
            path,
        })
    }

    /// Load catalog from file with automatic recovery
    async fn load_with_recovery(path: &Path) -> Result<Replays, Error> {
        match Self::load(path).await {
            Ok(replays) => {
                tracing::debug!("Loaded catalog from file: {} replays", replays.len());
                Ok(replays)
            }
            Err(LoadError::Unreadable(e)) => Err(e),
            Err(LoadError::Corrupt(e)) => {
                tracing::warn!(
                    "Catalog file appears corrupted: {}. Attempting recovery from backup.",
                    e
                );

                let backup_path = Self::backup_path(path);
                if !backup_path.exists() {
                    tracing::warn!("No backup file found. Starting with empty catalog.");
                    return Ok(Replays::new());
                }

                match Self::load(&backup_path).await {
                    Ok(replays) => {
                        tracing::info!("Recovered catalog from backup: {} replays", replays.len());

                        if let Err(restore_err) = fs::copy(&backup_path, path).await {
                            tracing::error!(
                                "Failed to restore catalog file from backup: {}",
                                restore_err
                            );
                        }

                        Ok(replays)
                    }
                    Err(LoadError::Corrupt(backup_err) | LoadError::Unreadable(backup_err)) => {
                        tracing::error!(
                            "Backup also unusable: {}. Starting with empty catalog.",
                            backup_err
                        );
                        Ok(Replays::new())
                    }
                }
            }
        }
    }

    /// Load catalog from file
    async fn load(path: &Path) -> Result<Replays, LoadError> {
        if !path.exists() {
            tracing::debug!("Catalog file does not exist: {}", path.display());
            return Ok(Replays::new());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            LoadError::Unreadable(Error::catalog_store(format!(
                "Failed to read catalog file {}: {}",
                path.display(),
                e
            )))
        })?;

        let catalog_file: CatalogFileFormat = serde_json::from_str(&content).map_err(|e| {
            LoadError::Corrupt(Error::catalog_store(format!(
                "Failed to parse catalog file {}: {}",
                path.display(),
                e
            )))
        })?;

        if catalog_file.version != CATALOG_FILE_VERSION {
            tracing::warn!(
                "Catalog file version mismatch: expected {}, got {}. \
                Attempting to load anyway.",
                CATALOG_FILE_VERSION,
                catalog_file.version
            );
        }

        Ok(catalog_file.replays)
    }

    /// Write a catalog to file atomically
    async fn write(&self, replays: &Replays) -> Result<(), Error> {
        let catalog_file = CatalogFileFormat {
            version: CATALOG_FILE_VERSION.to_string(),
            replays: replays.clone(),
        };

        let json = serde_json::to_string_pretty(&catalog_file)
            .map_err(|e| Error::catalog_store(format!("Failed to serialize catalog: {}", e)))?;

        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::catalog_store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::catalog_store(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.flush().await.map_err(|e| {
                Error::catalog_store(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        if self.path.exists() {
            let backup_path = Self::backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &backup_path).await {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::catalog_store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("Catalog written to file: {}", self.path.display());
        Ok(())
    }

    /// Write `next` to disk and make it the current catalog
    ///
    /// The in-memory catalog is only replaced after the file is in place, so a
    /// failed write leaves both untouched.
    async fn commit(&self, state: &mut FileState, next: Replays) -> Result<(), Error> {
        self.write(&next).await?;
        state.replays = next;
        state.dirty = false;
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

#[async_trait]
impl CatalogStore for FileCatalogStore {
    async fn list_all(&self) -> Result<Vec<ReplayEntry>, Error> {
        let state_guard = self.state.read().await;
        Ok(state_guard
            .replays
            .iter()
            .map(|(location, stored)| ReplayEntry {
                location: location.clone(),
                participants: stored.participants.clone(),
            })
            .collect())
    }

    async fn exists(&self, location: &str) -> Result<bool, Error> {
        let state_guard = self.state.read().await;
        Ok(state_guard.replays.contains_key(location))
    }

    async fn remove_where(&self, predicate: EntryPredicate<'_>) -> Result<usize, Error> {
        let mut state_guard = self.state.write().await;

        let mut next = state_guard.replays.clone();
        next.retain(|location, stored| {
            let entry = ReplayEntry {
                location: location.clone(),
                participants: stored.participants.clone(),
            };
            !predicate(&entry)
        });

        let removed = state_guard.replays.len() - next.len();
        if removed == 0 {
            return Ok(0);
        }

        self.commit(&mut state_guard, next).await?;
        Ok(removed)
    }

    async fn insert_all(&self, entries: Vec<ReplayEntry>) -> Result<usize, Error> {
        if entries.is_empty() {
            return Ok(0);
        }

        let mut state_guard = self.state.write().await;

        let mut next = state_guard.replays.clone();
        for entry in entries.iter() {
            let stored = StoredReplay {
                participants: entry.participants.clone(),
            };
            if next.insert(entry.location.clone(), stored).is_some() {
                return Err(Error::commit_conflict(&entry.location));
            }
        }

        self.commit(&mut state_guard, next).await?;
        Ok(entries.len())
    }

    async fn flush(&self) -> Result<(), Error> {
        let mut state_guard = self.state.write().await;
        if state_guard.dirty {
            let replays = state_guard.replays.clone();
            self.commit(&mut state_guard, replays).await
        } else {
            Ok(())
        }
    }
}

/// Factory for creating file catalog stores
pub struct FileCatalogStoreFactory;

#[async_trait]
impl CatalogStoreFactory for FileCatalogStoreFactory {
    async fn create(&self, config: &serde_json::Value) -> Result<Box<dyn CatalogStore>, Error> {
        match serde_json::from_value::<CatalogStoreConfig>(config.clone())? {
            CatalogStoreConfig::File { path } => Ok(Box::new(FileCatalogStore::new(path).await?)),
            other => Err(Error::config(format!(
                "File catalog store cannot be created from {} configuration",
                other.type_name()
            ))),
        }
    }
}
