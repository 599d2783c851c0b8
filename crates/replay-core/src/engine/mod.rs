//! Core catalog synchronization engine
//!
//! The CatalogEngine is responsible for:
//! - Receiving pass requests from trigger sources
//! - Serializing them so that at most one pass runs at a time
//! - Pruning catalog entries whose file is gone
//! - Discovering new replay files and resolving their participants
//! - Committing new entries as one batch
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐  ┌───────────────┐
//! │ IntervalTrigger│  │ NotifyTrigger │ ...
//! └───────────────┘  └───────────────┘
//!         │ SyncRequest      │
//!         └────────┬─────────┘
//!                  ▼
//!        ┌───────────────────┐
//!        │ request channel   │  (single consumer, coalescing)
//!        └───────────────────┘
//!                  │
//!                  ▼
//!          ┌──────────────┐
//!          │ CatalogEngine│
//!          └──────────────┘
//!                  │
//!     ┌────────────┼─────────────────┐
//!     ▼            ▼                 ▼
//! ┌──────────┐ ┌────────────────┐ ┌──────────┐
//! │ Catalog  │ │ Participant    │ │  Events  │
//! │ Store    │ │ Resolver       │ │ (notify) │
//! └──────────┘ └────────────────┘ └──────────┘
//! ```
//!
//! ## Pass Flow
//!
//! 1. Prune: remove entries whose file no longer exists (own commit)
//! 2. Discover: list `.zip` files, parse names, resolve participants
//! 3. Commit: insert every discovered entry as one batch
//!
//! A resolver failure aborts discovery and discards the batch; the prune
//! commit from step 1 stands.

use crate::config::CatalogConfig;
use crate::descriptor::{RoundDescriptor, has_replay_extension};
use crate::error::{Error, Result};
use crate::traits::{CatalogStore, ParticipantResolver, ReplayEntry, SyncRequest, TriggerSource};
use crate::trigger::IntervalTrigger;
use std::collections::HashSet;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

/// Scheduling state of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No pass is running
    Idle,
    /// A pass is running and no further request has arrived
    Running,
    /// A pass is running and at least one request is waiting for a rerun
    RerunPending,
}

/// Why a file was skipped during discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Name does not follow the replay grammar
    InvalidName,
    /// Path is not a regular file
    NotAFile,
    /// File disappeared between listing and processing
    Vanished,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::InvalidName => write!(f, "invalid name"),
            SkipReason::NotAFile => write!(f, "not a regular file"),
            SkipReason::Vanished => write!(f, "vanished"),
        }
    }
}

/// Result of examining one replay file
#[derive(Debug)]
enum FileOutcome {
    /// New catalog entry for the batch
    Accept(ReplayEntry),
    /// Skip this file, keep going
    Skip(SkipReason),
    /// Stop discovery, commit nothing
    Abort(Error),
}

/// Summary of a completed pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Entries removed because their file is gone
    pub removed: usize,
    /// Entries added for newly discovered files
    pub added: usize,
    /// Files skipped during discovery
    pub skipped: usize,
}

/// Events emitted by the CatalogEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Engine started
    Started {
        triggers_count: usize,
    },

    /// Pass started
    PassStarted {
        trigger: SyncRequest,
    },

    /// Prune phase committed
    Pruned {
        removed: usize,
    },

    /// File skipped during discovery
    ReplaySkipped {
        location: String,
        reason: SkipReason,
    },

    /// New replay resolved and queued for the batch
    ReplayDiscovered {
        location: String,
        round_number: u32,
    },

    /// Pass completed
    PassCompleted {
        report: PassReport,
    },

    /// Pass failed; the engine stays available
    PassFailed {
        error: String,
    },

    /// Requests that arrived during a pass were merged into one rerun
    RerunScheduled {
        requests: usize,
    },

    /// Engine stopped
    Stopped {
        reason: String,
    },
}

/// Outcome of [`SyncRequester::request`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Request queued for the engine
    Queued,
    /// Request channel is full, so a pass is already pending
    Coalesced,
    /// Engine is gone
    Closed,
}

/// Handle for requesting synchronization passes
///
/// Cloned into every trigger forwarder. Requests never wait for a pass.
#[derive(Debug, Clone)]
pub struct SyncRequester {
    tx: mpsc::Sender<SyncRequest>,
    state: Arc<watch::Sender<EngineState>>,
}

impl SyncRequester {
    /// Request a pass
    pub fn request(&self, request: SyncRequest) -> RequestOutcome {
        match self.tx.try_send(request) {
            Ok(()) => {
                self.state.send_if_modified(|state| {
                    if *state == EngineState::Running {
                        *state = EngineState::RerunPending;
                        true
                    } else {
                        false
                    }
                });
                RequestOutcome::Queued
            }
            Err(TrySendError::Full(request)) => {
                debug!("Pass already pending, coalescing request ({})", request);
                RequestOutcome::Coalesced
            }
            Err(TrySendError::Closed(_)) => RequestOutcome::Closed,
        }
    }
}

/// Core catalog synchronization engine
///
/// ## Lifecycle
///
/// 1. Create with [`CatalogEngine::new()`]
/// 2. Add extra trigger sources with [`CatalogEngine::with_trigger()`]
/// 3. Start with [`CatalogEngine::run_until()`] or [`CatalogEngine::run_with_shutdown()`]
/// 4. Engine runs until the shutdown future completes
///
/// ## Serialization
///
/// Every pass, whichever way it was requested, holds the pass lock, so two
/// passes never overlap. Requests that arrive while a pass runs stay in the
/// request channel and are merged into a single rerun when it finishes.
pub struct CatalogEngine {
    /// Directory holding the replay files
    replay_directory: PathBuf,

    /// Catalog store
    catalog: Box<dyn CatalogStore>,

    /// Participant resolver
    resolver: Box<dyn ParticipantResolver>,

    /// Trigger sources started by `run_until`
    triggers: Vec<Box<dyn TriggerSource>>,

    /// Sender half of the request channel, cloned into requesters
    request_tx: mpsc::Sender<SyncRequest>,

    /// Single consumer of the request channel
    request_rx: Mutex<mpsc::Receiver<SyncRequest>>,

    /// Held for the whole duration of a pass
    pass_lock: Mutex<()>,

    /// Current scheduling state
    state: Arc<watch::Sender<EngineState>>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl CatalogEngine {
    /// Create a new catalog engine
    ///
    /// The periodic trigger is built from `config.update_interval_secs`.
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        catalog: Box<dyn CatalogStore>,
        resolver: Box<dyn ParticipantResolver>,
        config: CatalogConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (event_tx, event_rx) = mpsc::channel(config.engine.event_channel_capacity);
        let (request_tx, request_rx) = mpsc::channel(config.engine.request_channel_capacity);
        let (state, _) = watch::channel(EngineState::Idle);

        let engine = Self {
            replay_directory: config.replay_directory,
            catalog,
            resolver,
            triggers: vec![Box::new(IntervalTrigger::from_secs(
                config.update_interval_secs,
            ))],
            request_tx,
            request_rx: Mutex::new(request_rx),
            pass_lock: Mutex::new(()),
            state: Arc::new(state),
            event_tx,
        };

        Ok((engine, event_rx))
    }

    /// Add a trigger source
    pub fn with_trigger(mut self, trigger: Box<dyn TriggerSource>) -> Self {
        self.triggers.push(trigger);
        self
    }

    /// Get a handle for requesting passes
    pub fn requester(&self) -> SyncRequester {
        SyncRequester {
            tx: self.request_tx.clone(),
            state: Arc::clone(&self.state),
        }
    }

    /// Current scheduling state
    pub fn state(&self) -> EngineState {
        *self.state.borrow()
    }

    /// Subscribe to scheduling state changes
    pub fn subscribe_state(&self) -> watch::Receiver<EngineState> {
        self.state.subscribe()
    }

    /// Access the catalog store
    pub fn catalog(&self) -> &dyn CatalogStore {
        self.catalog.as_ref()
    }

    /// Run the engine with a controlled shutdown signal
    ///
    /// A dropped sender counts as a shutdown signal.
    pub async fn run_with_shutdown(&self, shutdown_rx: tokio::sync::oneshot::Receiver<()>) -> Result<()> {
        self.run_until(async move {
            let _ = shutdown_rx.await;
        })
        .await
    }

    /// Run the engine until `shutdown` completes
    ///
    /// On shutdown the trigger sources are stopped, a pass that is already
    /// running finishes, a pending rerun is dropped and the catalog is
    /// flushed.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    /// - `Err(Error)`: The catalog could not be flushed
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let mut requests = self.request_rx.lock().await;
        let forwarders = self.spawn_triggers();

        self.emit_event(EngineEvent::Started {
            triggers_count: forwarders.len(),
        });
        info!(
            "Catalog engine started for {} ({} trigger source(s))",
            self.replay_directory.display(),
            forwarders.len()
        );

        tokio::pin!(shutdown);

        let reason = loop {
            let request = tokio::select! {
                biased;

                _ = &mut shutdown => break "Shutdown signal",

                request = requests.recv() => match request {
                    Some(request) => request,
                    None => break "Request channel closed",
                },
            };

            if self.serve(request, &mut requests, &mut shutdown).await {
                break "Shutdown signal";
            }
        };

        info!("{}, stopping trigger sources", reason);
        for forwarder in &forwarders {
            forwarder.abort();
        }
        for forwarder in forwarders {
            let _ = forwarder.await;
        }

        self.state.send_replace(EngineState::Idle);
        self.emit_event(EngineEvent::Stopped {
            reason: reason.to_string(),
        });

        self.catalog.flush().await?;
        info!("Catalog flushed, engine stopped");

        Ok(())
    }

    /// Run one pass immediately
    ///
    /// Waits for a running pass to finish first. Requests that arrive while
    /// this pass runs mark a rerun as pending and are served by the run loop
    /// as one follow-up pass.
    pub async fn sync_now(&self) -> Result<PassReport> {
        let _pass = self.pass_lock.lock().await;
        self.state.send_replace(EngineState::Running);

        let result = self.run_pass(SyncRequest::Manual).await;

        // A pending rerun belongs to the run loop now
        self.state.send_if_modified(|state| {
            if *state == EngineState::Running {
                *state = EngineState::Idle;
                true
            } else {
                false
            }
        });
        result
    }

    /// Serve a request and every rerun it accumulates
    ///
    /// Returns `true` if shutdown was observed between passes.
    async fn serve<F>(
        &self,
        mut request: SyncRequest,
        requests: &mut mpsc::Receiver<SyncRequest>,
        shutdown: &mut Pin<&mut F>,
    ) -> bool
    where
        F: Future<Output = ()> + Send,
    {
        loop {
            // Held until the state reflects the outcome of this pass
            let _pass = self.pass_lock.lock().await;

            // Requests queued while waiting for the lock are covered by this pass
            let mut absorbed = 0;
            while requests.try_recv().is_ok() {
                absorbed += 1;
            }
            if absorbed > 0 {
                debug!("Serving {} queued request(s) with this pass", absorbed);
            }

            self.state.send_replace(EngineState::Running);

            // Failures are logged and reported by run_pass
            let _ = self.run_pass(request).await;

            let mut follow_up = None;
            let mut queued = 0;
            while let Ok(next) = requests.try_recv() {
                queued += 1;
                follow_up.get_or_insert(next);
            }

            let shutting_down = tokio::select! {
                biased;
                _ = &mut *shutdown => true,
                _ = std::future::ready(()) => false,
            };
            if shutting_down {
                if queued > 0 {
                    debug!("Dropping pending rerun ({} request(s)) on shutdown", queued);
                }
                return true;
            }

            match follow_up {
                Some(next) => {
                    debug!("Rerunning for {} request(s) received during the pass", queued);
                    self.emit_event(EngineEvent::RerunScheduled { requests: queued });
                    request = next;
                }
                None => {
                    self.state.send_replace(EngineState::Idle);
                    return false;
                }
            }
        }
    }

    /// Start one forwarding task per trigger source
    fn spawn_triggers(&self) -> Vec<JoinHandle<()>> {
        self.triggers
            .iter()
            .map(|trigger| {
                let requester = self.requester();
                let name = trigger.source_name();
                let mut stream = trigger.watch();

                tokio::spawn(async move {
                    while let Some(request) = stream.next().await {
                        debug!("Trigger {} requested a pass ({})", name, request);
                        if requester.request(request) == RequestOutcome::Closed {
                            break;
                        }
                    }
                    debug!("Trigger source {} finished", name);
                })
            })
            .collect()
    }

    /// Run a single pass, reporting the outcome
    ///
    /// The caller holds the pass lock.
    async fn run_pass(&self, trigger: SyncRequest) -> Result<PassReport> {
        debug!("Starting pass ({})", trigger);
        self.emit_event(EngineEvent::PassStarted { trigger });

        match self.execute_pass().await {
            Ok(report) => {
                debug!(
                    "Pass completed: {} removed, {} added, {} skipped",
                    report.removed, report.added, report.skipped
                );
                self.emit_event(EngineEvent::PassCompleted { report });
                Ok(report)
            }
            Err(e) => {
                error!("Failed to update replays: {}", e);
                self.emit_event(EngineEvent::PassFailed {
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Prune, discover, commit
    async fn execute_pass(&self) -> Result<PassReport> {
        let removed = self.prune().await?;

        let (entries, skipped) = self.discover().await?;

        let added = if entries.is_empty() {
            0
        } else {
            let locations: Vec<String> = entries.iter().map(|e| e.location.clone()).collect();
            let added = self.catalog.insert_all(entries).await?;
            for location in locations {
                info!("Added replay {} to catalog", location);
            }
            added
        };

        Ok(PassReport {
            removed,
            added,
            skipped,
        })
    }

    /// Remove entries whose file no longer exists, in one commit
    async fn prune(&self) -> Result<usize> {
        debug!("Checking for outdated replays...");

        let mut missing = HashSet::new();
        for entry in self.catalog.list_all().await? {
            match fs::metadata(&entry.location).await {
                Ok(metadata) if metadata.is_file() => {}
                Ok(_) => {
                    info!("Replay {} is no longer a file, removing from catalog", entry.location);
                    missing.insert(entry.location);
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    info!("Replay {} is missing, removing from catalog", entry.location);
                    missing.insert(entry.location);
                }
                Err(e) => {
                    warn!("Could not check replay {}, keeping it: {}", entry.location, e);
                }
            }
        }

        if missing.is_empty() {
            return Ok(0);
        }

        let removed = self
            .catalog
            .remove_where(&|entry: &ReplayEntry| missing.contains(&entry.location))
            .await?;

        self.emit_event(EngineEvent::Pruned { removed });
        Ok(removed)
    }

    /// Collect new entries for every uncataloged replay file
    ///
    /// Returns the batch and the number of skipped files, or the error that
    /// aborted discovery.
    async fn discover(&self) -> Result<(Vec<ReplayEntry>, usize)> {
        if self.replay_directory.as_os_str().is_empty() {
            return Err(Error::config("Replay directory is not configured"));
        }

        debug!("Checking for new replays...");

        let mut dir = fs::read_dir(&self.replay_directory).await.map_err(|e| {
            Error::config(format!(
                "Replay directory {} is not readable: {}",
                self.replay_directory.display(),
                e
            ))
        })?;

        let mut entries = Vec::new();
        let mut skipped = 0;

        while let Some(dir_entry) = dir.next_entry().await? {
            let path = dir_entry.path();
            if !has_replay_extension(&path) {
                continue;
            }

            let Some(location) = path.to_str().map(str::to_string) else {
                warn!("Replay {} has a non UTF-8 name, skipping.", path.display());
                skipped += 1;
                continue;
            };

            if self.catalog.exists(&location).await? {
                continue;
            }

            match self.examine(&path, &location).await {
                FileOutcome::Accept(entry) => entries.push(entry),
                FileOutcome::Skip(reason) => {
                    skipped += 1;
                    self.emit_event(EngineEvent::ReplaySkipped { location, reason });
                }
                FileOutcome::Abort(e) => {
                    if !entries.is_empty() {
                        debug!("Discarding {} resolved replay(s) from this pass", entries.len());
                    }
                    return Err(e);
                }
            }
        }

        Ok((entries, skipped))
    }

    /// Decide what to do with one uncataloged replay file
    async fn examine(&self, path: &Path, location: &str) -> FileOutcome {
        info!("Found new replay {}", location);

        let descriptor = match path.file_name().and_then(|name| name.to_str()) {
            Some(name) => RoundDescriptor::parse(name),
            None => None,
        };
        let Some(descriptor) = descriptor else {
            warn!("Replay {} has an invalid name, skipping.", location);
            return FileOutcome::Skip(SkipReason::InvalidName);
        };

        match fs::metadata(path).await {
            Ok(metadata) if metadata.is_file() => {}
            Ok(_) => {
                debug!("Replay {} is not a regular file, skipping.", location);
                return FileOutcome::Skip(SkipReason::NotAFile);
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Replay {} vanished before it was processed, skipping.", location);
                return FileOutcome::Skip(SkipReason::Vanished);
            }
            Err(e) => return FileOutcome::Abort(Error::Io(e)),
        }

        match self.resolver.resolve(descriptor.round_number).await {
            Ok(participants) => {
                debug!(
                    "Round {} of replay {} has {} participant(s)",
                    descriptor.round_number,
                    location,
                    participants.len()
                );
                self.emit_event(EngineEvent::ReplayDiscovered {
                    location: location.to_string(),
                    round_number: descriptor.round_number,
                });
                FileOutcome::Accept(ReplayEntry {
                    location: location.to_string(),
                    participants,
                })
            }
            Err(e) => {
                error!(
                    "Failed to resolve participants of round {} for replay {} using {}: {}",
                    descriptor.round_number,
                    location,
                    self.resolver.resolver_name(),
                    e
                );
                FileOutcome::Abort(e)
            }
        }
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        if self.event_tx.try_send(event).is_err() {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}
