// # Trigger Source Trait
//
// Defines the interface for anything that can ask the engine to run a
// synchronization pass.
//
// ## Implementations
//
// - Periodic timer: `IntervalTrigger` in this crate
// - Filesystem notifications: `replay-trigger-notify` crate
//
// Trigger sources only request passes. Whether, when and how often a pass
// actually runs is decided by the engine's serialization gate.

use std::fmt;
use std::path::PathBuf;
use std::pin::Pin;
use tokio_stream::Stream;

/// A request for one synchronization pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncRequest {
    /// Periodic timer fired
    Timer,
    /// A replay file appeared in the watched directory
    FileCreated {
        /// Path reported by the watcher
        path: PathBuf,
    },
    /// A replay file disappeared from the watched directory
    FileRemoved {
        /// Path reported by the watcher
        path: PathBuf,
    },
    /// Requested directly through a [`SyncRequester`](crate::engine::SyncRequester)
    Manual,
}

impl fmt::Display for SyncRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncRequest::Timer => write!(f, "timer"),
            SyncRequest::FileCreated { path } => write!(f, "created {}", path.display()),
            SyncRequest::FileRemoved { path } => write!(f, "removed {}", path.display()),
            SyncRequest::Manual => write!(f, "manual"),
        }
    }
}

/// Trait for trigger source implementations
///
/// # Stream Contract
///
/// - [`watch`](TriggerSource::watch) is called once, when the engine starts
/// - The stream yields one [`SyncRequest`] per trigger
/// - Dropping the stream must release every resource the source holds
///   (timers, OS watches); this is how the engine stops sources on shutdown
/// - A source that is disabled returns a stream that ends immediately
pub trait TriggerSource: Send + Sync {
    /// Stream of pass requests
    fn watch(&self) -> Pin<Box<dyn Stream<Item = SyncRequest> + Send + 'static>>;

    /// Get the source name (for logging/debugging)
    fn source_name(&self) -> &'static str;
}
