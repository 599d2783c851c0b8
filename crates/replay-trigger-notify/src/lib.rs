// # Filesystem Notification Trigger
//
// This crate provides a trigger source that requests a pass whenever a replay
// file appears in or disappears from the replay directory.
//
// ## Behavior
//
// - Watches the replay directory only (not recursive)
// - Reacts to `.zip` files; everything else is ignored
// - Renames count as a removal of the old name and a creation of the new one
// - Content changes are ignored (cataloged replays are never updated)
//
// Events are only hints. The engine always rescans the whole directory, so a
// missed or duplicated notification costs nothing but latency.
//
// ## Lifecycle
//
// The watcher lives inside the stream returned by `watch()`. Dropping the
// stream stops the watcher, which is how the engine shuts it down.

use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use replay_core::descriptor::has_replay_extension;
use replay_core::traits::{SyncRequest, TriggerSource};
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::Stream;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Trigger source backed by filesystem notifications
#[derive(Debug, Clone)]
pub struct NotifyTrigger {
    directory: PathBuf,
}

impl NotifyTrigger {
    /// Create a trigger for the given replay directory
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    fn start(&self) -> notify::Result<WatchStream> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |result: notify::Result<Event>| match result {
                Ok(event) => {
                    for request in requests_for(event) {
                        // Receiver gone means the stream was dropped
                        if tx.send(request).is_err() {
                            return;
                        }
                    }
                }
                Err(e) => tracing::warn!("Filesystem watcher error: {}", e),
            },
            Config::default(),
        )?;

        watcher.watch(&self.directory, RecursiveMode::NonRecursive)?;

        Ok(WatchStream {
            _watcher: watcher,
            requests: UnboundedReceiverStream::new(rx),
        })
    }
}

impl TriggerSource for NotifyTrigger {
    fn watch(&self) -> Pin<Box<dyn Stream<Item = SyncRequest> + Send + 'static>> {
        match self.start() {
            Ok(stream) => {
                tracing::info!("Watching {} for replay changes", self.directory.display());
                Box::pin(stream)
            }
            Err(e) => {
                // Periodic passes still run; only the fast path is lost
                tracing::error!(
                    "Failed to watch {}: {}, relying on periodic passes",
                    self.directory.display(),
                    e
                );
                Box::pin(tokio_stream::empty())
            }
        }
    }

    fn source_name(&self) -> &'static str {
        "notify"
    }
}

/// Stream of requests that keeps its watcher alive
struct WatchStream {
    _watcher: RecommendedWatcher,
    requests: UnboundedReceiverStream<SyncRequest>,
}

impl Stream for WatchStream {
    type Item = SyncRequest;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().requests).poll_next(cx)
    }
}

/// Translate one filesystem event into pass requests
fn requests_for(event: Event) -> Vec<SyncRequest> {
    let replays = |paths: Vec<PathBuf>| {
        paths
            .into_iter()
            .filter(|path| has_replay_extension(path))
    };

    match event.kind {
        EventKind::Create(_) => replays(event.paths)
            .map(|path| SyncRequest::FileCreated { path })
            .collect(),

        EventKind::Remove(_) => replays(event.paths)
            .map(|path| SyncRequest::FileRemoved { path })
            .collect(),

        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => replays(event.paths)
            .map(|path| SyncRequest::FileRemoved { path })
            .collect(),

        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => replays(event.paths)
            .map(|path| SyncRequest::FileCreated { path })
            .collect(),

        // Paths are [from, to]
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut requests = Vec::new();
            let mut paths = event.paths.into_iter();
            if let Some(from) = paths.next().filter(|path| has_replay_extension(path)) {
                requests.push(SyncRequest::FileRemoved { path: from });
            }
            if let Some(to) = paths.next().filter(|path| has_replay_extension(path)) {
                requests.push(SyncRequest::FileCreated { path: to });
            }
            requests
        }

        // Backends that cannot tell the two halves of a rename apart
        EventKind::Modify(ModifyKind::Name(_)) => replays(event.paths)
            .map(|path| {
                if path.exists() {
                    SyncRequest::FileCreated { path }
                } else {
                    SyncRequest::FileRemoved { path }
                }
            })
            .collect(),

        _ => Vec::new(),
    }
}
