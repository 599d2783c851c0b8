//! Test doubles and common utilities for engine contract tests
//!
//! This module provides a scriptable participant resolver and small helpers
//! for building replay directories and draining engine events.

#![allow(dead_code)]

use replay_core::engine::EngineEvent;
use replay_core::error::{Error, Result};
use replay_core::traits::ParticipantResolver;
use replay_core::CatalogConfig;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Notify, Semaphore, mpsc};
use uuid::Uuid;

/// A resolver with scripted rosters, failure injection and an optional gate
///
/// Clones share all counters and scripts, so a test can keep one clone and
/// hand another to the engine.
#[derive(Clone, Default)]
pub struct ScriptedResolver {
    rounds: Arc<Mutex<HashMap<u32, BTreeSet<Uuid>>>>,
    failing: Arc<Mutex<HashSet<u32>>>,
    fail_from_call: Arc<Mutex<Option<usize>>>,
    calls: Arc<Mutex<Vec<u32>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    gate: Option<Arc<Semaphore>>,
    entered: Arc<Notify>,
    delay: Option<Duration>,
}

impl ScriptedResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block every resolve call until [`release`](Self::release) is called
    pub fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::default()
        }
    }

    /// Sleep for `delay` inside every resolve call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_round(self, round: u32, players: impl IntoIterator<Item = Uuid>) -> Self {
        self.rounds
            .lock()
            .unwrap()
            .insert(round, players.into_iter().collect());
        self
    }

    pub fn set_failing(&self, round: u32, failing: bool) {
        let mut set = self.failing.lock().unwrap();
        if failing {
            set.insert(round);
        } else {
            set.remove(&round);
        }
    }

    /// Fail every call after the first `n`, whatever the round
    pub fn fail_after_calls(&self, n: Option<usize>) {
        *self.fail_from_call.lock().unwrap() = n;
    }

    /// Let `n` gated resolve calls proceed
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Wait until a resolve call has started
    pub async fn wait_entered(&self) {
        tokio::time::timeout(Duration::from_secs(5), self.entered.notified())
            .await
            .expect("resolver was never called");
    }

    /// Rounds passed to resolve, in call order
    pub fn calls(&self) -> Vec<u32> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Highest number of resolve calls that ever ran at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ParticipantResolver for ScriptedResolver {
    async fn resolve(&self, round_number: u32) -> Result<BTreeSet<Uuid>> {
        let call_index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(round_number);
            calls.len() - 1
        };

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.entered.notify_one();

        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let over_budget = self
            .fail_from_call
            .lock()
            .unwrap()
            .is_some_and(|limit| call_index >= limit);
        if over_budget || self.failing.lock().unwrap().contains(&round_number) {
            return Err(Error::resolver("scripted", "roster store unavailable"));
        }

        Ok(self
            .rounds
            .lock()
            .unwrap()
            .get(&round_number)
            .cloned()
            .unwrap_or_default())
    }

    fn resolver_name(&self) -> &'static str {
        "scripted"
    }
}

/// Player identifier for tests
pub fn player(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

/// Create an empty file in `dir`, returning its catalog location
pub fn touch(dir: &Path, name: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, b"replay").expect("write replay file");
    location(dir, name)
}

/// Catalog location of `name` inside `dir`
pub fn location(dir: &Path, name: &str) -> String {
    dir.join(name).to_string_lossy().into_owned()
}

/// Configuration with the periodic timer disabled
pub fn config_for(dir: impl Into<PathBuf>) -> CatalogConfig {
    CatalogConfig::new(dir).with_update_interval_secs(0)
}

/// Receive events until one matches `predicate`, returning everything seen
pub async fn events_until(
    events: &mut mpsc::Receiver<EngineEvent>,
    predicate: impl Fn(&EngineEvent) -> bool,
) -> Vec<EngineEvent> {
    let mut seen = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timed out waiting for engine event")
            .expect("event channel closed");
        let done = predicate(&event);
        seen.push(event);
        if done {
            return seen;
        }
    }
}

/// Receive every event that arrives within `window`
pub async fn events_within(
    events: &mut mpsc::Receiver<EngineEvent>,
    window: Duration,
) -> Vec<EngineEvent> {
    let mut seen = Vec::new();
    let deadline = tokio::time::Instant::now() + window;
    while let Ok(Some(event)) = tokio::time::timeout_at(deadline, events.recv()).await {
        seen.push(event);
    }
    seen
}

pub fn is_pass_end(event: &EngineEvent) -> bool {
    matches!(
        event,
        EngineEvent::PassCompleted { .. } | EngineEvent::PassFailed { .. }
    )
}

pub fn count_pass_starts(events: &[EngineEvent]) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, EngineEvent::PassStarted { .. }))
        .count()
}
