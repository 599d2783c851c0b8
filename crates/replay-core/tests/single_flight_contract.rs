//! Architectural Contract Test: Single Flight
//!
//! This test verifies that passes never overlap and that requests arriving
//! during a pass collapse into one rerun.
//!
//! Constraints verified:
//! - N requests during a pass → exactly one follow-up pass
//! - State moves Idle → Running → RerunPending → Running → Idle
//! - Passes requested through the run loop and `sync_now` never overlap
//! - Requests during a `sync_now` pass also collapse into one follow-up pass
//! - Without requests the engine does nothing
//!
//! If this test fails, someone has:
//! - Spawned passes concurrently
//! - Queued one pass per request instead of coalescing
//! - Added polling to the engine loop

mod common;

use common::*;
use replay_core::engine::{EngineEvent, EngineState, RequestOutcome};
use replay_core::traits::SyncRequest;
use replay_core::{CatalogEngine, MemoryCatalogStore};
use std::sync::Arc;
use std::time::Duration;
use tokio_test::assert_ok;

#[tokio::test]
async fn requests_during_pass_coalesce_into_one_rerun() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "2025_01_03-11_59-round_42.zip");

    let resolver = ScriptedResolver::gated().with_round(42, [player(1)]);
    let catalog = MemoryCatalogStore::new();
    let (engine, mut events) = CatalogEngine::new(
        Box::new(catalog.clone()),
        Box::new(resolver.clone()),
        config_for(dir.path()),
    )
    .unwrap();
    let requester = engine.requester();
    let state = engine.subscribe_state();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let engine_handle = tokio::spawn(async move { engine.run_with_shutdown(shutdown_rx).await });

    assert_eq!(requester.request(SyncRequest::Manual), RequestOutcome::Queued);
    resolver.wait_entered().await;
    assert_eq!(*state.borrow(), EngineState::Running);

    // Five more triggers while the first pass is held inside the resolver
    for _ in 0..5 {
        assert_eq!(requester.request(SyncRequest::Timer), RequestOutcome::Queued);
    }
    assert_eq!(*state.borrow(), EngineState::RerunPending);

    resolver.release(1);

    let mut seen = events_until(&mut events, is_pass_end).await;
    seen.extend(events_until(&mut events, is_pass_end).await);
    seen.extend(events_within(&mut events, Duration::from_millis(200)).await);

    assert_eq!(
        count_pass_starts(&seen),
        2,
        "Requests during a pass must collapse into one rerun: {:?}",
        seen
    );
    assert!(seen.contains(&EngineEvent::RerunScheduled { requests: 5 }));
    assert_eq!(*state.borrow(), EngineState::Idle);

    // The rerun found the file already cataloged
    assert_eq!(resolver.call_count(), 1);
    assert_eq!(catalog.len().await, 1);

    shutdown_tx.send(()).unwrap();
    assert_ok!(engine_handle.await.unwrap());
}

#[tokio::test]
async fn run_loop_and_sync_now_never_overlap() {
    let dir = tempfile::tempdir().unwrap();
    for round in 1..=4 {
        touch(dir.path(), &format!("2025_01_03-11_59-round_{}.zip", round));
    }

    let resolver = ScriptedResolver::new().with_delay(Duration::from_millis(20));
    let catalog = MemoryCatalogStore::new();
    let (engine, mut events) = CatalogEngine::new(
        Box::new(catalog.clone()),
        Box::new(resolver.clone()),
        config_for(dir.path()),
    )
    .unwrap();
    let engine = Arc::new(engine);
    let requester = engine.requester();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let runner = Arc::clone(&engine);
    let engine_handle = tokio::spawn(async move { runner.run_with_shutdown(shutdown_rx).await });

    requester.request(SyncRequest::Manual);
    let manual = Arc::clone(&engine);
    let direct = tokio::spawn(async move { manual.sync_now().await });

    assert_ok!(direct.await.unwrap());
    let seen = events_until(&mut events, is_pass_end).await;
    let seen = [seen, events_until(&mut events, is_pass_end).await].concat();

    assert!(
        !seen
            .iter()
            .any(|event| matches!(event, EngineEvent::PassFailed { .. })),
        "Overlapping passes would collide on commit: {:?}",
        seen
    );
    assert_eq!(resolver.max_in_flight(), 1);
    assert_eq!(resolver.call_count(), 4, "Each file is resolved exactly once");
    assert_eq!(catalog.len().await, 4);

    shutdown_tx.send(()).unwrap();
    assert_ok!(engine_handle.await.unwrap());
}

#[tokio::test]
async fn requests_during_sync_now_coalesce_into_one_rerun() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "2025_01_03-11_59-round_42.zip");

    let resolver = ScriptedResolver::gated().with_round(42, [player(1)]);
    let catalog = MemoryCatalogStore::new();
    let (engine, mut events) = CatalogEngine::new(
        Box::new(catalog.clone()),
        Box::new(resolver.clone()),
        config_for(dir.path()),
    )
    .unwrap();
    let engine = Arc::new(engine);
    let requester = engine.requester();
    let state = engine.subscribe_state();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let runner = Arc::clone(&engine);
    let engine_handle = tokio::spawn(async move { runner.run_with_shutdown(shutdown_rx).await });

    let manual = Arc::clone(&engine);
    let direct = tokio::spawn(async move { manual.sync_now().await });
    resolver.wait_entered().await;
    assert_eq!(*state.borrow(), EngineState::Running);

    for _ in 0..3 {
        assert_eq!(requester.request(SyncRequest::Timer), RequestOutcome::Queued);
    }
    assert_eq!(*state.borrow(), EngineState::RerunPending);

    resolver.release(1);
    let report = assert_ok!(direct.await.unwrap());
    assert_eq!(report.added, 1);

    let mut seen = events_until(&mut events, is_pass_end).await;
    seen.extend(events_until(&mut events, is_pass_end).await);
    seen.extend(events_within(&mut events, Duration::from_millis(200)).await);

    assert_eq!(
        count_pass_starts(&seen),
        2,
        "Requests during sync_now must collapse into one rerun: {:?}",
        seen
    );
    assert_eq!(*state.borrow(), EngineState::Idle);
    assert_eq!(resolver.call_count(), 1);

    shutdown_tx.send(()).unwrap();
    assert_ok!(engine_handle.await.unwrap());
}

#[tokio::test]
async fn idle_engine_does_nothing() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "2025_01_03-11_59-round_1.zip");

    let resolver = ScriptedResolver::new();
    let (engine, mut events) = CatalogEngine::new(
        Box::new(MemoryCatalogStore::new()),
        Box::new(resolver.clone()),
        config_for(dir.path()),
    )
    .unwrap();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let engine_handle = tokio::spawn(async move { engine.run_with_shutdown(shutdown_rx).await });

    let seen = events_within(&mut events, Duration::from_millis(200)).await;
    assert_eq!(count_pass_starts(&seen), 0, "No pass without a request: {:?}", seen);
    assert!(matches!(seen.first(), Some(EngineEvent::Started { .. })));
    assert_eq!(resolver.call_count(), 0);

    shutdown_tx.send(()).unwrap();
    assert_ok!(engine_handle.await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn interval_trigger_requests_periodic_passes() {
    let dir = tempfile::tempdir().unwrap();

    let (engine, mut events) = CatalogEngine::new(
        Box::new(MemoryCatalogStore::new()),
        Box::new(ScriptedResolver::new()),
        config_for(dir.path()).with_update_interval_secs(60),
    )
    .unwrap();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let engine_handle = tokio::spawn(async move { engine.run_with_shutdown(shutdown_rx).await });

    // First tick fires immediately
    let seen = events_until(&mut events, is_pass_end).await;
    assert!(seen.contains(&EngineEvent::PassStarted {
        trigger: SyncRequest::Timer
    }));

    tokio::time::advance(Duration::from_secs(61)).await;
    let seen = events_until(&mut events, is_pass_end).await;
    assert_eq!(count_pass_starts(&seen), 1);

    shutdown_tx.send(()).unwrap();
    assert_ok!(engine_handle.await.unwrap());
}
