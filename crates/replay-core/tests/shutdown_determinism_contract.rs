//! Architectural Contract Test: Shutdown Determinism
//!
//! This test verifies that shutdown is deterministic and complete.
//!
//! Constraints verified:
//! - Engine terminates on shutdown signal
//! - A pass that is already running finishes and commits
//! - A pending rerun is dropped
//! - The catalog is flushed before exit
//!
//! If this test fails, someone has added:
//! - Detached background tasks
//! - Cancellation in the middle of a pass
//! - Blocking operations in the shutdown path

mod common;

use common::*;
use replay_core::catalog::FileCatalogStore;
use replay_core::engine::{EngineEvent, EngineState};
use replay_core::traits::SyncRequest;
use replay_core::{CatalogEngine, MemoryCatalogStore};
use std::time::Duration;
use tokio_test::assert_ok;

#[tokio::test]
async fn shutdown_signal_terminates_engine() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, mut events) = CatalogEngine::new(
        Box::new(MemoryCatalogStore::new()),
        Box::new(ScriptedResolver::new()),
        config_for(dir.path()).with_update_interval_secs(60),
    )
    .unwrap();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let engine_handle = tokio::spawn(async move { engine.run_with_shutdown(shutdown_rx).await });

    events_until(&mut events, |event| matches!(event, EngineEvent::Started { .. })).await;
    shutdown_tx.send(()).expect("shutdown signal send succeeds");

    let result = tokio::time::timeout(Duration::from_secs(5), engine_handle).await;
    assert!(result.is_ok(), "Engine should terminate within 5 seconds");

    let engine_result = result.unwrap().unwrap();
    assert!(
        engine_result.is_ok(),
        "Engine should shut down successfully: {:?}",
        engine_result
    );

    let seen = events_within(&mut events, Duration::from_millis(100)).await;
    assert!(matches!(seen.last(), Some(EngineEvent::Stopped { .. })));
}

#[tokio::test]
async fn dropped_sender_counts_as_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, _events) = CatalogEngine::new(
        Box::new(MemoryCatalogStore::new()),
        Box::new(ScriptedResolver::new()),
        config_for(dir.path()),
    )
    .unwrap();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    drop(shutdown_tx);

    let result = tokio::time::timeout(Duration::from_secs(5), engine.run_with_shutdown(shutdown_rx)).await;
    assert_ok!(result.expect("engine terminates"));
}

#[tokio::test]
async fn shutdown_flushes_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let catalog_path = dir.path().join("state").join("catalog.json");

    let store = FileCatalogStore::new(&catalog_path).await.unwrap();
    assert!(!catalog_path.exists());

    let (engine, _events) = CatalogEngine::new(
        Box::new(store),
        Box::new(ScriptedResolver::new()),
        config_for(dir.path()),
    )
    .unwrap();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let engine_handle = tokio::spawn(async move { engine.run_with_shutdown(shutdown_rx).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown_tx.send(()).unwrap();
    assert_ok!(engine_handle.await.unwrap());

    assert!(catalog_path.exists(), "Catalog must be flushed on shutdown");
}

#[tokio::test]
async fn running_pass_completes_and_rerun_is_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let location = touch(dir.path(), "2025_01_03-11_59-round_42.zip");

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

    requester.request(SyncRequest::Manual);
    resolver.wait_entered().await;
    requester.request(SyncRequest::Timer);
    assert_eq!(*state.borrow(), EngineState::RerunPending);

    // Shut down while the pass is held inside the resolver
    shutdown_tx.send(()).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    resolver.release(1);

    let result = tokio::time::timeout(Duration::from_secs(5), engine_handle).await;
    assert_ok!(result.expect("engine terminates").unwrap());

    assert_eq!(catalog.locations().await, vec![location]);
    assert_eq!(*state.borrow(), EngineState::Idle);

    let seen = events_within(&mut events, Duration::from_millis(100)).await;
    assert_eq!(count_pass_starts(&seen), 1, "Pending rerun must be dropped: {:?}", seen);
    assert!(!seen
        .iter()
        .any(|event| matches!(event, EngineEvent::RerunScheduled { .. })));
    assert!(matches!(seen.last(), Some(EngineEvent::Stopped { .. })));
}
