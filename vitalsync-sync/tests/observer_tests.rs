//! Observer-triggered sync, suppression and main-context delivery.

mod common;

use common::{Notification, RecordingListener, at, open, open_enabled, wait_for_entries};
use pretty_assertions::assert_eq;
use std::time::Duration;
use vitalsync_sync::{AdapterError, ObserverSuppression, SyncError, SyncStatus};
use vitalsync_types::{Domain, EntryId, HydrationValue, SleepValue, WeightValue};

// ── Registration ────────────────────────────────────────────────

#[tokio::test]
async fn start_registers_one_observer_per_domain() {
    let (mock, sync) = open_enabled().await;

    sync.start().unwrap();
    sync.start().unwrap();

    for domain in Domain::ALL {
        assert_eq!(mock.observer_count(domain), 1);
    }
    assert!(sync.weight().is_observing());
}

#[test]
fn start_outside_a_runtime_fails() {
    let (mock, sync) = open();

    let err = sync.start().unwrap_err();

    assert!(matches!(err, SyncError::NoRuntime(_)));
    assert_eq!(mock.observer_count(Domain::Weight), 0);
    assert!(!sync.weight().is_observing());
}

#[tokio::test]
async fn start_fails_when_store_is_unavailable() {
    let (mock, sync) = open_enabled().await;
    mock.set_available(false);

    let err = sync.start().unwrap_err();

    assert!(matches!(err, SyncError::AdapterUnavailable { .. }));
}

// ── Triggering ──────────────────────────────────────────────────

#[tokio::test]
async fn external_change_triggers_incremental_sync() {
    let (mock, sync) = open_enabled().await;
    sync.start().unwrap();

    mock.insert_external(at(0), SleepValue::new(at(7 * 3_600), Some(5)));

    let synced = wait_for_entries(sync.sleep(), 1).await;
    assert!(synced);
    assert!(mock.calls(Domain::Sleep).incremental >= 1);
}

#[tokio::test]
async fn observer_does_nothing_while_disabled() {
    let (mock, sync) = open();
    sync.start().unwrap();

    mock.insert_external(at(0), WeightValue::kilograms(70.0));
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
    sync.status(Domain::Weight).await.unwrap();

    assert_eq!(mock.calls(Domain::Weight).incremental, 0);
    assert!(sync.weight().entries().await.unwrap().is_empty());
}

// ── Suppression ─────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn suppression_expires_after_the_window() {
    let suppression = ObserverSuppression::new();
    assert!(!suppression.is_suppressed());

    suppression.suppress_for(Duration::from_secs(2));
    assert!(suppression.is_suppressed());

    tokio::time::advance(Duration::from_millis(1_999)).await;
    assert!(suppression.is_suppressed());

    tokio::time::advance(Duration::from_millis(2)).await;
    assert!(!suppression.is_suppressed());
}

#[tokio::test(start_paused = true)]
async fn shorter_suppression_does_not_cut_a_longer_one() {
    let suppression = ObserverSuppression::new();
    suppression.suppress_for(Duration::from_secs(5));
    suppression.suppress_for(Duration::from_secs(1));

    tokio::time::advance(Duration::from_secs(2)).await;

    assert!(suppression.is_suppressed());
}

#[tokio::test(start_paused = true)]
async fn outbound_delete_suppresses_its_own_echo() {
    let (mock, sync) = open_enabled().await;
    sync.start().unwrap();
    let record = mock.insert_external(at(0), WeightValue::kilograms(70.0));
    assert!(wait_for_entries(sync.weight(), 1).await);
    let before = mock.calls(Domain::Weight).incremental;

    sync.weight().delete_entry(&EntryId::from(&record)).await.unwrap();
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }

    assert!(sync.weight().suppression().is_suppressed());
    assert_eq!(mock.calls(Domain::Weight).deletes, 1);
    assert_eq!(mock.calls(Domain::Weight).incremental, before);

    tokio::time::advance(Duration::from_secs(3)).await;
    mock.insert_external(at(600), WeightValue::kilograms(70.6));
    assert!(wait_for_entries(sync.weight(), 1).await);
    assert!(mock.calls(Domain::Weight).incremental > before);
}

// ── Main context ────────────────────────────────────────────────

#[tokio::test]
async fn every_notification_arrives_on_the_main_context() {
    let (mock, sync) = open_enabled().await;
    let listener = RecordingListener::new();
    sync.subscribe(listener.clone());
    sync.start().unwrap();

    mock.insert_external(at(0), HydrationValue::water(330.0));
    assert!(wait_for_entries(sync.hydration(), 1).await);
    sync.weight()
        .add_entry(at(0), WeightValue::kilograms(71.0))
        .await
        .unwrap();
    sync.sleep().import_historical().await.unwrap();
    sync.weight().sync_with_reset().await.unwrap();
    mock.fail_next_fetch(Domain::Sleep, AdapterError::Io("timeout".into()));
    let _ = sync.sleep().sync_incremental().await;
    let entry = sync.weight().entries().await.unwrap().remove(0);
    sync.weight().delete_entry(&entry.id).await.unwrap();

    assert!(!listener.notifications().is_empty());
    assert!(listener.all_on_main());
    assert_eq!(mock.calls_on_main(), 0);
}

#[tokio::test]
async fn pass_reports_syncing_then_synced() {
    let (mock, sync) = open_enabled().await;
    let listener = RecordingListener::new();
    sync.subscribe(listener.clone());
    mock.insert_external(at(0), WeightValue::kilograms(70.0));

    sync.weight().sync_incremental().await.unwrap();

    let seen = listener.notifications();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[0], Notification::Status(Domain::Weight, SyncStatus::Syncing));
    assert_eq!(seen[1], Notification::Entries(Domain::Weight));
    assert!(matches!(
        seen[2],
        Notification::Status(Domain::Weight, SyncStatus::Synced { .. })
    ));
}

#[tokio::test]
async fn no_op_pass_does_not_announce_entry_changes() {
    let (_mock, sync) = open_enabled().await;
    let listener = RecordingListener::new();
    sync.subscribe(listener.clone());

    sync.weight().sync_incremental().await.unwrap();

    assert_eq!(listener.entries_changed_count(Domain::Weight), 0);
}

#[tokio::test]
async fn skipped_pass_sends_no_notifications() {
    let (_mock, sync) = open();
    let listener = RecordingListener::new();
    sync.subscribe(listener.clone());

    sync.weight().sync_incremental().await.unwrap();

    assert!(listener.notifications().is_empty());
}
