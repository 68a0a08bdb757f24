//! Integration tests for the tracker runner loop.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use helpers::{GENERAL, GUILD, TestTracker, join_event, snapshot};
use voicetime_core::config::AccrualConfig;
use voicetime_core::events::GatewayEvent;
use voicetime_tracker::TrackerRunner;

struct Harness {
    tracker: TestTracker,
    events: mpsc::Sender<GatewayEvent>,
    cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

fn start() -> Harness {
    let tracker = TestTracker::new();
    let runner = TrackerRunner::new(Arc::clone(&tracker.engine), &AccrualConfig::default());
    let (events, rx) = mpsc::channel(16);
    let (cancel, cancel_rx) = watch::channel(false);
    let handle = tokio::spawn(async move {
        runner.run(rx, cancel_rx).await;
    });

    Harness {
        tracker,
        events,
        cancel,
        handle,
    }
}

#[tokio::test(start_paused = true)]
async fn test_ticks_start_after_ready() {
    let h = start();

    h.events
        .send(GatewayEvent::Ready(snapshot(vec![(GENERAL, vec![1])])))
        .await
        .expect("send");
    tokio::time::sleep(Duration::from_millis(5_001)).await;

    assert!(h.tracker.engine.is_seeded());
    assert_eq!(h.tracker.user_seconds(GUILD, 1), 5.0);
    assert_eq!(h.tracker.channel_seconds(GUILD, GENERAL), 5.0);
}

#[tokio::test(start_paused = true)]
async fn test_no_accrual_before_ready() {
    let h = start();

    h.events.send(join_event(1, GENERAL)).await.expect("send");
    tokio::time::sleep(Duration::from_secs(20)).await;

    assert!(!h.tracker.engine.is_seeded());
    assert_eq!(h.tracker.user_seconds(GUILD, 1), 0.0);

    h.events
        .send(GatewayEvent::Ready(snapshot(Vec::new())))
        .await
        .expect("send");
    tokio::time::sleep(Duration::from_millis(5_001)).await;

    assert_eq!(h.tracker.user_seconds(GUILD, 1), 5.0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_runner() {
    let h = start();

    h.cancel.send(true).expect("cancel");

    tokio::time::timeout(Duration::from_secs(1), h.handle)
        .await
        .expect("runner stopped")
        .expect("join");
}

#[tokio::test(start_paused = true)]
async fn test_closed_event_stream_stops_runner() {
    let h = start();

    drop(h.events);

    tokio::time::timeout(Duration::from_secs(1), h.handle)
        .await
        .expect("runner stopped")
        .expect("join");
    drop(h.cancel);
}
