#![allow(clippy::expect_used, clippy::unwrap_used)]

//! Queue and replay behavior of the capability adapter.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use cheddar_api::mock::MockCheddarApi;
use cheddar_api::{ApiCall, ApiError, ApiReply, CallOutcome, CapabilityAdapter, CheddarApi};
use cheddar_bridge::fault::{FaultKind, InMemoryFaultSink};

fn start(interval: &str) -> ApiCall {
    ApiCall::StartCapture {
        interval: interval.into(),
        quality: "medium".into(),
    }
}

#[tokio::test]
async fn unbound_calls_queue_with_increasing_order() {
    let adapter = CapabilityAdapter::new();
    assert!(!adapter.is_bound());

    let a = adapter.call(start("5")).await;
    let b = adapter.call(ApiCall::StopCapture).await;
    assert!(matches!(a, CallOutcome::Queued { order_index: 0 }));
    assert!(matches!(b, CallOutcome::Queued { order_index: 1 }));

    let pending = adapter.pending();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].call, start("5"));
    assert_eq!(pending[1].order_index, 1);
}

#[tokio::test]
async fn bind_replays_in_order_then_dispatches_directly() {
    let adapter = CapabilityAdapter::new();
    adapter
        .call(ApiCall::InitializeSession {
            profile: "interview".into(),
            language: "en-US".into(),
        })
        .await;
    adapter.call(start("5")).await;
    adapter
        .call(ApiCall::SendTextMessage {
            text: "hello".into(),
        })
        .await;

    let mock = Arc::new(MockCheddarApi::new());
    let report = adapter.bind(mock.clone()).await;
    assert_eq!(report.replayed, 3);
    assert_eq!(report.faults, 0);
    assert!(adapter.pending().is_empty());
    assert_eq!(
        mock.call_names(),
        vec!["initializeSession", "startCapture", "sendTextMessage"]
    );

    let direct = adapter.call(ApiCall::GetContentProtection).await;
    assert_eq!(
        direct.into_result().unwrap().unwrap(),
        ApiReply::ContentProtection(true)
    );
    assert!(adapter.pending().is_empty());
    assert_eq!(mock.call_count(), 4);
}

#[tokio::test]
async fn replay_faults_are_recorded_and_do_not_stop_replay() {
    let faults = Arc::new(InMemoryFaultSink::new());
    let adapter = CapabilityAdapter::with_fault_sink(faults.clone());
    adapter.call(start("5")).await;
    adapter.call(ApiCall::StopCapture).await;
    adapter
        .call(ApiCall::OpenExternal {
            url: "https://example.com".into(),
        })
        .await;

    let mock = Arc::new(
        MockCheddarApi::new()
            .with_error(
                "startCapture",
                ApiError::Rejected {
                    operation: "startCapture".into(),
                    message: "no screen".into(),
                },
            )
            .with_panic("stopCapture"),
    );
    let report = adapter.bind(mock.clone()).await;

    assert_eq!(report.replayed, 3);
    assert_eq!(report.faults, 2);
    assert_eq!(
        mock.call_names(),
        vec!["startCapture", "stopCapture", "openExternal"]
    );
    assert_eq!(faults.count_of(FaultKind::ReplayFault), 2);
    let recorded = faults.faults();
    assert_eq!(recorded[0].source, "startCapture");
    assert_eq!(recorded[1].source, "stopCapture");
    assert!(recorded[1].detail.contains("mock panic in stopCapture"));
}

#[tokio::test]
async fn direct_panic_surfaces_as_error() {
    let adapter = CapabilityAdapter::new();
    adapter
        .bind(Arc::new(MockCheddarApi::new().with_panic("stopCapture")))
        .await;
    let outcome = adapter.call(ApiCall::StopCapture).await;
    let err = outcome.into_result().unwrap().unwrap_err();
    assert!(matches!(err, ApiError::Panicked { ref operation, .. } if operation == "stopCapture"));
}

#[tokio::test]
async fn unknown_names_are_ignored_in_both_states() {
    let adapter = CapabilityAdapter::new();
    assert!(matches!(
        adapter.call_by_name("getLayoutMode", &[]).await,
        CallOutcome::Ignored
    ));
    assert!(adapter.pending().is_empty());

    let queued = adapter.call_by_name("openExternal", &[json!("https://x.test")]).await;
    assert!(queued.is_queued());

    let mock = Arc::new(MockCheddarApi::new());
    adapter.bind(mock.clone()).await;
    assert!(matches!(
        adapter.call_by_name("element", &[]).await,
        CallOutcome::Ignored
    ));
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn rebinding_never_replays_old_calls() {
    let adapter = CapabilityAdapter::new();
    adapter.call(ApiCall::StopCapture).await;

    let first = Arc::new(MockCheddarApi::new());
    adapter.bind(first.clone()).await;
    let second = Arc::new(MockCheddarApi::new());
    let report = adapter.bind(second.clone()).await;

    assert_eq!(report.replayed, 0);
    assert_eq!(first.call_count(), 1);
    assert_eq!(second.call_count(), 0);

    adapter
        .call(ApiCall::HandleShortcut { key: "ctrl+enter".into() })
        .await;
    assert_eq!(first.call_count(), 1);
    assert_eq!(second.call_names(), vec!["handleShortcut"]);
}

/// Issues another call through the adapter while it is being replayed.
struct Reentrant {
    adapter: Mutex<Option<Arc<CapabilityAdapter>>>,
    log: Mutex<Vec<String>>,
}

impl Reentrant {
    fn log(&self, entry: &str) {
        self.log.lock().unwrap().push(entry.to_string());
    }
}

#[async_trait]
impl CheddarApi for Reentrant {
    async fn stop_capture(&self) -> Result<ApiReply, ApiError> {
        self.log("stop");
        let adapter = self.adapter.lock().unwrap().clone();
        if let Some(adapter) = adapter {
            let outcome = adapter
                .call(ApiCall::SetStatus {
                    text: "late".into(),
                })
                .await;
            assert!(outcome.is_queued());
        }
        Ok(ApiReply::Ack)
    }

    async fn set_status(&self, text: &str) -> Result<ApiReply, ApiError> {
        self.log(text);
        Ok(ApiReply::Ack)
    }

    async fn handle_shortcut(&self, key: &str) -> Result<ApiReply, ApiError> {
        self.log(key);
        Ok(ApiReply::Ack)
    }
}

#[tokio::test]
async fn calls_made_during_replay_run_after_the_batch() {
    let adapter = Arc::new(CapabilityAdapter::new());
    adapter.call(ApiCall::StopCapture).await;
    adapter
        .call(ApiCall::HandleShortcut { key: "k".into() })
        .await;

    let implementation = Arc::new(Reentrant {
        adapter: Mutex::new(Some(Arc::clone(&adapter))),
        log: Mutex::new(Vec::new()),
    });
    let report = adapter.bind(implementation.clone()).await;

    assert_eq!(report.replayed, 3);
    assert_eq!(*implementation.log.lock().unwrap(), vec!["stop", "k", "late"]);
    assert!(adapter.pending().is_empty());

    // Replay finished: the next call bypasses the queue.
    let outcome = adapter
        .call(ApiCall::SetStatus {
            text: "direct".into(),
        })
        .await;
    assert!(matches!(outcome, CallOutcome::Completed(Ok(ApiReply::Ack))));

    // Break the adapter <-> implementation cycle.
    implementation.adapter.lock().unwrap().take();
}
