use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;

use capture::EncodedFrame;
use detection::{DetectionClient, DetectionLog, DetectionLoop, FrameSource};

const TICK: Duration = Duration::from_millis(20);

struct CannedSource;

impl FrameSource for CannedSource {
    fn latest_frame(&mut self) -> anyhow::Result<EncodedFrame> {
        Ok(EncodedFrame::new(vec![0xFF, 0xD8, 0xFF, 0xE0]))
    }
}

struct FlakySource {
    calls: usize,
}

impl FrameSource for FlakySource {
    fn latest_frame(&mut self) -> anyhow::Result<EncodedFrame> {
        self.calls += 1;
        if self.calls == 1 {
            anyhow::bail!("no frame yet");
        }
        Ok(EncodedFrame::new(vec![0xFF, 0xD8]))
    }
}

#[derive(Clone)]
struct StubState {
    calls: Arc<AtomicUsize>,
    fail_on: Option<usize>,
}

async fn detect_stub(State(state): State<StubState>, Json(body): Json<serde_json::Value>) -> Response {
    let image = body["image"].as_str().unwrap_or_default();
    if !image.starts_with("data:image/jpeg;base64,") {
        return (StatusCode::BAD_REQUEST, "not a data url").into_response();
    }

    let call = state.calls.fetch_add(1, Ordering::SeqCst) + 1;
    if state.fail_on == Some(call) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "inference down").into_response();
    }
    Json(json!({ "label": "anomaly", "confidence": 0.9, "call": call })).into_response()
}

async fn serve_stub(fail_on: Option<usize>) -> (SocketAddr, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/detect", post(detect_stub))
        .with_state(StubState {
            calls: calls.clone(),
            fail_on,
        });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, calls)
}

async fn wait_for_calls(calls: &AtomicUsize, at_least: usize) {
    for _ in 0..500 {
        if calls.load(Ordering::SeqCst) >= at_least {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("stub never reached {at_least} calls");
}

#[tokio::test]
async fn detect_once_appends_one_timestamped_event() {
    let (addr, _) = serve_stub(None).await;
    let log = DetectionLog::new();
    let looper = DetectionLoop::new(DetectionClient::new(format!("http://{addr}")), log.clone());

    let event = looper.detect_once(&mut CannedSource).await.unwrap();
    assert_eq!(event.fields["label"], "anomaly");

    let snap = log.snapshot().await;
    assert_eq!(snap.len(), 1);
    assert_eq!(snap[0].fields["confidence"], 0.9);
}

#[tokio::test]
async fn a_failed_tick_skips_the_append_and_the_loop_continues() {
    // Tick 1 succeeds, tick 2 fails, tick 3 succeeds: two entries.
    let (addr, calls) = serve_stub(Some(2)).await;
    let log = DetectionLog::new();
    let mut looper = DetectionLoop::new(DetectionClient::new(format!("http://{addr}")), log.clone())
        .with_period(TICK);

    looper.start(CannedSource);
    wait_for_calls(&calls, 3).await;
    looper.stop();
    // Let any in-flight tick settle before reading the log.
    tokio::time::sleep(TICK * 3).await;

    let snap = log.snapshot().await;
    assert!(snap.len() >= 2, "expected the two successful ticks, got {}", snap.len());
    assert_eq!(snap.len(), calls.load(Ordering::SeqCst) - 1);
    assert!(snap.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
}

#[tokio::test]
async fn a_frame_source_failure_is_swallowed_at_the_tick_level() {
    let (addr, calls) = serve_stub(None).await;
    let log = DetectionLog::new();
    let mut looper = DetectionLoop::new(DetectionClient::new(format!("http://{addr}")), log.clone())
        .with_period(TICK);

    // First grab fails before any request is made; later ticks recover.
    looper.start(FlakySource { calls: 0 });
    wait_for_calls(&calls, 2).await;
    looper.stop();
    tokio::time::sleep(TICK * 3).await;

    assert_eq!(log.len().await, calls.load(Ordering::SeqCst));
}

#[tokio::test]
async fn stop_disarms_the_timer_and_no_tick_fires_afterwards() {
    let (addr, calls) = serve_stub(None).await;
    let log = DetectionLog::new();
    let mut looper = DetectionLoop::new(DetectionClient::new(format!("http://{addr}")), log.clone())
        .with_period(TICK);

    looper.start(CannedSource);
    wait_for_calls(&calls, 2).await;
    looper.stop();
    assert!(!looper.is_armed());

    tokio::time::sleep(TICK * 3).await;
    let after_stop = calls.load(Ordering::SeqCst);
    tokio::time::sleep(TICK * 5).await;
    assert_eq!(calls.load(Ordering::SeqCst), after_stop);
}

#[tokio::test]
async fn restart_replaces_the_previous_timer() {
    let (addr, calls) = serve_stub(None).await;
    let log = DetectionLog::new();
    let mut looper = DetectionLoop::new(DetectionClient::new(format!("http://{addr}")), log.clone())
        .with_period(TICK);

    looper.start(CannedSource);
    // Re-arming must cancel the first timer rather than stack a second.
    looper.start(CannedSource);
    wait_for_calls(&calls, 3).await;
    looper.stop();
    tokio::time::sleep(TICK * 3).await;

    let settled = calls.load(Ordering::SeqCst);
    tokio::time::sleep(TICK * 5).await;
    assert_eq!(calls.load(Ordering::SeqCst), settled);
}

#[tokio::test]
async fn clearing_the_log_does_not_poison_a_running_loop() {
    let (addr, calls) = serve_stub(None).await;
    let log = DetectionLog::new();
    let mut looper = DetectionLoop::new(DetectionClient::new(format!("http://{addr}")), log.clone())
        .with_period(TICK);

    looper.start(CannedSource);
    wait_for_calls(&calls, 2).await;
    log.clear().await;
    let before = calls.load(Ordering::SeqCst);
    wait_for_calls(&calls, before + 2).await;
    looper.stop();

    assert!(log.len().await >= 1, "appends after a clear must still land");
}
