//! Engine integration tests against a mock viewer.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use pavlov_tv_api::config::Config;
use pavlov_tv_api::engine::TvEngine;
use pavlov_tv_api::http::ApiResult;
use pavlov_tv_api::model::MatchTime;
use pavlov_tv_api::process::ProcessProbe;
use pavlov_tv_api::sink::{ConnectionState, TelemetrySink};

mod common;

/// Records everything the engine delivers.
#[derive(Default)]
struct RecordingSink {
    states: Mutex<Vec<ConnectionState>>,
    ok_times: AtomicUsize,
    failed_times: AtomicUsize,
    last_time: Mutex<Option<f64>>,
}

impl RecordingSink {
    fn states(&self) -> Vec<ConnectionState> {
        self.states.lock().unwrap().clone()
    }
}

impl TelemetrySink for RecordingSink {
    fn on_state(&self, state: ConnectionState) {
        self.states.lock().unwrap().push(state);
    }

    fn on_time(&self, update: ApiResult<MatchTime>) {
        if update.ok() {
            self.ok_times.fetch_add(1, Ordering::SeqCst);
            *self.last_time.lock().unwrap() = update.data().map(|t| t.match_time);
        } else {
            self.failed_times.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Fast timings so the scenarios run in well under a second each.
fn fast_config() -> Config {
    Config {
        monitor_interval: Duration::from_millis(20),
        unresponsive_after: Duration::from_millis(250),
        disconnected_after: Duration::from_millis(1_250),
        intervals: [Duration::from_millis(25); 6],
        timeouts: [Duration::from_millis(250); 6],
    }
}

fn engine_at(addr: SocketAddr, probe: Arc<dyn ProcessProbe>) -> TvEngine {
    TvEngine::with_config(&format!("http://{}/", addr), fast_config(), probe).unwrap()
}

/// The six payload bodies a healthy viewer would serve.
fn healthy_body(target: &str) -> (u16, String) {
    if target.starts_with("/MatchTime") {
        (200, r#"{"MatchTime": 12.5}"#.to_string())
    } else if target.starts_with("/Pause") {
        (200, r#"{"Paused": false}"#.to_string())
    } else if target.starts_with("/MatchStatus") {
        (200, r#"{"MapName": "datacenter", "GameMode": "SND"}"#.to_string())
    } else {
        // Empty success bodies are valid results.
        (200, String::new())
    }
}

async fn wait_for<F: Fn() -> bool>(what: &str, deadline: Duration, pred: F) {
    let started = Instant::now();
    while started.elapsed() < deadline {
        if pred() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {}", what);
}

#[tokio::test]
async fn cold_start_publishes_disconnected_once() {
    // No server listening, viewer process not running.
    let addr: SocketAddr = "127.0.0.1:38181".parse().unwrap();
    let engine = engine_at(addr, Arc::new(|| false));
    let sink = Arc::new(RecordingSink::default());
    engine.set_sink(Some(sink.clone()));

    engine.start();
    wait_for("the initial state notification", Duration::from_millis(500), || {
        !sink.states().is_empty()
    })
    .await;
    wait_for("failed time polls", Duration::from_secs(2), || {
        sink.failed_times.load(Ordering::SeqCst) >= 3
    })
    .await;

    // One Disconnected, then steady-state silence.
    assert_eq!(sink.states(), vec![ConnectionState::Disconnected]);
    assert_eq!(sink.ok_times.load(Ordering::SeqCst), 0);

    engine.stop().await;
    // Shutdown appends the final Disconnected, unconditionally.
    assert_eq!(
        sink.states(),
        vec![ConnectionState::Disconnected, ConnectionState::Disconnected]
    );
}

#[tokio::test]
async fn healthy_viewer_reaches_connected_exactly_once() {
    let addr: SocketAddr = "127.0.0.1:38281".parse().unwrap();
    common::start_mock_viewer(addr, healthy_body).await;

    let engine = engine_at(addr, Arc::new(|| true));
    let sink = Arc::new(RecordingSink::default());
    engine.set_sink(Some(sink.clone()));

    engine.start();
    wait_for("Connected", Duration::from_secs(2), || {
        sink.states().last() == Some(&ConnectionState::Connected)
    })
    .await;
    wait_for("time updates", Duration::from_secs(2), || {
        sink.ok_times.load(Ordering::SeqCst) >= 5
    })
    .await;

    // Still exactly one transition after settling.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(
        sink.states(),
        vec![ConnectionState::Disconnected, ConnectionState::Connected]
    );
    assert_eq!(*sink.last_time.lock().unwrap(), Some(12.5));
    assert!(engine.last_response_at().is_some());

    engine.stop().await;
}

#[tokio::test]
async fn stalled_viewer_walks_the_state_ladder_and_recovers() {
    let addr: SocketAddr = "127.0.0.1:38381".parse().unwrap();
    let stalled = Arc::new(AtomicBool::new(false));
    let gate = stalled.clone();
    common::start_mock_viewer(addr, move |target| {
        if gate.load(Ordering::SeqCst) {
            (503, String::new())
        } else {
            healthy_body(target)
        }
    })
    .await;

    let engine = engine_at(addr, Arc::new(|| true));
    let sink = Arc::new(RecordingSink::default());
    engine.set_sink(Some(sink.clone()));

    engine.start();
    wait_for("Connected", Duration::from_secs(2), || {
        sink.states().last() == Some(&ConnectionState::Connected)
    })
    .await;

    // The API goes silent while the process stays alive.
    stalled.store(true, Ordering::SeqCst);
    wait_for("Unresponsive", Duration::from_secs(2), || {
        sink.states().last() == Some(&ConnectionState::Unresponsive)
    })
    .await;
    wait_for("Disconnected", Duration::from_secs(3), || {
        sink.states().last() == Some(&ConnectionState::Disconnected)
    })
    .await;

    // Recovery: one successful poll flips straight back to Connected.
    stalled.store(false, Ordering::SeqCst);
    wait_for("recovery", Duration::from_secs(2), || {
        sink.states().last() == Some(&ConnectionState::Connected)
    })
    .await;

    assert_eq!(
        sink.states(),
        vec![
            ConnectionState::Disconnected,
            ConnectionState::Connected,
            ConnectionState::Unresponsive,
            ConnectionState::Disconnected,
            ConnectionState::Connected,
        ]
    );

    engine.stop().await;
}

#[tokio::test]
async fn dead_process_skips_unresponsive() {
    let addr: SocketAddr = "127.0.0.1:38481".parse().unwrap();
    common::start_mock_viewer(addr, healthy_body).await;

    let alive = Arc::new(AtomicBool::new(true));
    let probe_flag = alive.clone();
    let engine = engine_at(addr, Arc::new(move || probe_flag.load(Ordering::SeqCst)));
    let sink = Arc::new(RecordingSink::default());
    engine.set_sink(Some(sink.clone()));

    engine.start();
    wait_for("Connected", Duration::from_secs(2), || {
        sink.states().last() == Some(&ConnectionState::Connected)
    })
    .await;

    // Process dies while responses are still fresh.
    alive.store(false, Ordering::SeqCst);
    wait_for("Disconnected", Duration::from_secs(1), || {
        sink.states().last() == Some(&ConnectionState::Disconnected)
    })
    .await;

    // Straight to Disconnected, no Unresponsive in between.
    assert!(!sink.states().contains(&ConnectionState::Unresponsive));

    engine.stop().await;
}

#[tokio::test]
async fn rejected_url_leaves_polling_unaffected() {
    let addr: SocketAddr = "127.0.0.1:38581".parse().unwrap();
    common::start_mock_viewer(addr, healthy_body).await;

    let engine = engine_at(addr, Arc::new(|| true));
    let sink = Arc::new(RecordingSink::default());
    engine.set_sink(Some(sink.clone()));
    engine.start();

    wait_for("time updates", Duration::from_secs(2), || {
        sink.ok_times.load(Ordering::SeqCst) >= 2
    })
    .await;

    let before = engine.url();
    assert!(engine.set_url("not a url").is_err());
    assert_eq!(engine.url(), before);

    // Polling keeps running against the unchanged URL.
    let count = sink.ok_times.load(Ordering::SeqCst);
    wait_for("continued polling", Duration::from_secs(2), || {
        sink.ok_times.load(Ordering::SeqCst) > count
    })
    .await;

    engine.stop().await;
}

#[tokio::test]
async fn start_is_idempotent() {
    let addr: SocketAddr = "127.0.0.1:38681".parse().unwrap();
    let engine = engine_at(addr, Arc::new(|| false));
    let sink = Arc::new(RecordingSink::default());
    engine.set_sink(Some(sink.clone()));

    for _ in 0..5 {
        engine.start();
    }
    tokio::time::sleep(Duration::from_millis(300)).await;

    // A second supervisor would have published a second initial state.
    assert_eq!(sink.states(), vec![ConnectionState::Disconnected]);

    engine.stop().await;
}

#[tokio::test]
async fn stop_is_bounded_and_final() {
    let addr: SocketAddr = "127.0.0.1:38781".parse().unwrap();
    common::start_mock_viewer(addr, healthy_body).await;

    let engine = engine_at(addr, Arc::new(|| true));
    let sink = Arc::new(RecordingSink::default());
    engine.set_sink(Some(sink.clone()));
    engine.start();
    wait_for("Connected", Duration::from_secs(2), || {
        sink.states().last() == Some(&ConnectionState::Connected)
    })
    .await;

    let started = Instant::now();
    engine.stop().await;
    // Bounded by the in-flight timeout (250 ms) plus the monitor tick,
    // with slack for scheduling.
    assert!(started.elapsed() < Duration::from_millis(1_500));

    // The final notification is Disconnected, and nothing follows it.
    assert_eq!(sink.states().last(), Some(&ConnectionState::Disconnected));
    let states = sink.states();
    let times = sink.ok_times.load(Ordering::SeqCst) + sink.failed_times.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(sink.states(), states);
    assert_eq!(
        sink.ok_times.load(Ordering::SeqCst) + sink.failed_times.load(Ordering::SeqCst),
        times
    );

    // Stopping again is a no-op.
    engine.stop().await;
}
