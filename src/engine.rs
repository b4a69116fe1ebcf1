//! # Connection Engine
//!
//! This module implements the telemetry bridge to a running Pavlov TV
//! viewer: six endpoint pollers plus one supervisor, all owned by a single
//! [`TvEngine`] facade.
//!
//! Features include:
//! - Lifecycle: idempotent `start`, joining `stop`
//! - A validated, swappable viewer base URL
//! - A swappable [`TelemetrySink`] receiving every poll outcome
//! - A derived connection state (Disconnected / Unresponsive / Connected)
//!   published on transitions and readable on demand
//! - Runtime-tunable poll intervals and state thresholds
//!
//! Exactly seven workers run while the engine is live: the supervisor and
//! one poller per endpoint. Each poller owns a dedicated HTTP client;
//! clients are never shared between workers, so no lock spans a request.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use reqwest::Url;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::{debug, warn};

use crate::config::{Config, RuntimeConfig};
use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::monitor;
use crate::process::ProcessProbe;
use crate::sink::{ConnectionState, TelemetrySink};
use crate::utils;

/// Default base URL of the viewer's local API.
pub const DEFAULT_BASE_URL: &str = "http://localhost:1234/";

/// Caller-supplied predicate consulted by [`TvEngine::should_run`].
pub type EnabledProbe = Box<dyn Fn() -> bool + Send + Sync>;

/// State shared between the facade, the supervisor and the pollers.
pub(crate) struct Shared {
    /// Viewer base URL. Replaced atomically by `set_url`.
    url: RwLock<Url>,
    /// Cleared once, by `stop`.
    enabled: AtomicBool,
    /// Optional external gate; absent means "run".
    external_probe: RwLock<Option<EnabledProbe>>,
    /// Instant of the most recent 2xx response from any endpoint.
    last_response: RwLock<Option<Instant>>,
    /// Current consumer, if any. Swapped under the lock, invoked outside it.
    sink: RwLock<Option<Arc<dyn TelemetrySink>>>,
    /// Runtime-mutable intervals and thresholds.
    pub(crate) config: RuntimeConfig,
    /// Per-endpoint request timeouts, fixed at construction.
    timeouts: [Duration; 6],
    /// Viewer process liveness.
    process: Arc<dyn ProcessProbe>,
    /// Wakes every sleeping worker on shutdown.
    cancel: CancellationToken,
}

impl Shared {
    pub(crate) fn should_run(&self) -> bool {
        if !self.enabled.load(Ordering::Relaxed) {
            return false;
        }
        let guard = self.external_probe.read().expect("probe lock poisoned");
        guard.as_ref().map_or(true, |probe| probe())
    }

    pub(crate) fn probe_running(&self) -> bool {
        self.process.is_running()
    }

    /// Absolute URL for one endpoint, against the current base.
    pub(crate) fn endpoint_url(&self, endpoint: Endpoint) -> Option<Url> {
        let base = self.url.read().expect("url lock poisoned");
        base.join(endpoint.path()).ok()
    }

    pub(crate) fn timeout(&self, endpoint: Endpoint) -> Duration {
        self.timeouts[endpoint.index()]
    }

    pub(crate) fn stamp_last_response(&self) {
        let mut guard = self.last_response.write().expect("last-response lock poisoned");
        *guard = Some(Instant::now());
    }

    pub(crate) fn last_response(&self) -> Option<Instant> {
        *self.last_response.read().expect("last-response lock poisoned")
    }

    /// Runs `f` against the current sink, if one is installed.
    ///
    /// The sink reference is cloned out of the lock and invoked with the
    /// lock released, so a sink that re-enters the engine cannot deadlock.
    /// A panicking sink is logged and otherwise ignored.
    pub(crate) fn with_sink(&self, f: impl FnOnce(&dyn TelemetrySink)) {
        let sink = {
            let guard = self.sink.read().expect("sink lock poisoned");
            guard.clone()
        };
        if let Some(sink) = sink {
            if catch_unwind(AssertUnwindSafe(|| f(sink.as_ref()))).is_err() {
                warn!("telemetry sink panicked while handling an update");
            }
        }
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }
}

/// The telemetry bridge to a running viewer.
pub struct TvEngine {
    shared: Arc<Shared>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl TvEngine {
    /// Creates an idle engine against [`DEFAULT_BASE_URL`] with default
    /// configuration.
    pub fn new(process: Arc<dyn ProcessProbe>) -> Result<Self> {
        Self::with_config(DEFAULT_BASE_URL, Config::default(), process)
    }

    /// Creates an idle engine with a custom base URL and configuration.
    pub fn with_config(
        base_url: &str,
        config: Config,
        process: Arc<dyn ProcessProbe>,
    ) -> Result<Self> {
        let url = utils::parse_base_url(base_url)?;
        Ok(Self {
            shared: Arc::new(Shared {
                url: RwLock::new(url),
                enabled: AtomicBool::new(true),
                external_probe: RwLock::new(None),
                last_response: RwLock::new(None),
                sink: RwLock::new(None),
                config: RuntimeConfig::new(&config),
                timeouts: config.timeouts,
                process,
                cancel: CancellationToken::new(),
            }),
            supervisor: Mutex::new(None),
        })
    }

    /// Starts the supervisor, which in turn starts the pollers on its
    /// first tick. Idempotent: repeated calls never spawn a second
    /// supervisor, and a stopped engine stays stopped.
    pub fn start(&self) {
        let mut guard = self.supervisor.lock().expect("supervisor lock poisoned");
        if guard.is_some() || self.shared.is_cancelled() {
            return;
        }
        debug!("starting connection engine");
        *guard = Some(tokio::spawn(monitor::run(self.shared.clone())));
    }

    /// Stops the engine: clears the run flag, wakes every sleeping worker
    /// and waits for all of them to finish. Safe to call multiple times.
    ///
    /// Return is bounded by the largest in-flight request timeout plus the
    /// monitor interval; the engine does not forcibly cancel a request
    /// already on the wire. A final `Disconnected` notification is
    /// delivered before this returns, and nothing after it. Stopping is
    /// terminal for this engine instance.
    pub async fn stop(&self) {
        self.shared.enabled.store(false, Ordering::Relaxed);
        self.shared.cancel.cancel();
        let handle = {
            let mut guard = self.supervisor.lock().expect("supervisor lock poisoned");
            guard.take()
        };
        if let Some(handle) = handle {
            if handle.await.is_err() {
                warn!("supervisor task failed during shutdown");
            }
        }
    }

    /// The current viewer base URL.
    pub fn url(&self) -> Url {
        self.shared.url.read().expect("url lock poisoned").clone()
    }

    /// Replaces the viewer base URL.
    ///
    /// The input is validated first; on rejection the previous URL stays
    /// in effect and the error is returned. Pollers pick the new base up
    /// on their next cycle.
    pub fn set_url(&self, input: &str) -> Result<()> {
        let url = utils::parse_base_url(input)?;
        let mut guard = self.shared.url.write().expect("url lock poisoned");
        *guard = url;
        Ok(())
    }

    /// The currently installed consumer, if any.
    pub fn sink(&self) -> Option<Arc<dyn TelemetrySink>> {
        self.shared.sink.read().expect("sink lock poisoned").clone()
    }

    /// Installs (or, with `None`, removes) the consumer. Updates produced
    /// while no sink is installed are dropped.
    pub fn set_sink(&self, sink: Option<Arc<dyn TelemetrySink>>) {
        let mut guard = self.shared.sink.write().expect("sink lock poisoned");
        *guard = sink;
    }

    /// Installs (or removes) the external enabled gate. An absent probe
    /// counts as enabled.
    pub fn set_external_probe(&self, probe: Option<EnabledProbe>) {
        let mut guard = self
            .shared
            .external_probe
            .write()
            .expect("probe lock poisoned");
        *guard = probe;
    }

    /// Instant of the most recent successful response, if any.
    pub fn last_response_at(&self) -> Option<Instant> {
        self.shared.last_response()
    }

    /// The connection state as derived right now. The same value the
    /// supervisor would publish on its next tick.
    pub fn connection_status(&self) -> ConnectionState {
        monitor::current_state(&self.shared)
    }

    /// True while the engine is enabled and the external probe (when
    /// installed) agrees.
    pub fn should_run(&self) -> bool {
        self.shared.should_run()
    }

    /// Runtime-tunable intervals and thresholds.
    pub fn config(&self) -> &RuntimeConfig {
        &self.shared.config
    }

    /// The request timeout one endpoint's poller was built with.
    pub fn timeout(&self, endpoint: Endpoint) -> Duration {
        self.shared.timeout(endpoint)
    }
}

impl Drop for TvEngine {
    fn drop(&mut self) {
        // Best effort: wake the workers so they exit on their own. A clean
        // join needs `stop`.
        self.shared.enabled.store(false, Ordering::Relaxed);
        self.shared.cancel.cancel();
    }
}
