//! Configuration options for the Pavlov TV telemetry engine.
//!
//! [`Config`] carries the construction-time defaults. Once the engine is
//! built it exposes the same knobs through [`RuntimeConfig`], which pollers
//! and the supervisor read on every cycle: intervals are stored as atomic
//! millisecond counters so a reader never observes a torn value, and the
//! two connection-state thresholds share one mutex so their cross-field
//! invariant can be enforced in a single critical section.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::endpoint::Endpoint;

/// Minimum gap the threshold auto-correction keeps between the
/// unresponsive and disconnected cutoffs.
const THRESHOLD_GAP: Duration = Duration::from_millis(1_000);

/// Construction-time configuration for the engine.
#[derive(Clone, Debug)]
pub struct Config {
    /// Supervisor tick period.
    pub monitor_interval: Duration,
    /// Silence after which a live viewer process counts as unresponsive.
    pub unresponsive_after: Duration,
    /// Silence after which the connection counts as lost.
    pub disconnected_after: Duration,
    /// Per-endpoint poll intervals, indexed by [`Endpoint::index`].
    pub intervals: [Duration; 6],
    /// Per-endpoint request timeouts, indexed by [`Endpoint::index`].
    /// Captured at engine construction; not mutable afterwards.
    pub timeouts: [Duration; 6],
}

impl Default for Config {
    fn default() -> Self {
        let mut intervals = [Duration::ZERO; 6];
        let mut timeouts = [Duration::ZERO; 6];
        for endpoint in Endpoint::ALL {
            intervals[endpoint.index()] = endpoint.default_interval();
            timeouts[endpoint.index()] = endpoint.default_timeout();
        }
        Self {
            monitor_interval: Duration::from_millis(100),
            unresponsive_after: Duration::from_millis(5_000),
            disconnected_after: Duration::from_millis(60_000),
            intervals,
            timeouts,
        }
    }
}

/// The two connection-state thresholds, kept together so their invariant
/// is enforced atomically.
#[derive(Debug)]
struct Thresholds {
    unresponsive_ms: u64,
    disconnected_ms: u64,
}

/// Runtime-mutable view of the engine configuration, shared by the
/// supervisor and all pollers.
#[derive(Debug)]
pub struct RuntimeConfig {
    monitor_interval_ms: AtomicU64,
    intervals_ms: [AtomicU64; 6],
    thresholds: Mutex<Thresholds>,
}

impl RuntimeConfig {
    pub(crate) fn new(config: &Config) -> Self {
        let intervals_ms =
            config.intervals.map(|d| AtomicU64::new(d.as_millis() as u64));
        let mut thresholds = Thresholds {
            unresponsive_ms: config.unresponsive_after.as_millis() as u64,
            disconnected_ms: config.disconnected_after.as_millis() as u64,
        };
        Self::repair(&mut thresholds);
        Self {
            monitor_interval_ms: AtomicU64::new(config.monitor_interval.as_millis() as u64),
            intervals_ms,
            thresholds: Mutex::new(thresholds),
        }
    }

    /// Raises the disconnected cutoff when a mutation left it at or below
    /// the unresponsive cutoff. The state ladder must stay well-ordered.
    fn repair(thresholds: &mut Thresholds) {
        if thresholds.disconnected_ms <= thresholds.unresponsive_ms {
            thresholds.disconnected_ms =
                thresholds.unresponsive_ms + THRESHOLD_GAP.as_millis() as u64;
        }
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms.load(Ordering::Relaxed))
    }

    pub fn set_monitor_interval(&self, interval: Duration) {
        self.monitor_interval_ms
            .store(interval.as_millis() as u64, Ordering::Relaxed);
    }

    /// Current poll interval for an endpoint. Re-read by the poller on
    /// every cycle, so a mutation takes effect on the next cycle.
    pub fn interval(&self, endpoint: Endpoint) -> Duration {
        Duration::from_millis(self.intervals_ms[endpoint.index()].load(Ordering::Relaxed))
    }

    pub fn set_interval(&self, endpoint: Endpoint, interval: Duration) {
        self.intervals_ms[endpoint.index()]
            .store(interval.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn unresponsive_after(&self) -> Duration {
        let guard = self.thresholds.lock().expect("threshold lock poisoned");
        Duration::from_millis(guard.unresponsive_ms)
    }

    pub fn disconnected_after(&self) -> Duration {
        let guard = self.thresholds.lock().expect("threshold lock poisoned");
        Duration::from_millis(guard.disconnected_ms)
    }

    /// Both thresholds in one snapshot, for the supervisor's state
    /// derivation.
    pub(crate) fn thresholds(&self) -> (Duration, Duration) {
        let guard = self.thresholds.lock().expect("threshold lock poisoned");
        (
            Duration::from_millis(guard.unresponsive_ms),
            Duration::from_millis(guard.disconnected_ms),
        )
    }

    pub fn set_unresponsive_after(&self, timeout: Duration) {
        let mut guard = self.thresholds.lock().expect("threshold lock poisoned");
        guard.unresponsive_ms = timeout.as_millis() as u64;
        Self::repair(&mut guard);
    }

    pub fn set_disconnected_after(&self, timeout: Duration) {
        let mut guard = self.thresholds.lock().expect("threshold lock poisoned");
        guard.disconnected_ms = timeout.as_millis() as u64;
        Self::repair(&mut guard);
    }
}
