//! The supervisor: poller lifecycle and connection-state watchdog.
//!
//! The supervisor owns the six poller tasks. It spawns them lazily on its
//! first tick, re-derives the connection state every `monitor_interval`,
//! and notifies the sink only when the state actually changes. On
//! shutdown it joins every poller first, then publishes one final
//! `Disconnected` so the sink always ends on a known state.

use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::endpoint::Endpoint;
use crate::engine::Shared;
use crate::model::{Killfeed, MatchEvents, MatchStatus, MatchTime, PausedState, PlayerLocations};
use crate::poller;
use crate::sink::ConnectionState;

/// Pure state derivation.
///
/// `last` is the instant of the most recent 2xx response. A viewer that
/// never answered is `Disconnected` no matter what the process probe says;
/// a live process whose API has been silent between the two thresholds is
/// `Unresponsive` rather than `Disconnected`, because loading a large
/// replay stalls the API for tens of seconds while the process stays
/// healthy.
pub(crate) fn derive_state(
    last: Option<Instant>,
    now: Instant,
    should_run: bool,
    process_alive: bool,
    unresponsive_after: std::time::Duration,
    disconnected_after: std::time::Duration,
) -> ConnectionState {
    let Some(last) = last else {
        return ConnectionState::Disconnected;
    };
    let age = now.saturating_duration_since(last);
    if !should_run {
        return ConnectionState::Disconnected;
    }
    if !process_alive {
        return ConnectionState::Disconnected;
    }
    if age >= disconnected_after {
        return ConnectionState::Disconnected;
    }
    if age >= unresponsive_after {
        return ConnectionState::Unresponsive;
    }
    ConnectionState::Connected
}

/// Snapshot of the derived state for the shared engine.
pub(crate) fn current_state(shared: &Shared) -> ConnectionState {
    let (unresponsive_after, disconnected_after) = shared.config.thresholds();
    derive_state(
        shared.last_response(),
        Instant::now(),
        shared.should_run(),
        shared.probe_running(),
        unresponsive_after,
        disconnected_after,
    )
}

fn publish(shared: &Shared, state: ConnectionState) {
    shared.with_sink(|sink| sink.on_state(state));
}

fn spawn_poller(shared: &Arc<Shared>, endpoint: Endpoint) -> JoinHandle<()> {
    let shared = shared.clone();
    match endpoint {
        Endpoint::Events => tokio::spawn(poller::run::<MatchEvents, _>(
            shared,
            endpoint,
            |sink, update| sink.on_events(update),
        )),
        Endpoint::Status => tokio::spawn(poller::run::<MatchStatus, _>(
            shared,
            endpoint,
            |sink, update| sink.on_status(update),
        )),
        Endpoint::Locations => tokio::spawn(poller::run::<PlayerLocations, _>(
            shared,
            endpoint,
            |sink, update| sink.on_locations(update),
        )),
        Endpoint::Killfeed => tokio::spawn(poller::run::<Killfeed, _>(
            shared,
            endpoint,
            |sink, update| sink.on_killfeed(update),
        )),
        Endpoint::Time => tokio::spawn(poller::run::<MatchTime, _>(
            shared,
            endpoint,
            |sink, update| sink.on_time(update),
        )),
        Endpoint::Pause => tokio::spawn(poller::run::<PausedState, _>(
            shared,
            endpoint,
            |sink, update| sink.on_pause(update),
        )),
    }
}

/// The supervisor loop. One instance per engine, spawned by `start`.
pub(crate) async fn run(shared: Arc<Shared>) {
    let mut pollers: Vec<(Endpoint, Option<JoinHandle<()>>)> =
        Endpoint::ALL.iter().map(|e| (*e, None)).collect();

    // First tick: always announce the computed state, even when nothing
    // changed yet. With no response seen this is Disconnected.
    let mut last_state = current_state(&shared);
    publish(&shared, last_state);
    info!("connection monitor started in state {}", last_state);

    loop {
        if shared.should_run() {
            for (endpoint, handle) in pollers.iter_mut() {
                let alive = handle.as_ref().map_or(false, |h| !h.is_finished());
                if !alive {
                    if handle.is_some() {
                        warn!("poller for {} is not alive; respawning", endpoint);
                    }
                    *handle = Some(spawn_poller(&shared, *endpoint));
                }
            }
        }

        let current = current_state(&shared);
        if current != last_state {
            info!("connection state changed: {} -> {}", last_state, current);
            last_state = current;
            publish(&shared, current);
        }

        if shared.is_cancelled() {
            break;
        }
        let interval = shared.config.monitor_interval();
        tokio::select! {
            _ = shared.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    // Join every poller before the final notification so no data update
    // can trail it.
    for (endpoint, handle) in pollers {
        if let Some(handle) = handle {
            if handle.await.is_err() {
                warn!("poller for {} failed during shutdown", endpoint);
            }
        }
    }
    publish(&shared, ConnectionState::Disconnected);
    info!("connection monitor stopped");
}
