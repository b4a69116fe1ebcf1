//! Consumer interface for parsed updates and connection-state transitions.

use std::fmt;

use crate::http::ApiResult;
use crate::model::{Killfeed, MatchEvents, MatchStatus, MatchTime, PausedState, PlayerLocations};

/// Derived health of the link to the viewer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// The viewer is not running, not reachable, or has been silent for at
    /// least the disconnected threshold.
    Disconnected,
    /// The viewer process is alive but its API has been silent for at
    /// least the unresponsive threshold. Typically: a large replay is
    /// loading.
    Unresponsive,
    /// The API answered recently.
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Unresponsive => write!(f, "Unresponsive"),
            ConnectionState::Connected => write!(f, "Connected"),
        }
    }
}

/// Receives every poll outcome and every state transition.
///
/// One method per payload kind plus [`on_state`](TelemetrySink::on_state).
/// All methods have default no-op bodies so implementors subscribe to just
/// the updates they care about. The engine invokes these from several
/// workers concurrently; implementations must be safe for that, and a
/// panicking sink is caught and logged by the calling worker rather than
/// propagated.
#[allow(unused_variables)]
pub trait TelemetrySink: Send + Sync {
    /// Called once per actual state transition, plus once at supervisor
    /// start and once, with [`ConnectionState::Disconnected`], at shutdown.
    fn on_state(&self, state: ConnectionState) {}

    fn on_events(&self, update: ApiResult<MatchEvents>) {}

    fn on_status(&self, update: ApiResult<MatchStatus>) {}

    fn on_locations(&self, update: ApiResult<PlayerLocations>) {}

    fn on_killfeed(&self, update: ApiResult<Killfeed>) {}

    fn on_time(&self, update: ApiResult<MatchTime>) {}

    fn on_pause(&self, update: ApiResult<PausedState>) {}
}
