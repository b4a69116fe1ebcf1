//! The closed set of polled viewer endpoints.

use std::fmt;
use std::time::Duration;

/// One of the six read-only endpoints the engine polls.
///
/// Each endpoint binds a relative path on the viewer's local API, a default
/// poll interval and a default request timeout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Events,
    Status,
    Locations,
    Killfeed,
    Time,
    Pause,
}

impl Endpoint {
    /// All endpoints, in a fixed order. The position of an endpoint in this
    /// array is also its [`index`](Endpoint::index).
    pub const ALL: [Endpoint; 6] = [
        Endpoint::Events,
        Endpoint::Status,
        Endpoint::Locations,
        Endpoint::Killfeed,
        Endpoint::Time,
        Endpoint::Pause,
    ];

    /// Relative path appended to the viewer base URL.
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Events => "MatchEvents",
            Endpoint::Status => "MatchStatus",
            Endpoint::Locations => "PlayersPos",
            Endpoint::Killfeed => "Killfeed",
            Endpoint::Time => "MatchTime",
            Endpoint::Pause => "Pause",
        }
    }

    /// Default period between successive polls of this endpoint.
    pub fn default_interval(&self) -> Duration {
        match self {
            Endpoint::Events => Duration::from_millis(5_000),
            Endpoint::Status => Duration::from_millis(1_000),
            Endpoint::Locations => Duration::from_millis(500),
            Endpoint::Killfeed => Duration::from_millis(1_250),
            Endpoint::Time => Duration::from_millis(125),
            Endpoint::Pause => Duration::from_millis(125),
        }
    }

    /// Default wall-time bound for one request against this endpoint.
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(1_000)
    }

    /// Stable index into per-endpoint tables.
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}
