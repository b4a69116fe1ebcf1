//! Wire payloads exchanged with the viewer's local API and with the
//! master replay catalog.
//!
//! The viewer reports far more fields than the engine acts on, so all
//! payloads deserialize tolerantly: unknown fields are ignored and most
//! known fields are optional.

use std::collections::HashMap;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of the match event log.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct MatchEvent {
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "Timestamp", default)]
    pub timestamp: Option<f64>,
    #[serde(rename = "Data", default)]
    pub data: Option<Value>,
}

/// Payload of `MatchEvents`.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct MatchEvents {
    #[serde(rename = "Events", default)]
    pub events: Vec<MatchEvent>,
}

/// Payload of `MatchStatus`.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct MatchStatus {
    #[serde(rename = "MapName", default)]
    pub map_name: Option<String>,
    #[serde(rename = "GameMode", default)]
    pub game_mode: Option<String>,
    #[serde(rename = "RoundState", default)]
    pub round_state: Option<String>,
    #[serde(rename = "Teams", default)]
    pub teams: bool,
    #[serde(rename = "Team0Score", default)]
    pub team0_score: Option<i64>,
    #[serde(rename = "Team1Score", default)]
    pub team1_score: Option<i64>,
}

/// Payload of `PlayersPos`: world position per player id.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct PlayerLocations {
    #[serde(rename = "Locations", default)]
    pub locations: HashMap<String, [f64; 3]>,
}

/// One killfeed line.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct KillfeedEntry {
    #[serde(rename = "Killer", default)]
    pub killer: Option<String>,
    #[serde(rename = "Killed", default)]
    pub killed: Option<String>,
    #[serde(rename = "KilledBy", default)]
    pub killed_by: Option<String>,
    #[serde(rename = "Headshot", default)]
    pub headshot: bool,
    #[serde(rename = "EntryLifespan", default)]
    pub entry_lifespan: Option<f64>,
}

/// Payload of `Killfeed`.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Killfeed {
    #[serde(rename = "Killfeed", default)]
    pub entries: Vec<KillfeedEntry>,
}

/// Payload of `MatchTime`: seconds of replay time.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize)]
pub struct MatchTime {
    #[serde(rename = "MatchTime")]
    pub match_time: f64,
}

/// Payload of `Pause`.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize)]
pub struct PausedState {
    #[serde(rename = "Paused")]
    pub paused: bool,
}

/// Acknowledgement returned by the viewer's command endpoints.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct CommandAck {
    #[serde(rename = "Successful", default)]
    pub successful: bool,
    #[serde(rename = "errorCode", default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i64>,
    #[serde(rename = "errorMessage", default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// One replay as listed by the master catalog.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ReplaySummary {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "friendlyName", default)]
    pub friendly_name: Option<String>,
    #[serde(rename = "gameMode", default)]
    pub game_mode: Option<String>,
    #[serde(rename = "mapName", default)]
    pub map_name: Option<String>,
    #[serde(default)]
    pub competitive: bool,
    #[serde(default)]
    pub workshop_mods: Option<String>,
    #[serde(default)]
    pub live: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(rename = "secondsSince", default, skip_serializing_if = "Option::is_none")]
    pub seconds_since: Option<i64>,
}

impl ReplaySummary {
    /// Creation timestamp used for ordering: the catalog's `created` when
    /// present, otherwise derived from `secondsSince`, otherwise `now`.
    pub fn created_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        if let Some(created) = self.created {
            return created;
        }
        if let Some(seconds) = self.seconds_since {
            return now - ChronoDuration::seconds(seconds);
        }
        now
    }
}

/// Response of the catalog's `find` endpoint.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct FindResponse {
    #[serde(default)]
    pub replays: Vec<ReplaySummary>,
    #[serde(default)]
    pub total: u64,
}
