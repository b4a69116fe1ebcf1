//! Command requests against the viewer's local API.
//!
//! These share the engine's HTTP shape but live outside the poll loop:
//! each call is one POST, issued on demand, through this caller's own
//! client.

use std::time::Duration;

use reqwest::{Client, Url};
use serde_json::json;

use crate::engine::DEFAULT_BASE_URL;
use crate::error::{Error, Result};
use crate::http::{self, ApiResult};
use crate::model::CommandAck;
use crate::utils;

const COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Issues load/seek/pause commands to the viewer.
pub struct ViewerCommands {
    client: Client,
    base: Url,
}

impl ViewerCommands {
    /// Creates a command caller against [`DEFAULT_BASE_URL`].
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        Ok(Self {
            client: http::build_client(COMMAND_TIMEOUT)?,
            base: utils::parse_base_url(base_url)?,
        })
    }

    fn command_url(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", path, e)))
    }

    /// Asks the viewer to load a replay by catalog id.
    ///
    /// An empty or whitespace id is rejected before any request is made.
    pub async fn load_replay(&self, id: &str) -> Result<ApiResult<CommandAck>> {
        utils::validate_replay_id(id)?;
        let url = self.command_url("LoadReplay")?;
        Ok(http::post_json(&self.client, url, &json!({ "Id": id })).await)
    }

    /// Seeks the loaded replay. Negative positions seek to the start.
    pub async fn set_match_time(&self, seconds: f64) -> Result<ApiResult<CommandAck>> {
        let url = self.command_url("MatchTime")?;
        let seconds = clamp_match_time(seconds);
        Ok(http::post_json(&self.client, url, &json!({ "MatchTime": seconds })).await)
    }

    /// Pauses or resumes playback.
    pub async fn set_paused(&self, paused: bool) -> Result<ApiResult<CommandAck>> {
        let url = self.command_url("Pause")?;
        Ok(http::post_json(&self.client, url, &json!({ "Paused": paused })).await)
    }
}

fn clamp_match_time(seconds: f64) -> f64 {
    if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        0.0
    }
}
