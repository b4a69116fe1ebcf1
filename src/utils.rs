//! Validation helpers shared by the engine facade and the command callers.

use reqwest::Url;

use crate::error::{Error, Result};

/// Parses and normalizes a viewer base URL.
///
/// Only `http` and `https` URLs with a host are accepted. The path is
/// normalized to end with a slash so that `Url::join` appends endpoint
/// names instead of replacing the last path segment.
pub fn parse_base_url(input: &str) -> Result<Url> {
    let mut url = Url::parse(input).map_err(|e| Error::InvalidUrl(format!("{}: {}", input, e)))?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(Error::InvalidUrl(format!(
                "{}: unsupported scheme '{}'",
                input, other
            )))
        }
    }
    if url.host_str().is_none() {
        return Err(Error::InvalidUrl(format!("{}: missing host", input)));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Validates a replay id before it is sent to the viewer.
pub fn validate_replay_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(Error::InvalidReplayId);
    }
    Ok(())
}
