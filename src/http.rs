//! The engine's single I/O dependency: one-shot JSON requests over HTTP.
//!
//! Every call produces an [`ApiResult`], a tagged outcome carrying either
//! the parsed payload or a classified failure, plus metadata (HTTP status,
//! raw body, timings) either way. Transport failures, protocol failures
//! and decode failures are all data here; nothing in this module returns a
//! crate-level error, because a failed poll is a normal poll.

use std::time::{Duration, Instant};

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Classification of a failed call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// Connection refused, DNS, TLS, or request timeout.
    Transport,
    /// The server answered with a non-2xx status.
    Protocol,
    /// A 2xx body failed to parse into the expected payload.
    Decode,
}

/// Durations measured for one call.
#[derive(Clone, Copy, Debug, Default)]
pub struct Timings {
    /// Send to last body byte.
    pub transport: Duration,
    /// Body interpretation.
    pub processing: Duration,
    /// Everything.
    pub total: Duration,
}

/// Metadata attached to every outcome, success or failure.
#[derive(Clone, Debug, Default)]
pub struct Meta {
    pub status: Option<u16>,
    pub raw_body: Option<String>,
    pub timings: Timings,
}

/// Outcome of one HTTP call.
#[derive(Clone, Debug)]
pub enum ApiResult<T> {
    /// 2xx with a parsed payload, or 2xx with an empty body (`data: None`).
    Ok { data: Option<T>, meta: Meta },
    /// Any failure; `info` carries the server's human-readable diagnostic
    /// when the error envelope provided one.
    Err {
        kind: FailureKind,
        message: String,
        info: Option<String>,
        meta: Meta,
    },
}

impl<T> ApiResult<T> {
    /// True iff the call succeeded (2xx and, when a body was present, it
    /// parsed).
    pub fn ok(&self) -> bool {
        matches!(self, ApiResult::Ok { .. })
    }

    pub fn status(&self) -> Option<u16> {
        self.meta().status
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            ApiResult::Ok { data, .. } => data.as_ref(),
            ApiResult::Err { .. } => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            ApiResult::Ok { data, .. } => data,
            ApiResult::Err { .. } => None,
        }
    }

    /// The failure message, when the call failed.
    pub fn error(&self) -> Option<&str> {
        match self {
            ApiResult::Ok { .. } => None,
            ApiResult::Err { message, .. } => Some(message),
        }
    }

    /// The server's diagnostic string from the error envelope, if any.
    pub fn info(&self) -> Option<&str> {
        match self {
            ApiResult::Ok { .. } => None,
            ApiResult::Err { info, .. } => info.as_deref(),
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            ApiResult::Ok { .. } => None,
            ApiResult::Err { kind, .. } => Some(*kind),
        }
    }

    pub fn meta(&self) -> &Meta {
        match self {
            ApiResult::Ok { meta, .. } | ApiResult::Err { meta, .. } => meta,
        }
    }
}

/// Ordered query parameters. A `None` value emits just the key.
pub type Query<'a> = &'a [(&'a str, Option<&'a str>)];

/// Generic error envelope some endpoints wrap non-2xx bodies in.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    info: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

/// Builds the dedicated client for one caller.
///
/// Every poller and every command caller owns its own client; clients are
/// never shared across workers. The request timeout is fixed per client,
/// exactly like the base viewer expects per endpoint.
pub fn build_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder().cookie_store(true).timeout(timeout).build()
}

/// Replaces the URL's query component with the given ordered pairs.
fn apply_query(url: &mut Url, query: Query<'_>) {
    if query.is_empty() {
        return;
    }
    url.set_query(None);
    let mut pairs = url.query_pairs_mut();
    for (key, value) in query {
        match value {
            Some(value) => {
                pairs.append_pair(key, value);
            }
            None => {
                pairs.append_key_only(key);
            }
        }
    }
}

/// Issues one GET and interprets the response.
pub async fn get_json<T: DeserializeOwned>(
    client: &Client,
    mut url: Url,
    query: Query<'_>,
) -> ApiResult<T> {
    apply_query(&mut url, query);
    let started = Instant::now();
    let outcome = client.get(url).send().await;
    finish(started, outcome).await
}

/// Issues one POST with a JSON body and interprets the response.
pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
    client: &Client,
    url: Url,
    body: &B,
) -> ApiResult<T> {
    let started = Instant::now();
    let outcome = client.post(url).json(body).send().await;
    finish(started, outcome).await
}

async fn finish<T: DeserializeOwned>(
    started: Instant,
    outcome: reqwest::Result<reqwest::Response>,
) -> ApiResult<T> {
    let response = match outcome {
        Ok(response) => response,
        Err(e) => {
            let elapsed = started.elapsed();
            return ApiResult::Err {
                kind: FailureKind::Transport,
                message: e.to_string(),
                info: None,
                meta: Meta {
                    status: e.status().map(|s| s.as_u16()),
                    raw_body: None,
                    timings: Timings {
                        transport: elapsed,
                        processing: Duration::ZERO,
                        total: elapsed,
                    },
                },
            };
        }
    };

    let status = response.status().as_u16();
    let body = response.text().await;
    let transport = started.elapsed();
    let raw = match body {
        Ok(raw) => raw,
        Err(e) => {
            return ApiResult::Err {
                kind: FailureKind::Transport,
                message: e.to_string(),
                info: None,
                meta: Meta {
                    status: Some(status),
                    raw_body: None,
                    timings: Timings {
                        transport,
                        processing: Duration::ZERO,
                        total: started.elapsed(),
                    },
                },
            };
        }
    };

    let parse_started = Instant::now();
    let interpreted = interpret::<T>(status, &raw);
    let processing = parse_started.elapsed();
    let meta = Meta {
        status: Some(status),
        raw_body: Some(raw),
        timings: Timings {
            transport,
            processing,
            total: started.elapsed(),
        },
    };
    match interpreted {
        Ok(data) => ApiResult::Ok { data, meta },
        Err((kind, message, info)) => ApiResult::Err {
            kind,
            message,
            info,
            meta,
        },
    }
}

/// Pure interpretation of a status/body pair.
///
/// 2xx with an empty body is a success without data; 2xx with a body must
/// parse into `T`; non-2xx is a protocol failure, enriched by the generic
/// `{info, data}` envelope when the body decodes as one.
fn interpret<T: DeserializeOwned>(
    status: u16,
    raw: &str,
) -> std::result::Result<Option<T>, (FailureKind, String, Option<String>)> {
    if (200..300).contains(&status) {
        if raw.trim().is_empty() {
            return Ok(None);
        }
        return match serde_json::from_str::<T>(raw) {
            Ok(data) => Ok(Some(data)),
            Err(e) => Err((FailureKind::Decode, e.to_string(), None)),
        };
    }

    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(raw) {
        if envelope.info.is_some() || envelope.data.is_some() {
            let message = match envelope.data {
                Some(Value::String(s)) => s,
                Some(other) => other.to_string(),
                None => format!("HTTP {}", status),
            };
            return Err((FailureKind::Protocol, message, envelope.info));
        }
    }
    Err((FailureKind::Protocol, format!("HTTP {}", status), None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MatchTime;

    #[test]
    fn success_body_parses() {
        let parsed = interpret::<MatchTime>(200, r#"{"MatchTime": 12.5}"#).unwrap();
        assert_eq!(parsed.unwrap().match_time, 12.5);
    }

    #[test]
    fn empty_success_body_is_ok_without_data() {
        assert!(interpret::<MatchTime>(204, "").unwrap().is_none());
        assert!(interpret::<MatchTime>(200, "  \n").unwrap().is_none());
    }

    #[test]
    fn unparsable_success_body_is_a_decode_failure() {
        let (kind, _, info) = interpret::<MatchTime>(200, "not json").unwrap_err();
        assert_eq!(kind, FailureKind::Decode);
        assert_eq!(info, None);
    }

    #[test]
    fn enveloped_failure_extracts_info_and_data() {
        let (kind, message, info) = interpret::<MatchTime>(
            404,
            r#"{"info": "no replay loaded", "data": "ERR_NO_REPLAY"}"#,
        )
        .unwrap_err();
        assert_eq!(kind, FailureKind::Protocol);
        assert_eq!(message, "ERR_NO_REPLAY");
        assert_eq!(info.as_deref(), Some("no replay loaded"));
    }

    #[test]
    fn bare_failure_reports_the_status() {
        let (kind, message, info) = interpret::<MatchTime>(500, "oops").unwrap_err();
        assert_eq!(kind, FailureKind::Protocol);
        assert_eq!(message, "HTTP 500");
        assert_eq!(info, None);
    }

    #[test]
    fn query_replaces_existing_component_and_keeps_order() {
        let mut url = Url::parse("http://localhost:1234/find?stale=1").unwrap();
        apply_query(&mut url, &[("offset", Some("20")), ("brief", None)]);
        assert_eq!(url.query(), Some("offset=20&brief"));
    }

    #[test]
    fn empty_query_leaves_url_untouched() {
        let mut url = Url::parse("http://localhost:1234/find?offset=5").unwrap();
        apply_query(&mut url, &[]);
        assert_eq!(url.query(), Some("offset=5"));
    }
}
