//! Client for the master replay catalog.
//!
//! The catalog lists finished and live replays for the whole community;
//! the viewer only ever loads one of them. Listing is an offset walk over
//! the `find` endpoint: advance by the page length, stop on an empty page
//! or once every unique replay has been seen, then order newest first.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, Url};

use crate::error::{Error, Result};
use crate::http;
use crate::model::{FindResponse, ReplaySummary};
use crate::utils;

/// Default base URL of the master catalog.
pub const DEFAULT_CATALOG_URL: &str = "https://tv.vankrupt.net/";

const CATALOG_TIMEOUT: Duration = Duration::from_secs(10);

/// Read-only catalog queries.
pub struct ReplayCatalog {
    client: Client,
    base: Url,
}

impl ReplayCatalog {
    /// Creates a catalog client against [`DEFAULT_CATALOG_URL`].
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_CATALOG_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        Ok(Self {
            client: http::build_client(CATALOG_TIMEOUT)?,
            base: utils::parse_base_url(base_url)?,
        })
    }

    fn find_url(&self, player: Option<&str>) -> Result<Url> {
        let mut url = self
            .base
            .join("find")
            .map_err(|e| Error::InvalidUrl(format!("find: {}", e)))?;
        if let Some(player) = player {
            url.path_segments_mut()
                .map_err(|_| Error::InvalidUrl("catalog URL cannot carry a path".into()))?
                .push(player);
        }
        Ok(url)
    }

    /// Fetches the full replay list, optionally filtered to one player
    /// name, newest first.
    pub async fn list_replays(&self, player: Option<&str>) -> Result<Vec<ReplaySummary>> {
        let mut seen = HashSet::new();
        let mut replays = Vec::new();
        let mut offset: u64 = 0;

        loop {
            let url = self.find_url(player)?;
            let offset_value = offset.to_string();
            let page = http::get_json::<FindResponse>(
                &self.client,
                url,
                &[("offset", Some(offset_value.as_str()))],
            )
            .await;
            if !page.ok() {
                return Err(Error::Engine(format!(
                    "catalog request failed: {}",
                    page.error().unwrap_or("unknown")
                )));
            }
            let response = page.into_data().unwrap_or_default();
            if response.replays.is_empty() {
                break;
            }
            offset += response.replays.len() as u64;
            absorb(&mut seen, &mut replays, response.replays);
            if replays.len() as u64 >= response.total {
                break;
            }
        }

        sort_newest_first(&mut replays, Utc::now());
        Ok(replays)
    }
}

/// Folds one page into the accumulated list, dropping ids already seen.
fn absorb(seen: &mut HashSet<String>, out: &mut Vec<ReplaySummary>, page: Vec<ReplaySummary>) {
    for replay in page {
        if seen.insert(replay.id.clone()) {
            out.push(replay);
        }
    }
}

fn sort_newest_first(replays: &mut [ReplaySummary], now: DateTime<Utc>) {
    replays.sort_by_key(|r| std::cmp::Reverse(r.created_at(now)));
}
