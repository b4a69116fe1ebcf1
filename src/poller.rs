//! The generic endpoint worker.
//!
//! One poller task per endpoint, all running the same loop: issue one GET
//! through the poller's own dedicated client, stamp the shared
//! last-response instant on success, hand the outcome to the sink, then
//! sleep out the remainder of the endpoint's interval. The interval is
//! re-read from the runtime configuration every cycle, and the sleep is
//! interruptible through the engine's cancellation token.

use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::endpoint::Endpoint;
use crate::engine::Shared;
use crate::http::{self, ApiResult};
use crate::sink::TelemetrySink;

/// Floor for the inter-poll sleep. Keeps a slow endpoint from busy-looping
/// when a request overruns its interval.
pub(crate) const MIN_DELAY: Duration = Duration::from_millis(5);

/// Drives one endpoint until the engine stops.
///
/// `deliver` routes the typed outcome to the matching sink method; it is
/// the only per-endpoint piece of this loop.
pub(crate) async fn run<T, F>(shared: std::sync::Arc<Shared>, endpoint: Endpoint, deliver: F)
where
    T: DeserializeOwned + Send + 'static,
    F: Fn(&dyn TelemetrySink, ApiResult<T>) + Send + Sync + 'static,
{
    // Dedicated client: the engine never shares an HTTP client between
    // workers, so no lock spans a request.
    let client = match http::build_client(shared.timeout(endpoint)) {
        Ok(client) => client,
        Err(e) => {
            warn!("could not build HTTP client for {}: {}", endpoint, e);
            return;
        }
    };
    debug!("poller for {} started", endpoint);

    while shared.should_run() {
        let started = Instant::now();

        if let Some(url) = shared.endpoint_url(endpoint) {
            let result = http::get_json::<T>(&client, url, &[]).await;
            if result.ok() {
                shared.stamp_last_response();
            }
            shared.with_sink(|sink| deliver(sink, result));
        } else {
            warn!("could not build URL for {}", endpoint);
        }

        if shared.is_cancelled() {
            break;
        }

        let interval = shared.config.interval(endpoint);
        let idle = idle_for(interval, started.elapsed());
        tokio::select! {
            _ = shared.cancelled() => break,
            _ = tokio::time::sleep(idle) => {}
        }
    }
    debug!("poller for {} stopped", endpoint);
}

/// Remaining sleep for this cycle, floored at [`MIN_DELAY`].
fn idle_for(interval: Duration, elapsed: Duration) -> Duration {
    let idle = interval.saturating_sub(elapsed);
    if idle <= MIN_DELAY {
        MIN_DELAY
    } else {
        idle
    }
}
