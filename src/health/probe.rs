//! Fire-and-forget connectivity probes.
//!
//! Sent between attempts after repeated failures to nudge DNS caches and
//! connection pools. Results are ignored and never awaited by the caller.

use std::time::Duration;
use tokio::task::JoinHandle;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Spawn one GET per URL. The returned handles may be dropped.
pub fn fire_probes(client: &reqwest::Client, urls: &[String]) -> Vec<JoinHandle<()>> {
    urls.iter()
        .map(|url| {
            let client = client.clone();
            let url = url.clone();
            tokio::spawn(async move {
                let request = client
                    .get(&url)
                    .header(reqwest::header::CACHE_CONTROL, "no-store")
                    .timeout(PROBE_TIMEOUT)
                    .send();
                match request.await {
                    Ok(response) => tracing::trace!(url = %url, status = %response.status(), "Probe answered"),
                    Err(e) => tracing::trace!(url = %url, error = %e, "Probe failed"),
                }
            })
        })
        .collect()
}
