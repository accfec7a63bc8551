//! Active connectivity pre-test.
//!
//! # Responsibilities
//! - Probe a list of well-known URLs with lightweight HEAD requests
//! - Report the first reachable one
//!
//! Purely informational: the result never changes failover behaviour.

use std::time::Duration;
use tokio::time;

/// Issue `HEAD` to each URL in order, stopping at the first success.
///
/// Returns the URL that answered with a success status, if any.
pub async fn pretest_connectivity(
    client: &reqwest::Client,
    urls: &[String],
    timeout: Duration,
) -> Option<String> {
    for url in urls {
        let request = client
            .head(url)
            .header(reqwest::header::CACHE_CONTROL, "no-store")
            .send();

        match time::timeout(timeout, request).await {
            Ok(Ok(response)) if response.status().is_success() => {
                tracing::info!(url = %url, "Connectivity pre-test passed");
                return Some(url.clone());
            }
            Ok(Ok(response)) => {
                tracing::debug!(url = %url, status = %response.status(), "Pre-test: non-success status");
            }
            Ok(Err(e)) => {
                tracing::debug!(url = %url, error = %e, "Pre-test: connection error");
            }
            Err(_) => {
                tracing::debug!(url = %url, "Pre-test: timeout");
            }
        }
    }
    tracing::warn!(tried = urls.len(), "Connectivity pre-test found no reachable URL");
    None
}
