//! Endpoint-failover completion client.
//!
//! # Responsibilities
//! - Try the last known good endpoint first, then the rest in priority order
//! - Retry transient failures within the budget, with per-kind backoff
//! - Rotate credentials on authorization failure without spending budget
//! - Persist preferred endpoint, adaptive factor and connection history
//!
//! # Concurrency
//! `complete()` takes `&self`. Cross-call state lives in one mutex-guarded
//! `RoutingState`; the lock is never held across an await.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::Instrument;
use uuid::Uuid;

use crate::chat::wire::CompletionRequest;
use crate::chat::Conversation;
use crate::client::transport::HttpTransport;
use crate::client::types::{ChatError, ChatResult, Completion};
use crate::config::ChatConfig;
use crate::credentials::{Credential, CredentialRing};
use crate::endpoint::{ConnectionHistory, EndpointList};
use crate::health::probe;
use crate::observability::{metrics, spans};
use crate::resilience::backoff;
use crate::resilience::retries::RetryBudget;
use crate::resilience::timeouts::{AdaptiveTimeoutFactor, AttemptTimeouts};
use crate::resilience::FailureKind;
use crate::store::{self, keys, KeyValueStore};

/// State shared by all calls on one client.
#[derive(Debug)]
struct RoutingState {
    /// Index of the last endpoint that produced a completion.
    preferred: Option<usize>,
    credentials: CredentialRing,
    factor: AdaptiveTimeoutFactor,
    history: ConnectionHistory,
}

/// Bookkeeping for a single call.
#[derive(Debug)]
struct CallProgress {
    attempted: Vec<bool>,
    attempted_urls: Vec<String>,
    network_attempts: u32,
    /// Counted failures on endpoints other than the preferred one.
    fallback_failures: u32,
    consecutive_failures: u32,
    timeouts_seen: u32,
    last_error: Option<ChatError>,
}

impl CallProgress {
    fn new(endpoints: usize) -> Self {
        Self {
            attempted: vec![false; endpoints],
            attempted_urls: Vec::new(),
            network_attempts: 0,
            fallback_failures: 0,
            consecutive_failures: 0,
            timeouts_seen: 0,
            last_error: None,
        }
    }

    fn mark_attempted(&mut self, index: usize, url: &str) {
        self.attempted[index] = true;
        self.attempted_urls.push(url.to_string());
    }

    fn has_unattempted(&self) -> bool {
        self.attempted.iter().any(|a| !a)
    }
}

/// Chat-completion client with endpoint failover.
pub struct FailoverClient {
    config: Arc<ChatConfig>,
    endpoints: EndpointList,
    transport: HttpTransport,
    store: Arc<dyn KeyValueStore>,
    state: Mutex<RoutingState>,
}

impl FailoverClient {
    /// Build a client, restoring persisted preferences from `store`.
    ///
    /// Fails without network I/O if there is no credential or endpoint.
    pub fn new(
        config: impl Into<Arc<ChatConfig>>,
        credentials: Vec<Credential>,
        store: Arc<dyn KeyValueStore>,
    ) -> ChatResult<Self> {
        let config = config.into();
        let credentials = CredentialRing::new(credentials)
            .ok_or_else(|| ChatError::Precondition("at least one credential is required".to_string()))?;
        let endpoints = EndpointList::new(config.endpoints.urls.clone())
            .ok_or_else(|| ChatError::Precondition("at least one endpoint is required".to_string()))?;
        let transport = HttpTransport::new(config.endpoints.proxy_url.clone())?;

        let preferred = match store::load_json::<String>(store.as_ref(), keys::LAST_SUCCESSFUL_ENDPOINT) {
            Ok(Some(url)) => endpoints.index_of(&url),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable last successful endpoint");
                None
            }
        };
        let factor = match store::load_json::<AdaptiveTimeoutFactor>(store.as_ref(), keys::ADAPTIVE_TIMEOUT_FACTOR) {
            Ok(f) => f.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable adaptive timeout factor");
                AdaptiveTimeoutFactor::default()
            }
        };
        let history = match store::load_json::<ConnectionHistory>(store.as_ref(), keys::CONNECTION_HISTORY) {
            Ok(h) => h.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable connection history");
                ConnectionHistory::default()
            }
        };

        tracing::info!(
            endpoints = endpoints.len(),
            credentials = credentials.len(),
            preferred = ?preferred.and_then(|i| endpoints.get(i)),
            adaptive_factor = factor.value(),
            "Failover client initialized"
        );

        Ok(Self {
            config,
            endpoints,
            transport,
            store,
            state: Mutex::new(RoutingState {
                preferred,
                credentials,
                factor,
                history,
            }),
        })
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub fn endpoints(&self) -> &EndpointList {
        &self.endpoints
    }

    /// URL of the last known good endpoint.
    pub fn preferred_endpoint(&self) -> Option<String> {
        let state = self.lock_state();
        state.preferred.and_then(|i| self.endpoints.get(i)).map(str::to_string)
    }

    pub fn adaptive_factor(&self) -> f64 {
        self.lock_state().factor.value()
    }

    /// Snapshot of the connection history.
    pub fn history(&self) -> ConnectionHistory {
        self.lock_state().history.clone()
    }

    pub fn active_credential_index(&self) -> usize {
        self.lock_state().credentials.active_index()
    }

    /// Obtain a completion for `conversation`.
    pub async fn complete(&self, conversation: &Conversation) -> ChatResult<Completion> {
        if conversation.is_empty() {
            return Err(ChatError::Precondition("conversation must not be empty".to_string()));
        }
        let request_id = Uuid::new_v4();
        let span = spans::completion_span(&request_id, conversation.len());
        self.run(conversation, request_id).instrument(span).await
    }

    async fn run(&self, conversation: &Conversation, request_id: Uuid) -> ChatResult<Completion> {
        let messages = conversation.outgoing(self.config.model.system_prompt.as_deref());
        let body = serde_json::to_vec(&CompletionRequest::new(&self.config.model, &messages))
            .map_err(|e| ChatError::Precondition(format!("cannot encode request: {}", e)))?;

        let (preferred, mut credential, credential_count) = {
            let state = self.lock_state();
            (state.preferred, state.credentials.active().clone(), state.credentials.len())
        };
        let mut budget = RetryBudget::new(self.config.retries.budget(), credential_count);
        let mut progress = CallProgress::new(self.endpoints.len());

        for index in self.endpoints.attempt_order(preferred) {
            if budget.exhausted() {
                break;
            }
            if progress.attempted[index] {
                continue;
            }
            let Some(endpoint) = self.endpoints.get(index) else {
                continue;
            };

            // Same endpoint again after a credential rotation.
            loop {
                let timeouts = self.timeouts_for(Some(index) == preferred, progress.fallback_failures);

                tracing::debug!(
                    endpoint = %endpoint,
                    credential = %credential.redacted(),
                    request_timeout_ms = timeouts.request.as_millis() as u64,
                    connect_timeout_ms = timeouts.connect.as_millis() as u64,
                    "Attempting endpoint"
                );

                progress.network_attempts += 1;
                let started = Instant::now();
                let outcome = self.transport.send(endpoint, &credential, &body, timeouts).await;

                let err = match outcome {
                    Ok(success) => {
                        metrics::record_attempt(endpoint, "success", success.elapsed);
                        self.record_success(index, endpoint, success.elapsed);
                        if !progress.attempted_urls.is_empty() {
                            tracing::info!(endpoint = %endpoint, "Recovered on alternate endpoint");
                        }
                        return Ok(Completion {
                            content: success.reply.content,
                            endpoint: endpoint.to_string(),
                            model: success.reply.model,
                            response_time: success.elapsed,
                            attempts: progress.network_attempts,
                            request_id,
                        });
                    }
                    Err(err) => err,
                };

                let elapsed = started.elapsed();
                let label = err.failure_kind().map(|k| k.as_str()).unwrap_or("fatal");
                metrics::record_attempt(endpoint, label, elapsed);
                self.record_failure(endpoint, elapsed);
                progress.consecutive_failures += 1;

                let Some(kind) = err.failure_kind() else {
                    tracing::error!(endpoint = %endpoint, error = %err, "Non-retryable failure");
                    return Err(err);
                };

                if kind == FailureKind::Unauthorized && budget.try_rotation() {
                    if let Some(next) = self.rotate_credential(&credential) {
                        tracing::warn!(
                            endpoint = %endpoint,
                            from = %credential.redacted(),
                            to = %next.redacted(),
                            "Authorization rejected, rotating credential"
                        );
                        credential = next;
                        progress.last_error = Some(err);
                        tokio::time::sleep(backoff::delay_for(kind, progress.timeouts_seen, &self.config.backoff)).await;
                        continue;
                    }
                }

                tracing::warn!(
                    endpoint = %endpoint,
                    kind = %kind,
                    error = %err,
                    attempt = budget.used() + 1,
                    budget = self.config.retries.budget(),
                    "Attempt failed"
                );

                if kind == FailureKind::Timeout {
                    progress.timeouts_seen += 1;
                }
                budget.record_failure();
                if Some(index) != preferred {
                    progress.fallback_failures += 1;
                }
                progress.mark_attempted(index, endpoint);
                progress.last_error = Some(err);

                if !budget.exhausted() && progress.has_unattempted() {
                    let delay = backoff::delay_for(kind, progress.timeouts_seen, &self.config.backoff);
                    tracing::debug!(delay_ms = delay.as_millis() as u64, "Backing off before next endpoint");
                    tokio::time::sleep(delay).await;
                    self.maybe_probe(budget.used(), progress.consecutive_failures);
                }
                break;
            }
        }

        let last_error = progress
            .last_error
            .unwrap_or_else(|| ChatError::Precondition("no endpoint was attempted".to_string()));
        tracing::error!(
            attempts = progress.network_attempts,
            endpoints = progress.attempted_urls.len(),
            "All endpoints exhausted"
        );
        Err(ChatError::exhausted(progress.network_attempts, progress.attempted_urls, last_error))
    }

    /// Deadlines for the next attempt. Growth only counts failed fallbacks.
    fn timeouts_for(&self, is_preferred: bool, fallback_failures: u32) -> AttemptTimeouts {
        if is_preferred {
            return AttemptTimeouts::preferred(&self.config.timeouts);
        }
        let factor = self.lock_state().factor;
        AttemptTimeouts::scaled(&self.config.timeouts, fallback_failures, factor)
    }

    fn maybe_probe(&self, counted_failures: u32, consecutive_failures: u32) {
        let probe_config = &self.config.probe;
        if !probe_config.enabled || probe_config.urls.is_empty() {
            return;
        }
        if counted_failures <= 1 || consecutive_failures <= probe_config.failure_threshold {
            return;
        }
        match self.transport.client_for(Duration::from_millis(self.config.timeouts.connect_ms)) {
            Ok(client) => {
                tracing::debug!(probes = probe_config.urls.len(), "Firing connectivity probes");
                probe::fire_probes(&client, &probe_config.urls);
            }
            Err(e) => tracing::debug!(error = %e, "Skipping probes"),
        }
    }

    fn rotate_credential(&self, failed: &Credential) -> Option<Credential> {
        let next = self.lock_state().credentials.rotate_from(failed);
        if next.is_some() {
            metrics::record_credential_rotation();
        }
        next
    }

    fn record_success(&self, index: usize, endpoint: &str, elapsed: Duration) {
        let (factor, history) = {
            let mut state = self.lock_state();
            state.preferred = Some(index);
            state.factor.on_success();
            state
                .history
                .record(endpoint, true, elapsed.as_millis() as u64, self.config.store.history_cap);
            (state.factor, state.history.clone())
        };
        metrics::record_adaptive_factor(factor.value());

        // Store writes may hit the disk; the routing lock is already released.
        self.persist(keys::LAST_SUCCESSFUL_ENDPOINT, &endpoint);
        self.persist(keys::ADAPTIVE_TIMEOUT_FACTOR, &factor);
        self.persist(keys::CONNECTION_HISTORY, &history);
    }

    fn record_failure(&self, endpoint: &str, elapsed: Duration) {
        let (factor, history) = {
            let mut state = self.lock_state();
            state.factor.on_failure();
            state
                .history
                .record(endpoint, false, elapsed.as_millis() as u64, self.config.store.history_cap);
            (state.factor, state.history.clone())
        };
        metrics::record_adaptive_factor(factor.value());

        self.persist(keys::ADAPTIVE_TIMEOUT_FACTOR, &factor);
        self.persist(keys::CONNECTION_HISTORY, &history);
    }

    /// Best-effort write; failures are logged only.
    fn persist<T: serde::Serialize + ?Sized>(&self, key: &str, value: &T) {
        if let Err(e) = store::save_json(self.store.as_ref(), key, value) {
            tracing::warn!(key = key, error = %e, "Failed to persist connection state");
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, RoutingState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for FailoverClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailoverClient")
            .field("endpoints", &self.endpoints.len())
            .field("model", &self.config.model.model)
            .field("retry_budget", &self.config.retries.budget())
            .finish()
    }
}
