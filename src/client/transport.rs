//! Single-attempt HTTP transport.
//!
//! # Responsibilities
//! - Issue one completion POST with a bearer credential
//! - Enforce the hard attempt deadline by dropping the in-flight future
//! - Classify the outcome into `ChatError` variants
//!
//! # Design Decisions
//! - One `reqwest::Client` per connect timeout, cached and reused
//! - The deadline covers connect, headers and the full body

use dashmap::DashMap;
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE, PRAGMA};
use reqwest::StatusCode;
use std::time::{Duration, Instant};
use tokio::time::timeout;

use crate::chat::wire::{parse_reply, ParsedReply};
use crate::client::types::{ChatError, ChatResult};
use crate::credentials::Credential;
use crate::resilience::timeouts::AttemptTimeouts;

/// Cached clients beyond this count are dropped and rebuilt on demand.
const MAX_CACHED_CLIENTS: usize = 32;

/// Longest error body excerpt kept in `ChatError::Http`.
const ERROR_EXCERPT_CHARS: usize = 200;

/// A successful attempt.
#[derive(Debug, Clone)]
pub struct AttemptSuccess {
    pub reply: ParsedReply,
    pub elapsed: Duration,
}

/// HTTP client factory and request executor.
#[derive(Debug)]
pub struct HttpTransport {
    clients: DashMap<u64, reqwest::Client>,
    proxy_url: Option<String>,
}

impl HttpTransport {
    /// Create a transport, validating the proxy URL if one is given.
    pub fn new(proxy_url: Option<String>) -> ChatResult<Self> {
        if let Some(proxy) = &proxy_url {
            reqwest::Proxy::all(proxy.as_str()).map_err(|e| {
                ChatError::Precondition(format!("invalid proxy URL '{}': {}", proxy, e))
            })?;
        }
        Ok(Self {
            clients: DashMap::new(),
            proxy_url,
        })
    }

    /// Client whose connect timeout is `connect`.
    pub fn client_for(&self, connect: Duration) -> ChatResult<reqwest::Client> {
        let key = connect.as_millis() as u64;
        if let Some(client) = self.clients.get(&key) {
            return Ok(client.value().clone());
        }

        let mut builder = reqwest::Client::builder().connect_timeout(connect);
        builder = match &self.proxy_url {
            Some(proxy) => builder.proxy(reqwest::Proxy::all(proxy.as_str()).map_err(|e| {
                ChatError::Precondition(format!("invalid proxy URL '{}': {}", proxy, e))
            })?),
            None => builder.no_proxy(),
        };
        let client = builder
            .build()
            .map_err(|e| ChatError::Precondition(format!("cannot build HTTP client: {}", e)))?;

        if self.clients.len() >= MAX_CACHED_CLIENTS {
            self.clients.clear();
        }
        self.clients.insert(key, client.clone());
        Ok(client)
    }

    /// Send one completion request to `endpoint`.
    pub async fn send(
        &self,
        endpoint: &str,
        credential: &Credential,
        body: &[u8],
        timeouts: AttemptTimeouts,
    ) -> ChatResult<AttemptSuccess> {
        let client = self.client_for(timeouts.connect)?;
        let start = Instant::now();

        let exchange = async {
            let response = client
                .post(endpoint)
                .bearer_auth(credential.as_str())
                .header(CONTENT_TYPE, "application/json")
                .header(CACHE_CONTROL, "no-cache")
                .header(PRAGMA, "no-cache")
                .body(body.to_vec())
                .send()
                .await?;
            let status = response.status();
            let bytes = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, bytes))
        };

        let (status, bytes) = match timeout(timeouts.request, exchange).await {
            Err(_) => {
                return Err(ChatError::Timeout {
                    endpoint: endpoint.to_string(),
                    after_ms: timeouts.request.as_millis() as u64,
                });
            }
            Ok(Err(e)) => return Err(classify_transport_error(endpoint, e, timeouts)),
            Ok(Ok(exchanged)) => exchanged,
        };
        let elapsed = start.elapsed();

        match status {
            StatusCode::TOO_MANY_REQUESTS => Err(ChatError::RateLimited {
                endpoint: endpoint.to_string(),
            }),
            StatusCode::UNAUTHORIZED => Err(ChatError::Unauthorized {
                endpoint: endpoint.to_string(),
            }),
            s if !s.is_success() => Err(ChatError::Http {
                endpoint: endpoint.to_string(),
                status: s.as_u16(),
                message: excerpt(&bytes),
            }),
            _ => match parse_reply(&bytes) {
                Ok(reply) => Ok(AttemptSuccess { reply, elapsed }),
                Err(message) => Err(ChatError::MalformedResponse {
                    endpoint: endpoint.to_string(),
                    message,
                }),
            },
        }
    }
}

fn classify_transport_error(endpoint: &str, e: reqwest::Error, timeouts: AttemptTimeouts) -> ChatError {
    if e.is_timeout() {
        // Connect timeout fired before the hard deadline.
        return ChatError::Timeout {
            endpoint: endpoint.to_string(),
            after_ms: timeouts.connect.as_millis() as u64,
        };
    }
    ChatError::NetworkUnreachable {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    }
}

fn excerpt(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim();
    if trimmed.chars().count() <= ERROR_EXCERPT_CHARS {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(ERROR_EXCERPT_CHARS).collect();
    format!("{}…", cut)
}
