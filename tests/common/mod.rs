//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use failover_chat::ChatConfig;

/// What the mock backend saw.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub authorization: Option<String>,
    pub body: String,
}

/// Start a programmable mock backend on an ephemeral port.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(RecordedRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        let (status, body) = f(request).await;
                        let status_text = match status {
                            200 => "200 OK",
                            401 => "401 Unauthorized",
                            404 => "404 Not Found",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start a backend that always answers with a fixed completion.
pub async fn start_mock_backend(reply: &'static str) -> SocketAddr {
    start_programmable_backend(move |_| async move { (200, completion_body(reply)) }).await
}

/// An address with nothing listening on it.
pub fn unused_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

pub fn endpoint_url(addr: SocketAddr) -> String {
    format!("http://{}/v1/chat/completions", addr)
}

/// A valid chat-completion response body.
pub fn completion_body(content: &str) -> String {
    serde_json::json!({
        "model": "mock-model",
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    })
    .to_string()
}

/// Config with fast timeouts and backoff, probes off.
pub fn test_config(urls: Vec<String>) -> ChatConfig {
    let mut config = ChatConfig::default();
    config.endpoints.urls = urls;
    config.timeouts.request_ms = 2000;
    config.timeouts.connect_ms = 500;
    config.backoff.base_ms = 10;
    config.backoff.timeout_base_ms = 10;
    config.backoff.timeout_step_ms = 5;
    config.backoff.timeout_extra_max_ms = 20;
    config.backoff.rate_limit_base_ms = 10;
    config.backoff.rate_limit_jitter_ms = 10;
    config.backoff.auth_rotation_ms = 5;
    config.probe.enabled = false;
    config
}

/// Sleep long enough to trip any test request timeout.
pub async fn stall() {
    tokio::time::sleep(Duration::from_secs(5)).await;
}

async fn read_request(socket: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..pos]).to_string();
            let content_length = header(&head, "content-length")
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(0);

            while buf.len() < pos + 4 + content_length {
                let n = socket.read(&mut chunk).await.ok()?;
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }

            return Some(RecordedRequest {
                authorization: header(&head, "authorization"),
                body: String::from_utf8_lossy(&buf[pos + 4..]).to_string(),
            });
        }

        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

fn header(head: &str, name: &str) -> Option<String> {
    head.lines().skip(1).find_map(|line| {
        let (key, value) = line.split_once(':')?;
        if key.trim().eq_ignore_ascii_case(name) {
            Some(value.trim().to_string())
        } else {
            None
        }
    })
}
