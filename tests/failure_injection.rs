//! Failure injection tests for the failover client.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use failover_chat::credentials::Credential;
use failover_chat::store::{keys, load_json, KeyValueStore, MemoryStore};
use failover_chat::{ChatError, Conversation, FailoverClient};

mod common;

fn hello() -> Conversation {
    let mut conversation = Conversation::new();
    conversation.push_user("hello");
    conversation
}

fn counter() -> Arc<AtomicU32> {
    Arc::new(AtomicU32::new(0))
}

#[tokio::test]
async fn test_single_endpoint_success() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    let addr = common::start_programmable_backend(move |req| {
        s.lock().unwrap().push(req);
        async { (200, common::completion_body("hi there")) }
    })
    .await;
    let url = common::endpoint_url(addr);

    let store = Arc::new(MemoryStore::new());
    let client = FailoverClient::new(
        common::test_config(vec![url.clone()]),
        vec![Credential::new("sk-primary")],
        store.clone(),
    )
    .unwrap();

    let completion = client.complete(&hello()).await.unwrap();
    assert_eq!(completion.content, "hi there");
    assert_eq!(completion.endpoint, url);
    assert_eq!(completion.model.as_deref(), Some("mock-model"));
    assert_eq!(completion.attempts, 1);

    let history = client.history();
    assert!(history.get(&url).unwrap().succeeded);
    assert_eq!(client.preferred_endpoint().as_deref(), Some(url.as_str()));

    let stored: Option<String> = load_json(store.as_ref(), keys::LAST_SUCCESSFUL_ENDPOINT).unwrap();
    assert_eq!(stored.as_deref(), Some(url.as_str()));

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].authorization.as_deref(), Some("Bearer sk-primary"));

    let body: serde_json::Value = serde_json::from_str(&seen[0].body).unwrap();
    assert_eq!(body["model"], "gpt-3.5-turbo");
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.first().unwrap()["role"], "system");
    assert_eq!(messages.last().unwrap()["role"], "user");
    assert_eq!(messages.last().unwrap()["content"], "hello");
}

#[tokio::test]
async fn test_timeout_fails_over_to_next_endpoint() {
    let slow = common::start_programmable_backend(|_| async {
        common::stall().await;
        (200, common::completion_body("too late"))
    })
    .await;
    let fast = common::start_mock_backend("from fast").await;
    let slow_url = common::endpoint_url(slow);
    let fast_url = common::endpoint_url(fast);

    let mut config = common::test_config(vec![slow_url.clone(), fast_url.clone()]);
    config.timeouts.request_ms = 300;

    let client = FailoverClient::new(config, vec![Credential::new("sk-a")], Arc::new(MemoryStore::new())).unwrap();
    let completion = client.complete(&hello()).await.unwrap();

    assert_eq!(completion.content, "from fast");
    assert_eq!(completion.endpoint, fast_url);
    assert_eq!(completion.attempts, 2);

    let history = client.history();
    assert!(!history.get(&slow_url).unwrap().succeeded);
    assert!(history.get(&fast_url).unwrap().succeeded);
}

#[tokio::test]
async fn test_unauthorized_rotates_credentials_then_exhausts() {
    let a_auth = Arc::new(Mutex::new(Vec::new()));
    let b_auth = Arc::new(Mutex::new(Vec::new()));

    let a = a_auth.clone();
    let addr_a = common::start_programmable_backend(move |req| {
        a.lock().unwrap().push(req.authorization);
        async { (401, "{\"error\":\"invalid key\"}".to_string()) }
    })
    .await;
    let b = b_auth.clone();
    let addr_b = common::start_programmable_backend(move |req| {
        b.lock().unwrap().push(req.authorization);
        async { (401, "{\"error\":\"invalid key\"}".to_string()) }
    })
    .await;

    let config = common::test_config(vec![common::endpoint_url(addr_a), common::endpoint_url(addr_b)]);
    let budget = config.retries.budget();
    let client = FailoverClient::new(
        config,
        vec![Credential::new("sk-one"), Credential::new("sk-two")],
        Arc::new(MemoryStore::new()),
    )
    .unwrap();

    let err = client.complete(&hello()).await.unwrap_err();
    match &err {
        ChatError::AllEndpointsExhausted {
            attempts,
            attempted,
            last_error,
            suggestions,
        } => {
            assert_eq!(*attempts, 3);
            assert!(*attempts <= budget + 2);
            assert_eq!(attempted.len(), 2);
            assert!(matches!(**last_error, ChatError::Unauthorized { .. }));
            assert!(!suggestions.is_empty());
        }
        other => panic!("expected AllEndpointsExhausted, got {:?}", other),
    }

    // The first endpoint is retried once with the rotated credential.
    assert_eq!(
        *a_auth.lock().unwrap(),
        vec![Some("Bearer sk-one".to_string()), Some("Bearer sk-two".to_string())]
    );
    assert_eq!(*b_auth.lock().unwrap(), vec![Some("Bearer sk-two".to_string())]);
    assert_eq!(client.active_credential_index(), 1);
}

#[tokio::test]
async fn test_empty_conversation_makes_no_requests() {
    let hits = counter();
    let h = hits.clone();
    let addr = common::start_programmable_backend(move |_| {
        h.fetch_add(1, Ordering::SeqCst);
        async { (200, common::completion_body("unused")) }
    })
    .await;

    let client = FailoverClient::new(
        common::test_config(vec![common::endpoint_url(addr)]),
        vec![Credential::new("sk-a")],
        Arc::new(MemoryStore::new()),
    )
    .unwrap();

    let err = client.complete(&Conversation::new()).await.unwrap_err();
    assert!(matches!(err, ChatError::Precondition(_)));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_endpoints_tried_in_priority_order() {
    let order = Arc::new(Mutex::new(Vec::new()));

    let o = order.clone();
    let first = common::start_programmable_backend(move |_| {
        o.lock().unwrap().push("first");
        async { (500, "{}".to_string()) }
    })
    .await;
    let o = order.clone();
    let second = common::start_programmable_backend(move |_| {
        o.lock().unwrap().push("second");
        async { (503, "{}".to_string()) }
    })
    .await;
    let o = order.clone();
    let third = common::start_programmable_backend(move |_| {
        o.lock().unwrap().push("third");
        async { (200, common::completion_body("third wins")) }
    })
    .await;

    let client = FailoverClient::new(
        common::test_config(vec![
            common::endpoint_url(first),
            common::endpoint_url(second),
            common::endpoint_url(third),
        ]),
        vec![Credential::new("sk-a")],
        Arc::new(MemoryStore::new()),
    )
    .unwrap();

    let completion = client.complete(&hello()).await.unwrap();
    assert_eq!(completion.content, "third wins");
    assert_eq!(completion.attempts, 3);
    assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
}

#[tokio::test]
async fn test_preferred_endpoint_tried_first_on_next_call() {
    let broken_hits = counter();
    let h = broken_hits.clone();
    let broken = common::start_programmable_backend(move |_| {
        h.fetch_add(1, Ordering::SeqCst);
        async { (500, "{}".to_string()) }
    })
    .await;
    let healthy = common::start_mock_backend("ok").await;
    let healthy_url = common::endpoint_url(healthy);
    let urls = vec![common::endpoint_url(broken), healthy_url.clone()];

    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let client = FailoverClient::new(
        common::test_config(urls.clone()),
        vec![Credential::new("sk-a")],
        store.clone(),
    )
    .unwrap();

    client.complete(&hello()).await.unwrap();
    assert_eq!(broken_hits.load(Ordering::SeqCst), 1);

    let completion = client.complete(&hello()).await.unwrap();
    assert_eq!(completion.endpoint, healthy_url);
    assert_eq!(completion.attempts, 1);
    assert_eq!(broken_hits.load(Ordering::SeqCst), 1);

    // A fresh client sharing the store starts from the same preference.
    let restarted = FailoverClient::new(common::test_config(urls), vec![Credential::new("sk-a")], store).unwrap();
    assert_eq!(restarted.preferred_endpoint().as_deref(), Some(healthy_url.as_str()));
    let completion = restarted.complete(&hello()).await.unwrap();
    assert_eq!(completion.endpoint, healthy_url);
    assert_eq!(broken_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_malformed_response_stops_failover() {
    let fallback_hits = counter();
    let garbled = common::start_programmable_backend(|_| async { (200, "not json at all".to_string()) }).await;
    let h = fallback_hits.clone();
    let fallback = common::start_programmable_backend(move |_| {
        h.fetch_add(1, Ordering::SeqCst);
        async { (200, common::completion_body("unused")) }
    })
    .await;
    let garbled_url = common::endpoint_url(garbled);

    let client = FailoverClient::new(
        common::test_config(vec![garbled_url.clone(), common::endpoint_url(fallback)]),
        vec![Credential::new("sk-a")],
        Arc::new(MemoryStore::new()),
    )
    .unwrap();

    let err = client.complete(&hello()).await.unwrap_err();
    assert!(matches!(err, ChatError::MalformedResponse { .. }));
    assert!(!err.is_retryable());
    assert_eq!(fallback_hits.load(Ordering::SeqCst), 0);
    assert!(!client.history().get(&garbled_url).unwrap().succeeded);
}

#[tokio::test]
async fn test_rate_limited_endpoint_is_skipped() {
    let limited = common::start_programmable_backend(|_| async { (429, "{}".to_string()) }).await;
    let healthy = common::start_mock_backend("after rate limit").await;
    let limited_url = common::endpoint_url(limited);

    let client = FailoverClient::new(
        common::test_config(vec![limited_url.clone(), common::endpoint_url(healthy)]),
        vec![Credential::new("sk-a")],
        Arc::new(MemoryStore::new()),
    )
    .unwrap();

    let completion = client.complete(&hello()).await.unwrap();
    assert_eq!(completion.content, "after rate limit");
    assert!(!client.history().get(&limited_url).unwrap().succeeded);
    // Credentials are only rotated on authorization failures.
    assert_eq!(client.active_credential_index(), 0);
}

#[tokio::test]
async fn test_unreachable_endpoint_fails_over() {
    let dead_url = common::endpoint_url(common::unused_addr());
    let healthy = common::start_mock_backend("reachable").await;

    let client = FailoverClient::new(
        common::test_config(vec![dead_url.clone(), common::endpoint_url(healthy)]),
        vec![Credential::new("sk-a")],
        Arc::new(MemoryStore::new()),
    )
    .unwrap();

    let completion = client.complete(&hello()).await.unwrap();
    assert_eq!(completion.content, "reachable");
    assert!(!client.history().get(&dead_url).unwrap().succeeded);
}

#[tokio::test]
async fn test_retry_budget_limits_attempts() {
    let hits: Vec<Arc<AtomicU32>> = (0..4).map(|_| counter()).collect();
    let mut urls = Vec::new();
    for h in &hits {
        let h = h.clone();
        let addr = common::start_programmable_backend(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
            async { (502, "{}".to_string()) }
        })
        .await;
        urls.push(common::endpoint_url(addr));
    }

    let mut config = common::test_config(urls);
    config.retries.max_attempts = 2;
    config.retries.auto_retry = false;

    let client = FailoverClient::new(config, vec![Credential::new("sk-a")], Arc::new(MemoryStore::new())).unwrap();
    let err = client.complete(&hello()).await.unwrap_err();

    match err {
        ChatError::AllEndpointsExhausted {
            attempts,
            attempted,
            last_error,
            ..
        } => {
            assert_eq!(attempts, 2);
            assert_eq!(attempted.len(), 2);
            assert!(matches!(*last_error, ChatError::Http { status: 502, .. }));
        }
        other => panic!("expected AllEndpointsExhausted, got {:?}", other),
    }

    let counts: Vec<u32> = hits.iter().map(|h| h.load(Ordering::SeqCst)).collect();
    assert_eq!(counts, vec![1, 1, 0, 0]);
}

#[tokio::test]
async fn test_adaptive_factor_tracks_outcomes() {
    let failing = common::start_programmable_backend(|_| async { (500, "{}".to_string()) }).await;
    let healthy = common::start_mock_backend("ok").await;

    let client = FailoverClient::new(
        common::test_config(vec![common::endpoint_url(failing), common::endpoint_url(healthy)]),
        vec![Credential::new("sk-a")],
        Arc::new(MemoryStore::new()),
    )
    .unwrap();
    assert_eq!(client.adaptive_factor(), 1.0);

    // One failure (+0.1) then one success (-0.1).
    client.complete(&hello()).await.unwrap();
    assert!((client.adaptive_factor() - 1.0).abs() < 1e-9);

    let all_failing = common::start_programmable_backend(|_| async { (500, "{}".to_string()) }).await;
    let mut config = common::test_config(vec![common::endpoint_url(all_failing)]);
    config.retries.max_attempts = 1;
    config.retries.auto_retry = false;
    let client = FailoverClient::new(config, vec![Credential::new("sk-a")], Arc::new(MemoryStore::new())).unwrap();
    for _ in 0..15 {
        let _ = client.complete(&hello()).await;
    }
    assert!(client.adaptive_factor() <= 2.0);
    assert!(client.adaptive_factor() > 1.0);
}

/// Endpoints that answer 500 and log their label, plus one healthy endpoint.
async fn failing_then_healthy(
    failing: &[&'static str],
    log: &Arc<Mutex<Vec<&'static str>>>,
) -> Vec<String> {
    let mut urls = Vec::new();
    for label in failing {
        let l = log.clone();
        let label = *label;
        let addr = common::start_programmable_backend(move |_| {
            l.lock().unwrap().push(label);
            async { (500, "{}".to_string()) }
        })
        .await;
        urls.push(common::endpoint_url(addr));
    }
    let l = log.clone();
    let healthy = common::start_programmable_backend(move |_| {
        l.lock().unwrap().push("healthy");
        async { (200, common::completion_body("recovered")) }
    })
    .await;
    urls.push(common::endpoint_url(healthy));
    urls
}

async fn wait_for_connectivity_check(log: &Arc<Mutex<Vec<&'static str>>>) -> bool {
    for _ in 0..50 {
        if log.lock().unwrap().contains(&"connectivity") {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test]
async fn test_connectivity_check_fires_after_third_consecutive_failure() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let l = log.clone();
    let check = common::start_programmable_backend(move |_| {
        l.lock().unwrap().push("connectivity");
        async { (200, "{}".to_string()) }
    })
    .await;

    let urls = failing_then_healthy(&["a", "b", "c"], &log).await;
    let mut config = common::test_config(urls);
    config.probe.enabled = true;
    config.probe.urls = vec![format!("http://{}/favicon.ico", check)];

    let client = FailoverClient::new(config, vec![Credential::new("sk-a")], Arc::new(MemoryStore::new())).unwrap();
    let completion = client.complete(&hello()).await.unwrap();
    assert_eq!(completion.content, "recovered");
    assert_eq!(completion.attempts, 4);

    assert!(wait_for_connectivity_check(&log).await);
    let log = log.lock().unwrap();
    let position = |label| log.iter().position(|l| *l == label).unwrap();
    assert!(position("connectivity") > position("c"));
    assert_eq!(log.iter().filter(|l| **l == "connectivity").count(), 1);
}

#[tokio::test]
async fn test_connectivity_check_not_fired_below_threshold() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let l = log.clone();
    let check = common::start_programmable_backend(move |_| {
        l.lock().unwrap().push("connectivity");
        async { (200, "{}".to_string()) }
    })
    .await;

    let urls = failing_then_healthy(&["a", "b"], &log).await;
    let mut config = common::test_config(urls);
    config.probe.enabled = true;
    config.probe.urls = vec![format!("http://{}/favicon.ico", check)];

    let client = FailoverClient::new(config, vec![Credential::new("sk-a")], Arc::new(MemoryStore::new())).unwrap();
    let completion = client.complete(&hello()).await.unwrap();
    assert_eq!(completion.content, "recovered");
    assert_eq!(completion.attempts, 3);

    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    assert_eq!(*log.lock().unwrap(), vec!["a", "b", "healthy"]);
}
