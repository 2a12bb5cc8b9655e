use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hookline_core::{Condition, DispatchType, SigningKey, Target};
use hookline_exec::dispatch::http::{HttpClient, HttpError, HttpRequestParts, HttpResponseParts};
use hookline_exec::dispatch::signing;
use hookline_exec::{CallContext, ContextInfo, Dispatcher, EngineConfig};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
enum Reply {
    Status(u16, Value),
    Raw(u16, &'static [u8]),
    Delay(Duration),
    Network,
}

struct MockHttpClient {
    requests: Arc<tokio::sync::Mutex<Vec<HttpRequestParts>>>,
    replies: HashMap<String, Reply>,
}

impl MockHttpClient {
    fn new(replies: &[(&str, Reply)]) -> Self {
        Self {
            requests: Arc::new(tokio::sync::Mutex::new(Vec::new())),
            replies: replies
                .iter()
                .map(|(url, r)| (format!("https://example.com/{url}"), r.clone()))
                .collect(),
        }
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn send(
        &self,
        req: HttpRequestParts,
        _timeout: Duration,
        _max_response_bytes: usize,
    ) -> Result<HttpResponseParts, HttpError> {
        let reply = self
            .replies
            .get(req.url.as_str())
            .cloned()
            .unwrap_or(Reply::Status(200, json!({})));
        self.requests.lock().await.push(req);
        let (status, body) = match reply {
            Reply::Status(status, body) => (status, serde_json::to_vec(&body).unwrap()),
            Reply::Raw(status, body) => (status, body.to_vec()),
            Reply::Delay(d) => {
                tokio::time::sleep(d).await;
                (200, b"{}".to_vec())
            }
            Reply::Network => return Err(HttpError::Network("connection refused".to_string())),
        };
        Ok(HttpResponseParts {
            status,
            headers: BTreeMap::new(),
            body,
        })
    }
}

fn target(id: &str, dispatch_type: DispatchType, interrupt_on_error: bool) -> Target {
    Target {
        id: id.to_string(),
        instance_id: "inst".to_string(),
        name: id.to_string(),
        endpoint: format!("https://example.com/{id}").parse().unwrap(),
        timeout: Duration::from_millis(200),
        dispatch_type,
        interrupt_on_error,
        signing_key: SigningKey::from_bytes(b"key".to_vec()),
    }
}

fn payload() -> ContextInfo {
    ContextInfo::new(
        &Condition::request_method("/pkg.Svc/Method").unwrap(),
        &CallContext::new("inst"),
        json!({"x": 1}),
    )
}

fn dispatcher(http: Arc<MockHttpClient>) -> Dispatcher {
    Dispatcher::new(http, EngineConfig::default())
}

async fn called(http: &MockHttpClient) -> Vec<String> {
    http.requests
        .lock()
        .await
        .iter()
        .map(|r| r.url.path().trim_start_matches('/').to_string())
        .collect()
}

#[tokio::test]
async fn interrupting_webhook_failure_stops_dispatch() {
    let http = Arc::new(MockHttpClient::new(&[("w1", Reply::Status(500, json!({})))]));
    let targets = [
        target("w1", DispatchType::Webhook, true),
        target("w2", DispatchType::Webhook, false),
    ];

    let err = dispatcher(http.clone())
        .dispatch(&targets, payload(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.failure.target_id, "w1");
    assert!(err.failure.reason.contains("500"));
    assert_eq!(called(&http).await, vec!["w1"]);
}

#[tokio::test]
async fn non_interrupting_failure_is_recorded_and_dispatch_continues() {
    let http = Arc::new(MockHttpClient::new(&[("w1", Reply::Network)]));
    let targets = [
        target("w1", DispatchType::Webhook, false),
        target("w2", DispatchType::Webhook, false),
    ];

    let outcome = dispatcher(http.clone())
        .dispatch(&targets, payload(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].target_id, "w1");
    assert_eq!(called(&http).await, vec!["w1", "w2"]);
}

#[tokio::test]
async fn webhook_response_does_not_change_the_payload() {
    let http = Arc::new(MockHttpClient::new(&[("w1", Reply::Status(200, json!({"x": 9})))]));
    let outcome = dispatcher(http)
        .dispatch(&[target("w1", DispatchType::Webhook, true)], payload(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.payload.request, json!({"x": 1}));
}

#[tokio::test]
async fn call_response_replaces_payload_for_later_targets() {
    let http = Arc::new(MockHttpClient::new(&[("c1", Reply::Status(200, json!({"x": 2})))]));
    let targets = [
        target("c1", DispatchType::Call, true),
        target("w2", DispatchType::Webhook, true),
    ];

    let outcome = dispatcher(http.clone())
        .dispatch(&targets, payload(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.payload.request, json!({"x": 2}));
    let requests = http.requests.lock().await;
    let seen: Value = serde_json::from_slice(&requests[1].body).unwrap();
    assert_eq!(seen["request"], json!({"x": 2}));
}

#[tokio::test]
async fn interruption_returns_last_good_payload() {
    let http = Arc::new(MockHttpClient::new(&[
        ("c1", Reply::Status(200, json!({"x": 2}))),
        ("c2", Reply::Raw(200, b"not json")),
    ]));
    let targets = [
        target("c1", DispatchType::Call, true),
        target("c2", DispatchType::Call, true),
        target("w3", DispatchType::Webhook, false),
    ];

    let err = dispatcher(http.clone())
        .dispatch(&targets, payload(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.failure.target_id, "c2");
    assert_eq!(err.payload.request, json!({"x": 2}));
    assert_eq!(called(&http).await, vec!["c1", "c2"]);
}

#[tokio::test]
async fn timeout_is_a_dispatch_failure() {
    let http = Arc::new(MockHttpClient::new(&[("w1", Reply::Delay(Duration::from_secs(5)))]));
    let err = dispatcher(http)
        .dispatch(&[target("w1", DispatchType::Webhook, true)], payload(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.failure.reason, "timed out");
}

#[tokio::test]
async fn async_targets_never_block_or_interrupt() {
    let http = Arc::new(MockHttpClient::new(&[
        ("a1", Reply::Delay(Duration::from_secs(5))),
        ("a2", Reply::Status(500, json!({}))),
    ]));
    let targets = [
        target("a1", DispatchType::Async, true),
        target("a2", DispatchType::Async, true),
        target("w3", DispatchType::Webhook, true),
    ];

    let started = std::time::Instant::now();
    let outcome = dispatcher(http.clone())
        .dispatch(&targets, payload(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(outcome.spawned, 2);
    assert!(outcome.failures.is_empty());
    assert_eq!(outcome.payload.request, json!({"x": 1}));

    tokio::time::sleep(Duration::from_millis(50)).await;
    let mut seen = called(&http).await;
    seen.sort();
    assert_eq!(seen, vec!["a1", "a2", "w3"]);
}

#[tokio::test]
async fn drain_waits_for_async_targets() {
    let http = Arc::new(MockHttpClient::new(&[("a1", Reply::Delay(Duration::from_millis(100)))]));
    let dispatcher = dispatcher(http.clone());

    let started = std::time::Instant::now();
    dispatcher
        .dispatch(&[target("a1", DispatchType::Async, false)], payload(), &CancellationToken::new())
        .await
        .unwrap();
    dispatcher.drain().await;

    assert!(started.elapsed() >= Duration::from_millis(100));
    assert_eq!(called(&http).await, vec!["a1"]);
}

#[tokio::test]
async fn cancellation_aborts_in_flight_dispatch() {
    let http = Arc::new(MockHttpClient::new(&[("w1", Reply::Delay(Duration::from_secs(5)))]));
    let mut slow = target("w1", DispatchType::Webhook, true);
    slow.timeout = Duration::from_secs(10);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let err = dispatcher(http)
        .dispatch(&[slow], payload(), &cancel)
        .await
        .unwrap_err();
    assert_eq!(err.failure.reason, "canceled by caller");
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn requests_carry_a_verifiable_signature() {
    let http = Arc::new(MockHttpClient::new(&[]));
    let t = target("w1", DispatchType::Webhook, false);
    dispatcher(http.clone())
        .dispatch(std::slice::from_ref(&t), payload(), &CancellationToken::new())
        .await
        .unwrap();

    let requests = http.requests.lock().await;
    let req = &requests[0];
    assert_eq!(req.method, "POST");
    assert_eq!(req.headers["Content-Type"], "application/json");
    let header = &req.headers["Hookline-Signature"];
    let now = chrono::Utc::now().timestamp();
    assert!(signing::verify(&t.signing_key, header, &req.body, now, 60));
}
