mod session_support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use hearth::client::{ApiClient, ApiRequest, SessionRecovery};
use hearth::error::HearthError;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use session_support::client_for;

/// Recovery stub that installs `new_token` on the client when it succeeds.
struct StubRecovery {
    client: Arc<ApiClient>,
    new_token: Option<&'static str>,
    calls: AtomicUsize,
}

impl StubRecovery {
    fn install(client: &Arc<ApiClient>, new_token: Option<&'static str>) -> Arc<Self> {
        let stub = Arc::new(Self {
            client: client.clone(),
            new_token,
            calls: AtomicUsize::new(0),
        });
        let recovery: Arc<dyn SessionRecovery> = stub.clone();
        client.set_recovery(Arc::downgrade(&recovery));
        stub
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionRecovery for StubRecovery {
    async fn attempt_recovery(&self) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.new_token {
            Some(token) => {
                self.client.set_auth_token(Some(token.to_string()));
                true
            }
            None => false,
        }
    }
}

#[tokio::test]
async fn attaches_bearer_token_when_set() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/categories"))
        .and(header("authorization", "Bearer token-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": ["cleaning"] })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.set_auth_token(Some("token-1".to_string()));
    let categories: Vec<String> = client.get("/categories").await.unwrap();
    assert_eq!(categories, vec!["cleaning".to_string()]);
}

#[tokio::test]
async fn sends_no_authorization_header_without_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let _: Vec<serde_json::Value> = client.get("/services").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn recovered_401_is_retried_once_with_new_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bookings"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "jwt expired" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bookings"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "count": 3 } })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.set_auth_token(Some("stale".to_string()));
    let recovery = StubRecovery::install(&client, Some("fresh"));

    let body: serde_json::Value = client.get("/bookings").await.unwrap();
    assert_eq!(body, json!({ "count": 3 }));
    assert_eq!(recovery.calls(), 1);
}

#[tokio::test]
async fn declined_recovery_surfaces_original_401_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bookings"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "jwt expired" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.set_auth_token(Some("stale".to_string()));
    let recovery = StubRecovery::install(&client, None);

    let err = client.get::<serde_json::Value>("/bookings").await.unwrap_err();
    assert!(matches!(
        err,
        HearthError::Api { status: 401, ref message } if message == "jwt expired"
    ));
    assert_eq!(recovery.calls(), 1);
}

#[tokio::test]
async fn second_401_after_recovery_is_surfaced_without_another_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bookings"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "nope" })))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.set_auth_token(Some("stale".to_string()));
    let recovery = StubRecovery::install(&client, Some("fresh"));

    let err = client.get::<serde_json::Value>("/bookings").await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert_eq!(recovery.calls(), 1);
}

#[tokio::test]
async fn non_401_failures_do_not_trigger_recovery() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/services/s-1"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({ "message": "admins only" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let recovery = StubRecovery::install(&client, Some("fresh"));

    let err = client.delete::<serde_json::Value>("/services/s-1").await.unwrap_err();
    assert_eq!(err.status(), Some(403));
    assert_eq!(err.to_string(), "API error (status 403): admins only");
    assert_eq!(recovery.calls(), 0);
}

#[tokio::test]
async fn without_registered_recovery_401_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/me"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.get::<serde_json::Value>("/users/me").await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(err.to_string(), "API error (status 401): Unauthorized");
}

#[tokio::test]
async fn retried_request_replays_body_and_query() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bookings"))
        .and(query_param("notify", "true"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/bookings"))
        .and(query_param("notify", "true"))
        .and(header("authorization", "Bearer fresh"))
        .and(body_json(json!({ "serviceId": "s-9", "date": "2026-11-02" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "data": { "id": "b-77" } })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.set_auth_token(Some("stale".to_string()));
    let _recovery = StubRecovery::install(&client, Some("fresh"));

    let request = ApiRequest::post("/bookings")
        .query("notify", "true")
        .json(&json!({ "serviceId": "s-9", "date": "2026-11-02" }))
        .unwrap();
    let created: serde_json::Value = client.send(&request).await.unwrap();
    assert_eq!(created, json!({ "id": "b-77" }));
}

#[tokio::test]
async fn body_without_envelope_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/payments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .get::<Vec<serde_json::Value>>("/payments")
        .await
        .unwrap_err();
    assert!(matches!(err, HearthError::InvalidResponse(msg) if msg.contains("/payments")));

    let raw = client.send_value(&ApiRequest::get("/payments")).await.unwrap();
    assert_eq!(raw, json!({ "items": [] }));
}
