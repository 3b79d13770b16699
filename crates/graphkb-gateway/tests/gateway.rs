//! End-to-end tests of the update gateway through the axum router, with
//! in-process authenticator and graph collaborators.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use tokio::sync::{Notify, Semaphore};
use tower::ServiceExt;

use graphkb_core::{Asset, Relation, SchemaGraph, SourceId, UpdateKind};
use graphkb_gateway::{
    build_router, AdmissionControl, AuthError, Authenticator, GatewayState, SemaphoreAdmission,
    ACCEPTED_BODY,
};
use graphkb_graph::{GraphError, GraphMutation};

// ── Fakes ────────────────────────────────────────────────────────

struct StaticAuth {
    tokens: HashMap<String, SourceId>,
}

impl StaticAuth {
    fn new(pairs: &[(&str, &str)]) -> Self {
        Self {
            tokens: pairs
                .iter()
                .map(|(token, source)| (token.to_string(), SourceId::new(*source)))
                .collect(),
        }
    }
}

#[async_trait]
impl Authenticator for StaticAuth {
    async fn validate(&self, token: &str) -> Result<Option<SourceId>, AuthError> {
        Ok(self.tokens.get(token).cloned())
    }
}

struct BrokenAuth;

#[async_trait]
impl Authenticator for BrokenAuth {
    async fn validate(&self, _token: &str) -> Result<Option<SourceId>, AuthError> {
        Err(AuthError::Unavailable("registry offline".to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Call {
    kind: UpdateKind,
    source: SourceId,
    payload: serde_json::Value,
}

/// Records every call. Can be told to fail, or to block until the gate opens.
#[derive(Default)]
struct FakeGraph {
    calls: Mutex<Vec<Call>>,
    fail: AtomicBool,
    gate: Option<Semaphore>,
    entered: Notify,
}

impl FakeGraph {
    fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Default::default()
        }
    }

    fn open_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    async fn record<T: serde::Serialize + ?Sized>(
        &self,
        kind: UpdateKind,
        source: &SourceId,
        payload: &T,
    ) -> Result<(), GraphError> {
        self.entered.notify_one();
        if let Some(gate) = &self.gate {
            let _pass = gate.acquire().await.unwrap();
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(GraphError::Rejected("injected failure".to_string()));
        }
        self.calls.lock().unwrap().push(Call {
            kind,
            source: source.clone(),
            payload: serde_json::to_value(payload).unwrap(),
        });
        Ok(())
    }
}

#[async_trait]
impl GraphMutation for FakeGraph {
    async fn update_schema(
        &self,
        source: &SourceId,
        schema: &SchemaGraph,
    ) -> Result<(), GraphError> {
        self.record(UpdateKind::Schema, source, schema).await
    }

    async fn upsert_assets(&self, source: &SourceId, assets: &[Asset]) -> Result<(), GraphError> {
        self.record(UpdateKind::UpsertAssets, source, assets).await
    }

    async fn upsert_relations(
        &self,
        source: &SourceId,
        relations: &[Relation],
    ) -> Result<(), GraphError> {
        self.record(UpdateKind::UpsertRelations, source, relations)
            .await
    }

    async fn remove_assets(&self, source: &SourceId, assets: &[Asset]) -> Result<(), GraphError> {
        self.record(UpdateKind::RemoveAssets, source, assets).await
    }

    async fn remove_relations(
        &self,
        source: &SourceId,
        relations: &[Relation],
    ) -> Result<(), GraphError> {
        self.record(UpdateKind::RemoveRelations, source, relations)
            .await
    }
}

/// Counts acquisition attempts on top of a semaphore admission.
struct CountingAdmission {
    inner: SemaphoreAdmission,
    attempts: AtomicUsize,
}

impl AdmissionControl for CountingAdmission {
    fn try_acquire(&self) -> bool {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.inner.try_acquire()
    }

    fn release(&self) {
        self.inner.release()
    }

    fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    fn in_flight(&self) -> usize {
        self.inner.in_flight()
    }
}

// ── Helpers ──────────────────────────────────────────────────────

struct Harness {
    app: Router,
    graph: Arc<FakeGraph>,
    admission: Arc<CountingAdmission>,
}

fn harness_with(
    capacity: usize,
    authenticator: Arc<dyn Authenticator>,
    graph: FakeGraph,
    max_body_bytes: usize,
) -> Harness {
    let graph = Arc::new(graph);
    let admission = Arc::new(CountingAdmission {
        inner: SemaphoreAdmission::new(capacity),
        attempts: AtomicUsize::new(0),
    });
    let state = GatewayState {
        authenticator,
        admission: admission.clone(),
        graph: graph.clone(),
        max_body_bytes,
    };
    Harness {
        app: build_router(state),
        graph,
        admission,
    }
}

fn harness(capacity: usize, graph: FakeGraph) -> Harness {
    let auth = StaticAuth::new(&[("scanner-token", "scanner"), ("crawler-token", "crawler")]);
    harness_with(capacity, Arc::new(auth), graph, 1024 * 1024)
}

fn request(method: Method, uri: &str, token: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn error_code(response: axum::response::Response) -> String {
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    body["code"].as_str().unwrap().to_string()
}

const ASSETS: &str = r#"{"assets":[{"type":"ip","key":"10.0.0.1"}]}"#;

// ── Accepted ─────────────────────────────────────────────────────

#[tokio::test]
async fn put_assets_is_accepted_and_forwarded() {
    let h = harness(2, FakeGraph::default());

    let response = h
        .app
        .clone()
        .oneshot(request(Method::PUT, "/api/graph/assets", Some("scanner-token"), ASSETS))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, ACCEPTED_BODY);
    assert_eq!(
        h.graph.calls(),
        vec![Call {
            kind: UpdateKind::UpsertAssets,
            source: SourceId::new("scanner"),
            payload: serde_json::json!([{"type": "ip", "key": "10.0.0.1"}]),
        }]
    );
    assert_eq!(h.admission.in_flight(), 0);
}

#[tokio::test]
async fn every_endpoint_forwards_its_decoded_payload() {
    let relation = serde_json::json!({
        "type": "resolves_to",
        "from": {"type": "domain", "key": "example.com"},
        "to": {"type": "ip", "key": "10.0.0.1"},
    });
    let stale = serde_json::json!({
        "type": "resolves_to",
        "from": {"type": "domain", "key": "old.example.com"},
        "to": {"type": "ip", "key": "10.0.0.9"},
    });
    let schema = serde_json::json!({
        "assets": ["domain", "ip"],
        "relations": [{"from_type": "domain", "to_type": "ip", "type": "resolves_to"}],
    });
    let assets = serde_json::json!([{"type": "ip", "key": "10.0.0.1"}]);
    let gone = serde_json::json!([
        {"type": "ip", "key": "10.0.0.7"},
        {"type": "domain", "key": "gone.example.com"},
    ]);

    let cases = vec![
        (
            Method::PUT,
            "/api/graph/schema",
            serde_json::json!({ "schema": schema }),
            UpdateKind::Schema,
            schema.clone(),
        ),
        (
            Method::PUT,
            "/api/graph/assets",
            serde_json::json!({ "assets": assets }),
            UpdateKind::UpsertAssets,
            assets.clone(),
        ),
        (
            Method::PUT,
            "/api/graph/relations",
            serde_json::json!({ "relations": [relation] }),
            UpdateKind::UpsertRelations,
            serde_json::json!([relation]),
        ),
        (
            Method::DELETE,
            "/api/graph/assets",
            serde_json::json!({ "assets": gone }),
            UpdateKind::RemoveAssets,
            gone.clone(),
        ),
        (
            Method::DELETE,
            "/api/graph/relations",
            serde_json::json!({ "relations": [stale, relation] }),
            UpdateKind::RemoveRelations,
            serde_json::json!([stale, relation]),
        ),
    ];

    let h = harness(1, FakeGraph::default());
    for (method, uri, body, _, _) in &cases {
        let response = h
            .app
            .clone()
            .oneshot(request(
                method.clone(),
                uri,
                Some("crawler-token"),
                &body.to_string(),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{method} {uri}");
    }

    let calls = h.graph.calls();
    let expected: Vec<Call> = cases
        .into_iter()
        .map(|(_, _, _, kind, payload)| Call {
            kind,
            source: SourceId::new("crawler"),
            payload,
        })
        .collect();
    assert_eq!(calls, expected);
}

#[tokio::test]
async fn token_query_parameter_is_accepted() {
    let h = harness(1, FakeGraph::default());

    let response = h
        .app
        .clone()
        .oneshot(request(
            Method::PUT,
            "/api/graph/assets?token=scanner-token",
            None,
            ASSETS,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.graph.calls()[0].source, SourceId::new("scanner"));
}

#[tokio::test]
async fn percent_encoded_query_token_is_decoded() {
    let auth = StaticAuth::new(&[("k3y/with+plus=", "scanner")]);
    let h = harness_with(1, Arc::new(auth), FakeGraph::default(), 1024);

    let response = h
        .app
        .clone()
        .oneshot(request(
            Method::PUT,
            "/api/graph/assets?token=k3y%2Fwith%2Bplus%3D",
            None,
            ASSETS,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.graph.calls()[0].source, SourceId::new("scanner"));
}

#[tokio::test]
async fn lowercase_bearer_scheme_is_accepted() {
    let h = harness(1, FakeGraph::default());

    let request = Request::builder()
        .method(Method::PUT)
        .uri("/api/graph/assets")
        .header("authorization", "bearer scanner-token")
        .body(Body::from(ASSETS))
        .unwrap();
    let response = h.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

// ── Authentication ───────────────────────────────────────────────

#[tokio::test]
async fn invalid_credentials_never_reach_admission_or_graph() {
    let h = harness(1, FakeGraph::default());

    for token in [None, Some("bogus")] {
        let response = h
            .app
            .clone()
            .oneshot(request(Method::PUT, "/api/graph/assets", token, ASSETS))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(error_code(response).await, "UNAUTHORIZED");
    }

    assert_eq!(h.admission.attempts.load(Ordering::SeqCst), 0);
    assert!(h.graph.calls().is_empty());
}

#[tokio::test]
async fn authenticator_failure_is_internal_error() {
    let h = harness_with(1, Arc::new(BrokenAuth), FakeGraph::default(), 1024);

    let response = h
        .app
        .clone()
        .oneshot(request(Method::PUT, "/api/graph/assets", Some("scanner-token"), ASSETS))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_code(response).await, "INTERNAL_ERROR");
    assert_eq!(h.admission.attempts.load(Ordering::SeqCst), 0);
    assert!(h.graph.calls().is_empty());
}

// ── Decoding ─────────────────────────────────────────────────────

#[tokio::test]
async fn delete_relations_with_invalid_body_is_malformed() {
    let h = harness(1, FakeGraph::default());

    let response = h
        .app
        .clone()
        .oneshot(request(
            Method::DELETE,
            "/api/graph/relations",
            Some("scanner-token"),
            r#"{"relations":[{"type":"resolves_to","from":"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_code(response).await, "MALFORMED_PAYLOAD");
    assert!(h.graph.calls().is_empty());
    assert_eq!(h.admission.in_flight(), 0);
}

#[tokio::test]
async fn wrong_shape_is_never_partially_forwarded() {
    let h = harness(1, FakeGraph::default());

    // Valid JSON, valid first element, invalid second element.
    let body = r#"{"assets":[{"type":"ip","key":"10.0.0.1"},{"type":"ip"}]}"#;
    let response = h
        .app
        .clone()
        .oneshot(request(Method::PUT, "/api/graph/assets", Some("scanner-token"), body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(h.graph.calls().is_empty());
}

#[tokio::test]
async fn oversized_body_is_malformed() {
    let auth = StaticAuth::new(&[("scanner-token", "scanner")]);
    let h = harness_with(1, Arc::new(auth), FakeGraph::default(), 16);

    let response = h
        .app
        .clone()
        .oneshot(request(Method::PUT, "/api/graph/assets", Some("scanner-token"), ASSETS))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_code(response).await, "MALFORMED_PAYLOAD");
    assert_eq!(h.admission.in_flight(), 0);
}

// ── Forwarding failures ──────────────────────────────────────────

#[tokio::test]
async fn forwarding_failures_release_permits() {
    let graph = FakeGraph::default();
    graph.fail.store(true, Ordering::SeqCst);
    let h = harness(2, graph);

    for _ in 0..5 {
        let response = h
            .app
            .clone()
            .oneshot(request(Method::PUT, "/api/graph/assets", Some("scanner-token"), ASSETS))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error_code(response).await, "INTERNAL_ERROR");
        assert_eq!(h.admission.in_flight(), 0);
    }

    h.graph.fail.store(false, Ordering::SeqCst);
    let response = h
        .app
        .clone()
        .oneshot(request(Method::PUT, "/api/graph/assets", Some("scanner-token"), ASSETS))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// ── Admission ────────────────────────────────────────────────────

#[tokio::test]
async fn second_concurrent_update_is_shed_when_capacity_is_one() {
    let h = harness(1, FakeGraph::gated());

    let first = tokio::spawn(h.app.clone().oneshot(request(
        Method::PUT,
        "/api/graph/assets",
        Some("scanner-token"),
        ASSETS,
    )));
    h.graph.entered.notified().await;
    assert_eq!(h.admission.in_flight(), 1);

    let second = h
        .app
        .clone()
        .oneshot(request(Method::PUT, "/api/graph/assets", Some("crawler-token"), ASSETS))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(error_code(second).await, "TOO_MANY_REQUESTS");

    h.graph.open_gate();
    let first = first.await.unwrap().unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(h.admission.in_flight(), 0);

    let third = h
        .app
        .clone()
        .oneshot(request(Method::PUT, "/api/graph/assets", Some("crawler-token"), ASSETS))
        .await
        .unwrap();
    assert_eq!(third.status(), StatusCode::OK);

    let sources: Vec<SourceId> = h.graph.calls().into_iter().map(|c| c.source).collect();
    assert_eq!(
        sources,
        vec![SourceId::new("scanner"), SourceId::new("crawler")]
    );
}

#[tokio::test]
async fn capacity_is_shared_across_endpoints() {
    let h = harness(1, FakeGraph::gated());

    let held = tokio::spawn(h.app.clone().oneshot(request(
        Method::PUT,
        "/api/graph/assets",
        Some("scanner-token"),
        ASSETS,
    )));
    h.graph.entered.notified().await;

    let response = h
        .app
        .clone()
        .oneshot(request(
            Method::DELETE,
            "/api/graph/relations",
            Some("crawler-token"),
            r#"{"relations":[]}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    h.graph.open_gate();
    assert_eq!(held.await.unwrap().unwrap().status(), StatusCode::OK);
}

#[tokio::test]
async fn cancelled_request_releases_its_permit() {
    let h = harness(1, FakeGraph::gated());

    let task = tokio::spawn(h.app.clone().oneshot(request(
        Method::PUT,
        "/api/graph/assets",
        Some("scanner-token"),
        ASSETS,
    )));
    h.graph.entered.notified().await;
    assert_eq!(h.admission.in_flight(), 1);

    task.abort();
    let err = task.await.unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(h.admission.in_flight(), 0);
    assert!(h.graph.calls().is_empty());
}

#[tokio::test]
async fn health_reports_admission_usage() {
    let h = harness(3, FakeGraph::default());

    let response = h
        .app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["capacity"], 3);
    assert_eq!(body["in_flight"], 0);
}
