//! In-process stand-in for the identity provider, Graph and the model API.

#![allow(dead_code)]

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use tenant_query_agent::{
    auth::{Credentials, TokenManager},
    http_client::GraphHttpClient,
    router::DirectoryRouter,
};

pub const TENANT: &str = "contoso-tenant";

/// One Graph request as seen by the mock
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub query: HashMap<String, String>,
    pub authorization: Option<String>,
}

#[derive(Default)]
pub struct MockState {
    /// Successful token exchanges so far; tokens are named token-1, token-2, ...
    pub token_requests: AtomicUsize,
    /// When set, the token endpoint rejects the client
    pub reject_credentials: AtomicBool,
    /// Number of upcoming Graph requests answered with 401
    pub unauthorized_remaining: AtomicUsize,
    /// Graph responses by path (without query)
    pub fixtures: Mutex<HashMap<String, (u16, Value)>>,
    /// Graph requests in arrival order
    pub graph_requests: Mutex<Vec<RecordedRequest>>,
    /// Prompts received by the model endpoint
    pub prompts: Mutex<Vec<String>>,
    /// When set, the model endpoint answers 401
    pub reject_model_key: AtomicBool,
}

/// Mock upstream server bound to an ephemeral port
pub struct MockUpstream {
    pub state: Arc<MockState>,
    pub url: String,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockUpstream {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let state = Arc::new(MockState::default());
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let app = Router::new()
            .route("/:tenant/oauth2/v2.0/token", post(handle_token))
            .route("/v1/messages", post(handle_messages))
            .fallback(handle_graph)
            .with_state(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        Self {
            state,
            url: format!("http://127.0.0.1:{}", port),
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Serve `body` with `status` for GET `{path}` (path includes `/v1.0`)
    pub fn fixture(&self, path: &str, status: u16, body: Value) {
        self.state
            .fixtures
            .lock()
            .unwrap()
            .insert(path.to_string(), (status, body));
    }

    pub fn fail_next_graph_requests(&self, count: usize) {
        self.state
            .unauthorized_remaining
            .store(count, Ordering::SeqCst);
    }

    pub fn token_requests(&self) -> usize {
        self.state.token_requests.load(Ordering::SeqCst)
    }

    pub fn graph_requests(&self) -> Vec<RecordedRequest> {
        self.state.graph_requests.lock().unwrap().clone()
    }

    pub fn graph_paths(&self) -> Vec<String> {
        self.graph_requests().into_iter().map(|r| r.path).collect()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.state.prompts.lock().unwrap().clone()
    }

    /// Router pointed at this mock, with credentials
    pub fn router(&self, enrichment_concurrency: usize) -> DirectoryRouter {
        let creds = Credentials::from_parts(
            Some(TENANT.to_string()),
            Some("client-id-0000".to_string()),
            Some("client-secret".to_string()),
        );
        self.router_with(creds, enrichment_concurrency)
    }

    pub fn router_with(
        &self,
        credentials: Option<Credentials>,
        enrichment_concurrency: usize,
    ) -> DirectoryRouter {
        let tokens = Arc::new(TokenManager::new(credentials, self.url.clone(), 5).unwrap());
        let http = Arc::new(GraphHttpClient::new(tokens, self.url.clone(), 4, 5, 5).unwrap());
        DirectoryRouter::new(http, enrichment_concurrency)
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn handle_token(State(state): State<Arc<MockState>>) -> Response {
    if state.reject_credentials.load(Ordering::SeqCst) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": "invalid_client",
                "error_description": "AADSTS7000215: Invalid client secret provided."
            })),
        )
            .into_response();
    }

    let n = state.token_requests.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({
        "token_type": "Bearer",
        "expires_in": 3599,
        "access_token": format!("token-{}", n)
    }))
    .into_response()
}

async fn handle_graph(
    State(state): State<Arc<MockState>>,
    Query(query): Query<HashMap<String, String>>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    state.graph_requests.lock().unwrap().push(RecordedRequest {
        path: uri.path().to_string(),
        query,
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(String::from),
    });

    let remaining = state.unauthorized_remaining.load(Ordering::SeqCst);
    if remaining > 0 {
        state
            .unauthorized_remaining
            .store(remaining - 1, Ordering::SeqCst);
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": {
                    "code": "InvalidAuthenticationToken",
                    "message": "Access token has expired or is not yet valid."
                }
            })),
        )
            .into_response();
    }

    let fixture = state.fixtures.lock().unwrap().get(uri.path()).cloned();
    match fixture {
        Some((status, body)) => (
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Json(body),
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": {
                    "code": "Request_ResourceNotFound",
                    "message": format!("Resource '{}' does not exist.", uri.path())
                }
            })),
        )
            .into_response(),
    }
}

async fn handle_messages(
    State(state): State<Arc<MockState>>,
    Json(body): Json<Value>,
) -> Response {
    if state.reject_model_key.load(Ordering::SeqCst) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "type": "error",
                "error": {"type": "authentication_error", "message": "invalid x-api-key"}
            })),
        )
            .into_response();
    }

    let prompt = body["messages"][0]["content"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    state.prompts.lock().unwrap().push(prompt);

    Json(json!({
        "id": "msg_mock",
        "type": "message",
        "role": "assistant",
        "content": [{"type": "text", "text": "Formatted answer"}],
        "stop_reason": "end_turn"
    }))
    .into_response()
}

pub fn user(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "displayName": name,
        "mail": format!("{}@contoso.com", name.to_lowercase().replace(' ', ".")),
        "userPrincipalName": format!("{}@contoso.com", name.to_lowercase().replace(' ', ".")),
        "accountEnabled": true
    })
}

pub fn group(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "displayName": name,
        "description": format!("{} group", name),
        "mail": Value::Null
    })
}

pub fn page(items: Vec<Value>) -> Value {
    json!({
        "@odata.context": "https://graph.microsoft.com/v1.0/$metadata#directoryObjects",
        "value": items
    })
}
