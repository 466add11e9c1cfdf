//! In-process HTTP server for driving the client in tests.
//!
//! Routes are matched on `(method, path)`. Every request is captured with
//! its headers and body so tests can assert on what the client sent.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use serde_json::Value;
use tokio::net::TcpListener;

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn body_json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("request body is not JSON")
    }
}

#[derive(Debug, Clone)]
pub enum Reply {
    Json(u16, Value),
    /// Status, content type, raw body
    Raw(u16, &'static str, String),
    /// Accept the request and never answer
    Hang,
}

#[derive(Clone, Default)]
struct MockState {
    routes: Arc<Mutex<HashMap<(String, String), Reply>>>,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

pub struct MockServer {
    addr: SocketAddr,
    state: MockState,
}

impl MockServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let addr = listener.local_addr().expect("mock server address");
        let state = MockState::default();

        let app = Router::new().fallback(respond).with_state(state.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, state }
    }

    /// Origin of the server, e.g. `http://127.0.0.1:41234`.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn route(&self, method: &str, path: &str, reply: Reply) -> &Self {
        self.state
            .routes
            .lock()
            .unwrap()
            .insert((method.to_string(), path.to_string()), reply);
        self
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// The single request made to `path`.
    pub fn only_request_to(&self, path: &str) -> CapturedRequest {
        let matching: Vec<_> = self
            .requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect();
        assert_eq!(matching.len(), 1, "expected one request to {}", path);
        matching.into_iter().next().unwrap()
    }
}

/// An address nothing listens on.
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

async fn respond(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = CapturedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        headers: headers
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect(),
        body: body.to_vec(),
    };

    let reply = state
        .routes
        .lock()
        .unwrap()
        .get(&(request.method.clone(), request.path.clone()))
        .cloned()
        .unwrap_or_else(|| Reply::Json(404, serde_json::json!({ "error": "Not found" })));
    state.requests.lock().unwrap().push(request);

    let (status, content_type, body) = match reply {
        Reply::Json(status, value) => (status, "application/json", value.to_string()),
        Reply::Raw(status, content_type, body) => (status, content_type, body),
        Reply::Hang => {
            tokio::time::sleep(Duration::from_secs(300)).await;
            return StatusCode::GATEWAY_TIMEOUT.into_response();
        }
    };

    let status = StatusCode::from_u16(status).expect("valid status code");
    (status, [(CONTENT_TYPE, content_type)], body).into_response()
}
