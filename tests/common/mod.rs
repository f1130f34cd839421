//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::Query;
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::{any, get};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use fetchwizard::http::{Client, Fetch, RawRequest, RawResponse, ReqwestFetch, TransportError};

/// Start the test application on an ephemeral port and return its root URL.
pub async fn start_test_server() -> String {
    let app = Router::new()
        .route("/ok", get(|| async { "ok" }))
        .route("/params", get(params))
        .route("/url/{*rest}", get(url_echo))
        .route("/post", any(post))
        .route("/binary", get(binary))
        .route("/echo", any(echo))
        .route("/slow", get(slow))
        .fallback(not_found);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    format!("http://{}", addr)
}

/// Join a path onto the test server root.
pub fn url(root: &str, path: &str) -> String {
    format!("{}/{}", root, path.trim_start_matches('/'))
}

/// A client talking to the test server without system proxies.
pub fn client() -> Client {
    let http = reqwest::Client::builder().no_proxy().build().unwrap();
    Client::with_fetch(ReqwestFetch::from_client(http))
}

async fn params(Query(query): Query<BTreeMap<String, String>>) -> Json<BTreeMap<String, String>> {
    Json(query)
}

async fn url_echo(uri: Uri) -> String {
    let full = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    full.strip_prefix("/url").unwrap_or(full).to_string()
}

async fn post(headers: HeaderMap, body: Bytes) -> Json<Value> {
    let body = serde_json::from_slice::<Value>(&body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()));
    let headers: HashMap<String, String> = headers
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
        .collect();
    Json(json!({ "body": body, "headers": headers }))
}

async fn binary() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/octet-stream")], Bytes::from_static(b"binary"))
}

async fn echo(body: Bytes) -> Json<Value> {
    Json(json!({ "body": String::from_utf8_lossy(&body) }))
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(5)).await;
    "late"
}

async fn not_found(uri: Uri) -> impl IntoResponse {
    let message = format!("Cannot find any route matching {}.", uri.path());
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "statusCode": 404, "statusMessage": message, "stack": [] })),
    )
}

/// One scripted outcome of a [`ScriptedFetch`] attempt.
#[derive(Clone)]
pub enum Step {
    Status(u16, &'static str),
    NetworkError,
    Hang,
}

/// A fetch backend that replays a script and counts attempts. The last step
/// repeats once the script runs out.
#[derive(Clone)]
pub struct ScriptedFetch {
    steps: Arc<Mutex<Vec<Step>>>,
    attempts: Arc<AtomicU32>,
}

impl ScriptedFetch {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Arc::new(Mutex::new(steps)),
            attempts: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn always(step: Step) -> Self {
        Self::new(vec![step])
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetch for ScriptedFetch {
    async fn fetch(&self, request: RawRequest) -> Result<RawResponse, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let step = {
            let mut steps = self.steps.lock().unwrap();
            if steps.len() > 1 {
                steps.remove(0)
            } else {
                steps[0].clone()
            }
        };

        match step {
            Step::Status(code, body) => Ok(RawResponse::new(
                request.url.to_string(),
                StatusCode::from_u16(code).unwrap(),
                HeaderMap::new(),
                Bytes::from_static(body.as_bytes()),
            )),
            Step::NetworkError => Err(TransportError::new("connection refused")),
            Step::Hang => {
                request.signal.cancelled().await;
                Err(TransportError::new("attempt cancelled"))
            }
        }
    }
}
