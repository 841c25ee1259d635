#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use todo_api::config::Config;
use todo_api::todo::TodoStore;
use tower::ServiceExt;

/// Test context for endpoint tests.
pub struct TestContext {
    // Kept so the directory outlives the test.
    pub dir: TempDir,
    pub data_path: PathBuf,
    pub store: Arc<TodoStore>,
    pub app: Router,
}

/// Opens a store in a fresh temporary directory and builds the full application over it.
pub fn setup() -> anyhow::Result<TestContext> {
    // Allow multiple calls to init for tests.
    let _ = tracing_subscriber::fmt().try_init();
    let dir = tempfile::tempdir()?;
    let data_path = dir.path().join("data").join("todos.json");
    let store = Arc::new(TodoStore::open(&data_path)?);
    let config = Config {
        data_path: Some(data_path.display().to_string()),
        ..Config::default()
    };
    let app = todo_api::web::create_app(&config, store.clone())?;
    Ok(TestContext {
        dir,
        data_path,
        store,
        app,
    })
}

/// Response captured for assertions.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub text: String,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.text)
            .unwrap_or_else(|err| panic!("body is not JSON ({err}): {}", self.text))
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    TestResponse {
        status,
        headers,
        text: String::from_utf8(body.to_vec()).unwrap(),
    }
}

pub fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn get(app: &Router, uri: &str) -> TestResponse {
    send(app, empty_request(Method::GET, uri)).await
}

/// Creates a todo through the API and returns its JSON representation.
pub async fn create_todo(app: &Router, body: Value) -> Value {
    let response = send(app, json_request(Method::POST, "/todos", body)).await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.text);
    response.json()
}

pub fn titles(page: &Value) -> Vec<String> {
    page["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["title"].as_str().unwrap().to_string())
        .collect()
}
