#![allow(dead_code)]

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use pricebridge_api::config::{ServerConfig, WorkerConfig};
use pricebridge_api::router::build_app_router;
use pricebridge_api::state::AppState;

/// CORS origin used by all test configurations.
pub const TEST_ORIGIN: &str = "http://localhost:5173";

/// The example request from the pricing form.
pub const SAMPLE_BODY: &str = r#"{"area":5000,"bedrooms":3,"bathrooms":2,"stories":2,"mainroad":1,"guestroom":0,"basement":0,"hotwaterheating":0,"airconditioning":1,"parking":1,"prefarea":1,"furnishingstatus":0}"#;

/// Build a test `ServerConfig` that runs `script` through `sh`.
pub fn test_config(script: PathBuf, worker_timeout: Duration) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec![TEST_ORIGIN.to_string()],
        request_timeout_secs: 30,
        worker: WorkerConfig {
            executable: PathBuf::from("sh"),
            script,
            timeout: worker_timeout,
        },
    }
}

/// Write a throwaway worker script. The payload arrives as `$1`.
pub fn write_worker_script(body: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::Builder::new()
        .suffix(".sh")
        .tempfile()
        .expect("create temp file");
    write!(f, "{body}").expect("write body");
    f.flush().expect("flush script");
    f
}

/// Build the production router around a worker script with a 5 s deadline.
///
/// The returned temp file must be kept alive for as long as the app is used.
pub fn build_test_app(worker_body: &str) -> (Router, tempfile::NamedTempFile) {
    build_test_app_with_timeout(worker_body, Duration::from_secs(5))
}

pub fn build_test_app_with_timeout(
    worker_body: &str,
    worker_timeout: Duration,
) -> (Router, tempfile::NamedTempFile) {
    let script = write_worker_script(worker_body);
    let config = test_config(script.path().to_path_buf(), worker_timeout);
    (build_app_router(AppState::new(config)), script)
}

/// Build the router from an explicit configuration.
pub fn build_app_from_config(config: ServerConfig) -> Router {
    build_app_router(AppState::new(config))
}

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: &str) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
