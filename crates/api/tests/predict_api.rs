//! Integration tests for `POST /predict`.
//!
//! Each test runs the production router against a throwaway `sh` worker
//! script that stands in for the Python model.

mod common;

use std::time::{Duration, Instant};

use axum::http::StatusCode;
use common::{
    body_json, body_text, build_test_app, build_test_app_with_timeout, post_json, SAMPLE_BODY,
};
use serde_json::json;

// ---------------------------------------------------------------------------
// Test: successful worker output is passed through verbatim
// ---------------------------------------------------------------------------

#[tokio::test]
async fn prediction_is_passed_through() {
    let (app, _script) = build_test_app(r#"printf '{"prediction": 6500000}'"#);

    let response = post_json(app, "/predict", SAMPLE_BODY).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"prediction": 6500000}));
}

#[tokio::test]
async fn prediction_keeps_key_order_and_digits() {
    let (app, _script) = build_test_app(
        r#"printf '{"prediction": 123456789012345678901234567890, "currency": "INR"}'"#,
    );

    let response = post_json(app, "/predict", SAMPLE_BODY).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "application/json",
        "prediction must be served as JSON"
    );
    assert_eq!(
        body_text(response).await,
        r#"{"prediction": 123456789012345678901234567890, "currency": "INR"}"#
    );
}

#[tokio::test]
async fn worker_receives_payload_as_argument() {
    let (app, _script) =
        build_test_app(r#"printf '{"prediction": 1, "received": %s}' "$1""#);

    let response = post_json(app, "/predict", SAMPLE_BODY).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let sent: serde_json::Value = serde_json::from_str(SAMPLE_BODY).unwrap();
    assert_eq!(json["received"], sent);
}

#[tokio::test]
async fn stderr_warnings_do_not_fail_request() {
    let (app, _script) = build_test_app(
        "echo 'UserWarning: X does not have valid feature names' >&2\nprintf '{\"prediction\": 5}'\n",
    );

    let response = post_json(app, "/predict", SAMPLE_BODY).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"prediction": 5}));
}

// ---------------------------------------------------------------------------
// Test: worker failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn nonzero_exit_reports_stderr() {
    let (app, _script) = build_test_app("printf 'ModuleNotFoundError: sklearn' >&2\nexit 1\n");

    let response = post_json(app, "/predict", SAMPLE_BODY).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({"error": "Python error", "detail": "ModuleNotFoundError: sklearn"})
    );
}

#[tokio::test]
async fn nonzero_exit_wins_over_valid_stdout() {
    let (app, _script) =
        build_test_app("printf '{\"prediction\": 1}'\necho 'boom' >&2\nexit 2\n");

    let response = post_json(app, "/predict", SAMPLE_BODY).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Python error");
    assert_eq!(json["detail"], "boom\n");
}

#[tokio::test]
async fn invalid_stdout_is_decode_error() {
    let (app, _script) = build_test_app("printf 'prediction: 6500000'\n");

    let response = post_json(app, "/predict", SAMPLE_BODY).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({"error": "Error parsing prediction result", "detail": "prediction: 6500000"})
    );
}

#[tokio::test]
async fn empty_stdout_is_decode_error() {
    let (app, _script) = build_test_app("exit 0\n");

    let response = post_json(app, "/predict", SAMPLE_BODY).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Error parsing prediction result");
    assert_eq!(json["detail"], "");
}

#[tokio::test]
async fn missing_executable_is_spawn_error() {
    let script = common::write_worker_script("exit 0\n");
    let mut config = common::test_config(script.path().to_path_buf(), Duration::from_secs(5));
    config.worker.executable = "/nonexistent/bin/python3".into();
    let app = common::build_app_from_config(config);

    let response = post_json(app, "/predict", SAMPLE_BODY).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Failed to start prediction worker");
    assert!(json["detail"]
        .as_str()
        .unwrap()
        .starts_with("/nonexistent/bin/python3: "));
}

#[tokio::test]
async fn slow_worker_times_out() {
    let (app, _script) = build_test_app_with_timeout(
        "printf '{\"prediction\": 1'\nsleep 30\n",
        Duration::from_millis(300),
    );

    let started = Instant::now();
    let response = post_json(app, "/predict", SAMPLE_BODY).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "Prediction timed out");
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn timed_out_worker_is_killed() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("finished");
    let (app, _script) = build_test_app_with_timeout(
        &format!("sleep 1\ntouch '{}'\nprintf '{{}}'\n", marker.display()),
        Duration::from_millis(200),
    );

    let response = post_json(app, "/predict", SAMPLE_BODY).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "Prediction timed out");

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(!marker.exists(), "worker kept running after its deadline");
}

// ---------------------------------------------------------------------------
// Test: malformed request bodies are rejected before any spawn
// ---------------------------------------------------------------------------

/// Worker that leaves a marker file behind if it ever runs.
fn marker_app() -> (axum::Router, tempfile::NamedTempFile, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("spawned");
    let (app, script) = build_test_app(&format!(
        "touch '{}'\nprintf '{{\"prediction\": 1}}'\n",
        marker.display()
    ));
    (app, script, dir)
}

#[tokio::test]
async fn string_body_is_rejected() {
    let (app, _script, dir) = marker_app();

    let response = post_json(app, "/predict", r#""not an object""#).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Invalid request body");
    assert!(!dir.path().join("spawned").exists(), "worker must not be spawned");
}

#[tokio::test]
async fn invalid_json_is_rejected() {
    let (app, _script, dir) = marker_app();

    let response = post_json(app, "/predict", r#"{"area": 5000"#).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(!dir.path().join("spawned").exists());
}

#[tokio::test]
async fn unknown_feature_is_rejected() {
    let (app, _script, dir) = marker_app();

    let response = post_json(app, "/predict", r#"{"area": 5000, "swimmingpool": 1}"#).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["detail"], "unknown feature 'swimmingpool'");
    assert!(!dir.path().join("spawned").exists());
}

#[tokio::test]
async fn non_numeric_feature_is_rejected() {
    let (app, _script, dir) = marker_app();

    let response = post_json(app, "/predict", r#"{"area": "large"}"#).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(!dir.path().join("spawned").exists());
}

#[tokio::test]
async fn oversized_body_is_json_error() {
    let (app, _script, dir) = marker_app();
    let body = format!(r#"{{"area": 5000, "notes": "{}"}}"#, "x".repeat(3 * 1024 * 1024));

    let response = post_json(app, "/predict", &body).await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(response.headers()["content-type"], "application/json");
    let json = body_json(response).await;
    assert_eq!(json["error"], "Invalid request body");
    assert!(json["detail"].as_str().is_some_and(|d| !d.is_empty()));
    assert!(!dir.path().join("spawned").exists());
}

#[tokio::test]
async fn valid_body_does_spawn_marker_worker() {
    let (app, _script, dir) = marker_app();

    let response = post_json(app, "/predict", SAMPLE_BODY).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(dir.path().join("spawned").exists());
}

// ---------------------------------------------------------------------------
// Test: concurrent requests are isolated
// ---------------------------------------------------------------------------

#[tokio::test]
async fn concurrent_requests_are_isolated() {
    // Requests with area 1 hang past the deadline; all others answer at once.
    let (app, _script) = build_test_app_with_timeout(
        r#"case "$1" in
  *'"area":1,'*) sleep 30 ;;
esac
printf '{"prediction": 4200000}'
"#,
        Duration::from_secs(2),
    );

    let slow = post_json(app.clone(), "/predict", r#"{"area":1,"bedrooms":2}"#);
    let fast = async {
        let started = Instant::now();
        let response = post_json(app.clone(), "/predict", SAMPLE_BODY).await;
        (response, started.elapsed())
    };

    let (slow, (fast, fast_elapsed)) = tokio::join!(slow, fast);

    assert_eq!(fast.status(), StatusCode::OK);
    assert_eq!(body_json(fast).await, json!({"prediction": 4200000}));
    assert!(
        fast_elapsed < Duration::from_secs(2),
        "fast request must not wait for the slow one ({fast_elapsed:?})"
    );

    assert_eq!(slow.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(slow).await["error"], "Prediction timed out");
}

// ---------------------------------------------------------------------------
// Test: abandoning a request kills its worker
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dropped_request_kills_worker() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("finished");
    let (app, _script) = build_test_app(&format!(
        "sleep 1\ntouch '{}'\nprintf '{{}}'\n",
        marker.display()
    ));

    // Simulate a client that disconnects before the worker finishes.
    let abandoned =
        tokio::time::timeout(Duration::from_millis(200), post_json(app, "/predict", SAMPLE_BODY))
            .await;
    assert!(abandoned.is_err());

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(!marker.exists(), "worker should have been killed with the request");
}
