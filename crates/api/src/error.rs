use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pricebridge_core::error::BridgeError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`BridgeError`] and implements [`IntoResponse`] so every failure
/// reaches the caller as `{ "error": <category>, "detail": <text> }`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A failure from the prediction bridge.
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// The request body could not be read, e.g. it exceeded the body limit.
    #[error("{0}")]
    BadRequest(#[from] BytesRejection),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let err = match self {
            AppError::Bridge(err) => err,
            AppError::BadRequest(rejection) => {
                tracing::info!(error = %rejection, "Rejected unreadable request body");
                let body = json!({
                    "error": "Invalid request body",
                    "detail": rejection.body_text(),
                });
                return (rejection.status(), axum::Json(body)).into_response();
            }
        };

        let status = if err.is_client_error() {
            tracing::info!(error = %err, "Rejected prediction request");
            StatusCode::BAD_REQUEST
        } else {
            tracing::error!(
                category = err.category(),
                detail = %err.detail(),
                "Prediction failed",
            );
            StatusCode::INTERNAL_SERVER_ERROR
        };

        let body = json!({
            "error": err.category(),
            "detail": err.detail(),
        });

        (status, axum::Json(body)).into_response()
    }
}
