//! Prediction handler.

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::Json;
use pricebridge_core::worker::decoder::PredictionResult;

use crate::error::AppResult;
use crate::state::AppState;

/// POST /predict
///
/// Forward the feature object to a fresh worker and return its JSON answer
/// verbatim. The raw body is taken as bytes so malformed input is reported
/// in the same `{ error, detail }` shape as every other failure; so is a
/// body that could not be read at all (too large, aborted upload).
pub async fn predict(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> AppResult<Json<PredictionResult>> {
    let body = body?;
    let prediction = state.bridge.handle(&body).await?;
    Ok(Json(prediction))
}
