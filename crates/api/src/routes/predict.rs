use axum::routing::post;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Mount the prediction route.
///
/// ```text
/// POST /predict      run one worker for the posted features
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/predict", post(handlers::predict::predict))
}
