use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::setup::AppState;

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    if state.database.health_check().await {
        (StatusCode::OK, Json(json!({ "status": "ok" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unavailable" })),
        )
    }
}
