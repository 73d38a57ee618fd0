//! Liveness endpoint.

use axum::extract::State;
use axum::Json;

use crate::state::AppState;

/// GET /health - Liveness plus the number of turns in flight.
pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "active_turns": state.running_turns(),
    }))
}
