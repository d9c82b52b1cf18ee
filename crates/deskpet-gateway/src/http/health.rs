//! GET /health — liveness probe: KV backend reachability and configured
//! provider names (§6).

use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let kv_info = state.deps.kv.info();
    Json(json!({
        "status": "ok",
        "providers": state.deps.providers.provider_names(),
        "kv": {
            "backend": kv_info.backend,
            "reachable": kv_info.reachable,
        },
    }))
}
