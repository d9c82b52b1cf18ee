//! POST /api/behavior, POST /api/behaviors/batch, GET
//! /api/behavior/analysis/{user_id}, GET /api/behavior/stats/{user_id} (§6)
//! — recording and the derived reports from the Behavior Analyzer (C10).

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use deskpet_profile::behavior::generate_behavior_summary;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;

fn default_user_id() -> String {
    "default".to_string()
}
fn default_metadata() -> Value {
    json!({})
}

#[derive(Debug, Deserialize)]
pub struct BehaviorRequest {
    #[serde(default = "default_user_id")]
    pub user_id: String,
    pub behavior_type: String,
    #[serde(default = "default_metadata")]
    pub metadata: Value,
}

#[derive(Debug, Deserialize)]
pub struct BehaviorBatchRequest {
    pub behaviors: Vec<BehaviorRequest>,
}

/// POST /api/behavior
pub async fn record_behavior(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BehaviorRequest>,
) -> Result<Json<Value>, ApiError> {
    let user_id = state.deps.profiles.get_or_create_user_id(&req.user_id).await?;
    state.deps.profiles.record_behavior(&user_id, &req.behavior_type, req.metadata).await?;
    Ok(Json(json!({ "success": true })))
}

/// POST /api/behaviors/batch
pub async fn record_behaviors_batch(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BehaviorBatchRequest>,
) -> Result<Json<Value>, ApiError> {
    let total = req.behaviors.len();
    let mut recorded = 0usize;
    for item in req.behaviors {
        let user_id = state.deps.profiles.get_or_create_user_id(&item.user_id).await?;
        state.deps.profiles.record_behavior(&user_id, &item.behavior_type, item.metadata).await?;
        recorded += 1;
    }
    Ok(Json(json!({ "success": true, "recorded": recorded, "total": total })))
}

/// GET /api/behavior/analysis/{user_id}
pub async fn behavior_analysis(
    State(state): State<Arc<AppState>>,
    Path(raw_user_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let user_id = state.deps.profiles.get_or_create_user_id(&raw_user_id).await?;
    let behaviors = state.deps.profiles.get_behaviors(&user_id).await?;
    let summary = generate_behavior_summary(&behaviors);
    Ok(Json(json!({ "user_id": user_id, "analysis": summary })))
}

/// GET /api/behavior/stats/{user_id}: raw counts by type plus the top 5.
pub async fn behavior_stats(
    State(state): State<Arc<AppState>>,
    Path(raw_user_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let user_id = state.deps.profiles.get_or_create_user_id(&raw_user_id).await?;
    let behaviors = state.deps.profiles.get_behaviors(&user_id).await?;

    let mut counts: HashMap<String, usize> = HashMap::new();
    for b in &behaviors {
        *counts.entry(b.event_type.clone()).or_insert(0) += 1;
    }
    let mut top: Vec<(String, usize)> = counts.iter().map(|(k, v)| (k.clone(), *v)).collect();
    top.sort_by(|a, b| b.1.cmp(&a.1));
    top.truncate(5);

    Ok(Json(json!({
        "user_id": user_id,
        "total": behaviors.len(),
        "counts": counts,
        "top": top,
    })))
}
