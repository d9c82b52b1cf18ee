//! GET /api/session/{user_id}/current, POST /api/session/{session_id}/end,
//! GET /api/session/{session_id}/summary (§6) — thin wrappers over the
//! session store (C5).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;

const CURRENT_SESSION_MESSAGE_LIMIT: usize = 10;

/// GET /api/session/{user_id}/current
///
/// Read-only: a status query must not mint a session or reset the active
/// pointer's idle timer (§3 Lifecycle — a session is created on the first
/// turn after no active pointer, not on a query).
pub async fn current_session(
    State(state): State<Arc<AppState>>,
    Path(raw_user_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let user_id = state.deps.profiles.get_or_create_user_id(&raw_user_id).await?;
    let Some(session_id) = state.deps.sessions.get_active_session(&user_id).await? else {
        return Ok(Json(json!({ "session": null })));
    };
    let meta = state.deps.sessions.get_meta_for(&session_id).await?;
    let messages = state.deps.sessions.get_context(&session_id, Some(CURRENT_SESSION_MESSAGE_LIMIT)).await?;

    Ok(Json(json!({
        "session_id": meta.session_id,
        "user_id": meta.user_id,
        "status": meta.status.as_str(),
        "start_time": meta.start_time,
        "last_active": meta.last_active,
        "message_count": meta.message_count,
        "messages": messages,
    })))
}

/// POST /api/session/{session_id}/end
pub async fn end_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.deps.sessions.end(&session_id).await?;
    state.deps.sessions.mark_for_summary(&session_id).await?;
    Ok(Json(json!({ "success": true, "session_id": session_id })))
}

/// GET /api/session/{session_id}/summary
pub async fn session_summary(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    match state.deps.sessions.get_summary(&session_id).await? {
        Some(summary) => Ok(Json(json!({ "session_id": session_id, "status": "ready", "summary": summary }))),
        None => Ok(Json(json!({ "session_id": session_id, "status": "pending", "summary": null }))),
    }
}
