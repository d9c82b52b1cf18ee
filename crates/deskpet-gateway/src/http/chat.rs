//! POST /api/chat/message and POST /api/chat/stream (§6) — the two HTTP
//! entry points onto the Chat Orchestrator (C9).
//!
//! `chat_message` is a thin wrapper around
//! [`deskpet_orchestrator::handle_chat_turn`]. `chat_stream` re-implements
//! the same per-turn procedure (§4.9) against the provider registry's
//! streaming variant (§4.2), since the orchestrator's non-streaming
//! `handle_chat_turn` always waits for a complete reply.

use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use deskpet_core::types::Role;
use deskpet_orchestrator::{assemble_context, handle_chat_turn, OrchestratorDeps};
use deskpet_providers::ChatRequest;
use deskpet_providers::StreamEvent;

use crate::app::AppState;
use crate::error::ApiError;

fn default_user_id() -> String {
    "default".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ChatMessageRequest {
    pub message: String,
    #[serde(default = "default_user_id")]
    pub user_id: String,
    /// Accepted for client-compatibility (§6 request shape); the core
    /// always derives context from the session store (C5), not from a
    /// client-supplied history, so this is parsed and otherwise ignored.
    #[serde(default)]
    #[allow(dead_code)]
    pub conversation_history: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct ChatMessageResponse {
    pub success: bool,
    pub reply: String,
    pub timestamp: chrono::DateTime<Utc>,
}

/// POST /api/chat/message
pub async fn chat_message(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatMessageRequest>,
) -> Result<Json<ChatMessageResponse>, ApiError> {
    let result = handle_chat_turn(&state.deps, &req.user_id, &req.message).await?;
    Ok(Json(ChatMessageResponse { success: true, reply: result.reply, timestamp: result.timestamp }))
}

/// POST /api/chat/stream
pub async fn chat_stream(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatMessageRequest>,
) -> impl IntoResponse {
    let (tx, mut rx) = mpsc::channel::<StreamEvent>(32);
    let cancel = CancellationToken::new();
    let cancel_for_task = cancel.clone();
    let deps = state.deps.clone();

    tokio::spawn(async move {
        run_stream_turn(deps, req.user_id, req.message, tx, cancel_for_task).await;
    });

    // Dropped when the client disconnects and axum stops polling the SSE
    // stream (§5: "the streaming endpoint's connection close cancels
    // further chunk production").
    struct CancelOnDrop(CancellationToken);
    impl Drop for CancelOnDrop {
        fn drop(&mut self) {
            self.0.cancel();
        }
    }
    let guard = CancelOnDrop(cancel);

    let stream = async_stream::stream! {
        let _owned_guard = guard;
        while let Some(event) = rx.recv().await {
            match event {
                StreamEvent::TextDelta { text } => {
                    yield Ok::<_, std::convert::Infallible>(Event::default().data(json!({ "chunk": text }).to_string()));
                }
                StreamEvent::Done => {
                    yield Ok(Event::default().data("[DONE]"));
                    break;
                }
                StreamEvent::Error { message } => {
                    yield Ok(Event::default().data(json!({ "error": message }).to_string()));
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// The streaming equivalent of §4.9's chat-turn procedure: steps 1-6 are
/// required for a reply to exist at all; steps 7 onward are best-effort,
/// exactly as in the non-streaming path.
async fn run_stream_turn(
    deps: OrchestratorDeps,
    raw_user_id: String,
    message: String,
    tx: mpsc::Sender<StreamEvent>,
    cancel: CancellationToken,
) {
    if message.trim().is_empty() {
        let _ = tx.send(StreamEvent::Error { message: "message must not be empty".to_string() }).await;
        return;
    }

    let user_id = match deps.profiles.get_or_create_user_id(&raw_user_id).await {
        Ok(id) => id,
        Err(e) => {
            let _ = tx.send(StreamEvent::Error { message: e.to_string() }).await;
            return;
        }
    };
    if let Err(e) = deps.profiles.init_user(&user_id).await {
        let _ = tx.send(StreamEvent::Error { message: e.to_string() }).await;
        return;
    }

    let session_id = match deps.sessions.get_or_create(&user_id).await {
        Ok(id) => id,
        Err(e) => {
            let _ = tx.send(StreamEvent::Error { message: e.to_string() }).await;
            return;
        }
    };

    if let Err(e) = deps.sessions.append_message(&session_id, Role::User, &message).await {
        let _ = tx.send(StreamEvent::Error { message: e.to_string() }).await;
        return;
    }

    let context = match assemble_context(&deps.kv, &deps.profiles, &deps.sessions, &user_id, &session_id, &message).await {
        Ok(c) => c,
        Err(e) => {
            let _ = tx.send(StreamEvent::Error { message: e.to_string() }).await;
            return;
        }
    };

    let (inner_tx, mut inner_rx) = mpsc::channel::<StreamEvent>(32);
    let providers = deps.providers.clone();
    let request = ChatRequest::new("chat", vec![]);
    let provider_task = tokio::spawn(async move {
        let _ = providers.send_stream(context, request, inner_tx).await;
    });

    let mut full_reply = String::new();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                provider_task.abort();
                return;
            }
            maybe_event = inner_rx.recv() => {
                match maybe_event {
                    Some(StreamEvent::TextDelta { text }) => {
                        full_reply.push_str(&text);
                        if tx.send(StreamEvent::TextDelta { text }).await.is_err() {
                            provider_task.abort();
                            return;
                        }
                    }
                    Some(StreamEvent::Done) => {
                        let _ = tx.send(StreamEvent::Done).await;
                        break;
                    }
                    Some(StreamEvent::Error { message }) => {
                        let _ = tx.send(StreamEvent::Error { message }).await;
                        return;
                    }
                    None => break,
                }
            }
        }
    }

    finish_stream_turn(&deps, &user_id, &session_id, &message, &full_reply).await;
}

/// §4.9 steps 7-12, best-effort: every failure is logged, never propagated,
/// since the reply has already been streamed to the caller by this point.
async fn finish_stream_turn(deps: &OrchestratorDeps, user_id: &str, session_id: &str, message: &str, reply: &str) {
    const CHAT_INTIMACY_DELTA: i64 = 1;

    if let Err(e) = deps.sessions.append_message(session_id, Role::Assistant, reply).await {
        warn!(user_id, session_id, error = %e, "failed to append streamed reply to session");
    }
    if let Err(e) = deps.profiles.save_chat_message(user_id, Role::User, message).await {
        warn!(user_id, error = %e, "failed to mirror user message to profile history");
    }
    if let Err(e) = deps.profiles.save_chat_message(user_id, Role::Assistant, reply).await {
        warn!(user_id, error = %e, "failed to mirror streamed reply to profile history");
    }
    if let Err(e) = deps
        .profiles
        .record_behavior(user_id, "chat", serde_json::json!({ "message_length": message.chars().count() }))
        .await
    {
        warn!(user_id, error = %e, "failed to record chat behavior event");
    }
    if let Err(e) = deps.profiles.update_last_seen(user_id).await {
        warn!(user_id, error = %e, "failed to update last_seen");
    }
    if let Err(e) = deps.profiles.increment_interaction(user_id).await {
        warn!(user_id, error = %e, "failed to increment interaction counter");
    }
    match deps.sessions.should_trigger_summary(session_id).await {
        Ok(true) => {
            if let Err(e) = deps.sessions.mark_for_summary(session_id).await {
                warn!(user_id, session_id, error = %e, "failed to enqueue session for summary");
            }
        }
        Ok(false) => {}
        Err(e) => warn!(user_id, session_id, error = %e, "failed to evaluate summary cadence"),
    }
    if let Err(e) = deps.profiles.update_intimacy(user_id, CHAT_INTIMACY_DELTA).await {
        warn!(user_id, error = %e, "failed to update intimacy score");
    }
}
