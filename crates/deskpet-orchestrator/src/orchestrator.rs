//! Chat Orchestrator (C9, §4.9): the full per-turn procedure tying the
//! context assembler, provider registry, session store, and profile store
//! together behind one call.
//!
//! Mirrors the teacher's `process_message_non_streaming` shape: build
//! context, call the provider once, persist both turns, then a string of
//! best-effort side writes that are logged, never propagated.

use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use deskpet_core::error::{PetError, Result};
use deskpet_core::types::Role;
use deskpet_kv::KvStore;
use deskpet_profile::ProfileStore;
use deskpet_providers::{ChatRequest, ProviderRegistry};
use deskpet_sessions::SessionManager;

use crate::assembler::assemble_context;
use crate::error::{profile_err, session_err};
use crate::types::ChatTurnResult;

/// Intimacy delta applied on every successful chat turn (§4.9 step 12).
const CHAT_INTIMACY_DELTA: i64 = 1;

/// Shared handles the orchestrator needs for every turn. Cloned cheaply
/// (every field is an `Arc`) and held by the gateway's `AppState` (§9
/// "Global state").
#[derive(Clone)]
pub struct OrchestratorDeps {
    pub kv: Arc<dyn KvStore>,
    pub sessions: Arc<SessionManager>,
    pub profiles: Arc<ProfileStore>,
    pub providers: Arc<ProviderRegistry>,
}

/// Run one full chat turn (§4.9). The only error that reaches the caller
/// before a reply is produced is validation (step 1) or a provider failure
/// (step 6) — everything from step 8 onward is best-effort.
pub async fn handle_chat_turn(deps: &OrchestratorDeps, raw_user_id: &str, message: &str) -> Result<ChatTurnResult> {
    // Step 1: reject empty/whitespace input.
    if message.trim().is_empty() {
        return Err(PetError::Validation("message must not be empty".to_string()));
    }

    // Step 2: resolve the internal user id, ensure a profile exists.
    let user_id = deps.profiles.get_or_create_user_id(raw_user_id).await.map_err(profile_err)?;
    deps.profiles.init_user(&user_id).await.map_err(profile_err)?;

    // Step 3: reuse or create the active session.
    let session_id = deps.sessions.get_or_create(&user_id).await.map_err(session_err)?;

    // Step 4: append the user's message to the session.
    deps.sessions
        .append_message(&session_id, Role::User, message)
        .await
        .map_err(session_err)?;

    // Step 5: assemble the enhanced history.
    let context = assemble_context(&deps.kv, &deps.profiles, &deps.sessions, &user_id, &session_id, message).await?;

    // Step 6: call the provider registry. A failure here is not best-effort
    // — without a reply there's nothing to deliver.
    let request = ChatRequest::new("chat", vec![]);
    let response = deps.providers.send(context, request).await?;
    let reply = response.content;

    // Step 7: append the assistant's reply to the session.
    if let Err(e) = deps.sessions.append_message(&session_id, Role::Assistant, &reply).await {
        warn!(user_id, session_id, error = %e, "failed to append assistant reply to session");
    }

    // Step 8: mirror both turns into the long-term profile chat history.
    if let Err(e) = deps.profiles.save_chat_message(&user_id, Role::User, message).await {
        warn!(user_id, error = %e, "failed to mirror user message to profile history");
    }
    if let Err(e) = deps.profiles.save_chat_message(&user_id, Role::Assistant, &reply).await {
        warn!(user_id, error = %e, "failed to mirror assistant reply to profile history");
    }

    // Step 9: record the `chat` behavior event.
    if let Err(e) = deps
        .profiles
        .record_behavior(&user_id, "chat", serde_json::json!({ "message_length": message.chars().count() }))
        .await
    {
        warn!(user_id, error = %e, "failed to record chat behavior event");
    }

    // Step 10: touch last_seen, bump the interaction counter.
    if let Err(e) = deps.profiles.update_last_seen(&user_id).await {
        warn!(user_id, error = %e, "failed to update last_seen");
    }
    if let Err(e) = deps.profiles.increment_interaction(&user_id).await {
        warn!(user_id, error = %e, "failed to increment interaction counter");
    }

    // Step 11: mark the session for summarization if this turn crossed the
    // cadence threshold.
    match deps.sessions.should_trigger_summary(&session_id).await {
        Ok(true) => {
            if let Err(e) = deps.sessions.mark_for_summary(&session_id).await {
                warn!(user_id, session_id, error = %e, "failed to enqueue session for summary");
            }
        }
        Ok(false) => {}
        Err(e) => warn!(user_id, session_id, error = %e, "failed to evaluate summary cadence"),
    }

    // Step 12: nudge intimacy and recompute relationship level.
    if let Err(e) = deps.profiles.update_intimacy(&user_id, CHAT_INTIMACY_DELTA).await {
        warn!(user_id, error = %e, "failed to update intimacy score");
    }

    // Step 13.
    Ok(ChatTurnResult { reply, timestamp: Utc::now() })
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use deskpet_core::types::RelationshipLevel;
    use deskpet_kv::MemoryKv;
    use deskpet_providers::{ChatResponse, LlmProvider};

    struct FixedReplyProvider(&'static str);

    #[async_trait]
    impl LlmProvider for FixedReplyProvider {
        fn name(&self) -> &str {
            "fixed"
        }
        fn priority(&self) -> i32 {
            0
        }
        async fn send(&self, _req: &ChatRequest) -> Result<ChatResponse> {
            Ok(ChatResponse { content: self.0.to_string(), usage: None })
        }
    }

    fn test_deps(reply: &'static str) -> OrchestratorDeps {
        let kv: Arc<dyn KvStore> = Arc::new(MemoryKv::new());
        OrchestratorDeps {
            sessions: Arc::new(SessionManager::new(kv.clone())),
            profiles: Arc::new(ProfileStore::new(kv.clone())),
            providers: Arc::new(ProviderRegistry::new(vec![Box::new(FixedReplyProvider(reply))])),
            kv,
        }
    }

    #[tokio::test]
    async fn empty_message_is_rejected_before_any_writes() {
        let deps = test_deps("hi");
        let err = handle_chat_turn(&deps, "alice", "   ").await.unwrap_err();
        assert!(matches!(err, PetError::Validation(_)));
    }

    #[tokio::test]
    async fn first_contact_creates_profile_and_bumps_intimacy_to_one() {
        let deps = test_deps("hello there!");
        let result = handle_chat_turn(&deps, "alice", "hello").await.unwrap();
        assert_eq!(result.reply, "hello there!");

        let user_id = deps.profiles.get_or_create_user_id("alice").await.unwrap();
        let profile = deps.profiles.get_profile(&user_id).await.unwrap().unwrap();
        assert_eq!(profile.intimacy_score, 1);
        assert_eq!(profile.relationship_level, RelationshipLevel::Stranger);
        assert_eq!(profile.total_interactions, 1);
    }

    #[tokio::test]
    async fn chat_history_mirrors_both_turns_into_profile() {
        let deps = test_deps("pong");
        handle_chat_turn(&deps, "bob", "ping").await.unwrap();
        let user_id = deps.profiles.get_or_create_user_id("bob").await.unwrap();
        let history = deps.profiles.get_chat_history(&user_id, 10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "ping");
        assert_eq!(history[1].content, "pong");
    }
}
