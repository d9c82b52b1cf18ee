//! Context Assembler (C5, §4.5): builds the ordered message array handed to
//! the provider registry for one chat turn.
//!
//! Grounded in the teacher's `pipeline::process` system-prompt assembly
//! (load history -> build system prompt -> append current turn), simplified
//! to this service's single-persona, no-tool shape.

use std::sync::Arc;

use deskpet_core::error::Result;
use deskpet_kv::KvStore;
use deskpet_profile::ProfileStore;
use deskpet_providers::{Message, Role as ProviderRole};
use deskpet_sessions::SessionManager;

use crate::error::{profile_err, session_err};

/// §4.5: last 20 session messages feed the assembler before the current
/// user turn is appended.
const SESSION_CONTEXT_LIMIT: usize = 20;

/// §4.5 step 5: non-system messages are trimmed to the most recent 11 (10
/// history + the current user turn), system messages are always kept.
const MAX_NON_SYSTEM_MESSAGES: usize = 11;

/// Default persona name, used when `pet:config:name` is absent from the KV
/// store (§4.5 "Default pet configuration").
pub const DEFAULT_PET_NAME: &str = "Pixel";

/// Default persona system prompt, used when `pet:config:system_prompt` is
/// absent. Re-authored in English from the original's cheerful/playful
/// desktop-companion persona — nothing pins the reply language.
pub const DEFAULT_PET_SYSTEM_PROMPT: &str =
    "You are Pixel, a cheerful, playful, slightly mischievous desktop companion who lives \
     on the user's screen. Keep replies brief (1-3 sentences), use light emoji now and then, \
     and occasionally mention needing a nap or a recharge. You genuinely enjoy the user's \
     company and remember how your relationship with them has grown.";

fn pet_name_key() -> &'static str {
    "pet:config:name"
}
fn pet_system_prompt_key() -> &'static str {
    "pet:config:system_prompt"
}

/// §4.5 step 1: fetch persona name/prompt from the KV store, falling back
/// to the documented defaults.
pub async fn load_pet_config(kv: &Arc<dyn KvStore>) -> Result<(String, String)> {
    let name = kv
        .get_string(pet_name_key())
        .await?
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_PET_NAME.to_string());
    let system_prompt = kv
        .get_string(pet_system_prompt_key())
        .await?
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_PET_SYSTEM_PROMPT.to_string());
    Ok((name, system_prompt))
}

/// Assemble the full message array for one turn (§4.5 steps 1-5). The
/// caller must have already appended `user_message` to the session before
/// calling this (§4.9 step 4) — the fetched history's last entry is that
/// turn, and is dropped here before `user_message` is appended once to the
/// outgoing array.
pub async fn assemble_context(
    kv: &Arc<dyn KvStore>,
    profile: &ProfileStore,
    sessions: &SessionManager,
    user_id: &str,
    session_id: &str,
    user_message: &str,
) -> Result<Vec<Message>> {
    let (pet_name, pet_system_prompt) = load_pet_config(kv).await?;
    let profile_prompt = profile.build_context_prompt(user_id).await.map_err(profile_err)?;
    let mut history = sessions
        .get_context(session_id, Some(SESSION_CONTEXT_LIMIT))
        .await
        .map_err(session_err)?;
    // The caller already appended `user_message` to the session before
    // calling this (§4.9 step 4), so the tail of `history` is that same
    // turn. Drop it here so it isn't sent to the provider twice (§4.5
    // step 3: "excluding the just-appended user message").
    history.pop();

    let mut messages = Vec::with_capacity(history.len() + 3);
    messages.push(Message {
        role: ProviderRole::System,
        content: format!("{pet_system_prompt}\n\nyour name is: {pet_name}"),
    });
    if !profile_prompt.is_empty() {
        messages.push(Message {
            role: ProviderRole::System,
            content: profile_prompt,
        });
    }
    for m in &history {
        messages.push(Message {
            role: m.role.into(),
            content: m.content.clone(),
        });
    }
    messages.push(Message {
        role: ProviderRole::User,
        content: user_message.to_string(),
    });

    Ok(trim_non_system(messages))
}

/// §4.5 step 5: keep all system messages, trim everything else to the most
/// recent [`MAX_NON_SYSTEM_MESSAGES`] while preserving relative order.
fn trim_non_system(messages: Vec<Message>) -> Vec<Message> {
    let non_system_count = messages.iter().filter(|m| m.role != ProviderRole::System).count();
    if non_system_count <= MAX_NON_SYSTEM_MESSAGES {
        return messages;
    }
    let mut skip = non_system_count - MAX_NON_SYSTEM_MESSAGES;
    messages
        .into_iter()
        .filter(|m| {
            if m.role == ProviderRole::System {
                true
            } else if skip > 0 {
                skip -= 1;
                false
            } else {
                true
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_msg(content: &str) -> Message {
        Message { role: ProviderRole::User, content: content.to_string() }
    }
    fn sys_msg(content: &str) -> Message {
        Message { role: ProviderRole::System, content: content.to_string() }
    }

    #[test]
    fn trim_keeps_all_system_messages_and_last_11_non_system() {
        let mut messages = vec![sys_msg("persona"), sys_msg("profile")];
        for i in 0..20 {
            messages.push(user_msg(&format!("msg-{i}")));
        }
        let trimmed = trim_non_system(messages);
        let system_count = trimmed.iter().filter(|m| m.role == ProviderRole::System).count();
        let non_system_count = trimmed.iter().filter(|m| m.role != ProviderRole::System).count();
        assert_eq!(system_count, 2);
        assert_eq!(non_system_count, MAX_NON_SYSTEM_MESSAGES);
        assert_eq!(trimmed.last().unwrap().content, "msg-19");
    }

    #[test]
    fn trim_is_a_no_op_under_the_limit() {
        let messages = vec![sys_msg("persona"), user_msg("hi")];
        let trimmed = trim_non_system(messages.clone());
        assert_eq!(trimmed.len(), messages.len());
    }

    #[test]
    fn system_messages_always_precede_non_system_and_user_is_last() {
        let mut messages = vec![sys_msg("persona"), sys_msg("profile")];
        for i in 0..15 {
            messages.push(user_msg(&format!("msg-{i}")));
        }
        let trimmed = trim_non_system(messages);
        let first_non_system = trimmed.iter().position(|m| m.role != ProviderRole::System);
        let last_system = trimmed.iter().rposition(|m| m.role == ProviderRole::System);
        if let (Some(first_ns), Some(last_s)) = (first_non_system, last_system) {
            assert!(last_s < first_ns);
        }
        assert_eq!(trimmed.last().unwrap().role, ProviderRole::User);
    }

    #[tokio::test]
    async fn assembled_context_does_not_duplicate_the_just_appended_user_turn() {
        use deskpet_kv::MemoryKv;

        let kv: Arc<dyn KvStore> = Arc::new(MemoryKv::new());
        let sessions = SessionManager::new(kv.clone());
        let profile = ProfileStore::new(kv.clone());
        let user_id = profile.get_or_create_user_id("alice").await.unwrap();
        profile.init_user(&user_id).await.unwrap();
        let session_id = sessions.get_or_create(&user_id).await.unwrap();

        // Mirrors orchestrator step 4: append the user turn before assembling.
        sessions.append_message(&session_id, deskpet_core::types::Role::User, "hello there").await.unwrap();

        let context = assemble_context(&kv, &profile, &sessions, &user_id, &session_id, "hello there")
            .await
            .unwrap();

        let occurrences = context.iter().filter(|m| m.content == "hello there").count();
        assert_eq!(occurrences, 1);
        assert_eq!(context.last().unwrap().content, "hello there");
    }
}
