//! Background worker (C8, §4.8): a single cooperative actor running a 30s
//! tick with two sequential phases — drain the session-summary queue, then
//! refresh a batch of stale profiles.
//!
//! Grounded in the original `background_tasks.py` loop (`_process_session_summaries`
//! then a profile-refresh sweep) and in this codebase's own scheduler-engine
//! shape for lifecycle (a `run` loop the handle spawns and cooperatively
//! stops), stripped of SQLite/cron since there is no job table here.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, warn};

use deskpet_core::error::PetError;
use deskpet_core::types::ChatMessage;
use deskpet_inference::{
    analyze_profile_deep, infer_from_messages, keywords, summarize_session, DeepProfileAnalysis,
    PromptMessage, RuleInferenceResult,
};
use deskpet_profile::{ProfileError, ProfileStore};
use deskpet_providers::ProviderRegistry;
use deskpet_sessions::{SessionError, SessionManager, SessionSummary};

/// Worker tick period (§4.8).
pub const TICK_INTERVAL_SECS: u64 = 30;

/// Sessions with fewer than this many new messages are skipped and
/// dequeued without calling the summarizer (§4.8 step 1).
const MIN_NEW_MESSAGES_FOR_SUMMARY: usize = 3;

/// At most this many profiles are refreshed per tick (§4.8 step 2).
const PROFILE_REFRESH_BATCH: usize = 10;

/// A profile refreshed more recently than this is skipped (§4.8 step 2).
const STALE_REFRESH_SECS: i64 = 180;

/// Deep (LLM) profile analysis only runs with at least this many recent
/// messages available (§4.8 step 2).
const DEEP_ANALYSIS_MIN_MESSAGES: usize = 8;

/// How many recent chat-history messages feed both inference passes.
const RECENT_MESSAGES_FOR_INFERENCE: usize = 20;

/// Intimacy nudge applied when a session summary's `relationship_progress`
/// contains a progress/trust marker (§9, resolved open question).
const INTIMACY_PROGRESS_BONUS: i64 = 2;

fn profile_err(e: ProfileError) -> PetError {
    match e {
        ProfileError::NotFound(id) => PetError::NotFound(id),
        ProfileError::Kv(inner) => inner,
    }
}

fn session_err(e: SessionError) -> PetError {
    match e {
        SessionError::NotFound(id) => PetError::NotFound(id),
        SessionError::Kv(inner) => inner,
    }
}

fn to_prompt_messages(messages: &[ChatMessage]) -> Vec<PromptMessage> {
    messages
        .iter()
        .map(|m| PromptMessage { role: m.role.into(), content: m.content.clone() })
        .collect()
}

/// Whether `text` carries one of the progress/trust markers that bump
/// intimacy on a summary merge.
fn contains_progress_marker(text: &str) -> bool {
    let lower = text.to_lowercase();
    keywords::PROGRESS_MARKERS.iter().any(|marker| lower.contains(&marker.to_lowercase()))
}

fn continuity_context(summary: &SessionSummary) -> String {
    format!(
        "topics: {}; interests: {}; tone: {}; relationship: {}",
        summary.topics_discussed.join(", "),
        summary.interests_mentioned.join(", "),
        summary.emotional_tone,
        summary.relationship_progress,
    )
}

/// The stateless logic for one tick. Holds only shared handles — no
/// mutable state of its own, so cloning/re-running a tick is always safe.
pub struct BackgroundWorker {
    sessions: Arc<SessionManager>,
    profiles: Arc<ProfileStore>,
    providers: Arc<ProviderRegistry>,
}

impl BackgroundWorker {
    pub fn new(sessions: Arc<SessionManager>, profiles: Arc<ProfileStore>, providers: Arc<ProviderRegistry>) -> Self {
        Self { sessions, profiles, providers }
    }

    /// Run both phases once. Never panics or propagates — every failure is
    /// logged and the tick moves on (§4.8, §7: "background worker never
    /// propagates errors").
    pub async fn tick(&self) {
        self.drain_summary_queue().await;
        self.refresh_profiles().await;
    }

    async fn drain_summary_queue(&self) {
        let session_ids = match self.sessions.get_sessions_to_summarize().await {
            Ok(ids) => ids,
            Err(e) => {
                error!(error = %e, "failed to read session summary queue");
                return;
            }
        };
        for session_id in session_ids {
            if let Err(e) = self.summarize_one(&session_id).await {
                error!(session_id, error = %e, "session summary failed, left in queue for retry");
            }
        }
    }

    async fn summarize_one(&self, session_id: &str) -> Result<(), PetError> {
        let new_context = self.sessions.get_new_context(session_id).await.map_err(session_err)?;
        if new_context.len() < MIN_NEW_MESSAGES_FOR_SUMMARY {
            self.sessions.remove_from_summary_queue(session_id).await.map_err(session_err)?;
            return Ok(());
        }

        let meta = self.sessions.get_meta_for(session_id).await.map_err(session_err)?;
        let previous = self.sessions.get_summary(session_id).await.map_err(session_err)?;
        let previous_context = previous.as_ref().map(continuity_context);

        let prompt_messages = to_prompt_messages(&new_context);
        let analysis = summarize_session(&self.providers, &prompt_messages, previous_context.as_deref()).await?;

        let summary = SessionSummary {
            interests_mentioned: analysis.interests_mentioned.clone(),
            personality_hints: analysis.personality_hints.clone(),
            relationship_progress: analysis.relationship_progress.clone(),
            topics_discussed: analysis.topics_discussed.clone(),
            emotional_tone: analysis.emotional_tone.clone(),
            summarized_at: Utc::now(),
            last_summarized_index: meta.message_count,
        };
        self.sessions.save_summary(session_id, &summary).await.map_err(session_err)?;

        if !analysis.interests_mentioned.is_empty() {
            self.profiles
                .add_interest_tags(&meta.user_id, &analysis.interests_mentioned)
                .await
                .map_err(profile_err)?;
        }
        if contains_progress_marker(&analysis.relationship_progress) {
            self.profiles
                .update_intimacy(&meta.user_id, INTIMACY_PROGRESS_BONUS)
                .await
                .map_err(profile_err)?;
        }

        self.sessions.remove_from_summary_queue(session_id).await.map_err(session_err)?;
        Ok(())
    }

    async fn refresh_profiles(&self) {
        let user_ids = match self.profiles.list_user_ids(PROFILE_REFRESH_BATCH).await {
            Ok(ids) => ids,
            Err(e) => {
                error!(error = %e, "failed to enumerate profiles for refresh");
                return;
            }
        };
        for user_id in user_ids {
            if let Err(e) = self.refresh_one(&user_id).await {
                error!(user_id, error = %e, "profile refresh failed");
            }
        }
    }

    async fn refresh_one(&self, user_id: &str) -> Result<(), PetError> {
        if self.profiles.profile_updated_within(user_id, STALE_REFRESH_SECS).await.map_err(profile_err)? {
            return Ok(());
        }

        let recent = self
            .profiles
            .get_chat_history(user_id, RECENT_MESSAGES_FOR_INFERENCE)
            .await
            .map_err(profile_err)?;
        if recent.is_empty() {
            self.profiles.mark_profile_updated(user_id).await.map_err(profile_err)?;
            return Ok(());
        }

        let rule_result = infer_from_messages(&recent);
        self.apply_rule_result(user_id, &rule_result).await?;

        if recent.len() >= DEEP_ANALYSIS_MIN_MESSAGES {
            let profile_context = self.profiles.build_context_prompt(user_id).await.map_err(profile_err)?;
            let prompt_messages = to_prompt_messages(&recent);
            match analyze_profile_deep(&self.providers, &prompt_messages, &profile_context).await {
                Ok(deep) => self.apply_deep_analysis(user_id, &deep).await?,
                Err(e) => warn!(user_id, error = %e, "deep profile analysis call failed, keeping rule inference only"),
            }
        }

        self.profiles.mark_profile_updated(user_id).await.map_err(profile_err)?;
        Ok(())
    }

    async fn apply_rule_result(&self, user_id: &str, result: &RuleInferenceResult) -> Result<(), PetError> {
        if let Some(occ) = &result.occupation {
            self.profiles.apply_occupation(user_id, &occ.value, occ.confidence).await.map_err(profile_err)?;
        }
        if let Some(age) = &result.age_range {
            self.profiles.apply_age(user_id, &age.value, age.confidence).await.map_err(profile_err)?;
        }
        if let Some(gender) = &result.gender {
            self.profiles.apply_gender(user_id, &gender.value, gender.confidence).await.map_err(profile_err)?;
        }
        if !result.interests.is_empty() {
            let tags: Vec<String> = result.interests.iter().map(|(label, _)| label.clone()).collect();
            self.profiles.add_interest_tags(user_id, &tags).await.map_err(profile_err)?;
        }
        if let Some(edu) = &result.education {
            let mut values = HashMap::new();
            values.insert(
                "education".to_string(),
                serde_json::json!({ "value": edu.value, "confidence": edu.confidence }),
            );
            self.profiles.update_preferences(user_id, &values).await.map_err(profile_err)?;
        }
        if let Some(style) = &result.communication_style {
            self.profiles.set_communication_style(user_id, style).await.map_err(profile_err)?;
        }
        if let Some(pattern) = &result.emotional_pattern {
            self.profiles.set_emotional_pattern(user_id, pattern).await.map_err(profile_err)?;
        }
        Ok(())
    }

    async fn apply_deep_analysis(&self, user_id: &str, deep: &DeepProfileAnalysis) -> Result<(), PetError> {
        let interests: Vec<String> = match &deep.interests_tags {
            serde_json::Value::Object(map) => map.keys().cloned().collect(),
            _ => Vec::new(),
        };
        let personality: HashMap<String, String> =
            deep.personality.iter().map(|(k, v)| (k.clone(), v.to_string())).collect();
        let motivations = if deep.motivations.is_empty() { None } else { Some(&deep.motivations) };

        self.profiles
            .update_from_llm_analysis(user_id, &interests, &personality, deep.current_mood.as_deref(), motivations)
            .await
            .map_err(profile_err)?;

        let mut prefs = HashMap::new();
        if !deep.demographics.is_null() {
            prefs.insert("demographics".to_string(), deep.demographics.clone());
        }
        if !deep.communication_style.is_null() {
            prefs.insert("communication_style_llm".to_string(), deep.communication_style.clone());
        }
        if !deep.advisory.is_null() {
            prefs.insert("advisory".to_string(), deep.advisory.clone());
        }
        if !prefs.is_empty() {
            self.profiles.update_preferences(user_id, &prefs).await.map_err(profile_err)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_marker_matches_english_and_chinese() {
        assert!(contains_progress_marker("we made great progress today"));
        assert!(contains_progress_marker("用户对我的信任增加了"));
        assert!(!contains_progress_marker("just talked about the weather"));
    }

    #[test]
    fn progress_marker_is_case_insensitive() {
        assert!(contains_progress_marker("Built a lot of TRUST this session"));
    }
}
