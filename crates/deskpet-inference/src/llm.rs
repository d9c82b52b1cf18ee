//! LLM inference (C7, §4.7): two prompt templates — the session summarizer
//! and the deep profile analyzer — each split into three independently
//! testable steps (build prompt / call provider / parse response), per
//! SPEC_FULL's "prompt builder as plain function" design note.
//!
//! Grounded in the original `LLMProfileAnalyzer.summarize_session` and
//! `LLMEnhancedAnalyzer.analyze_user_profile_comprehensive` — same prompt
//! shape, same defensive JSON extraction.

use std::collections::HashMap;

use deskpet_core::error::PetError;
use deskpet_providers::{ChatRequest, Message, ProviderRegistry, Role};
use serde::{Deserialize, Serialize};

/// How many leading characters of a malformed LLM response get preserved as
/// `raw_analysis` / diagnostic context (§4.7).
const RAW_ANALYSIS_CHARS: usize = 500;

/// Result of the session summarizer prompt (§4.7a). Tolerant of malformed
/// upstream output: when JSON extraction fails, every structured field is
/// left at its default and `raw_analysis` captures what came back instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSummaryAnalysis {
    #[serde(default)]
    pub interests_mentioned: Vec<String>,
    #[serde(default)]
    pub personality_hints: String,
    #[serde(default)]
    pub relationship_progress: String,
    #[serde(default)]
    pub topics_discussed: Vec<String>,
    #[serde(default)]
    pub emotional_tone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_analysis: Option<String>,
}

/// Result of the deep profile analyzer prompt (§4.7b). Every field is
/// optional/defaulted so a partial or malformed response still yields
/// something the caller can confidence-gate field-by-field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeepProfileAnalysis {
    #[serde(default)]
    pub demographics: serde_json::Value,
    #[serde(default)]
    pub interests_tags: serde_json::Value,
    #[serde(default)]
    pub personality: HashMap<String, f64>,
    #[serde(default)]
    pub current_mood: Option<String>,
    #[serde(default)]
    pub communication_style: serde_json::Value,
    #[serde(default)]
    pub motivations: HashMap<String, f64>,
    #[serde(default)]
    pub advisory: serde_json::Value,
}

/// A minimal role/content pair, decoupled from both `deskpet_sessions` and
/// `deskpet_providers::Message` so this crate doesn't need to depend on the
/// session crate just to build a prompt.
#[derive(Debug, Clone)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

fn format_conversation(messages: &[PromptMessage]) -> String {
    messages
        .iter()
        .map(|m| {
            let who = match m.role {
                Role::User => "User",
                _ => "Assistant",
            };
            format!("{who}: {}", m.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// §4.7a build step: pure function, no I/O. `previous_summary_context`
/// carries the prior summary's continuity string for incremental calls.
pub fn build_summarizer_prompt(messages: &[PromptMessage], previous_summary_context: Option<&str>) -> String {
    let conversation = format_conversation(messages);
    let context_section = match previous_summary_context {
        Some(prev) if !prev.is_empty() => format!(
            "[Previous conversation summary]\n{prev}\n\nNote: the above is a summary of earlier \
             conversation — use it only to understand continuity, not to re-analyze it.\n\n"
        ),
        _ => String::new(),
    };

    format!(
        "{context_section}Analyze the following conversation (newly added content only) and extract \
         the user's key signals:\n\n{conversation}\n\n\
         Output a JSON object with these fields:\n\
         1. interests_mentioned: user interests/hobbies mentioned (list, only what's new this round)\n\
         2. personality_hints: clues about the user's personality\n\
         3. relationship_progress: description of how the relationship is developing\n\
         4. topics_discussed: main topics discussed (list, only this round)\n\
         5. emotional_tone: the emotional tone of the conversation\n\n\
         Important: analyze only the newly added conversation, though you may use the previous \
         summary to understand context. Output JSON only, no other commentary."
    )
}

/// §4.7a parse step: extract the first `{...}` substring and parse it.
/// Falls back to an empty-structured result with `raw_analysis` on failure
/// rather than propagating — malformed LLM output must never poison the
/// worker (§7).
pub fn parse_summarizer_response(raw: &str) -> SessionSummaryAnalysis {
    match extract_json_object(raw) {
        Some(json_str) => match serde_json::from_str::<SessionSummaryAnalysis>(json_str) {
            Ok(parsed) => parsed,
            Err(_) => SessionSummaryAnalysis {
                raw_analysis: Some(truncate_chars(raw, RAW_ANALYSIS_CHARS)),
                ..Default::default()
            },
        },
        None => SessionSummaryAnalysis {
            raw_analysis: Some(truncate_chars(raw, RAW_ANALYSIS_CHARS)),
            ..Default::default()
        },
    }
}

/// §4.7b build step. `profile_context` is a short plain-text summary of the
/// current profile (relationship level, interaction count, top interests)
/// — callers typically derive it from [`deskpet_profile::ProfileStore`].
pub fn build_deep_analysis_prompt(messages: &[PromptMessage], profile_context: &str) -> String {
    let conversation = format_conversation(messages);
    format!(
        "As a professional user-profiling analyst, perform an in-depth analysis of the user based on \
         the conversation below.\n\n[Conversation]\n{conversation}\n\n[Current profile summary]\n\
         {profile_context}\n\n\
         Analyze along these dimensions and return the result as JSON:\n\n\
         1. demographics (each with a confidence 0-1): age_range (\"18-24\"/\"25-30\"/\"31-40\"/\"40+\"), \
         gender (\"male\"/\"female\"/\"unknown\"), occupation, education, location_hints\n\
         2. interests_tags: {{ \"category\": {{ \"weight\": 0-1, \"sub_tags\": [string], \"trend\": \
         \"rising\"/\"stable\"/\"falling\" }} }}\n\
         3. personality (0-1 each): openness, conscientiousness, extraversion, agreeableness, neuroticism\n\
         4. current_mood: one of happy/neutral/sad/anxious/excited/angry/tired\n\
         5. communication_style: {{ formality: \"formal\"/\"casual\", humor_appreciation: 0-1, \
         preferred_tone: \"friendly\"/\"professional\"/\"humorous\" }}\n\
         6. motivations (0-1 each): companionship, productivity, entertainment, learning, emotional_support\n\
         7. advisory: {{ interaction_suggestions: [string], content_recommendations: [string], \
         relationship_insights: string }}\n\n\
         Return strictly as a JSON object, with no extra commentary."
    )
}

/// §4.7b parse step: strip markdown code fences if present, then parse.
/// Returns an empty (default) object on failure rather than propagating.
pub fn parse_deep_analysis_response(raw: &str) -> DeepProfileAnalysis {
    let mut trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix("```json") {
        trimmed = rest;
    } else if let Some(rest) = trimmed.strip_prefix("```") {
        trimmed = rest;
    }
    if let Some(rest) = trimmed.strip_suffix("```") {
        trimmed = rest;
    }
    let trimmed = trimmed.trim();

    match serde_json::from_str::<DeepProfileAnalysis>(trimmed) {
        Ok(parsed) => parsed,
        Err(_) => match extract_json_object(trimmed) {
            Some(json_str) => serde_json::from_str(json_str).unwrap_or_default(),
            None => DeepProfileAnalysis::default(),
        },
    }
}

/// Extract the first balanced-looking `{...}` substring (first `{` to last
/// `}`), matching the original's `find('{')` / `rfind('}')` approach.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end > start {
        Some(&text[start..=end])
    } else {
        None
    }
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// Wrap an analysis prompt with its own system message so the registry's
/// default persona prompt (§4.2) never leaks into an analysis call — these
/// calls want a neutral analyst, not the pet persona.
fn to_provider_messages(prompt: String) -> Vec<Message> {
    vec![
        Message {
            role: Role::System,
            content: "You are a precise, neutral data analyst. Respond with JSON only.".to_string(),
        },
        Message {
            role: Role::User,
            content: prompt,
        },
    ]
}

/// Run the session summarizer end-to-end: build prompt, call the provider
/// registry, parse the response. Never fails the caller with a provider
/// error propagated as-is for JSON issues — only an upstream/network
/// failure reaching the registry surfaces as `Err`.
pub async fn summarize_session(
    registry: &ProviderRegistry,
    messages: &[PromptMessage],
    previous_summary_context: Option<&str>,
) -> Result<SessionSummaryAnalysis, PetError> {
    let prompt = build_summarizer_prompt(messages, previous_summary_context);
    let req = ChatRequest::new("analysis", vec![]);
    let resp = registry.send(to_provider_messages(prompt), req).await?;
    Ok(parse_summarizer_response(&resp.content))
}

/// Run the deep profile analyzer end-to-end (§4.7b). Uses a lower
/// temperature than the conversational path for more stable extraction.
pub async fn analyze_profile_deep(
    registry: &ProviderRegistry,
    messages: &[PromptMessage],
    profile_context: &str,
) -> Result<DeepProfileAnalysis, PetError> {
    let prompt = build_deep_analysis_prompt(messages, profile_context);
    let mut req = ChatRequest::new("analysis", vec![]);
    req.temperature = 0.3;
    let resp = registry.send(to_provider_messages(prompt), req).await?;
    Ok(parse_deep_analysis_response(&resp.content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summarizer_prompt_includes_previous_context_when_present() {
        let prompt = build_summarizer_prompt(&[], Some("made progress"));
        assert!(prompt.contains("Previous conversation summary"));
        assert!(prompt.contains("made progress"));
    }

    #[test]
    fn summarizer_prompt_omits_context_section_when_absent() {
        let prompt = build_summarizer_prompt(&[], None);
        assert!(!prompt.contains("Previous conversation summary"));
    }

    #[test]
    fn parse_summarizer_extracts_json_from_noisy_response() {
        let raw = "Sure, here you go:\n{\"interests_mentioned\": [\"hiking\"], \"emotional_tone\": \"upbeat\"}\nhope that helps";
        let parsed = parse_summarizer_response(raw);
        assert_eq!(parsed.interests_mentioned, vec!["hiking".to_string()]);
        assert_eq!(parsed.emotional_tone, "upbeat");
        assert!(parsed.raw_analysis.is_none());
    }

    #[test]
    fn parse_summarizer_falls_back_on_malformed_json() {
        let raw = "not json at all, sorry";
        let parsed = parse_summarizer_response(raw);
        assert!(parsed.interests_mentioned.is_empty());
        assert!(parsed.raw_analysis.is_some());
    }

    #[test]
    fn parse_summarizer_truncates_raw_analysis_to_500_chars() {
        let raw = "x".repeat(1000);
        let parsed = parse_summarizer_response(&raw);
        assert_eq!(parsed.raw_analysis.unwrap().chars().count(), 500);
    }

    #[test]
    fn parse_deep_analysis_strips_markdown_fences() {
        let raw = "```json\n{\"current_mood\": \"happy\"}\n```";
        let parsed = parse_deep_analysis_response(raw);
        assert_eq!(parsed.current_mood.as_deref(), Some("happy"));
    }

    #[test]
    fn parse_deep_analysis_returns_empty_on_garbage() {
        let parsed = parse_deep_analysis_response("definitely not json");
        assert!(parsed.current_mood.is_none());
        assert!(parsed.personality.is_empty());
    }
}
