use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use deskpet_core::types::ChatMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Ended,
    Summarized,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Ended => "ended",
            SessionStatus::Summarized => "summarized",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "ended" => SessionStatus::Ended,
            "summarized" => SessionStatus::Summarized,
            _ => SessionStatus::Active,
        }
    }
}

/// Session metadata hash (`session:{id}`), separate from the context list
/// and summary hash (§4.3).
#[derive(Debug, Clone)]
pub struct SessionMeta {
    pub session_id: String,
    pub user_id: String,
    pub start_time: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    pub message_count: i64,
    pub status: SessionStatus,
    pub end_time: Option<DateTime<Utc>>,
}

/// A single message in the short-term context list.
pub type SessionMessage = ChatMessage;

/// The summary persisted for a session once `save_summary` runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub interests_mentioned: Vec<String>,
    pub personality_hints: String,
    pub relationship_progress: String,
    pub topics_discussed: Vec<String>,
    pub emotional_tone: String,
    pub summarized_at: DateTime<Utc>,
    pub last_summarized_index: i64,
}

pub const SESSION_TTL_SECS: i64 = 24 * 3600;
pub const SUMMARY_TTL_SECS: i64 = 30 * 24 * 3600;
pub const IDLE_TIMEOUT_SECS: i64 = 30 * 60;
pub const DEFAULT_CONTEXT_LIMIT: i64 = 20;
