use serde::{Deserialize, Serialize};
use std::fmt;

/// Internal user identifier: 128-bit random value rendered as lowercase hex.
/// Stable across restarts once minted by the raw-id -> internal-id mapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new() -> Self {
        Self(hex::encode(rand_bytes()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Session identifier: 128-bit random value rendered as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(hex::encode(rand_bytes()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

fn rand_bytes() -> [u8; 16] {
    *uuid::Uuid::new_v4().as_bytes()
}

/// Chat message role. `System` messages are never produced by a user turn —
/// they're injected by the context assembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::System => write!(f, "system"),
        }
    }
}

/// A single chat turn, as stored in session context and long-term history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Qualitative relationship level, derived purely from `intimacy_score` —
/// never set directly. Bands: 0/10/30/60/100/200.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipLevel {
    Stranger,
    Acquaintance,
    Familiar,
    Friend,
    CloseFriend,
    Confidant,
}

impl RelationshipLevel {
    /// Band thresholds from §3: 0/10/30/60/100/200.
    pub fn from_intimacy(score: i64) -> Self {
        if score >= 200 {
            RelationshipLevel::Confidant
        } else if score >= 100 {
            RelationshipLevel::CloseFriend
        } else if score >= 60 {
            RelationshipLevel::Friend
        } else if score >= 30 {
            RelationshipLevel::Familiar
        } else if score >= 10 {
            RelationshipLevel::Acquaintance
        } else {
            RelationshipLevel::Stranger
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipLevel::Stranger => "stranger",
            RelationshipLevel::Acquaintance => "acquaintance",
            RelationshipLevel::Familiar => "familiar",
            RelationshipLevel::Friend => "friend",
            RelationshipLevel::CloseFriend => "close_friend",
            RelationshipLevel::Confidant => "confidant",
        }
    }
}

impl fmt::Display for RelationshipLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A value paired with an inference confidence, per §9's "tagged union"
/// design note. Used for `occupation_data` / `age_data` / `gender_data` and
/// anything else rule/LLM inference produces with a confidence score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceField<T> {
    pub value: T,
    pub confidence: f64,
}

impl<T> ConfidenceField<T> {
    pub fn new(value: T, confidence: f64) -> Self {
        Self { value, confidence }
    }
}

/// A single recorded interaction with the desktop pet (click, drag, chat
/// session, state change, ...). Ring-buffered to the last 200 per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl BehaviorEvent {
    pub fn new(event_type: impl Into<String>, metadata: serde_json::Value) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp: chrono::Utc::now(),
            metadata,
        }
    }
}

/// Rule/LLM-derived communication style (§4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunicationStyle {
    pub avg_message_length: i64,
    pub emoji_frequency: String,
    pub emoji_per_message: f64,
    pub question_tendency: f64,
    pub excitement_level: f64,
    pub formality: String,
    pub response_length_preference: String,
}

/// Rule-derived emotional pattern (§4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionalPattern {
    pub positive_ratio: f64,
    pub emotional_stability: f64,
    pub stress_level: String,
    pub anxiety_indicators: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relationship_bands_match_spec_thresholds() {
        assert_eq!(RelationshipLevel::from_intimacy(0), RelationshipLevel::Stranger);
        assert_eq!(RelationshipLevel::from_intimacy(9), RelationshipLevel::Stranger);
        assert_eq!(RelationshipLevel::from_intimacy(10), RelationshipLevel::Acquaintance);
        assert_eq!(RelationshipLevel::from_intimacy(29), RelationshipLevel::Acquaintance);
        assert_eq!(RelationshipLevel::from_intimacy(30), RelationshipLevel::Familiar);
        assert_eq!(RelationshipLevel::from_intimacy(59), RelationshipLevel::Familiar);
        assert_eq!(RelationshipLevel::from_intimacy(60), RelationshipLevel::Friend);
        assert_eq!(RelationshipLevel::from_intimacy(99), RelationshipLevel::Friend);
        assert_eq!(RelationshipLevel::from_intimacy(100), RelationshipLevel::CloseFriend);
        assert_eq!(RelationshipLevel::from_intimacy(199), RelationshipLevel::CloseFriend);
        assert_eq!(RelationshipLevel::from_intimacy(200), RelationshipLevel::Confidant);
        assert_eq!(RelationshipLevel::from_intimacy(5000), RelationshipLevel::Confidant);
    }
}
