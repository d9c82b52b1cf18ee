use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use deskpet_core::types::{CommunicationStyle, ConfidenceField, EmotionalPattern, RelationshipLevel};

/// Long-term per-user record (§3). Created once on first interaction and
/// never deleted by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub total_interactions: i64,
    pub intimacy_score: i64,
    pub relationship_level: RelationshipLevel,
    pub interests: HashSet<String>,
    pub personality_traits: HashMap<String, String>,
    pub preferences: HashMap<String, serde_json::Value>,
    pub occupation_data: Option<ConfidenceField<String>>,
    pub age_data: Option<ConfidenceField<String>>,
    pub gender_data: Option<ConfidenceField<String>>,
    pub communication_style: Option<CommunicationStyle>,
    pub emotional_pattern: Option<EmotionalPattern>,
    pub current_mood: Option<String>,
    pub motivations: Option<HashMap<String, f64>>,
}

impl UserProfile {
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            created_at: now,
            last_seen: now,
            total_interactions: 0,
            intimacy_score: 0,
            relationship_level: RelationshipLevel::from_intimacy(0),
            interests: HashSet::new(),
            personality_traits: HashMap::new(),
            preferences: HashMap::new(),
            occupation_data: None,
            age_data: None,
            gender_data: None,
            communication_style: None,
            emotional_pattern: None,
            current_mood: None,
            motivations: None,
        }
    }
}

/// Compact derived view for external reporting (§4.4 `get_profile_summary`),
/// grounded in the original `get_profile_summary`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub user_id: String,
    pub relationship_level: RelationshipLevel,
    pub intimacy_score: i64,
    pub trust_level: f64,
    pub interaction_comfort: f64,
    pub interest_count: usize,
    pub total_interactions: i64,
}

/// Confidence floors below which an inferred demographic field is not
/// written to the profile (§3 invariant, §4.4 `_update_from_rules`).
pub const OCCUPATION_CONFIDENCE_FLOOR: f64 = 0.5;
pub const OCCUPATION_OVERWRITE_FLOOR: f64 = 0.6;
pub const AGE_CONFIDENCE_FLOOR: f64 = 0.4;
pub const GENDER_CONFIDENCE_FLOOR: f64 = 0.5;

pub const CHAT_HISTORY_CAP: usize = 500;
pub const BEHAVIOR_CAP: usize = 200;
pub const LAST_PROFILE_UPDATE_TTL_SECS: u64 = 600;
