use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use deskpet_core::types::{
    BehaviorEvent, ChatMessage, CommunicationStyle, ConfidenceField, EmotionalPattern, RelationshipLevel, Role,
};
use deskpet_kv::KvStore;

use crate::error::{ProfileError, Result};
use crate::types::{
    ProfileSummary, UserProfile, AGE_CONFIDENCE_FLOOR, BEHAVIOR_CAP, CHAT_HISTORY_CAP,
    GENDER_CONFIDENCE_FLOOR, LAST_PROFILE_UPDATE_TTL_SECS, OCCUPATION_CONFIDENCE_FLOOR,
    OCCUPATION_OVERWRITE_FLOOR,
};

fn mapping_key(raw_id: &str) -> String {
    format!("user:{raw_id}:mapping")
}
fn profile_key(user_id: &str) -> String {
    format!("user:{user_id}:profile")
}
fn chat_history_key(user_id: &str) -> String {
    format!("user:{user_id}:chat_history")
}
fn behaviors_key(user_id: &str) -> String {
    format!("user:{user_id}:behaviors")
}
fn last_profile_update_key(user_id: &str) -> String {
    format!("user:{user_id}:last_profile_update")
}

/// Long-term user profile store (§4.4), layered over the KV abstraction.
/// Everything here is a plain value-object read/write — inference (C6/C7)
/// lives in a separate crate and writes through this store rather than
/// this store reaching out to it, avoiding a cyclic dependency (§9).
pub struct ProfileStore {
    kv: Arc<dyn KvStore>,
}

impl ProfileStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// §4.4 `get_or_create_user_id`: hash-maps a raw id to a stable internal
    /// id, persisted idempotently.
    pub async fn get_or_create_user_id(&self, raw_id: &str) -> Result<String> {
        let key = mapping_key(raw_id);
        if let Some(existing) = self.kv.get_string(&key).await? {
            return Ok(existing);
        }
        let internal_id = deskpet_core::types::UserId::new().to_string();
        self.kv.set_string(&key, &internal_id, None).await?;
        Ok(internal_id)
    }

    /// §4.4 `init_user`: write the initial profile record atomically if
    /// absent.
    pub async fn init_user(&self, user_id: &str) -> Result<()> {
        let key = profile_key(user_id);
        if self.kv.exists(&key).await? {
            return Ok(());
        }
        let profile = UserProfile::new(user_id);
        self.write_profile(&profile).await
    }

    async fn write_profile(&self, profile: &UserProfile) -> Result<()> {
        let mut fields = HashMap::new();
        fields.insert("user_id".to_string(), profile.user_id.clone());
        fields.insert("created_at".to_string(), profile.created_at.to_rfc3339());
        fields.insert("last_seen".to_string(), profile.last_seen.to_rfc3339());
        fields.insert("total_interactions".to_string(), profile.total_interactions.to_string());
        fields.insert("intimacy_score".to_string(), profile.intimacy_score.to_string());
        fields.insert("relationship_level".to_string(), profile.relationship_level.as_str().to_string());
        fields.insert(
            "interests".to_string(),
            serde_json::to_string(&profile.interests).map_err(|e| ProfileError::Kv(e.into()))?,
        );
        fields.insert(
            "personality_traits".to_string(),
            serde_json::to_string(&profile.personality_traits).map_err(|e| ProfileError::Kv(e.into()))?,
        );
        fields.insert(
            "preferences".to_string(),
            serde_json::to_string(&profile.preferences).map_err(|e| ProfileError::Kv(e.into()))?,
        );
        if let Some(occ) = &profile.occupation_data {
            fields.insert("occupation_data".to_string(), serde_json::to_string(occ).unwrap_or_default());
        }
        if let Some(age) = &profile.age_data {
            fields.insert("age_data".to_string(), serde_json::to_string(age).unwrap_or_default());
        }
        if let Some(gender) = &profile.gender_data {
            fields.insert("gender_data".to_string(), serde_json::to_string(gender).unwrap_or_default());
        }
        if let Some(style) = &profile.communication_style {
            fields.insert("communication_style".to_string(), serde_json::to_string(style).unwrap_or_default());
        }
        if let Some(pattern) = &profile.emotional_pattern {
            fields.insert("emotional_pattern".to_string(), serde_json::to_string(pattern).unwrap_or_default());
        }
        if let Some(mood) = &profile.current_mood {
            fields.insert("current_mood".to_string(), mood.clone());
        }
        if let Some(motivations) = &profile.motivations {
            fields.insert("motivations".to_string(), serde_json::to_string(motivations).unwrap_or_default());
        }

        self.kv.hash_set(&profile_key(&profile.user_id), &fields).await?;
        Ok(())
    }

    /// §4.4 `get_profile` with JSON decoding of nested fields.
    pub async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let fields = self.kv.hash_get_all(&profile_key(user_id)).await?;
        if fields.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self::decode_profile(user_id, &fields)))
    }

    fn decode_profile(user_id: &str, fields: &HashMap<String, String>) -> UserProfile {
        let get = |k: &str| fields.get(k).cloned();
        let intimacy_score = get("intimacy_score").and_then(|s| s.parse().ok()).unwrap_or(0);
        UserProfile {
            user_id: user_id.to_string(),
            created_at: get("created_at").and_then(|s| s.parse().ok()).unwrap_or_else(Utc::now),
            last_seen: get("last_seen").and_then(|s| s.parse().ok()).unwrap_or_else(Utc::now),
            total_interactions: get("total_interactions").and_then(|s| s.parse().ok()).unwrap_or(0),
            intimacy_score,
            relationship_level: RelationshipLevel::from_intimacy(intimacy_score),
            interests: get("interests")
                .and_then(|s| serde_json::from_str(&s).ok())
                .unwrap_or_default(),
            personality_traits: get("personality_traits")
                .and_then(|s| serde_json::from_str(&s).ok())
                .unwrap_or_default(),
            preferences: get("preferences")
                .and_then(|s| serde_json::from_str(&s).ok())
                .unwrap_or_default(),
            occupation_data: get("occupation_data").and_then(|s| serde_json::from_str::<ConfidenceField<String>>(&s).ok()),
            age_data: get("age_data").and_then(|s| serde_json::from_str::<ConfidenceField<String>>(&s).ok()),
            gender_data: get("gender_data").and_then(|s| serde_json::from_str::<ConfidenceField<String>>(&s).ok()),
            communication_style: get("communication_style").and_then(|s| serde_json::from_str::<CommunicationStyle>(&s).ok()),
            emotional_pattern: get("emotional_pattern").and_then(|s| serde_json::from_str::<EmotionalPattern>(&s).ok()),
            current_mood: get("current_mood"),
            motivations: get("motivations").and_then(|s| serde_json::from_str(&s).ok()),
        }
    }

    /// §4.4 `save_chat_message`: append to the long-term ring buffer (cap 500).
    pub async fn save_chat_message(&self, user_id: &str, role: Role, content: &str) -> Result<()> {
        let message = ChatMessage::new(role, content);
        let payload = serde_json::to_string(&message).map_err(|e| ProfileError::Kv(e.into()))?;
        let key = chat_history_key(user_id);
        self.kv.list_push_right(&key, &payload).await?;
        self.kv.list_trim_to_last(&key, CHAT_HISTORY_CAP).await?;
        Ok(())
    }

    /// §4.4 `get_chat_history`.
    pub async fn get_chat_history(&self, user_id: &str, limit: usize) -> Result<Vec<ChatMessage>> {
        let raw = self.kv.list_range(&chat_history_key(user_id), Some(limit)).await?;
        Ok(raw.into_iter().filter_map(|s| serde_json::from_str(&s).ok()).collect())
    }

    /// §4.4 `record_behavior`: append to the behavior ring (cap 200).
    pub async fn record_behavior(&self, user_id: &str, event_type: &str, metadata: serde_json::Value) -> Result<()> {
        let event = BehaviorEvent::new(event_type, metadata);
        let payload = serde_json::to_string(&event).map_err(|e| ProfileError::Kv(e.into()))?;
        let key = behaviors_key(user_id);
        self.kv.list_push_right(&key, &payload).await?;
        self.kv.list_trim_to_last(&key, BEHAVIOR_CAP).await?;
        Ok(())
    }

    pub async fn get_behaviors(&self, user_id: &str) -> Result<Vec<BehaviorEvent>> {
        let raw = self.kv.list_range(&behaviors_key(user_id), None).await?;
        Ok(raw.into_iter().filter_map(|s| serde_json::from_str(&s).ok()).collect())
    }

    /// §4.4 `update_last_seen`.
    pub async fn update_last_seen(&self, user_id: &str) -> Result<()> {
        self.kv
            .hash_set(&profile_key(user_id), &HashMap::from([("last_seen".to_string(), Utc::now().to_rfc3339())]))
            .await?;
        Ok(())
    }

    /// §4.4 `increment_interaction`.
    pub async fn increment_interaction(&self, user_id: &str) -> Result<i64> {
        Ok(self.kv.hash_incr_by(&profile_key(user_id), "total_interactions", 1).await?)
    }

    /// §4.4 `add_interest_tags`: set-union into existing interests.
    pub async fn add_interest_tags(&self, user_id: &str, tags: &[String]) -> Result<()> {
        if tags.is_empty() {
            return Ok(());
        }
        let key = profile_key(user_id);
        let mut interests: std::collections::HashSet<String> = self
            .kv
            .hash_get(&key, "interests")
            .await?
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();
        interests.extend(tags.iter().cloned());
        self.kv
            .hash_set(
                &key,
                &HashMap::from([(
                    "interests".to_string(),
                    serde_json::to_string(&interests).map_err(|e| ProfileError::Kv(e.into()))?,
                )]),
            )
            .await?;
        Ok(())
    }

    /// §4.4 `update_intimacy`: atomic add, then recompute and store
    /// `relationship_level`.
    pub async fn update_intimacy(&self, user_id: &str, delta: i64) -> Result<(i64, RelationshipLevel)> {
        let key = profile_key(user_id);
        let new_score = self.kv.hash_incr_by(&key, "intimacy_score", delta).await?;
        let level = RelationshipLevel::from_intimacy(new_score);
        self.kv
            .hash_set(&key, &HashMap::from([("relationship_level".to_string(), level.as_str().to_string())]))
            .await?;
        Ok((new_score, level))
    }

    /// §4.4 `update_personality_traits`: dictionary merge (new keys win).
    pub async fn update_personality_traits(&self, user_id: &str, traits: &HashMap<String, String>) -> Result<()> {
        if traits.is_empty() {
            return Ok(());
        }
        let key = profile_key(user_id);
        let mut current: HashMap<String, String> = self
            .kv
            .hash_get(&key, "personality_traits")
            .await?
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();
        current.extend(traits.clone());
        self.kv
            .hash_set(
                &key,
                &HashMap::from([(
                    "personality_traits".to_string(),
                    serde_json::to_string(&current).map_err(|e| ProfileError::Kv(e.into()))?,
                )]),
            )
            .await?;
        Ok(())
    }

    /// Apply rule-inference (C6) confidence-gated demographic fields.
    /// Mirrors the original's `_update_from_rules` gating: occupation only
    /// written above 0.5, and only overwritten by a later call above 0.6;
    /// age above 0.4; gender above 0.5.
    pub async fn apply_occupation(&self, user_id: &str, occupation: &str, confidence: f64) -> Result<()> {
        if confidence <= OCCUPATION_CONFIDENCE_FLOOR {
            return Ok(());
        }
        let key = profile_key(user_id);
        let existing = self.kv.hash_get(&key, "occupation_data").await?;
        if existing.is_some() && confidence <= OCCUPATION_OVERWRITE_FLOOR {
            return Ok(());
        }
        let field = ConfidenceField::new(occupation.to_string(), confidence);
        self.kv
            .hash_set(&key, &HashMap::from([("occupation_data".to_string(), serde_json::to_string(&field).unwrap_or_default())]))
            .await?;
        Ok(())
    }

    pub async fn apply_age(&self, user_id: &str, age_range: &str, confidence: f64) -> Result<()> {
        if confidence <= AGE_CONFIDENCE_FLOOR {
            return Ok(());
        }
        let field = ConfidenceField::new(age_range.to_string(), confidence);
        self.kv
            .hash_set(
                &profile_key(user_id),
                &HashMap::from([("age_data".to_string(), serde_json::to_string(&field).unwrap_or_default())]),
            )
            .await?;
        Ok(())
    }

    pub async fn apply_gender(&self, user_id: &str, gender: &str, confidence: f64) -> Result<()> {
        if confidence <= GENDER_CONFIDENCE_FLOOR {
            return Ok(());
        }
        let field = ConfidenceField::new(gender.to_string(), confidence);
        self.kv
            .hash_set(
                &profile_key(user_id),
                &HashMap::from([("gender_data".to_string(), serde_json::to_string(&field).unwrap_or_default())]),
            )
            .await?;
        Ok(())
    }

    pub async fn set_communication_style(&self, user_id: &str, style: &CommunicationStyle) -> Result<()> {
        self.kv
            .hash_set(
                &profile_key(user_id),
                &HashMap::from([("communication_style".to_string(), serde_json::to_string(style).unwrap_or_default())]),
            )
            .await?;
        Ok(())
    }

    pub async fn set_emotional_pattern(&self, user_id: &str, pattern: &EmotionalPattern) -> Result<()> {
        self.kv
            .hash_set(
                &profile_key(user_id),
                &HashMap::from([("emotional_pattern".to_string(), serde_json::to_string(pattern).unwrap_or_default())]),
            )
            .await?;
        Ok(())
    }

    /// Dictionary-merge free-form values into `preferences` (new keys win).
    /// Used for rule-inference education level and the deep analyzer's
    /// advisory/communication-style output — anything that doesn't warrant
    /// its own typed field.
    pub async fn update_preferences(&self, user_id: &str, values: &HashMap<String, serde_json::Value>) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }
        let key = profile_key(user_id);
        let mut current: HashMap<String, serde_json::Value> = self
            .kv
            .hash_get(&key, "preferences")
            .await?
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();
        current.extend(values.clone());
        self.kv
            .hash_set(
                &key,
                &HashMap::from([(
                    "preferences".to_string(),
                    serde_json::to_string(&current).map_err(|e| ProfileError::Kv(e.into()))?,
                )]),
            )
            .await?;
        Ok(())
    }

    /// §4.4 `update_from_llm_analysis`: conditionally applies interests,
    /// personality, and preferences from a §4.7 deep-analysis payload.
    /// Confidence gate: only non-empty fields are applied.
    pub async fn update_from_llm_analysis(
        &self,
        user_id: &str,
        interests: &[String],
        personality: &HashMap<String, String>,
        current_mood: Option<&str>,
        motivations: Option<&HashMap<String, f64>>,
    ) -> Result<()> {
        if !interests.is_empty() {
            self.add_interest_tags(user_id, interests).await?;
        }
        if !personality.is_empty() {
            self.update_personality_traits(user_id, personality).await?;
        }
        let key = profile_key(user_id);
        if let Some(mood) = current_mood {
            if !mood.is_empty() {
                self.kv.hash_set(&key, &HashMap::from([("current_mood".to_string(), mood.to_string())])).await?;
            }
        }
        if let Some(motivations) = motivations {
            if !motivations.is_empty() {
                self.kv
                    .hash_set(
                        &key,
                        &HashMap::from([(
                            "motivations".to_string(),
                            serde_json::to_string(motivations).map_err(|e| ProfileError::Kv(e.into()))?,
                        )]),
                    )
                    .await?;
            }
        }
        Ok(())
    }

    /// §4.4 `build_context_prompt`: relationship level, top 5 interests, top
    /// 3 traits, and a familiarity hint above intimacy 50.
    pub async fn build_context_prompt(&self, user_id: &str) -> Result<String> {
        let Some(profile) = self.get_profile(user_id).await? else {
            return Ok(String::new());
        };

        let mut parts = Vec::new();
        parts.push(format!("Your relationship with the user is: {}", profile.relationship_level));

        if !profile.interests.is_empty() {
            let mut interests: Vec<&String> = profile.interests.iter().collect();
            interests.sort();
            let top5: Vec<&str> = interests.into_iter().take(5).map(|s| s.as_str()).collect();
            parts.push(format!("The user's interests include: {}", top5.join(", ")));
        }

        if !profile.personality_traits.is_empty() {
            let mut traits: Vec<(&String, &String)> = profile.personality_traits.iter().collect();
            traits.sort_by_key(|(k, _)| k.clone());
            let desc: Vec<String> = traits.into_iter().take(3).map(|(k, v)| format!("{k}({v})")).collect();
            parts.push(format!("The user's personality traits: {}", desc.join(", ")));
        }

        if profile.intimacy_score > 50 {
            parts.push("You're quite familiar with each other now — feel free to be warmer and more casual.".to_string());
        }

        if parts.len() == 1 && profile.interests.is_empty() && profile.personality_traits.is_empty() {
            // relationship line alone isn't worth surfacing as profile context
            return Ok(String::new());
        }

        Ok(format!(
            "[user profile reference]\n{}\n\nReply in a more personalized way given this information.",
            parts.join("\n")
        ))
    }

    /// §4.4 `get_profile_summary`: compact derived view.
    pub async fn get_profile_summary(&self, user_id: &str) -> Result<ProfileSummary> {
        let profile = self
            .get_profile(user_id)
            .await?
            .ok_or_else(|| ProfileError::NotFound(user_id.to_string()))?;
        Ok(ProfileSummary {
            user_id: profile.user_id,
            relationship_level: profile.relationship_level,
            intimacy_score: profile.intimacy_score,
            trust_level: (profile.intimacy_score as f64 / 200.0).min(1.0),
            interaction_comfort: (profile.intimacy_score as f64 / 150.0).min(1.0),
            interest_count: profile.interests.len(),
            total_interactions: profile.total_interactions,
        })
    }

    /// Mark `last_profile_update` with a 10-minute TTL, so refresh cannot
    /// happen faster than that (§4.8).
    pub async fn mark_profile_updated(&self, user_id: &str) -> Result<()> {
        self.kv
            .set_string(&last_profile_update_key(user_id), &Utc::now().to_rfc3339(), Some(LAST_PROFILE_UPDATE_TTL_SECS))
            .await?;
        Ok(())
    }

    /// Whether a profile refresh should be skipped because it was updated
    /// more recently than `within_secs` (§4.8: 180s).
    pub async fn profile_updated_within(&self, user_id: &str, within_secs: i64) -> Result<bool> {
        let Some(raw) = self.kv.get_string(&last_profile_update_key(user_id)).await? else {
            return Ok(false);
        };
        let Ok(last) = raw.parse::<chrono::DateTime<Utc>>() else {
            return Ok(false);
        };
        Ok((Utc::now() - last).num_seconds() < within_secs)
    }

    /// Enumerate up to `limit` user profile keys for the worker's refresh
    /// sweep (§4.8 step 2).
    pub async fn list_user_ids(&self, limit: usize) -> Result<Vec<String>> {
        let keys = self.kv.keys_matching("user:*:profile").await?;
        Ok(keys
            .into_iter()
            .filter_map(|k| {
                let rest = k.strip_prefix("user:")?;
                let uid = rest.strip_suffix(":profile")?;
                Some(uid.to_string())
            })
            .take(limit)
            .collect())
    }
}
