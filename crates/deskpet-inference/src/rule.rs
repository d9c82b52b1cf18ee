//! Rule inference (C6, §4.6): stateless, deterministic keyword scoring over
//! a bag of user messages. Grounded in the original `UserInferenceService`
//! and its `analyze_communication_style` / `analyze_emotional_patterns`
//! methods — same thresholds, same keyword tables (see [`crate::keywords`]).

use deskpet_core::types::{ChatMessage, CommunicationStyle, ConfidenceField, EmotionalPattern, Role};

use crate::keywords::{
    count_occurrences, AGE_KEYWORDS, ANXIOUS_WORDS, CASUAL_INDICATORS, EDUCATION_KEYWORDS,
    FEMALE_KEYWORDS, FORMAL_INDICATORS, INTEREST_KEYWORDS, MALE_KEYWORDS, NEGATIVE_WORDS,
    OCCUPATION_KEYWORDS, POSITIVE_WORDS,
};

/// Full rule-inference output over one bag of user messages (§4.6).
#[derive(Debug, Clone, Default)]
pub struct RuleInferenceResult {
    pub occupation: Option<ConfidenceField<String>>,
    pub age_range: Option<ConfidenceField<String>>,
    pub gender: Option<ConfidenceField<String>>,
    /// Top-5 interest categories by weight, highest first.
    pub interests: Vec<(String, f64)>,
    pub education: Option<ConfidenceField<String>>,
    pub communication_style: Option<CommunicationStyle>,
    pub emotional_pattern: Option<EmotionalPattern>,
}

fn user_messages(messages: &[ChatMessage]) -> Vec<&str> {
    messages
        .iter()
        .filter(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
        .collect()
}

/// Entry point: run every rule-inference analyzer over `messages` and
/// collect the results. Pure and deterministic — identical input always
/// yields identical output (§8 round-trip law).
pub fn infer_from_messages(messages: &[ChatMessage]) -> RuleInferenceResult {
    let texts = user_messages(messages);
    let combined: String = texts.join(" ");

    RuleInferenceResult {
        occupation: infer_occupation(&combined),
        age_range: infer_age_range(&combined),
        gender: infer_gender(&combined),
        interests: extract_interests(&combined),
        education: infer_education(&combined),
        communication_style: analyze_communication_style(&texts),
        emotional_pattern: analyze_emotional_pattern(&texts),
    }
}

/// §4.6 occupation: score each occupation by total keyword hits, pick the
/// max, return `(label, hits/totalHits)` only if the top score is >= 3.
pub fn infer_occupation(text: &str) -> Option<ConfidenceField<String>> {
    let scores: Vec<(&str, usize)> = OCCUPATION_KEYWORDS
        .iter()
        .map(|(label, keywords)| {
            let score: usize = keywords.iter().map(|k| count_occurrences(text, k)).sum();
            (*label, score)
        })
        .collect();

    let total: usize = scores.iter().map(|(_, s)| s).sum();
    let (best_label, best_score) = scores.into_iter().max_by_key(|(_, s)| *s)?;
    if best_score == 0 || best_score < 3 {
        return None;
    }
    let confidence = (best_score as f64 / total.max(1) as f64).min(0.9);
    Some(ConfidenceField::new(best_label.to_string(), confidence))
}

/// §4.6 age band: 1 point per keyword hit (presence, not count), top >= 2,
/// confidence = min(0.2 * hits, 0.8).
pub fn infer_age_range(text: &str) -> Option<ConfidenceField<String>> {
    let scores: Vec<(&str, usize)> = AGE_KEYWORDS
        .iter()
        .map(|(label, keywords)| {
            let score = keywords.iter().filter(|k| text.contains(*k)).count();
            (*label, score)
        })
        .collect();

    let (best_label, best_score) = scores.into_iter().max_by_key(|(_, s)| *s)?;
    if best_score < 2 {
        return None;
    }
    let confidence = (best_score as f64 * 0.2).min(0.8);
    Some(ConfidenceField::new(best_label.to_string(), confidence))
}

/// §4.6 gender: majority keyword class, confidence = min(dominant / (m+f), 0.7).
/// Returns `None` (rather than an "unknown" field) when no keyword fires at
/// all, since the profile store only writes demographic fields above a
/// confidence floor and an unknown-at-zero-confidence field would never
/// clear that gate anyway.
pub fn infer_gender(text: &str) -> Option<ConfidenceField<String>> {
    let male_score = MALE_KEYWORDS.iter().filter(|k| text.contains(*k)).count();
    let female_score = FEMALE_KEYWORDS.iter().filter(|k| text.contains(*k)).count();

    if male_score == 0 && female_score == 0 {
        return None;
    }
    match male_score.cmp(&female_score) {
        std::cmp::Ordering::Greater => {
            let confidence = (male_score as f64 / (male_score + female_score) as f64).min(0.7);
            Some(ConfidenceField::new("male".to_string(), confidence))
        }
        std::cmp::Ordering::Less => {
            let confidence = (female_score as f64 / (male_score + female_score) as f64).min(0.7);
            Some(ConfidenceField::new("female".to_string(), confidence))
        }
        std::cmp::Ordering::Equal => None,
    }
}

/// §4.6 interests: any category with >= 2 hits, weight = min(0.1*hits, 1.0),
/// returned as top-5 by weight (ties broken by table order).
pub fn extract_interests(text: &str) -> Vec<(String, f64)> {
    let mut scored: Vec<(String, f64)> = INTEREST_KEYWORDS
        .iter()
        .filter_map(|(label, keywords)| {
            let hits = keywords.iter().filter(|k| text.contains(*k)).count();
            if hits >= 2 {
                Some((label.to_string(), (hits as f64 * 0.1).min(1.0)))
            } else {
                None
            }
        })
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(5);
    scored
}

/// §4.6 education: first matching label wins (table order), fixed 0.7
/// confidence.
pub fn infer_education(text: &str) -> Option<ConfidenceField<String>> {
    for (label, keywords) in EDUCATION_KEYWORDS {
        if keywords.iter().any(|k| text.contains(*k)) {
            return Some(ConfidenceField::new(label.to_string(), 0.7));
        }
    }
    None
}

/// Roughly matches emoji code-point ranges used by the original's regex:
/// emoticons, misc symbols & pictographs, transport & map symbols, flags.
fn is_emoji(c: char) -> bool {
    let cp = c as u32;
    (0x1F600..=0x1F64F).contains(&cp)
        || (0x1F300..=0x1F5FF).contains(&cp)
        || (0x1F680..=0x1F6FF).contains(&cp)
        || (0x1F1E0..=0x1F1FF).contains(&cp)
}

/// §4.6 communication style: average length, emoji bucket, question/
/// exclamation rate, formality, response-length preference.
pub fn analyze_communication_style(user_messages: &[&str]) -> Option<CommunicationStyle> {
    if user_messages.is_empty() {
        return None;
    }
    let n = user_messages.len() as f64;
    let avg_length = user_messages.iter().map(|m| m.chars().count()).sum::<usize>() as f64 / n;

    let emoji_count: usize = user_messages.iter().map(|m| m.chars().filter(|c| is_emoji(*c)).count()).sum();
    let emoji_ratio = emoji_count as f64 / n;
    let emoji_frequency = if emoji_ratio > 0.5 {
        "high"
    } else if emoji_ratio > 0.2 {
        "medium"
    } else {
        "low"
    };

    let question_marks: usize = user_messages
        .iter()
        .map(|m| m.matches('?').count() + m.matches('？').count())
        .sum();
    let exclamation_marks: usize = user_messages
        .iter()
        .map(|m| m.matches('!').count() + m.matches('！').count())
        .sum();

    let formal_count: usize = user_messages
        .iter()
        .map(|m| FORMAL_INDICATORS.iter().map(|w| count_occurrences(m, w)).sum::<usize>())
        .sum();
    let casual_count: usize = user_messages
        .iter()
        .map(|m| CASUAL_INDICATORS.iter().map(|w| count_occurrences(m, w)).sum::<usize>())
        .sum();

    Some(CommunicationStyle {
        avg_message_length: avg_length as i64,
        emoji_frequency: emoji_frequency.to_string(),
        emoji_per_message: round2(emoji_ratio),
        question_tendency: question_marks as f64 / n,
        excitement_level: exclamation_marks as f64 / n,
        formality: if formal_count > casual_count { "formal" } else { "casual" }.to_string(),
        response_length_preference: if avg_length > 50.0 {
            "detailed"
        } else if avg_length > 20.0 {
            "medium"
        } else {
            "short"
        }
        .to_string(),
    })
}

/// §4.6 emotional pattern: positive ratio, stability, stress level, from
/// keyword-class counts over the same user-message bag.
pub fn analyze_emotional_pattern(user_messages: &[&str]) -> Option<EmotionalPattern> {
    if user_messages.is_empty() {
        return None;
    }
    let n = user_messages.len() as f64;
    let positive: usize = user_messages
        .iter()
        .map(|m| POSITIVE_WORDS.iter().map(|w| count_occurrences(m, w)).sum::<usize>())
        .sum();
    let negative: usize = user_messages
        .iter()
        .map(|m| NEGATIVE_WORDS.iter().map(|w| count_occurrences(m, w)).sum::<usize>())
        .sum();
    let anxious: usize = user_messages
        .iter()
        .map(|m| ANXIOUS_WORDS.iter().map(|w| count_occurrences(m, w)).sum::<usize>())
        .sum();

    let total_emotional = positive + negative + anxious;
    let (positive_ratio, stress_level) = if total_emotional == 0 {
        (0.5, "low")
    } else {
        let ratio = positive as f64 / total_emotional as f64;
        let anxious_rate = anxious as f64 / n;
        let stress = if anxious_rate > 0.5 {
            "high"
        } else if anxious_rate > 0.2 {
            "medium"
        } else {
            "low"
        };
        (ratio, stress)
    };

    Some(EmotionalPattern {
        positive_ratio: round2(positive_ratio),
        emotional_stability: round2(1.0 - negative as f64 / n),
        stress_level: stress_level.to_string(),
        anxiety_indicators: anxious as i64,
    })
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(role: Role, content: &str) -> ChatMessage {
        ChatMessage::new(role, content)
    }

    #[test]
    fn occupation_needs_at_least_three_hits() {
        let text = "我在写代码 又遇到一个bug github上找到了参考";
        let result = infer_occupation(text).expect("should infer programmer");
        assert_eq!(result.value, "程序员");
        assert!(result.confidence >= 0.5);
    }

    #[test]
    fn occupation_is_none_below_threshold() {
        assert!(infer_occupation("代码 bug").is_none());
    }

    #[test]
    fn rule_inference_is_deterministic() {
        let messages = vec![
            msg(Role::User, "我在写代码"),
            msg(Role::User, "又遇到一个bug"),
            msg(Role::User, "github上找到了参考"),
        ];
        let a = infer_from_messages(&messages);
        let b = infer_from_messages(&messages);
        assert_eq!(a.occupation.map(|o| o.value), b.occupation.map(|o| o.value));
    }

    #[test]
    fn empty_messages_yield_empty_structures() {
        let result = infer_from_messages(&[]);
        assert!(result.occupation.is_none());
        assert!(result.age_range.is_none());
        assert!(result.gender.is_none());
        assert!(result.interests.is_empty());
        assert!(result.communication_style.is_none());
        assert!(result.emotional_pattern.is_none());
    }

    #[test]
    fn interests_capped_at_five_and_sorted_by_weight() {
        let text = "游戏 游戏 游戏 游戏 音乐 音乐 阅读 阅读 旅游 旅游 美食 美食 电影 电影";
        let interests = extract_interests(text);
        assert!(interests.len() <= 5);
        for pair in interests.windows(2) {
            assert!(pair[0].1 >= pair[1].1);
        }
    }

    #[test]
    fn gender_majority_wins() {
        let result = infer_gender("兄弟 哥们 老铁").unwrap();
        assert_eq!(result.value, "male");
    }

    #[test]
    fn communication_style_detail_bucket_for_long_messages() {
        let long = "a".repeat(60);
        let msgs = vec![long.as_str()];
        let style = analyze_communication_style(&msgs).unwrap();
        assert_eq!(style.response_length_preference, "detailed");
    }
}
