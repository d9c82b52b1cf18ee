use std::collections::HashMap;

use chrono::{Datelike, Timelike};
use serde::Serialize;

use deskpet_core::types::BehaviorEvent;

/// Derived interaction counts and ratios (§4.10).
#[derive(Debug, Clone, Serialize)]
pub struct InteractionPatterns {
    pub total_interactions: usize,
    pub click_count: usize,
    pub drag_count: usize,
    pub chat_count: usize,
    pub state_change_count: usize,
    pub click_ratio: f64,
    pub drag_ratio: f64,
    pub chat_ratio: f64,
    pub interaction_level: &'static str,
    pub interaction_style: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimePatterns {
    pub peak_hours: Vec<u32>,
    pub peak_days: Vec<&'static str>,
    pub time_pattern: &'static str,
    pub total_active_hours: usize,
    pub most_active_hour: Option<u32>,
    pub hour_distribution: HashMap<u32, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatePreferences {
    pub total_state_changes: usize,
    pub favorite_state: Option<String>,
    pub state_preferences: HashMap<String, usize>,
    pub state_change_frequency: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EngagementBreakdown {
    pub interaction: f64,
    pub diversity: f64,
    pub time_span: f64,
    pub chat_depth: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Engagement {
    pub score: f64,
    pub level: &'static str,
    pub breakdown: EngagementBreakdown,
}

#[derive(Debug, Clone, Serialize)]
pub struct BehaviorSummary {
    pub total_behaviors: usize,
    pub interaction_patterns: Option<InteractionPatterns>,
    pub time_patterns: Option<TimePatterns>,
    pub state_preferences: Option<StatePreferences>,
    pub engagement: Engagement,
}

fn timestamps_hours_days(behaviors: &[BehaviorEvent]) -> Vec<(u32, u32)> {
    behaviors
        .iter()
        .map(|b| (b.timestamp.hour(), b.timestamp.weekday().num_days_from_monday()))
        .collect()
}

fn time_span_days(behaviors: &[BehaviorEvent]) -> f64 {
    if behaviors.len() < 2 {
        return 1.0;
    }
    let min = behaviors.iter().map(|b| b.timestamp).min().unwrap();
    let max = behaviors.iter().map(|b| b.timestamp).max().unwrap();
    ((max - min).num_seconds() as f64 / 86400.0).max(1.0)
}

/// Interaction level by events/hour thresholds 0.5/2/5/10 (§4.10).
fn interaction_level(total: usize, behaviors: &[BehaviorEvent]) -> &'static str {
    if behaviors.len() < 2 {
        return if total < 10 { "low" } else { "medium" };
    }
    let min = behaviors.iter().map(|b| b.timestamp).min().unwrap();
    let max = behaviors.iter().map(|b| b.timestamp).max().unwrap();
    let span_hours = ((max - min).num_seconds() as f64 / 3600.0).max(1.0);
    let per_hour = total as f64 / span_hours;

    if per_hour > 10.0 {
        "very_high"
    } else if per_hour > 5.0 {
        "high"
    } else if per_hour > 2.0 {
        "medium"
    } else if per_hour > 0.5 {
        "low"
    } else {
        "very_low"
    }
}

fn interaction_style(chat_ratio: f64, drag_ratio: f64, click_ratio: f64) -> &'static str {
    if chat_ratio > 0.4 {
        "chatty"
    } else if drag_ratio > 0.3 {
        "controlling"
    } else if click_ratio > 0.5 {
        "interactive"
    } else {
        "observer"
    }
}

/// §4.10: total/per-type counts, interaction level, and inferred style.
pub fn analyze_interaction_patterns(behaviors: &[BehaviorEvent]) -> Option<InteractionPatterns> {
    if behaviors.is_empty() {
        return None;
    }
    let total = behaviors.len();
    let count_of = |t: &str| behaviors.iter().filter(|b| b.event_type == t).count();
    let click_count = count_of("pet_click");
    let drag_count = count_of("pet_drag");
    let chat_count = count_of("chat_session");
    let state_change_count = count_of("state_change");

    let click_ratio = click_count as f64 / total.max(1) as f64;
    let drag_ratio = drag_count as f64 / total.max(1) as f64;
    let chat_ratio = chat_count as f64 / total.max(1) as f64;

    Some(InteractionPatterns {
        total_interactions: total,
        click_count,
        drag_count,
        chat_count,
        state_change_count,
        click_ratio,
        drag_ratio,
        chat_ratio,
        interaction_level: interaction_level(total, behaviors),
        interaction_style: interaction_style(chat_ratio, drag_ratio, click_ratio),
    })
}

/// §4.10: active-hour histogram, peak hours/days, time-of-day pattern.
pub fn analyze_active_time_patterns(behaviors: &[BehaviorEvent]) -> Option<TimePatterns> {
    if behaviors.is_empty() {
        return None;
    }
    let hd = timestamps_hours_days(behaviors);
    let mut hour_counts: HashMap<u32, usize> = HashMap::new();
    let mut day_counts: HashMap<u32, usize> = HashMap::new();
    for (h, d) in &hd {
        *hour_counts.entry(*h).or_insert(0) += 1;
        *day_counts.entry(*d).or_insert(0) += 1;
    }

    let mut hours_sorted: Vec<(&u32, &usize)> = hour_counts.iter().collect();
    hours_sorted.sort_by(|a, b| b.1.cmp(a.1));
    let peak_hours: Vec<u32> = hours_sorted.iter().take(3).map(|(h, _)| **h).collect();
    let most_active_hour = hours_sorted.first().map(|(h, _)| **h);

    let day_names = ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday"];
    let mut days_sorted: Vec<(&u32, &usize)> = day_counts.iter().collect();
    days_sorted.sort_by(|a, b| b.1.cmp(a.1));
    let peak_days: Vec<&'static str> = days_sorted
        .iter()
        .take(3)
        .map(|(d, _)| day_names.get(**d as usize).copied().unwrap_or("unknown"))
        .collect();

    let total = hd.len() as f64;
    let morning = hd.iter().filter(|(h, _)| (6..12).contains(h)).count() as f64;
    let afternoon = hd.iter().filter(|(h, _)| (12..18).contains(h)).count() as f64;
    let evening = hd.iter().filter(|(h, _)| (18..24).contains(h)).count() as f64;
    let night = hd.iter().filter(|(h, _)| *h < 6).count() as f64;

    let time_pattern = if evening / total > 0.4 {
        "evening"
    } else if morning / total > 0.4 {
        "morning"
    } else if afternoon / total > 0.4 {
        "afternoon"
    } else if night / total > 0.3 {
        "night"
    } else {
        "dispersed"
    };

    Some(TimePatterns {
        peak_hours,
        peak_days,
        time_pattern,
        total_active_hours: hour_counts.len(),
        most_active_hour,
        hour_distribution: hour_counts,
    })
}

/// §4.10: state-change preferences.
pub fn analyze_state_preferences(behaviors: &[BehaviorEvent]) -> Option<StatePreferences> {
    let state_changes: Vec<&BehaviorEvent> = behaviors.iter().filter(|b| b.event_type == "state_change").collect();
    if state_changes.is_empty() {
        return None;
    }

    let mut to_counts: HashMap<String, usize> = HashMap::new();
    for b in &state_changes {
        if let Some(to_state) = b.metadata.get("to_state").and_then(|v| v.as_str()) {
            *to_counts.entry(to_state.to_string()).or_insert(0) += 1;
        }
    }
    let favorite_state = to_counts.iter().max_by_key(|(_, count)| **count).map(|(k, _)| k.clone());

    Some(StatePreferences {
        total_state_changes: state_changes.len(),
        favorite_state,
        state_preferences: to_counts,
        state_change_frequency: state_changes.len() as f64 / behaviors.len().max(1) as f64,
    })
}

/// §4.10: 0-100 engagement score with breakdown.
pub fn calculate_engagement_score(behaviors: &[BehaviorEvent]) -> Engagement {
    if behaviors.is_empty() {
        return Engagement {
            score: 0.0,
            level: "none",
            breakdown: EngagementBreakdown { interaction: 0.0, diversity: 0.0, time_span: 0.0, chat_depth: 0.0 },
        };
    }

    let interaction_score = (behaviors.len() as f64 / 100.0).min(1.0) * 30.0;

    let distinct_types: std::collections::HashSet<&str> = behaviors.iter().map(|b| b.event_type.as_str()).collect();
    let diversity_score = (distinct_types.len() as f64 / 8.0).min(1.0) * 20.0;

    let time_score = (time_span_days(behaviors) / 30.0).min(1.0) * 20.0;

    let chat_behaviors: Vec<&BehaviorEvent> = behaviors.iter().filter(|b| b.event_type == "chat_session").collect();
    let chat_score = if chat_behaviors.is_empty() {
        0.0
    } else {
        let total_messages: i64 = chat_behaviors
            .iter()
            .filter_map(|b| b.metadata.get("message_count").and_then(|v| v.as_i64()))
            .sum();
        (total_messages as f64 / 50.0).min(1.0) * 30.0
    };

    let total = interaction_score + diversity_score + time_score + chat_score;
    let level = if total >= 80.0 {
        "very_high"
    } else if total >= 60.0 {
        "high"
    } else if total >= 40.0 {
        "medium"
    } else if total >= 20.0 {
        "low"
    } else {
        "very_low"
    };

    Engagement {
        score: total,
        level,
        breakdown: EngagementBreakdown {
            interaction: interaction_score,
            diversity: diversity_score,
            time_span: time_score,
            chat_depth: chat_score,
        },
    }
}

/// §4.10: the full derived report over a user's behavior history.
pub fn generate_behavior_summary(behaviors: &[BehaviorEvent]) -> BehaviorSummary {
    BehaviorSummary {
        total_behaviors: behaviors.len(),
        interaction_patterns: analyze_interaction_patterns(behaviors),
        time_patterns: analyze_active_time_patterns(behaviors),
        state_preferences: analyze_state_preferences(behaviors),
        engagement: calculate_engagement_score(behaviors),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(event_type: &str, hours_ago: i64, metadata: serde_json::Value) -> BehaviorEvent {
        BehaviorEvent {
            event_type: event_type.to_string(),
            timestamp: chrono::Utc::now() - chrono::Duration::hours(hours_ago),
            metadata,
        }
    }

    #[test]
    fn empty_behaviors_yield_no_patterns_and_zero_engagement() {
        let summary = generate_behavior_summary(&[]);
        assert_eq!(summary.total_behaviors, 0);
        assert!(summary.interaction_patterns.is_none());
        assert_eq!(summary.engagement.score, 0.0);
        assert_eq!(summary.engagement.level, "none");
    }

    #[test]
    fn chatty_style_when_chat_ratio_high() {
        let behaviors = vec![
            event("chat_session", 0, json!({})),
            event("chat_session", 1, json!({})),
            event("chat_session", 2, json!({})),
            event("pet_click", 3, json!({})),
        ];
        let patterns = analyze_interaction_patterns(&behaviors).unwrap();
        assert_eq!(patterns.interaction_style, "chatty");
    }

    #[test]
    fn engagement_breakdown_sums_to_score() {
        let behaviors = vec![
            event("chat_session", 0, json!({"message_count": 30})),
            event("pet_click", 1, json!({})),
            event("pet_drag", 2, json!({})),
        ];
        let engagement = calculate_engagement_score(&behaviors);
        let sum = engagement.breakdown.interaction
            + engagement.breakdown.diversity
            + engagement.breakdown.time_span
            + engagement.breakdown.chat_depth;
        assert!((engagement.score - sum).abs() < 1e-9);
    }

    #[test]
    fn favorite_state_is_most_frequent_to_state() {
        let behaviors = vec![
            event("state_change", 0, json!({"to_state": "happy"})),
            event("state_change", 1, json!({"to_state": "happy"})),
            event("state_change", 2, json!({"to_state": "sleepy"})),
        ];
        let prefs = analyze_state_preferences(&behaviors).unwrap();
        assert_eq!(prefs.favorite_state.as_deref(), Some("happy"));
    }
}
