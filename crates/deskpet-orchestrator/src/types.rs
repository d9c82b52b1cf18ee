use chrono::{DateTime, Utc};
use serde::Serialize;

/// Outcome of a completed chat turn (§4.9 step 13).
#[derive(Debug, Clone, Serialize)]
pub struct ChatTurnResult {
    pub reply: String,
    pub timestamp: DateTime<Utc>,
}
