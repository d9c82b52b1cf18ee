use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::stream::StreamEvent;
use deskpet_core::error::PetError;

/// A single message in the array sent to an upstream LLM. Mirrors
/// [`deskpet_core::types::ChatMessage`] but drops the timestamp — providers
/// only care about role/content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl From<deskpet_core::types::Role> for Role {
    fn from(role: deskpet_core::types::Role) -> Self {
        match role {
            deskpet_core::types::Role::User => Role::User,
            deskpet_core::types::Role::Assistant => Role::Assistant,
            deskpet_core::types::Role::System => Role::System,
        }
    }
}

/// Which transport adapter a provider slot uses. Both select the same
/// `LlmProvider` contract (§4.2) — `kind` only changes default chat path /
/// response-envelope assumptions, not the shape callers see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Raw `reqwest` POST against `{base_url}/chat/completions` with a
    /// bearer header — siliconflow-style upstreams.
    DirectHttp,
    /// Same request shape, through an OpenAI-style model/base_url/api_key
    /// configuration triple (a distinct default path if needed).
    OpenAiCompatibleSdk,
}

/// Request to an LLM provider. `max_tokens`/`temperature`/`stop` carry the
/// tuning defaults from §4.2 (150 / 0.8 / `["\n\n", "。。", "！！"]`) unless
/// the caller overrides them.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub stop: Vec<String>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            max_tokens: crate::DEFAULT_MAX_TOKENS,
            temperature: crate::DEFAULT_TEMPERATURE,
            stop: crate::default_stop_sequences(),
        }
    }
}

/// Token usage reported by the upstream, when available.
#[derive(Debug, Clone, Default)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// Response from an LLM provider (non-streaming).
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub usage: Option<Usage>,
}

/// Common interface for all LLM providers. One concrete struct per
/// [`ProviderKind`], selected by the registry at construction (§9).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logging and failover bookkeeping.
    fn name(&self) -> &str;

    /// Lower priority value is attempted first.
    fn priority(&self) -> i32;

    /// Non-streaming chat completion, bounded by the per-attempt timeout
    /// the registry applies around this call (§5).
    async fn send(&self, req: &ChatRequest) -> Result<ChatResponse, PetError>;

    /// Stream content deltas through `tx` until the upstream signals end.
    /// Default falls back to non-streaming `send`, emitting one delta.
    async fn send_stream(
        &self,
        req: &ChatRequest,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<(), PetError> {
        let resp = self.send(req).await?;
        let _ = tx.send(StreamEvent::TextDelta { text: resp.content }).await;
        let _ = tx.send(StreamEvent::Done).await;
        Ok(())
    }
}

/// Classify a raw upstream failure into the normalized error kinds §7
/// requires before it's surfaced to the registry / orchestrator.
pub fn normalize_http_error(status: Option<u16>, body: &str) -> PetError {
    match status {
        Some(401) | Some(403) => PetError::AuthConfig(body.to_string()),
        Some(429) => PetError::RateLimited { retry_after_ms: 5_000 },
        Some(s) if s >= 500 => PetError::Network(format!("upstream {s}: {body}")),
        Some(s) => PetError::UpstreamBadResponse(format!("upstream {s}: {body}")),
        None => PetError::Network(body.to_string()),
    }
}
