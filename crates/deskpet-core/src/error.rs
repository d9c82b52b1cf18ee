use thiserror::Error;

/// Error kinds shared across the whole backend. Every crate that talks to
/// the KV store, an LLM provider, or validates user input produces one of
/// these so the gateway can map a single enum to HTTP responses.
#[derive(Debug, Error)]
pub enum PetError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Auth/config error: {0}")]
    AuthConfig(String),

    #[error("Rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Upstream returned a bad response: {0}")]
    UpstreamBadResponse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("KV store error: {0}")]
    Kv(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PetError {
    /// Short error code, mirroring this codebase's existing `code()` convention.
    pub fn code(&self) -> &'static str {
        match self {
            PetError::Config(_) => "CONFIG_ERROR",
            PetError::Validation(_) => "VALIDATION",
            PetError::AuthConfig(_) => "AUTH_CONFIG",
            PetError::RateLimited { .. } => "RATE_LIMITED",
            PetError::Network(_) => "NETWORK",
            PetError::UpstreamBadResponse(_) => "UPSTREAM_BAD_RESPONSE",
            PetError::NotFound(_) => "NOT_FOUND",
            PetError::Kv(_) => "KV_ERROR",
            PetError::Serialization(_) => "SERIALIZATION_ERROR",
            PetError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Friendly, user-facing message. No raw upstream text ever reaches the
    /// end user — see the orchestrator's error-translation rule.
    pub fn friendly_message(&self) -> &'static str {
        match self {
            PetError::RateLimited { .. } => "too many requests, rest a moment",
            PetError::Network(_) => "network failure",
            _ => "I'm tired, chat later",
        }
    }
}

pub type Result<T> = std::result::Result<T, PetError>;
