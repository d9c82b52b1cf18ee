pub mod http_provider;
pub mod prompt;
pub mod provider;
pub mod registry;
pub mod stream;

pub use http_provider::HttpChatProvider;
pub use provider::{ChatRequest, ChatResponse, LlmProvider, Message, ProviderKind, Role, Usage};
pub use registry::ProviderRegistry;
pub use stream::StreamEvent;

/// Default reply length cap (§4.2 tuning defaults).
pub const DEFAULT_MAX_TOKENS: u32 = 150;

/// Default sampling temperature (§4.2 tuning defaults).
pub const DEFAULT_TEMPERATURE: f32 = 0.8;

/// Default stop sequences — short conversational replies, not essays.
pub fn default_stop_sequences() -> Vec<String> {
    vec!["\n\n".to_string(), "。。".to_string(), "！！".to_string()]
}
