/// Fallback persona used only when a caller sends [`crate::provider::ChatRequest`]
/// without any system message at all. The primary persona (name, configured
/// system prompt, relationship framing) is assembled per-user by the context
/// assembler; this is the registry's last-resort default so a provider never
/// receives an unframed request (§4.2).
pub const DEFAULT_PERSONA_PROMPT: &str =
    "You are a warm, attentive desktop companion. Keep replies short, \
     conversational, and in character.";
