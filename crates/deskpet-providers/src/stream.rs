/// Events emitted during LLM streaming response (§6: the `/api/chat/stream`
/// endpoint forwards these as `data: {...}\n\n` SSE frames).
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// Incremental text content from the model.
    TextDelta { text: String },
    /// Stream completed successfully — the terminal sentinel.
    Done,
    /// Error during streaming.
    Error { message: String },
}

/// Parse a single SSE `data: ...` line from an OpenAI-compatible streaming
/// response. Returns `None` for blank lines, comments, or the `[DONE]`
/// sentinel (callers check for that separately).
pub fn parse_sse_data_line(line: &str) -> Option<&str> {
    line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_data_prefix() {
        assert_eq!(parse_sse_data_line("data: {\"a\":1}"), Some("{\"a\":1}"));
        assert_eq!(parse_sse_data_line("data:{\"a\":1}"), Some("{\"a\":1}"));
        assert_eq!(parse_sse_data_line("event: ping"), None);
    }
}
