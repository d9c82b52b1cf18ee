//! User inference (§4.6, §4.7): deterministic keyword-based rule inference
//! (C6) and LLM-backed session summarization / deep profile analysis (C7).
//!
//! Both analyzers are pure with respect to their inputs — no KV or provider
//! access happens inside `rule`, and `llm`'s prompt builders/parsers are
//! separated from the provider call so they can be tested without a
//! network round-trip.

pub mod keywords;
pub mod llm;
pub mod rule;

pub use llm::{
    analyze_profile_deep, build_deep_analysis_prompt, build_summarizer_prompt,
    parse_deep_analysis_response, parse_summarizer_response, summarize_session,
    DeepProfileAnalysis, PromptMessage, SessionSummaryAnalysis,
};
pub use rule::{infer_from_messages, RuleInferenceResult};
