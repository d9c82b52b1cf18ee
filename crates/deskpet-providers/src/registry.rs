use tokio::sync::mpsc;
use tracing::{info, warn};

use deskpet_core::error::PetError;

use crate::provider::{ChatRequest, ChatResponse, LlmProvider, Message, Role};
use crate::stream::StreamEvent;

/// Ordered list of LLM providers with priority-based failover (§4.2).
///
/// Providers are sorted ascending by `priority()` at construction time and
/// never reordered afterwards — this is a process-wide, read-only
/// singleton per §5 and §9's "Global state" note.
pub struct ProviderRegistry {
    providers: Vec<Box<dyn LlmProvider>>,
}

impl ProviderRegistry {
    pub fn new(mut providers: Vec<Box<dyn LlmProvider>>) -> Self {
        providers.sort_by_key(|p| p.priority());
        Self { providers }
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// If `messages` carries no system message, prepend the default persona
    /// prompt (§4.2: "the registry prepends a default persona prompt" —
    /// used only when nothing else was supplied; the primary persona path
    /// is the context assembler, C5).
    fn with_default_system(&self, mut messages: Vec<Message>) -> Vec<Message> {
        if !messages.iter().any(|m| m.role == Role::System) {
            messages.insert(
                0,
                Message {
                    role: Role::System,
                    content: crate::prompt::DEFAULT_PERSONA_PROMPT.to_string(),
                },
            );
        }
        messages
    }

    /// Iterate providers in priority order; on failure, normalize and move
    /// on. A `RateLimited` failure is not retried against the same
    /// provider — there's nothing useful to retry immediately (§4.2).
    pub async fn send(&self, messages: Vec<Message>, req_template: ChatRequest) -> Result<ChatResponse, PetError> {
        if self.providers.is_empty() {
            return Err(PetError::AuthConfig("no LLM providers configured".to_string()));
        }
        let messages = self.with_default_system(messages);

        let mut last_err = None;
        for provider in &self.providers {
            let req = ChatRequest {
                model: req_template.model.clone(),
                messages: messages.clone(),
                max_tokens: req_template.max_tokens,
                temperature: req_template.temperature,
                stop: req_template.stop.clone(),
            };
            match provider.send(&req).await {
                Ok(resp) => {
                    info!(provider = provider.name(), "chat completion succeeded");
                    return Ok(resp);
                }
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "provider failed, trying next");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| PetError::Internal("no providers attempted".to_string())))
    }

    /// Streaming uses only the highest-priority provider; no failover
    /// mid-stream (§4.2).
    pub async fn send_stream(
        &self,
        messages: Vec<Message>,
        req_template: ChatRequest,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<(), PetError> {
        let provider = self
            .providers
            .first()
            .ok_or_else(|| PetError::AuthConfig("no LLM providers configured".to_string()))?;
        let messages = self.with_default_system(messages);
        let req = ChatRequest {
            model: req_template.model,
            messages,
            max_tokens: req_template.max_tokens,
            temperature: req_template.temperature,
            stop: req_template.stop,
        };
        provider.send_stream(&req, tx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FakeProvider {
        name: &'static str,
        priority: i32,
        calls: Arc<AtomicUsize>,
        outcome: Result<&'static str, PetError>,
    }

    #[async_trait]
    impl LlmProvider for FakeProvider {
        fn name(&self) -> &str {
            self.name
        }
        fn priority(&self) -> i32 {
            self.priority
        }
        async fn send(&self, _req: &ChatRequest) -> Result<ChatResponse, PetError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.outcome {
                Ok(text) => Ok(ChatResponse {
                    content: text.to_string(),
                    usage: None,
                }),
                Err(_) => Err(PetError::RateLimited { retry_after_ms: 1000 }),
            }
        }
    }

    #[tokio::test]
    async fn failover_tries_next_provider_on_failure() {
        let calls_a = Arc::new(AtomicUsize::new(0));
        let calls_b = Arc::new(AtomicUsize::new(0));
        let registry = ProviderRegistry::new(vec![
            Box::new(FakeProvider {
                name: "a",
                priority: 0,
                calls: calls_a.clone(),
                outcome: Err(PetError::RateLimited { retry_after_ms: 0 }),
            }),
            Box::new(FakeProvider {
                name: "b",
                priority: 1,
                calls: calls_b.clone(),
                outcome: Ok("hi"),
            }),
        ]);

        let req = ChatRequest::new("m", vec![]);
        let resp = registry
            .send(vec![Message { role: Role::User, content: "hello".into() }], req)
            .await
            .unwrap();

        assert_eq!(resp.content, "hi");
        assert_eq!(calls_a.load(Ordering::SeqCst), 1);
        assert_eq!(calls_b.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn all_providers_failing_surfaces_last_error() {
        let registry = ProviderRegistry::new(vec![
            Box::new(FakeProvider {
                name: "a",
                priority: 0,
                calls: Arc::new(AtomicUsize::new(0)),
                outcome: Err(PetError::RateLimited { retry_after_ms: 0 }),
            }),
            Box::new(FakeProvider {
                name: "b",
                priority: 1,
                calls: Arc::new(AtomicUsize::new(0)),
                outcome: Err(PetError::RateLimited { retry_after_ms: 0 }),
            }),
        ]);

        let req = ChatRequest::new("m", vec![]);
        let err = registry
            .send(vec![Message { role: Role::User, content: "hello".into() }], req)
            .await
            .unwrap_err();
        assert!(matches!(err, PetError::RateLimited { .. }));
    }

    #[tokio::test]
    async fn prepends_default_persona_when_no_system_message() {
        let registry = ProviderRegistry::new(vec![Box::new(FakeProvider {
            name: "a",
            priority: 0,
            calls: Arc::new(AtomicUsize::new(0)),
            outcome: Ok("hi"),
        })]);
        let with_sys = registry.with_default_system(vec![Message {
            role: Role::User,
            content: "hi".into(),
        }]);
        assert_eq!(with_sys.len(), 2);
        assert_eq!(with_sys[0].role, Role::System);
    }
}
