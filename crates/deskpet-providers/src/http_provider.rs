use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use deskpet_core::error::PetError;

use crate::provider::{normalize_http_error, ChatRequest, ChatResponse, LlmProvider, ProviderKind, Role, Usage};
use crate::stream::{parse_sse_data_line, StreamEvent};

/// Both provider `kind`s (§4.2) share this implementation — `kind` only
/// changes the default chat path, not the request/response contract.
/// `direct_http` talks to siliconflow-style upstreams; `openai_compatible_sdk`
/// talks to an OpenAI-shaped endpoint. Both POST the same JSON body.
pub struct HttpChatProvider {
    client: reqwest::Client,
    name: String,
    kind: ProviderKind,
    model: String,
    base_url: String,
    api_key: String,
    priority: i32,
    timeout: std::time::Duration,
}

impl HttpChatProvider {
    pub fn new(
        name: impl Into<String>,
        kind: ProviderKind,
        model: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        priority: i32,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            name: name.into(),
            kind,
            model: model.into(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            priority,
            timeout: std::time::Duration::from_secs(deskpet_core::config::LLM_ATTEMPT_TIMEOUT_SECS),
        }
    }

    fn chat_url(&self) -> String {
        let path = match self.kind {
            ProviderKind::DirectHttp => "/chat/completions",
            ProviderKind::OpenAiCompatibleSdk => "/chat/completions",
        };
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn body(&self, req: &ChatRequest, stream: bool) -> serde_json::Value {
        let messages: Vec<_> = req
            .messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    Role::System => "system",
                };
                json!({ "role": role, "content": m.content })
            })
            .collect();
        json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": req.max_tokens,
            "temperature": req.temperature,
            "stop": req.stop,
            "stream": stream,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    content: String,
}

#[derive(Debug, Deserialize, Serialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl LlmProvider for HttpChatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn send(&self, req: &ChatRequest) -> Result<ChatResponse, PetError> {
        let url = self.chat_url();
        let body = self.body(req, false);
        debug!(provider = %self.name, model = %self.model, "sending chat completion request");

        let resp = tokio::time::timeout(
            self.timeout,
            self.client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send(),
        )
        .await
        .map_err(|_| PetError::Network(format!("{} timed out after {:?}", self.name, self.timeout)))?
        .map_err(|e| PetError::Network(e.to_string()))?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(provider = %self.name, status, body = %text, "provider returned an error");
            return Err(normalize_http_error(Some(status), &text));
        }

        let parsed: ApiResponse = resp
            .json()
            .await
            .map_err(|e| PetError::UpstreamBadResponse(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .ok_or_else(|| PetError::UpstreamBadResponse("no choices in response".to_string()))?;

        Ok(ChatResponse {
            content,
            usage: parsed.usage.map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            }),
        })
    }

    async fn send_stream(
        &self,
        req: &ChatRequest,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<(), PetError> {
        let url = self.chat_url();
        let body = self.body(req, true);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PetError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            let err = normalize_http_error(Some(status), &text);
            let _ = tx.send(StreamEvent::Error { message: err.to_string() }).await;
            return Err(err);
        }

        let mut stream = resp.bytes_stream();
        let mut buf = String::new();
        use futures_util::StreamExt;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| PetError::Network(e.to_string()))?;
            buf.push_str(&String::from_utf8_lossy(&chunk));
            while let Some(pos) = buf.find('\n') {
                let line = buf[..pos].trim_end_matches('\r').to_string();
                buf.drain(..=pos);
                let Some(data) = parse_sse_data_line(&line) else { continue };
                if data == "[DONE]" {
                    let _ = tx.send(StreamEvent::Done).await;
                    return Ok(());
                }
                if let Ok(parsed) = serde_json::from_str::<StreamChunk>(data) {
                    if let Some(choice) = parsed.choices.into_iter().next() {
                        if let Some(text) = choice.delta.content {
                            if !text.is_empty() {
                                let _ = tx.send(StreamEvent::TextDelta { text }).await;
                            }
                        }
                    }
                }
            }
        }
        let _ = tx.send(StreamEvent::Done).await;
        Ok(())
    }
}
