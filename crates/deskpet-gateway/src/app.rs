//! Process-wide shared state (§9 "Global state"): the KV client, provider
//! registry, session/profile stores, and the background worker handle are
//! all initialized once here and injected into request handlers as a single
//! `Arc<AppState>`, mirroring the teacher's `AppState` shape.

use std::sync::Arc;

use deskpet_core::config::{PetConfig, ProvidersConfig};
use deskpet_kv::{KvStore, MemoryKv, RedisKv};
use deskpet_orchestrator::OrchestratorDeps;
use deskpet_profile::ProfileStore;
use deskpet_providers::{HttpChatProvider, LlmProvider, ProviderKind, ProviderRegistry};
use deskpet_sessions::SessionManager;
use deskpet_worker::{BackgroundWorker, WorkerHandle};
use tracing::warn;

/// Shared handles passed to every Axum handler.
pub struct AppState {
    pub config: PetConfig,
    pub deps: OrchestratorDeps,
}

impl AppState {
    pub fn new(config: PetConfig, deps: OrchestratorDeps) -> Self {
        Self { config, deps }
    }
}

/// §4.1: connect to Redis; on failure fall back to the in-process
/// [`MemoryKv`], logging a `tracing::warn!` naming exactly what's lost
/// (persistence, cross-restart TTL enforcement).
pub async fn build_kv(config: &PetConfig) -> Arc<dyn KvStore> {
    match RedisKv::connect(
        &config.kv.redis_host,
        config.kv.redis_port,
        config.kv.redis_db,
        config.kv.redis_password.as_deref(),
    )
    .await
    {
        Ok(kv) => Arc::new(kv),
        Err(e) => {
            warn!(
                error = %e,
                "Redis unreachable at startup, falling back to in-process MemoryKv \
                 (degraded mode: no persistence, no TTL enforcement across restarts)"
            );
            Arc::new(MemoryKv::new())
        }
    }
}

/// §4.2: build the ordered provider list from `providers.priority`, skipping
/// any name with no matching credentials configured.
pub fn build_providers(config: &ProvidersConfig) -> ProviderRegistry {
    let mut providers: Vec<Box<dyn LlmProvider>> = Vec::new();
    for (priority, name) in config.priority.iter().enumerate() {
        match name.as_str() {
            "siliconflow" => {
                if let Some(sf) = &config.siliconflow {
                    providers.push(Box::new(HttpChatProvider::new(
                        "siliconflow",
                        ProviderKind::DirectHttp,
                        sf.model.clone(),
                        sf.base_url.clone(),
                        sf.api_key.clone(),
                        priority as i32,
                    )));
                }
            }
            "openai" => {
                if let Some(oa) = &config.openai {
                    providers.push(Box::new(HttpChatProvider::new(
                        "openai",
                        ProviderKind::OpenAiCompatibleSdk,
                        oa.model.clone(),
                        oa.base_url.clone(),
                        oa.api_key.clone(),
                        priority as i32,
                    )));
                }
            }
            other => warn!(provider = other, "unrecognized entry in provider priority list, skipping"),
        }
    }
    if providers.is_empty() {
        warn!("no LLM providers configured (missing API keys); chat turns will fail until one is set");
    }
    ProviderRegistry::new(providers)
}

/// Wire up the background worker (C8) and start its tick loop.
pub fn start_worker(deps: &OrchestratorDeps) -> WorkerHandle {
    let worker = Arc::new(BackgroundWorker::new(deps.sessions.clone(), deps.profiles.clone(), deps.providers.clone()));
    WorkerHandle::start(worker)
}

/// Assemble the full Axum router (§4.12, §6).
pub fn build_router(state: Arc<AppState>) -> axum::Router {
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/api/chat/message", post(crate::http::chat::chat_message))
        .route("/api/chat/stream", post(crate::http::chat::chat_stream))
        .route("/api/session/{user_id}/current", get(crate::http::session::current_session))
        .route("/api/session/{session_id}/end", post(crate::http::session::end_session))
        .route("/api/session/{session_id}/summary", get(crate::http::session::session_summary))
        .route("/api/behavior", post(crate::http::behavior::record_behavior))
        .route("/api/behaviors/batch", post(crate::http::behavior::record_behaviors_batch))
        .route("/api/behavior/analysis/{user_id}", get(crate::http::behavior::behavior_analysis))
        .route("/api/behavior/stats/{user_id}", get(crate::http::behavior::behavior_stats))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_providers_skips_unconfigured_names() {
        let config = ProvidersConfig { priority: vec!["siliconflow".to_string(), "openai".to_string()], ..Default::default() };
        let registry = build_providers(&config);
        assert!(registry.is_empty());
    }

    #[test]
    fn build_providers_orders_by_priority_list_position() {
        let config = ProvidersConfig {
            priority: vec!["openai".to_string(), "siliconflow".to_string()],
            siliconflow: Some(deskpet_core::config::SiliconflowConfig {
                api_key: "sf-key".to_string(),
                model: "m".to_string(),
                base_url: "http://sf".to_string(),
            }),
            openai: Some(deskpet_core::config::OpenAiConfig {
                api_key: "oa-key".to_string(),
                model: "m".to_string(),
                base_url: "http://oa".to_string(),
            }),
        };
        let registry = build_providers(&config);
        assert_eq!(registry.provider_names(), vec!["openai".to_string(), "siliconflow".to_string()]);
    }
}
