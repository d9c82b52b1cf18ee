use std::net::SocketAddr;
use std::sync::Arc;

use deskpet_core::config::PetConfig;
use deskpet_orchestrator::OrchestratorDeps;
use deskpet_profile::ProfileStore;
use deskpet_sessions::SessionManager;
use tracing::info;

mod app;
mod error;
mod http;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "deskpet_gateway=info,tower_http=info".into()),
        )
        .init();

    let config_path = std::env::var("PET_CONFIG").ok();
    let config = PetConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("config load failed ({}), using defaults", e);
        PetConfig::default()
    });

    let kv = app::build_kv(&config).await;
    let providers = Arc::new(app::build_providers(&config.providers));
    let sessions = Arc::new(SessionManager::new(kv.clone()));
    let profiles = Arc::new(ProfileStore::new(kv.clone()));
    let deps = OrchestratorDeps { kv, sessions, profiles, providers };

    let worker_handle = app::start_worker(&deps);

    let state = Arc::new(app::AppState::new(config.clone(), deps));
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.http.host, config.http.port).parse()?;
    info!("deskpet gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    worker_handle.stop().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutdown signal received");
}
