use std::{sync::Arc, time::Duration};

use anyhow::Context;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use leaf_doctor::{
    config::AppConfig,
    routes,
    services::{advisor::GroqAdvisor, controller::ModelStatus, credentials::CredentialResolver},
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Only the configured file; a parent directory's `.env` is never picked up.
    let env_file = AppConfig::env_file_from(|key| std::env::var(key).ok());
    dotenvy::from_path(&env_file).ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let config = AppConfig::from_env().context("invalid configuration")?;

    // Loaded once; a missing or broken model only disables predictions.
    let model = ModelStatus::load(&config.model_path);

    let credentials = CredentialResolver::new(&config.secrets_dir, &config.env_file);
    let advisor = GroqAdvisor::new(credentials, &config.advisor_base_url, &config.advisor_model);

    let state = Arc::new(AppState::new(config.session_ttl, model, Arc::new(advisor)));

    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        let period = sessions.ttl().max(Duration::from_secs(1));
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let removed = sessions.purge_expired().await;
            if removed > 0 {
                info!(removed, "expired sessions purged");
            }
        }
    });

    let app = routes::create_router()
        .with_state(state)
        .layer(CorsLayer::very_permissive());

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    info!("🌱 Leaf doctor running at http://{}", config.addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    Ok(())
}
