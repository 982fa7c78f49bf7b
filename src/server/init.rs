//! Server initialization
//!
//! Builds the usage store, auth store, providers and generation service from
//! configuration, then serves the HTTP API until a shutdown signal arrives.

use super::config::AppConfig;
use super::loader::load_config;
use super::validation::{validate_media_budget, validate_production_config, validate_retry_budget};
use anyhow::{Context, Result};
use muse_core::{
    AuthStore, GenerationService, QuotaGate, SqliteUsageStore, StaticSubscriptions, UpstreamProxy,
};
use muse_llm::{OpenAiConfig, OpenAiProvider, ReplicateConfig, ReplicateProvider};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Build the auth store and register every configured key
pub fn build_auth_store(config: &AppConfig) -> Result<Arc<AuthStore>> {
    let auth = &config.server.auth;
    let store = AuthStore::new(auth.enabled).with_dev_caller(auth.dev_caller_id.clone());

    for key in &auth.keys {
        store
            .register_key_hash(&key.caller_id, &key.key_hash, &key.label)
            .with_context(|| format!("Invalid API key entry for caller {}", key.caller_id))?;
        if key.revoked {
            store
                .revoke_key(&key.key_hash)
                .with_context(|| format!("Failed to revoke API key for caller {}", key.caller_id))?;
        }
    }

    if auth.enabled {
        info!(keys = store.active_key_count(), "API key authentication enabled");
    } else {
        warn!(caller_id = %auth.dev_caller_id, "Authentication DISABLED");
    }
    Ok(Arc::new(store))
}

/// Open the usage store configured under `[database]`
pub async fn open_usage_store(config: &AppConfig) -> Result<Arc<SqliteUsageStore>> {
    let store = SqliteUsageStore::from_url(&config.database.url)
        .await
        .with_context(|| format!("Failed to open usage store at {}", config.database.url))?;
    Ok(Arc::new(store))
}

/// Build the generation service with OpenAI and Replicate providers
pub async fn build_service(config: &AppConfig) -> Result<Arc<GenerationService>> {
    let openai_config = OpenAiConfig::from_env()
        .context("OpenAI provider requires OPENAI_API_KEY")?
        .with_model(config.openai.conversation_model.clone())
        .with_image_model(config.openai.image_model.clone())
        .with_timeout(Duration::from_secs(config.openai.timeout_secs));
    let openai = Arc::new(OpenAiProvider::new(openai_config)?);
    info!("OpenAI provider initialized");

    let replicate_config = ReplicateConfig::from_env()
        .context("Replicate provider requires REPLICATE_API_TOKEN")?
        .with_polling(
            Duration::from_millis(config.replicate.poll_interval_ms),
            config.replicate.max_polls,
        );
    let replicate_config = ReplicateConfig {
        timeout: Duration::from_secs(config.replicate.timeout_secs),
        ..replicate_config
    };
    let replicate = Arc::new(ReplicateProvider::new(replicate_config)?);
    info!("Replicate provider initialized");

    let proxy = UpstreamProxy::new(openai.clone(), openai, replicate, config.tool_settings())
        .with_retry(config.retry.to_retry_config())
        .with_deadline(config.retry.deadline());

    let usage_store = open_usage_store(config).await?;
    let gate = QuotaGate::new(usage_store, config.quota.free_limit);
    let subscriptions = StaticSubscriptions::new(config.subscriptions.pro_callers.iter().cloned());
    info!(
        free_limit = config.quota.free_limit,
        pro_callers = subscriptions.len(),
        "Quota gate initialized"
    );

    Ok(Arc::new(GenerationService::new(
        gate,
        Arc::new(subscriptions),
        proxy,
    )))
}

/// Run the HTTP server
pub async fn run() -> Result<()> {
    info!("Starting Muse v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    info!("Configuration loaded");
    validate_production_config(&config);
    validate_retry_budget(&config.retry);
    validate_media_budget(&config.replicate, &config.retry);

    let auth_store = build_auth_store(&config)?;
    let service = build_service(&config).await?;

    let app = crate::api::app_router(service, auth_store);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Muse shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
