//! # Content Orchestrator Server
//!
//! Composition root: loads configuration, builds the store, clients,
//! breakers and caches, wires them into the orchestrator, and serves the
//! HTTP API alongside the timeout monitor and the event relay.

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

use content_orchestrator::config::{ConfigManager, OrchestratorConfig};
use content_orchestrator::dispatch::{AutomationClient, DispatchAdapter, HttpAutomationClient};
use content_orchestrator::events::{EventLog, EventPublisher, EventRelay};
use content_orchestrator::logging::{get_environment, init_structured_logging};
use content_orchestrator::orchestration::{RequestOrchestrator, TaskTimeoutMonitor};
use content_orchestrator::registry::CapabilityRegistry;
use content_orchestrator::resilience::CircuitBreakerManager;
use content_orchestrator::store::{InMemoryRequestStore, RequestStore};
use content_orchestrator::web::{create_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_structured_logging();

    let manager = ConfigManager::load().context("loading orchestrator configuration")?;
    let config = manager.config().clone();
    info!(
        environment = manager.environment(),
        bind_address = %config.web.bind_address,
        "🚀 Starting content orchestrator"
    );

    let store = build_store(&config).await?;
    let http = reqwest::Client::builder()
        .user_agent(concat!("content-orchestrator/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("building HTTP client")?;

    let automation: Option<Arc<dyn AutomationClient>> =
        config.dispatch.automation_base_url.as_ref().map(|base| {
            Arc::new(HttpAutomationClient::new(
                base.clone(),
                config.dispatch.automation_api_key.clone(),
                http.clone(),
            )) as Arc<dyn AutomationClient>
        });
    if automation.is_none() {
        warn!("No automation base URL configured; only direct capabilities will run");
    }

    let capabilities = Arc::new(CapabilityRegistry::from_settings(&config.dispatch, http));
    let breakers = Arc::new(CircuitBreakerManager::from_settings(&config.circuit_breakers));
    let dispatcher = Arc::new(DispatchAdapter::new(
        &config,
        automation,
        capabilities,
        breakers.clone(),
    ));
    let events = EventLog::new(store.clone(), EventPublisher::default());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let relay = EventRelay::new(events.publisher().clone()).spawn(shutdown_rx.clone());
    let orchestrator = Arc::new(RequestOrchestrator::new(
        store,
        dispatcher,
        events,
        config.orchestration.clone(),
    ));

    let monitor = TaskTimeoutMonitor::new(
        orchestrator.clone(),
        config.timeouts.clone(),
        Duration::from_secs(config.orchestration.sweep_interval_seconds),
    )
    .spawn(shutdown_rx);

    let state = Arc::new(AppState::new(orchestrator, breakers, get_environment()));
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(&config.web.bind_address)
        .await
        .with_context(|| format!("binding {}", config.web.bind_address))?;
    info!(address = %config.web.bind_address, "🌐 HTTP API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP API")?;

    let _ = shutdown_tx.send(true);
    monitor.await.context("joining timeout monitor")?;
    relay.await.context("joining event relay")?;
    info!("👋 Content orchestrator stopped");
    Ok(())
}

async fn build_store(config: &OrchestratorConfig) -> anyhow::Result<Arc<dyn RequestStore>> {
    match &config.database.url {
        #[cfg(feature = "postgres")]
        Some(url) => {
            let store = content_orchestrator::store::PgRequestStore::connect(url, &config.database)
                .await
                .context("connecting to Postgres")?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "postgres"))]
        Some(_) => anyhow::bail!("database.url is set but this build has no postgres support"),
        None => {
            warn!("No database URL configured; using the in-memory request store");
            Ok(Arc::new(InMemoryRequestStore::new()))
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}
