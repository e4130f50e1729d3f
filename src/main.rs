use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use dermaid::agents::{AgentDeps, OfflinePlanner, PhraserPort, PlannerPort, TemplatePhraser};
use dermaid::api::{AppState, routes};
use dermaid::catalog::{CatalogMatcher, CsvCatalog, ProductRepository};
use dermaid::config::{
    AgentConfig, CatalogConfig, DatabaseConfig, ServerConfig, WeatherConfig, llm_config_from_env,
};
use dermaid::llm::{LlmPhraser, LlmPlanner, create_provider};
use dermaid::store::{AgentStore, LibSqlStore};
use dermaid::weather::{OpenMeteoClient, WeatherProvider};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Keep the guard alive so buffered log lines are flushed on exit.
    let _log_guard = init_tracing();

    let server_config = ServerConfig::from_env().context("Invalid server configuration")?;
    let agent_config = AgentConfig::from_env();
    let catalog_config = CatalogConfig::from_env();
    let weather_config = WeatherConfig::from_env();
    let db_config = DatabaseConfig::from_env();

    eprintln!("🧴 DermAid v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: http://{}/api/agents/{{cosmetic,medical}}", server_config.bind);
    eprintln!("   Catalog: {}", catalog_config.path.display());

    // ── Language model ──────────────────────────────────────────────────
    let (planner, phraser): (Arc<dyn PlannerPort>, Arc<dyn PhraserPort>) =
        match llm_config_from_env() {
            Some(llm_config) => {
                let llm = create_provider(&llm_config).context("Failed to create LLM provider")?;
                eprintln!("   Model: {}", llm_config.model);
                (
                    Arc::new(LlmPlanner::new(Arc::clone(&llm))),
                    Arc::new(LlmPhraser::new(llm)),
                )
            }
            None => {
                eprintln!("   Model: none (ANTHROPIC_API_KEY not set, deterministic replies)");
                (Arc::new(OfflinePlanner), Arc::new(TemplatePhraser))
            }
        };

    // ── Catalog ─────────────────────────────────────────────────────────
    let catalog = Arc::new(CsvCatalog::new(catalog_config.path.clone()));
    if let Err(e) = catalog.all().await {
        // The agents still answer without products; the load is retried per turn.
        tracing::warn!(error = %e, "Product catalog unavailable at startup");
    }

    // ── Weather ─────────────────────────────────────────────────────────
    let weather: Arc<dyn WeatherProvider> = Arc::new(
        OpenMeteoClient::new(weather_config.base_url, agent_config.weather_timeout)
            .context("Failed to build weather client")?,
    );

    // ── Database ────────────────────────────────────────────────────────
    let store: Arc<dyn AgentStore> = Arc::new(
        LibSqlStore::new_local(&db_config.path)
            .await
            .with_context(|| format!("Failed to open database at {}", db_config.path.display()))?,
    );
    eprintln!("   Database: {}", db_config.path.display());

    let deps = AgentDeps::new(
        planner,
        phraser,
        weather,
        CatalogMatcher::new(catalog),
        agent_config,
    );
    let app = routes(AppState::new(deps, store));

    let listener = tokio::net::TcpListener::bind(server_config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", server_config.bind))?;
    tracing::info!(addr = %server_config.bind, "DermAid API listening");
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// Install the stderr subscriber, plus a daily rolling file when
/// `DERMAID_LOG_DIR` is set.
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    match std::env::var("DERMAID_LOG_DIR") {
        Ok(dir) if !dir.trim().is_empty() => {
            let appender = tracing_appender::rolling::daily(dir, "dermaid.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .init();
            None
        }
    }
}
