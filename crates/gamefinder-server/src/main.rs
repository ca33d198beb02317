use anyhow::Context;
use gamefinder_engine::{ElasticEngine, InMemoryEngine, SearchEngine};
use opentelemetry_otlp::WithExportConfig;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::prelude::*;

mod config;
mod metrics;
mod routes;

use config::{Config, EngineConfig};

fn init_tracing(otlp: Option<&str>) {
    if let Some(endpoint) = otlp {
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(
                opentelemetry_otlp::new_exporter()
                    .tonic()
                    .with_endpoint(endpoint),
            )
            .install_batch(opentelemetry_sdk::runtime::Tokio)
            .ok();
        if let Some(tracer) = tracer {
            let telemetry = tracing_opentelemetry::layer().with_tracer(tracer);
            let subscriber = tracing_subscriber::registry()
                .with(tracing_subscriber::EnvFilter::new("info"))
                .with(tracing_subscriber::fmt::layer())
                .with(telemetry);
            tracing::subscriber::set_global_default(subscriber).ok();
            return;
        }
    }
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_env_filter("info")
        .init();
}

fn build_engine(cfg: &EngineConfig) -> anyhow::Result<Arc<dyn SearchEngine>> {
    match cfg {
        EngineConfig::Elastic {
            endpoint,
            index,
            timeout,
        } => {
            info!(%endpoint, %index, timeout_ms = timeout.as_millis() as u64, "using elasticsearch");
            Ok(Arc::new(ElasticEngine::new(endpoint, index, *timeout)?))
        }
        EngineConfig::Memory { seed: Some(path) } => {
            let engine = InMemoryEngine::from_path(path)
                .with_context(|| format!("loading seed {}", path.display()))?;
            info!(games = engine.len(), seed = %path.display(), "using in-memory engine");
            Ok(Arc::new(engine))
        }
        EngineConfig::Memory { seed: None } => {
            tracing::warn!("in-memory engine without SEED_PATH; catalog is empty");
            Ok(Arc::new(InMemoryEngine::default()))
        }
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Config::from_env()?;
    init_tracing(cfg.otlp_endpoint.as_deref());

    let engine = build_engine(&cfg.engine)?;
    let state = routes::AppState::new(engine, cfg.tag_cache_ttl);
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(cfg.bind)
        .await
        .with_context(|| format!("binding {}", cfg.bind))?;
    info!("http listening on {}", cfg.bind);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    opentelemetry::global::shutdown_tracer_provider();
    Ok(())
}
