use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use prometheus::{Registry, TextEncoder};
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::channel::StatsChannel;
use crate::collector::MetricsCollector;
use crate::config::Config;
use crate::error::Result;
use crate::metrics::ExporterMetrics;
use crate::poller::Poller;

/// Owns the registry, the stats channel, and the poll loop for the lifetime
/// of the process.
pub struct ExporterServer {
    config: Arc<Config>,
    registry: Registry,
    poller: Poller,
}

impl ExporterServer {
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let registry = Registry::new();
        let channel = Arc::new(StatsChannel::new());

        let metrics = ExporterMetrics::new(&registry)?;
        let collector = MetricsCollector::new(
            Arc::clone(&channel),
            config.host_label(),
            config.pool_label,
        )?;
        registry.register(Box::new(collector))?;

        let poller = Poller::from_config(Arc::clone(&config), Arc::clone(&channel), metrics).await?;

        info!(
            "Exporter starting on {} (host label {:?}, {} aliases)",
            config.listen_addr(),
            config.host_label(),
            config.aliases.len()
        );

        Ok(Self {
            config,
            registry,
            poller,
        })
    }

    pub fn router(&self) -> Router {
        build_router(self.registry.clone())
    }

    /// Serves `/metrics` and runs the poll loop until either stops.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Like [`run`](Self::run), but stops once `shutdown` completes. Scrapes
    /// already in flight are allowed to finish.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.listen_addr()).await?;
        self.serve(listener, shutdown).await
    }

    /// Serves on an already bound listener until `shutdown` completes or
    /// the poll loop stops.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        let app = self.router();

        info!("Serving metrics on http://{}/metrics", addr);

        tokio::select! {
            result = self.poller.run() => result,
            result = async { axum::serve(listener, app).with_graceful_shutdown(shutdown).await } => {
                result?;
                info!("Metrics server stopped");
                Ok(())
            }
        }
    }
}

pub fn build_router(registry: Registry) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .route("/health", get(health))
        .with_state(registry)
}

/// Gathers every registered collector and encodes the result in the
/// Prometheus text exposition format.
pub fn encode_metrics(registry: &Registry) -> Result<String> {
    Ok(TextEncoder::new().encode_to_string(&registry.gather())?)
}

async fn metrics(State(registry): State<Registry>) -> Response {
    match encode_metrics(&registry) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            body,
        )
            .into_response(),
        Err(error) => {
            error!("Failed to encode metrics: {}", error);
            (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()).into_response()
        }
    }
}

async fn health() -> &'static str {
    "OK"
}
