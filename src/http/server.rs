//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Assemble the phase pipeline (post-read, access)
//! - Create the Axum router with the content phase as fallback
//! - Wire up middleware (request ID, tracing, timeout, backpressure, metrics)
//! - Swap in reloaded configuration without dropping requests
//! - Serve until shutdown

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{
    http::{header, HeaderValue},
    middleware, Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, Semaphore};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::access;
use crate::config::merge::resolve_servers;
use crate::config::validation::validate_config;
use crate::config::{ConfigError, ServerConfig};
use crate::http::middleware::access_phase::access_phase_middleware;
use crate::http::middleware::backpressure::backpressure_middleware;
use crate::http::middleware::request_metrics::request_metrics_middleware;
use crate::http::pipeline::{Phase, Pipeline};
use crate::http::request::{PathGuard, UuidRequestId};
use crate::http::response::serve_content;
use crate::routing::LocationRouter;

const SERVER_HEADER: &str = "denyfile-server";

/// Compiled, immutable view of the reloadable configuration.
#[derive(Debug)]
pub struct Snapshot {
    pub router: LocationRouter,
    pub offload_probes: bool,
}

impl Snapshot {
    /// Validate and compile. Every configuration source goes through here,
    /// including values built in code and reloads.
    pub fn compile(config: &ServerConfig) -> Result<Self, ConfigError> {
        validate_config(config).map_err(ConfigError::Validation)?;

        Ok(Self {
            router: LocationRouter::new(resolve_servers(config)?),
            offload_probes: config.access.offload_probes,
        })
    }
}

/// Application state injected into middleware.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub snapshot: Arc<ArcSwap<Snapshot>>,
}

/// Static file server with a deny-marker access phase.
pub struct HttpServer {
    router: Router,
    snapshot: Arc<ArcSwap<Snapshot>>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ServerConfig) -> Result<Self, ConfigError> {
        let snapshot = Arc::new(ArcSwap::from_pointee(Snapshot::compile(&config)?));

        let mut pipeline = Pipeline::new();
        pipeline.register(Phase::PostRead, PathGuard);
        access::register(&mut pipeline);

        let state = AppState {
            pipeline: Arc::new(pipeline),
            snapshot: snapshot.clone(),
        };

        let router = Self::build_router(&config, state);
        Ok(Self { router, snapshot })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        let limit = Arc::new(Semaphore::new(config.listener.max_concurrent_requests));

        Router::new()
            .fallback(serve_content)
            .layer(middleware::from_fn_with_state(state.clone(), access_phase_middleware))
            .layer(middleware::from_fn(request_metrics_middleware))
            .layer(SetResponseHeaderLayer::if_not_present(
                header::SERVER,
                HeaderValue::from_static(SERVER_HEADER),
            ))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
            .layer(middleware::from_fn_with_state(limit, backpressure_middleware))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .with_state(state)
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Configurations received on `config_updates` replace the scope table
    /// and probe offloading; listener and timeout changes need a restart.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ServerConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let snapshot = self.snapshot.clone();
        let reloader = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                match Snapshot::compile(&config) {
                    Ok(next) => {
                        snapshot.store(Arc::new(next));
                        tracing::info!("Configuration reloaded");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Rejected configuration update, keeping current");
                    }
                }
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                if shutdown.recv().await.is_err() {
                    tracing::debug!("Shutdown channel closed");
                }
            })
            .await?;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_validates() {
        let mut config = ServerConfig::default();
        assert!(Snapshot::compile(&config).is_ok());

        config.directives.denyfile = Some("../secret".to_string());
        assert!(matches!(
            Snapshot::compile(&config),
            Err(ConfigError::Validation(errors)) if errors.len() == 1
        ));
    }
}
