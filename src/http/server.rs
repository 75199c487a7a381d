//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the shared application state from configuration
//! - Create the Axum router with API, callback and admin routes
//! - Wire up middleware (request id, tracing, timeout, body limit, authentication)
//! - Serve until the shutdown signal fires

use axum::{middleware, Router};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin;
use crate::auth::Authenticator;
use crate::cache::CacheStore;
use crate::commands::{CommandBus, CommandDispatcher, PendingOperations};
use crate::config::GatewayConfig;
use crate::http::middleware::authentication_middleware;
use crate::pipeline::Pipeline;
use crate::queries::{FilterRegistry, FilterResolver};
use crate::resilience::retries::RetryPolicy;
use crate::routes;
use crate::storage::{StorageClient, StorageResult};
use crate::validation::{ValidatorRegistry, ValidatorResolver};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Pipeline,
    pub storage: StorageClient,
    pub pending: PendingOperations,
    pub authenticator: Arc<Authenticator>,
    pub config: Arc<GatewayConfig>,
}

impl AppState {
    /// Assemble the state from configuration and the chosen bus.
    pub fn new(
        config: GatewayConfig,
        bus: Arc<dyn CommandBus>,
        pending: PendingOperations,
        cache: Arc<dyn CacheStore>,
        validators: ValidatorRegistry,
        filters: FilterRegistry,
    ) -> StorageResult<Self> {
        let storage = StorageClient::new(&config.storage, cache, config.cache.default_ttl())?;

        let retry_policy = RetryPolicy::new(config.dispatch.retries.clone());
        let dispatcher = CommandDispatcher::new(bus, pending.clone(), retry_policy, config.dispatch.timeout());
        let pipeline = Pipeline::new(
            dispatcher,
            ValidatorResolver::new(validators),
            FilterResolver::new(filters),
            config.dispatch.await_outcome,
        );

        Ok(Self {
            pipeline,
            storage,
            pending,
            authenticator: Arc::new(Authenticator::new(&config.auth)),
            config: Arc::new(config),
        })
    }
}

/// HTTP server for the gateway.
pub struct GatewayServer {
    router: Router,
}

impl GatewayServer {
    pub fn new(state: AppState) -> Self {
        Self {
            router: Self::build_router(state),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn build_router(state: AppState) -> Router {
        let config = state.config.clone();

        let mut app = routes::router();
        if config.admin.enabled {
            app = app.merge(admin::router(state.clone()));
        }

        app.layer(middleware::from_fn_with_state(state.clone(), authentication_middleware))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// The router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
