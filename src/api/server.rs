//! HTTP server setup.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::api::{auth, handlers};
use crate::config::RegistryConfig;
use crate::registry::Registry;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub api_key: String,
}

/// HTTP server for the registry.
pub struct RegistryServer {
    router: Router,
}

impl RegistryServer {
    /// Create a new server over `registry` with the given configuration.
    pub fn new(config: &RegistryConfig, registry: Arc<Registry>) -> Self {
        let state = AppState {
            registry,
            api_key: config.auth.api_key.clone(),
        };
        Self {
            router: Self::build_router(config, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &RegistryConfig, state: AppState) -> Router {
        let graph_routes = Router::new()
            .route("/api/graphs/{graph}/{variant}/push", post(handlers::push))
            .route("/api/graphs/{graph}/{variant}/check", post(handlers::check))
            .route(
                "/api/graphs/{graph}/{variant}/services",
                get(handlers::list_services),
            )
            .route(
                "/api/graphs/{graph}/{variant}/services/{service}",
                delete(handlers::delete_service),
            )
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth::require_bearer,
            ));

        Router::new()
            .merge(graph_routes)
            .route("/status", get(handlers::status))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.listener.request_timeout_secs,
            )))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener until
    /// shutdown fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "registry server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("registry server shutting down");
            })
            .await
    }
}
