//! # HTTP Server
//!
//! Combines the route modules into one router over shared state and runs
//! the serving loop. Startup attempts to establish the pool but tolerates
//! failure: the process keeps serving so health and diagnostics stay
//! reachable while requests connect lazily.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::AppConfig;
use crate::errors::BridgeError;
use crate::observability::Logger;
use crate::pool::{PoolManager, DEFAULT_CONNECT_ATTEMPTS};

use super::api_routes::api_routes;
use super::errors::ApiError;
use super::health_routes::{health_routes, root_routes};

/// State shared across all handlers
pub struct AppState {
    pub manager: PoolManager,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            manager: PoolManager::new(config.db.clone()),
            config,
        }
    }

    /// Log a failed request and wrap its error for the response
    pub fn api_error(&self, operation: &str, error: BridgeError) -> ApiError {
        Logger::error(
            "request.failed",
            &[
                ("operation", operation.to_string()),
                ("error_code", error.error_code()),
                ("error", error.to_string()),
            ],
        );
        ApiError::new(error, !self.config.is_production())
    }
}

/// HTTP server over the bridge components
pub struct HttpServer {
    state: Arc<AppState>,
    router: Router,
}

impl HttpServer {
    /// Create the server and its combined router
    pub fn new(state: Arc<AppState>) -> Self {
        let router = Self::build_router(state.clone());
        Self { state, router }
    }

    /// Build the combined router with all endpoints
    fn build_router(state: Arc<AppState>) -> Router {
        let origins = &state.config.http.cors_origins;
        let cors = if origins.is_empty() {
            // No origins configured: permissive for development
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let parsed: Vec<_> = origins.iter().filter_map(|s| s.parse().ok()).collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(parsed))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        Router::new()
            .merge(root_routes())
            .nest(
                "/api",
                api_routes(state.clone()).merge(health_routes(state)),
            )
            .layer(cors)
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Start the HTTP server (async)
    pub async fn start(self) -> Result<(), std::io::Error> {
        // Establish the pool up front; a failure leaves the service up with
        // /api/health reporting disconnected
        match self.state.manager.ensure_pool(DEFAULT_CONNECT_ATTEMPTS).await {
            Ok(_) => Logger::info("server.pool_ready", &[]),
            Err(e) => Logger::error("server.pool_unavailable", &[("error", e.to_string())]),
        }

        let addr: SocketAddr = self
            .state
            .config
            .http
            .socket_addr()
            .parse()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("{}", e)))?;

        Logger::info(
            "server.listening",
            &[
                ("addr", addr.to_string()),
                ("environment", self.state.config.environment.clone()),
            ],
        );

        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, self.router).await?;

        Ok(())
    }
}
