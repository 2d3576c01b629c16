//! Local dashboard API.

mod handlers;

pub use handlers::*;

use crate::client::MetricsClient;
use crate::config::DashboardConfig;
use crate::notifier::AlertNotifier;
use crate::scheduler::PollingEngine;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post, put},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<PollingEngine>,
    pub client: Arc<MetricsClient>,
    pub notifier: Arc<AlertNotifier>,
}

/// HTTP front of the dashboard engine.
pub struct Server {
    config: DashboardConfig,
    state: AppState,
}

impl Server {
    pub fn new(
        config: DashboardConfig,
        engine: Arc<PollingEngine>,
        client: Arc<MetricsClient>,
        notifier: Arc<AlertNotifier>,
    ) -> Self {
        Self {
            config,
            state: AppState {
                engine,
                client,
                notifier,
            },
        }
    }

    /// Build the router with all routes.
    pub fn routes(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/api/dashboard", get(handlers::handle_dashboard))
            .route("/api/notifications", get(handlers::handle_notifications))
            .route("/api/refresh", post(handlers::handle_refresh))
            .route("/api/sites", post(handlers::handle_add_site))
            .route("/api/sites/{id}", delete(handlers::handle_delete_site))
            .route("/api/sites/{id}/frequency", patch(handlers::handle_update_frequency))
            .route("/api/alerts", get(handlers::handle_alerts))
            .route("/api/alerts/{id}/resolve", put(handlers::handle_resolve_alert))
            .route("/api/session", get(handlers::handle_session))
            .route("/api/session/login", post(handlers::handle_login))
            .route("/api/session/register", post(handlers::handle_register))
            .route("/api/session/logout", post(handlers::handle_logout))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .layer(DefaultBodyLimit::max(64 * 1024))
            .with_state(self.state.clone())
    }

    /// Serve on the configured port until `shutdown` resolves.
    pub async fn start<F>(&self, shutdown: F) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Dashboard API listening on {}", addr);

        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    pub async fn serve<F>(
        &self,
        listener: TcpListener,
        shutdown: F,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(listener, self.routes())
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Dashboard API stopped");
        Ok(())
    }
}
