//! sitewatch - website uptime dashboard.

use sitewatch::client::{Credentials, MetricsClient};
use sitewatch::config::DashboardConfig;
use sitewatch::notifier::AlertNotifier;
use sitewatch::scheduler::{PollingConfig, PollingEngine};
use sitewatch::session::{Session, SessionStore};
use sitewatch::web::Server;

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("sitewatch=info".parse()?))
        .init();

    let cfg = DashboardConfig::load();
    tracing::info!("Starting sitewatch against {}", cfg.api_base_url);
    tracing::info!("Using session database at {}", cfg.db_path);

    let store = SessionStore::new(&cfg.db_path)?;
    let session = Session::new(store).with_unauthorized_handler(Arc::new(|login_path: &str| {
        tracing::warn!("Login required, open {} to sign in again", login_path);
    }));
    session.set_current_path("/dashboard");
    let session = Arc::new(session);

    let client = Arc::new(MetricsClient::new(
        &cfg.api_base_url,
        cfg.request_timeout,
        session.clone(),
    )?);

    if !session.is_logged_in() {
        match (&cfg.email, &cfg.password) {
            (Some(email), Some(password)) => {
                let credentials = Credentials {
                    email: email.clone(),
                    password: password.clone(),
                };
                if let Err(e) = client.login(&credentials).await {
                    tracing::error!("Startup login failed: {}", e);
                }
            }
            _ => tracing::warn!("No stored session and no credentials configured"),
        }
    }

    let notifier = Arc::new(AlertNotifier::new());
    let engine = Arc::new(PollingEngine::new(
        client.clone(),
        notifier.clone(),
        PollingConfig::from(&cfg),
    ));

    if let Err(e) = engine.load_sites().await {
        tracing::warn!("Initial site load failed: {}", e);
    }
    engine.start();

    let server = Server::new(cfg, engine.clone(), client, notifier);
    server
        .start(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutdown requested");
        })
        .await?;

    engine.shutdown();
    Ok(())
}
