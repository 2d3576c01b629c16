//! Polling engine: periodic status refresh and alert-count refresh.

mod ticker;

pub use ticker::*;

use crate::aggregate::{aggregate, fleet_snapshot};
use crate::client::{ClientError, MonitorBackend, NewSite};
use crate::config::DashboardConfig;
use crate::models::{
    validate_url, CheckFrequency, DashboardSnapshot, MonitoredSite, SiteId, SiteValidationError,
};
use crate::notifier::AlertNotifier;

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

/// Shown when a submitted URL does not parse.
pub const INVALID_URL_MESSAGE: &str =
    "Invalid URL. Please enter a valid URL (e.g., https://example.com).";
/// Shown when the backend refuses or fails to add a site.
pub const ADD_SITE_FAILED_MESSAGE: &str = "Failed to add website. Please try again.";

/// Timing and sizing of the polling loops.
#[derive(Debug, Clone)]
pub struct PollingConfig {
    pub poll_interval: Duration,
    pub alert_interval: Duration,
    pub metrics_limit: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            alert_interval: Duration::from_secs(10),
            metrics_limit: 10,
        }
    }
}

impl From<&DashboardConfig> for PollingConfig {
    fn from(cfg: &DashboardConfig) -> Self {
        Self {
            poll_interval: cfg.poll_interval,
            alert_interval: cfg.alert_interval,
            metrics_limit: cfg.metrics_limit,
        }
    }
}

/// Result of one refresh request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// Another cycle was already in flight.
    Skipped,
    /// No sites are tracked; nothing was fetched.
    Empty,
    Completed { refreshed: usize, degraded: usize },
    /// The engine was shut down while the cycle was in flight.
    Discarded,
}

/// Failure of a site mutation.
#[derive(Error, Debug)]
pub enum SiteError {
    #[error(transparent)]
    Invalid(#[from] SiteValidationError),
    #[error(transparent)]
    Backend(#[from] ClientError),
}

impl SiteError {
    /// Message suitable for an inline form error.
    pub fn user_message(&self) -> &'static str {
        match self {
            SiteError::Invalid(SiteValidationError::InvalidUrl(_)) => INVALID_URL_MESSAGE,
            SiteError::Invalid(_) | SiteError::Backend(_) => ADD_SITE_FAILED_MESSAGE,
        }
    }
}

/// Owns the tracked site list and the fleet statistics.
///
/// Readers get whole snapshots through [`PollingEngine::subscribe`] or
/// [`PollingEngine::snapshot`]; every change replaces the snapshot at once.
pub struct PollingEngine {
    backend: Arc<dyn MonitorBackend>,
    notifier: Arc<AlertNotifier>,
    config: PollingConfig,
    state: watch::Sender<DashboardSnapshot>,
    refreshing: AtomicBool,
    stopped: AtomicBool,
    active_alerts: AtomicUsize,
    tickers: Mutex<Vec<Ticker>>,
}

/// Holds the Refreshing state; dropping it returns the engine to Idle.
struct RefreshGuard<'a>(&'a AtomicBool);

impl<'a> RefreshGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl PollingEngine {
    pub fn new(
        backend: Arc<dyn MonitorBackend>,
        notifier: Arc<AlertNotifier>,
        config: PollingConfig,
    ) -> Self {
        let (state, _) = watch::channel(DashboardSnapshot::default());
        Self {
            backend,
            notifier,
            config,
            state,
            refreshing: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            active_alerts: AtomicUsize::new(0),
            tickers: Mutex::new(Vec::new()),
        }
    }

    /// Receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<DashboardSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        self.state.borrow().clone()
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::Acquire)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    pub fn active_alert_count(&self) -> usize {
        self.active_alerts.load(Ordering::Acquire)
    }

    /// Replace the tracked sites with the backend's listing.
    pub async fn load_sites(&self) -> Result<usize, ClientError> {
        let records = self.backend.list_sites().await?;
        let sites: Vec<MonitoredSite> = records.into_iter().map(MonitoredSite::from_record).collect();
        let count = sites.len();

        if self.is_stopped() {
            return Ok(count);
        }

        self.update_sites(|current| *current = sites);
        tracing::info!("Loaded {} sites", count);
        Ok(count)
    }

    /// Run one refresh cycle unless one is already in flight.
    pub async fn refresh(&self) -> CycleOutcome {
        if self.is_stopped() {
            return CycleOutcome::Discarded;
        }

        let _guard = match RefreshGuard::acquire(&self.refreshing) {
            Some(guard) => guard,
            None => {
                tracing::debug!("Refresh requested while a cycle is in flight, skipping");
                return CycleOutcome::Skipped;
            }
        };

        let sites = self.state.borrow().sites.clone();
        if sites.is_empty() {
            return CycleOutcome::Empty;
        }

        let limit = self.config.metrics_limit;
        let results: Vec<MonitoredSite> = join_all(sites.iter().map(|site| async move {
            let at = Utc::now();
            match self.backend.fetch_recent_metrics(site.id, limit).await {
                Ok(samples) => site.refreshed(&aggregate(&samples), at),
                Err(e) => {
                    tracing::warn!("Metrics fetch failed for {}: {}", site.url, e);
                    site.fallback(at)
                }
            }
        }))
        .await;

        if self.is_stopped() {
            tracing::debug!("Engine stopped during refresh, discarding {} results", results.len());
            return CycleOutcome::Discarded;
        }

        let degraded = results.iter().filter(|s| s.degraded).count();
        let refreshed = results.len() - degraded;

        let mut by_id: HashMap<SiteId, MonitoredSite> =
            results.into_iter().map(|s| (s.id, s)).collect();
        let mut transitions = Vec::new();

        // Sites removed mid-cycle stay removed; sites added mid-cycle are kept as is.
        self.update_sites(|current| {
            *current = current
                .iter()
                .map(|previous| match by_id.remove(&previous.id) {
                    Some(mut updated) => {
                        updated.check_frequency_secs = previous.check_frequency_secs;
                        if let Some(message) = transition_message(previous, &updated) {
                            transitions.push(message);
                        }
                        updated
                    }
                    None => previous.clone(),
                })
                .collect();
        });

        for message in transitions {
            self.notifier.push(message);
        }

        tracing::debug!("Refresh cycle done: {} refreshed, {} degraded", refreshed, degraded);
        CycleOutcome::Completed { refreshed, degraded }
    }

    /// Refresh the unresolved alert count. On failure the previous count stays.
    pub async fn refresh_alert_count(&self) -> Result<usize, ClientError> {
        let alerts = match self.backend.unresolved_alerts().await {
            Ok(alerts) => alerts,
            Err(e) => {
                tracing::warn!("Failed to refresh alert count: {}", e);
                return Err(e);
            }
        };

        let count = alerts.len();
        if self.is_stopped() {
            return Ok(count);
        }

        self.active_alerts.store(count, Ordering::Release);
        self.state.send_modify(|snapshot| snapshot.fleet.active_alert_count = count);
        Ok(count)
    }

    /// Validate and submit a new site, then track it locally.
    pub async fn add_site(
        &self,
        url: &str,
        frequency: CheckFrequency,
    ) -> Result<MonitoredSite, SiteError> {
        let url = url.trim();
        validate_url(url)?;

        let new_site = NewSite {
            url: url.to_string(),
            name: url.to_string(),
            frequency,
        };

        let record = match self.backend.add_site(&new_site).await {
            Ok(record) => record,
            Err(e) => {
                tracing::error!("Failed to add website {}: {}", url, e);
                return Err(e.into());
            }
        };

        let site = MonitoredSite::from_record(record);
        tracing::info!("Added site {} ({})", site.url, site.id);

        self.update_sites(|current| {
            current.retain(|s| s.id != site.id);
            current.push(site.clone());
        });
        Ok(site)
    }

    /// Delete a site on the backend, then stop tracking it.
    pub async fn remove_site(&self, site_id: SiteId) -> Result<(), ClientError> {
        if let Err(e) = self.backend.delete_site(site_id).await {
            tracing::error!("Failed to remove website {}: {}", site_id, e);
            return Err(e);
        }

        self.update_sites(|current| current.retain(|s| s.id != site_id));
        tracing::info!("Removed site {}", site_id);
        Ok(())
    }

    pub async fn update_frequency(
        &self,
        site_id: SiteId,
        frequency: CheckFrequency,
    ) -> Result<(), ClientError> {
        self.backend.update_frequency(site_id, frequency).await?;

        self.update_sites(|current| {
            if let Some(site) = current.iter_mut().find(|s| s.id == site_id) {
                site.check_frequency_secs = frequency.as_secs();
            }
        });
        Ok(())
    }

    /// Start the status and alert-count tickers. Both fire immediately.
    pub fn start(self: &Arc<Self>) {
        let mut tickers = lock(&self.tickers);
        if !tickers.is_empty() || self.is_stopped() {
            return;
        }

        let weak = Arc::downgrade(self);
        tickers.push(Ticker::spawn("status-refresh", self.config.poll_interval, move || {
            let engine = weak.upgrade();
            async move {
                if let Some(engine) = engine {
                    engine.refresh().await;
                }
            }
        }));

        let weak = Arc::downgrade(self);
        tickers.push(Ticker::spawn("alert-count", self.config.alert_interval, move || {
            let engine = weak.upgrade();
            async move {
                if let Some(engine) = engine {
                    let _ = engine.refresh_alert_count().await;
                }
            }
        }));

        tracing::info!(
            "Polling engine started (status every {:?}, alerts every {:?})",
            self.config.poll_interval,
            self.config.alert_interval
        );
    }

    /// Stop scheduling work. In-flight fetches finish but their results are dropped.
    pub fn shutdown(&self) {
        self.stopped.store(true, Ordering::Release);
        for ticker in lock(&self.tickers).drain(..) {
            ticker.stop();
        }
        self.notifier.shutdown();
        tracing::info!("Polling engine stopped");
    }

    /// Apply a change to the site list and republish it with fresh fleet stats.
    fn update_sites(&self, f: impl FnOnce(&mut Vec<MonitoredSite>)) {
        let alerts = self.active_alert_count();
        self.state.send_modify(|snapshot| {
            f(&mut snapshot.sites);
            snapshot.fleet = fleet_snapshot(&snapshot.sites, alerts, Utc::now());
        });
    }
}

/// Notification text for an up/down change, if any.
///
/// Compares against the last successful measurement, so failed fetches in
/// between do not reset it. A site never measured counts as up. Degraded
/// results never notify.
fn transition_message(previous: &MonitoredSite, current: &MonitoredSite) -> Option<String> {
    if current.degraded {
        return None;
    }

    let was_down = previous.last_known_down.unwrap_or(false);

    match (was_down, current.is_down) {
        (false, true) => Some(format!("{} is down", current.url)),
        (true, false) => Some(format!("{} is back up", current.url)),
        _ => None,
    }
}

fn lock(tickers: &Mutex<Vec<Ticker>>) -> MutexGuard<'_, Vec<Ticker>> {
    tickers.lock().unwrap_or_else(|e| e.into_inner())
}
