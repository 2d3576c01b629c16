//! Client side of the monitoring backend's REST contract.

mod http;
mod models;
#[cfg(test)]
pub(crate) mod testing;

pub use http::*;
pub use models::*;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{CheckFrequency, SiteId};
use crate::session::StoreError;

/// Backend client error types.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("network error: {0}")]
    Network(String),
    #[error("session is not valid")]
    Unauthorized,
    #[error("rejected by backend: {0}")]
    Validation(String),
    #[error("backend returned {status}: {message}")]
    Http { status: u16, message: String },
    #[error("invalid response: {0}")]
    Decode(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("session storage error: {0}")]
    Session(#[from] StoreError),
}

/// Coarse classification of a [`ClientError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Auth,
    Validation,
    Backend,
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Network(_) => ErrorKind::Network,
            ClientError::Unauthorized => ErrorKind::Auth,
            ClientError::Validation(_) | ClientError::Config(_) => ErrorKind::Validation,
            ClientError::Http { .. } | ClientError::Decode(_) | ClientError::Session(_) => {
                ErrorKind::Backend
            }
        }
    }
}

/// Operations the polling engine needs from the backend.
#[async_trait]
pub trait MonitorBackend: Send + Sync {
    async fn list_sites(&self) -> Result<Vec<SiteRecord>, ClientError>;

    /// Most recent `limit` samples for a site, in no particular order.
    async fn fetch_recent_metrics(
        &self,
        site_id: SiteId,
        limit: u32,
    ) -> Result<Vec<MetricSample>, ClientError>;

    async fn add_site(&self, site: &NewSite) -> Result<SiteRecord, ClientError>;

    /// Deleting a site the backend no longer knows is a success.
    async fn delete_site(&self, site_id: SiteId) -> Result<(), ClientError>;

    async fn update_frequency(
        &self,
        site_id: SiteId,
        frequency: CheckFrequency,
    ) -> Result<(), ClientError>;

    async fn unresolved_alerts(&self) -> Result<Vec<AlertRecord>, ClientError>;
}
