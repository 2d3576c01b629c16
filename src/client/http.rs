//! HTTP implementation of the backend client.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::models::{
    AddSiteResponse, AlertRecord, Credentials, FrequencyUpdate, LoginResponse, MetricSample,
    NewSite, Registration, SiteRecord,
};
use super::{ClientError, MonitorBackend};
use crate::models::{CheckFrequency, SiteId};
use crate::session::Session;

/// Typed client for the monitoring backend.
///
/// Every authenticated request carries the session's bearer token; any 401
/// expires the session before the error is returned.
pub struct MetricsClient {
    client: Client,
    base_url: Url,
    session: Arc<Session>,
}

impl MetricsClient {
    pub fn new(base_url: &str, timeout: Duration, session: Arc<Session>) -> Result<Self, ClientError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| ClientError::Config(format!("invalid base URL {}: {}", base_url, e)))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            session,
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::Config(format!("invalid path {}: {}", path, e)))
    }

    /// Send a request, attaching the bearer token when one is stored.
    ///
    /// Only the 401 status is handled here; callers decide what other
    /// statuses mean.
    async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let request = match self.session.token()? {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ClientError::Network(format!("request timed out: {}", e))
            } else {
                ClientError::Network(e.to_string())
            }
        })?;

        if response.status() == StatusCode::UNAUTHORIZED {
            self.session.expire();
            return Err(ClientError::Unauthorized);
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = check_status(self.send(request).await?).await?;
        response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    // --- Account ---

    pub async fn register(&self, registration: &Registration) -> Result<(), ClientError> {
        let url = self.endpoint("auth/register")?;
        check_status(self.send(self.client.post(url).json(registration)).await?).await?;
        tracing::info!("Registered account {}", registration.email);
        Ok(())
    }

    /// Log in and store the returned token in the session.
    pub async fn login(&self, credentials: &Credentials) -> Result<String, ClientError> {
        let url = self.endpoint("auth/login")?;
        let response: LoginResponse = self.get_json(self.client.post(url).json(credentials)).await?;

        let token = response
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ClientError::Decode("login response carried no access_token".to_string()))?;

        self.session.set_token(&token)?;
        tracing::info!("Logged in as {}", credentials.email);
        Ok(token)
    }

    pub fn logout(&self) -> Result<(), ClientError> {
        self.session.clear_token()?;
        Ok(())
    }

    // --- Alerts ---

    /// Alert records, optionally for one site only.
    pub async fn list_alerts(&self, website_id: Option<SiteId>) -> Result<Vec<AlertRecord>, ClientError> {
        let url = self.endpoint("alerts")?;
        let mut request = self.client.get(url);
        if let Some(id) = website_id {
            request = request.query(&[("website_id", id)]);
        }
        self.get_json(request).await
    }

    pub async fn resolve_alert(&self, alert_id: i64) -> Result<(), ClientError> {
        let url = self.endpoint(&format!("alerts/resolve/{}", alert_id))?;
        check_status(self.send(self.client.put(url)).await?).await?;
        Ok(())
    }
}

#[async_trait]
impl MonitorBackend for MetricsClient {
    async fn list_sites(&self) -> Result<Vec<SiteRecord>, ClientError> {
        let url = self.endpoint("websites")?;
        self.get_json(self.client.get(url)).await
    }

    async fn fetch_recent_metrics(
        &self,
        site_id: SiteId,
        limit: u32,
    ) -> Result<Vec<MetricSample>, ClientError> {
        let url = self.endpoint("metrics")?;
        let request = self.client.get(url).query(&[
            ("website_id", site_id.to_string()),
            ("limit", limit.to_string()),
        ]);
        self.get_json(request).await
    }

    async fn add_site(&self, site: &NewSite) -> Result<SiteRecord, ClientError> {
        let url = self.endpoint("websites/add")?;
        let response: AddSiteResponse = self.get_json(self.client.post(url).json(site)).await?;
        Ok(response.website)
    }

    async fn delete_site(&self, site_id: SiteId) -> Result<(), ClientError> {
        let url = self.endpoint(&format!("websites/delete/{}", site_id))?;
        let response = self.send(self.client.delete(url)).await?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!("Site {} already gone on the backend", site_id);
            return Ok(());
        }

        check_status(response).await?;
        Ok(())
    }

    async fn update_frequency(
        &self,
        site_id: SiteId,
        frequency: CheckFrequency,
    ) -> Result<(), ClientError> {
        let url = self.endpoint(&format!("sites/{}/frequency", site_id))?;
        let body = FrequencyUpdate { frequency };
        check_status(self.send(self.client.patch(url).json(&body)).await?).await?;
        Ok(())
    }

    async fn unresolved_alerts(&self) -> Result<Vec<AlertRecord>, ClientError> {
        let url = self.endpoint("alerts")?;
        self.get_json(self.client.get(url).query(&[("status", "unresolved")])).await
    }
}

/// Map non-success statuses to errors, keeping the backend's message.
async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body);

    if status == StatusCode::BAD_REQUEST {
        Err(ClientError::Validation(message))
    } else {
        Err(ClientError::Http {
            status: status.as_u16(),
            message,
        })
    }
}

/// The backend reports failures as `{"error": "..."}`.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
