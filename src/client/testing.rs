//! In-process stand-in for the monitoring backend, used by HTTP-level tests.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::models::{AlertRecord, MetricSample, SiteRecord};
use crate::models::SiteId;

pub(crate) const FAKE_TOKEN: &str = "fake-token";
pub(crate) const FAKE_PASSWORD: &str = "hunter2";
/// Metrics requests for this site id fail with a 500.
pub(crate) const BROKEN_SITE_ID: SiteId = 500;

#[derive(Default)]
struct Inner {
    sites: Vec<SiteRecord>,
    samples: HashMap<SiteId, Vec<MetricSample>>,
    alerts: Vec<AlertRecord>,
    last_authorization: Option<String>,
    next_id: SiteId,
}

/// Shared state of the fake backend; clones see the same data.
#[derive(Clone, Default)]
pub(crate) struct FakeBackend {
    inner: Arc<Mutex<Inner>>,
}

impl FakeBackend {
    pub fn add_site(&self, id: SiteId, url: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.sites.push(SiteRecord {
            id,
            url: url.to_string(),
            name: url.to_string(),
            frequency: 60,
            uptime: None,
            response_time: None,
        });
        inner.next_id = inner.next_id.max(id);
    }

    pub fn set_samples(&self, id: SiteId, samples: Vec<MetricSample>) {
        self.inner.lock().unwrap().samples.insert(id, samples);
    }

    pub fn add_alert(&self, id: i64, website_id: SiteId, status: &str) {
        self.inner.lock().unwrap().alerts.push(AlertRecord {
            id,
            website_id,
            alert_type: "downtime".to_string(),
            status: status.to_string(),
            timestamp: None,
        });
    }

    pub fn sites(&self) -> Vec<SiteRecord> {
        self.inner.lock().unwrap().sites.clone()
    }

    pub fn last_authorization(&self) -> Option<String> {
        self.inner.lock().unwrap().last_authorization.clone()
    }

    /// Record the Authorization header and check it.
    fn authorize(&self, headers: &HeaderMap) -> Result<(), Response> {
        let auth = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let ok = auth.as_deref() == Some(format!("Bearer {}", FAKE_TOKEN).as_str());
        self.inner.lock().unwrap().last_authorization = auth;

        if ok {
            Ok(())
        } else {
            Err((StatusCode::UNAUTHORIZED, Json(json!({"error": "Token is invalid!"}))).into_response())
        }
    }
}

/// Serve the fake backend on an ephemeral port and return its base URL.
pub(crate) async fn spawn_fake_backend(backend: FakeBackend) -> String {
    let router = Router::new()
        .route("/auth/register", post(handle_register))
        .route("/auth/login", post(handle_login))
        .route("/websites", get(handle_list_sites))
        .route("/websites/add", post(handle_add_site))
        .route("/websites/delete/{id}", delete(handle_delete_site))
        .route("/metrics", get(handle_metrics))
        .route("/alerts", get(handle_alerts))
        .route("/alerts/resolve/{id}", put(handle_resolve_alert))
        .route("/sites/{id}/frequency", patch(handle_frequency))
        .with_state(backend);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://{}", addr)
}

async fn handle_register(Json(_body): Json<Value>) -> Response {
    (StatusCode::CREATED, Json(json!({"message": "User registered successfully!"}))).into_response()
}

async fn handle_login(Json(body): Json<Value>) -> Response {
    if body["password"] == FAKE_PASSWORD {
        Json(json!({"access_token": FAKE_TOKEN})).into_response()
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({"error": "Invalid credentials"}))).into_response()
    }
}

async fn handle_list_sites(State(backend): State<FakeBackend>, headers: HeaderMap) -> Response {
    if let Err(resp) = backend.authorize(&headers) {
        return resp;
    }
    Json(backend.sites()).into_response()
}

async fn handle_add_site(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(resp) = backend.authorize(&headers) {
        return resp;
    }

    let url = body["url"].as_str().unwrap_or_default().to_string();
    if url.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "Missing required fields"}))).into_response();
    }

    let mut inner = backend.inner.lock().unwrap();
    inner.next_id += 1;
    let record = SiteRecord {
        id: inner.next_id,
        url,
        name: body["name"].as_str().unwrap_or_default().to_string(),
        frequency: body["frequency"].as_u64().unwrap_or(5) as u32,
        uptime: None,
        response_time: None,
    };
    inner.sites.push(record.clone());

    (
        StatusCode::CREATED,
        Json(json!({"message": "Website added successfully!", "website": record})),
    )
        .into_response()
}

async fn handle_delete_site(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Path(id): Path<SiteId>,
) -> Response {
    if let Err(resp) = backend.authorize(&headers) {
        return resp;
    }

    let mut inner = backend.inner.lock().unwrap();
    let before = inner.sites.len();
    inner.sites.retain(|s| s.id != id);
    if inner.sites.len() == before {
        return (StatusCode::NOT_FOUND, Json(json!({"error": "Website not found or unauthorized"}))).into_response();
    }
    Json(json!({"message": "Website deleted successfully!"})).into_response()
}

#[derive(Deserialize)]
struct MetricsQuery {
    website_id: SiteId,
    #[serde(default)]
    limit: Option<usize>,
}

async fn handle_metrics(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Query(query): Query<MetricsQuery>,
) -> Response {
    if let Err(resp) = backend.authorize(&headers) {
        return resp;
    }
    if query.website_id == BROKEN_SITE_ID {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "boom"}))).into_response();
    }

    let inner = backend.inner.lock().unwrap();
    match inner.samples.get(&query.website_id) {
        Some(samples) => {
            let limit = query.limit.unwrap_or(10);
            Json(samples.iter().take(limit).cloned().collect::<Vec<_>>()).into_response()
        }
        None => Json(json!([{
            "id": null,
            "website_id": query.website_id,
            "uptime": 0.0,
            "response_time": 0.0,
            "timestamp": null
        }]))
        .into_response(),
    }
}

#[derive(Deserialize)]
struct AlertsQuery {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    website_id: Option<SiteId>,
}

async fn handle_alerts(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Query(query): Query<AlertsQuery>,
) -> Response {
    if let Err(resp) = backend.authorize(&headers) {
        return resp;
    }

    let inner = backend.inner.lock().unwrap();
    let alerts: Vec<AlertRecord> = inner
        .alerts
        .iter()
        .filter(|a| query.status.as_deref().map_or(true, |s| a.status == s))
        .filter(|a| query.website_id.map_or(true, |id| a.website_id == id))
        .cloned()
        .collect();
    Json(alerts).into_response()
}

async fn handle_resolve_alert(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if let Err(resp) = backend.authorize(&headers) {
        return resp;
    }

    let mut inner = backend.inner.lock().unwrap();
    match inner.alerts.iter_mut().find(|a| a.id == id) {
        Some(alert) => {
            alert.status = "resolved".to_string();
            Json(json!({"message": "Alert resolved successfully!"})).into_response()
        }
        None => (StatusCode::NOT_FOUND, Json(json!({"error": "Alert not found"}))).into_response(),
    }
}

async fn handle_frequency(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Path(id): Path<SiteId>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(resp) = backend.authorize(&headers) {
        return resp;
    }

    let frequency = body["frequency"].as_u64().unwrap_or(0) as u32;
    if ![10, 30, 60, 300, 600, 1800, 3600].contains(&frequency) {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "Invalid frequency."}))).into_response();
    }

    let mut inner = backend.inner.lock().unwrap();
    match inner.sites.iter_mut().find(|s| s.id == id) {
        Some(site) => {
            site.frequency = frequency;
            Json(json!({"message": "Monitoring frequency updated"})).into_response()
        }
        None => (StatusCode::FORBIDDEN, Json(json!({"error": "Unauthorized"}))).into_response(),
    }
}
