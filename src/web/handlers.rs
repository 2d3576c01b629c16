//! HTTP request handlers.

use super::AppState;
use crate::client::{ClientError, Credentials, ErrorKind, Registration};
use crate::models::{CheckFrequency, SiteId};
use crate::scheduler::SiteError;
use crate::session::LOGIN_PATH;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

fn client_error_response(err: &ClientError) -> Response {
    let status = match err.kind() {
        ErrorKind::Auth => StatusCode::UNAUTHORIZED,
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Network | ErrorKind::Backend => StatusCode::BAD_GATEWAY,
    };
    error_response(status, err.to_string())
}

// ============================================================================
// Dashboard
// ============================================================================

pub async fn handle_dashboard(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.engine.snapshot())
}

pub async fn handle_notifications(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.notifier.notifications())
}

pub async fn handle_refresh(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.engine.refresh().await)
}

// ============================================================================
// Sites
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AddSiteRequest {
    pub url: String,
    #[serde(default)]
    pub frequency: CheckFrequency,
}

pub async fn handle_add_site(
    State(state): State<AppState>,
    Json(req): Json<AddSiteRequest>,
) -> Response {
    match state.engine.add_site(&req.url, req.frequency).await {
        Ok(site) => (StatusCode::CREATED, Json(site)).into_response(),
        Err(e) => {
            let status = match &e {
                SiteError::Invalid(_) => StatusCode::BAD_REQUEST,
                SiteError::Backend(err) if err.kind() == ErrorKind::Auth => StatusCode::UNAUTHORIZED,
                SiteError::Backend(err) if err.kind() == ErrorKind::Validation => StatusCode::BAD_REQUEST,
                SiteError::Backend(_) => StatusCode::BAD_GATEWAY,
            };
            error_response(status, e.user_message())
        }
    }
}

pub async fn handle_delete_site(State(state): State<AppState>, Path(id): Path<SiteId>) -> Response {
    match state.engine.remove_site(id).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => client_error_response(&e),
    }
}

#[derive(Debug, Deserialize)]
pub struct FrequencyRequest {
    pub frequency: u32,
}

pub async fn handle_update_frequency(
    State(state): State<AppState>,
    Path(id): Path<SiteId>,
    Json(req): Json<FrequencyRequest>,
) -> Response {
    let frequency = match CheckFrequency::try_from(req.frequency) {
        Ok(f) => f,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    match state.engine.update_frequency(id, frequency).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => client_error_response(&e),
    }
}

// ============================================================================
// Alerts
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AlertsQuery {
    pub website_id: Option<SiteId>,
}

pub async fn handle_alerts(
    State(state): State<AppState>,
    Query(query): Query<AlertsQuery>,
) -> Response {
    match state.client.list_alerts(query.website_id).await {
        Ok(alerts) => Json(alerts).into_response(),
        Err(e) => client_error_response(&e),
    }
}

pub async fn handle_resolve_alert(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    if let Err(e) = state.client.resolve_alert(id).await {
        return client_error_response(&e);
    }

    // The count ticker would catch up on its own; refresh now so the badge follows.
    let _ = state.engine.refresh_alert_count().await;
    StatusCode::NO_CONTENT.into_response()
}

// ============================================================================
// Session
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionStatus {
    pub logged_in: bool,
    pub login_path: String,
    pub redirect_after_login: Option<String>,
}

pub async fn handle_session(State(state): State<AppState>) -> Response {
    let session = state.client.session();
    match session.redirect_after_login() {
        Ok(redirect_after_login) => Json(SessionStatus {
            logged_in: session.is_logged_in(),
            login_path: LOGIN_PATH.to_string(),
            redirect_after_login,
        })
        .into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResult {
    pub redirect: Option<String>,
    pub site_count: usize,
}

/// Log in, then reload the site list that a previous expiry may have left stale.
pub async fn handle_login(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Response {
    if let Err(e) = state.client.login(&credentials).await {
        return client_error_response(&e);
    }

    let redirect = match state.client.session().take_redirect_after_login() {
        Ok(redirect) => redirect,
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };

    let site_count = match state.engine.load_sites().await {
        Ok(count) => count,
        Err(e) => {
            tracing::warn!("Site reload after login failed: {}", e);
            state.engine.snapshot().sites.len()
        }
    };

    Json(LoginResult { redirect, site_count }).into_response()
}

pub async fn handle_register(
    State(state): State<AppState>,
    Json(registration): Json<Registration>,
) -> Response {
    match state.client.register(&registration).await {
        Ok(_) => StatusCode::CREATED.into_response(),
        Err(e) => client_error_response(&e),
    }
}

pub async fn handle_logout(State(state): State<AppState>) -> Response {
    match state.client.logout() {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => client_error_response(&e),
    }
}
