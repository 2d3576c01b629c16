//! Session state: the bearer token, the post-login redirect, and what to do
//! when the backend says the session is no longer valid.

mod store;

pub use store::*;

use std::sync::{Arc, Mutex};

/// Key under which the bearer token is stored.
pub const TOKEN_KEY: &str = "token";
/// Key under which the path to return to after login is stored.
pub const REDIRECT_KEY: &str = "redirectAfterLogin";
/// Entry point the user is sent to when the session expires.
pub const LOGIN_PATH: &str = "/login/";

/// Called with the login path when the backend rejects the session.
pub type UnauthorizedHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Explicit session handed to the backend client.
pub struct Session {
    store: SessionStore,
    current_path: Mutex<String>,
    on_unauthorized: Option<UnauthorizedHandler>,
}

impl Session {
    pub fn new(store: SessionStore) -> Self {
        Self {
            store,
            current_path: Mutex::new("/".to_string()),
            on_unauthorized: None,
        }
    }

    /// Install the callback run on session expiry.
    pub fn with_unauthorized_handler(mut self, handler: UnauthorizedHandler) -> Self {
        self.on_unauthorized = Some(handler);
        self
    }

    pub fn token(&self) -> Result<Option<String>, StoreError> {
        Ok(self.store.get(TOKEN_KEY)?.filter(|t| !t.is_empty()))
    }

    pub fn set_token(&self, token: &str) -> Result<(), StoreError> {
        self.store.set(TOKEN_KEY, token)
    }

    pub fn clear_token(&self) -> Result<(), StoreError> {
        self.store.remove(TOKEN_KEY)
    }

    /// A stored token is the only signal of being logged in.
    pub fn is_logged_in(&self) -> bool {
        matches!(self.token(), Ok(Some(_)))
    }

    /// Record the path the user is currently looking at.
    pub fn set_current_path(&self, path: &str) {
        let mut current = self.current_path.lock().unwrap_or_else(|e| e.into_inner());
        *current = path.to_string();
    }

    pub fn current_path(&self) -> String {
        self.current_path
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// The path stored at the last expiry, if any, without consuming it.
    pub fn redirect_after_login(&self) -> Result<Option<String>, StoreError> {
        self.store.get(REDIRECT_KEY)
    }

    /// Consume the stored post-login redirect path.
    pub fn take_redirect_after_login(&self) -> Result<Option<String>, StoreError> {
        let path = self.store.get(REDIRECT_KEY)?;
        if path.is_some() {
            self.store.remove(REDIRECT_KEY)?;
        }
        Ok(path)
    }

    /// Handle a 401: remember where the user was, drop the token and hand
    /// control to the login entry point.
    pub fn expire(&self) {
        let path = self.current_path();
        tracing::warn!("Session expired, redirecting to {} (from {})", LOGIN_PATH, path);

        if let Err(e) = self.store.set(REDIRECT_KEY, &path) {
            tracing::error!("Failed to store redirect path: {}", e);
        }
        if let Err(e) = self.clear_token() {
            tracing::error!("Failed to clear token: {}", e);
        }

        if let Some(handler) = &self.on_unauthorized {
            handler(LOGIN_PATH);
        }
    }
}
