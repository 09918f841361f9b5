//! Authentication: remote gateway and session lifecycle

mod session;
mod types;

use async_trait::async_trait;
use log::info;
use std::sync::Arc;

use crate::error::Result;
use crate::fetch::ApiClient;
use crate::navigation::{Navigator, Route};

pub use session::*;
pub use types::*;

/// Remote authentication endpoints
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthResponse>;

    async fn sign_up(&self, username: &str, email: &str, password: &str) -> Result<AuthResponse>;
}

/// [`AuthApi`] over HTTP
#[derive(Clone)]
pub struct AuthGateway {
    client: ApiClient,
}

impl AuthGateway {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AuthApi for AuthGateway {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthResponse> {
        let body = SignInCredentials {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.client
            .post(&["api", "auth", "login"])?
            .json(&body)?
            .execute::<AuthResponse>()
            .await
    }

    async fn sign_up(&self, username: &str, email: &str, password: &str) -> Result<AuthResponse> {
        let body = SignUpCredentials {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        self.client
            .post(&["api", "auth", "signup"])?
            .json(&body)?
            .execute::<AuthResponse>()
            .await
    }
}

/// Owns the identity and credential lifecycle.
///
/// The single source of truth for whether a user is signed in. Cheap to
/// clone; clones share state.
#[derive(Clone)]
pub struct SessionManager {
    api: Arc<dyn AuthApi>,
    session: SessionHandle,
    navigator: Arc<dyn Navigator>,
}

impl SessionManager {
    pub fn new(api: Arc<dyn AuthApi>, session: SessionHandle, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            api,
            session,
            navigator,
        }
    }

    /// Restore the persisted session, if any. The token is not validated
    /// here; the first rejected request ends the session.
    pub fn bootstrap(&self) -> SessionState {
        self.session.bootstrap()
    }

    /// Sign in and persist the issued session. On success the navigator is
    /// sent to the dashboard.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity> {
        info!("Signing in {}", email);
        let response = self.api.sign_in(email, password).await?;
        self.adopt(response)
    }

    /// Register a new account; same contract as [`SessionManager::sign_in`]
    pub async fn sign_up(&self, username: &str, email: &str, password: &str) -> Result<Identity> {
        info!("Signing up {}", email);
        let response = self.api.sign_up(username, email, password).await?;
        self.adopt(response)
    }

    /// Local sign-out; never fails
    pub fn sign_out(&self) {
        self.session.invalidate();
        self.navigator.navigate(Route::Login);
    }

    fn adopt(&self, response: AuthResponse) -> Result<Identity> {
        let credentials = response.credentials();
        let identity = response.user;
        self.session.establish(identity.clone(), credentials)?;
        self.navigator.navigate(Route::Dashboard);
        Ok(identity)
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.session.identity()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.session.is_loading()
    }

    pub fn handle(&self) -> &SessionHandle {
        &self.session
    }
}
