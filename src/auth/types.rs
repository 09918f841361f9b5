//! Types for authentication and identity

use serde::{Deserialize, Serialize};
use std::fmt;

/// The signed-in user as reported by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Opaque user id
    #[serde(rename = "_id")]
    pub id: String,

    /// Display name
    pub username: String,

    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,

    /// Avatar reference
    #[serde(
        rename = "profilePicture",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub profile_picture: Option<String>,
}

impl Identity {
    /// Serialize for the session store. Field order is fixed, so encoding a
    /// decoded record reproduces the same bytes.
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn decode(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

/// Access and refresh token, always handled as a pair
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialPair {
    /// Short-lived bearer token
    pub access_token: String,
    /// Long-lived bearer token
    pub refresh_token: String,
}

impl CredentialPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Sign-in request body
#[derive(Debug, Clone, Serialize)]
pub struct SignInCredentials {
    pub email: String,
    pub password: String,
}

/// Sign-up request body
#[derive(Debug, Clone, Serialize)]
pub struct SignUpCredentials {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Authentication response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    /// Informational message from the server
    #[serde(default)]
    pub message: Option<String>,

    /// The user data
    pub user: Identity,

    pub access_token: String,

    pub refresh_token: String,
}

impl AuthResponse {
    pub fn credentials(&self) -> CredentialPair {
        CredentialPair::new(self.access_token.clone(), self.refresh_token.clone())
    }
}
