//! Configuration options for the Taskboard client

use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::error::{Error, Result};

/// Backend the client talks to when nothing else is configured
pub const DEFAULT_API_URL: &str = "https://task-management-app-backend-sajn.onrender.com";

/// Configuration options for the Taskboard client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Base URL of the task API, without a trailing slash
    pub base_url: String,

    /// The request timeout. `None` leaves it to the HTTP client defaults.
    pub request_timeout: Option<Duration>,

    /// Value of the `X-Client-Info` header sent with every request
    pub client_info: String,

    /// Where the session is persisted. `None` keeps it in memory only.
    pub session_path: Option<PathBuf>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            request_timeout: None,
            client_info: format!("taskboard-rust/{}", env!("CARGO_PKG_VERSION")),
            session_path: None,
        }
    }
}

impl ClientOptions {
    /// Set the base URL of the API
    pub fn with_base_url(mut self, value: &str) -> Self {
        self.base_url = value.trim_end_matches('/').to_string();
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the client info header
    pub fn with_client_info(mut self, value: &str) -> Self {
        self.client_info = value.to_string();
        self
    }

    /// Persist the session in the given file
    pub fn with_session_path(mut self, value: impl Into<PathBuf>) -> Self {
        self.session_path = Some(value.into());
        self
    }

    /// Check that the options describe a usable client
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.base_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "unsupported URL scheme: {}",
                url.scheme()
            )));
        }
        Ok(())
    }

    /// Read options from `TASKBOARD_API_URL`, `TASKBOARD_SESSION_PATH` and
    /// `TASKBOARD_TIMEOUT_SECS`. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        let mut options = Self::default();

        if let Ok(url) = std::env::var("TASKBOARD_API_URL") {
            options = options.with_base_url(&url);
        }
        if let Ok(path) = std::env::var("TASKBOARD_SESSION_PATH") {
            options = options.with_session_path(path);
        }
        if let Ok(secs) = std::env::var("TASKBOARD_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|_| Error::config("TASKBOARD_TIMEOUT_SECS must be a number of seconds"))?;
            options = options.with_request_timeout(Some(Duration::from_secs(secs)));
        }

        options.validate()?;
        Ok(options)
    }
}
