//! Error handling for the Taskboard client

use std::fmt;
use thiserror::Error;

/// Closed set of categories every failed remote call is normalized into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 400: the server rejected the payload
    ValidationRejected,
    /// 403
    AccessDenied,
    /// 404
    NotFound,
    /// 401: the credentials are no longer accepted
    SessionExpired,
    /// 5xx
    ServerFailure,
    /// No response was obtained
    TransportFailure,
    /// Any other status, or a response that could not be understood
    UnclassifiedFailure,
}

impl ErrorKind {
    /// Map an HTTP status code to its category
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => ErrorKind::ValidationRejected,
            401 => ErrorKind::SessionExpired,
            403 => ErrorKind::AccessDenied,
            404 => ErrorKind::NotFound,
            500..=599 => ErrorKind::ServerFailure,
            _ => ErrorKind::UnclassifiedFailure,
        }
    }

    /// Notice text used when the server does not provide its own message
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorKind::ValidationRejected => "Invalid request. Please check your input.",
            ErrorKind::AccessDenied => {
                "Access denied. You do not have permission to perform this action."
            }
            ErrorKind::NotFound => "Resource not found.",
            ErrorKind::SessionExpired => "Session expired. Please log in again.",
            ErrorKind::ServerFailure => "Server error. Please try again later.",
            ErrorKind::TransportFailure => "Network error. Please check your internet connection.",
            ErrorKind::UnclassifiedFailure => "An unexpected error occurred. Please try again.",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::ValidationRejected => "validation rejected",
            ErrorKind::AccessDenied => "access denied",
            ErrorKind::NotFound => "not found",
            ErrorKind::SessionExpired => "session expired",
            ErrorKind::ServerFailure => "server failure",
            ErrorKind::TransportFailure => "transport failure",
            ErrorKind::UnclassifiedFailure => "unclassified failure",
        };
        f.write_str(name)
    }
}

/// Unified error type for the Taskboard client
#[derive(Error, Debug)]
pub enum Error {
    /// A remote call failed. The failure has already been classified and
    /// announced through the notice sink.
    #[error("{kind}: {message}")]
    Api {
        kind: ErrorKind,
        status: Option<u16>,
        message: String,
    },

    /// The session store could not be written
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// The HTTP client could not be constructed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Error::Config(msg.to_string())
    }

    /// Category of a remote failure, `None` for local errors
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Api { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// HTTP status of a remote failure, if a response was obtained
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => *status,
            _ => None,
        }
    }

    pub fn is_session_expired(&self) -> bool {
        self.kind() == Some(ErrorKind::SessionExpired)
    }

    /// Text suitable for showing to the user
    pub fn user_message(&self) -> String {
        match self {
            Error::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_covers_table() {
        assert_eq!(ErrorKind::from_status(400), ErrorKind::ValidationRejected);
        assert_eq!(ErrorKind::from_status(401), ErrorKind::SessionExpired);
        assert_eq!(ErrorKind::from_status(403), ErrorKind::AccessDenied);
        assert_eq!(ErrorKind::from_status(404), ErrorKind::NotFound);
        assert_eq!(ErrorKind::from_status(500), ErrorKind::ServerFailure);
        assert_eq!(ErrorKind::from_status(503), ErrorKind::ServerFailure);
        assert_eq!(ErrorKind::from_status(599), ErrorKind::ServerFailure);
        assert_eq!(ErrorKind::from_status(409), ErrorKind::UnclassifiedFailure);
        assert_eq!(ErrorKind::from_status(302), ErrorKind::UnclassifiedFailure);
    }

    #[test]
    fn api_error_exposes_kind_and_status() {
        let err = Error::Api {
            kind: ErrorKind::NotFound,
            status: Some(404),
            message: "Task not found".to_string(),
        };
        assert_eq!(err.kind(), Some(ErrorKind::NotFound));
        assert_eq!(err.status(), Some(404));
        assert!(!err.is_session_expired());
        assert_eq!(err.to_string(), "not found: Task not found");

        let local = Error::config("missing url");
        assert_eq!(local.kind(), None);
        assert_eq!(local.status(), None);
    }
}
