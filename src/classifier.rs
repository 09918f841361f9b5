//! Classification of failed remote calls
//!
//! Every failed call passes through [`ErrorClassifier::classify`] exactly once.
//! It picks an [`ErrorKind`], announces one error notice, tears the session
//! down on 401 and hands back an [`Error`] for the caller to propagate.

use log::{info, warn};
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::SessionHandle;
use crate::error::{Error, ErrorKind};
use crate::navigation::{Navigator, Route};
use crate::notice::{Notice, NoticeSink};

const CONNECT_FAILURE_MESSAGE: &str = "Unable to connect to the server. Please try again.";

/// A failed call, normalized at the transport boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// No response was obtained
    NoResponse {
        /// The request never reached the server (refused, DNS, TLS)
        connect: bool,
        detail: String,
    },
    /// The server answered with a non-2xx status
    Status {
        status: u16,
        /// Message from the response body, if there was one
        message: Option<String>,
    },
    /// A 2xx response whose body could not be understood
    Malformed { status: u16, detail: String },
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl Failure {
    /// Normalize a transport error
    pub fn from_transport(err: &reqwest::Error) -> Self {
        Failure::NoResponse {
            connect: err.is_connect(),
            detail: err.to_string(),
        }
    }

    /// Normalize a non-2xx response, extracting `{"message": ...}` when the
    /// body carries one
    pub fn from_status(status: u16, body: &[u8]) -> Self {
        let message = serde_json::from_slice::<ErrorBody>(body)
            .ok()
            .and_then(|body| body.message)
            .map(|message| message.trim().to_string())
            .filter(|message| !message.is_empty());
        Failure::Status { status, message }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Failure::NoResponse { .. } => ErrorKind::TransportFailure,
            Failure::Status { status, .. } => ErrorKind::from_status(*status),
            Failure::Malformed { .. } => ErrorKind::UnclassifiedFailure,
        }
    }

    fn status(&self) -> Option<u16> {
        match self {
            Failure::NoResponse { .. } => None,
            Failure::Status { status, .. } | Failure::Malformed { status, .. } => Some(*status),
        }
    }

    /// Text shown to the user
    fn notice_text(&self) -> String {
        let kind = self.kind();
        match self {
            Failure::NoResponse { connect: false, .. } => CONNECT_FAILURE_MESSAGE.to_string(),
            // 401 always reads the same, whatever the server says
            Failure::Status { message: Some(message), .. }
                if kind != ErrorKind::SessionExpired =>
            {
                message.clone()
            }
            _ => kind.default_message().to_string(),
        }
    }
}

/// Maps failures to notices and enforces session teardown on 401
pub struct ErrorClassifier {
    sink: Arc<dyn NoticeSink>,
    session: SessionHandle,
    navigator: Arc<dyn Navigator>,
}

impl ErrorClassifier {
    pub fn new(
        sink: Arc<dyn NoticeSink>,
        session: SessionHandle,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            sink,
            session,
            navigator,
        }
    }

    /// Classify a failure, announce it and return the error to propagate
    pub fn classify(&self, failure: Failure) -> Error {
        let kind = failure.kind();
        let status = failure.status();
        let message = failure.notice_text();

        match &failure {
            Failure::NoResponse { detail, .. } | Failure::Malformed { detail, .. } => {
                warn!("Request failed ({}): {}", kind, detail)
            }
            Failure::Status { status, .. } => warn!("Request failed ({}, status {})", kind, status),
        }

        if kind == ErrorKind::SessionExpired {
            info!("Credentials rejected, tearing down session");
            self.session.invalidate();
            self.navigator.navigate(Route::Login);
        }

        self.sink.notify(Notice::error(message.clone()));

        Error::Api {
            kind,
            status,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{CredentialPair, Identity};
    use crate::navigation::RouteState;
    use crate::notice::{ChannelNoticeSink, NoticeLevel};
    use crate::store::SessionStore;
    use tokio::sync::mpsc::UnboundedReceiver;

    struct Fixture {
        classifier: ErrorClassifier,
        session: SessionHandle,
        routes: RouteState,
        notices: UnboundedReceiver<Notice>,
    }

    fn fixture() -> Fixture {
        let session = SessionHandle::new(SessionStore::in_memory());
        let identity = Identity {
            id: "u-1".to_string(),
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            bio: None,
            profile_picture: None,
        };
        session
            .establish(identity, CredentialPair::new("a", "r"))
            .unwrap();

        let routes = RouteState::new(Route::Dashboard);
        let (sink, notices) = ChannelNoticeSink::new();
        let classifier =
            ErrorClassifier::new(Arc::new(sink), session.clone(), Arc::new(routes.clone()));
        Fixture {
            classifier,
            session,
            routes,
            notices,
        }
    }

    fn drain(rx: &mut UnboundedReceiver<Notice>) -> Vec<Notice> {
        let mut notices = Vec::new();
        while let Ok(notice) = rx.try_recv() {
            notices.push(notice);
        }
        notices
    }

    #[test]
    fn server_message_overrides_default_text() {
        let mut f = fixture();
        let err = f
            .classifier
            .classify(Failure::from_status(404, br#"{"message":"Task not found"}"#));

        assert_eq!(err.kind(), Some(ErrorKind::NotFound));
        assert_eq!(err.status(), Some(404));
        assert_eq!(drain(&mut f.notices), vec![Notice::error("Task not found")]);
    }

    #[test]
    fn default_texts_apply_without_server_message() {
        let cases = [
            (400, ErrorKind::ValidationRejected),
            (403, ErrorKind::AccessDenied),
            (404, ErrorKind::NotFound),
            (500, ErrorKind::ServerFailure),
            (502, ErrorKind::ServerFailure),
            (418, ErrorKind::UnclassifiedFailure),
        ];
        for (status, kind) in cases {
            let mut f = fixture();
            let err = f.classifier.classify(Failure::from_status(status, b"<html>oops</html>"));
            assert_eq!(err.kind(), Some(kind));

            let notices = drain(&mut f.notices);
            assert_eq!(notices.len(), 1);
            assert_eq!(notices[0].level, NoticeLevel::Error);
            assert_eq!(notices[0].message, kind.default_message());
            assert!(f.session.is_authenticated(), "status {} must not end the session", status);
        }
    }

    #[test]
    fn blank_server_message_falls_back_to_default() {
        let mut f = fixture();
        f.classifier
            .classify(Failure::from_status(400, br#"{"message":"   "}"#));
        assert_eq!(
            drain(&mut f.notices),
            vec![Notice::error(ErrorKind::ValidationRejected.default_message())]
        );
    }

    #[test]
    fn unauthorized_tears_down_session() {
        let mut f = fixture();
        let err = f
            .classifier
            .classify(Failure::from_status(401, br#"{"message":"jwt expired"}"#));

        assert!(err.is_session_expired());
        assert!(!f.session.is_authenticated());
        assert!(f.session.identity().is_none());
        assert!(f.session.store().is_empty());
        assert_eq!(f.routes.current(), Route::Login);
        assert_eq!(
            drain(&mut f.notices),
            vec![Notice::error("Session expired. Please log in again.")]
        );
    }

    #[test]
    fn transport_failures_distinguish_connect_errors() {
        let mut f = fixture();
        let err = f.classifier.classify(Failure::NoResponse {
            connect: true,
            detail: "connection refused".to_string(),
        });
        assert_eq!(err.kind(), Some(ErrorKind::TransportFailure));
        assert_eq!(err.status(), None);

        f.classifier.classify(Failure::NoResponse {
            connect: false,
            detail: "operation timed out".to_string(),
        });

        assert_eq!(
            drain(&mut f.notices),
            vec![
                Notice::error("Network error. Please check your internet connection."),
                Notice::error(CONNECT_FAILURE_MESSAGE),
            ]
        );
        assert!(f.session.is_authenticated());
    }

    #[test]
    fn malformed_success_is_unclassified() {
        let mut f = fixture();
        let err = f.classifier.classify(Failure::Malformed {
            status: 201,
            detail: "missing field `task`".to_string(),
        });
        assert_eq!(err.kind(), Some(ErrorKind::UnclassifiedFailure));
        assert_eq!(err.status(), Some(201));
        assert_eq!(drain(&mut f.notices).len(), 1);
    }
}
