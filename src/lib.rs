//! Taskboard Rust Client Library
//!
//! A client for the Taskboard task management API. It keeps the signed-in
//! session and the user's task list in memory, applies task edits
//! optimistically and rolls them back when the server refuses them. Every
//! failed request produces exactly one user-facing notice.

pub mod auth;
pub mod classifier;
pub mod config;
pub mod error;
pub mod fetch;
pub mod navigation;
pub mod notice;
pub mod store;
pub mod tasks;

use reqwest::Client;
use std::sync::Arc;

use crate::auth::{AuthGateway, SessionHandle, SessionManager};
use crate::classifier::ErrorClassifier;
use crate::config::ClientOptions;
use crate::error::Result;
use crate::fetch::ApiClient;
use crate::navigation::Navigator;
use crate::notice::NoticeSink;
use crate::store::{FileStorage, MemoryStorage, SessionStore, Storage};
use crate::tasks::{TaskGateway, TaskSynchronizer};

/// The main entry point for the Taskboard client
pub struct Taskboard {
    options: ClientOptions,
    session: SessionManager,
    tasks: TaskSynchronizer,
}

impl Taskboard {
    /// Create a client. The session is persisted at `options.session_path`
    /// when set, in memory otherwise.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use std::sync::Arc;
    /// use taskboard::{config::ClientOptions, navigation::RouteState, notice::LogNoticeSink, Taskboard};
    ///
    /// let options = ClientOptions::default().with_base_url("http://localhost:3000");
    /// let client = Taskboard::new(options, Arc::new(LogNoticeSink), Arc::new(RouteState::default())).unwrap();
    /// client.session().bootstrap();
    /// ```
    pub fn new(
        options: ClientOptions,
        sink: Arc<dyn NoticeSink>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        let storage: Arc<dyn Storage> = match &options.session_path {
            Some(path) => Arc::new(FileStorage::open(path)?),
            None => Arc::new(MemoryStorage::default()),
        };
        Self::with_storage(options, storage, sink, navigator)
    }

    /// Create a client over a caller-provided storage backend
    pub fn with_storage(
        options: ClientOptions,
        storage: Arc<dyn Storage>,
        sink: Arc<dyn NoticeSink>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        options.validate()?;

        let mut builder = Client::builder();
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build()?;

        let store = SessionStore::new(storage);
        let session = SessionHandle::new(store.clone());
        let classifier = Arc::new(ErrorClassifier::new(
            sink.clone(),
            session.clone(),
            navigator.clone(),
        ));
        let api = ApiClient::new(
            &options.base_url,
            http_client,
            &options.client_info,
            store,
            classifier,
        )?;

        let session = SessionManager::new(
            Arc::new(AuthGateway::new(api.clone())),
            session,
            navigator,
        );
        let tasks = TaskSynchronizer::new(Arc::new(TaskGateway::new(api)), sink);

        Ok(Self {
            options,
            session,
            tasks,
        })
    }

    /// Session lifecycle: bootstrap, sign-in, sign-up, sign-out
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// The user's task collection
    pub fn tasks(&self) -> &TaskSynchronizer {
        &self.tasks
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::auth::{Identity, SessionState};
    pub use crate::config::ClientOptions;
    pub use crate::error::{Error, ErrorKind};
    pub use crate::navigation::{Navigator, Route, RouteState};
    pub use crate::notice::{ChannelNoticeSink, LogNoticeSink, Notice, NoticeLevel, NoticeSink};
    pub use crate::tasks::{Task, TaskFilter, TaskPatch, TaskStatus};
    pub use crate::Taskboard;
}
