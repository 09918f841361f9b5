//! Session state shared by the session manager and the error classifier

use log::{error, info};
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use crate::auth::{CredentialPair, Identity};
use crate::error::Result;
use crate::store::SessionStore;

/// Lifecycle of the client session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Bootstrap has not run yet
    Unbootstrapped,
    /// The persisted session is being read
    Bootstrapping,
    Unauthenticated,
    Authenticated(Identity),
}

/// Shared cell holding the in-memory session next to its persisted copy.
///
/// Every transition updates the store and the state while holding the same
/// write lock, so an identity is present in memory exactly when the store
/// holds one.
#[derive(Clone)]
pub struct SessionHandle {
    store: SessionStore,
    state: Arc<RwLock<SessionState>>,
}

impl SessionHandle {
    pub fn new(store: SessionStore) -> Self {
        Self {
            store,
            state: Arc::new(RwLock::new(SessionState::Unbootstrapped)),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn state(&self) -> SessionState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn identity(&self) -> Option<Identity> {
        match &*self.state.read().unwrap_or_else(PoisonError::into_inner) {
            SessionState::Authenticated(identity) => Some(identity.clone()),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(
            &*self.state.read().unwrap_or_else(PoisonError::into_inner),
            SessionState::Authenticated(_)
        )
    }

    /// `true` until bootstrap has determined whether a session exists
    pub fn is_loading(&self) -> bool {
        matches!(
            &*self.state.read().unwrap_or_else(PoisonError::into_inner),
            SessionState::Unbootstrapped | SessionState::Bootstrapping
        )
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Rehydrate from the store. Only the first call does any work.
    pub(crate) fn bootstrap(&self) -> SessionState {
        let mut state = self.write();
        if *state != SessionState::Unbootstrapped {
            return state.clone();
        }
        *state = SessionState::Bootstrapping;

        let restored = match (self.store.credentials(), self.store.identity()) {
            (Some(_), Some(identity)) => Some(identity),
            _ => None,
        };

        *state = match restored {
            Some(identity) => {
                info!("Restored session for user {}", identity.id);
                SessionState::Authenticated(identity)
            }
            None => {
                if !self.store.is_empty() {
                    info!("Discarding incomplete persisted session");
                    if let Err(e) = self.store.clear() {
                        error!("Failed to clear incomplete session: {}", e);
                    }
                }
                SessionState::Unauthenticated
            }
        };
        state.clone()
    }

    /// Persist and adopt a freshly issued session
    pub(crate) fn establish(&self, identity: Identity, credentials: CredentialPair) -> Result<()> {
        let mut state = self.write();
        if let Err(e) = self.store.save(&identity, &credentials) {
            error!("Failed to persist session: {}", e);
            if let Err(e) = self.store.clear() {
                error!("Failed to clear partially persisted session: {}", e);
            }
            *state = SessionState::Unauthenticated;
            return Err(e);
        }
        info!("Session established for user {}", identity.id);
        *state = SessionState::Authenticated(identity);
        Ok(())
    }

    /// Forget the session, both persisted and in memory
    pub(crate) fn invalidate(&self) {
        let mut state = self.write();
        if let Err(e) = self.store.clear() {
            error!("Failed to clear session store: {}", e);
        }
        if matches!(*state, SessionState::Authenticated(_)) {
            info!("Session ended");
        }
        *state = SessionState::Unauthenticated;
    }
}
