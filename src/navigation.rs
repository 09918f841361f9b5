//! Screen routing as seen by the client core

use std::sync::{Arc, PoisonError, RwLock};

/// Screens the core can send the user to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Sign-in screen, the entry point for unauthenticated users
    Login,
    /// Main task view
    Dashboard,
}

/// Performs navigation on behalf of the core
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Navigator that only remembers the active route
#[derive(Debug, Clone)]
pub struct RouteState {
    current: Arc<RwLock<Route>>,
}

impl RouteState {
    pub fn new(initial: Route) -> Self {
        Self {
            current: Arc::new(RwLock::new(initial)),
        }
    }

    /// The active route
    pub fn current(&self) -> Route {
        *self.current.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RouteState {
    fn default() -> Self {
        Self::new(Route::Login)
    }
}

impl Navigator for RouteState {
    fn navigate(&self, route: Route) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = route;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_active_route() {
        let routes = RouteState::default();
        let other = routes.clone();
        assert_eq!(routes.current(), Route::Login);

        other.navigate(Route::Dashboard);
        assert_eq!(routes.current(), Route::Dashboard);
    }
}
