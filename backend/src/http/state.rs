//! Application state for the HTTP server.

use std::sync::Arc;

use crate::db::repository::FullRepository;
use crate::services::auth::{AuthConfig, Authenticator};
use crate::services::changes::ChangeFeed;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Repository instance for database operations
    pub repository: Arc<dyn FullRepository>,
    /// Token authentication and its caches
    pub auth: Authenticator,
    /// Realtime change notifications
    pub changes: ChangeFeed,
}

impl AppState {
    /// Create a new application state with the given repository and default
    /// auth settings.
    pub fn new(repository: Arc<dyn FullRepository>) -> Self {
        Self::with_auth_config(repository, AuthConfig::default())
    }

    pub fn with_auth_config(repository: Arc<dyn FullRepository>, config: AuthConfig) -> Self {
        Self {
            auth: Authenticator::new(repository.clone(), config),
            changes: ChangeFeed::default(),
            repository,
        }
    }
}
