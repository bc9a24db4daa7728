//! User profiles and bearer-token sessions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::RepositoryResult;
use crate::api::ProfileId;
use crate::models::{AuthSession, Profile, ProfileDraft};

#[async_trait]
pub trait AccessRepository: Send + Sync {
    // ==================== Profiles ====================

    /// # Errors
    /// `RepositoryError::Conflict` if the email is already taken.
    async fn create_profile(&self, draft: &ProfileDraft) -> RepositoryResult<Profile>;
    async fn get_profile(&self, id: ProfileId) -> RepositoryResult<Profile>;

    /// Lookup by (case-insensitive) email; `Ok(None)` when absent.
    async fn find_profile_by_email(&self, email: &str) -> RepositoryResult<Option<Profile>>;
    async fn list_profiles(&self) -> RepositoryResult<Vec<Profile>>;
    async fn update_profile(&self, id: ProfileId, draft: &ProfileDraft)
        -> RepositoryResult<Profile>;

    // ==================== Sessions ====================

    async fn store_session(&self, session: &AuthSession) -> RepositoryResult<()>;

    /// Lookup by token hash; `Ok(None)` when absent.
    async fn find_session(&self, token_hash: &str) -> RepositoryResult<Option<AuthSession>>;

    /// Returns whether a session was removed.
    async fn delete_session(&self, token_hash: &str) -> RepositoryResult<bool>;

    /// Remove sessions that expired before `now`; returns how many.
    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> RepositoryResult<usize>;
}
