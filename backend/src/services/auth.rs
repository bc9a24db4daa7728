//! Bearer-token authentication.
//!
//! Tokens are random strings handed out once by [`Authenticator::issue_session`];
//! only their SHA-256 is stored. Authenticating a token resolves the session,
//! loads the profile with bounded retries and turns it into an [`AuthContext`].
//! When the profile store cannot answer, the session's role hint keeps the
//! user working with that role's static permissions.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::api::{
    AuthSession, EmployeeId, Permission, Profile, ProfileDraft, ProfileId, Role, ValidationError,
};
use crate::db::repository::{AccessRepository, FullRepository, RepositoryError};
use crate::db::services;
use crate::define_text_enum;
use crate::services::permissions::{profile_permissions, role_permissions, PermissionSource};

/// Longest lifetime a session may be issued with: one year.
pub const MAX_SESSION_TTL_HOURS: u32 = 24 * 366;

/// SHA-256 of a bearer token, hex encoded.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// A fresh random bearer token.
pub fn generate_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("invalid or unknown session")]
    InvalidToken,
    #[error("session expired")]
    Expired,
    #[error("profile {0} is inactive")]
    Inactive(ProfileId),
    #[error("missing permission '{0}'")]
    Forbidden(Permission),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthContext {
    pub profile_id: ProfileId,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub role: Role,
    pub employee_id: Option<EmployeeId>,
    pub permissions: BTreeSet<Permission>,
    pub source: PermissionSource,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuthContext {
    fn from_profile(profile: &Profile, session: &AuthSession) -> Self {
        let (permissions, source) = profile_permissions(profile);
        Self {
            profile_id: profile.id,
            email: Some(profile.email.clone()),
            display_name: Some(profile.display_name.clone()),
            role: profile.role,
            employee_id: profile.employee_id,
            permissions,
            source,
            expires_at: session.expires_at,
        }
    }

    fn from_role_hint(session: &AuthSession) -> Self {
        Self {
            profile_id: session.profile_id,
            email: None,
            display_name: None,
            role: session.role_hint,
            employee_id: None,
            permissions: role_permissions(session.role_hint),
            source: PermissionSource::RoleFallback,
            expires_at: session.expires_at,
        }
    }

    pub fn has(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    pub fn require(&self, permission: Permission) -> Result<(), AuthError> {
        if self.has(permission) {
            Ok(())
        } else {
            Err(AuthError::Forbidden(permission))
        }
    }

    /// Personnel records are visible with `view_employees`, or for one's own
    /// linked employee with `view_own_records`.
    pub fn require_employee_access(&self, employee_id: EmployeeId) -> Result<(), AuthError> {
        if self.has(Permission::ViewEmployees)
            || (self.has(Permission::ViewOwnRecords) && self.employee_id == Some(employee_id))
        {
            Ok(())
        } else {
            Err(AuthError::Forbidden(Permission::ViewEmployees))
        }
    }
}

// ==================== Profile loading ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderConfig {
    pub attempts: u32,
    pub attempt_timeout: Duration,
    pub retry_delay: Duration,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            attempt_timeout: Duration::from_secs(3),
            retry_delay: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProfileLoad {
    Loaded(Profile),
    Missing,
    Unavailable(String),
}

/// Fetches a profile, racing each attempt against a timeout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfileLoader {
    config: LoaderConfig,
}

impl ProfileLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    pub async fn load<R: AccessRepository + ?Sized>(&self, repo: &R, id: ProfileId) -> ProfileLoad {
        let attempts = self.config.attempts.max(1);
        let mut last_error = String::new();
        for attempt in 1..=attempts {
            match tokio::time::timeout(self.config.attempt_timeout, repo.get_profile(id)).await {
                Ok(Ok(profile)) => return ProfileLoad::Loaded(profile),
                Ok(Err(RepositoryError::NotFound { .. })) => return ProfileLoad::Missing,
                Ok(Err(err)) if !err.is_retryable() => return ProfileLoad::Unavailable(err.to_string()),
                Ok(Err(err)) => last_error = err.to_string(),
                Err(_) => {
                    last_error = format!("timed out after {:?}", self.config.attempt_timeout)
                }
            }
            debug!(
                "Profile {} load attempt {}/{} failed: {}",
                id, attempt, attempts, last_error
            );
            if attempt < attempts {
                tokio::time::sleep(self.config.retry_delay).await;
            }
        }
        ProfileLoad::Unavailable(last_error)
    }
}

// ==================== Auth events ====================

define_text_enum!(
    AuthEventKind {
        SignedIn => "signed_in",
        SignedOut => "signed_out",
        SessionRestored => "session_restored",
    }
);

/// Drops an auth event identical in kind and profile to one seen within the
/// window.
#[derive(Debug)]
pub struct AuthEventDebouncer {
    window: Duration,
    seen: Mutex<HashMap<(AuthEventKind, ProfileId), Instant>>,
}

impl Default for AuthEventDebouncer {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl AuthEventDebouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            seen: Mutex::new(HashMap::new()),
        }
    }

    pub fn should_handle(&self, kind: AuthEventKind, profile: ProfileId) -> bool {
        self.should_handle_at(kind, profile, Instant::now())
    }

    pub fn should_handle_at(&self, kind: AuthEventKind, profile: ProfileId, now: Instant) -> bool {
        let mut seen = self.seen.lock();
        seen.retain(|_, at| now.saturating_duration_since(*at) < self.window);
        match seen.get(&(kind, profile)) {
            Some(_) => false,
            None => {
                seen.insert((kind, profile), now);
                true
            }
        }
    }
}

// ==================== Authenticator ====================

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Lifetime of issued sessions; `None` never expires.
    pub session_ttl: Option<chrono::Duration>,
    pub cache_ttl: Duration,
    pub loader: LoaderConfig,
    pub debounce_window: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl: Some(chrono::Duration::hours(12)),
            cache_ttl: Duration::from_secs(30),
            loader: LoaderConfig::default(),
            debounce_window: Duration::from_secs(1),
        }
    }
}

/// A newly issued session. The token is shown once.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedSession {
    pub token: String,
    pub profile_id: ProfileId,
    pub expires_at: Option<DateTime<Utc>>,
}

struct CachedContext {
    context: AuthContext,
    cached_at: Instant,
}

/// Resolves bearer tokens into [`AuthContext`]s.
///
/// A cache miss restores the session from the store. Restores of the same
/// profile within the debounce window share one profile load: the first one
/// reads the profile, concurrent ones wait for that read and later ones reuse
/// its result.
#[derive(Clone)]
pub struct Authenticator {
    repo: Arc<dyn FullRepository>,
    loader: ProfileLoader,
    config: AuthConfig,
    cache: Arc<RwLock<HashMap<String, CachedContext>>>,
    events: Arc<AuthEventDebouncer>,
    restored: Arc<Mutex<HashMap<ProfileId, SharedLoad>>>,
}

/// One profile load shared by the restores of a debounce window.
#[derive(Clone)]
struct SharedLoad {
    load: Arc<OnceCell<ProfileLoad>>,
    started: Instant,
}

impl Authenticator {
    pub fn new(repo: Arc<dyn FullRepository>, config: AuthConfig) -> Self {
        Self {
            repo,
            loader: ProfileLoader::new(config.loader),
            events: Arc::new(AuthEventDebouncer::new(config.debounce_window)),
            cache: Arc::new(RwLock::new(HashMap::new())),
            restored: Arc::new(Mutex::new(HashMap::new())),
            config,
        }
    }

    fn note_event(&self, kind: AuthEventKind, profile: ProfileId) {
        if self.events.should_handle(kind, profile) {
            info!("Auth event {} for profile {}", kind, profile);
        }
    }

    /// The load a restore of `profile_id` should wait on. The debouncer
    /// decides whether this restore starts a new one.
    fn shared_load(&self, profile_id: ProfileId) -> SharedLoad {
        let window = self.config.debounce_window;
        let mut restored = self.restored.lock();
        restored.retain(|_, shared| shared.started.elapsed() < window);
        if self.events.should_handle(AuthEventKind::SessionRestored, profile_id) {
            info!("Auth event {} for profile {}", AuthEventKind::SessionRestored, profile_id);
        } else if let Some(shared) = restored.get(&profile_id) {
            debug!("Profile {} is being restored already; sharing the load", profile_id);
            return shared.clone();
        }
        let shared = SharedLoad {
            load: Arc::new(OnceCell::new()),
            started: Instant::now(),
        };
        restored.insert(profile_id, shared.clone());
        shared
    }

    /// Resolve a bearer token into the caller's context.
    pub async fn authenticate(&self, token: &str) -> Result<AuthContext, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        let hash = hash_token(token);
        if let Some(context) = self.cached(&hash) {
            return Ok(context);
        }

        let session = self
            .repo
            .find_session(&hash)
            .await?
            .ok_or(AuthError::InvalidToken)?;
        if session.is_expired(Utc::now()) {
            self.cache.write().remove(&hash);
            if let Err(err) = self.repo.delete_session(&hash).await {
                warn!("Failed to drop expired session: {}", err);
            }
            return Err(AuthError::Expired);
        }

        let (context, cacheable) = self.restore(&session).await?;
        if cacheable {
            self.cache.write().insert(
                hash,
                CachedContext {
                    context: context.clone(),
                    cached_at: Instant::now(),
                },
            );
        }
        Ok(context)
    }

    /// Restore a live session that missed the cache.
    async fn restore(&self, session: &AuthSession) -> Result<(AuthContext, bool), AuthError> {
        let profile_id = session.profile_id;
        let shared = self.shared_load(profile_id);
        let load = shared
            .load
            .get_or_init(|| self.loader.load(self.repo.as_ref(), profile_id))
            .await
            .clone();
        if !matches!(load, ProfileLoad::Loaded(_)) {
            // Failed loads are not shared; the next restore tries again.
            let mut restored = self.restored.lock();
            if restored
                .get(&profile_id)
                .is_some_and(|current| Arc::ptr_eq(&current.load, &shared.load))
            {
                restored.remove(&profile_id);
            }
        }
        Self::context_from(load, session)
    }

    /// Context for a live session. Role-hint fallbacks are not cacheable so
    /// the next request retries the real profile.
    fn context_from(
        load: ProfileLoad,
        session: &AuthSession,
    ) -> Result<(AuthContext, bool), AuthError> {
        match load {
            ProfileLoad::Loaded(profile) if !profile.active => Err(AuthError::Inactive(profile.id)),
            ProfileLoad::Loaded(profile) => Ok((AuthContext::from_profile(&profile, session), true)),
            ProfileLoad::Missing => Err(AuthError::InvalidToken),
            ProfileLoad::Unavailable(reason) => {
                warn!(
                    "Profile {} unavailable ({}); using {} role permissions",
                    session.profile_id, reason, session.role_hint
                );
                Ok((AuthContext::from_role_hint(session), false))
            }
        }
    }

    /// Issue a session for an active profile.
    pub async fn issue_session(
        &self,
        profile_id: ProfileId,
        ttl: Option<chrono::Duration>,
    ) -> Result<IssuedSession, AuthError> {
        let profile = self.repo.get_profile(profile_id).await?;
        if !profile.active {
            return Err(AuthError::Inactive(profile_id));
        }
        let now = Utc::now();
        let expires_at = match ttl.or(self.config.session_ttl) {
            Some(ttl) => Some(now.checked_add_signed(ttl).ok_or_else(|| {
                ValidationError::new("ttl_hours", "session lifetime is out of range")
            })?),
            None => None,
        };
        let token = generate_token();
        self.repo
            .store_session(&AuthSession {
                token_hash: hash_token(&token),
                profile_id,
                role_hint: profile.role,
                created_at: now,
                expires_at,
            })
            .await?;
        self.note_event(AuthEventKind::SignedIn, profile_id);
        Ok(IssuedSession {
            token,
            profile_id,
            expires_at,
        })
    }

    /// Revoke the session behind `token`. Returns whether one existed.
    pub async fn sign_out(&self, token: &str) -> Result<bool, AuthError> {
        let hash = hash_token(token.trim());
        let evicted = self.cache.write().remove(&hash);
        let deleted = self.repo.delete_session(&hash).await?;
        if let Some(entry) = evicted {
            self.note_event(AuthEventKind::SignedOut, entry.context.profile_id);
        }
        Ok(deleted)
    }

    /// Drop cached contexts of a profile after it changed.
    pub fn invalidate_profile(&self, profile_id: ProfileId) {
        self.cache
            .write()
            .retain(|_, entry| entry.context.profile_id != profile_id);
        self.restored.lock().remove(&profile_id);
    }

    pub async fn purge_expired(&self) -> Result<usize, AuthError> {
        let purged = self.repo.purge_expired_sessions(Utc::now()).await?;
        if purged > 0 {
            info!("Purged {} expired sessions", purged);
        }
        Ok(purged)
    }

    /// Make sure an admin profile with `email` exists and `token` is a valid
    /// non-expiring session for it.
    pub async fn ensure_bootstrap_admin(&self, email: &str, token: &str) -> Result<Profile, AuthError> {
        let profile = match self.repo.find_profile_by_email(email).await? {
            Some(profile) => profile,
            None => {
                let draft = ProfileDraft::new(email, "Administrator", Role::Admin);
                let profile = services::create_profile(self.repo.as_ref(), &draft).await?;
                info!("Created bootstrap admin profile {} ({})", profile.id, profile.email);
                profile
            }
        };
        if profile.role != Role::Admin || !profile.active {
            warn!(
                "Bootstrap profile {} is {} (active={}); token grants those rights only",
                profile.email, profile.role, profile.active
            );
        }

        let hash = hash_token(token.trim());
        if self.repo.find_session(&hash).await?.is_none() {
            self.repo
                .store_session(&AuthSession {
                    token_hash: hash,
                    profile_id: profile.id,
                    role_hint: profile.role,
                    created_at: Utc::now(),
                    expires_at: None,
                })
                .await?;
        }
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::LocalRepository;

    fn fast_config() -> AuthConfig {
        AuthConfig {
            loader: LoaderConfig {
                attempts: 2,
                attempt_timeout: Duration::from_millis(200),
                retry_delay: Duration::from_millis(1),
            },
            ..AuthConfig::default()
        }
    }

    async fn setup(role: Role) -> (Arc<LocalRepository>, Authenticator, Profile) {
        let repo = Arc::new(LocalRepository::new());
        let profile = repo
            .create_profile(&ProfileDraft::new("user@example.nl", "User", role))
            .await
            .unwrap();
        let auth = Authenticator::new(repo.clone(), fast_config());
        (repo, auth, profile)
    }

    #[test]
    fn test_hash_token_is_hex_sha256() {
        let hash = hash_token("secret");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_token("secret"));
        assert_ne!(hash, hash_token("Secret"));
    }

    #[tokio::test]
    async fn test_issue_and_authenticate() {
        let (repo, auth, profile) = setup(Role::Planner).await;
        let issued = auth.issue_session(profile.id, None).await.unwrap();
        assert!(issued.expires_at.is_some());

        let stored = repo.find_session(&hash_token(&issued.token)).await.unwrap();
        assert!(stored.is_some(), "only the hash is stored");

        let context = auth.authenticate(&issued.token).await.unwrap();
        assert_eq!(context.profile_id, profile.id);
        assert_eq!(context.source, PermissionSource::Role);
        assert!(context.require(Permission::ManagePlans).is_ok());
        assert!(matches!(
            context.require(Permission::ManageUsers),
            Err(AuthError::Forbidden(Permission::ManageUsers))
        ));
    }

    #[tokio::test]
    async fn test_unknown_and_empty_tokens() {
        let (_repo, auth, _profile) = setup(Role::Admin).await;
        assert!(matches!(auth.authenticate("  ").await, Err(AuthError::MissingToken)));
        assert!(matches!(auth.authenticate("nope").await, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_expired_session_rejected_and_removed() {
        let (repo, auth, profile) = setup(Role::Admin).await;
        let issued = auth
            .issue_session(profile.id, Some(chrono::Duration::seconds(-1)))
            .await
            .unwrap();
        assert!(matches!(auth.authenticate(&issued.token).await, Err(AuthError::Expired)));
        assert_eq!(repo.session_count(), 0);
    }

    #[tokio::test]
    async fn test_out_of_range_ttl_is_rejected() {
        let (repo, auth, profile) = setup(Role::Admin).await;
        let err = auth
            .issue_session(profile.id, Some(chrono::Duration::hours(i64::from(u32::MAX))))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Invalid(ref e) if e.field == "ttl_hours"));
        assert_eq!(repo.session_count(), 0);

        let longest = chrono::Duration::hours(i64::from(MAX_SESSION_TTL_HOURS));
        assert!(auth.issue_session(profile.id, Some(longest)).await.is_ok());
    }

    #[tokio::test]
    async fn test_role_hint_fallback_when_store_is_down() {
        let (repo, auth, profile) = setup(Role::Instructor).await;
        let issued = auth.issue_session(profile.id, None).await.unwrap();
        let session = repo
            .find_session(&hash_token(&issued.token))
            .await
            .unwrap()
            .unwrap();

        repo.set_healthy(false);
        let (context, cacheable) = auth.restore(&session).await.unwrap();
        assert!(!cacheable);
        assert_eq!(context.source, PermissionSource::RoleFallback);
        assert_eq!(context.role, Role::Instructor);
        assert!(context.email.is_none());
        assert!(context.has(Permission::ManageParticipants));

        repo.set_healthy(true);
        let context = auth.authenticate(&issued.token).await.unwrap();
        assert_eq!(context.source, PermissionSource::Role);
    }

    #[tokio::test]
    async fn test_restores_within_window_share_one_profile_load() {
        let (repo, auth, profile) = setup(Role::Planner).await;
        let desktop = auth.issue_session(profile.id, None).await.unwrap();
        let phone = auth.issue_session(profile.id, None).await.unwrap();
        let before = repo.profile_reads();

        let first = auth.authenticate(&desktop.token).await.unwrap();
        assert_eq!(repo.profile_reads(), before + 1);
        let second = auth.authenticate(&phone.token).await.unwrap();
        assert_eq!(repo.profile_reads(), before + 1, "second restore reuses the profile");
        assert_eq!(second.profile_id, first.profile_id);
        assert_eq!(second.permissions, first.permissions);
        assert_eq!(second.source, PermissionSource::Role);

        // An edit ends the sharing.
        auth.invalidate_profile(profile.id);
        auth.authenticate(&desktop.token).await.unwrap();
        assert_eq!(repo.profile_reads(), before + 2);
    }

    #[tokio::test]
    async fn test_concurrent_restores_wait_for_one_profile_load() {
        let (repo, auth, profile) = setup(Role::Manager).await;
        let a = auth.issue_session(profile.id, None).await.unwrap();
        let b = auth.issue_session(profile.id, None).await.unwrap();
        repo.set_profile_delay(Some(Duration::from_millis(50)));
        let before = repo.profile_reads();

        let (first, second) = tokio::join!(auth.authenticate(&a.token), auth.authenticate(&b.token));
        assert_eq!(first.unwrap().source, PermissionSource::Role);
        assert_eq!(second.unwrap().source, PermissionSource::Role);
        assert_eq!(repo.profile_reads(), before + 1);
    }

    #[tokio::test]
    async fn test_restores_outside_window_load_again() {
        let repo = Arc::new(LocalRepository::new());
        let profile = repo
            .create_profile(&ProfileDraft::new("user@example.nl", "User", Role::Planner))
            .await
            .unwrap();
        let config = AuthConfig {
            debounce_window: Duration::from_millis(20),
            ..fast_config()
        };
        let auth = Authenticator::new(repo.clone(), config);
        let a = auth.issue_session(profile.id, None).await.unwrap();
        let b = auth.issue_session(profile.id, None).await.unwrap();
        let before = repo.profile_reads();

        auth.authenticate(&a.token).await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        auth.authenticate(&b.token).await.unwrap();
        assert_eq!(repo.profile_reads(), before + 2);
    }

    #[tokio::test]
    async fn test_slow_profile_store_times_out_to_role_fallback() {
        let (repo, auth, profile) = setup(Role::Instructor).await;
        let issued = auth.issue_session(profile.id, None).await.unwrap();
        repo.set_profile_delay(Some(Duration::from_millis(500)));

        let load = ProfileLoader::new(fast_config().loader)
            .load(repo.as_ref(), profile.id)
            .await;
        match load {
            ProfileLoad::Unavailable(reason) => assert!(reason.contains("timed out"), "{}", reason),
            other => panic!("expected a timeout, got {:?}", other),
        }

        let context = auth.authenticate(&issued.token).await.unwrap();
        assert_eq!(context.source, PermissionSource::RoleFallback);
        assert_eq!(context.role, Role::Instructor);
        assert!(context.email.is_none());

        repo.set_profile_delay(None);
        auth.invalidate_profile(profile.id);
        let context = auth.authenticate(&issued.token).await.unwrap();
        assert_eq!(context.source, PermissionSource::Role);
    }

    #[tokio::test]
    async fn test_loader_reports_missing_profile() {
        let repo = LocalRepository::new();
        let load = ProfileLoader::default().load(&repo, ProfileId(42)).await;
        assert_eq!(load, ProfileLoad::Missing);
    }

    #[tokio::test]
    async fn test_inactive_profile_rejected() {
        let (repo, auth, profile) = setup(Role::Manager).await;
        let issued = auth.issue_session(profile.id, None).await.unwrap();
        let mut draft = ProfileDraft::new("user@example.nl", "User", Role::Manager);
        draft.active = false;
        repo.update_profile(profile.id, &draft).await.unwrap();
        auth.invalidate_profile(profile.id);

        assert!(matches!(
            auth.authenticate(&issued.token).await,
            Err(AuthError::Inactive(_))
        ));
    }

    #[tokio::test]
    async fn test_sign_out_revokes_cached_session() {
        let (_repo, auth, profile) = setup(Role::Employee).await;
        let issued = auth.issue_session(profile.id, None).await.unwrap();
        auth.authenticate(&issued.token).await.unwrap();

        assert!(auth.sign_out(&issued.token).await.unwrap());
        assert!(matches!(
            auth.authenticate(&issued.token).await,
            Err(AuthError::InvalidToken)
        ));
        assert!(!auth.sign_out(&issued.token).await.unwrap());
    }

    #[tokio::test]
    async fn test_bootstrap_admin_is_idempotent() {
        let repo = Arc::new(LocalRepository::new());
        let auth = Authenticator::new(repo.clone(), fast_config());

        let first = auth
            .ensure_bootstrap_admin("Admin@Example.nl", "bootstrap-token")
            .await
            .unwrap();
        let second = auth
            .ensure_bootstrap_admin("admin@example.nl", "bootstrap-token")
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(repo.session_count(), 1);

        let context = auth.authenticate("bootstrap-token").await.unwrap();
        assert!(context.has(Permission::ManageUsers));
        assert!(context.expires_at.is_none());
    }

    #[test]
    fn test_debouncer_window() {
        let debouncer = AuthEventDebouncer::new(Duration::from_secs(1));
        let start = Instant::now();
        let profile = ProfileId(1);

        assert!(debouncer.should_handle_at(AuthEventKind::SignedIn, profile, start));
        assert!(!debouncer.should_handle_at(
            AuthEventKind::SignedIn,
            profile,
            start + Duration::from_millis(500)
        ));
        assert!(debouncer.should_handle_at(AuthEventKind::SignedOut, profile, start));
        assert!(debouncer.should_handle_at(AuthEventKind::SignedIn, ProfileId(2), start));
        assert!(debouncer.should_handle_at(
            AuthEventKind::SignedIn,
            profile,
            start + Duration::from_millis(1500)
        ));
    }

    #[test]
    fn test_employee_access() {
        let session = AuthSession {
            token_hash: "h".into(),
            profile_id: ProfileId(1),
            role_hint: Role::Employee,
            created_at: Utc::now(),
            expires_at: None,
        };
        let mut context = AuthContext::from_role_hint(&session);
        context.employee_id = Some(EmployeeId(7));
        assert!(context.require_employee_access(EmployeeId(7)).is_ok());
        assert!(context.require_employee_access(EmployeeId(8)).is_err());
    }
}
