//! Sign-in sessions and user profiles.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{created, CreatedResult, HandlerResult};
use crate::api::{Permission, Profile, ProfileDraft, ProfileId};
use crate::db::services as db_services;
use crate::http::dto::{IssueSessionRequest, ListResponse, SignOutResponse};
use crate::http::error::AppError;
use crate::http::extract::CurrentUser;
use crate::http::state::AppState;
use crate::services::auth::{AuthContext, IssuedSession, MAX_SESSION_TTL_HOURS};
use crate::services::changes::{ChangeAction, ChangeTable};

/// GET /v1/auth/me
///
/// The caller's profile summary and effective permissions.
pub async fn me(user: CurrentUser) -> HandlerResult<AuthContext> {
    Ok(Json(user.context))
}

/// POST /v1/auth/sessions
///
/// Issue a bearer token for a profile. The token is only returned here.
pub async fn issue_session(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<IssueSessionRequest>,
) -> CreatedResult<IssuedSession> {
    user.require(Permission::ManageUsers)?;

    let profile_id = match (request.profile_id, request.email.as_deref()) {
        (Some(id), _) => id,
        (None, Some(email)) => state
            .repository
            .find_profile_by_email(email)
            .await?
            .map(|p| p.id)
            .ok_or_else(|| AppError::NotFound(format!("no profile with email {}", email)))?,
        (None, None) => {
            return Err(AppError::BadRequest(
                "profile_id or email is required".to_string(),
            ))
        }
    };
    let ttl = match request.ttl_hours {
        Some(0) => return Err(AppError::BadRequest("ttl_hours must be positive".to_string())),
        Some(hours) if hours > MAX_SESSION_TTL_HOURS => {
            return Err(AppError::BadRequest(format!(
                "ttl_hours must be at most {}",
                MAX_SESSION_TTL_HOURS
            )))
        }
        Some(hours) => Some(chrono::Duration::hours(i64::from(hours))),
        None => None,
    };

    let issued = state.auth.issue_session(profile_id, ttl).await?;
    tracing::info!(
        issuer = %user.context.profile_id,
        profile = %profile_id,
        "issued session"
    );
    created(issued)
}

/// DELETE /v1/auth/sessions/current
///
/// Sign out: revoke the token used for this request.
pub async fn sign_out(
    State(state): State<AppState>,
    user: CurrentUser,
) -> HandlerResult<SignOutResponse> {
    let revoked = state.auth.sign_out(&user.token).await?;
    Ok(Json(SignOutResponse { revoked }))
}

/// GET /v1/profiles
pub async fn list_profiles(
    State(state): State<AppState>,
    user: CurrentUser,
) -> HandlerResult<ListResponse<Profile>> {
    user.require(Permission::ManageUsers)?;
    let mut profiles = state.repository.list_profiles().await?;
    profiles.sort_by(|a, b| a.email.cmp(&b.email));
    Ok(Json(profiles.into()))
}

/// POST /v1/profiles
pub async fn create_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(draft): Json<ProfileDraft>,
) -> CreatedResult<Profile> {
    user.require(Permission::ManageUsers)?;
    let profile = db_services::create_profile(state.repository.as_ref(), &draft).await?;
    state
        .changes
        .publish(ChangeTable::Profiles, ChangeAction::Insert, profile.id);
    created(profile)
}

/// GET /v1/profiles/{id}
///
/// Users may always read their own profile.
pub async fn get_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<ProfileId>,
) -> HandlerResult<Profile> {
    if user.context.profile_id != id {
        user.require(Permission::ManageUsers)?;
    }
    Ok(Json(state.repository.get_profile(id).await?))
}

/// PUT /v1/profiles/{id}
pub async fn update_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<ProfileId>,
    Json(draft): Json<ProfileDraft>,
) -> HandlerResult<Profile> {
    user.require(Permission::ManageUsers)?;
    let profile = db_services::update_profile(state.repository.as_ref(), id, &draft).await?;
    // Role and permission edits apply to live sessions right away.
    state.auth.invalidate_profile(id);
    state
        .changes
        .publish(ChangeTable::Profiles, ChangeAction::Update, id);
    Ok(Json(profile))
}
