//! Request extractors: the authenticated caller and the response language.

use axum::{
    extract::{FromRequestParts, Query},
    http::{header, request::Parts},
};
use serde::Deserialize;

use super::error::AppError;
use super::state::AppState;
use crate::api::Permission;
use crate::services::auth::AuthContext;
use crate::services::i18n::Language;

/// Bearer token from the `Authorization` header.
///
/// Browsers cannot set headers on an `EventSource`, so an `access_token`
/// query parameter is accepted as well.
fn bearer_token(parts: &Parts) -> Option<String> {
    let from_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            let (scheme, token) = v.trim().split_once(' ')?;
            scheme.eq_ignore_ascii_case("bearer").then(|| token.trim().to_string())
        });
    from_header.or_else(|| {
        #[derive(Deserialize)]
        struct TokenQuery {
            access_token: Option<String>,
        }
        Query::<TokenQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|q| q.0.access_token)
    })
}

/// The authenticated caller of a `/v1` route.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub context: AuthContext,
    pub token: String,
}

impl CurrentUser {
    pub fn require(&self, permission: Permission) -> Result<(), AppError> {
        Ok(self.context.require(permission)?)
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;
        let context = state.auth.authenticate(&token).await?;
        Ok(CurrentUser { context, token })
    }
}

/// Response language from `?lang=` or `Accept-Language`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Lang(pub Language);

impl<S> FromRequestParts<S> for Lang
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        #[derive(Deserialize)]
        struct LangQuery {
            lang: Option<String>,
        }
        let query = Query::<LangQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|q| q.0.lang);
        let header = parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok());
        Ok(Lang(Language::negotiate(query.as_deref(), header)))
    }
}
