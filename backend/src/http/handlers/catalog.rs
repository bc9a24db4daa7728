//! Providers, courses and certificate definitions.
//!
//! Every signed-in role may read the catalog; changes need `manage_catalog`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::{created, CreatedResult, EmptyResult, HandlerResult};
use crate::api::{
    CertificateDefinition, CertificateDefinitionDraft, CertificateId, Course, CourseDraft,
    CourseId, Permission, Provider, ProviderDraft, ProviderId,
};
use crate::db::services as db_services;
use crate::http::dto::ListResponse;
use crate::http::extract::CurrentUser;
use crate::http::state::AppState;
use crate::services::changes::{ChangeAction, ChangeTable};

// =============================================================================
// Providers
// =============================================================================

/// GET /v1/providers
pub async fn list_providers(
    State(state): State<AppState>,
    user: CurrentUser,
) -> HandlerResult<ListResponse<Provider>> {
    user.require(Permission::ViewTrainings)?;
    let mut providers = state.repository.list_providers().await?;
    providers.sort_by_key(|p| p.name.to_lowercase());
    Ok(Json(providers.into()))
}

/// POST /v1/providers
pub async fn create_provider(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(draft): Json<ProviderDraft>,
) -> CreatedResult<Provider> {
    user.require(Permission::ManageCatalog)?;
    let provider = db_services::create_provider(state.repository.as_ref(), &draft).await?;
    state
        .changes
        .publish(ChangeTable::Providers, ChangeAction::Insert, provider.id);
    created(provider)
}

/// GET /v1/providers/{id}
pub async fn get_provider(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<ProviderId>,
) -> HandlerResult<Provider> {
    user.require(Permission::ViewTrainings)?;
    Ok(Json(state.repository.get_provider(id).await?))
}

/// PUT /v1/providers/{id}
pub async fn update_provider(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<ProviderId>,
    Json(draft): Json<ProviderDraft>,
) -> HandlerResult<Provider> {
    user.require(Permission::ManageCatalog)?;
    let provider = db_services::update_provider(state.repository.as_ref(), id, &draft).await?;
    state
        .changes
        .publish(ChangeTable::Providers, ChangeAction::Update, id);
    Ok(Json(provider))
}

/// DELETE /v1/providers/{id}
pub async fn delete_provider(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<ProviderId>,
) -> EmptyResult {
    user.require(Permission::ManageCatalog)?;
    state.repository.delete_provider(id).await?;
    state
        .changes
        .publish(ChangeTable::Providers, ChangeAction::Delete, id);
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Courses
// =============================================================================

/// GET /v1/courses
pub async fn list_courses(
    State(state): State<AppState>,
    user: CurrentUser,
) -> HandlerResult<ListResponse<Course>> {
    user.require(Permission::ViewTrainings)?;
    let mut courses = state.repository.list_courses().await?;
    courses.sort_by_key(|c| c.title.to_lowercase());
    Ok(Json(courses.into()))
}

/// POST /v1/courses
pub async fn create_course(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(draft): Json<CourseDraft>,
) -> CreatedResult<Course> {
    user.require(Permission::ManageCatalog)?;
    let course = db_services::create_course(state.repository.as_ref(), &draft).await?;
    state
        .changes
        .publish(ChangeTable::Courses, ChangeAction::Insert, course.id);
    created(course)
}

/// GET /v1/courses/{id}
pub async fn get_course(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<CourseId>,
) -> HandlerResult<Course> {
    user.require(Permission::ViewTrainings)?;
    Ok(Json(state.repository.get_course(id).await?))
}

/// PUT /v1/courses/{id}
pub async fn update_course(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<CourseId>,
    Json(draft): Json<CourseDraft>,
) -> HandlerResult<Course> {
    user.require(Permission::ManageCatalog)?;
    let course = db_services::update_course(state.repository.as_ref(), id, &draft).await?;
    state
        .changes
        .publish(ChangeTable::Courses, ChangeAction::Update, id);
    Ok(Json(course))
}

/// DELETE /v1/courses/{id}
pub async fn delete_course(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<CourseId>,
) -> EmptyResult {
    user.require(Permission::ManageCatalog)?;
    state.repository.delete_course(id).await?;
    state
        .changes
        .publish(ChangeTable::Courses, ChangeAction::Delete, id);
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Certificate definitions
// =============================================================================

/// GET /v1/certificates
pub async fn list_certificates(
    State(state): State<AppState>,
    user: CurrentUser,
) -> HandlerResult<ListResponse<CertificateDefinition>> {
    user.require(Permission::ViewTrainings)?;
    let mut certificates = state.repository.list_certificates().await?;
    certificates.sort_by_key(|c| c.name.to_lowercase());
    Ok(Json(certificates.into()))
}

/// POST /v1/certificates
pub async fn create_certificate(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(draft): Json<CertificateDefinitionDraft>,
) -> CreatedResult<CertificateDefinition> {
    user.require(Permission::ManageCatalog)?;
    let certificate = db_services::create_certificate(state.repository.as_ref(), &draft).await?;
    state.changes.publish(
        ChangeTable::CertificateDefinitions,
        ChangeAction::Insert,
        certificate.id,
    );
    created(certificate)
}

/// GET /v1/certificates/{id}
pub async fn get_certificate(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<CertificateId>,
) -> HandlerResult<CertificateDefinition> {
    user.require(Permission::ViewTrainings)?;
    Ok(Json(state.repository.get_certificate(id).await?))
}

/// PUT /v1/certificates/{id}
pub async fn update_certificate(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<CertificateId>,
    Json(draft): Json<CertificateDefinitionDraft>,
) -> HandlerResult<CertificateDefinition> {
    user.require(Permission::ManageCatalog)?;
    let certificate =
        db_services::update_certificate(state.repository.as_ref(), id, &draft).await?;
    state
        .changes
        .publish(ChangeTable::CertificateDefinitions, ChangeAction::Update, id);
    Ok(Json(certificate))
}

/// DELETE /v1/certificates/{id}
pub async fn delete_certificate(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<CertificateId>,
) -> EmptyResult {
    user.require(Permission::ManageCatalog)?;
    state.repository.delete_certificate(id).await?;
    state
        .changes
        .publish(ChangeTable::CertificateDefinitions, ChangeAction::Delete, id);
    Ok(StatusCode::NO_CONTENT)
}
