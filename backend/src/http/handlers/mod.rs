//! HTTP handlers for the REST API.
//!
//! Each handler corresponds to an API endpoint: it checks the caller's
//! permission, delegates to the service layer for business logic and
//! publishes successful mutations on the change feed.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{NaiveDate, Utc};

use super::dto::HealthResponse;
use super::error::AppError;
use super::state::AppState;
use crate::db::services as db_services;

pub mod access;
pub mod catalog;
pub mod changes;
pub mod compliance;
pub mod personnel;
pub mod planning;
pub mod trainings;

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

/// Result type for handlers that create a resource.
pub type CreatedResult<T> = Result<(StatusCode, Json<T>), AppError>;

/// Result type for handlers without a response body.
pub type EmptyResult = Result<StatusCode, AppError>;

fn created<T>(value: T) -> CreatedResult<T> {
    Ok((StatusCode::CREATED, Json(value)))
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
///
/// Health check endpoint to verify the service is running and the repository
/// is reachable. Public.
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let db_status = match db_services::health_check(state.repository.as_ref()).await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: "v1".to_string(),
        database: db_status,
    }))
}
