//! Router configuration for the HTTP API.
//!
//! This module sets up all routes, middleware (CORS, compression, tracing),
//! and creates the axum router ready for serving.

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{self, access, catalog, changes, compliance, personnel, planning, trainings};
use super::state::AppState;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration - permissive for development, should be restricted in production
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the API router with versioned endpoints
    let api_v1 = Router::new()
        // Authentication and users
        .route("/auth/me", get(access::me))
        .route("/auth/sessions", post(access::issue_session))
        .route("/auth/sessions/current", delete(access::sign_out))
        .route("/profiles", get(access::list_profiles).post(access::create_profile))
        .route(
            "/profiles/{id}",
            get(access::get_profile).put(access::update_profile),
        )
        // Personnel
        .route(
            "/employees",
            get(personnel::list_employees).post(personnel::create_employee),
        )
        .route(
            "/employees/{id}",
            get(personnel::get_employee)
                .put(personnel::update_employee)
                .delete(personnel::delete_employee),
        )
        .route(
            "/employees/{id}/availability",
            get(personnel::list_employee_availability).post(personnel::create_availability),
        )
        .route(
            "/employees/{id}/licenses",
            get(personnel::list_employee_licenses).post(personnel::create_license),
        )
        .route("/employees/{id}/code95", get(compliance::employee_code95))
        .route("/employees/{id}/compliance", get(compliance::employee_compliance))
        .route("/availability", get(personnel::list_availability))
        .route(
            "/availability/{id}",
            put(personnel::update_availability).delete(personnel::delete_availability),
        )
        .route(
            "/licenses/{id}",
            get(personnel::get_license)
                .put(personnel::update_license)
                .delete(personnel::delete_license),
        )
        // Catalog
        .route(
            "/providers",
            get(catalog::list_providers).post(catalog::create_provider),
        )
        .route(
            "/providers/{id}",
            get(catalog::get_provider)
                .put(catalog::update_provider)
                .delete(catalog::delete_provider),
        )
        .route("/courses", get(catalog::list_courses).post(catalog::create_course))
        .route(
            "/courses/{id}",
            get(catalog::get_course)
                .put(catalog::update_course)
                .delete(catalog::delete_course),
        )
        .route(
            "/certificates",
            get(catalog::list_certificates).post(catalog::create_certificate),
        )
        .route(
            "/certificates/{id}",
            get(catalog::get_certificate)
                .put(catalog::update_certificate)
                .delete(catalog::delete_certificate),
        )
        // Trainings
        .route(
            "/trainings",
            get(trainings::list_trainings).post(trainings::create_training),
        )
        .route(
            "/trainings/{id}",
            get(trainings::get_training)
                .put(trainings::update_training)
                .delete(trainings::delete_training),
        )
        .route(
            "/trainings/{id}/participants",
            get(trainings::list_participants).post(trainings::add_participant),
        )
        .route("/trainings/{id}/complete", post(trainings::complete_training))
        .route("/trainings/{id}/cancel", post(trainings::cancel_training))
        .route("/trainings/{id}/conflicts", get(trainings::list_conflicts))
        .route(
            "/participants/{id}",
            patch(trainings::update_participant)
                .delete(trainings::remove_participant),
        )
        .route("/calendar", get(trainings::calendar))
        .route("/scheduling/sessions", post(trainings::edit_sessions))
        // Compliance
        .route("/compliance/overview", get(compliance::overview))
        // Planning
        .route("/plans", get(planning::list_plans).post(planning::create_plan))
        .route("/plans/suggestions", get(planning::suggestions))
        .route(
            "/plans/{id}",
            get(planning::get_plan)
                .put(planning::update_plan)
                .delete(planning::delete_plan),
        )
        .route("/plans/{id}/items", put(planning::set_plan_items))
        .route("/plans/{id}/convert", post(planning::convert_plan))
        // Realtime
        .route("/changes", get(changes::stream_changes));

    // Combine all routes
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/v1", api_v1)
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::db::repositories::LocalRepository;

    #[test]
    fn test_router_creation() {
        let repo = Arc::new(LocalRepository::new()) as Arc<dyn crate::db::repository::FullRepository>;
        let state = AppState::new(repo);
        let _router = create_router(state);
        // If we got here, router was created successfully
    }
}
