//! Employees, their availability and their licenses.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use super::{created, CreatedResult, EmptyResult, HandlerResult};
use crate::api::{
    Availability, AvailabilityDraft, AvailabilityId, Employee, EmployeeDraft, EmployeeId,
    EmployeeLicense, LicenseDraft, LicenseId, Permission,
};
use crate::db::services as db_services;
use crate::http::dto::ListResponse;
use crate::http::extract::CurrentUser;
use crate::http::state::AppState;
use crate::services::changes::{ChangeAction, ChangeTable};
use crate::services::filtering::EmployeeFilter;

// =============================================================================
// Employees
// =============================================================================

/// GET /v1/employees
///
/// Filter with `search`, `department`, `active`, `is_driver`; order with
/// `sort` and `direction`.
pub async fn list_employees(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(filter): Query<EmployeeFilter>,
) -> HandlerResult<ListResponse<Employee>> {
    user.require(Permission::ViewEmployees)?;
    let employees = db_services::list_employees(state.repository.as_ref()).await?;
    Ok(Json(filter.apply(employees).into()))
}

/// POST /v1/employees
pub async fn create_employee(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(draft): Json<EmployeeDraft>,
) -> CreatedResult<Employee> {
    user.require(Permission::ManageEmployees)?;
    let employee = db_services::create_employee(state.repository.as_ref(), &draft).await?;
    state
        .changes
        .publish(ChangeTable::Employees, ChangeAction::Insert, employee.id);
    created(employee)
}

/// GET /v1/employees/{id}
pub async fn get_employee(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<EmployeeId>,
) -> HandlerResult<Employee> {
    user.context.require_employee_access(id)?;
    Ok(Json(db_services::get_employee(state.repository.as_ref(), id).await?))
}

/// PUT /v1/employees/{id}
pub async fn update_employee(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<EmployeeId>,
    Json(draft): Json<EmployeeDraft>,
) -> HandlerResult<Employee> {
    user.require(Permission::ManageEmployees)?;
    let employee = db_services::update_employee(state.repository.as_ref(), id, &draft).await?;
    state
        .changes
        .publish(ChangeTable::Employees, ChangeAction::Update, id);
    Ok(Json(employee))
}

/// DELETE /v1/employees/{id}
///
/// Subscribers also hear about the participations, licenses and
/// availability removed with the employee, and the plans that lost items.
pub async fn delete_employee(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<EmployeeId>,
) -> EmptyResult {
    user.require(Permission::ManageEmployees)?;
    let cascade = db_services::delete_employee(state.repository.as_ref(), id).await?;
    let changes = &state.changes;
    for participant in cascade.participants {
        changes.publish(ChangeTable::TrainingParticipants, ChangeAction::Delete, participant);
    }
    for license in cascade.licenses {
        changes.publish(ChangeTable::EmployeeLicenses, ChangeAction::Delete, license);
    }
    for record in cascade.availability {
        changes.publish(ChangeTable::EmployeeAvailability, ChangeAction::Delete, record);
    }
    for plan in cascade.plans {
        changes.publish(ChangeTable::PreliminaryPlans, ChangeAction::Update, plan);
    }
    changes.publish(ChangeTable::Employees, ChangeAction::Delete, id);
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Availability
// =============================================================================

/// GET /v1/availability
///
/// Every availability record, for planners looking across employees.
pub async fn list_availability(
    State(state): State<AppState>,
    user: CurrentUser,
) -> HandlerResult<ListResponse<Availability>> {
    user.require(Permission::ViewEmployees)?;
    let mut records = state.repository.list_availability().await?;
    records.sort_by_key(|a| (a.start_date, a.employee_id));
    Ok(Json(records.into()))
}

/// GET /v1/employees/{id}/availability
pub async fn list_employee_availability(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<EmployeeId>,
) -> HandlerResult<ListResponse<Availability>> {
    user.context.require_employee_access(id)?;
    let records =
        db_services::list_availability_for_employee(state.repository.as_ref(), id).await?;
    Ok(Json(records.into()))
}

/// POST /v1/employees/{id}/availability
pub async fn create_availability(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<EmployeeId>,
    Json(draft): Json<AvailabilityDraft>,
) -> CreatedResult<Availability> {
    user.require(Permission::ManageAvailability)?;
    let record = db_services::create_availability(state.repository.as_ref(), id, &draft).await?;
    state
        .changes
        .publish(ChangeTable::EmployeeAvailability, ChangeAction::Insert, record.id);
    created(record)
}

/// PUT /v1/availability/{id}
pub async fn update_availability(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<AvailabilityId>,
    Json(draft): Json<AvailabilityDraft>,
) -> HandlerResult<Availability> {
    user.require(Permission::ManageAvailability)?;
    let record = db_services::update_availability(state.repository.as_ref(), id, &draft).await?;
    state
        .changes
        .publish(ChangeTable::EmployeeAvailability, ChangeAction::Update, id);
    Ok(Json(record))
}

/// DELETE /v1/availability/{id}
pub async fn delete_availability(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<AvailabilityId>,
) -> EmptyResult {
    user.require(Permission::ManageAvailability)?;
    db_services::delete_availability(state.repository.as_ref(), id).await?;
    state
        .changes
        .publish(ChangeTable::EmployeeAvailability, ChangeAction::Delete, id);
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Licenses
// =============================================================================

/// GET /v1/employees/{id}/licenses
pub async fn list_employee_licenses(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<EmployeeId>,
) -> HandlerResult<ListResponse<EmployeeLicense>> {
    user.context.require_employee_access(id)?;
    state.repository.get_employee(id).await?;
    let mut licenses = state.repository.list_licenses_for_employee(id).await?;
    licenses.sort_by(|a, b| b.issued_on.cmp(&a.issued_on));
    Ok(Json(licenses.into()))
}

/// POST /v1/employees/{id}/licenses
///
/// The expiry is derived from the certificate's validity when omitted.
pub async fn create_license(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<EmployeeId>,
    Json(draft): Json<LicenseDraft>,
) -> CreatedResult<EmployeeLicense> {
    user.require(Permission::ManageLicenses)?;
    let license = db_services::create_license(state.repository.as_ref(), id, &draft).await?;
    state
        .changes
        .publish(ChangeTable::EmployeeLicenses, ChangeAction::Insert, license.id);
    created(license)
}

/// GET /v1/licenses/{id}
pub async fn get_license(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<LicenseId>,
) -> HandlerResult<EmployeeLicense> {
    let license = state.repository.get_license(id).await?;
    user.context.require_employee_access(license.employee_id)?;
    Ok(Json(license))
}

/// PUT /v1/licenses/{id}
pub async fn update_license(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<LicenseId>,
    Json(draft): Json<LicenseDraft>,
) -> HandlerResult<EmployeeLicense> {
    user.require(Permission::ManageLicenses)?;
    let license = db_services::update_license(state.repository.as_ref(), id, &draft).await?;
    state
        .changes
        .publish(ChangeTable::EmployeeLicenses, ChangeAction::Update, id);
    Ok(Json(license))
}

/// DELETE /v1/licenses/{id}
pub async fn delete_license(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<LicenseId>,
) -> EmptyResult {
    user.require(Permission::ManageLicenses)?;
    state.repository.delete_license(id).await?;
    state
        .changes
        .publish(ChangeTable::EmployeeLicenses, ChangeAction::Delete, id);
    Ok(StatusCode::NO_CONTENT)
}
