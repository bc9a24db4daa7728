//! Preliminary plans, candidate suggestions and plan conversion.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use super::{created, today, CreatedResult, EmptyResult, HandlerResult};
use crate::api::{Permission, PlanDraft, PlanId, PlanItem, PreliminaryPlan};
use crate::db::services as db_services;
use crate::http::dto::ListResponse;
use crate::http::extract::CurrentUser;
use crate::http::state::AppState;
use crate::services::changes::{ChangeAction, ChangeTable};
use crate::services::planning::{
    self, Candidate, ConversionOutcome, ConvertPlanRequest, SuggestionQuery,
};

/// GET /v1/plans
pub async fn list_plans(
    State(state): State<AppState>,
    user: CurrentUser,
) -> HandlerResult<ListResponse<PreliminaryPlan>> {
    user.require(Permission::ManagePlans)?;
    let mut plans = state.repository.list_plans().await?;
    plans.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    Ok(Json(plans.into()))
}

/// POST /v1/plans
pub async fn create_plan(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(draft): Json<PlanDraft>,
) -> CreatedResult<PreliminaryPlan> {
    user.require(Permission::ManagePlans)?;
    let plan = db_services::create_plan(state.repository.as_ref(), &draft).await?;
    state
        .changes
        .publish(ChangeTable::PreliminaryPlans, ChangeAction::Insert, plan.id);
    created(plan)
}

/// GET /v1/plans/{id}
pub async fn get_plan(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<PlanId>,
) -> HandlerResult<PreliminaryPlan> {
    user.require(Permission::ManagePlans)?;
    Ok(Json(state.repository.get_plan(id).await?))
}

/// PUT /v1/plans/{id}
pub async fn update_plan(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<PlanId>,
    Json(draft): Json<PlanDraft>,
) -> HandlerResult<PreliminaryPlan> {
    user.require(Permission::ManagePlans)?;
    let plan = db_services::update_plan(state.repository.as_ref(), id, &draft).await?;
    state
        .changes
        .publish(ChangeTable::PreliminaryPlans, ChangeAction::Update, id);
    Ok(Json(plan))
}

/// DELETE /v1/plans/{id}
pub async fn delete_plan(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<PlanId>,
) -> EmptyResult {
    user.require(Permission::ManagePlans)?;
    state.repository.delete_plan(id).await?;
    state
        .changes
        .publish(ChangeTable::PreliminaryPlans, ChangeAction::Delete, id);
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /v1/plans/{id}/items
///
/// Replace the plan's employee list.
pub async fn set_plan_items(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<PlanId>,
    Json(items): Json<Vec<PlanItem>>,
) -> HandlerResult<PreliminaryPlan> {
    user.require(Permission::ManagePlans)?;
    let plan = db_services::set_plan_items(state.repository.as_ref(), id, items).await?;
    state
        .changes
        .publish(ChangeTable::PreliminaryPlans, ChangeAction::Update, id);
    Ok(Json(plan))
}

/// GET /v1/plans/suggestions?certificate_id=N&horizon_days=90
///
/// Employees who need the certificate: expired, missing or expiring soon.
pub async fn suggestions(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<SuggestionQuery>,
) -> HandlerResult<ListResponse<Candidate>> {
    user.require(Permission::ManagePlans)?;
    let candidates = planning::suggest_candidates(
        state.repository.as_ref(),
        query.certificate_id,
        query.horizon_days,
        today(),
    )
    .await?;
    Ok(Json(candidates.into()))
}

/// POST /v1/plans/{id}/convert
///
/// Schedule a training from the plan and enroll its employees. Needs both
/// plan and training rights.
pub async fn convert_plan(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<PlanId>,
    Json(request): Json<ConvertPlanRequest>,
) -> HandlerResult<ConversionOutcome> {
    user.require(Permission::ManagePlans)?;
    user.require(Permission::ManageTrainings)?;
    let outcome = planning::convert_plan(state.repository.as_ref(), id, &request).await?;

    state
        .changes
        .publish(ChangeTable::Trainings, ChangeAction::Insert, outcome.training.id);
    for participant in &outcome.participants {
        state.changes.publish(
            ChangeTable::TrainingParticipants,
            ChangeAction::Insert,
            participant.id,
        );
    }
    state
        .changes
        .publish(ChangeTable::PreliminaryPlans, ChangeAction::Update, id);
    tracing::info!(
        plan = %id,
        training = %outcome.training.id,
        enrolled = outcome.participants.len(),
        skipped = outcome.skipped.len(),
        "converted plan"
    );
    Ok(Json(outcome))
}
