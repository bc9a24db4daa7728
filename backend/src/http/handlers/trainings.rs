//! Trainings, their participants, the calendar and the session helpers.

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use super::{created, today, CreatedResult, EmptyResult, HandlerResult};
use crate::api::{
    Permission, ParticipantId, Training, TrainingDraft, TrainingId, TrainingParticipant,
};
use crate::db::services::{
    self as db_services, AddParticipantRequest, AvailabilityConflict, CompletionSummary,
    ParticipantUpdate,
};
use crate::http::dto::{
    CompleteTrainingRequest, ListResponse, SessionsRequest, SessionsResponse, TrainingDetail,
};
use crate::http::error::AppError;
use crate::http::extract::{CurrentUser, Lang};
use crate::http::state::AppState;
use crate::services::calendar::{self, CalendarEvent, CalendarWindow};
use crate::services::changes::{ChangeAction, ChangeTable};
use crate::services::filtering::{title_of, TrainingFilter};

// =============================================================================
// Trainings
// =============================================================================

/// GET /v1/trainings
///
/// Filter with `status` (comma separated), `course_id`, `provider_id`,
/// `from`, `to` and `search`; order with `sort` and `direction`.
pub async fn list_trainings(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(filter): Query<TrainingFilter>,
) -> HandlerResult<ListResponse<Training>> {
    user.require(Permission::ViewTrainings)?;
    let repo = state.repository.as_ref();
    let course_titles: HashMap<_, _> = repo
        .list_courses()
        .await?
        .into_iter()
        .map(|c| (c.id, c.title))
        .collect();
    let trainings = db_services::list_trainings(repo).await?;
    Ok(Json(filter.apply(trainings, &course_titles).into()))
}

/// POST /v1/trainings
pub async fn create_training(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(draft): Json<TrainingDraft>,
) -> CreatedResult<Training> {
    user.require(Permission::ManageTrainings)?;
    let training = db_services::create_training(state.repository.as_ref(), &draft).await?;
    state
        .changes
        .publish(ChangeTable::Trainings, ChangeAction::Insert, training.id);
    created(training)
}

/// GET /v1/trainings/{id}
///
/// The training with its participants and seat usage.
pub async fn get_training(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<TrainingId>,
) -> HandlerResult<TrainingDetail> {
    user.require(Permission::ViewTrainings)?;
    let repo = state.repository.as_ref();
    let training = db_services::get_training(repo, id).await?;
    let course = repo.get_course(training.course_id).await?;
    let participants = repo.list_participants(id).await?;

    let display_title = title_of(&training, &HashMap::from([(course.id, course.title.clone())]))
        .to_string();
    let seats_taken = participants
        .iter()
        .filter(|p| p.status.occupies_seat())
        .count();
    Ok(Json(TrainingDetail {
        capacity: training.max_participants.or(course.max_participants),
        training,
        display_title,
        participants,
        seats_taken,
    }))
}

/// PUT /v1/trainings/{id}
pub async fn update_training(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<TrainingId>,
    Json(draft): Json<TrainingDraft>,
) -> HandlerResult<Training> {
    user.require(Permission::ManageTrainings)?;
    let training = db_services::update_training(state.repository.as_ref(), id, &draft).await?;
    state
        .changes
        .publish(ChangeTable::Trainings, ChangeAction::Update, id);
    Ok(Json(training))
}

/// DELETE /v1/trainings/{id}
pub async fn delete_training(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<TrainingId>,
) -> EmptyResult {
    user.require(Permission::ManageTrainings)?;
    db_services::delete_training(state.repository.as_ref(), id).await?;
    state
        .changes
        .publish(ChangeTable::Trainings, ChangeAction::Delete, id);
    Ok(StatusCode::NO_CONTENT)
}

/// POST /v1/trainings/{id}/cancel
pub async fn cancel_training(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<TrainingId>,
) -> HandlerResult<Training> {
    user.require(Permission::ManageTrainings)?;
    let training = db_services::cancel_training(state.repository.as_ref(), id).await?;
    state
        .changes
        .publish(ChangeTable::Trainings, ChangeAction::Update, id);
    Ok(Json(training))
}

/// POST /v1/trainings/{id}/complete
///
/// Body is optional; the completion date defaults to the last session date.
pub async fn complete_training(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<TrainingId>,
    body: Bytes,
) -> HandlerResult<CompletionSummary> {
    user.require(Permission::ManageTrainings)?;
    let repo = state.repository.as_ref();
    let request: CompleteTrainingRequest = if body.is_empty() {
        CompleteTrainingRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e)))?
    };
    let completion_date = match request.completion_date {
        Some(date) => date,
        None => db_services::get_training(repo, id)
            .await?
            .last_date()
            .unwrap_or_else(today),
    };

    let summary = db_services::complete_training(repo, id, completion_date).await?;
    state
        .changes
        .publish(ChangeTable::Trainings, ChangeAction::Update, id);
    for participant in &summary.completed {
        state.changes.publish(
            ChangeTable::TrainingParticipants,
            ChangeAction::Update,
            participant.id,
        );
    }
    for license in &summary.licenses_issued {
        state
            .changes
            .publish(ChangeTable::EmployeeLicenses, ChangeAction::Insert, license.id);
    }
    Ok(Json(summary))
}

/// GET /v1/trainings/{id}/conflicts
///
/// Participants unavailable on a session date.
pub async fn list_conflicts(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<TrainingId>,
) -> HandlerResult<ListResponse<AvailabilityConflict>> {
    user.require(Permission::ViewTrainings)?;
    let conflicts = db_services::availability_conflicts(state.repository.as_ref(), id).await?;
    Ok(Json(conflicts.into()))
}

// =============================================================================
// Participants
// =============================================================================

/// GET /v1/trainings/{id}/participants
pub async fn list_participants(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<TrainingId>,
) -> HandlerResult<ListResponse<TrainingParticipant>> {
    user.require(Permission::ViewTrainings)?;
    let repo = state.repository.as_ref();
    repo.get_training(id).await?;
    Ok(Json(repo.list_participants(id).await?.into()))
}

/// POST /v1/trainings/{id}/participants
///
/// Rejected with 409 when the training is full or the employee is
/// unavailable, unless `override_availability` is set.
pub async fn add_participant(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<TrainingId>,
    Json(request): Json<AddParticipantRequest>,
) -> CreatedResult<TrainingParticipant> {
    user.require(Permission::ManageParticipants)?;
    let participant = db_services::add_participant(state.repository.as_ref(), id, &request).await?;
    state.changes.publish(
        ChangeTable::TrainingParticipants,
        ChangeAction::Insert,
        participant.id,
    );
    created(participant)
}

/// PATCH /v1/participants/{id}
pub async fn update_participant(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<ParticipantId>,
    Json(update): Json<ParticipantUpdate>,
) -> HandlerResult<TrainingParticipant> {
    user.require(Permission::ManageParticipants)?;
    let participant =
        db_services::update_participant(state.repository.as_ref(), id, &update).await?;
    state
        .changes
        .publish(ChangeTable::TrainingParticipants, ChangeAction::Update, id);
    Ok(Json(participant))
}

/// DELETE /v1/participants/{id}
pub async fn remove_participant(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<ParticipantId>,
) -> EmptyResult {
    user.require(Permission::ManageParticipants)?;
    db_services::remove_participant(state.repository.as_ref(), id).await?;
    state
        .changes
        .publish(ChangeTable::TrainingParticipants, ChangeAction::Delete, id);
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Calendar and scheduling helpers
// =============================================================================

/// GET /v1/calendar?from=YYYY-MM-DD&to=YYYY-MM-DD
///
/// One event per training session, labelled in the negotiated language.
pub async fn calendar(
    State(state): State<AppState>,
    user: CurrentUser,
    Lang(lang): Lang,
    Query(window): Query<CalendarWindow>,
) -> HandlerResult<ListResponse<CalendarEvent>> {
    user.require(Permission::ViewTrainings)?;
    let events = calendar::calendar_events(state.repository.as_ref(), window, lang).await?;
    Ok(Json(events.into()))
}

/// POST /v1/scheduling/sessions
///
/// Stateless session editing: generate a series, append a session, copy
/// times onto all sessions, or validate a list. Nothing is stored.
pub async fn edit_sessions(
    user: CurrentUser,
    Json(request): Json<SessionsRequest>,
) -> HandlerResult<SessionsResponse> {
    user.require(Permission::ManageTrainings)?;
    Ok(Json(request.run()?.into()))
}
