//! High-level database service layer.
//!
//! This module provides repository-agnostic database operations that work with
//! any implementation of the repository traits. These functions contain the
//! business rules that must hold regardless of the storage backend: draft
//! validation, reference checks, participant admission and training
//! completion.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  HTTP layer (axum handlers)                              │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Service Layer (services.rs) - Business Logic           │
//! │  - Draft validation and reference checks                 │
//! │  - Participant admission (status, capacity, availability)│
//! │  - Training completion (points, licenses)                │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Repository Traits (repository/) - Abstract Interface    │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//!     ┌───────────────┴────────────────┐
//!     │                                 │
//! ┌───▼──────────────┐     ┌──────────▼──────────────┐
//! │ Postgres (Diesel)│     │ Local Repository        │
//! │                  │     │ (in-memory)             │
//! └──────────────────┘     └─────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use training_hub::db::{services, repositories::LocalRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let repo = LocalRepository::new();
//!     let trainings = services::list_trainings(&repo).await?;
//!     println!("Found {} trainings", trainings.len());
//!     Ok(())
//! }
//! ```

use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::repository::{ErrorContext, FullRepository, RepositoryError, RepositoryResult};
use crate::api::*;
use crate::models::expiry_after;

// ==================== Health & Connection ====================

/// Check if the database connection is healthy.
pub async fn health_check<R: FullRepository + ?Sized>(repo: &R) -> RepositoryResult<bool> {
    repo.health_check().await
}

/// Map a `NotFound` on a referenced row to a validation error on the
/// referencing field.
fn as_reference_error(err: RepositoryError, field: &str) -> RepositoryError {
    match err {
        RepositoryError::NotFound { message, .. } => RepositoryError::validation_with_context(
            format!("{}: {}", field, message),
            ErrorContext::default().with_details(format!("field={}", field)),
        ),
        other => other,
    }
}

// ==================== Employees ====================

pub async fn create_employee<R: FullRepository + ?Sized>(
    repo: &R,
    draft: &EmployeeDraft,
) -> RepositoryResult<Employee> {
    draft.validate()?;
    let employee = repo.create_employee(draft).await?;
    info!(
        "Service layer: created employee {} ({})",
        employee.id, employee.employee_number
    );
    Ok(employee)
}

pub async fn get_employee<R: FullRepository + ?Sized>(
    repo: &R,
    id: EmployeeId,
) -> RepositoryResult<Employee> {
    repo.get_employee(id).await
}

pub async fn list_employees<R: FullRepository + ?Sized>(repo: &R) -> RepositoryResult<Vec<Employee>> {
    repo.list_employees().await
}

pub async fn update_employee<R: FullRepository + ?Sized>(
    repo: &R,
    id: EmployeeId,
    draft: &EmployeeDraft,
) -> RepositoryResult<Employee> {
    draft.validate()?;
    repo.update_employee(id, draft).await
}

/// Rows removed or changed together with an employee.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EmployeeCascade {
    pub participants: Vec<ParticipantId>,
    pub licenses: Vec<LicenseId>,
    pub availability: Vec<AvailabilityId>,
    pub plans: Vec<PlanId>,
}

/// Delete an employee with their participations, licenses, availability and
/// plan items. Returns the ids of the dependent rows so callers can announce
/// them.
pub async fn delete_employee<R: FullRepository + ?Sized>(
    repo: &R,
    id: EmployeeId,
) -> RepositoryResult<EmployeeCascade> {
    repo.get_employee(id).await?;
    let cascade = EmployeeCascade {
        participants: repo
            .list_participations(id)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect(),
        licenses: repo
            .list_licenses_for_employee(id)
            .await?
            .into_iter()
            .map(|l| l.id)
            .collect(),
        availability: repo
            .list_availability_for_employee(id)
            .await?
            .into_iter()
            .map(|a| a.id)
            .collect(),
        plans: repo
            .list_plans()
            .await?
            .into_iter()
            .filter(|plan| plan.items.iter().any(|item| item.employee_id == id))
            .map(|plan| plan.id)
            .collect(),
    };
    repo.delete_employee(id).await?;
    info!(
        "Service layer: deleted employee {} ({} participations, {} licenses, {} availability records)",
        id,
        cascade.participants.len(),
        cascade.licenses.len(),
        cascade.availability.len()
    );
    Ok(cascade)
}

// ==================== Availability ====================

pub async fn create_availability<R: FullRepository + ?Sized>(
    repo: &R,
    employee_id: EmployeeId,
    draft: &AvailabilityDraft,
) -> RepositoryResult<Availability> {
    draft.validate()?;
    repo.create_availability(employee_id, draft).await
}

pub async fn update_availability<R: FullRepository + ?Sized>(
    repo: &R,
    id: AvailabilityId,
    draft: &AvailabilityDraft,
) -> RepositoryResult<Availability> {
    draft.validate()?;
    repo.update_availability(id, draft).await
}

pub async fn list_availability_for_employee<R: FullRepository + ?Sized>(
    repo: &R,
    employee_id: EmployeeId,
) -> RepositoryResult<Vec<Availability>> {
    repo.list_availability_for_employee(employee_id).await
}

pub async fn delete_availability<R: FullRepository + ?Sized>(
    repo: &R,
    id: AvailabilityId,
) -> RepositoryResult<()> {
    repo.delete_availability(id).await
}

// ==================== Catalog ====================

pub async fn create_provider<R: FullRepository + ?Sized>(
    repo: &R,
    draft: &ProviderDraft,
) -> RepositoryResult<Provider> {
    draft.validate()?;
    repo.create_provider(draft).await
}

pub async fn update_provider<R: FullRepository + ?Sized>(
    repo: &R,
    id: ProviderId,
    draft: &ProviderDraft,
) -> RepositoryResult<Provider> {
    draft.validate()?;
    repo.update_provider(id, draft).await
}

pub async fn create_certificate<R: FullRepository + ?Sized>(
    repo: &R,
    draft: &CertificateDefinitionDraft,
) -> RepositoryResult<CertificateDefinition> {
    draft.validate()?;
    repo.create_certificate(draft).await
}

pub async fn update_certificate<R: FullRepository + ?Sized>(
    repo: &R,
    id: CertificateId,
    draft: &CertificateDefinitionDraft,
) -> RepositoryResult<CertificateDefinition> {
    draft.validate()?;
    repo.update_certificate(id, draft).await
}

async fn check_course_refs<R: FullRepository + ?Sized>(
    repo: &R,
    draft: &CourseDraft,
) -> RepositoryResult<()> {
    if let Some(provider_id) = draft.provider_id {
        repo.get_provider(provider_id)
            .await
            .map_err(|e| as_reference_error(e, "provider_id"))?;
    }
    if let Some(certificate_id) = draft.certificate_id {
        repo.get_certificate(certificate_id)
            .await
            .map_err(|e| as_reference_error(e, "certificate_id"))?;
    }
    Ok(())
}

pub async fn create_course<R: FullRepository + ?Sized>(
    repo: &R,
    draft: &CourseDraft,
) -> RepositoryResult<Course> {
    draft.validate()?;
    check_course_refs(repo, draft).await?;
    repo.create_course(draft).await
}

pub async fn update_course<R: FullRepository + ?Sized>(
    repo: &R,
    id: CourseId,
    draft: &CourseDraft,
) -> RepositoryResult<Course> {
    draft.validate()?;
    check_course_refs(repo, draft).await?;
    repo.update_course(id, draft).await
}

// ==================== Trainings ====================

pub async fn list_trainings<R: FullRepository + ?Sized>(repo: &R) -> RepositoryResult<Vec<Training>> {
    repo.list_trainings().await
}

pub async fn get_training<R: FullRepository + ?Sized>(
    repo: &R,
    id: TrainingId,
) -> RepositoryResult<Training> {
    repo.get_training(id).await
}

async fn check_training_refs<R: FullRepository + ?Sized>(
    repo: &R,
    draft: &TrainingDraft,
) -> RepositoryResult<Course> {
    let course = repo
        .get_course(draft.course_id)
        .await
        .map_err(|e| as_reference_error(e, "course_id"))?;
    if let Some(provider_id) = draft.provider_id {
        repo.get_provider(provider_id)
            .await
            .map_err(|e| as_reference_error(e, "provider_id"))?;
    }
    Ok(course)
}

pub async fn create_training<R: FullRepository + ?Sized>(
    repo: &R,
    draft: &TrainingDraft,
) -> RepositoryResult<Training> {
    draft.validate()?;
    if draft.status == TrainingStatus::Completed {
        return Err(RepositoryError::validation(
            "status: a new training cannot start out completed",
        ));
    }
    check_training_refs(repo, draft).await?;
    let training = repo.create_training(draft).await?;
    info!(
        "Service layer: created training {} (course {}, {} sessions)",
        training.id,
        training.course_id,
        training.sessions.len()
    );
    Ok(training)
}

/// Update a training. Completed trainings are frozen and completion itself
/// goes through [`complete_training`].
pub async fn update_training<R: FullRepository + ?Sized>(
    repo: &R,
    id: TrainingId,
    draft: &TrainingDraft,
) -> RepositoryResult<Training> {
    draft.validate()?;
    let existing = repo.get_training(id).await?;
    if existing.status == TrainingStatus::Completed {
        return Err(RepositoryError::conflict_with_context(
            format!("training {} is completed and can no longer be edited", id),
            ErrorContext::new("update_training")
                .with_entity("training")
                .with_entity_id(id),
        ));
    }
    if draft.status == TrainingStatus::Completed {
        return Err(RepositoryError::conflict(
            "use the complete operation to mark a training completed",
        ));
    }
    check_training_refs(repo, draft).await?;
    repo.update_training(id, draft).await
}

pub async fn delete_training<R: FullRepository + ?Sized>(
    repo: &R,
    id: TrainingId,
) -> RepositoryResult<()> {
    repo.delete_training(id).await?;
    info!("Service layer: deleted training {}", id);
    Ok(())
}

/// Cancel a training. Participants are kept for history.
pub async fn cancel_training<R: FullRepository + ?Sized>(
    repo: &R,
    id: TrainingId,
) -> RepositoryResult<Training> {
    let training = repo.get_training(id).await?;
    match training.status {
        TrainingStatus::Cancelled => Ok(training),
        TrainingStatus::Completed => Err(RepositoryError::conflict(format!(
            "training {} is already completed",
            id
        ))),
        _ => {
            info!("Service layer: cancelling training {}", id);
            repo.set_training_status(id, TrainingStatus::Cancelled).await
        }
    }
}

/// Outcome of [`complete_training`].
#[derive(Debug, Clone, Serialize)]
pub struct CompletionSummary {
    pub training: Training,
    pub completion_date: NaiveDate,
    pub completed: Vec<TrainingParticipant>,
    pub code95_points_awarded: u32,
    pub licenses_issued: Vec<EmployeeLicense>,
}

/// Complete a training on `completion_date`.
///
/// Enrolled and attended participants become completed and receive the
/// course's Code 95 points. When the course awards a certificate, each of
/// them gets a license issued on the completion date. No-shows and
/// cancelled participants get nothing.
///
/// Every step is safe to repeat. A call that failed part way can be retried:
/// participants already completed stay completed and a license this training
/// already issued is reused instead of issued twice.
pub async fn complete_training<R: FullRepository + ?Sized>(
    repo: &R,
    id: TrainingId,
    completion_date: NaiveDate,
) -> RepositoryResult<CompletionSummary> {
    let training = repo.get_training(id).await?;
    if !training.status.is_open() {
        return Err(RepositoryError::conflict_with_context(
            format!("training {} is {} and cannot be completed", id, training.status),
            ErrorContext::new("complete_training")
                .with_entity("training")
                .with_entity_id(id),
        ));
    }

    let course = repo.get_course(training.course_id).await?;
    let certificate = match course.certificate_id {
        Some(certificate_id) => Some(repo.get_certificate(certificate_id).await?),
        None => None,
    };

    let mut completed = Vec::new();
    let mut licenses_issued = Vec::new();
    for participant in repo.list_participants(id).await? {
        if !matches!(
            participant.status,
            ParticipantStatus::Enrolled | ParticipantStatus::Attended | ParticipantStatus::Completed
        ) {
            debug!(
                "Service layer: participant {} ({}) gets no completion",
                participant.id, participant.status
            );
            continue;
        }
        let updated = repo
            .update_participant(
                participant.id,
                ParticipantStatus::Completed,
                course.code95_points,
                participant.notes.clone(),
            )
            .await?;

        if let Some(certificate) = &certificate {
            let existing = repo
                .list_licenses_for_employee(updated.employee_id)
                .await?
                .into_iter()
                .find(|l| l.source_training_id == Some(id) && l.certificate_id == certificate.id);
            let license = match existing {
                Some(license) => {
                    debug!(
                        "Service layer: license {} already issued by training {}",
                        license.id, id
                    );
                    license
                }
                None => {
                    let mut draft = LicenseDraft::new(certificate.id, completion_date);
                    draft.expires_on = expiry_after(completion_date, certificate.validity_months)?;
                    draft.source_training_id = Some(id);
                    repo.create_license(updated.employee_id, &draft).await?
                }
            };
            licenses_issued.push(license);
        }
        completed.push(updated);
    }

    let training = repo.set_training_status(id, TrainingStatus::Completed).await?;
    info!(
        "Service layer: completed training {} on {} ({} participants, {} licenses)",
        id,
        completion_date,
        completed.len(),
        licenses_issued.len()
    );
    Ok(CompletionSummary {
        training,
        completion_date,
        completed,
        code95_points_awarded: course.code95_points,
        licenses_issued,
    })
}

// ==================== Participants ====================

/// Request body for adding a participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddParticipantRequest {
    #[serde(flatten)]
    pub participant: ParticipantDraft,
    /// Enroll even when an availability record covers a session date.
    #[serde(default)]
    pub override_availability: bool,
}

impl AddParticipantRequest {
    pub fn new(employee_id: EmployeeId) -> Self {
        Self {
            participant: ParticipantDraft::new(employee_id),
            override_availability: false,
        }
    }
}

/// A participant who is unavailable on one of the training's session dates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailabilityConflict {
    pub participant_id: Option<ParticipantId>,
    pub employee_id: EmployeeId,
    pub availability_id: AvailabilityId,
    pub kind: AvailabilityKind,
    pub date: NaiveDate,
}

/// Dates of `training` covered by the employee's availability records.
fn conflicts_for(
    training: &Training,
    employee_id: EmployeeId,
    participant_id: Option<ParticipantId>,
    records: &[Availability],
) -> Vec<AvailabilityConflict> {
    let mut conflicts = Vec::new();
    for session in &training.sessions {
        for record in records.iter().filter(|r| r.covers(session.date)) {
            conflicts.push(AvailabilityConflict {
                participant_id,
                employee_id,
                availability_id: record.id,
                kind: record.kind,
                date: session.date,
            });
        }
    }
    conflicts
}

/// Add an employee to a training.
///
/// The seat count is checked by the repository as part of the insert, so
/// concurrent requests cannot overbook a training.
///
/// # Errors
/// - `Conflict` when the training is cancelled or completed, the employee is
///   already enrolled, the training is full, or the employee is unavailable
///   on a session date (unless `override_availability` is set)
/// - `ValidationError` when the employee is inactive or does not exist
pub async fn add_participant<R: FullRepository + ?Sized>(
    repo: &R,
    training_id: TrainingId,
    request: &AddParticipantRequest,
) -> RepositoryResult<TrainingParticipant> {
    let training = repo.get_training(training_id).await?;
    if !training.status.is_open() {
        return Err(RepositoryError::conflict(format!(
            "training {} is {} and no longer accepts participants",
            training_id, training.status
        )));
    }

    let employee_id = request.participant.employee_id;
    let employee = repo
        .get_employee(employee_id)
        .await
        .map_err(|e| as_reference_error(e, "employee_id"))?;
    if !employee.active {
        return Err(RepositoryError::validation(format!(
            "employee_id: {} is not active",
            employee.full_name()
        )));
    }

    let participants = repo.list_participants(training_id).await?;
    if participants.iter().any(|p| p.employee_id == employee_id) {
        return Err(RepositoryError::conflict(format!(
            "{} is already a participant",
            employee.full_name()
        )));
    }

    let records = repo.list_availability_for_employee(employee_id).await?;
    let conflicts = conflicts_for(&training, employee_id, None, &records);
    if !conflicts.is_empty() {
        let dates: Vec<String> = conflicts.iter().map(|c| c.date.to_string()).collect();
        if request.override_availability {
            warn!(
                "Service layer: enrolling employee {} despite unavailability on {}",
                employee_id,
                dates.join(", ")
            );
        } else {
            return Err(RepositoryError::conflict_with_context(
                format!(
                    "{} is unavailable on {}",
                    employee.full_name(),
                    dates.join(", ")
                ),
                ErrorContext::new("add_participant")
                    .with_details("override_availability=false"),
            ));
        }
    }

    let participant = repo
        .add_participant(training_id, &request.participant)
        .await?;
    info!(
        "Service layer: employee {} enrolled in training {}",
        employee_id, training_id
    );
    Ok(participant)
}

/// Status/notes update for one participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantUpdate {
    pub status: ParticipantStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Change a participant's status. Awarded points are kept; participants of
/// cancelled trainings are frozen.
pub async fn update_participant<R: FullRepository + ?Sized>(
    repo: &R,
    id: ParticipantId,
    update: &ParticipantUpdate,
) -> RepositoryResult<TrainingParticipant> {
    let participant = repo.get_participant(id).await?;
    let training = repo.get_training(participant.training_id).await?;
    if training.status == TrainingStatus::Cancelled {
        return Err(RepositoryError::conflict(format!(
            "training {} is cancelled",
            training.id
        )));
    }
    let notes = update
        .notes
        .as_ref()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    repo.update_participant(id, update.status, participant.code95_points_awarded, notes)
        .await
}

pub async fn remove_participant<R: FullRepository + ?Sized>(
    repo: &R,
    id: ParticipantId,
) -> RepositoryResult<()> {
    let participant = repo.get_participant(id).await?;
    let training = repo.get_training(participant.training_id).await?;
    if training.status == TrainingStatus::Completed {
        return Err(RepositoryError::conflict(format!(
            "training {} is completed; participants are kept",
            training.id
        )));
    }
    repo.remove_participant(id).await
}

/// All `(participant, availability, date)` clashes of a training.
pub async fn availability_conflicts<R: FullRepository + ?Sized>(
    repo: &R,
    training_id: TrainingId,
) -> RepositoryResult<Vec<AvailabilityConflict>> {
    let training = repo.get_training(training_id).await?;
    let mut conflicts = Vec::new();
    for participant in repo.list_participants(training_id).await? {
        if !participant.status.occupies_seat() {
            continue;
        }
        let records = repo
            .list_availability_for_employee(participant.employee_id)
            .await?;
        conflicts.extend(conflicts_for(
            &training,
            participant.employee_id,
            Some(participant.id),
            &records,
        ));
    }
    conflicts.sort_by_key(|c| (c.date, c.employee_id));
    Ok(conflicts)
}

// ==================== Licenses ====================

/// Issue a license. When no expiry is given it is derived from the
/// certificate's validity.
pub async fn create_license<R: FullRepository + ?Sized>(
    repo: &R,
    employee_id: EmployeeId,
    draft: &LicenseDraft,
) -> RepositoryResult<EmployeeLicense> {
    draft.validate()?;
    let certificate = repo
        .get_certificate(draft.certificate_id)
        .await
        .map_err(|e| as_reference_error(e, "certificate_id"))?;
    let mut draft = draft.clone();
    if draft.expires_on.is_none() {
        draft.expires_on = expiry_after(draft.issued_on, certificate.validity_months)?;
    }
    repo.create_license(employee_id, &draft).await
}

pub async fn update_license<R: FullRepository + ?Sized>(
    repo: &R,
    id: LicenseId,
    draft: &LicenseDraft,
) -> RepositoryResult<EmployeeLicense> {
    draft.validate()?;
    repo.get_certificate(draft.certificate_id)
        .await
        .map_err(|e| as_reference_error(e, "certificate_id"))?;
    repo.update_license(id, draft).await
}

// ==================== Plans ====================

pub async fn create_plan<R: FullRepository + ?Sized>(
    repo: &R,
    draft: &PlanDraft,
) -> RepositoryResult<PreliminaryPlan> {
    draft.validate()?;
    if draft.status == PlanStatus::Converted {
        return Err(RepositoryError::validation(
            "status: plans are converted through the convert operation",
        ));
    }
    repo.create_plan(draft).await
}

/// Update a plan. Converted plans are frozen.
pub async fn update_plan<R: FullRepository + ?Sized>(
    repo: &R,
    id: PlanId,
    draft: &PlanDraft,
) -> RepositoryResult<PreliminaryPlan> {
    draft.validate()?;
    let existing = repo.get_plan(id).await?;
    if existing.status == PlanStatus::Converted {
        return Err(RepositoryError::conflict(format!(
            "plan {} has already been converted",
            id
        )));
    }
    if draft.status == PlanStatus::Converted {
        return Err(RepositoryError::validation(
            "status: plans are converted through the convert operation",
        ));
    }
    repo.update_plan(id, draft).await
}

/// Replace the items of a plan, keeping everything else.
pub async fn set_plan_items<R: FullRepository + ?Sized>(
    repo: &R,
    id: PlanId,
    items: Vec<PlanItem>,
) -> RepositoryResult<PreliminaryPlan> {
    let existing = repo.get_plan(id).await?;
    let mut draft = existing.to_draft();
    draft.items = items;
    update_plan(repo, id, &draft).await
}

// ==================== Profiles ====================

pub async fn create_profile<R: FullRepository + ?Sized>(
    repo: &R,
    draft: &ProfileDraft,
) -> RepositoryResult<Profile> {
    draft.validate()?;
    if let Some(employee_id) = draft.employee_id {
        repo.get_employee(employee_id)
            .await
            .map_err(|e| as_reference_error(e, "employee_id"))?;
    }
    let profile = repo.create_profile(draft).await?;
    info!(
        "Service layer: created profile {} ({}, role {})",
        profile.id, profile.email, profile.role
    );
    Ok(profile)
}

pub async fn update_profile<R: FullRepository + ?Sized>(
    repo: &R,
    id: ProfileId,
    draft: &ProfileDraft,
) -> RepositoryResult<Profile> {
    draft.validate()?;
    if let Some(employee_id) = draft.employee_id {
        repo.get_employee(employee_id)
            .await
            .map_err(|e| as_reference_error(e, "employee_id"))?;
    }
    repo.update_profile(id, draft).await
}
