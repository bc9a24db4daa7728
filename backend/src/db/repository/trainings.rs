//! Scheduled trainings and their participants.

use async_trait::async_trait;

use super::error::{ErrorContext, RepositoryError, RepositoryResult};
use crate::api::{EmployeeId, ParticipantId, TrainingId};
use crate::models::{
    ParticipantDraft, ParticipantStatus, Training, TrainingDraft, TrainingParticipant,
    TrainingStatus,
};

/// Rejection for a training whose seats are all taken.
pub fn training_full(training_id: TrainingId, taken: usize, capacity: u32) -> RepositoryError {
    RepositoryError::conflict_with_context(
        format!(
            "training {} is full ({} of {} seats taken)",
            training_id, taken, capacity
        ),
        ErrorContext::new("add_participant")
            .with_entity("training")
            .with_entity_id(training_id)
            .with_details(format!("capacity={}", capacity)),
    )
}

/// Repository trait for trainings and participants.
///
/// Availability and status rules are enforced by the service layer.
/// Implementations guarantee that an employee appears at most once per
/// training and that the seat count is checked in the same step as the
/// insert.
#[async_trait]
pub trait TrainingRepository: Send + Sync {
    // ==================== Trainings ====================

    async fn create_training(&self, draft: &TrainingDraft) -> RepositoryResult<Training>;

    /// # Errors
    /// `RepositoryError::NotFound` if the training doesn't exist.
    async fn get_training(&self, id: TrainingId) -> RepositoryResult<Training>;

    /// All trainings ordered by id.
    async fn list_trainings(&self) -> RepositoryResult<Vec<Training>>;

    async fn update_training(
        &self,
        id: TrainingId,
        draft: &TrainingDraft,
    ) -> RepositoryResult<Training>;

    async fn set_training_status(
        &self,
        id: TrainingId,
        status: TrainingStatus,
    ) -> RepositoryResult<Training>;

    /// Delete a training and its participants.
    async fn delete_training(&self, id: TrainingId) -> RepositoryResult<()>;

    // ==================== Participants ====================

    /// Seats are the training's `max_participants`, else the course's;
    /// cancelled participants do not hold one.
    ///
    /// # Errors
    /// `RepositoryError::Conflict` if the employee is already a participant
    /// or the training is full (see [`training_full`]).
    async fn add_participant(
        &self,
        training_id: TrainingId,
        draft: &ParticipantDraft,
    ) -> RepositoryResult<TrainingParticipant>;

    async fn get_participant(&self, id: ParticipantId) -> RepositoryResult<TrainingParticipant>;

    async fn list_participants(
        &self,
        training_id: TrainingId,
    ) -> RepositoryResult<Vec<TrainingParticipant>>;

    async fn list_participations(
        &self,
        employee_id: EmployeeId,
    ) -> RepositoryResult<Vec<TrainingParticipant>>;

    /// Update status, awarded points and notes of a participant.
    async fn update_participant(
        &self,
        id: ParticipantId,
        status: ParticipantStatus,
        code95_points_awarded: u32,
        notes: Option<String>,
    ) -> RepositoryResult<TrainingParticipant>;

    async fn remove_participant(&self, id: ParticipantId) -> RepositoryResult<()>;
}
