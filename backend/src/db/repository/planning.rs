//! Preliminary plans.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::api::{PlanId, TrainingId};
use crate::models::{PlanDraft, PreliminaryPlan};

#[async_trait]
pub trait PlanningRepository: Send + Sync {
    async fn create_plan(&self, draft: &PlanDraft) -> RepositoryResult<PreliminaryPlan>;
    async fn get_plan(&self, id: PlanId) -> RepositoryResult<PreliminaryPlan>;
    async fn list_plans(&self) -> RepositoryResult<Vec<PreliminaryPlan>>;
    async fn update_plan(&self, id: PlanId, draft: &PlanDraft)
        -> RepositoryResult<PreliminaryPlan>;

    /// Mark a plan as converted into the given training.
    async fn mark_plan_converted(
        &self,
        id: PlanId,
        training_id: TrainingId,
    ) -> RepositoryResult<PreliminaryPlan>;

    async fn delete_plan(&self, id: PlanId) -> RepositoryResult<()>;
}
