//! Employees and their availability records.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::api::{AvailabilityId, EmployeeId};
use crate::models::{Availability, AvailabilityDraft, Employee, EmployeeDraft};

/// Repository trait for employee records.
///
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait PersonnelRepository: Send + Sync {
    // ==================== Health & Connection ====================

    /// Check if the database connection is healthy.
    ///
    /// # Returns
    /// - `Ok(true)` if connection is healthy
    /// - `Ok(false)` if connection is unhealthy but no error occurred
    /// - `Err(RepositoryError)` if an error occurred during the check
    async fn health_check(&self) -> RepositoryResult<bool>;

    // ==================== Employees ====================

    /// Store a new employee. The draft has already been validated.
    async fn create_employee(&self, draft: &EmployeeDraft) -> RepositoryResult<Employee>;

    /// # Errors
    /// `RepositoryError::NotFound` if the employee doesn't exist.
    async fn get_employee(&self, id: EmployeeId) -> RepositoryResult<Employee>;

    /// All employees ordered by id.
    async fn list_employees(&self) -> RepositoryResult<Vec<Employee>>;

    async fn update_employee(
        &self,
        id: EmployeeId,
        draft: &EmployeeDraft,
    ) -> RepositoryResult<Employee>;

    /// Delete an employee together with their participations, licenses,
    /// availability records and plan items.
    async fn delete_employee(&self, id: EmployeeId) -> RepositoryResult<()>;

    // ==================== Availability ====================

    async fn create_availability(
        &self,
        employee_id: EmployeeId,
        draft: &AvailabilityDraft,
    ) -> RepositoryResult<Availability>;

    async fn get_availability(&self, id: AvailabilityId) -> RepositoryResult<Availability>;

    /// Records for one employee ordered by start date.
    async fn list_availability_for_employee(
        &self,
        employee_id: EmployeeId,
    ) -> RepositoryResult<Vec<Availability>>;

    /// All records ordered by start date.
    async fn list_availability(&self) -> RepositoryResult<Vec<Availability>>;

    async fn update_availability(
        &self,
        id: AvailabilityId,
        draft: &AvailabilityDraft,
    ) -> RepositoryResult<Availability>;

    async fn delete_availability(&self, id: AvailabilityId) -> RepositoryResult<()>;
}
