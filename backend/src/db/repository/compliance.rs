//! Licenses held by employees.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::api::{EmployeeId, LicenseId};
use crate::models::{EmployeeLicense, LicenseDraft};

#[async_trait]
pub trait ComplianceRepository: Send + Sync {
    async fn create_license(
        &self,
        employee_id: EmployeeId,
        draft: &LicenseDraft,
    ) -> RepositoryResult<EmployeeLicense>;

    async fn get_license(&self, id: LicenseId) -> RepositoryResult<EmployeeLicense>;

    /// Licenses of one employee ordered by issue date.
    async fn list_licenses_for_employee(
        &self,
        employee_id: EmployeeId,
    ) -> RepositoryResult<Vec<EmployeeLicense>>;

    async fn list_licenses(&self) -> RepositoryResult<Vec<EmployeeLicense>>;

    async fn update_license(
        &self,
        id: LicenseId,
        draft: &LicenseDraft,
    ) -> RepositoryResult<EmployeeLicense>;

    async fn delete_license(&self, id: LicenseId) -> RepositoryResult<()>;
}
