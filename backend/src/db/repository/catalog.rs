//! Providers, courses and certificate definitions.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::api::{CertificateId, CourseId, ProviderId};
use crate::models::{
    CertificateDefinition, CertificateDefinitionDraft, Course, CourseDraft, Provider,
    ProviderDraft,
};

/// Repository trait for the training catalog.
///
/// Deleting a provider, course or certificate definition that is still
/// referenced elsewhere fails with `RepositoryError::ValidationError`.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    // ==================== Providers ====================

    async fn create_provider(&self, draft: &ProviderDraft) -> RepositoryResult<Provider>;
    async fn get_provider(&self, id: ProviderId) -> RepositoryResult<Provider>;
    async fn list_providers(&self) -> RepositoryResult<Vec<Provider>>;
    async fn update_provider(
        &self,
        id: ProviderId,
        draft: &ProviderDraft,
    ) -> RepositoryResult<Provider>;
    async fn delete_provider(&self, id: ProviderId) -> RepositoryResult<()>;

    // ==================== Courses ====================

    async fn create_course(&self, draft: &CourseDraft) -> RepositoryResult<Course>;
    async fn get_course(&self, id: CourseId) -> RepositoryResult<Course>;
    async fn list_courses(&self) -> RepositoryResult<Vec<Course>>;
    async fn update_course(&self, id: CourseId, draft: &CourseDraft) -> RepositoryResult<Course>;
    async fn delete_course(&self, id: CourseId) -> RepositoryResult<()>;

    // ==================== Certificate definitions ====================

    async fn create_certificate(
        &self,
        draft: &CertificateDefinitionDraft,
    ) -> RepositoryResult<CertificateDefinition>;
    async fn get_certificate(&self, id: CertificateId) -> RepositoryResult<CertificateDefinition>;
    async fn list_certificates(&self) -> RepositoryResult<Vec<CertificateDefinition>>;
    async fn update_certificate(
        &self,
        id: CertificateId,
        draft: &CertificateDefinitionDraft,
    ) -> RepositoryResult<CertificateDefinition>;
    async fn delete_certificate(&self, id: CertificateId) -> RepositoryResult<()>;
}
