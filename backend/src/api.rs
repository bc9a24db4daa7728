//! Public API surface for the backend.
//!
//! Identifier newtypes live here so every layer (models, repositories, HTTP
//! DTOs) agrees on them. The domain types are re-exported for convenience.

use crate::define_id_type;

define_id_type!(i64, EmployeeId);
define_id_type!(i64, ProviderId);
define_id_type!(i64, CourseId);
define_id_type!(i64, CertificateId);
define_id_type!(i64, TrainingId);
define_id_type!(i64, ParticipantId);
define_id_type!(i64, LicenseId);
define_id_type!(i64, AvailabilityId);
define_id_type!(i64, PlanId);
define_id_type!(i64, ProfileId);

pub use crate::models::{
    AuthSession, Availability, AvailabilityDraft, AvailabilityKind, CertificateDefinition,
    CertificateDefinitionDraft, Course, CourseDraft, Employee, EmployeeDraft, EmployeeLicense,
    ExpiryStatus, LicenseDraft, ParticipantDraft, ParticipantStatus, Permission, PlanDraft,
    PlanItem, PlanStatus, PreliminaryPlan, Profile, ProfileDraft, Provider, ProviderDraft, Role,
    Training, TrainingDraft, TrainingParticipant, TrainingSession, TrainingStatus,
    ValidationError,
};
