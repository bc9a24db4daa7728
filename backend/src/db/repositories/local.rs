//! In-memory local repository implementation.
//!
//! This module provides a local implementation of all repository traits
//! suitable for unit testing and local development. All data is stored in
//! ordered maps, so listings come back in id order just like the Postgres
//! implementation. Foreign keys are checked the way the database schema
//! enforces them: dependent rows cascade, referenced catalog rows block
//! deletion.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::api::*;
use crate::db::repository::*;
use crate::models::normalize_email;

/// In-memory local repository.
///
/// # Example
/// ```
/// use training_hub::db::repositories::LocalRepository;
/// use training_hub::db::repository::PersonnelRepository;
/// use training_hub::api::EmployeeDraft;
///
/// # #[tokio::main]
/// # async fn main() {
/// let repo = LocalRepository::new();
/// let employee = repo
///     .create_employee(&EmployeeDraft::new("E-001", "Anna", "de Vries"))
///     .await
///     .unwrap();
/// assert_eq!(repo.list_employees().await.unwrap().len(), 1);
/// assert_eq!(employee.full_name(), "Anna de Vries");
/// # }
/// ```
#[derive(Clone)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
}

struct LocalData {
    employees: BTreeMap<EmployeeId, Employee>,
    availability: BTreeMap<AvailabilityId, Availability>,
    providers: BTreeMap<ProviderId, Provider>,
    courses: BTreeMap<CourseId, Course>,
    certificates: BTreeMap<CertificateId, CertificateDefinition>,
    trainings: BTreeMap<TrainingId, Training>,
    participants: BTreeMap<ParticipantId, TrainingParticipant>,
    licenses: BTreeMap<LicenseId, EmployeeLicense>,
    plans: BTreeMap<PlanId, PreliminaryPlan>,
    profiles: BTreeMap<ProfileId, Profile>,
    sessions: BTreeMap<String, AuthSession>,

    // ID counter shared by every table
    next_id: i64,

    // Connection health
    is_healthy: bool,
    // Checked calls left before one injected failure
    fail_after: Option<usize>,

    // Profile lookups: artificial latency and a read counter
    profile_delay: Option<Duration>,
    profile_reads: usize,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            employees: BTreeMap::new(),
            availability: BTreeMap::new(),
            providers: BTreeMap::new(),
            courses: BTreeMap::new(),
            certificates: BTreeMap::new(),
            trainings: BTreeMap::new(),
            participants: BTreeMap::new(),
            licenses: BTreeMap::new(),
            plans: BTreeMap::new(),
            profiles: BTreeMap::new(),
            sessions: BTreeMap::new(),
            next_id: 1,
            is_healthy: true,
            fail_after: None,
            profile_delay: None,
            profile_reads: 0,
        }
    }
}

impl LocalData {
    fn allocate_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn require_employee(&self, id: EmployeeId) -> RepositoryResult<&Employee> {
        self.employees
            .get(&id)
            .ok_or_else(|| RepositoryError::missing("employee", id))
    }

    fn require_course(&self, id: CourseId) -> RepositoryResult<&Course> {
        self.courses
            .get(&id)
            .ok_or_else(|| RepositoryError::missing("course", id))
    }

    fn require_training(&self, id: TrainingId) -> RepositoryResult<&Training> {
        self.trainings
            .get(&id)
            .ok_or_else(|| RepositoryError::missing("training", id))
    }

    fn check_provider_ref(&self, id: Option<ProviderId>) -> RepositoryResult<()> {
        match id {
            Some(id) if !self.providers.contains_key(&id) => Err(RepositoryError::validation(
                format!("provider {} does not exist", id),
            )),
            _ => Ok(()),
        }
    }

    fn check_certificate_ref(&self, id: Option<CertificateId>) -> RepositoryResult<()> {
        match id {
            Some(id) if !self.certificates.contains_key(&id) => Err(
                RepositoryError::validation(format!("certificate {} does not exist", id)),
            ),
            _ => Ok(()),
        }
    }

    fn check_course_ref(&self, id: Option<CourseId>) -> RepositoryResult<()> {
        match id {
            Some(id) if !self.courses.contains_key(&id) => Err(RepositoryError::validation(
                format!("course {} does not exist", id),
            )),
            _ => Ok(()),
        }
    }

    fn check_employee_ref(&self, id: Option<EmployeeId>) -> RepositoryResult<()> {
        match id {
            Some(id) if !self.employees.contains_key(&id) => Err(RepositoryError::validation(
                format!("employee {} does not exist", id),
            )),
            _ => Ok(()),
        }
    }

    fn check_plan_refs(&self, draft: &PlanDraft) -> RepositoryResult<()> {
        self.check_course_ref(draft.course_id)?;
        self.check_certificate_ref(draft.certificate_id)?;
        for item in &draft.items {
            self.check_employee_ref(Some(item.employee_id))?;
            self.check_certificate_ref(item.certificate_id)?;
        }
        Ok(())
    }

    fn email_taken(&self, email: &str, except: Option<ProfileId>) -> bool {
        let email = normalize_email(email);
        self.profiles
            .values()
            .any(|p| p.email == email && Some(p.id) != except)
    }
}

fn referenced(entity: &str, id: impl std::fmt::Display, by: &str) -> RepositoryError {
    RepositoryError::validation_with_context(
        format!("{} {} is still referenced by {}", entity, id, by),
        ErrorContext::default()
            .with_entity(entity)
            .with_entity_id(id),
    )
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(LocalData::default())),
        }
    }

    /// Set the health status for testing connection failures. Also drops a
    /// pending [`fail_after`](Self::fail_after).
    pub fn set_healthy(&self, healthy: bool) {
        let mut data = self.data.write();
        data.is_healthy = healthy;
        data.fail_after = None;
    }

    /// Make every `get_profile` wait `delay` before answering.
    pub fn set_profile_delay(&self, delay: Option<Duration>) {
        self.data.write().profile_delay = delay;
    }

    /// Number of `get_profile` calls that reached the store.
    pub fn profile_reads(&self) -> usize {
        self.data.read().profile_reads
    }

    /// Let `operations` calls through, then fail the next one with a
    /// retryable connection error. Later calls succeed again.
    pub fn fail_after(&self, operations: usize) {
        self.data.write().fail_after = Some(operations);
    }

    /// Clear all data from the repository.
    pub fn clear(&self) {
        let mut data = self.data.write();
        *data = LocalData {
            is_healthy: data.is_healthy,
            ..Default::default()
        };
    }

    /// Number of stored bearer-token sessions.
    pub fn session_count(&self) -> usize {
        self.data.read().sessions.len()
    }

    fn check_health(&self) -> RepositoryResult<()> {
        let mut data = self.data.write();
        let pending = data.fail_after;
        if let Some(left) = pending {
            data.fail_after = left.checked_sub(1);
            if left == 0 {
                return Err(RepositoryError::connection("Injected local repository failure"));
            }
        }
        if data.is_healthy {
            Ok(())
        } else {
            Err(RepositoryError::connection("Local repository is unhealthy"))
        }
    }
}

impl Default for LocalRepository {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Personnel
// =============================================================================

#[async_trait]
impl PersonnelRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(self.data.read().is_healthy)
    }

    async fn create_employee(&self, draft: &EmployeeDraft) -> RepositoryResult<Employee> {
        self.check_health()?;
        let mut data = self.data.write();
        let number = draft.employee_number.trim();
        if data.employees.values().any(|e| e.employee_number == number) {
            return Err(RepositoryError::conflict(format!(
                "employee number {} is already in use",
                number
            )));
        }
        let id = EmployeeId(data.allocate_id());
        let employee = Employee::from_draft(id, draft, Utc::now());
        data.employees.insert(id, employee.clone());
        Ok(employee)
    }

    async fn get_employee(&self, id: EmployeeId) -> RepositoryResult<Employee> {
        self.check_health()?;
        self.data.read().require_employee(id).cloned()
    }

    async fn list_employees(&self) -> RepositoryResult<Vec<Employee>> {
        self.check_health()?;
        Ok(self.data.read().employees.values().cloned().collect())
    }

    async fn update_employee(
        &self,
        id: EmployeeId,
        draft: &EmployeeDraft,
    ) -> RepositoryResult<Employee> {
        self.check_health()?;
        let mut data = self.data.write();
        let number = draft.employee_number.trim();
        if data
            .employees
            .values()
            .any(|e| e.employee_number == number && e.id != id)
        {
            return Err(RepositoryError::conflict(format!(
                "employee number {} is already in use",
                number
            )));
        }
        let employee = data
            .employees
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::missing("employee", id))?;
        employee.apply(draft, Utc::now());
        Ok(employee.clone())
    }

    async fn delete_employee(&self, id: EmployeeId) -> RepositoryResult<()> {
        self.check_health()?;
        let mut data = self.data.write();
        if data.employees.remove(&id).is_none() {
            return Err(RepositoryError::missing("employee", id));
        }
        data.participants.retain(|_, p| p.employee_id != id);
        data.licenses.retain(|_, l| l.employee_id != id);
        data.availability.retain(|_, a| a.employee_id != id);
        for plan in data.plans.values_mut() {
            plan.items.retain(|item| item.employee_id != id);
        }
        for profile in data.profiles.values_mut() {
            if profile.employee_id == Some(id) {
                profile.employee_id = None;
            }
        }
        Ok(())
    }

    async fn create_availability(
        &self,
        employee_id: EmployeeId,
        draft: &AvailabilityDraft,
    ) -> RepositoryResult<Availability> {
        self.check_health()?;
        let mut data = self.data.write();
        data.require_employee(employee_id)?;
        let id = AvailabilityId(data.allocate_id());
        let record = Availability::from_draft(id, employee_id, draft, Utc::now());
        data.availability.insert(id, record.clone());
        Ok(record)
    }

    async fn get_availability(&self, id: AvailabilityId) -> RepositoryResult<Availability> {
        self.check_health()?;
        self.data
            .read()
            .availability
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::missing("availability", id))
    }

    async fn list_availability_for_employee(
        &self,
        employee_id: EmployeeId,
    ) -> RepositoryResult<Vec<Availability>> {
        self.check_health()?;
        let data = self.data.read();
        data.require_employee(employee_id)?;
        let mut records: Vec<Availability> = data
            .availability
            .values()
            .filter(|a| a.employee_id == employee_id)
            .cloned()
            .collect();
        records.sort_by_key(|a| (a.start_date, a.id));
        Ok(records)
    }

    async fn list_availability(&self) -> RepositoryResult<Vec<Availability>> {
        self.check_health()?;
        let mut records: Vec<Availability> =
            self.data.read().availability.values().cloned().collect();
        records.sort_by_key(|a| (a.start_date, a.id));
        Ok(records)
    }

    async fn update_availability(
        &self,
        id: AvailabilityId,
        draft: &AvailabilityDraft,
    ) -> RepositoryResult<Availability> {
        self.check_health()?;
        let mut data = self.data.write();
        let record = data
            .availability
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::missing("availability", id))?;
        record.apply(draft, Utc::now());
        Ok(record.clone())
    }

    async fn delete_availability(&self, id: AvailabilityId) -> RepositoryResult<()> {
        self.check_health()?;
        self.data
            .write()
            .availability
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::missing("availability", id))
    }
}

// =============================================================================
// Catalog
// =============================================================================

#[async_trait]
impl CatalogRepository for LocalRepository {
    async fn create_provider(&self, draft: &ProviderDraft) -> RepositoryResult<Provider> {
        self.check_health()?;
        let mut data = self.data.write();
        let id = ProviderId(data.allocate_id());
        let provider = Provider::from_draft(id, draft, Utc::now());
        data.providers.insert(id, provider.clone());
        Ok(provider)
    }

    async fn get_provider(&self, id: ProviderId) -> RepositoryResult<Provider> {
        self.check_health()?;
        self.data
            .read()
            .providers
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::missing("provider", id))
    }

    async fn list_providers(&self) -> RepositoryResult<Vec<Provider>> {
        self.check_health()?;
        Ok(self.data.read().providers.values().cloned().collect())
    }

    async fn update_provider(
        &self,
        id: ProviderId,
        draft: &ProviderDraft,
    ) -> RepositoryResult<Provider> {
        self.check_health()?;
        let mut data = self.data.write();
        let provider = data
            .providers
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::missing("provider", id))?;
        provider.apply(draft, Utc::now());
        Ok(provider.clone())
    }

    async fn delete_provider(&self, id: ProviderId) -> RepositoryResult<()> {
        self.check_health()?;
        let mut data = self.data.write();
        if !data.providers.contains_key(&id) {
            return Err(RepositoryError::missing("provider", id));
        }
        if data.courses.values().any(|c| c.provider_id == Some(id)) {
            return Err(referenced("provider", id, "a course"));
        }
        if data.trainings.values().any(|t| t.provider_id == Some(id)) {
            return Err(referenced("provider", id, "a training"));
        }
        data.providers.remove(&id);
        Ok(())
    }

    async fn create_course(&self, draft: &CourseDraft) -> RepositoryResult<Course> {
        self.check_health()?;
        let mut data = self.data.write();
        data.check_provider_ref(draft.provider_id)?;
        data.check_certificate_ref(draft.certificate_id)?;
        let id = CourseId(data.allocate_id());
        let course = Course::from_draft(id, draft, Utc::now());
        data.courses.insert(id, course.clone());
        Ok(course)
    }

    async fn get_course(&self, id: CourseId) -> RepositoryResult<Course> {
        self.check_health()?;
        self.data.read().require_course(id).cloned()
    }

    async fn list_courses(&self) -> RepositoryResult<Vec<Course>> {
        self.check_health()?;
        Ok(self.data.read().courses.values().cloned().collect())
    }

    async fn update_course(&self, id: CourseId, draft: &CourseDraft) -> RepositoryResult<Course> {
        self.check_health()?;
        let mut data = self.data.write();
        data.check_provider_ref(draft.provider_id)?;
        data.check_certificate_ref(draft.certificate_id)?;
        let course = data
            .courses
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::missing("course", id))?;
        course.apply(draft, Utc::now());
        Ok(course.clone())
    }

    async fn delete_course(&self, id: CourseId) -> RepositoryResult<()> {
        self.check_health()?;
        let mut data = self.data.write();
        data.require_course(id)?;
        if data.trainings.values().any(|t| t.course_id == id) {
            return Err(referenced("course", id, "a training"));
        }
        if data.plans.values().any(|p| p.course_id == Some(id)) {
            return Err(referenced("course", id, "a plan"));
        }
        data.courses.remove(&id);
        Ok(())
    }

    async fn create_certificate(
        &self,
        draft: &CertificateDefinitionDraft,
    ) -> RepositoryResult<CertificateDefinition> {
        self.check_health()?;
        let mut data = self.data.write();
        let id = CertificateId(data.allocate_id());
        let certificate = CertificateDefinition::from_draft(id, draft, Utc::now());
        data.certificates.insert(id, certificate.clone());
        Ok(certificate)
    }

    async fn get_certificate(&self, id: CertificateId) -> RepositoryResult<CertificateDefinition> {
        self.check_health()?;
        self.data
            .read()
            .certificates
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::missing("certificate", id))
    }

    async fn list_certificates(&self) -> RepositoryResult<Vec<CertificateDefinition>> {
        self.check_health()?;
        Ok(self.data.read().certificates.values().cloned().collect())
    }

    async fn update_certificate(
        &self,
        id: CertificateId,
        draft: &CertificateDefinitionDraft,
    ) -> RepositoryResult<CertificateDefinition> {
        self.check_health()?;
        let mut data = self.data.write();
        let certificate = data
            .certificates
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::missing("certificate", id))?;
        certificate.apply(draft, Utc::now());
        Ok(certificate.clone())
    }

    async fn delete_certificate(&self, id: CertificateId) -> RepositoryResult<()> {
        self.check_health()?;
        let mut data = self.data.write();
        if !data.certificates.contains_key(&id) {
            return Err(RepositoryError::missing("certificate", id));
        }
        if data.courses.values().any(|c| c.certificate_id == Some(id)) {
            return Err(referenced("certificate", id, "a course"));
        }
        if data.licenses.values().any(|l| l.certificate_id == id) {
            return Err(referenced("certificate", id, "a license"));
        }
        if data.plans.values().any(|p| {
            p.certificate_id == Some(id) || p.items.iter().any(|i| i.certificate_id == Some(id))
        }) {
            return Err(referenced("certificate", id, "a plan"));
        }
        data.certificates.remove(&id);
        Ok(())
    }
}

// =============================================================================
// Trainings
// =============================================================================

#[async_trait]
impl TrainingRepository for LocalRepository {
    async fn create_training(&self, draft: &TrainingDraft) -> RepositoryResult<Training> {
        self.check_health()?;
        let mut data = self.data.write();
        data.check_course_ref(Some(draft.course_id))?;
        data.check_provider_ref(draft.provider_id)?;
        let id = TrainingId(data.allocate_id());
        let training = Training::from_draft(id, draft, Utc::now());
        data.trainings.insert(id, training.clone());
        Ok(training)
    }

    async fn get_training(&self, id: TrainingId) -> RepositoryResult<Training> {
        self.check_health()?;
        self.data.read().require_training(id).cloned()
    }

    async fn list_trainings(&self) -> RepositoryResult<Vec<Training>> {
        self.check_health()?;
        Ok(self.data.read().trainings.values().cloned().collect())
    }

    async fn update_training(
        &self,
        id: TrainingId,
        draft: &TrainingDraft,
    ) -> RepositoryResult<Training> {
        self.check_health()?;
        let mut data = self.data.write();
        data.check_course_ref(Some(draft.course_id))?;
        data.check_provider_ref(draft.provider_id)?;
        let training = data
            .trainings
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::missing("training", id))?;
        training.apply(draft, Utc::now());
        Ok(training.clone())
    }

    async fn set_training_status(
        &self,
        id: TrainingId,
        status: TrainingStatus,
    ) -> RepositoryResult<Training> {
        self.check_health()?;
        let mut data = self.data.write();
        let training = data
            .trainings
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::missing("training", id))?;
        training.status = status;
        training.updated_at = Utc::now();
        Ok(training.clone())
    }

    async fn delete_training(&self, id: TrainingId) -> RepositoryResult<()> {
        self.check_health()?;
        let mut data = self.data.write();
        if data.trainings.remove(&id).is_none() {
            return Err(RepositoryError::missing("training", id));
        }
        data.participants.retain(|_, p| p.training_id != id);
        for plan in data.plans.values_mut() {
            if plan.converted_training_id == Some(id) {
                plan.converted_training_id = None;
            }
        }
        for license in data.licenses.values_mut() {
            if license.source_training_id == Some(id) {
                license.source_training_id = None;
            }
        }
        Ok(())
    }

    async fn add_participant(
        &self,
        training_id: TrainingId,
        draft: &ParticipantDraft,
    ) -> RepositoryResult<TrainingParticipant> {
        self.check_health()?;
        let mut data = self.data.write();
        let training = data.require_training(training_id)?;
        let capacity = match training.max_participants {
            Some(max) => Some(max),
            None => data.require_course(training.course_id)?.max_participants,
        };
        data.check_employee_ref(Some(draft.employee_id))?;
        if data
            .participants
            .values()
            .any(|p| p.training_id == training_id && p.employee_id == draft.employee_id)
        {
            return Err(RepositoryError::conflict_with_context(
                format!(
                    "employee {} is already a participant of training {}",
                    draft.employee_id, training_id
                ),
                ErrorContext::new("add_participant").with_entity("participant"),
            ));
        }
        if let Some(max) = capacity {
            let taken = data
                .participants
                .values()
                .filter(|p| p.training_id == training_id && p.status.occupies_seat())
                .count();
            if taken >= max as usize {
                return Err(training_full(training_id, taken, max));
            }
        }
        let id = ParticipantId(data.allocate_id());
        let participant = TrainingParticipant::from_draft(id, training_id, draft, Utc::now());
        data.participants.insert(id, participant.clone());
        Ok(participant)
    }

    async fn get_participant(&self, id: ParticipantId) -> RepositoryResult<TrainingParticipant> {
        self.check_health()?;
        self.data
            .read()
            .participants
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::missing("participant", id))
    }

    async fn list_participants(
        &self,
        training_id: TrainingId,
    ) -> RepositoryResult<Vec<TrainingParticipant>> {
        self.check_health()?;
        let data = self.data.read();
        data.require_training(training_id)?;
        Ok(data
            .participants
            .values()
            .filter(|p| p.training_id == training_id)
            .cloned()
            .collect())
    }

    async fn list_participations(
        &self,
        employee_id: EmployeeId,
    ) -> RepositoryResult<Vec<TrainingParticipant>> {
        self.check_health()?;
        Ok(self
            .data
            .read()
            .participants
            .values()
            .filter(|p| p.employee_id == employee_id)
            .cloned()
            .collect())
    }

    async fn update_participant(
        &self,
        id: ParticipantId,
        status: ParticipantStatus,
        code95_points_awarded: u32,
        notes: Option<String>,
    ) -> RepositoryResult<TrainingParticipant> {
        self.check_health()?;
        let mut data = self.data.write();
        let participant = data
            .participants
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::missing("participant", id))?;
        participant.status = status;
        participant.code95_points_awarded = code95_points_awarded;
        participant.notes = notes;
        participant.updated_at = Utc::now();
        Ok(participant.clone())
    }

    async fn remove_participant(&self, id: ParticipantId) -> RepositoryResult<()> {
        self.check_health()?;
        self.data
            .write()
            .participants
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::missing("participant", id))
    }
}

// =============================================================================
// Licenses
// =============================================================================

#[async_trait]
impl ComplianceRepository for LocalRepository {
    async fn create_license(
        &self,
        employee_id: EmployeeId,
        draft: &LicenseDraft,
    ) -> RepositoryResult<EmployeeLicense> {
        self.check_health()?;
        let mut data = self.data.write();
        data.require_employee(employee_id)?;
        data.check_certificate_ref(Some(draft.certificate_id))?;
        let id = LicenseId(data.allocate_id());
        let license = EmployeeLicense::from_draft(id, employee_id, draft, Utc::now());
        data.licenses.insert(id, license.clone());
        Ok(license)
    }

    async fn get_license(&self, id: LicenseId) -> RepositoryResult<EmployeeLicense> {
        self.check_health()?;
        self.data
            .read()
            .licenses
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::missing("license", id))
    }

    async fn list_licenses_for_employee(
        &self,
        employee_id: EmployeeId,
    ) -> RepositoryResult<Vec<EmployeeLicense>> {
        self.check_health()?;
        let data = self.data.read();
        data.require_employee(employee_id)?;
        let mut licenses: Vec<EmployeeLicense> = data
            .licenses
            .values()
            .filter(|l| l.employee_id == employee_id)
            .cloned()
            .collect();
        licenses.sort_by_key(|l| (l.issued_on, l.id));
        Ok(licenses)
    }

    async fn list_licenses(&self) -> RepositoryResult<Vec<EmployeeLicense>> {
        self.check_health()?;
        let mut licenses: Vec<EmployeeLicense> =
            self.data.read().licenses.values().cloned().collect();
        licenses.sort_by_key(|l| (l.issued_on, l.id));
        Ok(licenses)
    }

    async fn update_license(
        &self,
        id: LicenseId,
        draft: &LicenseDraft,
    ) -> RepositoryResult<EmployeeLicense> {
        self.check_health()?;
        let mut data = self.data.write();
        data.check_certificate_ref(Some(draft.certificate_id))?;
        let license = data
            .licenses
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::missing("license", id))?;
        license.apply(draft, Utc::now());
        Ok(license.clone())
    }

    async fn delete_license(&self, id: LicenseId) -> RepositoryResult<()> {
        self.check_health()?;
        self.data
            .write()
            .licenses
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::missing("license", id))
    }
}

// =============================================================================
// Plans
// =============================================================================

#[async_trait]
impl PlanningRepository for LocalRepository {
    async fn create_plan(&self, draft: &PlanDraft) -> RepositoryResult<PreliminaryPlan> {
        self.check_health()?;
        let mut data = self.data.write();
        data.check_plan_refs(draft)?;
        let id = PlanId(data.allocate_id());
        let plan = PreliminaryPlan::from_draft(id, draft, Utc::now());
        data.plans.insert(id, plan.clone());
        Ok(plan)
    }

    async fn get_plan(&self, id: PlanId) -> RepositoryResult<PreliminaryPlan> {
        self.check_health()?;
        self.data
            .read()
            .plans
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::missing("plan", id))
    }

    async fn list_plans(&self) -> RepositoryResult<Vec<PreliminaryPlan>> {
        self.check_health()?;
        Ok(self.data.read().plans.values().cloned().collect())
    }

    async fn update_plan(
        &self,
        id: PlanId,
        draft: &PlanDraft,
    ) -> RepositoryResult<PreliminaryPlan> {
        self.check_health()?;
        let mut data = self.data.write();
        data.check_plan_refs(draft)?;
        let plan = data
            .plans
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::missing("plan", id))?;
        plan.apply(draft, Utc::now());
        Ok(plan.clone())
    }

    async fn mark_plan_converted(
        &self,
        id: PlanId,
        training_id: TrainingId,
    ) -> RepositoryResult<PreliminaryPlan> {
        self.check_health()?;
        let mut data = self.data.write();
        data.require_training(training_id)?;
        let plan = data
            .plans
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::missing("plan", id))?;
        plan.status = PlanStatus::Converted;
        plan.converted_training_id = Some(training_id);
        plan.updated_at = Utc::now();
        Ok(plan.clone())
    }

    async fn delete_plan(&self, id: PlanId) -> RepositoryResult<()> {
        self.check_health()?;
        self.data
            .write()
            .plans
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::missing("plan", id))
    }
}

// =============================================================================
// Profiles & sessions
// =============================================================================

#[async_trait]
impl AccessRepository for LocalRepository {
    async fn create_profile(&self, draft: &ProfileDraft) -> RepositoryResult<Profile> {
        self.check_health()?;
        let mut data = self.data.write();
        if data.email_taken(&draft.email, None) {
            return Err(RepositoryError::conflict(format!(
                "a profile with email {} already exists",
                normalize_email(&draft.email)
            )));
        }
        data.check_employee_ref(draft.employee_id)?;
        let id = ProfileId(data.allocate_id());
        let profile = Profile::from_draft(id, draft, Utc::now());
        data.profiles.insert(id, profile.clone());
        Ok(profile)
    }

    async fn get_profile(&self, id: ProfileId) -> RepositoryResult<Profile> {
        self.check_health()?;
        let delay = {
            let mut data = self.data.write();
            data.profile_reads += 1;
            data.profile_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.data
            .read()
            .profiles
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::missing("profile", id))
    }

    async fn find_profile_by_email(&self, email: &str) -> RepositoryResult<Option<Profile>> {
        self.check_health()?;
        let email = normalize_email(email);
        Ok(self
            .data
            .read()
            .profiles
            .values()
            .find(|p| p.email == email)
            .cloned())
    }

    async fn list_profiles(&self) -> RepositoryResult<Vec<Profile>> {
        self.check_health()?;
        Ok(self.data.read().profiles.values().cloned().collect())
    }

    async fn update_profile(
        &self,
        id: ProfileId,
        draft: &ProfileDraft,
    ) -> RepositoryResult<Profile> {
        self.check_health()?;
        let mut data = self.data.write();
        if data.email_taken(&draft.email, Some(id)) {
            return Err(RepositoryError::conflict(format!(
                "a profile with email {} already exists",
                normalize_email(&draft.email)
            )));
        }
        data.check_employee_ref(draft.employee_id)?;
        let profile = data
            .profiles
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::missing("profile", id))?;
        profile.apply(draft, Utc::now());
        Ok(profile.clone())
    }

    async fn store_session(&self, session: &AuthSession) -> RepositoryResult<()> {
        self.check_health()?;
        let mut data = self.data.write();
        if !data.profiles.contains_key(&session.profile_id) {
            return Err(RepositoryError::validation(format!(
                "profile {} does not exist",
                session.profile_id
            )));
        }
        data.sessions
            .insert(session.token_hash.clone(), session.clone());
        Ok(())
    }

    async fn find_session(&self, token_hash: &str) -> RepositoryResult<Option<AuthSession>> {
        self.check_health()?;
        Ok(self.data.read().sessions.get(token_hash).cloned())
    }

    async fn delete_session(&self, token_hash: &str) -> RepositoryResult<bool> {
        self.check_health()?;
        Ok(self.data.write().sessions.remove(token_hash).is_some())
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> RepositoryResult<usize> {
        self.check_health()?;
        let mut data = self.data.write();
        let before = data.sessions.len();
        data.sessions.retain(|_, s| !s.is_expired(now));
        Ok(before - data.sessions.len())
    }
}
