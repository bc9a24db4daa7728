//! Row types for the Diesel schema and their conversions to domain records.
//!
//! Insert/update values are built from a normalized domain record (created
//! with a placeholder id) so trimming rules live in one place.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde_json::Value;

use super::schema::{
    auth_sessions, certificate_definitions, courses, employee_availability, employee_licenses,
    employees, preliminary_plans, profiles, providers, training_participants, trainings,
};
use crate::api::*;
use crate::db::repository::{ErrorContext, RepositoryError, RepositoryResult};

// =============================================================================
// Column helpers
// =============================================================================

pub(super) fn parse_text<T>(column: &str, value: &str) -> RepositoryResult<T>
where
    T: FromStr<Err = String>,
{
    value.parse().map_err(|e: String| {
        RepositoryError::internal_with_context(
            e,
            ErrorContext::new("decode_row").with_details(format!("column={}", column)),
        )
    })
}

pub(super) fn to_i32(field: &str, value: u32) -> RepositoryResult<i32> {
    i32::try_from(value)
        .map_err(|_| RepositoryError::validation(format!("{}: {} is out of range", field, value)))
}

pub(super) fn to_u32(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

pub(super) fn to_json<T: serde::Serialize>(column: &str, value: &T) -> RepositoryResult<Value> {
    serde_json::to_value(value).map_err(|e| {
        RepositoryError::internal_with_context(
            format!("Failed to encode JSON: {}", e),
            ErrorContext::new("encode_row").with_details(format!("column={}", column)),
        )
    })
}

pub(super) fn from_json<T: serde::de::DeserializeOwned>(
    column: &str,
    value: Value,
) -> RepositoryResult<T> {
    serde_json::from_value(value).map_err(|e| {
        RepositoryError::internal_with_context(
            format!("Failed to parse JSON: {}", e),
            ErrorContext::new("decode_row").with_details(format!("column={}", column)),
        )
    })
}

fn opt_i32(field: &str, value: Option<u32>) -> RepositoryResult<Option<i32>> {
    value.map(|v| to_i32(field, v)).transpose()
}

// =============================================================================
// Employees
// =============================================================================

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = employees)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EmployeeRow {
    pub id: i64,
    pub employee_number: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub job_title: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub hire_date: Option<NaiveDate>,
    pub is_driver: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = employees)]
#[diesel(treat_none_as_null = true)]
pub struct EmployeeValues {
    pub employee_number: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub job_title: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub hire_date: Option<NaiveDate>,
    pub is_driver: bool,
    pub active: bool,
    pub updated_at: DateTime<Utc>,
}

impl EmployeeValues {
    pub fn from_draft(draft: &EmployeeDraft, now: DateTime<Utc>) -> Self {
        let e = Employee::from_draft(EmployeeId(0), draft, now);
        Self {
            employee_number: e.employee_number,
            first_name: e.first_name,
            last_name: e.last_name,
            email: e.email,
            phone: e.phone,
            department: e.department,
            job_title: e.job_title,
            date_of_birth: e.date_of_birth,
            hire_date: e.hire_date,
            is_driver: e.is_driver,
            active: e.active,
            updated_at: now,
        }
    }
}

impl From<EmployeeRow> for Employee {
    fn from(row: EmployeeRow) -> Self {
        Employee {
            id: EmployeeId(row.id),
            employee_number: row.employee_number,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            department: row.department,
            job_title: row.job_title,
            date_of_birth: row.date_of_birth,
            hire_date: row.hire_date,
            is_driver: row.is_driver,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// =============================================================================
// Availability
// =============================================================================

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = employee_availability)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AvailabilityRow {
    pub id: i64,
    pub employee_id: i64,
    pub kind: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = employee_availability)]
pub struct NewAvailabilityRow {
    pub employee_id: i64,
    #[diesel(embed)]
    pub values: AvailabilityValues,
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = employee_availability)]
#[diesel(treat_none_as_null = true)]
pub struct AvailabilityValues {
    pub kind: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl AvailabilityValues {
    pub fn from_draft(draft: &AvailabilityDraft, now: DateTime<Utc>) -> Self {
        let a = Availability::from_draft(AvailabilityId(0), EmployeeId(0), draft, now);
        Self {
            kind: a.kind.as_str().to_string(),
            start_date: a.start_date,
            end_date: a.end_date,
            notes: a.notes,
            updated_at: now,
        }
    }
}

impl TryFrom<AvailabilityRow> for Availability {
    type Error = RepositoryError;

    fn try_from(row: AvailabilityRow) -> RepositoryResult<Self> {
        Ok(Availability {
            id: AvailabilityId(row.id),
            employee_id: EmployeeId(row.employee_id),
            kind: parse_text("kind", &row.kind)?,
            start_date: row.start_date,
            end_date: row.end_date,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// =============================================================================
// Providers
// =============================================================================

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = providers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProviderRow {
    pub id: i64,
    pub name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = providers)]
#[diesel(treat_none_as_null = true)]
pub struct ProviderValues {
    pub name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub active: bool,
    pub updated_at: DateTime<Utc>,
}

impl ProviderValues {
    pub fn from_draft(draft: &ProviderDraft, now: DateTime<Utc>) -> Self {
        let p = Provider::from_draft(ProviderId(0), draft, now);
        Self {
            name: p.name,
            contact_name: p.contact_name,
            email: p.email,
            phone: p.phone,
            website: p.website,
            address: p.address,
            notes: p.notes,
            active: p.active,
            updated_at: now,
        }
    }
}

impl From<ProviderRow> for Provider {
    fn from(row: ProviderRow) -> Self {
        Provider {
            id: ProviderId(row.id),
            name: row.name,
            contact_name: row.contact_name,
            email: row.email,
            phone: row.phone,
            website: row.website,
            address: row.address,
            notes: row.notes,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// =============================================================================
// Certificate definitions
// =============================================================================

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = certificate_definitions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CertificateRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub validity_months: Option<i32>,
    pub reminder_days: i32,
    pub is_code95: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = certificate_definitions)]
#[diesel(treat_none_as_null = true)]
pub struct CertificateValues {
    pub name: String,
    pub description: Option<String>,
    pub validity_months: Option<i32>,
    pub reminder_days: i32,
    pub is_code95: bool,
    pub active: bool,
    pub updated_at: DateTime<Utc>,
}

impl CertificateValues {
    pub fn from_draft(
        draft: &CertificateDefinitionDraft,
        now: DateTime<Utc>,
    ) -> RepositoryResult<Self> {
        let c = CertificateDefinition::from_draft(CertificateId(0), draft, now);
        Ok(Self {
            name: c.name,
            description: c.description,
            validity_months: opt_i32("validity_months", c.validity_months)?,
            reminder_days: to_i32("reminder_days", c.reminder_days)?,
            is_code95: c.is_code95,
            active: c.active,
            updated_at: now,
        })
    }
}

impl From<CertificateRow> for CertificateDefinition {
    fn from(row: CertificateRow) -> Self {
        CertificateDefinition {
            id: CertificateId(row.id),
            name: row.name,
            description: row.description,
            validity_months: row.validity_months.map(to_u32),
            reminder_days: to_u32(row.reminder_days),
            is_code95: row.is_code95,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// =============================================================================
// Courses
// =============================================================================

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = courses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CourseRow {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub provider_id: Option<i64>,
    pub duration_hours: f64,
    pub code95_points: i32,
    pub certificate_id: Option<i64>,
    pub max_participants: Option<i32>,
    pub price: Option<f64>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = courses)]
#[diesel(treat_none_as_null = true)]
pub struct CourseValues {
    pub title: String,
    pub description: Option<String>,
    pub provider_id: Option<i64>,
    pub duration_hours: f64,
    pub code95_points: i32,
    pub certificate_id: Option<i64>,
    pub max_participants: Option<i32>,
    pub price: Option<f64>,
    pub active: bool,
    pub updated_at: DateTime<Utc>,
}

impl CourseValues {
    pub fn from_draft(draft: &CourseDraft, now: DateTime<Utc>) -> RepositoryResult<Self> {
        let c = Course::from_draft(CourseId(0), draft, now);
        Ok(Self {
            title: c.title,
            description: c.description,
            provider_id: c.provider_id.map(i64::from),
            duration_hours: c.duration_hours,
            code95_points: to_i32("code95_points", c.code95_points)?,
            certificate_id: c.certificate_id.map(i64::from),
            max_participants: opt_i32("max_participants", c.max_participants)?,
            price: c.price,
            active: c.active,
            updated_at: now,
        })
    }
}

impl From<CourseRow> for Course {
    fn from(row: CourseRow) -> Self {
        Course {
            id: CourseId(row.id),
            title: row.title,
            description: row.description,
            provider_id: row.provider_id.map(ProviderId),
            duration_hours: row.duration_hours,
            code95_points: to_u32(row.code95_points),
            certificate_id: row.certificate_id.map(CertificateId),
            max_participants: row.max_participants.map(to_u32),
            price: row.price,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// =============================================================================
// Trainings & participants
// =============================================================================

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = trainings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TrainingRow {
    pub id: i64,
    pub course_id: i64,
    pub provider_id: Option<i64>,
    pub title: Option<String>,
    pub location: Option<String>,
    pub instructor: Option<String>,
    pub status: String,
    pub max_participants: Option<i32>,
    pub sessions_json: Value,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = trainings)]
#[diesel(treat_none_as_null = true)]
pub struct TrainingValues {
    pub course_id: i64,
    pub provider_id: Option<i64>,
    pub title: Option<String>,
    pub location: Option<String>,
    pub instructor: Option<String>,
    pub status: String,
    pub max_participants: Option<i32>,
    pub sessions_json: Value,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl TrainingValues {
    pub fn from_draft(draft: &TrainingDraft, now: DateTime<Utc>) -> RepositoryResult<Self> {
        let t = Training::from_draft(TrainingId(0), draft, now);
        Ok(Self {
            course_id: t.course_id.value(),
            provider_id: t.provider_id.map(i64::from),
            title: t.title,
            location: t.location,
            instructor: t.instructor,
            status: t.status.as_str().to_string(),
            max_participants: opt_i32("max_participants", t.max_participants)?,
            sessions_json: to_json("sessions_json", &t.sessions)?,
            notes: t.notes,
            updated_at: now,
        })
    }
}

impl TryFrom<TrainingRow> for Training {
    type Error = RepositoryError;

    fn try_from(row: TrainingRow) -> RepositoryResult<Self> {
        let mut sessions: Vec<TrainingSession> = from_json("sessions_json", row.sessions_json)?;
        sessions.sort_by_key(|s| (s.date, s.start_time));
        Ok(Training {
            id: TrainingId(row.id),
            course_id: CourseId(row.course_id),
            provider_id: row.provider_id.map(ProviderId),
            title: row.title,
            location: row.location,
            instructor: row.instructor,
            status: parse_text("status", &row.status)?,
            max_participants: row.max_participants.map(to_u32),
            sessions,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = training_participants)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ParticipantRow {
    pub id: i64,
    pub training_id: i64,
    pub employee_id: i64,
    pub status: String,
    pub code95_points_awarded: i32,
    pub notes: Option<String>,
    pub enrolled_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = training_participants)]
pub struct NewParticipantRow {
    pub training_id: i64,
    pub employee_id: i64,
    pub status: String,
    pub code95_points_awarded: i32,
    pub notes: Option<String>,
    pub enrolled_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewParticipantRow {
    pub fn from_draft(training_id: TrainingId, draft: &ParticipantDraft, now: DateTime<Utc>) -> Self {
        let p = TrainingParticipant::from_draft(ParticipantId(0), training_id, draft, now);
        Self {
            training_id: training_id.value(),
            employee_id: p.employee_id.value(),
            status: p.status.as_str().to_string(),
            code95_points_awarded: 0,
            notes: p.notes,
            enrolled_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = training_participants)]
#[diesel(treat_none_as_null = true)]
pub struct ParticipantChanges {
    pub status: String,
    pub code95_points_awarded: i32,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ParticipantRow> for TrainingParticipant {
    type Error = RepositoryError;

    fn try_from(row: ParticipantRow) -> RepositoryResult<Self> {
        Ok(TrainingParticipant {
            id: ParticipantId(row.id),
            training_id: TrainingId(row.training_id),
            employee_id: EmployeeId(row.employee_id),
            status: parse_text("status", &row.status)?,
            code95_points_awarded: to_u32(row.code95_points_awarded),
            notes: row.notes,
            enrolled_at: row.enrolled_at,
            updated_at: row.updated_at,
        })
    }
}

// =============================================================================
// Licenses
// =============================================================================

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = employee_licenses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct LicenseRow {
    pub id: i64,
    pub employee_id: i64,
    pub certificate_id: i64,
    pub license_number: Option<String>,
    pub issued_on: NaiveDate,
    pub expires_on: Option<NaiveDate>,
    pub source_training_id: Option<i64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = employee_licenses)]
pub struct NewLicenseRow {
    pub employee_id: i64,
    #[diesel(embed)]
    pub values: LicenseValues,
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = employee_licenses)]
#[diesel(treat_none_as_null = true)]
pub struct LicenseValues {
    pub certificate_id: i64,
    pub license_number: Option<String>,
    pub issued_on: NaiveDate,
    pub expires_on: Option<NaiveDate>,
    pub source_training_id: Option<i64>,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl LicenseValues {
    pub fn from_draft(draft: &LicenseDraft, now: DateTime<Utc>) -> Self {
        let l = EmployeeLicense::from_draft(LicenseId(0), EmployeeId(0), draft, now);
        Self {
            certificate_id: l.certificate_id.value(),
            license_number: l.license_number,
            issued_on: l.issued_on,
            expires_on: l.expires_on,
            source_training_id: l.source_training_id.map(i64::from),
            notes: l.notes,
            updated_at: now,
        }
    }
}

impl From<LicenseRow> for EmployeeLicense {
    fn from(row: LicenseRow) -> Self {
        EmployeeLicense {
            id: LicenseId(row.id),
            employee_id: EmployeeId(row.employee_id),
            certificate_id: CertificateId(row.certificate_id),
            license_number: row.license_number,
            issued_on: row.issued_on,
            expires_on: row.expires_on,
            source_training_id: row.source_training_id.map(TrainingId),
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// =============================================================================
// Plans
// =============================================================================

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = preliminary_plans)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PlanRow {
    pub id: i64,
    pub name: String,
    pub course_id: Option<i64>,
    pub certificate_id: Option<i64>,
    pub target_date: Option<NaiveDate>,
    pub status: String,
    pub items_json: Value,
    pub notes: Option<String>,
    pub converted_training_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = preliminary_plans)]
#[diesel(treat_none_as_null = true)]
pub struct PlanValues {
    pub name: String,
    pub course_id: Option<i64>,
    pub certificate_id: Option<i64>,
    pub target_date: Option<NaiveDate>,
    pub status: String,
    pub items_json: Value,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl PlanValues {
    pub fn from_draft(draft: &PlanDraft, now: DateTime<Utc>) -> RepositoryResult<Self> {
        let p = PreliminaryPlan::from_draft(PlanId(0), draft, now);
        Ok(Self {
            name: p.name,
            course_id: p.course_id.map(i64::from),
            certificate_id: p.certificate_id.map(i64::from),
            target_date: p.target_date,
            status: p.status.as_str().to_string(),
            items_json: to_json("items_json", &p.items)?,
            notes: p.notes,
            updated_at: now,
        })
    }
}

impl TryFrom<PlanRow> for PreliminaryPlan {
    type Error = RepositoryError;

    fn try_from(row: PlanRow) -> RepositoryResult<Self> {
        Ok(PreliminaryPlan {
            id: PlanId(row.id),
            name: row.name,
            course_id: row.course_id.map(CourseId),
            certificate_id: row.certificate_id.map(CertificateId),
            target_date: row.target_date,
            status: parse_text("status", &row.status)?,
            items: from_json("items_json", row.items_json)?,
            notes: row.notes,
            converted_training_id: row.converted_training_id.map(TrainingId),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// =============================================================================
// Profiles & sessions
// =============================================================================

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = profiles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProfileRow {
    pub id: i64,
    pub email: String,
    pub display_name: String,
    pub role: String,
    pub employee_id: Option<i64>,
    pub permissions_json: Option<Value>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = profiles)]
#[diesel(treat_none_as_null = true)]
pub struct ProfileValues {
    pub email: String,
    pub display_name: String,
    pub role: String,
    pub employee_id: Option<i64>,
    pub permissions_json: Option<Value>,
    pub active: bool,
    pub updated_at: DateTime<Utc>,
}

impl ProfileValues {
    pub fn from_draft(draft: &ProfileDraft, now: DateTime<Utc>) -> RepositoryResult<Self> {
        let p = Profile::from_draft(ProfileId(0), draft, now);
        Ok(Self {
            email: p.email,
            display_name: p.display_name,
            role: p.role.as_str().to_string(),
            employee_id: p.employee_id.map(i64::from),
            permissions_json: p
                .permissions
                .as_ref()
                .map(|perms| to_json("permissions_json", perms))
                .transpose()?,
            active: p.active,
            updated_at: now,
        })
    }
}

impl TryFrom<ProfileRow> for Profile {
    type Error = RepositoryError;

    fn try_from(row: ProfileRow) -> RepositoryResult<Self> {
        Ok(Profile {
            id: ProfileId(row.id),
            email: row.email,
            display_name: row.display_name,
            // Unknown role names degrade to the least privileged role.
            role: Role::from_name(&row.role),
            employee_id: row.employee_id.map(EmployeeId),
            permissions: row
                .permissions_json
                .map(|v| from_json("permissions_json", v))
                .transpose()?,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = auth_sessions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SessionRow {
    pub token_hash: String,
    pub profile_id: i64,
    pub role_hint: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<&AuthSession> for SessionRow {
    fn from(session: &AuthSession) -> Self {
        SessionRow {
            token_hash: session.token_hash.clone(),
            profile_id: session.profile_id.value(),
            role_hint: session.role_hint.as_str().to_string(),
            created_at: session.created_at,
            expires_at: session.expires_at,
        }
    }
}

impl From<SessionRow> for AuthSession {
    fn from(row: SessionRow) -> Self {
        AuthSession {
            token_hash: row.token_hash,
            profile_id: ProfileId(row.profile_id),
            role_hint: Role::from_name(&row.role_hint),
            created_at: row.created_at,
            expires_at: row.expires_at,
        }
    }
}
