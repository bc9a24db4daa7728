//! Application users, their roles and bearer-token sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{require_email, require_non_empty, ValidationError, ValidationResult};
use crate::api::{EmployeeId, ProfileId};
use crate::define_text_enum;

define_text_enum!(
    /// Role names used to key the static permission tables.
    Role {
        Admin => "admin",
        Manager => "manager",
        Planner => "planner",
        Instructor => "instructor",
        Employee => "employee",
    }
);

impl Role {
    /// Parse a role name, falling back to the least privileged role.
    pub fn from_name(name: &str) -> Self {
        name.parse().unwrap_or(Role::Employee)
    }
}

define_text_enum!(
    /// A single capability checked by the HTTP layer.
    Permission {
        ViewEmployees => "view_employees",
        ManageEmployees => "manage_employees",
        ViewTrainings => "view_trainings",
        ManageTrainings => "manage_trainings",
        ManageParticipants => "manage_participants",
        ManageCatalog => "manage_catalog",
        ManageLicenses => "manage_licenses",
        ViewCompliance => "view_compliance",
        ManageAvailability => "manage_availability",
        ManagePlans => "manage_plans",
        ManageUsers => "manage_users",
        ViewOwnRecords => "view_own_records",
    }
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileDraft {
    pub email: String,
    pub display_name: String,
    pub role: Role,
    #[serde(default)]
    pub employee_id: Option<EmployeeId>,
    /// Replaces the role's permission table when present.
    #[serde(default)]
    pub permissions: Option<Vec<Permission>>,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

impl ProfileDraft {
    pub fn new(email: impl Into<String>, display_name: impl Into<String>, role: Role) -> Self {
        Self {
            email: email.into(),
            display_name: display_name.into(),
            role,
            employee_id: None,
            permissions: None,
            active: true,
        }
    }

    pub fn validate(&self) -> ValidationResult {
        require_non_empty("email", &self.email)?;
        require_email("email", Some(&self.email))?;
        require_non_empty("display_name", &self.display_name)?;
        if let Some(permissions) = &self.permissions {
            if permissions.is_empty() {
                return Err(ValidationError::new(
                    "permissions",
                    "omit the list to use the role defaults",
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub employee_id: Option<EmployeeId>,
    pub permissions: Option<Vec<Permission>>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn from_draft(id: ProfileId, draft: &ProfileDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            email: normalize_email(&draft.email),
            display_name: draft.display_name.trim().to_string(),
            role: draft.role,
            employee_id: draft.employee_id,
            permissions: draft.permissions.clone(),
            active: draft.active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, draft: &ProfileDraft, now: DateTime<Utc>) {
        let created_at = self.created_at;
        *self = Self::from_draft(self.id, draft, now);
        self.created_at = created_at;
    }
}

/// Emails are compared case-insensitively.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// A bearer-token session. Only the SHA-256 of the token is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub token_hash: String,
    pub profile_id: ProfileId,
    /// Role at issue time, used when the profile cannot be loaded.
    pub role_hint: Role,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuthSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(false, |at| at <= now)
    }
}
