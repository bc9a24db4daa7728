use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{
    normalize_optional, require_email, require_non_empty, ValidationError, ValidationResult,
};
use crate::api::EmployeeId;

/// Create/update payload for an employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeDraft {
    pub employee_number: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub hire_date: Option<NaiveDate>,
    /// Drivers are subject to Code 95 continuing education.
    #[serde(default)]
    pub is_driver: bool,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

impl EmployeeDraft {
    pub fn new(
        employee_number: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            employee_number: employee_number.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: None,
            phone: None,
            department: None,
            job_title: None,
            date_of_birth: None,
            hire_date: None,
            is_driver: false,
            active: true,
        }
    }

    pub fn validate(&self) -> ValidationResult {
        require_non_empty("employee_number", &self.employee_number)?;
        require_non_empty("first_name", &self.first_name)?;
        require_non_empty("last_name", &self.last_name)?;
        require_email("email", self.email.as_deref())?;
        if let (Some(birth), Some(hired)) = (self.date_of_birth, self.hire_date) {
            if hired < birth {
                return Err(ValidationError::new(
                    "hire_date",
                    "cannot be before the date of birth",
                ));
            }
        }
        Ok(())
    }
}

/// Stored employee record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
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

impl Employee {
    pub fn from_draft(id: EmployeeId, draft: &EmployeeDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            employee_number: draft.employee_number.trim().to_string(),
            first_name: draft.first_name.trim().to_string(),
            last_name: draft.last_name.trim().to_string(),
            email: normalize_optional(draft.email.clone()),
            phone: normalize_optional(draft.phone.clone()),
            department: normalize_optional(draft.department.clone()),
            job_title: normalize_optional(draft.job_title.clone()),
            date_of_birth: draft.date_of_birth,
            hire_date: draft.hire_date,
            is_driver: draft.is_driver,
            active: draft.active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply an update draft, keeping id and creation time.
    pub fn apply(&mut self, draft: &EmployeeDraft, now: DateTime<Utc>) {
        let created_at = self.created_at;
        *self = Self::from_draft(self.id, draft, now);
        self.created_at = created_at;
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_employee_draft() {
        let mut draft = EmployeeDraft::new("E-001", "Jan", "Jansen");
        draft.email = Some("jan@example.nl".into());
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_missing_names_rejected() {
        let draft = EmployeeDraft::new("E-001", "", "Jansen");
        assert_eq!(draft.validate().unwrap_err().field, "first_name");

        let draft = EmployeeDraft::new(" ", "Jan", "Jansen");
        assert_eq!(draft.validate().unwrap_err().field, "employee_number");
    }

    #[test]
    fn test_hire_date_before_birth_rejected() {
        let mut draft = EmployeeDraft::new("E-001", "Jan", "Jansen");
        draft.date_of_birth = NaiveDate::from_ymd_opt(1990, 1, 1);
        draft.hire_date = NaiveDate::from_ymd_opt(1980, 1, 1);
        assert_eq!(draft.validate().unwrap_err().field, "hire_date");
    }

    #[test]
    fn test_apply_keeps_identity() {
        let t0 = Utc::now();
        let mut employee =
            Employee::from_draft(EmployeeId(7), &EmployeeDraft::new("E-7", "A", "B"), t0);
        let t1 = t0 + chrono::Duration::seconds(5);
        employee.apply(&EmployeeDraft::new("E-7", "Anna", "B"), t1);
        assert_eq!(employee.id, EmployeeId(7));
        assert_eq!(employee.created_at, t0);
        assert_eq!(employee.updated_at, t1);
        assert_eq!(employee.full_name(), "Anna B");
    }
}
