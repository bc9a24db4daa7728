//! Certificates and licenses held by employees.

use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{normalize_optional, ValidationError, ValidationResult};
use crate::api::{CertificateId, EmployeeId, LicenseId, TrainingId};
use crate::define_text_enum;

define_text_enum!(
    /// Validity of a license on a given day.
    ExpiryStatus {
        NoExpiry => "no_expiry",
        Valid => "valid",
        ExpiringSoon => "expiring_soon",
        Expired => "expired",
    }
);

impl ExpiryStatus {
    pub fn needs_attention(&self) -> bool {
        matches!(self, ExpiryStatus::ExpiringSoon | ExpiryStatus::Expired)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseDraft {
    pub certificate_id: CertificateId,
    #[serde(default)]
    pub license_number: Option<String>,
    pub issued_on: NaiveDate,
    #[serde(default)]
    pub expires_on: Option<NaiveDate>,
    #[serde(default)]
    pub source_training_id: Option<TrainingId>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl LicenseDraft {
    pub fn new(certificate_id: CertificateId, issued_on: NaiveDate) -> Self {
        Self {
            certificate_id,
            license_number: None,
            issued_on,
            expires_on: None,
            source_training_id: None,
            notes: None,
        }
    }

    pub fn validate(&self) -> ValidationResult {
        if let Some(expires_on) = self.expires_on {
            if expires_on < self.issued_on {
                return Err(ValidationError::new(
                    "expires_on",
                    "cannot be before the issue date",
                ));
            }
        }
        Ok(())
    }
}

/// A certificate held by one employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeLicense {
    pub id: LicenseId,
    pub employee_id: EmployeeId,
    pub certificate_id: CertificateId,
    pub license_number: Option<String>,
    pub issued_on: NaiveDate,
    pub expires_on: Option<NaiveDate>,
    pub source_training_id: Option<TrainingId>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EmployeeLicense {
    pub fn from_draft(
        id: LicenseId,
        employee_id: EmployeeId,
        draft: &LicenseDraft,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            employee_id,
            certificate_id: draft.certificate_id,
            license_number: normalize_optional(draft.license_number.clone()),
            issued_on: draft.issued_on,
            expires_on: draft.expires_on,
            source_training_id: draft.source_training_id,
            notes: normalize_optional(draft.notes.clone()),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, draft: &LicenseDraft, now: DateTime<Utc>) {
        let created_at = self.created_at;
        *self = Self::from_draft(self.id, self.employee_id, draft, now);
        self.created_at = created_at;
    }

    /// Status on `today`, counting `reminder_days` as the warning window.
    pub fn status_on(&self, today: NaiveDate, reminder_days: u32) -> ExpiryStatus {
        match self.expires_on {
            None => ExpiryStatus::NoExpiry,
            Some(expiry) if expiry < today => ExpiryStatus::Expired,
            Some(expiry) if (expiry - today).num_days() <= i64::from(reminder_days) => {
                ExpiryStatus::ExpiringSoon
            }
            Some(_) => ExpiryStatus::Valid,
        }
    }

    /// Days until expiry; negative once expired.
    pub fn days_remaining(&self, today: NaiveDate) -> Option<i64> {
        self.expires_on.map(|expiry| (expiry - today).num_days())
    }
}

/// Expiry for a certificate issued on `issued_on` with the given validity.
///
/// `None` validity never expires. A validity that runs past the last
/// representable date is an error on `issued_on`.
pub fn expiry_after(
    issued_on: NaiveDate,
    validity_months: Option<u32>,
) -> Result<Option<NaiveDate>, ValidationError> {
    match validity_months {
        None => Ok(None),
        Some(months) => issued_on
            .checked_add_months(Months::new(months))
            .map(Some)
            .ok_or_else(|| {
                ValidationError::new(
                    "issued_on",
                    format!("{} plus {} months is out of range", issued_on, months),
                )
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn license(expires_on: Option<NaiveDate>) -> EmployeeLicense {
        let mut draft = LicenseDraft::new(CertificateId(1), date(2024, 1, 1));
        draft.expires_on = expires_on;
        EmployeeLicense::from_draft(LicenseId(1), EmployeeId(1), &draft, Utc::now())
    }

    #[test]
    fn test_status_on() {
        let today = date(2026, 6, 1);
        assert_eq!(license(None).status_on(today, 90), ExpiryStatus::NoExpiry);
        assert_eq!(
            license(Some(date(2026, 5, 31))).status_on(today, 90),
            ExpiryStatus::Expired
        );
        assert_eq!(
            license(Some(date(2026, 6, 1))).status_on(today, 90),
            ExpiryStatus::ExpiringSoon
        );
        assert_eq!(
            license(Some(date(2026, 8, 30))).status_on(today, 90),
            ExpiryStatus::ExpiringSoon
        );
        assert_eq!(
            license(Some(date(2026, 12, 1))).status_on(today, 90),
            ExpiryStatus::Valid
        );
    }

    #[test]
    fn test_days_remaining() {
        let today = date(2026, 6, 1);
        assert_eq!(license(Some(date(2026, 6, 11))).days_remaining(today), Some(10));
        assert_eq!(license(Some(date(2026, 5, 30))).days_remaining(today), Some(-2));
        assert_eq!(license(None).days_remaining(today), None);
    }

    #[test]
    fn test_expiry_after() {
        assert_eq!(expiry_after(date(2026, 1, 31), Some(1)), Ok(Some(date(2026, 2, 28))));
        assert_eq!(expiry_after(date(2026, 1, 1), Some(60)), Ok(Some(date(2031, 1, 1))));
        assert_eq!(expiry_after(date(2026, 1, 1), None), Ok(None));
        assert_eq!(expiry_after(NaiveDate::MAX, None), Ok(None));
        let err = expiry_after(NaiveDate::MAX, Some(12)).unwrap_err();
        assert_eq!(err.field, "issued_on");
    }

    #[test]
    fn test_expiry_before_issue_rejected() {
        let mut draft = LicenseDraft::new(CertificateId(1), date(2026, 1, 1));
        draft.expires_on = Some(date(2025, 1, 1));
        assert_eq!(draft.validate().unwrap_err().field, "expires_on");
    }
}
