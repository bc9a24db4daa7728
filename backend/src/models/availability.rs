use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{normalize_optional, ValidationError, ValidationResult};
use crate::api::{AvailabilityId, EmployeeId};
use crate::define_text_enum;

define_text_enum!(
    /// Reason an employee cannot attend training.
    AvailabilityKind {
        Vacation => "vacation",
        Sick => "sick",
        Leave => "leave",
        Unavailable => "unavailable",
    }
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityDraft {
    pub kind: AvailabilityKind,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}

impl AvailabilityDraft {
    pub fn new(kind: AvailabilityKind, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            kind,
            start_date,
            end_date,
            notes: None,
        }
    }

    pub fn validate(&self) -> ValidationResult {
        if self.end_date < self.start_date {
            return Err(ValidationError::new(
                "end_date",
                "cannot be before the start date",
            ));
        }
        Ok(())
    }
}

/// A period (inclusive on both ends) in which an employee is not available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Availability {
    pub id: AvailabilityId,
    pub employee_id: EmployeeId,
    pub kind: AvailabilityKind,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Availability {
    pub fn from_draft(
        id: AvailabilityId,
        employee_id: EmployeeId,
        draft: &AvailabilityDraft,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            employee_id,
            kind: draft.kind,
            start_date: draft.start_date,
            end_date: draft.end_date,
            notes: normalize_optional(draft.notes.clone()),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, draft: &AvailabilityDraft, now: DateTime<Utc>) {
        let created_at = self.created_at;
        *self = Self::from_draft(self.id, self.employee_id, draft, now);
        self.created_at = created_at;
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_covers_is_inclusive() {
        let d = |day| NaiveDate::from_ymd_opt(2026, 7, day).unwrap();
        let draft = AvailabilityDraft::new(AvailabilityKind::Vacation, d(6), d(10));
        let record = Availability::from_draft(AvailabilityId(1), EmployeeId(1), &draft, Utc::now());
        assert!(record.covers(d(6)));
        assert!(record.covers(d(10)));
        assert!(!record.covers(d(5)));
        assert!(!record.covers(d(11)));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let d = |day| NaiveDate::from_ymd_opt(2026, 7, day).unwrap();
        let draft = AvailabilityDraft::new(AvailabilityKind::Sick, d(10), d(6));
        assert_eq!(draft.validate().unwrap_err().field, "end_date");
    }
}
