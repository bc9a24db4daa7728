//! Preliminary plans: draft groupings of employees for a future training batch.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{normalize_optional, require_non_empty, ValidationError, ValidationResult};
use crate::api::{CertificateId, CourseId, EmployeeId, PlanId, TrainingId};
use crate::define_text_enum;

define_text_enum!(
    PlanStatus {
        Draft => "draft",
        Finalized => "finalized",
        Converted => "converted",
    }
);

impl Default for PlanStatus {
    fn default() -> Self {
        PlanStatus::Draft
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanItem {
    pub employee_id: EmployeeId,
    #[serde(default)]
    pub certificate_id: Option<CertificateId>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl PlanItem {
    pub fn new(employee_id: EmployeeId) -> Self {
        Self {
            employee_id,
            certificate_id: None,
            notes: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDraft {
    pub name: String,
    #[serde(default)]
    pub course_id: Option<CourseId>,
    #[serde(default)]
    pub certificate_id: Option<CertificateId>,
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: PlanStatus,
    #[serde(default)]
    pub items: Vec<PlanItem>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl PlanDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            course_id: None,
            certificate_id: None,
            target_date: None,
            status: PlanStatus::Draft,
            items: Vec::new(),
            notes: None,
        }
    }

    pub fn validate(&self) -> ValidationResult {
        require_non_empty("name", &self.name)?;
        let mut seen = HashSet::new();
        for item in &self.items {
            if !seen.insert(item.employee_id) {
                return Err(ValidationError::new(
                    "items",
                    format!("employee {} appears more than once", item.employee_id),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreliminaryPlan {
    pub id: PlanId,
    pub name: String,
    pub course_id: Option<CourseId>,
    pub certificate_id: Option<CertificateId>,
    pub target_date: Option<NaiveDate>,
    pub status: PlanStatus,
    pub items: Vec<PlanItem>,
    pub notes: Option<String>,
    pub converted_training_id: Option<TrainingId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PreliminaryPlan {
    pub fn from_draft(id: PlanId, draft: &PlanDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: draft.name.trim().to_string(),
            course_id: draft.course_id,
            certificate_id: draft.certificate_id,
            target_date: draft.target_date,
            status: draft.status,
            items: draft.items.clone(),
            notes: normalize_optional(draft.notes.clone()),
            converted_training_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply an update draft; the conversion link is kept.
    pub fn apply(&mut self, draft: &PlanDraft, now: DateTime<Utc>) {
        let created_at = self.created_at;
        let converted = self.converted_training_id;
        *self = Self::from_draft(self.id, draft, now);
        self.created_at = created_at;
        self.converted_training_id = converted;
    }

    pub fn to_draft(&self) -> PlanDraft {
        PlanDraft {
            name: self.name.clone(),
            course_id: self.course_id,
            certificate_id: self.certificate_id,
            target_date: self.target_date,
            status: self.status,
            items: self.items.clone(),
            notes: self.notes.clone(),
        }
    }

    pub fn contains(&self, employee_id: EmployeeId) -> bool {
        self.items.iter().any(|item| item.employee_id == employee_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_items_rejected() {
        let mut draft = PlanDraft::new("Q3 heftruck");
        draft.items = vec![PlanItem::new(EmployeeId(1)), PlanItem::new(EmployeeId(1))];
        assert_eq!(draft.validate().unwrap_err().field, "items");
    }

    #[test]
    fn test_apply_keeps_conversion_link() {
        let now = Utc::now();
        let mut plan = PreliminaryPlan::from_draft(PlanId(1), &PlanDraft::new("A"), now);
        plan.converted_training_id = Some(TrainingId(9));
        plan.apply(&PlanDraft::new("B"), now);
        assert_eq!(plan.name, "B");
        assert_eq!(plan.converted_training_id, Some(TrainingId(9)));
    }
}
