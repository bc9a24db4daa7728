//! Training catalog: providers, courses and the certificates they award.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    normalize_optional, require_email, require_non_empty, ValidationError, ValidationResult,
};
use crate::api::{CertificateId, CourseId, ProviderId};

fn default_true() -> bool {
    true
}

fn default_reminder_days() -> u32 {
    90
}

// =============================================================================
// Providers
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderDraft {
    pub name: String,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl ProviderDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contact_name: None,
            email: None,
            phone: None,
            website: None,
            address: None,
            notes: None,
            active: true,
        }
    }

    pub fn validate(&self) -> ValidationResult {
        require_non_empty("name", &self.name)?;
        require_email("email", self.email.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub id: ProviderId,
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

impl Provider {
    pub fn from_draft(id: ProviderId, draft: &ProviderDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: draft.name.trim().to_string(),
            contact_name: normalize_optional(draft.contact_name.clone()),
            email: normalize_optional(draft.email.clone()),
            phone: normalize_optional(draft.phone.clone()),
            website: normalize_optional(draft.website.clone()),
            address: normalize_optional(draft.address.clone()),
            notes: normalize_optional(draft.notes.clone()),
            active: draft.active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, draft: &ProviderDraft, now: DateTime<Utc>) {
        let created_at = self.created_at;
        *self = Self::from_draft(self.id, draft, now);
        self.created_at = created_at;
    }
}

// =============================================================================
// Certificate definitions
// =============================================================================

/// Longest certificate validity: a century.
pub const MAX_VALIDITY_MONTHS: u32 = 1200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateDefinitionDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// `None` means the certificate never expires.
    #[serde(default)]
    pub validity_months: Option<u32>,
    /// Days before expiry at which a license counts as "expiring soon".
    #[serde(default = "default_reminder_days")]
    pub reminder_days: u32,
    /// Marks the driver qualification card whose expiry closes a Code 95 cycle.
    #[serde(default)]
    pub is_code95: bool,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl CertificateDefinitionDraft {
    pub fn new(name: impl Into<String>, validity_months: Option<u32>) -> Self {
        Self {
            name: name.into(),
            description: None,
            validity_months,
            reminder_days: default_reminder_days(),
            is_code95: false,
            active: true,
        }
    }

    pub fn validate(&self) -> ValidationResult {
        require_non_empty("name", &self.name)?;
        match self.validity_months {
            Some(0) => Err(ValidationError::new(
                "validity_months",
                "must be positive (omit it for certificates that never expire)",
            )),
            Some(months) if months > MAX_VALIDITY_MONTHS => Err(ValidationError::new(
                "validity_months",
                format!("must be at most {}", MAX_VALIDITY_MONTHS),
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateDefinition {
    pub id: CertificateId,
    pub name: String,
    pub description: Option<String>,
    pub validity_months: Option<u32>,
    pub reminder_days: u32,
    pub is_code95: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CertificateDefinition {
    pub fn from_draft(
        id: CertificateId,
        draft: &CertificateDefinitionDraft,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: draft.name.trim().to_string(),
            description: normalize_optional(draft.description.clone()),
            validity_months: draft.validity_months,
            reminder_days: draft.reminder_days,
            is_code95: draft.is_code95,
            active: draft.active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, draft: &CertificateDefinitionDraft, now: DateTime<Utc>) {
        let created_at = self.created_at;
        *self = Self::from_draft(self.id, draft, now);
        self.created_at = created_at;
    }
}

// =============================================================================
// Courses
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub provider_id: Option<ProviderId>,
    pub duration_hours: f64,
    /// Code 95 points earned by completing the course; 0 for regular courses.
    #[serde(default)]
    pub code95_points: u32,
    /// Certificate issued to participants who complete the course.
    #[serde(default)]
    pub certificate_id: Option<CertificateId>,
    #[serde(default)]
    pub max_participants: Option<u32>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl CourseDraft {
    pub fn new(title: impl Into<String>, duration_hours: f64) -> Self {
        Self {
            title: title.into(),
            description: None,
            provider_id: None,
            duration_hours,
            code95_points: 0,
            certificate_id: None,
            max_participants: None,
            price: None,
            active: true,
        }
    }

    pub fn validate(&self) -> ValidationResult {
        require_non_empty("title", &self.title)?;
        if !self.duration_hours.is_finite() || self.duration_hours <= 0.0 {
            return Err(ValidationError::new("duration_hours", "must be positive"));
        }
        if self.max_participants == Some(0) {
            return Err(ValidationError::new(
                "max_participants",
                "must be at least 1",
            ));
        }
        if let Some(price) = self.price {
            if !price.is_finite() || price < 0.0 {
                return Err(ValidationError::new("price", "cannot be negative"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    pub description: Option<String>,
    pub provider_id: Option<ProviderId>,
    pub duration_hours: f64,
    pub code95_points: u32,
    pub certificate_id: Option<CertificateId>,
    pub max_participants: Option<u32>,
    pub price: Option<f64>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Course {
    pub fn from_draft(id: CourseId, draft: &CourseDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: draft.title.trim().to_string(),
            description: normalize_optional(draft.description.clone()),
            provider_id: draft.provider_id,
            duration_hours: draft.duration_hours,
            code95_points: draft.code95_points,
            certificate_id: draft.certificate_id,
            max_participants: draft.max_participants,
            price: draft.price,
            active: draft.active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, draft: &CourseDraft, now: DateTime<Utc>) {
        let created_at = self.created_at;
        *self = Self::from_draft(self.id, draft, now);
        self.created_at = created_at;
    }

    pub fn is_code95(&self) -> bool {
        self.code95_points > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_course_validation() {
        assert!(CourseDraft::new("Veilig laden en lossen", 7.0).validate().is_ok());
        assert_eq!(
            CourseDraft::new("Nul", 0.0).validate().unwrap_err().field,
            "duration_hours"
        );
        let mut draft = CourseDraft::new("Duur", 4.0);
        draft.price = Some(-1.0);
        assert_eq!(draft.validate().unwrap_err().field, "price");
    }

    #[test]
    fn test_certificate_zero_validity_rejected() {
        let draft = CertificateDefinitionDraft::new("VCA", Some(0));
        assert_eq!(draft.validate().unwrap_err().field, "validity_months");
        assert!(CertificateDefinitionDraft::new("VCA", None).validate().is_ok());
    }

    #[test]
    fn test_certificate_validity_upper_bound() {
        let draft = CertificateDefinitionDraft::new("VCA", Some(u32::MAX));
        assert_eq!(draft.validate().unwrap_err().field, "validity_months");
        let longest = CertificateDefinitionDraft::new("VCA", Some(MAX_VALIDITY_MONTHS));
        assert!(longest.validate().is_ok());
    }

    #[test]
    fn test_provider_email_checked() {
        let mut draft = ProviderDraft::new("Opleider BV");
        draft.email = Some("info".into());
        assert_eq!(draft.validate().unwrap_err().field, "email");
    }

    #[test]
    fn test_course_code95_flag() {
        let mut draft = CourseDraft::new("Code 95 module", 7.0);
        draft.code95_points = 7;
        let course = Course::from_draft(CourseId(1), &draft, Utc::now());
        assert!(course.is_code95());
    }
}
