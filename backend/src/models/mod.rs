//! Domain records for the training administration.
//!
//! Each entity comes as a *draft* (create/update payload, validated before it
//! reaches a repository) and a stored record carrying its id and timestamps.

pub mod availability;
pub mod catalog;
pub mod certificate;
pub mod employee;
pub mod macros;
pub mod plan;
pub mod profile;
pub mod training;

pub use availability::*;
pub use catalog::*;
pub use certificate::*;
pub use employee::*;
pub use plan::*;
pub use profile::*;
pub use training::*;

/// A draft violated one of its field rules.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub type ValidationResult = Result<(), ValidationError>;

pub(crate) fn require_non_empty(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }
    Ok(())
}

pub(crate) fn require_email(field: &'static str, value: Option<&str>) -> ValidationResult {
    match value {
        Some(email) if !email.contains('@') || email.trim().len() < 3 => Err(
            ValidationError::new(field, format!("'{}' is not a valid email address", email)),
        ),
        _ => Ok(()),
    }
}

/// Trims optional free text and turns blank strings into `None`.
pub(crate) fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_non_empty() {
        assert!(require_non_empty("name", "Alice").is_ok());
        let err = require_non_empty("name", "   ").unwrap_err();
        assert_eq!(err.field, "name");
        assert_eq!(err.to_string(), "name: must not be empty");
    }

    #[test]
    fn test_require_email() {
        assert!(require_email("email", None).is_ok());
        assert!(require_email("email", Some("a@b.nl")).is_ok());
        assert!(require_email("email", Some("not-an-email")).is_err());
    }

    #[test]
    fn test_normalize_optional() {
        assert_eq!(normalize_optional(Some("  x ".into())), Some("x".to_string()));
        assert_eq!(normalize_optional(Some("   ".into())), None);
        assert_eq!(normalize_optional(None), None);
    }
}
