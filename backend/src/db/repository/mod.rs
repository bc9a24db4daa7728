//! Repository trait definitions for database operations.
//!
//! This module provides a collection of focused repository traits that abstract
//! database operations. By splitting responsibilities across multiple traits,
//! implementations can be more focused and testable.
//!
//! # Module Organization
//!
//! - [`error`]: Error types for repository operations
//! - [`personnel`]: Employees and their availability records
//! - [`catalog`]: Providers, courses and certificate definitions
//! - [`trainings`]: Scheduled trainings and their participants
//! - [`compliance`]: Licenses (certificates held by employees)
//! - [`planning`]: Preliminary plans
//! - [`access`]: User profiles and bearer-token sessions
//!
//! # Convenience Trait Bound
//!
//! For functions that need all repository capabilities, use the [`FullRepository`] trait bound:
//!
//! ```ignore
//! async fn my_service<R: FullRepository + ?Sized>(repo: &R) -> RepositoryResult<()> {
//!     let training = repo.get_training(training_id).await?;
//!     let course = repo.get_course(training.course_id).await?;
//!     Ok(())
//! }
//! ```

pub mod access;
pub mod catalog;
pub mod compliance;
pub mod error;
pub mod personnel;
pub mod planning;
pub mod trainings;

// Re-export error types
pub use error::{ErrorContext, RepositoryError, RepositoryResult};

// Re-export all traits
pub use access::AccessRepository;
pub use catalog::CatalogRepository;
pub use compliance::ComplianceRepository;
pub use personnel::PersonnelRepository;
pub use planning::PlanningRepository;
pub use trainings::{training_full, TrainingRepository};

/// Composite trait bound for a complete repository implementation.
///
/// This trait is automatically implemented for any type that implements
/// all six repository traits.
pub trait FullRepository:
    PersonnelRepository
    + CatalogRepository
    + TrainingRepository
    + ComplianceRepository
    + PlanningRepository
    + AccessRepository
{
}

// Blanket implementation: any type implementing all six traits automatically implements FullRepository
impl<T> FullRepository for T where
    T: PersonnelRepository
        + CatalogRepository
        + TrainingRepository
        + ComplianceRepository
        + PlanningRepository
        + AccessRepository
{
}
