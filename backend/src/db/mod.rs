//! Persistence: repository traits, their backends and the CRUD services.
//!
//! ```text
//! http handlers / services::*
//!         │
//!         ▼
//! db::services        draft validation, reference checks, admission and
//!         │           completion rules; generic over FullRepository
//!         ▼
//! db::repository      Personnel, Catalog, Training, Compliance, Planning
//!         │           and Access traits, composed into FullRepository
//!         ▼
//! db::repositories    LocalRepository (in-memory, default)
//!                     PostgresRepository (Diesel + r2d2, `postgres-repo`)
//! ```
//!
//! Callers normally go through [`services`] rather than the traits, so the
//! business rules apply whichever backend [`RepositoryFactory`] opened:
//!
//! ```no_run
//! use training_hub::db::{services, RepositoryFactory};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let repo = RepositoryFactory::from_env().await?;
//! let trainings = services::list_trainings(repo.as_ref()).await?;
//! println!("{} trainings", trainings.len());
//! # Ok(())
//! # }
//! ```

#[cfg(not(any(feature = "postgres-repo", feature = "local-repo")))]
compile_error!("Enable at least one repository backend feature.");

pub mod factory;
pub mod repo_config;
pub mod repositories;
pub mod repository;
pub mod services;

#[cfg(test)]
#[path = "services_tests.rs"]
mod services_tests;

// Placeholders keep factory signatures stable without the postgres backend.
#[cfg(feature = "postgres-repo")]
pub use repositories::postgres::{PoolStats, PostgresConfig};
#[cfg(not(feature = "postgres-repo"))]
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    _private: (),
}
#[cfg(not(feature = "postgres-repo"))]
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    _private: (),
}

pub use services::{
    AddParticipantRequest, AvailabilityConflict, CompletionSummary, ParticipantUpdate,
};

pub use repo_config::RepositoryConfig;

pub use factory::{RepositoryBuilder, RepositoryFactory, RepositoryType};
pub use repositories::LocalRepository;
#[cfg(feature = "postgres-repo")]
pub use repositories::PostgresRepository;
pub use repository::{
    AccessRepository, CatalogRepository, ComplianceRepository, ErrorContext, FullRepository,
    PersonnelRepository, PlanningRepository, RepositoryError, RepositoryResult,
    TrainingRepository,
};
