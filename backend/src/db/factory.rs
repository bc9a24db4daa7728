//! Opening the repository backend chosen at runtime.
//!
//! The backend comes from, in order of use by the server binary:
//! `REPOSITORY_TYPE` / `DATABASE_URL` in the environment, a
//! `repository.toml` file, or the in-memory default.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use super::repo_config::RepositoryConfig;
use super::repositories::LocalRepository;
#[cfg(feature = "postgres-repo")]
use super::repositories::PostgresRepository;
use super::repository::{FullRepository, RepositoryError, RepositoryResult};
use super::PostgresConfig;

/// Available storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryType {
    /// Diesel over an r2d2 pool (`postgres-repo` feature)
    Postgres,
    /// In-memory, lost on restart
    Local,
}

impl FromStr for RepositoryType {
    type Err = String;

    /// Accepts `postgres`, `pg` and `local`, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(Self::Postgres),
            "local" => Ok(Self::Local),
            _ => Err(format!("Unknown repository type: {}", s)),
        }
    }
}

impl fmt::Display for RepositoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Postgres => "postgres",
            Self::Local => "local",
        })
    }
}

impl RepositoryType {
    /// `REPOSITORY_TYPE` when set (unknown values fall back to local),
    /// otherwise postgres when a database URL is present.
    pub fn from_env() -> Self {
        if let Ok(value) = std::env::var("REPOSITORY_TYPE") {
            return value.parse().unwrap_or_else(|e| {
                log::warn!("{}; using the local repository", e);
                Self::Local
            });
        }

        let has_url = ["DATABASE_URL", "PG_DATABASE_URL"]
            .iter()
            .any(|name| std::env::var(name).is_ok());
        if has_url {
            Self::Postgres
        } else {
            Self::Local
        }
    }
}

/// Connection settings for postgres from the `DATABASE_URL` / `PG_*`
/// variables. Always `None` without the `postgres-repo` feature.
#[cfg(feature = "postgres-repo")]
fn postgres_config_from_env() -> RepositoryResult<Option<PostgresConfig>> {
    PostgresConfig::from_env()
        .map(Some)
        .map_err(RepositoryError::configuration)
}

#[cfg(not(feature = "postgres-repo"))]
fn postgres_config_from_env() -> RepositoryResult<Option<PostgresConfig>> {
    Ok(None)
}

/// Creates repository instances behind `Arc<dyn FullRepository>`.
///
/// # Example
/// ```ignore
/// use training_hub::db::{PostgresConfig, RepositoryFactory, RepositoryType};
///
/// # async fn open() -> Result<(), Box<dyn std::error::Error>> {
/// let config = PostgresConfig::with_url("postgres://planner@localhost/training_hub");
/// let repo = RepositoryFactory::create(RepositoryType::Postgres, Some(&config)).await?;
/// # Ok(())
/// # }
/// ```
pub struct RepositoryFactory;

impl RepositoryFactory {
    /// Open a backend of `repo_type`; postgres needs `postgres_config`.
    pub async fn create(
        repo_type: RepositoryType,
        postgres_config: Option<&PostgresConfig>,
    ) -> RepositoryResult<Arc<dyn FullRepository>> {
        match repo_type {
            RepositoryType::Local => Ok(Self::create_local()),
            RepositoryType::Postgres => Self::open_postgres(postgres_config).await,
        }
    }

    #[cfg(feature = "postgres-repo")]
    async fn open_postgres(
        config: Option<&PostgresConfig>,
    ) -> RepositoryResult<Arc<dyn FullRepository>> {
        let config = config.ok_or_else(|| {
            RepositoryError::configuration("Postgres repository requires PostgresConfig")
        })?;
        let repo = Self::create_postgres(config).await?;
        Ok(repo as Arc<dyn FullRepository>)
    }

    #[cfg(not(feature = "postgres-repo"))]
    async fn open_postgres(
        _config: Option<&PostgresConfig>,
    ) -> RepositoryResult<Arc<dyn FullRepository>> {
        Err(RepositoryError::configuration(
            "Postgres repository feature not enabled",
        ))
    }

    /// Build the pool and run pending migrations.
    #[cfg(feature = "postgres-repo")]
    pub async fn create_postgres(
        config: &PostgresConfig,
    ) -> RepositoryResult<Arc<PostgresRepository>> {
        // Pool creation and migrations block on the network.
        let config = config.clone();
        let repo = tokio::task::spawn_blocking(move || PostgresRepository::new(config))
            .await
            .map_err(|e| RepositoryError::internal(format!("Task join error: {}", e)))??;
        log::info!("Postgres repository ready: {:?}", repo.pool_stats());
        Ok(Arc::new(repo))
    }

    pub fn create_local() -> Arc<dyn FullRepository> {
        log::info!("Using in-memory local repository");
        Arc::new(LocalRepository::new())
    }

    /// Backend chosen by [`RepositoryType::from_env`].
    pub async fn from_env() -> RepositoryResult<Arc<dyn FullRepository>> {
        let repo_type = RepositoryType::from_env();
        let pg = match repo_type {
            RepositoryType::Postgres => postgres_config_from_env()?,
            RepositoryType::Local => None,
        };
        Self::create(repo_type, pg.as_ref()).await
    }

    pub async fn from_config_file<P: AsRef<Path>>(
        path: P,
    ) -> RepositoryResult<Arc<dyn FullRepository>> {
        Self::from_config(&RepositoryConfig::from_file(path)?).await
    }

    /// Backend from the discovered `repository.toml`.
    pub async fn from_default_config() -> RepositoryResult<Arc<dyn FullRepository>> {
        Self::from_config(&RepositoryConfig::discover()?).await
    }

    pub async fn from_config(config: &RepositoryConfig) -> RepositoryResult<Arc<dyn FullRepository>> {
        let (repo_type, pg) = config.backend()?;
        Self::create(repo_type, pg.as_ref()).await
    }
}

/// Step-wise repository setup, e.g. for tests that pick a backend first and
/// settings later.
///
/// ```
/// use training_hub::db::{RepositoryBuilder, RepositoryType, TrainingRepository};
///
/// # #[tokio::main]
/// # async fn main() {
/// let repo = RepositoryBuilder::new()
///     .repository_type(RepositoryType::Local)
///     .build()
///     .await
///     .unwrap();
/// assert!(repo.list_trainings().await.unwrap().is_empty());
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct RepositoryBuilder {
    repo_type: Option<RepositoryType>,
    postgres_config: Option<PostgresConfig>,
}

impl RepositoryBuilder {
    /// Without an explicit type the builder falls back to
    /// [`RepositoryType::from_env`] at build time.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn repository_type(mut self, repo_type: RepositoryType) -> Self {
        self.repo_type = Some(repo_type);
        self
    }

    pub fn postgres_config(mut self, config: PostgresConfig) -> Self {
        self.postgres_config = Some(config);
        self
    }

    /// Type and postgres settings from the environment.
    pub fn from_env(mut self) -> RepositoryResult<Self> {
        let repo_type = RepositoryType::from_env();
        if repo_type == RepositoryType::Postgres {
            self.postgres_config = postgres_config_from_env()?;
        }
        self.repo_type = Some(repo_type);
        Ok(self)
    }

    pub fn from_config_file<P: AsRef<Path>>(mut self, path: P) -> RepositoryResult<Self> {
        let (repo_type, pg) = RepositoryConfig::from_file(path)?.backend()?;
        self.repo_type = Some(repo_type);
        self.postgres_config = pg;
        Ok(self)
    }

    pub async fn build(self) -> RepositoryResult<Arc<dyn FullRepository>> {
        let repo_type = self.repo_type.unwrap_or_else(RepositoryType::from_env);
        RepositoryFactory::create(repo_type, self.postgres_config.as_ref()).await
    }
}
