//! `repository.toml`: which backend the server opens and its pool settings.
//!
//! ```toml
//! [repository]
//! type = "postgres"
//!
//! [postgres]
//! database_url = "postgres://planner@localhost/training_hub"
//! max_connections = 10
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::factory::RepositoryType;
use super::repository::{RepositoryError, RepositoryResult};
use crate::db::PostgresConfig;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_VAR: &str = "REPOSITORY_CONFIG";

/// Searched in order when [`CONFIG_PATH_VAR`] is unset.
pub const CONFIG_SEARCH_PATHS: &[&str] = &[
    "repository.toml",
    "backend/repository.toml",
    "../repository.toml",
];

/// Parsed `repository.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub repository: BackendSection,
    #[serde(default)]
    pub postgres: PoolSection,
}

/// `[repository]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSection {
    /// `local` or `postgres` (`pg`).
    #[serde(rename = "type")]
    pub kind: String,
}

/// `[postgres]`. Unset keys take the same defaults as the `PG_*` variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSection {
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Seconds.
    pub connect_timeout: u64,
    /// Seconds.
    pub idle_timeout: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for PoolSection {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: 10,
            min_connections: 1,
            connect_timeout: 30,
            idle_timeout: 600,
            max_retries: 3,
            retry_delay_ms: 100,
        }
    }
}

impl RepositoryConfig {
    pub fn parse(text: &str) -> RepositoryResult<Self> {
        toml::from_str(text).map_err(|e| {
            RepositoryError::configuration(format!("Failed to parse config file: {}", e))
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> RepositoryResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            RepositoryError::configuration(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::parse(&text)
    }

    /// The file named by `REPOSITORY_CONFIG`, else the first of
    /// [`CONFIG_SEARCH_PATHS`] that exists.
    pub fn discover() -> RepositoryResult<Self> {
        if let Ok(path) = std::env::var(CONFIG_PATH_VAR) {
            return Self::from_file(path);
        }
        CONFIG_SEARCH_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.is_file())
            .map(Self::from_file)
            .unwrap_or_else(|| {
                Err(RepositoryError::configuration(
                    "No repository.toml found in standard locations",
                ))
            })
    }

    pub fn repository_type(&self) -> Result<RepositoryType, String> {
        self.repository.kind.parse()
    }

    /// Backend type plus the connection settings it needs.
    ///
    /// Without the `postgres-repo` feature a postgres entry resolves to no
    /// settings; opening it then fails in the factory.
    pub fn backend(&self) -> RepositoryResult<(RepositoryType, Option<PostgresConfig>)> {
        let repo_type = self.repository_type().map_err(|e| {
            RepositoryError::configuration(format!("Invalid repository type: {}", e))
        })?;
        match repo_type {
            RepositoryType::Local => Ok((repo_type, None)),
            RepositoryType::Postgres => Ok((repo_type, self.postgres.to_postgres_config()?)),
        }
    }
}

impl PoolSection {
    #[cfg(feature = "postgres-repo")]
    fn to_postgres_config(&self) -> RepositoryResult<Option<PostgresConfig>> {
        let url = self
            .database_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                RepositoryError::configuration(
                    "Postgres repository requires 'postgres.database_url'",
                )
            })?;
        Ok(Some(PostgresConfig {
            database_url: url.to_string(),
            max_pool_size: self.max_connections,
            min_pool_size: self.min_connections,
            connection_timeout_sec: self.connect_timeout,
            idle_timeout_sec: self.idle_timeout,
            max_retries: self.max_retries,
            retry_delay_ms: self.retry_delay_ms,
        }))
    }

    #[cfg(not(feature = "postgres-repo"))]
    fn to_postgres_config(&self) -> RepositoryResult<Option<PostgresConfig>> {
        Ok(None)
    }
}
