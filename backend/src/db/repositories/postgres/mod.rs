//! Postgres backend: Diesel over an r2d2 pool.
//!
//! The schema lives in `migrations/` and is applied on start-up. Enumerations
//! are text columns; training sessions, plan items and permission overrides
//! are JSONB.
//!
//! Every operation runs on the blocking pool through [`PostgresRepository::with_conn`],
//! which retries retryable failures (pool checkout, timeouts, serialization
//! failures) with exponential backoff.
//!
//! Environment (see [`PostgresConfig::from_env`]):
//! `DATABASE_URL` / `PG_DATABASE_URL`, `PG_POOL_MAX`, `PG_POOL_MIN`,
//! `PG_CONN_TIMEOUT_SEC`, `PG_IDLE_TIMEOUT_SEC`, `PG_MAX_RETRIES`,
//! `PG_RETRY_DELAY_MS`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_query;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task;

use crate::api::*;
use crate::db::repository::{
    AccessRepository, CatalogRepository, ComplianceRepository, ErrorContext, PersonnelRepository,
    PlanningRepository, RepositoryError, RepositoryResult, TrainingRepository, training_full,
};
use crate::models::normalize_email;

mod models;
mod schema;

use models::*;
use schema::*;

type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/db/repositories/postgres/migrations");

/// Pool and retry settings.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub database_url: String,
    pub max_pool_size: u32,
    pub min_pool_size: u32,
    pub connection_timeout_sec: u64,
    pub idle_timeout_sec: u64,
    /// Extra attempts after the first for retryable failures.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub retry_delay_ms: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: 10,
            min_pool_size: 1,
            connection_timeout_sec: 30,
            idle_timeout_sec: 600,
            max_retries: 3,
            retry_delay_ms: 100,
        }
    }
}

/// `name` parsed as `T`; unset or unparsable values give `default`.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("Ignoring invalid {}={:?}", name, raw);
            default
        }),
        Err(_) => default,
    }
}

impl PostgresConfig {
    /// Settings from `DATABASE_URL` (or `PG_DATABASE_URL`) and the `PG_*`
    /// variables, each falling back to [`PostgresConfig::default`].
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("PG_DATABASE_URL"))
            .map_err(|_| "DATABASE_URL or PG_DATABASE_URL must be set".to_string())?;
        let defaults = Self::default();

        Ok(Self {
            database_url,
            max_pool_size: env_or("PG_POOL_MAX", defaults.max_pool_size),
            min_pool_size: env_or("PG_POOL_MIN", defaults.min_pool_size),
            connection_timeout_sec: env_or("PG_CONN_TIMEOUT_SEC", defaults.connection_timeout_sec),
            idle_timeout_sec: env_or("PG_IDLE_TIMEOUT_SEC", defaults.idle_timeout_sec),
            max_retries: env_or("PG_MAX_RETRIES", defaults.max_retries),
            retry_delay_ms: env_or("PG_RETRY_DELAY_MS", defaults.retry_delay_ms),
        })
    }

    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Self::default()
        }
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

/// Pool occupancy and query counters since start-up.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    pub connections_in_use: u32,
    pub idle_connections: u32,
    pub total_connections: u32,
    pub max_size: u32,
    pub total_queries: u64,
    pub failed_queries: u64,
    pub retried_operations: u64,
}

#[derive(Debug, Default)]
struct QueryCounters {
    total: AtomicU64,
    failed: AtomicU64,
    retried: AtomicU64,
}

#[derive(Debug, Clone, Copy)]
struct RetryPolicy {
    max_retries: u32,
    initial_delay: Duration,
}

impl RetryPolicy {
    /// Backoff before retry number `retry` (1-based).
    fn delay(&self, retry: u32) -> Duration {
        self.initial_delay
            .saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)))
    }
}

/// Runs `op` on a pooled connection until it succeeds, fails permanently or
/// the retries are used up. Blocking; call from `spawn_blocking`.
fn run_with_retry<T, F>(
    pool: &PgPool,
    policy: RetryPolicy,
    counters: &QueryCounters,
    op: F,
) -> RepositoryResult<T>
where
    F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Clone,
{
    let mut retry = 0;
    loop {
        let result = pool
            .get()
            .map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("get_connection")
                        .with_details(format!("attempt={}", retry + 1)),
                )
            })
            .and_then(|mut conn| {
                counters.total.fetch_add(1, Ordering::Relaxed);
                op.clone()(&mut conn)
            });

        match result {
            Err(e) if e.is_retryable() && retry < policy.max_retries => {
                retry += 1;
                counters.retried.fetch_add(1, Ordering::Relaxed);
                log::debug!("Retrying after {} (retry {})", e, retry);
                std::thread::sleep(policy.delay(retry));
            }
            Err(e) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                return Err(e);
            }
            ok => return ok,
        }
    }
}

/// Diesel-backed repository. Cloning shares the pool and counters.
#[derive(Clone, Debug)]
pub struct PostgresRepository {
    pool: PgPool,
    config: PostgresConfig,
    counters: Arc<QueryCounters>,
}

impl PostgresRepository {
    /// Connect and apply pending migrations. Blocks.
    pub fn new(config: PostgresConfig) -> RepositoryResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);
        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_sec)))
            .test_on_check_out(true)
            .build(manager)
            .map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("create_pool")
                        .with_details(format!("max_size={}", config.max_pool_size)),
                )
            })?;

        let mut conn = pool.get()?;
        let applied = conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Migration failed: {}", e),
                ErrorContext::new("run_migrations"),
            )
        })?;
        if !applied.is_empty() {
            log::info!("Applied {} migration(s)", applied.len());
        }
        drop(conn);

        Ok(Self {
            pool,
            config,
            counters: Arc::new(QueryCounters::default()),
        })
    }

    /// Run `op` on the blocking pool with retries.
    async fn with_conn<T, F>(&self, op: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Clone + Send + 'static,
    {
        let pool = self.pool.clone();
        let policy = self.config.retry_policy();
        let counters = self.counters.clone();
        task::spawn_blocking(move || run_with_retry(&pool, policy, &counters, op))
            .await
            .map_err(|e| {
                RepositoryError::internal_with_context(
                    format!("Task join error: {}", e),
                    ErrorContext::new("spawn_blocking"),
                )
            })?
    }

    pub fn pool_stats(&self) -> PoolStats {
        let state = self.pool.state();
        PoolStats {
            connections_in_use: state.connections - state.idle_connections,
            idle_connections: state.idle_connections,
            total_connections: state.connections,
            max_size: self.config.max_pool_size,
            total_queries: self.counters.total.load(Ordering::Relaxed),
            failed_queries: self.counters.failed.load(Ordering::Relaxed),
            retried_operations: self.counters.retried.load(Ordering::Relaxed),
        }
    }
}


fn map_diesel_error(err: diesel::result::Error) -> RepositoryError {
    RepositoryError::from(err)
}

fn expect_deleted(affected: usize, entity: &str, id: impl std::fmt::Display) -> RepositoryResult<()> {
    if affected == 0 {
        Err(RepositoryError::missing(entity, id))
    } else {
        Ok(())
    }
}

fn load_plans(conn: &mut PgConnection) -> RepositoryResult<Vec<PreliminaryPlan>> {
    preliminary_plans::table
        .order(preliminary_plans::id.asc())
        .select(PlanRow::as_select())
        .load::<PlanRow>(conn)
        .map_err(map_diesel_error)?
        .into_iter()
        .map(PreliminaryPlan::try_from)
        .collect()
}

// =============================================================================
// Personnel
// =============================================================================

#[async_trait]
impl PersonnelRepository for PostgresRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.with_conn(|conn| {
            sql_query("SELECT 1")
                .execute(conn)
                .map(|_| true)
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn create_employee(&self, draft: &EmployeeDraft) -> RepositoryResult<Employee> {
        let values = EmployeeValues::from_draft(draft, Utc::now());
        self.with_conn(move |conn| {
            diesel::insert_into(employees::table)
                .values(&values)
                .returning(EmployeeRow::as_returning())
                .get_result(conn)
                .map(Employee::from)
                .map_err(|e| map_diesel_error(e).with_operation("create_employee"))
        })
        .await
    }

    async fn get_employee(&self, id: EmployeeId) -> RepositoryResult<Employee> {
        self.with_conn(move |conn| {
            employees::table
                .find(id.value())
                .select(EmployeeRow::as_select())
                .first(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(Employee::from)
                .ok_or_else(|| RepositoryError::missing("employee", id))
        })
        .await
    }

    async fn list_employees(&self) -> RepositoryResult<Vec<Employee>> {
        self.with_conn(|conn| {
            employees::table
                .order(employees::id.asc())
                .select(EmployeeRow::as_select())
                .load::<EmployeeRow>(conn)
                .map(|rows| rows.into_iter().map(Employee::from).collect())
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn update_employee(
        &self,
        id: EmployeeId,
        draft: &EmployeeDraft,
    ) -> RepositoryResult<Employee> {
        let values = EmployeeValues::from_draft(draft, Utc::now());
        self.with_conn(move |conn| {
            diesel::update(employees::table.find(id.value()))
                .set(&values)
                .returning(EmployeeRow::as_returning())
                .get_result(conn)
                .optional()
                .map_err(|e| map_diesel_error(e).with_operation("update_employee"))?
                .map(Employee::from)
                .ok_or_else(|| RepositoryError::missing("employee", id))
        })
        .await
    }

    async fn delete_employee(&self, id: EmployeeId) -> RepositoryResult<()> {
        self.with_conn(move |conn| {
            conn.transaction::<_, RepositoryError, _>(|tx| {
                // Plan items live in JSONB and are not covered by the FK cascade.
                let now = Utc::now();
                for plan in load_plans(tx)? {
                    if !plan.contains(id) {
                        continue;
                    }
                    let items: Vec<PlanItem> = plan
                        .items
                        .into_iter()
                        .filter(|item| item.employee_id != id)
                        .collect();
                    diesel::update(preliminary_plans::table.find(plan.id.value()))
                        .set((
                            preliminary_plans::items_json.eq(to_json("items_json", &items)?),
                            preliminary_plans::updated_at.eq(now),
                        ))
                        .execute(tx)?;
                }
                let affected = diesel::delete(employees::table.find(id.value())).execute(tx)?;
                expect_deleted(affected, "employee", id)
            })
        })
        .await
    }

    async fn create_availability(
        &self,
        employee_id: EmployeeId,
        draft: &AvailabilityDraft,
    ) -> RepositoryResult<Availability> {
        let row = NewAvailabilityRow {
            employee_id: employee_id.value(),
            values: AvailabilityValues::from_draft(draft, Utc::now()),
        };
        self.with_conn(move |conn| {
            let exists = employees::table
                .find(employee_id.value())
                .count()
                .get_result::<i64>(conn)
                .map_err(map_diesel_error)?;
            if exists == 0 {
                return Err(RepositoryError::missing("employee", employee_id));
            }
            diesel::insert_into(employee_availability::table)
                .values(&row)
                .returning(AvailabilityRow::as_returning())
                .get_result(conn)
                .map_err(map_diesel_error)
                .and_then(Availability::try_from)
        })
        .await
    }

    async fn get_availability(&self, id: AvailabilityId) -> RepositoryResult<Availability> {
        self.with_conn(move |conn| {
            employee_availability::table
                .find(id.value())
                .select(AvailabilityRow::as_select())
                .first(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| RepositoryError::missing("availability", id))
                .and_then(Availability::try_from)
        })
        .await
    }

    async fn list_availability_for_employee(
        &self,
        employee_id: EmployeeId,
    ) -> RepositoryResult<Vec<Availability>> {
        self.with_conn(move |conn| {
            let exists = employees::table
                .find(employee_id.value())
                .count()
                .get_result::<i64>(conn)
                .map_err(map_diesel_error)?;
            if exists == 0 {
                return Err(RepositoryError::missing("employee", employee_id));
            }
            employee_availability::table
                .filter(employee_availability::employee_id.eq(employee_id.value()))
                .order((
                    employee_availability::start_date.asc(),
                    employee_availability::id.asc(),
                ))
                .select(AvailabilityRow::as_select())
                .load::<AvailabilityRow>(conn)
                .map_err(map_diesel_error)?
                .into_iter()
                .map(Availability::try_from)
                .collect()
        })
        .await
    }

    async fn list_availability(&self) -> RepositoryResult<Vec<Availability>> {
        self.with_conn(|conn| {
            employee_availability::table
                .order((
                    employee_availability::start_date.asc(),
                    employee_availability::id.asc(),
                ))
                .select(AvailabilityRow::as_select())
                .load::<AvailabilityRow>(conn)
                .map_err(map_diesel_error)?
                .into_iter()
                .map(Availability::try_from)
                .collect()
        })
        .await
    }

    async fn update_availability(
        &self,
        id: AvailabilityId,
        draft: &AvailabilityDraft,
    ) -> RepositoryResult<Availability> {
        let values = AvailabilityValues::from_draft(draft, Utc::now());
        self.with_conn(move |conn| {
            diesel::update(employee_availability::table.find(id.value()))
                .set(&values)
                .returning(AvailabilityRow::as_returning())
                .get_result(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| RepositoryError::missing("availability", id))
                .and_then(Availability::try_from)
        })
        .await
    }

    async fn delete_availability(&self, id: AvailabilityId) -> RepositoryResult<()> {
        self.with_conn(move |conn| {
            let affected = diesel::delete(employee_availability::table.find(id.value()))
                .execute(conn)
                .map_err(map_diesel_error)?;
            expect_deleted(affected, "availability", id)
        })
        .await
    }
}

// =============================================================================
// Catalog
// =============================================================================

#[async_trait]
impl CatalogRepository for PostgresRepository {
    async fn create_provider(&self, draft: &ProviderDraft) -> RepositoryResult<Provider> {
        let values = ProviderValues::from_draft(draft, Utc::now());
        self.with_conn(move |conn| {
            diesel::insert_into(providers::table)
                .values(&values)
                .returning(ProviderRow::as_returning())
                .get_result(conn)
                .map(Provider::from)
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn get_provider(&self, id: ProviderId) -> RepositoryResult<Provider> {
        self.with_conn(move |conn| {
            providers::table
                .find(id.value())
                .select(ProviderRow::as_select())
                .first(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(Provider::from)
                .ok_or_else(|| RepositoryError::missing("provider", id))
        })
        .await
    }

    async fn list_providers(&self) -> RepositoryResult<Vec<Provider>> {
        self.with_conn(|conn| {
            providers::table
                .order(providers::id.asc())
                .select(ProviderRow::as_select())
                .load::<ProviderRow>(conn)
                .map(|rows| rows.into_iter().map(Provider::from).collect())
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn update_provider(
        &self,
        id: ProviderId,
        draft: &ProviderDraft,
    ) -> RepositoryResult<Provider> {
        let values = ProviderValues::from_draft(draft, Utc::now());
        self.with_conn(move |conn| {
            diesel::update(providers::table.find(id.value()))
                .set(&values)
                .returning(ProviderRow::as_returning())
                .get_result(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(Provider::from)
                .ok_or_else(|| RepositoryError::missing("provider", id))
        })
        .await
    }

    async fn delete_provider(&self, id: ProviderId) -> RepositoryResult<()> {
        self.with_conn(move |conn| {
            let affected = diesel::delete(providers::table.find(id.value()))
                .execute(conn)
                .map_err(|e| map_diesel_error(e).with_operation("delete_provider"))?;
            expect_deleted(affected, "provider", id)
        })
        .await
    }

    async fn create_course(&self, draft: &CourseDraft) -> RepositoryResult<Course> {
        let values = CourseValues::from_draft(draft, Utc::now())?;
        self.with_conn(move |conn| {
            diesel::insert_into(courses::table)
                .values(&values)
                .returning(CourseRow::as_returning())
                .get_result(conn)
                .map(Course::from)
                .map_err(|e| map_diesel_error(e).with_operation("create_course"))
        })
        .await
    }

    async fn get_course(&self, id: CourseId) -> RepositoryResult<Course> {
        self.with_conn(move |conn| {
            courses::table
                .find(id.value())
                .select(CourseRow::as_select())
                .first(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(Course::from)
                .ok_or_else(|| RepositoryError::missing("course", id))
        })
        .await
    }

    async fn list_courses(&self) -> RepositoryResult<Vec<Course>> {
        self.with_conn(|conn| {
            courses::table
                .order(courses::id.asc())
                .select(CourseRow::as_select())
                .load::<CourseRow>(conn)
                .map(|rows| rows.into_iter().map(Course::from).collect())
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn update_course(&self, id: CourseId, draft: &CourseDraft) -> RepositoryResult<Course> {
        let values = CourseValues::from_draft(draft, Utc::now())?;
        self.with_conn(move |conn| {
            diesel::update(courses::table.find(id.value()))
                .set(&values)
                .returning(CourseRow::as_returning())
                .get_result(conn)
                .optional()
                .map_err(|e| map_diesel_error(e).with_operation("update_course"))?
                .map(Course::from)
                .ok_or_else(|| RepositoryError::missing("course", id))
        })
        .await
    }

    async fn delete_course(&self, id: CourseId) -> RepositoryResult<()> {
        self.with_conn(move |conn| {
            let affected = diesel::delete(courses::table.find(id.value()))
                .execute(conn)
                .map_err(|e| map_diesel_error(e).with_operation("delete_course"))?;
            expect_deleted(affected, "course", id)
        })
        .await
    }

    async fn create_certificate(
        &self,
        draft: &CertificateDefinitionDraft,
    ) -> RepositoryResult<CertificateDefinition> {
        let values = CertificateValues::from_draft(draft, Utc::now())?;
        self.with_conn(move |conn| {
            diesel::insert_into(certificate_definitions::table)
                .values(&values)
                .returning(CertificateRow::as_returning())
                .get_result(conn)
                .map(CertificateDefinition::from)
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn get_certificate(&self, id: CertificateId) -> RepositoryResult<CertificateDefinition> {
        self.with_conn(move |conn| {
            certificate_definitions::table
                .find(id.value())
                .select(CertificateRow::as_select())
                .first(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(CertificateDefinition::from)
                .ok_or_else(|| RepositoryError::missing("certificate", id))
        })
        .await
    }

    async fn list_certificates(&self) -> RepositoryResult<Vec<CertificateDefinition>> {
        self.with_conn(|conn| {
            certificate_definitions::table
                .order(certificate_definitions::id.asc())
                .select(CertificateRow::as_select())
                .load::<CertificateRow>(conn)
                .map(|rows| rows.into_iter().map(CertificateDefinition::from).collect())
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn update_certificate(
        &self,
        id: CertificateId,
        draft: &CertificateDefinitionDraft,
    ) -> RepositoryResult<CertificateDefinition> {
        let values = CertificateValues::from_draft(draft, Utc::now())?;
        self.with_conn(move |conn| {
            diesel::update(certificate_definitions::table.find(id.value()))
                .set(&values)
                .returning(CertificateRow::as_returning())
                .get_result(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(CertificateDefinition::from)
                .ok_or_else(|| RepositoryError::missing("certificate", id))
        })
        .await
    }

    async fn delete_certificate(&self, id: CertificateId) -> RepositoryResult<()> {
        self.with_conn(move |conn| {
            conn.transaction::<_, RepositoryError, _>(|tx| {
                let in_plan_items = load_plans(tx)?
                    .iter()
                    .any(|p| p.items.iter().any(|i| i.certificate_id == Some(id)));
                if in_plan_items {
                    return Err(RepositoryError::validation_with_context(
                        format!("certificate {} is still referenced by a plan", id),
                        ErrorContext::new("delete_certificate")
                            .with_entity("certificate")
                            .with_entity_id(id),
                    ));
                }
                let affected = diesel::delete(certificate_definitions::table.find(id.value()))
                    .execute(tx)
                    .map_err(|e| map_diesel_error(e).with_operation("delete_certificate"))?;
                expect_deleted(affected, "certificate", id)
            })
        })
        .await
    }
}

// =============================================================================
// Trainings
// =============================================================================

#[async_trait]
impl TrainingRepository for PostgresRepository {
    async fn create_training(&self, draft: &TrainingDraft) -> RepositoryResult<Training> {
        let values = TrainingValues::from_draft(draft, Utc::now())?;
        self.with_conn(move |conn| {
            diesel::insert_into(trainings::table)
                .values(&values)
                .returning(TrainingRow::as_returning())
                .get_result(conn)
                .map_err(|e| map_diesel_error(e).with_operation("create_training"))
                .and_then(Training::try_from)
        })
        .await
    }

    async fn get_training(&self, id: TrainingId) -> RepositoryResult<Training> {
        self.with_conn(move |conn| {
            trainings::table
                .find(id.value())
                .select(TrainingRow::as_select())
                .first(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| RepositoryError::missing("training", id))
                .and_then(Training::try_from)
        })
        .await
    }

    async fn list_trainings(&self) -> RepositoryResult<Vec<Training>> {
        self.with_conn(|conn| {
            trainings::table
                .order(trainings::id.asc())
                .select(TrainingRow::as_select())
                .load::<TrainingRow>(conn)
                .map_err(map_diesel_error)?
                .into_iter()
                .map(Training::try_from)
                .collect()
        })
        .await
    }

    async fn update_training(
        &self,
        id: TrainingId,
        draft: &TrainingDraft,
    ) -> RepositoryResult<Training> {
        let values = TrainingValues::from_draft(draft, Utc::now())?;
        self.with_conn(move |conn| {
            diesel::update(trainings::table.find(id.value()))
                .set(&values)
                .returning(TrainingRow::as_returning())
                .get_result(conn)
                .optional()
                .map_err(|e| map_diesel_error(e).with_operation("update_training"))?
                .ok_or_else(|| RepositoryError::missing("training", id))
                .and_then(Training::try_from)
        })
        .await
    }

    async fn set_training_status(
        &self,
        id: TrainingId,
        status: TrainingStatus,
    ) -> RepositoryResult<Training> {
        self.with_conn(move |conn| {
            diesel::update(trainings::table.find(id.value()))
                .set((
                    trainings::status.eq(status.as_str()),
                    trainings::updated_at.eq(Utc::now()),
                ))
                .returning(TrainingRow::as_returning())
                .get_result(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| RepositoryError::missing("training", id))
                .and_then(Training::try_from)
        })
        .await
    }

    async fn delete_training(&self, id: TrainingId) -> RepositoryResult<()> {
        self.with_conn(move |conn| {
            let affected = diesel::delete(trainings::table.find(id.value()))
                .execute(conn)
                .map_err(map_diesel_error)?;
            expect_deleted(affected, "training", id)
        })
        .await
    }

    async fn add_participant(
        &self,
        training_id: TrainingId,
        draft: &ParticipantDraft,
    ) -> RepositoryResult<TrainingParticipant> {
        let row = NewParticipantRow::from_draft(training_id, draft, Utc::now());
        self.with_conn(move |conn| {
            conn.transaction::<_, RepositoryError, _>(|tx| {
                // The row lock serializes concurrent enrollments into one training.
                let (course_id, training_max) = trainings::table
                    .find(training_id.value())
                    .select((trainings::course_id, trainings::max_participants))
                    .for_update()
                    .first::<(i64, Option<i32>)>(tx)
                    .optional()
                    .map_err(map_diesel_error)?
                    .ok_or_else(|| RepositoryError::missing("training", training_id))?;
                let capacity = match training_max {
                    Some(max) => Some(max),
                    None => courses::table
                        .find(course_id)
                        .select(courses::max_participants)
                        .first::<Option<i32>>(tx)
                        .map_err(map_diesel_error)?,
                };
                if let Some(max) = capacity {
                    let taken = training_participants::table
                        .filter(training_participants::training_id.eq(training_id.value()))
                        .filter(
                            training_participants::status
                                .ne(ParticipantStatus::Cancelled.as_str()),
                        )
                        .count()
                        .get_result::<i64>(tx)
                        .map_err(map_diesel_error)?;
                    if taken >= i64::from(max) {
                        return Err(training_full(
                            training_id,
                            usize::try_from(taken).unwrap_or(usize::MAX),
                            u32::try_from(max).unwrap_or(0),
                        ));
                    }
                }
                let inserted = diesel::insert_into(training_participants::table)
                    .values(&row)
                    .returning(ParticipantRow::as_returning())
                    .get_result(tx)
                    .map_err(|e| map_diesel_error(e).with_operation("add_participant"))?;
                TrainingParticipant::try_from(inserted)
            })
        })
        .await
    }

    async fn get_participant(&self, id: ParticipantId) -> RepositoryResult<TrainingParticipant> {
        self.with_conn(move |conn| {
            training_participants::table
                .find(id.value())
                .select(ParticipantRow::as_select())
                .first(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| RepositoryError::missing("participant", id))
                .and_then(TrainingParticipant::try_from)
        })
        .await
    }

    async fn list_participants(
        &self,
        training_id: TrainingId,
    ) -> RepositoryResult<Vec<TrainingParticipant>> {
        self.with_conn(move |conn| {
            let exists = trainings::table
                .find(training_id.value())
                .count()
                .get_result::<i64>(conn)
                .map_err(map_diesel_error)?;
            if exists == 0 {
                return Err(RepositoryError::missing("training", training_id));
            }
            training_participants::table
                .filter(training_participants::training_id.eq(training_id.value()))
                .order(training_participants::id.asc())
                .select(ParticipantRow::as_select())
                .load::<ParticipantRow>(conn)
                .map_err(map_diesel_error)?
                .into_iter()
                .map(TrainingParticipant::try_from)
                .collect()
        })
        .await
    }

    async fn list_participations(
        &self,
        employee_id: EmployeeId,
    ) -> RepositoryResult<Vec<TrainingParticipant>> {
        self.with_conn(move |conn| {
            training_participants::table
                .filter(training_participants::employee_id.eq(employee_id.value()))
                .order(training_participants::id.asc())
                .select(ParticipantRow::as_select())
                .load::<ParticipantRow>(conn)
                .map_err(map_diesel_error)?
                .into_iter()
                .map(TrainingParticipant::try_from)
                .collect()
        })
        .await
    }

    async fn update_participant(
        &self,
        id: ParticipantId,
        status: ParticipantStatus,
        code95_points_awarded: u32,
        notes: Option<String>,
    ) -> RepositoryResult<TrainingParticipant> {
        let changes = ParticipantChanges {
            status: status.as_str().to_string(),
            code95_points_awarded: to_i32("code95_points_awarded", code95_points_awarded)?,
            notes,
            updated_at: Utc::now(),
        };
        self.with_conn(move |conn| {
            diesel::update(training_participants::table.find(id.value()))
                .set(&changes)
                .returning(ParticipantRow::as_returning())
                .get_result(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| RepositoryError::missing("participant", id))
                .and_then(TrainingParticipant::try_from)
        })
        .await
    }

    async fn remove_participant(&self, id: ParticipantId) -> RepositoryResult<()> {
        self.with_conn(move |conn| {
            let affected = diesel::delete(training_participants::table.find(id.value()))
                .execute(conn)
                .map_err(map_diesel_error)?;
            expect_deleted(affected, "participant", id)
        })
        .await
    }
}

// =============================================================================
// Licenses
// =============================================================================

#[async_trait]
impl ComplianceRepository for PostgresRepository {
    async fn create_license(
        &self,
        employee_id: EmployeeId,
        draft: &LicenseDraft,
    ) -> RepositoryResult<EmployeeLicense> {
        let row = NewLicenseRow {
            employee_id: employee_id.value(),
            values: LicenseValues::from_draft(draft, Utc::now()),
        };
        self.with_conn(move |conn| {
            let exists = employees::table
                .find(employee_id.value())
                .count()
                .get_result::<i64>(conn)
                .map_err(map_diesel_error)?;
            if exists == 0 {
                return Err(RepositoryError::missing("employee", employee_id));
            }
            diesel::insert_into(employee_licenses::table)
                .values(&row)
                .returning(LicenseRow::as_returning())
                .get_result(conn)
                .map(EmployeeLicense::from)
                .map_err(|e| map_diesel_error(e).with_operation("create_license"))
        })
        .await
    }

    async fn get_license(&self, id: LicenseId) -> RepositoryResult<EmployeeLicense> {
        self.with_conn(move |conn| {
            employee_licenses::table
                .find(id.value())
                .select(LicenseRow::as_select())
                .first(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(EmployeeLicense::from)
                .ok_or_else(|| RepositoryError::missing("license", id))
        })
        .await
    }

    async fn list_licenses_for_employee(
        &self,
        employee_id: EmployeeId,
    ) -> RepositoryResult<Vec<EmployeeLicense>> {
        self.with_conn(move |conn| {
            let exists = employees::table
                .find(employee_id.value())
                .count()
                .get_result::<i64>(conn)
                .map_err(map_diesel_error)?;
            if exists == 0 {
                return Err(RepositoryError::missing("employee", employee_id));
            }
            employee_licenses::table
                .filter(employee_licenses::employee_id.eq(employee_id.value()))
                .order((employee_licenses::issued_on.asc(), employee_licenses::id.asc()))
                .select(LicenseRow::as_select())
                .load::<LicenseRow>(conn)
                .map(|rows| rows.into_iter().map(EmployeeLicense::from).collect())
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn list_licenses(&self) -> RepositoryResult<Vec<EmployeeLicense>> {
        self.with_conn(|conn| {
            employee_licenses::table
                .order((employee_licenses::issued_on.asc(), employee_licenses::id.asc()))
                .select(LicenseRow::as_select())
                .load::<LicenseRow>(conn)
                .map(|rows| rows.into_iter().map(EmployeeLicense::from).collect())
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn update_license(
        &self,
        id: LicenseId,
        draft: &LicenseDraft,
    ) -> RepositoryResult<EmployeeLicense> {
        let values = LicenseValues::from_draft(draft, Utc::now());
        self.with_conn(move |conn| {
            diesel::update(employee_licenses::table.find(id.value()))
                .set(&values)
                .returning(LicenseRow::as_returning())
                .get_result(conn)
                .optional()
                .map_err(|e| map_diesel_error(e).with_operation("update_license"))?
                .map(EmployeeLicense::from)
                .ok_or_else(|| RepositoryError::missing("license", id))
        })
        .await
    }

    async fn delete_license(&self, id: LicenseId) -> RepositoryResult<()> {
        self.with_conn(move |conn| {
            let affected = diesel::delete(employee_licenses::table.find(id.value()))
                .execute(conn)
                .map_err(map_diesel_error)?;
            expect_deleted(affected, "license", id)
        })
        .await
    }
}

// =============================================================================
// Plans
// =============================================================================

#[async_trait]
impl PlanningRepository for PostgresRepository {
    async fn create_plan(&self, draft: &PlanDraft) -> RepositoryResult<PreliminaryPlan> {
        let values = PlanValues::from_draft(draft, Utc::now())?;
        let employee_ids: Vec<i64> = draft.items.iter().map(|i| i.employee_id.value()).collect();
        self.with_conn(move |conn| {
            conn.transaction::<_, RepositoryError, _>(|tx| {
                check_plan_employees(tx, &employee_ids)?;
                let inserted = diesel::insert_into(preliminary_plans::table)
                    .values(&values)
                    .returning(PlanRow::as_returning())
                    .get_result(tx)
                    .map_err(|e| map_diesel_error(e).with_operation("create_plan"))?;
                PreliminaryPlan::try_from(inserted)
            })
        })
        .await
    }

    async fn get_plan(&self, id: PlanId) -> RepositoryResult<PreliminaryPlan> {
        self.with_conn(move |conn| {
            preliminary_plans::table
                .find(id.value())
                .select(PlanRow::as_select())
                .first(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| RepositoryError::missing("plan", id))
                .and_then(PreliminaryPlan::try_from)
        })
        .await
    }

    async fn list_plans(&self) -> RepositoryResult<Vec<PreliminaryPlan>> {
        self.with_conn(load_plans).await
    }

    async fn update_plan(
        &self,
        id: PlanId,
        draft: &PlanDraft,
    ) -> RepositoryResult<PreliminaryPlan> {
        let values = PlanValues::from_draft(draft, Utc::now())?;
        let employee_ids: Vec<i64> = draft.items.iter().map(|i| i.employee_id.value()).collect();
        self.with_conn(move |conn| {
            conn.transaction::<_, RepositoryError, _>(|tx| {
                check_plan_employees(tx, &employee_ids)?;
                diesel::update(preliminary_plans::table.find(id.value()))
                    .set(&values)
                    .returning(PlanRow::as_returning())
                    .get_result(tx)
                    .optional()
                    .map_err(|e| map_diesel_error(e).with_operation("update_plan"))?
                    .ok_or_else(|| RepositoryError::missing("plan", id))
                    .and_then(PreliminaryPlan::try_from)
            })
        })
        .await
    }

    async fn mark_plan_converted(
        &self,
        id: PlanId,
        training_id: TrainingId,
    ) -> RepositoryResult<PreliminaryPlan> {
        self.with_conn(move |conn| {
            diesel::update(preliminary_plans::table.find(id.value()))
                .set((
                    preliminary_plans::status.eq(PlanStatus::Converted.as_str()),
                    preliminary_plans::converted_training_id.eq(Some(training_id.value())),
                    preliminary_plans::updated_at.eq(Utc::now()),
                ))
                .returning(PlanRow::as_returning())
                .get_result(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| RepositoryError::missing("plan", id))
                .and_then(PreliminaryPlan::try_from)
        })
        .await
    }

    async fn delete_plan(&self, id: PlanId) -> RepositoryResult<()> {
        self.with_conn(move |conn| {
            let affected = diesel::delete(preliminary_plans::table.find(id.value()))
                .execute(conn)
                .map_err(map_diesel_error)?;
            expect_deleted(affected, "plan", id)
        })
        .await
    }
}

fn check_plan_employees(conn: &mut PgConnection, employee_ids: &[i64]) -> RepositoryResult<()> {
    if employee_ids.is_empty() {
        return Ok(());
    }
    let found: Vec<i64> = employees::table
        .filter(employees::id.eq_any(employee_ids))
        .select(employees::id)
        .load(conn)
        .map_err(map_diesel_error)?;
    match employee_ids.iter().find(|id| !found.contains(id)) {
        Some(missing) => Err(RepositoryError::validation(format!(
            "employee {} does not exist",
            missing
        ))),
        None => Ok(()),
    }
}

// =============================================================================
// Profiles & sessions
// =============================================================================

#[async_trait]
impl AccessRepository for PostgresRepository {
    async fn create_profile(&self, draft: &ProfileDraft) -> RepositoryResult<Profile> {
        let values = ProfileValues::from_draft(draft, Utc::now())?;
        self.with_conn(move |conn| {
            diesel::insert_into(profiles::table)
                .values(&values)
                .returning(ProfileRow::as_returning())
                .get_result(conn)
                .map_err(|e| map_diesel_error(e).with_operation("create_profile"))
                .and_then(Profile::try_from)
        })
        .await
    }

    async fn get_profile(&self, id: ProfileId) -> RepositoryResult<Profile> {
        self.with_conn(move |conn| {
            profiles::table
                .find(id.value())
                .select(ProfileRow::as_select())
                .first(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| RepositoryError::missing("profile", id))
                .and_then(Profile::try_from)
        })
        .await
    }

    async fn find_profile_by_email(&self, email: &str) -> RepositoryResult<Option<Profile>> {
        let email = normalize_email(email);
        self.with_conn(move |conn| {
            profiles::table
                .filter(profiles::email.eq(&email))
                .select(ProfileRow::as_select())
                .first(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(Profile::try_from)
                .transpose()
        })
        .await
    }

    async fn list_profiles(&self) -> RepositoryResult<Vec<Profile>> {
        self.with_conn(|conn| {
            profiles::table
                .order(profiles::id.asc())
                .select(ProfileRow::as_select())
                .load::<ProfileRow>(conn)
                .map_err(map_diesel_error)?
                .into_iter()
                .map(Profile::try_from)
                .collect()
        })
        .await
    }

    async fn update_profile(
        &self,
        id: ProfileId,
        draft: &ProfileDraft,
    ) -> RepositoryResult<Profile> {
        let values = ProfileValues::from_draft(draft, Utc::now())?;
        self.with_conn(move |conn| {
            diesel::update(profiles::table.find(id.value()))
                .set(&values)
                .returning(ProfileRow::as_returning())
                .get_result(conn)
                .optional()
                .map_err(|e| map_diesel_error(e).with_operation("update_profile"))?
                .ok_or_else(|| RepositoryError::missing("profile", id))
                .and_then(Profile::try_from)
        })
        .await
    }

    async fn store_session(&self, session: &AuthSession) -> RepositoryResult<()> {
        let row = SessionRow::from(session);
        self.with_conn(move |conn| {
            diesel::insert_into(auth_sessions::table)
                .values(&row)
                .execute(conn)
                .map(|_| ())
                .map_err(|e| map_diesel_error(e).with_operation("store_session"))
        })
        .await
    }

    async fn find_session(&self, token_hash: &str) -> RepositoryResult<Option<AuthSession>> {
        let token_hash = token_hash.to_string();
        self.with_conn(move |conn| {
            auth_sessions::table
                .find(&token_hash)
                .select(SessionRow::as_select())
                .first(conn)
                .optional()
                .map(|row| row.map(AuthSession::from))
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn delete_session(&self, token_hash: &str) -> RepositoryResult<bool> {
        let token_hash = token_hash.to_string();
        self.with_conn(move |conn| {
            diesel::delete(auth_sessions::table.find(&token_hash))
                .execute(conn)
                .map(|affected| affected > 0)
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> RepositoryResult<usize> {
        self.with_conn(move |conn| {
            diesel::delete(auth_sessions::table.filter(auth_sessions::expires_at.le(now)))
                .execute(conn)
                .map_err(map_diesel_error)
        })
        .await
    }
}
