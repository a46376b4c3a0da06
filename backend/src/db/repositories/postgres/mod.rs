//! Postgres repository implementation using Diesel.
//!
//! Tables are created by the embedded migrations under `migrations/`.
//! Deleting a destination or group relies on `ON DELETE CASCADE` to clear
//! favourites, shared trips, votes, members and invites.
//!
//! ## Features
//!
//! - Connection pooling with r2d2
//! - Automatic retry for transient failures
//! - Connection health monitoring
//! - Automatic migration execution
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DATABASE_URL` or `PG_DATABASE_URL`: Connection string (required)
//! - `PG_POOL_MAX`: Maximum pool size (default: 10)
//! - `PG_POOL_MIN`: Minimum pool size (default: 1)
//! - `PG_CONN_TIMEOUT_SEC`: Connection timeout in seconds (default: 30)
//! - `PG_IDLE_TIMEOUT_SEC`: Idle connection timeout in seconds (default: 600)
//! - `PG_MAX_RETRIES`: Maximum retry attempts for transient failures (default: 3)
//! - `PG_RETRY_DELAY_MS`: Initial retry delay in milliseconds (default: 100)

use async_trait::async_trait;
use diesel::dsl::{count_star, exists, sql};
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_query;
use diesel::sql_types::{Bool, Double, Text};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::task;

use crate::api::*;
use crate::db::repository::{
    CalendarRepository, CatalogRepository, ErrorContext, GroupRepository, RepositoryError,
    RepositoryResult, UserRepository,
};
use crate::models::{sort_trips, PAGE_SIZE};

mod models;
mod schema;

use models::*;
use schema::*;


type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/db/repositories/postgres/migrations");

/// Configuration for connecting to Postgres.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub database_url: String,
    /// Maximum number of connections in the pool
    pub max_pool_size: u32,
    /// Minimum number of connections in the pool
    pub min_pool_size: u32,
    /// Connection timeout in seconds
    pub connection_timeout_sec: u64,
    /// Idle connection timeout in seconds
    pub idle_timeout_sec: u64,
    /// Maximum number of retry attempts for transient failures
    pub max_retries: u32,
    /// Initial retry delay in milliseconds (doubles with each retry)
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

impl PostgresConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `DATABASE_URL` or `PG_DATABASE_URL`: Connection string (required)
    /// - `PG_POOL_MAX`: Maximum pool size (default: 10)
    /// - `PG_POOL_MIN`: Minimum pool size (default: 1)
    /// - `PG_CONN_TIMEOUT_SEC`: Connection timeout in seconds (default: 30)
    /// - `PG_IDLE_TIMEOUT_SEC`: Idle connection timeout in seconds (default: 600)
    /// - `PG_MAX_RETRIES`: Maximum retry attempts (default: 3)
    /// - `PG_RETRY_DELAY_MS`: Initial retry delay in milliseconds (default: 100)
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("PG_DATABASE_URL"))
            .map_err(|_| "DATABASE_URL or PG_DATABASE_URL must be set".to_string())?;

        let max_pool_size = std::env::var("PG_POOL_MAX")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);

        let min_pool_size = std::env::var("PG_POOL_MIN")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(1);

        let connection_timeout_sec = std::env::var("PG_CONN_TIMEOUT_SEC")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);

        let idle_timeout_sec = std::env::var("PG_IDLE_TIMEOUT_SEC")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(600);

        let max_retries = std::env::var("PG_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(3);

        let retry_delay_ms = std::env::var("PG_RETRY_DELAY_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(100);

        Ok(Self {
            database_url,
            max_pool_size,
            min_pool_size,
            connection_timeout_sec,
            idle_timeout_sec,
            max_retries,
            retry_delay_ms,
        })
    }

    /// Create a new configuration with a database URL.
    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }
}

/// Pool health statistics.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Number of connections currently in use
    pub connections_in_use: u32,
    /// Number of idle connections
    pub idle_connections: u32,
    /// Total number of connections in the pool
    pub total_connections: u32,
    /// Maximum pool size
    pub max_size: u32,
    /// Total successful queries executed
    pub total_queries: u64,
    /// Total failed queries
    pub failed_queries: u64,
    /// Total retried operations
    pub retried_operations: u64,
}

/// Diesel-backed repository for Postgres.
///
/// This repository implementation provides:
/// - Connection pooling with configurable limits
/// - Automatic retry for transient failures
/// - Health monitoring and statistics
/// - Automatic schema migrations
#[derive(Clone, Debug)]
pub struct PostgresRepository {
    pool: PgPool,
    config: PostgresConfig,
    // Metrics counters
    total_queries: std::sync::Arc<AtomicU64>,
    failed_queries: std::sync::Arc<AtomicU64>,
    retried_operations: std::sync::Arc<AtomicU64>,
}

impl PostgresRepository {
    /// Create a new repository and run pending migrations.
    ///
    /// # Arguments
    /// * `config` - Database configuration
    ///
    /// # Returns
    /// * `Ok(PostgresRepository)` on success
    /// * `Err(RepositoryError)` if connection or migration fails
    pub fn new(config: PostgresConfig) -> RepositoryResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_sec)))
            .test_on_check_out(true) // Validate connections before use
            .build(manager)
            .map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("create_pool")
                        .with_details(format!("max_size={}", config.max_pool_size)),
                )
            })?;

        // Run migrations once during initialization
        {
            let mut conn = pool.get().map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("get_connection_for_migrations"),
                )
            })?;
            Self::run_migrations(&mut conn)?;
        }

        Ok(Self {
            pool,
            config,
            total_queries: std::sync::Arc::new(AtomicU64::new(0)),
            failed_queries: std::sync::Arc::new(AtomicU64::new(0)),
            retried_operations: std::sync::Arc::new(AtomicU64::new(0)),
        })
    }

    /// Run pending database migrations.
    fn run_migrations(conn: &mut PgConnection) -> RepositoryResult<()> {
        conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Migration failed: {}", e),
                ErrorContext::new("run_migrations"),
            )
        })?;

        Ok(())
    }

    /// Execute a database operation with automatic retry for transient failures.
    ///
    /// This method will retry the operation up to `max_retries` times if a
    /// retryable error occurs (connection errors, timeouts, serialization failures).
    async fn with_conn<T, F>(&self, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static + Clone,
    {
        let pool = self.pool.clone();
        let max_retries = self.config.max_retries;
        let retry_delay_ms = self.config.retry_delay_ms;
        let total_queries = self.total_queries.clone();
        let failed_queries = self.failed_queries.clone();
        let retried_operations = self.retried_operations.clone();

        task::spawn_blocking(move || {
            let mut last_error = None;
            let mut retry_delay = Duration::from_millis(retry_delay_ms);

            for attempt in 0..=max_retries {
                if attempt > 0 {
                    retried_operations.fetch_add(1, Ordering::Relaxed);
                    std::thread::sleep(retry_delay);
                    retry_delay *= 2; // Exponential backoff
                }

                // Get connection
                let mut conn = match pool.get() {
                    Ok(c) => c,
                    Err(e) => {
                        let err = RepositoryError::connection_with_context(
                            e.to_string(),
                            ErrorContext::new("get_connection")
                                .with_details(format!("attempt={}", attempt + 1))
                                .retryable(),
                        );
                        if attempt < max_retries {
                            last_error = Some(err);
                            continue;
                        }
                        failed_queries.fetch_add(1, Ordering::Relaxed);
                        return Err(err);
                    }
                };

                // Execute the operation
                total_queries.fetch_add(1, Ordering::Relaxed);
                match f.clone()(&mut conn) {
                    Ok(result) => return Ok(result),
                    Err(e) if e.is_retryable() && attempt < max_retries => {
                        last_error = Some(e);
                        continue;
                    }
                    Err(e) => {
                        failed_queries.fetch_add(1, Ordering::Relaxed);
                        return Err(e);
                    }
                }
            }

            failed_queries.fetch_add(1, Ordering::Relaxed);
            Err(last_error.unwrap_or_else(|| {
                RepositoryError::internal("Max retries exceeded with no error captured")
            }))
        })
        .await
        .map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Task join error: {}", e),
                ErrorContext::new("spawn_blocking"),
            )
        })?
    }

    /// Get pool health statistics.
    ///
    /// Returns current pool state and query statistics for monitoring.
    pub fn get_pool_stats(&self) -> PoolStats {
        let state = self.pool.state();
        PoolStats {
            connections_in_use: state.connections - state.idle_connections,
            idle_connections: state.idle_connections,
            total_connections: state.connections,
            max_size: self.config.max_pool_size,
            total_queries: self.total_queries.load(Ordering::Relaxed),
            failed_queries: self.failed_queries.load(Ordering::Relaxed),
            retried_operations: self.retried_operations.load(Ordering::Relaxed),
        }
    }

    /// Check if the database connection is healthy.
    ///
    /// Performs a simple query to verify connectivity.
    pub async fn is_healthy(&self) -> bool {
        self.health_check().await.unwrap_or(false)
    }

    /// Get detailed health information.
    ///
    /// Returns a tuple of (is_healthy, latency_ms, error_message).
    pub async fn health_check_detailed(&self) -> (bool, Option<u64>, Option<String>) {
        let start = Instant::now();
        match self.health_check().await {
            Ok(true) => (true, Some(start.elapsed().as_millis() as u64), None),
            Ok(false) => (
                false,
                Some(start.elapsed().as_millis() as u64),
                Some("Health check returned false".to_string()),
            ),
            Err(e) => (
                false,
                Some(start.elapsed().as_millis() as u64),
                Some(e.to_string()),
            ),
        }
    }
}

fn map_diesel_error(err: diesel::result::Error) -> RepositoryError {
    RepositoryError::from(err)
}

fn not_found(entity: &str, id: impl std::fmt::Display, operation: &str) -> RepositoryError {
    RepositoryError::not_found_with_context(
        format!("{} {} not found", entity, id),
        ErrorContext::new(operation)
            .with_entity(entity.to_lowercase())
            .with_entity_id(id),
    )
}

/// Escape `%`, `_` and `\` so user text matches literally inside ILIKE.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Catalog rows passing every filter of `query`, unordered and unpaged.
fn filtered_destinations(query: &DestinationQuery) -> destinations::BoxedQuery<'static, Pg> {
    let mut q = destinations::table.into_boxed();

    if let Some(term) = query.search_term() {
        let pattern = like_pattern(term);
        q = q.filter(
            sql::<Bool>("(name ILIKE ")
                .bind::<Text, _>(pattern.clone())
                .sql(" OR COALESCE(state, '') ILIKE ")
                .bind::<Text, _>(pattern.clone())
                .sql(" OR CAST(dest_id AS TEXT) ILIKE ")
                .bind::<Text, _>(pattern)
                .sql(")"),
        );
    }

    if let Some(kind) = query.kind_filter() {
        q = q.filter(destinations::kind.eq(kind.to_string()));
    }

    if let Some(max) = query.max_price {
        q = q.filter(destinations::price_min.le(max));
    }

    if query.incomplete {
        q = q.filter(sql::<Bool>(
            "(COALESCE(TRIM(description), '') = '' \
             OR COALESCE(TRIM(images), '') = '' \
             OR COALESCE(TRIM(type), '') = '')",
        ));
    }

    q
}

fn ensure_valid_destination(changes: &DestinationChangeset) -> RepositoryResult<()> {
    if changes.name.trim().is_empty() {
        return Err(RepositoryError::validation("Destination name is required"));
    }
    Ok(())
}

fn group_exists(conn: &mut PgConnection, group_id: i64) -> RepositoryResult<bool> {
    diesel::select(exists(travel_groups::table.find(group_id)))
        .get_result(conn)
        .map_err(map_diesel_error)
}

fn destination_exists(conn: &mut PgConnection, dest_id: i64) -> RepositoryResult<bool> {
    diesel::select(exists(destinations::table.find(dest_id)))
        .get_result(conn)
        .map_err(map_diesel_error)
}

// ==================== UserRepository ====================

#[async_trait]
impl UserRepository for PostgresRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.with_conn(|conn| {
            sql_query("SELECT 1")
                .execute(conn)
                .map(|_| true)
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn create_user(&self, user: &NewUser) -> RepositoryResult<User> {
        let row = NewUserRow {
            email: user.email.trim().to_lowercase(),
            name: user.name.clone(),
            picture: user.picture.clone(),
            role: UserRole::default().as_str().to_string(),
        };

        self.with_conn(move |conn| {
            let created: UserRow = diesel::insert_into(users::table)
                .values(&row)
                .returning(UserRow::as_returning())
                .get_result(conn)
                .map_err(|e| map_diesel_error(e).with_operation("create_user"))?;
            User::try_from(created)
        })
        .await
    }

    async fn get_user(&self, user_id: UserId) -> RepositoryResult<User> {
        self.with_conn(move |conn| {
            let row: Option<UserRow> = users::table
                .find(user_id.value())
                .select(UserRow::as_select())
                .first(conn)
                .optional()
                .map_err(map_diesel_error)?;
            row.ok_or_else(|| not_found("User", user_id, "get_user"))?
                .try_into()
        })
        .await
    }

    async fn get_users(&self, user_ids: &[UserId]) -> RepositoryResult<Vec<User>> {
        let ids: Vec<i64> = user_ids.iter().map(|id| id.value()).collect();
        self.with_conn(move |conn| {
            users::table
                .filter(users::user_id.eq_any(&ids))
                .order(users::user_id.asc())
                .select(UserRow::as_select())
                .load::<UserRow>(conn)
                .map_err(map_diesel_error)?
                .into_iter()
                .map(User::try_from)
                .collect()
        })
        .await
    }

    async fn find_user_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let email = email.trim().to_lowercase();
        self.with_conn(move |conn| {
            users::table
                .filter(users::email.eq(&email))
                .select(UserRow::as_select())
                .first::<UserRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(User::try_from)
                .transpose()
        })
        .await
    }

    async fn update_profile(
        &self,
        user_id: UserId,
        update: &ProfileUpdate,
    ) -> RepositoryResult<User> {
        let changes = ProfileChangeset::from(update);
        self.with_conn(move |conn| {
            let row: Option<UserRow> = diesel::update(users::table.find(user_id.value()))
                .set(&changes)
                .returning(UserRow::as_returning())
                .get_result(conn)
                .optional()
                .map_err(map_diesel_error)?;
            row.ok_or_else(|| not_found("User", user_id, "update_profile"))?
                .try_into()
        })
        .await
    }

    async fn list_universities(&self) -> RepositoryResult<Vec<University>> {
        self.with_conn(|conn| {
            let rows: Vec<UniversityRow> = universities::table
                .order((universities::name.asc(), universities::university_id.asc()))
                .select(UniversityRow::as_select())
                .load(conn)
                .map_err(map_diesel_error)?;
            Ok(rows.into_iter().map(University::from).collect())
        })
        .await
    }

    async fn add_university(&self, name: &str) -> RepositoryResult<University> {
        let name = name.trim().to_string();
        self.with_conn(move |conn| {
            diesel::insert_into(universities::table)
                .values(universities::name.eq(&name))
                .returning(UniversityRow::as_returning())
                .get_result::<UniversityRow>(conn)
                .map(University::from)
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn get_university(
        &self,
        university_id: UniversityId,
    ) -> RepositoryResult<Option<University>> {
        self.with_conn(move |conn| {
            universities::table
                .find(university_id.value())
                .select(UniversityRow::as_select())
                .first::<UniversityRow>(conn)
                .optional()
                .map(|row| row.map(University::from))
                .map_err(map_diesel_error)
        })
        .await
    }
}

// ==================== CatalogRepository ====================

#[async_trait]
impl CatalogRepository for PostgresRepository {
    async fn list_destinations(
        &self,
        query: &DestinationQuery,
        viewer: Option<UserId>,
    ) -> RepositoryResult<DestinationPage> {
        let query = query.clone();
        self.with_conn(move |conn| {
            let total: i64 = filtered_destinations(&query)
                .count()
                .get_result(conn)
                .map_err(map_diesel_error)?;

            let rows: Vec<DestinationRow> = filtered_destinations(&query)
                .order(destinations::dest_id.desc())
                .limit(PAGE_SIZE as i64)
                .offset(i64::try_from(query.offset()).unwrap_or(i64::MAX))
                .select(DestinationRow::as_select())
                .load(conn)
                .map_err(map_diesel_error)?;

            let liked: HashSet<i64> = match viewer {
                Some(user_id) => {
                    let ids: Vec<i64> = rows.iter().map(|r| r.dest_id).collect();
                    favourites::table
                        .filter(favourites::user_id.eq(user_id.value()))
                        .filter(favourites::dest_id.eq_any(&ids))
                        .select(favourites::dest_id)
                        .load::<i64>(conn)
                        .map_err(map_diesel_error)?
                        .into_iter()
                        .collect()
                }
                None => HashSet::new(),
            };

            let data = rows
                .into_iter()
                .map(|row| DestinationListing {
                    is_liked: liked.contains(&row.dest_id),
                    destination: row.into(),
                })
                .collect();

            Ok(DestinationPage {
                data,
                total_pages: DestinationQuery::total_pages(total.max(0) as u64),
            })
        })
        .await
    }

    async fn random_destinations(&self, limit: usize) -> RepositoryResult<Vec<Destination>> {
        self.with_conn(move |conn| {
            let rows: Vec<DestinationRow> = destinations::table
                .order(sql::<Double>("RANDOM()"))
                .limit(limit as i64)
                .select(DestinationRow::as_select())
                .load(conn)
                .map_err(map_diesel_error)?;
            Ok(rows.into_iter().map(Destination::from).collect())
        })
        .await
    }

    async fn all_destinations(&self) -> RepositoryResult<Vec<Destination>> {
        self.with_conn(|conn| {
            let rows: Vec<DestinationRow> = destinations::table
                .order(destinations::dest_id.desc())
                .select(DestinationRow::as_select())
                .load(conn)
                .map_err(map_diesel_error)?;
            Ok(rows.into_iter().map(Destination::from).collect())
        })
        .await
    }

    async fn get_destination(&self, dest_id: DestinationId) -> RepositoryResult<Destination> {
        self.with_conn(move |conn| {
            destinations::table
                .find(dest_id.value())
                .select(DestinationRow::as_select())
                .first::<DestinationRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(Destination::from)
                .ok_or_else(|| not_found("Destination", dest_id, "get_destination"))
        })
        .await
    }

    async fn create_destination(
        &self,
        input: &DestinationInput,
    ) -> RepositoryResult<Destination> {
        let changes = DestinationChangeset::from(input);
        ensure_valid_destination(&changes)?;
        self.with_conn(move |conn| {
            diesel::insert_into(destinations::table)
                .values(&changes)
                .returning(DestinationRow::as_returning())
                .get_result::<DestinationRow>(conn)
                .map(Destination::from)
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn update_destination(
        &self,
        dest_id: DestinationId,
        input: &DestinationInput,
    ) -> RepositoryResult<Destination> {
        let changes = DestinationChangeset::from(input);
        ensure_valid_destination(&changes)?;
        self.with_conn(move |conn| {
            diesel::update(destinations::table.find(dest_id.value()))
                .set(&changes)
                .returning(DestinationRow::as_returning())
                .get_result::<DestinationRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(Destination::from)
                .ok_or_else(|| not_found("Destination", dest_id, "update_destination"))
        })
        .await
    }

    async fn delete_destination(&self, dest_id: DestinationId) -> RepositoryResult<()> {
        self.with_conn(move |conn| {
            let deleted = diesel::delete(destinations::table.find(dest_id.value()))
                .execute(conn)
                .map_err(map_diesel_error)?;
            if deleted == 0 {
                return Err(not_found("Destination", dest_id, "delete_destination"));
            }
            Ok(())
        })
        .await
    }

    async fn add_favourite(
        &self,
        user_id: UserId,
        dest_id: DestinationId,
    ) -> RepositoryResult<bool> {
        self.with_conn(move |conn| {
            if !destination_exists(conn, dest_id.value())? {
                return Err(not_found("Destination", dest_id, "add_favourite"));
            }
            let inserted = diesel::insert_into(favourites::table)
                .values(&NewFavouriteRow {
                    user_id: user_id.value(),
                    dest_id: dest_id.value(),
                })
                .on_conflict_do_nothing()
                .execute(conn)
                .map_err(map_diesel_error)?;
            Ok(inserted > 0)
        })
        .await
    }

    async fn remove_favourite(
        &self,
        user_id: UserId,
        dest_id: DestinationId,
    ) -> RepositoryResult<bool> {
        self.with_conn(move |conn| {
            let deleted = diesel::delete(favourites::table.find((user_id.value(), dest_id.value())))
                .execute(conn)
                .map_err(map_diesel_error)?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn list_favourites(&self, user_id: UserId) -> RepositoryResult<Vec<Destination>> {
        self.with_conn(move |conn| {
            let rows: Vec<DestinationRow> = favourites::table
                .inner_join(destinations::table)
                .filter(favourites::user_id.eq(user_id.value()))
                .order(favourites::created_at.desc())
                .select(DestinationRow::as_select())
                .load(conn)
                .map_err(map_diesel_error)?;
            Ok(rows.into_iter().map(Destination::from).collect())
        })
        .await
    }
}

// ==================== GroupRepository ====================

#[async_trait]
impl GroupRepository for PostgresRepository {
    async fn create_group(&self, name: &str, leader: UserId) -> RepositoryResult<Group> {
        let row = NewGroupRow {
            group_name: name.to_string(),
            created_by: leader.value(),
        };
        self.with_conn(move |conn| {
            conn.transaction::<_, RepositoryError, _>(|conn| {
                let group: GroupRow = diesel::insert_into(travel_groups::table)
                    .values(&row)
                    .returning(GroupRow::as_returning())
                    .get_result(conn)?;
                diesel::insert_into(group_members::table)
                    .values(&NewMemberRow {
                        group_id: group.group_id,
                        user_id: row.created_by,
                        role: GroupRole::Leader.as_str().to_string(),
                    })
                    .execute(conn)?;
                Ok(group.into())
            })
        })
        .await
    }

    async fn get_group(&self, group_id: GroupId) -> RepositoryResult<Group> {
        self.with_conn(move |conn| {
            travel_groups::table
                .find(group_id.value())
                .select(GroupRow::as_select())
                .first::<GroupRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(Group::from)
                .ok_or_else(|| not_found("Group", group_id, "get_group"))
        })
        .await
    }

    async fn rename_group(&self, group_id: GroupId, name: &str) -> RepositoryResult<()> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            let updated = diesel::update(travel_groups::table.find(group_id.value()))
                .set(travel_groups::group_name.eq(&name))
                .execute(conn)
                .map_err(map_diesel_error)?;
            if updated == 0 {
                return Err(not_found("Group", group_id, "rename_group"));
            }
            Ok(())
        })
        .await
    }

    async fn delete_group(&self, group_id: GroupId) -> RepositoryResult<()> {
        self.with_conn(move |conn| {
            let deleted = diesel::delete(travel_groups::table.find(group_id.value()))
                .execute(conn)
                .map_err(map_diesel_error)?;
            if deleted == 0 {
                return Err(not_found("Group", group_id, "delete_group"));
            }
            Ok(())
        })
        .await
    }

    async fn list_groups_for_user(&self, user_id: UserId) -> RepositoryResult<Vec<GroupSummary>> {
        self.with_conn(move |conn| {
            let rows: Vec<(i64, String, String)> = group_members::table
                .inner_join(travel_groups::table)
                .filter(group_members::user_id.eq(user_id.value()))
                .order(travel_groups::group_id.desc())
                .select((
                    travel_groups::group_id,
                    travel_groups::group_name,
                    group_members::role,
                ))
                .load(conn)
                .map_err(map_diesel_error)?;

            let ids: Vec<i64> = rows.iter().map(|(id, _, _)| *id).collect();
            let counts: HashMap<i64, i64> = group_members::table
                .filter(group_members::group_id.eq_any(&ids))
                .group_by(group_members::group_id)
                .select((group_members::group_id, count_star()))
                .load::<(i64, i64)>(conn)
                .map_err(map_diesel_error)?
                .into_iter()
                .collect();

            rows.into_iter()
                .map(|(group_id, group_name, role)| {
                    Ok(GroupSummary {
                        group_id: GroupId(group_id),
                        group_name,
                        role: parse_group_role(&role)?,
                        member_count: counts.get(&group_id).copied().unwrap_or(0),
                    })
                })
                .collect()
        })
        .await
    }

    async fn get_membership(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> RepositoryResult<Option<GroupRole>> {
        self.with_conn(move |conn| {
            group_members::table
                .find((group_id.value(), user_id.value()))
                .select(group_members::role)
                .first::<String>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(|role| parse_group_role(&role))
                .transpose()
        })
        .await
    }

    async fn list_members(&self, group_id: GroupId) -> RepositoryResult<Vec<Member>> {
        self.with_conn(move |conn| {
            let rows: Vec<(i64, String, String, Option<String>, String)> = group_members::table
                .inner_join(users::table)
                .filter(group_members::group_id.eq(group_id.value()))
                .select((
                    users::user_id,
                    users::name,
                    users::email,
                    users::picture,
                    group_members::role,
                ))
                .load(conn)
                .map_err(map_diesel_error)?;

            let mut members = rows
                .into_iter()
                .map(|(user_id, name, email, picture, role)| {
                    Ok(Member {
                        user_id: UserId(user_id),
                        name,
                        email,
                        picture,
                        role: parse_group_role(&role)?,
                    })
                })
                .collect::<RepositoryResult<Vec<Member>>>()?;
            members.sort_by(|a, b| {
                (a.role != GroupRole::Leader, &a.name).cmp(&(b.role != GroupRole::Leader, &b.name))
            });
            Ok(members)
        })
        .await
    }

    async fn add_member(
        &self,
        group_id: GroupId,
        user_id: UserId,
        role: GroupRole,
    ) -> RepositoryResult<bool> {
        self.with_conn(move |conn| {
            if !group_exists(conn, group_id.value())? {
                return Err(not_found("Group", group_id, "add_member"));
            }
            let inserted = diesel::insert_into(group_members::table)
                .values(&NewMemberRow {
                    group_id: group_id.value(),
                    user_id: user_id.value(),
                    role: role.as_str().to_string(),
                })
                .on_conflict_do_nothing()
                .execute(conn)
                .map_err(map_diesel_error)?;
            Ok(inserted > 0)
        })
        .await
    }

    async fn create_invite(
        &self,
        group_id: GroupId,
        email: &str,
        token: &str,
        invited_by: UserId,
    ) -> RepositoryResult<Invite> {
        let row = NewInviteRow {
            group_id: group_id.value(),
            email: email.to_string(),
            token: token.to_string(),
            status: InviteStatus::Pending.as_str().to_string(),
            invited_by: invited_by.value(),
        };
        self.with_conn(move |conn| {
            if !group_exists(conn, row.group_id)? {
                return Err(not_found("Group", group_id, "create_invite"));
            }
            diesel::insert_into(group_invites::table)
                .values(&row)
                .returning(InviteRow::as_returning())
                .get_result::<InviteRow>(conn)
                .map_err(map_diesel_error)?
                .try_into()
        })
        .await
    }

    async fn find_pending_invite(&self, token: &str) -> RepositoryResult<Option<Invite>> {
        let token = token.to_string();
        self.with_conn(move |conn| {
            group_invites::table
                .filter(group_invites::token.eq(&token))
                .filter(group_invites::status.eq(InviteStatus::Pending.as_str()))
                .select(InviteRow::as_select())
                .first::<InviteRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(Invite::try_from)
                .transpose()
        })
        .await
    }

    async fn list_pending_invites(&self, group_id: GroupId) -> RepositoryResult<Vec<Invite>> {
        self.with_conn(move |conn| {
            group_invites::table
                .filter(group_invites::group_id.eq(group_id.value()))
                .filter(group_invites::status.eq(InviteStatus::Pending.as_str()))
                .order(group_invites::invite_id.asc())
                .select(InviteRow::as_select())
                .load::<InviteRow>(conn)
                .map_err(map_diesel_error)?
                .into_iter()
                .map(Invite::try_from)
                .collect()
        })
        .await
    }

    async fn accept_invite(&self, invite_id: InviteId) -> RepositoryResult<()> {
        self.with_conn(move |conn| {
            let updated = diesel::update(group_invites::table.find(invite_id.value()))
                .set(group_invites::status.eq(InviteStatus::Accepted.as_str()))
                .execute(conn)
                .map_err(map_diesel_error)?;
            if updated == 0 {
                return Err(not_found("Invite", invite_id, "accept_invite"));
            }
            Ok(())
        })
        .await
    }

    async fn share_trip(
        &self,
        group_id: GroupId,
        dest_id: DestinationId,
        shared_by: UserId,
    ) -> RepositoryResult<SharedTrip> {
        let row = NewTripRow {
            group_id: group_id.value(),
            dest_id: dest_id.value(),
            shared_by: shared_by.value(),
        };
        self.with_conn(move |conn| {
            if !group_exists(conn, row.group_id)? {
                return Err(not_found("Group", group_id, "share_trip"));
            }
            if !destination_exists(conn, row.dest_id)? {
                return Err(not_found("Destination", dest_id, "share_trip"));
            }
            let already_shared: bool = diesel::select(exists(
                group_trips::table
                    .filter(group_trips::group_id.eq(row.group_id))
                    .filter(group_trips::dest_id.eq(row.dest_id)),
            ))
            .get_result(conn)
            .map_err(map_diesel_error)?;
            if already_shared {
                return Err(RepositoryError::conflict_with_context(
                    "Destination already shared in this group",
                    ErrorContext::new("share_trip")
                        .with_entity("group")
                        .with_entity_id(group_id),
                ));
            }

            diesel::insert_into(group_trips::table)
                .values(&row)
                .returning(TripRow::as_returning())
                .get_result::<TripRow>(conn)
                .map(SharedTrip::from)
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn find_trip(&self, trip_ref_id: TripRefId) -> RepositoryResult<Option<SharedTrip>> {
        self.with_conn(move |conn| {
            group_trips::table
                .find(trip_ref_id.value())
                .select(TripRow::as_select())
                .first::<TripRow>(conn)
                .optional()
                .map(|row| row.map(SharedTrip::from))
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn list_trips(
        &self,
        group_id: GroupId,
        viewer: UserId,
    ) -> RepositoryResult<Vec<TripSummary>> {
        self.with_conn(move |conn| {
            let rows: Vec<(TripRow, DestinationRow, String)> = group_trips::table
                .inner_join(destinations::table)
                .inner_join(users::table)
                .filter(group_trips::group_id.eq(group_id.value()))
                .select((TripRow::as_select(), DestinationRow::as_select(), users::name))
                .load(conn)
                .map_err(map_diesel_error)?;

            let ids: Vec<i64> = rows.iter().map(|(trip, _, _)| trip.trip_ref_id).collect();
            let counts: HashMap<i64, i64> = trip_votes::table
                .filter(trip_votes::trip_ref_id.eq_any(&ids))
                .group_by(trip_votes::trip_ref_id)
                .select((trip_votes::trip_ref_id, count_star()))
                .load::<(i64, i64)>(conn)
                .map_err(map_diesel_error)?
                .into_iter()
                .collect();
            let voted: HashSet<i64> = trip_votes::table
                .filter(trip_votes::trip_ref_id.eq_any(&ids))
                .filter(trip_votes::user_id.eq(viewer.value()))
                .select(trip_votes::trip_ref_id)
                .load::<i64>(conn)
                .map_err(map_diesel_error)?
                .into_iter()
                .collect();

            let mut trips: Vec<TripSummary> = rows
                .into_iter()
                .map(|(trip, dest, shared_by)| TripSummary {
                    trip_ref_id: TripRefId(trip.trip_ref_id),
                    shared_at: trip.shared_at,
                    dest_id: DestinationId(dest.dest_id),
                    name: dest.name,
                    state: dest.state,
                    kind: dest.kind,
                    images: dest.images,
                    price_min: dest.price_min,
                    shared_by,
                    vote_count: counts.get(&trip.trip_ref_id).copied().unwrap_or(0),
                    user_has_voted: voted.contains(&trip.trip_ref_id),
                })
                .collect();
            sort_trips(&mut trips);
            Ok(trips)
        })
        .await
    }

    async fn remove_trip(&self, trip_ref_id: TripRefId) -> RepositoryResult<()> {
        self.with_conn(move |conn| {
            let deleted = diesel::delete(group_trips::table.find(trip_ref_id.value()))
                .execute(conn)
                .map_err(map_diesel_error)?;
            if deleted == 0 {
                return Err(not_found("Trip", trip_ref_id, "remove_trip"));
            }
            Ok(())
        })
        .await
    }

    async fn toggle_vote(
        &self,
        trip_ref_id: TripRefId,
        user_id: UserId,
    ) -> RepositoryResult<VoteAction> {
        self.with_conn(move |conn| {
            conn.transaction::<_, RepositoryError, _>(|conn| {
                let trip_exists: bool =
                    diesel::select(exists(group_trips::table.find(trip_ref_id.value())))
                        .get_result(conn)?;
                if !trip_exists {
                    return Err(not_found("Trip", trip_ref_id, "toggle_vote"));
                }

                let removed = diesel::delete(
                    trip_votes::table.find((trip_ref_id.value(), user_id.value())),
                )
                .execute(conn)?;
                if removed > 0 {
                    return Ok(VoteAction::Removed);
                }

                diesel::insert_into(trip_votes::table)
                    .values((
                        trip_votes::trip_ref_id.eq(trip_ref_id.value()),
                        trip_votes::user_id.eq(user_id.value()),
                    ))
                    .execute(conn)?;
                Ok(VoteAction::Added)
            })
        })
        .await
    }
}

// ==================== CalendarRepository ====================

#[async_trait]
impl CalendarRepository for PostgresRepository {
    async fn add_availability(
        &self,
        block: &NewAvailability,
    ) -> RepositoryResult<AvailabilityEvent> {
        let row = NewAvailabilityRow {
            user_id: block.owner_id.value(),
            start_date: block.start_date,
            end_date: block.end_date,
            note: block.note.as_str().to_string(),
        };
        self.with_conn(move |conn| {
            diesel::insert_into(availability::table)
                .values(&row)
                .returning(AvailabilityRow::as_returning())
                .get_result::<AvailabilityRow>(conn)
                .map(AvailabilityEvent::from)
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn delete_availability(
        &self,
        owner: UserId,
        id: AvailabilityId,
    ) -> RepositoryResult<bool> {
        self.with_conn(move |conn| {
            let deleted = diesel::delete(
                availability::table
                    .filter(availability::id.eq(id.value()))
                    .filter(availability::user_id.eq(owner.value())),
            )
            .execute(conn)
            .map_err(map_diesel_error)?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn list_availability_for_user(
        &self,
        user_id: UserId,
    ) -> RepositoryResult<Vec<AvailabilityEvent>> {
        self.list_availability_for_users(&[user_id]).await
    }

    async fn list_availability_for_users(
        &self,
        user_ids: &[UserId],
    ) -> RepositoryResult<Vec<AvailabilityEvent>> {
        let ids: Vec<i64> = user_ids.iter().map(|id| id.value()).collect();
        self.with_conn(move |conn| {
            let rows: Vec<AvailabilityRow> = availability::table
                .filter(availability::user_id.eq_any(&ids))
                .order((availability::start_date.asc(), availability::id.asc()))
                .select(AvailabilityRow::as_select())
                .load(conn)
                .map_err(map_diesel_error)?;
            Ok(rows.into_iter().map(AvailabilityEvent::from).collect())
        })
        .await
    }

    async fn add_university_event(
        &self,
        event: &NewUniversityEvent,
    ) -> RepositoryResult<UniversityScheduleEvent> {
        let university_id = event.university_id;
        let row = NewUniversityEventRow {
            university_id: university_id.value(),
            start_date: event.start_date,
            end_date: event.end_date,
            category: event.category.clone(),
            label: event.label.clone(),
        };
        self.with_conn(move |conn| {
            let known: bool =
                diesel::select(exists(universities::table.find(row.university_id)))
                    .get_result(conn)
                    .map_err(map_diesel_error)?;
            if !known {
                return Err(not_found("University", university_id, "add_university_event"));
            }
            diesel::insert_into(university_events::table)
                .values(&row)
                .returning(UniversityEventRow::as_returning())
                .get_result::<UniversityEventRow>(conn)
                .map(UniversityScheduleEvent::from)
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn list_university_events(
        &self,
        university_id: UniversityId,
    ) -> RepositoryResult<Vec<UniversityScheduleEvent>> {
        self.with_conn(move |conn| {
            let rows: Vec<UniversityEventRow> = university_events::table
                .filter(university_events::university_id.eq(university_id.value()))
                .order((
                    university_events::start_date.asc(),
                    university_events::event_id.asc(),
                ))
                .select(UniversityEventRow::as_select())
                .load(conn)
                .map_err(map_diesel_error)?;
            Ok(rows.into_iter().map(UniversityScheduleEvent::from).collect())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("chiang"), "%chiang%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn test_config_with_url_keeps_defaults() {
        let config = PostgresConfig::with_url("postgres://localhost/aroov");
        assert_eq!(config.database_url, "postgres://localhost/aroov");
        assert_eq!(config.max_pool_size, 10);
        assert_eq!(config.max_retries, 3);
    }
}
