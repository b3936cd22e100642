//! Persistence for users and tasks.
//!
//! Handlers only see the [`Database`] trait object held in `AppState`. Two
//! backends implement it: [`postgres::PgDatabase`] for real deployments and
//! [`memory::MemoryDatabase`] for tests and database-less local runs.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::future::Future;
use std::time::Duration;
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;
use crate::models::{
    NewUser, Task, TaskChanges, TaskQuery, TaskStatus, User, UserCredentials,
};

pub use memory::MemoryDatabase;
pub use postgres::PgDatabase;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    /// Looks a user up by username (as given) or email (lowercased).
    async fn find_credentials(&self, identifier: &str)
        -> Result<Option<UserCredentials>, AppError>;

    async fn user_exists(&self, username: &str, email: &str) -> Result<bool, AppError>;

    /// Fails with the duplicate account error when either field is taken.
    async fn insert_user(&self, new_user: NewUser) -> Result<User, AppError>;
}

/// Every method except `insert_task` and `task_counts` is scoped to `owner`.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Newest-created first.
    async fn list_tasks(&self, owner: Uuid, query: &TaskQuery) -> Result<Vec<Task>, AppError>;

    async fn find_task(&self, owner: Uuid, id: Uuid) -> Result<Option<Task>, AppError>;

    async fn insert_task(&self, task: Task) -> Result<Task, AppError>;

    async fn update_task(
        &self,
        owner: Uuid,
        id: Uuid,
        changes: &TaskChanges,
    ) -> Result<Option<Task>, AppError>;

    /// Returns whether a row was removed.
    async fn delete_task(&self, owner: Uuid, id: Uuid) -> Result<bool, AppError>;

    /// Number of tasks per status across all owners.
    async fn task_counts(&self) -> Result<Vec<(TaskStatus, i64)>, AppError>;
}

#[async_trait]
pub trait Database: UserStore + TaskStore {
    async fn ping(&self) -> bool;

    /// Connections currently held by the backend's pool, idle ones included.
    fn pool_connections(&self) -> u32;
}

/// Runs `connect` up to `attempts` times, cycling through `candidates` and
/// sleeping `delay` between failures. Returns the last error.
/// `candidates` must not be empty.
pub async fn retry_alternating<T, E, F, Fut>(
    candidates: &[String],
    attempts: u32,
    delay: Duration,
    mut connect: F,
) -> Result<T, E>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let attempts = attempts.max(1);
    let mut attempt = 0;
    loop {
        let candidate = candidates[attempt as usize % candidates.len()].clone();
        attempt += 1;
        match connect(candidate).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                log::warn!(
                    "Database connection attempt {}/{} failed: {}. Retrying in {:?}",
                    attempt,
                    attempts,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                log::error!("Database connection failed after {} attempts: {}", attempts, e);
                return Err(e);
            }
        }
    }
}

/// Connects to Postgres with the configured bounded retry.
pub async fn connect_with_retry(config: &Config) -> Result<PgPool, sqlx::Error> {
    let max_connections = config.db_max_connections;
    retry_alternating(
        &config.database_candidates(),
        config.db_connect_attempts,
        config.db_retry_delay,
        |url| async move {
            PgPoolOptions::new()
                .max_connections(max_connections)
                .acquire_timeout(Duration::from_secs(5))
                .connect(&url)
                .await
        },
    )
    .await
}

/// Applies the embedded migrations in `migrations/`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    log::info!("Database migrations applied");
    Ok(())
}
