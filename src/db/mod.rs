//! Database module providing connection management, migrations, and queries.

pub mod jobs;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::migration::Migrator;
use crate::models::{JobRecord, JobStatus, User};
use crate::store::JobStore;

/// Database connection pool wrapper around SeaORM.
#[derive(Clone)]
pub struct DbPool {
    conn: DatabaseConnection,
}

impl DbPool {
    /// Connect to the database named in the configuration.
    pub async fn new(config: &Config) -> AppResult<Self> {
        let mut options = ConnectOptions::new(config.database_url.clone());
        options
            .max_connections(config.db_max_connections)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(10))
            .sqlx_logging(false);

        let conn = Database::connect(options)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to database: {}", e)))?;

        Ok(DbPool { conn })
    }

    /// Apply all pending migrations.
    pub async fn run_migrations(&self) -> AppResult<()> {
        Migrator::up(&self.conn, None)
            .await
            .map_err(|e| AppError::Database(format!("Migrations failed: {}", e)))?;
        info!("Database migrations complete");
        Ok(())
    }

    /// Get access to the connection for executing queries.
    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }
}

#[async_trait]
impl JobStore for DbPool {
    async fn exists(&self, job_id: i64) -> AppResult<bool> {
        self.job_exists(job_id).await
    }

    async fn get(&self, job_id: i64) -> AppResult<Option<JobRecord>> {
        self.get_job(job_id).await
    }

    async fn create(&self, job: &JobRecord) -> AppResult<()> {
        self.insert_job(job).await
    }

    async fn update(&self, job: &JobRecord) -> AppResult<()> {
        self.update_job(job).await
    }

    async fn filter_by_status(&self, statuses: &[JobStatus]) -> AppResult<Vec<JobRecord>> {
        self.get_jobs_by_status(statuses).await
    }

    async fn get_or_create_user(&self, username: &str, email: &str) -> AppResult<User> {
        self.get_or_create_user_by_username(username, email).await
    }

    async fn add_base_run(&self, job_id: i64, base_run_id: i64) -> AppResult<bool> {
        self.insert_base_run(job_id, base_run_id).await
    }
}
