//! SeaORM database migrations.

pub use sea_orm_migration::prelude::*;

mod m20260301_000001_create_users;
mod m20260301_000002_create_jobs;
mod m20260301_000003_create_job_base_runs;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_create_users::Migration),
            Box::new(m20260301_000002_create_jobs::Migration),
            Box::new(m20260301_000003_create_job_base_runs::Migration),
        ]
    }
}
