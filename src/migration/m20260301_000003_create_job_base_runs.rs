//! Migration: Create job_base_runs table.
//!
//! Directed many-to-many links from a job to the runs it was derived from.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TABLE job_base_runs (
                    job_id BIGINT NOT NULL REFERENCES jobs(job_id) ON DELETE CASCADE,
                    base_run_id BIGINT NOT NULL REFERENCES jobs(job_id) ON DELETE CASCADE,
                    PRIMARY KEY (job_id, base_run_id)
                );

                -- Reverse lookup: which jobs were derived from this one
                CREATE INDEX idx_job_base_runs_base_run_id ON job_base_runs(base_run_id);
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS job_base_runs CASCADE;")
            .await?;

        Ok(())
    }
}
