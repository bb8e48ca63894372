//! Migration: Create jobs table.
//!
//! One row per cluster job, keyed by the scheduler job number.

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
                CREATE TABLE jobs (
                    job_id BIGINT PRIMARY KEY CHECK (job_id > 0),
                    sub_dir TEXT NOT NULL,
                    job_dir TEXT,

                    job_status VARCHAR(3) NOT NULL
                        CHECK (job_status IN ('non', 'pen', 'run', 'fin', 'nor', 'err', 'oth')),

                    -- README values are free text written by users, so no length limits
                    main_name TEXT NOT NULL,
                    solver TEXT NOT NULL DEFAULT '',
                    readme_filename TEXT NOT NULL DEFAULT '',
                    sub_date TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    info TEXT NOT NULL DEFAULT '',
                    logfile_path TEXT NOT NULL DEFAULT '',
                    project TEXT NOT NULL DEFAULT '',
                    user_id UUID REFERENCES users(id) ON DELETE SET NULL,

                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

                    -- job_dir is unknown exactly when the status is unknown
                    CHECK ((job_status = 'non') = (job_dir IS NULL))
                );

                -- Index for the refresh loop (open jobs only)
                CREATE INDEX idx_jobs_open_status ON jobs(job_status)
                    WHERE job_status IN ('pen', 'run');

                CREATE INDEX idx_jobs_user_id ON jobs(user_id);

                -- Trigger to update updated_at
                CREATE TRIGGER update_jobs_updated_at
                    BEFORE UPDATE ON jobs
                    FOR EACH ROW
                    EXECUTE FUNCTION update_updated_at_column();
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                DROP TRIGGER IF EXISTS update_jobs_updated_at ON jobs;
                DROP TABLE IF EXISTS jobs CASCADE;
                "#,
            )
            .await?;

        Ok(())
    }
}
