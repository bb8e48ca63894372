//! Database queries for jobs and their base runs.

use std::collections::HashMap;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use tracing::{debug, warn};

use crate::entity::job::{self, ActiveModel, Entity as Job};
use crate::entity::job_base_run::{self, Entity as JobBaseRun};
use crate::error::{AppError, AppResult};
use crate::models::{JobRecord, JobStatus};

use super::DbPool;

impl DbPool {
    /// Check whether a job id is already stored.
    pub async fn job_exists(&self, job_id: i64) -> AppResult<bool> {
        let count = Job::find_by_id(job_id)
            .count(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to check job {}: {}", job_id, e)))?;

        Ok(count > 0)
    }

    /// Get a job by id, including its base runs.
    pub async fn get_job(&self, job_id: i64) -> AppResult<Option<JobRecord>> {
        let Some(model) = Job::find_by_id(job_id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get job: {}", e)))?
        else {
            return Ok(None);
        };

        let mut base_runs = self.get_base_runs(&[job_id]).await?;
        let runs = base_runs.remove(&job_id).unwrap_or_default();
        model_to_record(model, runs).map(Some)
    }

    /// Insert a new job. Base runs are linked separately.
    pub async fn insert_job(&self, record: &JobRecord) -> AppResult<()> {
        let model = ActiveModel {
            job_id: Set(record.job_id),
            sub_dir: Set(record.sub_dir.clone()),
            job_dir: Set(record.job_dir.clone()),
            job_status: Set(record.job_status.as_str().to_string()),
            main_name: Set(record.main_name.clone()),
            solver: Set(record.solver.clone()),
            readme_filename: Set(record.readme_filename.clone()),
            sub_date: Set(record.sub_date),
            info: Set(record.info.clone()),
            logfile_path: Set(record.logfile_path.clone()),
            project: Set(record.project.clone()),
            user_id: Set(record.user_id),
            created_at: Set(record.created_at),
            updated_at: Set(record.updated_at),
        };

        Job::insert(model)
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert job: {}", e)))?;

        Ok(())
    }

    /// Persist the mutable fields of a job.
    pub async fn update_job(&self, record: &JobRecord) -> AppResult<()> {
        let existing = Job::find_by_id(record.job_id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get job: {}", e)))?
            .ok_or_else(|| AppError::NotFound(format!("Job {}", record.job_id)))?;

        let mut active: ActiveModel = existing.into();
        active.job_dir = Set(record.job_dir.clone());
        active.job_status = Set(record.job_status.as_str().to_string());
        active.main_name = Set(record.main_name.clone());
        active.solver = Set(record.solver.clone());
        active.readme_filename = Set(record.readme_filename.clone());
        active.info = Set(record.info.clone());
        active.project = Set(record.project.clone());
        active.user_id = Set(record.user_id);
        active.updated_at = Set(record.updated_at);

        active
            .update(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to update job: {}", e)))?;

        Ok(())
    }

    /// All jobs whose status is one of `statuses`, oldest id first.
    pub async fn get_jobs_by_status(&self, statuses: &[JobStatus]) -> AppResult<Vec<JobRecord>> {
        let codes: Vec<&str> = statuses.iter().map(JobStatus::as_str).collect();

        let models = Job::find()
            .filter(job::Column::JobStatus.is_in(codes))
            .order_by_asc(job::Column::JobId)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to query jobs: {}", e)))?;

        let ids: Vec<i64> = models.iter().map(|m| m.job_id).collect();
        let mut base_runs = self.get_base_runs(&ids).await?;

        models
            .into_iter()
            .map(|m| {
                let runs = base_runs.remove(&m.job_id).unwrap_or_default();
                model_to_record(m, runs)
            })
            .collect()
    }

    /// Link `base_run_id` as a base run of `job_id`.
    ///
    /// Returns `false` if either job is unknown. Linking twice is a no-op.
    pub async fn insert_base_run(&self, job_id: i64, base_run_id: i64) -> AppResult<bool> {
        if !self.job_exists(job_id).await? || !self.job_exists(base_run_id).await? {
            debug!("No job {} or {} in DB, can't add base run", job_id, base_run_id);
            return Ok(false);
        }

        let already_linked = JobBaseRun::find_by_id((job_id, base_run_id))
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get base run: {}", e)))?
            .is_some();
        if already_linked {
            return Ok(true);
        }

        let link = job_base_run::ActiveModel {
            job_id: Set(job_id),
            base_run_id: Set(base_run_id),
        };
        JobBaseRun::insert(link)
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert base run: {}", e)))?;

        Ok(true)
    }

    /// Base run ids for each of `job_ids`.
    async fn get_base_runs(&self, job_ids: &[i64]) -> AppResult<HashMap<i64, Vec<i64>>> {
        let mut grouped: HashMap<i64, Vec<i64>> = HashMap::new();
        if job_ids.is_empty() {
            return Ok(grouped);
        }

        let links = JobBaseRun::find()
            .filter(job_base_run::Column::JobId.is_in(job_ids.to_vec()))
            .order_by_asc(job_base_run::Column::BaseRunId)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get base runs: {}", e)))?;

        for link in links {
            grouped.entry(link.job_id).or_default().push(link.base_run_id);
        }
        Ok(grouped)
    }
}

fn model_to_record(m: job::Model, base_runs: Vec<i64>) -> AppResult<JobRecord> {
    let job_status = JobStatus::parse(&m.job_status).ok_or_else(|| {
        warn!("Job {} has unknown status code '{}'", m.job_id, m.job_status);
        AppError::Database(format!("Unknown job status '{}'", m.job_status))
    })?;

    Ok(JobRecord {
        job_id: m.job_id,
        sub_dir: m.sub_dir,
        job_dir: m.job_dir,
        job_status,
        main_name: m.main_name,
        solver: m.solver,
        readme_filename: m.readme_filename,
        sub_date: m.sub_date,
        info: m.info,
        logfile_path: m.logfile_path,
        project: m.project,
        user_id: m.user_id,
        base_runs,
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}
