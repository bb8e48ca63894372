//! Status updates for jobs that are still pending or running.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::runner::LoopPass;
use super::status::StatusResolver;
use crate::error::AppResult;
use crate::models::{JobRecord, JobStatus};
use crate::store::JobStore;

/// Counters of one refresh pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub checked: usize,
    pub changed: usize,
}

pub struct StatusRefresher {
    store: Arc<dyn JobStore>,
    resolver: StatusResolver,
}

impl StatusRefresher {
    pub fn new(store: Arc<dyn JobStore>, resolver: StatusResolver) -> Self {
        Self { store, resolver }
    }

    /// Re-resolve every open job. Stops early, between two jobs, once
    /// `token` is cancelled.
    pub async fn refresh_all(&self, token: &CancellationToken) -> AppResult<RefreshSummary> {
        let jobs = self.store.filter_by_status(&JobStatus::OPEN).await?;
        debug!("Refreshing {} open jobs", jobs.len());

        let mut summary = RefreshSummary::default();
        for mut job in jobs {
            if token.is_cancelled() {
                info!("Refresh cancelled after {} jobs", summary.checked);
                break;
            }
            summary.checked += 1;
            if self.update_one(&mut job).await? {
                summary.changed += 1;
            }
        }

        Ok(summary)
    }

    /// Re-resolve one job and persist it if its status changed.
    ///
    /// Always allows the retry burst since nobody knows how close the job is
    /// to a transition. Returns whether a write happened.
    pub async fn update_one(&self, job: &mut JobRecord) -> AppResult<bool> {
        let resolution = self
            .resolver
            .resolve(job.job_id, Path::new(&job.sub_dir), true)
            .await;

        let previous = job.job_status;
        if !job.apply_status(resolution.status, resolution.job_dir_string()) {
            debug!("Job {} still {}", job.job_id, previous);
            return Ok(false);
        }

        self.store.update(job).await?;
        info!(
            "Job {} changed from {} to {}",
            job.job_id, previous, job.job_status
        );
        Ok(true)
    }

    /// [`StatusRefresher::update_one`] by job id. An unknown id is logged and
    /// ignored.
    pub async fn update_by_id(&self, job_id: i64) -> AppResult<bool> {
        match self.store.get(job_id).await? {
            Some(mut job) => self.update_one(&mut job).await,
            None => {
                error!("Can't update job {}: not in store", job_id);
                Ok(false)
            }
        }
    }
}

#[async_trait]
impl LoopPass for StatusRefresher {
    fn name(&self) -> &'static str {
        "update"
    }

    async fn run_pass(&mut self, token: &CancellationToken) -> AppResult<()> {
        let summary = self.refresh_all(token).await?;
        if summary.changed > 0 {
            info!(
                "Updated {} of {} open jobs",
                summary.changed, summary.checked
            );
        }
        Ok(())
    }
}
