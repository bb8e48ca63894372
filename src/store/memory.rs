//! In-process [`JobStore`] used by tests and local dry runs.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::JobStore;
use crate::error::{AppError, AppResult};
use crate::models::{name_from_email, JobRecord, JobStatus, User};

#[derive(Default)]
struct State {
    jobs: BTreeMap<i64, JobRecord>,
    users: Vec<User>,
    writes: u64,
}

/// Job store kept entirely in memory.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("Memory store mutex poisoned")
    }

    /// Number of stored jobs.
    pub fn job_count(&self) -> usize {
        self.state().jobs.len()
    }

    /// Number of `create` and `update` calls that reached the store.
    pub fn write_count(&self) -> u64 {
        self.state().writes
    }

    pub fn users(&self) -> Vec<User> {
        self.state().users.clone()
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn exists(&self, job_id: i64) -> AppResult<bool> {
        Ok(self.state().jobs.contains_key(&job_id))
    }

    async fn get(&self, job_id: i64) -> AppResult<Option<JobRecord>> {
        Ok(self.state().jobs.get(&job_id).cloned())
    }

    async fn create(&self, job: &JobRecord) -> AppResult<()> {
        let mut state = self.state();
        if state.jobs.contains_key(&job.job_id) {
            return Err(AppError::InvalidInput(format!(
                "Job {} already exists",
                job.job_id
            )));
        }
        let mut record = job.clone();
        record.base_runs.clear();
        state.jobs.insert(job.job_id, record);
        state.writes += 1;
        Ok(())
    }

    async fn update(&self, job: &JobRecord) -> AppResult<()> {
        let mut state = self.state();
        let stored = state
            .jobs
            .get_mut(&job.job_id)
            .ok_or_else(|| AppError::NotFound(format!("Job {}", job.job_id)))?;

        stored.job_dir = job.job_dir.clone();
        stored.job_status = job.job_status;
        stored.main_name = job.main_name.clone();
        stored.solver = job.solver.clone();
        stored.readme_filename = job.readme_filename.clone();
        stored.info = job.info.clone();
        stored.project = job.project.clone();
        stored.user_id = job.user_id;
        stored.updated_at = job.updated_at;
        state.writes += 1;
        Ok(())
    }

    async fn filter_by_status(&self, statuses: &[JobStatus]) -> AppResult<Vec<JobRecord>> {
        Ok(self
            .state()
            .jobs
            .values()
            .filter(|job| statuses.contains(&job.job_status))
            .cloned()
            .collect())
    }

    async fn get_or_create_user(&self, username: &str, email: &str) -> AppResult<User> {
        let mut state = self.state();
        if let Some(user) = state.users.iter().find(|u| u.username == username) {
            return Ok(user.clone());
        }

        let (first_name, last_name) = name_from_email(email);
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            first_name,
            last_name,
            created_at: Utc::now(),
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn add_base_run(&self, job_id: i64, base_run_id: i64) -> AppResult<bool> {
        let mut state = self.state();
        if !state.jobs.contains_key(&base_run_id) {
            return Ok(false);
        }
        let Some(job) = state.jobs.get_mut(&job_id) else {
            return Ok(false);
        };
        if !job.base_runs.contains(&base_run_id) {
            job.base_runs.push(base_run_id);
        }
        Ok(true)
    }
}
