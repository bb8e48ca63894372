//! Persistence boundary for job records.
//!
//! The ingest and refresh loops only talk to a [`JobStore`]. The store is the
//! single writer for records and its `exists` check is the only guard against
//! ingesting a job twice.

pub mod memory;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{JobRecord, JobStatus, User};

pub use memory::MemoryStore;

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn exists(&self, job_id: i64) -> AppResult<bool>;

    async fn get(&self, job_id: i64) -> AppResult<Option<JobRecord>>;

    /// Persist a new record. Base runs are attached separately with
    /// [`JobStore::add_base_run`].
    async fn create(&self, job: &JobRecord) -> AppResult<()>;

    /// Persist the mutable fields of an existing record.
    async fn update(&self, job: &JobRecord) -> AppResult<()>;

    async fn filter_by_status(&self, statuses: &[JobStatus]) -> AppResult<Vec<JobRecord>>;

    /// Look up a user by username, creating it with `email` if unknown. An
    /// existing username with a different email is reused as is.
    async fn get_or_create_user(&self, username: &str, email: &str) -> AppResult<User>;

    /// Reference `base_run_id` from `job_id`. Returns `false` without error
    /// when either job is not in the store.
    async fn add_base_run(&self, job_id: i64, base_run_id: i64) -> AppResult<bool>;
}
