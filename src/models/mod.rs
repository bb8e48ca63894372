//! Domain models for the job diary.

pub mod job;
pub mod user;

// Re-export commonly used types
pub use job::{project_from_path, JobRecord, JobStatus};
pub use user::{name_from_email, User};
