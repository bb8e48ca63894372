//! Readers for the files the cluster scheduler and the submit tooling leave
//! on the shared filesystem.
//!
//! None of these files has a schema. Everything here is line and filename
//! matching, written to survive partial, renamed or vanishing files.

pub mod cluster_script;
pub mod key_value;
pub mod readme;
pub mod submission_log;

use std::io;
use std::path::Path;

pub use readme::{CompleteReadme, ReadmeInfo};
pub use submission_log::{is_submission_log_filename, SubmissionLog};

/// Access to job READMEs as seen by the ingestor.
///
/// Both steps can race with the scheduler moving the job directory, so both
/// return raw `io::Result`s for the caller to classify.
pub trait ReadmeSource: Send + Sync {
    /// Filename of the README inside `job_dir`, if any.
    fn find(&self, job_dir: &Path) -> io::Result<Option<String>>;

    /// Parse the README at `path`.
    fn parse(&self, path: &Path) -> io::Result<Option<ReadmeInfo>>;
}

/// [`ReadmeSource`] reading straight from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalReadmeSource;

impl ReadmeSource for LocalReadmeSource {
    fn find(&self, job_dir: &Path) -> io::Result<Option<String>> {
        readme::find_readme(job_dir)
    }

    fn parse(&self, path: &Path) -> io::Result<Option<ReadmeInfo>> {
        readme::parse(path)
    }
}
