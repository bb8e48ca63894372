//! Job domain models.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use uuid::Uuid;

/// Lifecycle status of a job.
///
/// `None` is the "undeterminable right now" sentinel, not an error. The
/// termination states are never produced by the filesystem resolver; they
/// are assigned by whoever inspects finished jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    None,
    Pending,
    Running,
    Finished,
    NormalTermination,
    ErrorTermination,
    OtherTermination,
}

impl JobStatus {
    /// Statuses the refresh loop keeps re-deriving.
    pub const OPEN: [JobStatus; 2] = [JobStatus::Pending, JobStatus::Running];

    /// Three-letter code stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "non",
            Self::Pending => "pen",
            Self::Running => "run",
            Self::Finished => "fin",
            Self::NormalTermination => "nor",
            Self::ErrorTermination => "err",
            Self::OtherTermination => "oth",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "non" => Some(Self::None),
            "pen" => Some(Self::Pending),
            "run" => Some(Self::Running),
            "fin" => Some(Self::Finished),
            "nor" => Some(Self::NormalTermination),
            "err" => Some(Self::ErrorTermination),
            "oth" => Some(Self::OtherTermination),
            _ => None,
        }
    }

    /// Human readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::None => "none / undefined",
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Finished => "finished",
            Self::NormalTermination => "normal termination",
            Self::ErrorTermination => "error termination",
            Self::OtherTermination => "other termination",
        }
    }

    pub fn is_open(&self) -> bool {
        Self::OPEN.contains(self)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Persistent record of one cluster job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
    /// Scheduler job number. Never reassigned.
    pub job_id: i64,
    /// Directory the job was submitted from.
    pub sub_dir: String,
    /// Current location of the job data. `None` iff the status is `None`.
    pub job_dir: Option<String>,
    pub job_status: JobStatus,
    pub main_name: String,
    pub solver: String,
    pub readme_filename: String,
    pub sub_date: DateTime<Utc>,
    /// Free text from the README information block.
    pub info: String,
    /// Submission log the record was ingested from.
    pub logfile_path: String,
    /// Project identifier derived from `sub_dir`, empty when unknown.
    pub project: String,
    pub user_id: Option<Uuid>,
    /// Job ids this job was derived from.
    pub base_runs: Vec<i64>,
    pub created_at: DateTime<Utc>,
    /// Bumped on every persisted change.
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// Apply a freshly resolved status. Returns `true` if the status changed.
    pub fn apply_status(&mut self, status: JobStatus, job_dir: Option<String>) -> bool {
        if self.job_status == status {
            return false;
        }
        self.job_status = status;
        self.job_dir = job_dir;
        self.updated_at = Utc::now();
        true
    }
}

static PROJECT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9rq][0-9]{6}(v[0-9]{2})?$").expect("valid project regex"));

/// Derive the project identifier from a submission directory.
///
/// A project is a path component like `3001234` or `r001234v02` directly
/// below a directory whose name contains `_pcae_` or `_prj`. The last match
/// wins; no match yields an empty string.
pub fn project_from_path(path: &str) -> String {
    let components: Vec<&str> = path.split('/').collect();
    let mut project = String::new();

    for (i, component) in components.iter().enumerate().skip(1) {
        let parent = components[i - 1];
        if PROJECT_PATTERN.is_match(component) && (parent.contains("_pcae_") || parent.contains("_prj"))
        {
            project = component.to_string();
        }
    }

    project
}
