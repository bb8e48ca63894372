//! Job status resolution from the submission directory.
//!
//! A submitted job passes through pending, running and finished. Each state
//! leaves its own evidence in `sub_dir`:
//!
//! - pending: a `<job_id>.pending` directory
//! - running: a cluster script naming the scratch directory
//! - finished: a `<job_id>` directory, possibly renamed by the user later
//!
//! During a transition the directory may show no state or two states at
//! once for a few seconds. The checks therefore run in a fixed priority
//! order, and recently submitted jobs get a short retry burst.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::caefiles::cluster_script;
use crate::models::JobStatus;

/// Attempts for a job submitted within the last day.
pub const RECENT_ATTEMPTS: u32 = 3;
/// Pause between two attempts.
pub const RETRY_PAUSE: Duration = Duration::from_secs(1);

/// Outcome of one resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub status: JobStatus,
    /// `None` exactly when `status` is [`JobStatus::None`].
    pub job_dir: Option<PathBuf>,
    /// Number of directory probes it took.
    pub attempts: u32,
}

impl Resolution {
    fn undetermined(attempts: u32) -> Self {
        Resolution {
            status: JobStatus::None,
            job_dir: None,
            attempts,
        }
    }

    pub fn is_determined(&self) -> bool {
        self.status != JobStatus::None && self.job_dir.is_some()
    }

    /// `job_dir` as stored in a job record.
    pub fn job_dir_string(&self) -> Option<String> {
        self.job_dir
            .as_ref()
            .map(|dir| dir.to_string_lossy().into_owned())
    }
}

/// Derives `(status, job_dir)` for a job from its submission directory.
#[derive(Debug, Clone)]
pub struct StatusResolver {
    recent_attempts: u32,
    retry_pause: Duration,
}

impl Default for StatusResolver {
    fn default() -> Self {
        Self::new(RECENT_ATTEMPTS, RETRY_PAUSE)
    }
}

impl StatusResolver {
    pub fn new(recent_attempts: u32, retry_pause: Duration) -> Self {
        StatusResolver {
            recent_attempts: recent_attempts.max(1),
            retry_pause,
        }
    }

    /// Resolve the current status of `job_id`.
    ///
    /// Recent jobs are probed up to [`RECENT_ATTEMPTS`] times with a pause in
    /// between; everything else is probed once. Failing to determine anything
    /// yields [`JobStatus::None`], which is an expected outcome.
    pub async fn resolve(&self, job_id: i64, sub_dir: &Path, recent: bool) -> Resolution {
        info!(
            "Getting job_status and job_dir for job {} from sub_dir: {}",
            job_id,
            sub_dir.display()
        );

        let limit = if recent { self.recent_attempts } else { 1 };

        for attempt in 1..=limit {
            if attempt > 1 {
                tokio::time::sleep(self.retry_pause).await;
                debug!("Re-checking sub_dir, attempt {}/{}", attempt, limit);
            }

            let dir = sub_dir.to_path_buf();
            let found = match tokio::task::spawn_blocking(move || probe(job_id, &dir)).await {
                Ok(found) => found,
                Err(e) => {
                    error!("Status probe for job {} failed: {}", job_id, e);
                    None
                }
            };

            if let Some((status, job_dir)) = found {
                if attempt > 1 {
                    debug!("Re-checking sub_dir paid off after {} attempts", attempt);
                }
                info!(
                    "Job {} resolved to {} at {}",
                    job_id,
                    status,
                    job_dir.display()
                );
                return Resolution {
                    status,
                    job_dir: Some(job_dir),
                    attempts: attempt,
                };
            }
        }

        info!("No job_status or job_dir could be determined for job {}", job_id);
        Resolution::undetermined(limit)
    }
}

/// One look at `sub_dir`. Returns the strongest piece of evidence found.
///
/// Blocking; runs on the blocking thread pool.
fn probe(job_id: i64, sub_dir: &Path) -> Option<(JobStatus, PathBuf)> {
    let names = match list_names(sub_dir) {
        Ok(names) => names,
        Err(e) => {
            match e.kind() {
                io::ErrorKind::NotFound => info!("sub_dir not found: {}", e),
                io::ErrorKind::PermissionDenied => info!("No access to sub_dir: {}", e),
                io::ErrorKind::NotADirectory => warn!("sub_dir is not a directory: {}", e),
                _ => warn!("Unexpected error listing sub_dir {}: {}", sub_dir.display(), e),
            }
            return None;
        }
    };
    debug!("Content of sub_dir: {:?}", names);

    let (status, job_dir) = evidence(job_id, sub_dir, &names)?;

    if !job_dir.is_dir() {
        error!(
            "Found job_dir is not a directory: {} ({})",
            job_dir.display(),
            status
        );
        return None;
    }
    Some((status, job_dir))
}

/// Priority order: finished folder, cluster script, pending folder, renamed
/// finished folder. Stale artifacts of an earlier state lose against the
/// evidence of a later one.
fn evidence(job_id: i64, sub_dir: &Path, names: &[String]) -> Option<(JobStatus, PathBuf)> {
    let finished_name = job_id.to_string();
    let pending_name = format!("{}.pending", job_id);

    if names.contains(&finished_name) {
        let path = sub_dir.join(&finished_name);
        if path.is_dir() {
            debug!("Finished job folder in sub_dir");
            return Some((JobStatus::Finished, path));
        }
        error!("Finished job folder name is not a directory: {}", path.display());
    }

    if let Some(script) = cluster_script::find(job_id, names)
        && let Some(scratch) = cluster_script::scratch_dir_of(&sub_dir.join(script))
    {
        return Some((JobStatus::Running, scratch));
    }

    if names.contains(&pending_name) {
        let path = sub_dir.join(&pending_name);
        if path.is_dir() {
            debug!("Pending job folder in sub_dir: {}", path.display());
            return Some((JobStatus::Pending, path));
        }
        error!("Pending job folder name is not a directory: {}", path.display());
    }

    let renamed = names
        .iter()
        .filter(|name| is_renamed_job_folder(job_id, name))
        .map(|name| sub_dir.join(name))
        .find(|path| path.is_dir());
    if let Some(path) = renamed {
        debug!("Renamed job folder, assuming finished job: {}", path.display());
        return Some((JobStatus::Finished, path));
    }

    None
}

/// `^<job_id>(?!\.pending).*$`
fn is_renamed_job_folder(job_id: i64, name: &str) -> bool {
    match name.strip_prefix(&job_id.to_string()) {
        Some(rest) => !rest.starts_with(".pending"),
        None => false,
    }
}

/// Sorted entry names so that "first match" is stable between calls.
fn list_names(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        names.push(entry?.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}
