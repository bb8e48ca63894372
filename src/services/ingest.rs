//! Creation of job records from new submission logs.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDateTime, TimeDelta, TimeZone, Utc};
use tracing::{debug, error, info, warn};

use super::status::{Resolution, StatusResolver};
use crate::caefiles::{submission_log, CompleteReadme, LocalReadmeSource, ReadmeSource};
use crate::config::defaults;
use crate::error::AppResult;
use crate::models::{project_from_path, JobRecord};
use crate::store::JobStore;

/// How long after submission a job still counts as recent.
const RECENT_WINDOW: TimeDelta = TimeDelta::hours(24);

/// What happened to one submission log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// A new job record was stored.
    Created,
    /// The job id is already in the store.
    AlreadyKnown,
    /// The log could not be turned into a record; the reason was logged.
    Aborted,
    /// The job directory kept moving while it was being read.
    GaveUp,
}

impl IngestOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, IngestOutcome::Created)
    }
}

/// Whether a submission at `submission_time` counts as recent at `now`.
///
/// Both are local wall-clock times. Timestamps in the future count as recent.
pub fn is_recent(submission_time: Option<NaiveDateTime>, now: NaiveDateTime) -> bool {
    match submission_time {
        Some(t) => now - t <= RECENT_WINDOW,
        None => false,
    }
}

/// Result of one README lookup and parse against a job directory.
enum ReadmeRead {
    Complete {
        filename: String,
        readme: CompleteReadme,
    },
    /// The job directory or the README vanished; the job moved on.
    Moved,
    Abort,
}

/// Turns submission logs into job records.
pub struct NewJobIngestor {
    store: Arc<dyn JobStore>,
    resolver: StatusResolver,
    readmes: Arc<dyn ReadmeSource>,
    max_race_retries: u32,
}

impl NewJobIngestor {
    pub fn new(store: Arc<dyn JobStore>, resolver: StatusResolver) -> Self {
        Self {
            store,
            resolver,
            readmes: Arc::new(LocalReadmeSource),
            max_race_retries: defaults::INGEST_RACE_RETRIES,
        }
    }

    pub fn with_readme_source(mut self, readmes: Arc<dyn ReadmeSource>) -> Self {
        self.readmes = readmes;
        self
    }

    /// Cap on re-resolutions when the job directory moves during reading.
    pub fn with_max_race_retries(mut self, max_race_retries: u32) -> Self {
        self.max_race_retries = max_race_retries;
        self
    }

    /// Ingest one submission log.
    ///
    /// Problems with the files on disk end in [`IngestOutcome::Aborted`] or
    /// [`IngestOutcome::GaveUp`]. Only store errors are returned as `Err`.
    pub async fn ingest(&self, logfile: &Path) -> AppResult<IngestOutcome> {
        let path = logfile.to_path_buf();
        let parsed = tokio::task::spawn_blocking(move || submission_log::parse(&path))
            .await
            .unwrap_or_else(|e| Err(io::Error::other(format!("Parser task failed: {}", e))));

        let log = match parsed {
            Ok(log) => log,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("Submission log vanished: {}", logfile.display());
                return Ok(IngestOutcome::Aborted);
            }
            Err(e) => {
                warn!("Failed to read submission log {}: {}", logfile.display(), e);
                return Ok(IngestOutcome::Aborted);
            }
        };

        let (job_id, sub_dir) = match (log.job_id, log.sub_dir) {
            (Some(job_id), Some(sub_dir)) => (job_id, sub_dir),
            (job_id, sub_dir) => {
                error!(
                    "job_id ({:?}) or sub_dir ({:?}) missing in {}",
                    job_id,
                    sub_dir,
                    logfile.display()
                );
                return Ok(IngestOutcome::Aborted);
            }
        };

        if self.store.exists(job_id).await? {
            info!("Job {} already in store, nothing to do", job_id);
            return Ok(IngestOutcome::AlreadyKnown);
        }

        let recent = is_recent(log.submission_time, Local::now().naive_local());
        let sub_dir_path = PathBuf::from(&sub_dir);

        let mut resolution = self.resolver.resolve(job_id, &sub_dir_path, recent).await;
        let mut re_resolutions = 0;

        let (filename, readme) = loop {
            let Some(job_dir) = resolution.job_dir.clone().filter(|_| resolution.is_determined())
            else {
                info!("No job_status or job_dir for job {}, skipping", job_id);
                return Ok(IngestOutcome::Aborted);
            };

            let readmes = Arc::clone(&self.readmes);
            let read = tokio::task::spawn_blocking(move || read_readme(readmes.as_ref(), &job_dir))
                .await;
            let read = match read {
                Ok(read) => read,
                Err(e) => {
                    error!("README task for job {} failed: {}", job_id, e);
                    return Ok(IngestOutcome::Aborted);
                }
            };

            match read {
                ReadmeRead::Complete { filename, readme } => break (filename, readme),
                ReadmeRead::Abort => return Ok(IngestOutcome::Aborted),
                ReadmeRead::Moved => {
                    if re_resolutions >= self.max_race_retries {
                        warn!(
                            "Job {} kept moving after {} re-resolutions, giving up",
                            job_id, re_resolutions
                        );
                        return Ok(IngestOutcome::GaveUp);
                    }
                    re_resolutions += 1;
                    info!("Job {} moved while reading, resolving again", job_id);
                    resolution = self.resolver.resolve(job_id, &sub_dir_path, recent).await;
                }
            }
        };

        self.create_record(job_id, sub_dir, logfile, &resolution, filename, readme)
            .await?;
        Ok(IngestOutcome::Created)
    }

    async fn create_record(
        &self,
        job_id: i64,
        sub_dir: String,
        logfile: &Path,
        resolution: &Resolution,
        readme_filename: String,
        readme: CompleteReadme,
    ) -> AppResult<()> {
        let user = self
            .store
            .get_or_create_user(&readme.username, &readme.email)
            .await?;

        let now = Utc::now();
        let record = JobRecord {
            job_id,
            project: project_from_path(&sub_dir),
            sub_dir,
            job_dir: resolution.job_dir_string(),
            job_status: resolution.status,
            main_name: readme.main_name,
            solver: readme.solver,
            readme_filename,
            sub_date: local_to_utc(readme.sub_date),
            info: readme.info_block,
            logfile_path: logfile.to_string_lossy().into_owned(),
            user_id: Some(user.id),
            base_runs: vec![],
            created_at: now,
            updated_at: now,
        };

        self.store.create(&record).await?;
        info!(
            "Created job {} ({}) for user {}",
            job_id, record.job_status, user.username
        );

        for base_run in readme.base_runs {
            if !self.store.add_base_run(job_id, base_run).await? {
                debug!("Base run {} of job {} not in store, skipped", base_run, job_id);
            }
        }

        Ok(())
    }
}

/// Find and parse the README of `job_dir`. Blocking.
fn read_readme(readmes: &dyn ReadmeSource, job_dir: &Path) -> ReadmeRead {
    let filename = match readmes.find(job_dir) {
        Ok(Some(filename)) => filename,
        Ok(None) => {
            warn!("No README found in job_dir: {}", job_dir.display());
            return ReadmeRead::Abort;
        }
        Err(e) => match e.kind() {
            io::ErrorKind::NotFound => {
                info!("job_dir vanished: {}", job_dir.display());
                return ReadmeRead::Moved;
            }
            io::ErrorKind::PermissionDenied => {
                warn!("No access to job_dir {}: {}", job_dir.display(), e);
                return ReadmeRead::Abort;
            }
            _ => {
                warn!("Failed to list job_dir {}: {}", job_dir.display(), e);
                return ReadmeRead::Abort;
            }
        },
    };

    let path = job_dir.join(&filename);
    let info = match readmes.parse(&path) {
        Ok(info) => info.unwrap_or_default(),
        Err(e) => match e.kind() {
            io::ErrorKind::NotFound => {
                info!("README vanished while reading: {}", path.display());
                return ReadmeRead::Moved;
            }
            io::ErrorKind::PermissionDenied => {
                info!("No access to README {}: {}", path.display(), e);
                return ReadmeRead::Abort;
            }
            _ => {
                warn!("Failed to read README {}: {}", path.display(), e);
                return ReadmeRead::Abort;
            }
        },
    };

    match info.into_complete() {
        Ok(readme) => ReadmeRead::Complete { filename, readme },
        Err(missing) => {
            error!(
                "Values for {:?} not found in README {}",
                missing,
                path.display()
            );
            ReadmeRead::Abort
        }
    }
}

/// README dates are local wall-clock times. A time skipped by a DST switch
/// is taken as UTC.
fn local_to_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    match Local.from_local_datetime(&naive).earliest() {
        Some(local) => local.with_timezone(&Utc),
        None => {
            warn!("Local time {} does not exist, storing it as UTC", naive);
            naive.and_utc()
        }
    }
}
