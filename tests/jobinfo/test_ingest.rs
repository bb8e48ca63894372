//! Ingestion of submission logs into the store.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::TimeDelta;
use jobdiary_lib::caefiles::{submission_log, LocalReadmeSource, ReadmeInfo, ReadmeSource};
use jobdiary_lib::models::JobStatus;
use jobdiary_lib::services::IngestOutcome;
use jobdiary_lib::store::{JobStore, MemoryStore};

use super::test_helpers::{
    cluster_script_path, ingestor, now_local, write_readme, ClusterFs, JOB_ID,
};

/// Moves the running job into its finished folder right before the first
/// README parse, the way the scheduler does at job end.
struct JobEndsWhileReading {
    scratch: PathBuf,
    finished: PathBuf,
    script: PathBuf,
    moved: AtomicBool,
}

impl ReadmeSource for JobEndsWhileReading {
    fn find(&self, job_dir: &Path) -> io::Result<Option<String>> {
        LocalReadmeSource.find(job_dir)
    }

    fn parse(&self, path: &Path) -> io::Result<Option<ReadmeInfo>> {
        if !self.moved.swap(true, Ordering::SeqCst) {
            fs::rename(&self.scratch, &self.finished)?;
            fs::remove_file(&self.script)?;
        }
        LocalReadmeSource.parse(path)
    }
}

/// Job directory that is always gone by the time it is listed.
struct AlwaysMoving;

impl ReadmeSource for AlwaysMoving {
    fn find(&self, _job_dir: &Path) -> io::Result<Option<String>> {
        Err(io::Error::from(io::ErrorKind::NotFound))
    }

    fn parse(&self, _path: &Path) -> io::Result<Option<ReadmeInfo>> {
        Err(io::Error::from(io::ErrorKind::NotFound))
    }
}

/// Job directory the service user may not read.
#[derive(Default)]
struct LockedJobDir {
    finds: AtomicUsize,
}

impl ReadmeSource for LockedJobDir {
    fn find(&self, _job_dir: &Path) -> io::Result<Option<String>> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        Err(io::Error::from(io::ErrorKind::PermissionDenied))
    }

    fn parse(&self, path: &Path) -> io::Result<Option<ReadmeInfo>> {
        LocalReadmeSource.parse(path)
    }
}

/// README present but not readable.
#[derive(Default)]
struct LockedReadme {
    finds: AtomicUsize,
}

impl ReadmeSource for LockedReadme {
    fn find(&self, job_dir: &Path) -> io::Result<Option<String>> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        LocalReadmeSource.find(job_dir)
    }

    fn parse(&self, _path: &Path) -> io::Result<Option<ReadmeInfo>> {
        Err(io::Error::from(io::ErrorKind::PermissionDenied))
    }
}

#[tokio::test]
async fn test_ingest_creates_record() {
    let cluster = ClusterFs::new();
    let job_dir = cluster.make_pending(JOB_ID);
    let logfile = cluster.write_submission_log("1234567", now_local());
    let store = Arc::new(MemoryStore::new());

    let outcome = ingestor(&store).ingest(&logfile).await.unwrap();
    assert_eq!(outcome, IngestOutcome::Created);

    let job = store.get(JOB_ID).await.unwrap().unwrap();
    assert_eq!(job.job_status, JobStatus::Pending);
    assert_eq!(job.job_dir.as_deref(), Some(job_dir.to_string_lossy().as_ref()));
    assert_eq!(job.sub_dir, cluster.sub_dir.to_string_lossy());
    assert_eq!(job.logfile_path, logfile.to_string_lossy());
    assert_eq!(job.readme_filename, "README.0123_PRJ_VEHC_load_case.key.README");
    assert_eq!(job.main_name, "0123_PRJ_VEHC_load_case.key");
    assert_eq!(job.solver, "dyn");
    assert_eq!(job.info, "Front crash, new bumper\nsecond try");
    assert_eq!(job.project, "3001234");

    let users = store.users();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].username, "usera");
    assert_eq!((users[0].first_name.as_str(), users[0].last_name.as_str()), ("jane", "doe"));
    assert_eq!(job.user_id, Some(users[0].id));
}

#[tokio::test]
async fn test_ingest_twice_creates_one_record() {
    let cluster = ClusterFs::new();
    cluster.make_finished(JOB_ID);
    let submitted = now_local() - TimeDelta::days(3);
    let first = cluster.write_submission_log("1234567", submitted);
    let second = cluster.write_submission_log("1234567", submitted + TimeDelta::seconds(1));
    let store = Arc::new(MemoryStore::new());
    let ingestor = ingestor(&store);

    assert!(ingestor.ingest(&first).await.unwrap().is_created());
    assert_eq!(
        ingestor.ingest(&second).await.unwrap(),
        IngestOutcome::AlreadyKnown
    );
    assert_eq!(
        ingestor.ingest(&first).await.unwrap(),
        IngestOutcome::AlreadyKnown
    );

    assert_eq!(store.job_count(), 1);
    assert_eq!(store.write_count(), 1);
}

#[tokio::test]
async fn test_non_integer_job_number_is_aborted() {
    let cluster = ClusterFs::new();
    cluster.make_finished(JOB_ID);
    let logfile = cluster.write_submission_log("a1040629", now_local());

    let log = submission_log::parse(&logfile).unwrap();
    assert_eq!(log.job_id, None);
    assert_eq!(log.sub_dir, Some(cluster.sub_dir.to_string_lossy().into_owned()));

    let store = Arc::new(MemoryStore::new());
    let outcome = ingestor(&store).ingest(&logfile).await.unwrap();
    assert_eq!(outcome, IngestOutcome::Aborted);
    assert_eq!(store.job_count(), 0);
}

#[tokio::test]
async fn test_vanished_submission_log_is_aborted() {
    let cluster = ClusterFs::new();
    let store = Arc::new(MemoryStore::new());

    let outcome = ingestor(&store)
        .ingest(&cluster.poll_dir.join("2018-06-07__17:21:21-1234567.log"))
        .await
        .unwrap();

    assert_eq!(outcome, IngestOutcome::Aborted);
}

#[tokio::test]
async fn test_undeterminable_status_is_aborted() {
    let cluster = ClusterFs::new();
    let logfile = cluster.write_submission_log("1234567", now_local());
    let store = Arc::new(MemoryStore::new());

    let outcome = ingestor(&store).ingest(&logfile).await.unwrap();

    assert_eq!(outcome, IngestOutcome::Aborted);
    assert_eq!(store.job_count(), 0);
}

#[tokio::test]
async fn test_job_dir_without_readme_is_aborted() {
    let cluster = ClusterFs::new();
    fs::create_dir_all(cluster.finished_dir(JOB_ID)).unwrap();
    let logfile = cluster.write_submission_log("1234567", now_local());
    let store = Arc::new(MemoryStore::new());

    let outcome = ingestor(&store).ingest(&logfile).await.unwrap();

    assert_eq!(outcome, IngestOutcome::Aborted);
}

#[tokio::test]
async fn test_incomplete_readme_is_aborted() {
    let cluster = ClusterFs::new();
    let job_dir = cluster.finished_dir(JOB_ID);
    fs::create_dir_all(&job_dir).unwrap();
    fs::write(
        job_dir.join("README.model.key.README"),
        "Sub-User: usera\nSolver: dyn\n",
    )
    .unwrap();
    let logfile = cluster.write_submission_log("1234567", now_local());
    let store = Arc::new(MemoryStore::new());

    let outcome = ingestor(&store).ingest(&logfile).await.unwrap();

    assert_eq!(outcome, IngestOutcome::Aborted);
    assert!(store.users().is_empty());
}

#[tokio::test]
async fn test_base_runs_link_known_jobs_only() {
    let cluster = ClusterFs::new();
    let store = Arc::new(MemoryStore::new());
    let ingestor = ingestor(&store);

    cluster.make_finished(1000001);
    let base_log = cluster.write_submission_log("1000001", now_local());
    assert!(ingestor.ingest(&base_log).await.unwrap().is_created());

    let job_dir = cluster.finished_dir(JOB_ID);
    fs::create_dir_all(&job_dir).unwrap();
    write_readme(&job_dir, "1000001, 999");
    let logfile = cluster.write_submission_log("1234567", now_local());
    assert!(ingestor.ingest(&logfile).await.unwrap().is_created());

    let job = store.get(JOB_ID).await.unwrap().unwrap();
    assert_eq!(job.base_runs, vec![1000001]);
    assert_eq!(store.users().len(), 1);
}

#[tokio::test]
async fn test_job_finishing_between_lookup_and_parse() {
    let cluster = ClusterFs::new();
    let scratch = cluster.make_running(JOB_ID);
    let logfile = cluster.write_submission_log("1234567", now_local());
    let store = Arc::new(MemoryStore::new());

    let readmes = Arc::new(JobEndsWhileReading {
        scratch,
        finished: cluster.finished_dir(JOB_ID),
        script: cluster_script_path(&cluster.sub_dir, JOB_ID),
        moved: AtomicBool::new(false),
    });
    let outcome = ingestor(&store)
        .with_readme_source(readmes)
        .ingest(&logfile)
        .await
        .unwrap();

    assert_eq!(outcome, IngestOutcome::Created);
    let job = store.get(JOB_ID).await.unwrap().unwrap();
    assert_eq!(job.job_status, JobStatus::Finished);
    assert_eq!(
        job.job_dir.as_deref(),
        Some(cluster.finished_dir(JOB_ID).to_string_lossy().as_ref())
    );
}

#[tokio::test]
async fn test_gives_up_when_job_keeps_moving() {
    let cluster = ClusterFs::new();
    cluster.make_finished(JOB_ID);
    let logfile = cluster.write_submission_log("1234567", now_local() - TimeDelta::days(2));
    let store = Arc::new(MemoryStore::new());

    let outcome = ingestor(&store)
        .with_readme_source(Arc::new(AlwaysMoving))
        .with_max_race_retries(2)
        .ingest(&logfile)
        .await
        .unwrap();

    assert_eq!(outcome, IngestOutcome::GaveUp);
    assert_eq!(store.job_count(), 0);
}

#[tokio::test]
async fn test_unreadable_job_dir_is_aborted_without_re_resolving() {
    let cluster = ClusterFs::new();
    cluster.make_finished(JOB_ID);
    let logfile = cluster.write_submission_log("1234567", now_local());
    let store = Arc::new(MemoryStore::new());
    let readmes = Arc::new(LockedJobDir::default());

    let outcome = ingestor(&store)
        .with_readme_source(readmes.clone())
        .ingest(&logfile)
        .await
        .unwrap();

    assert_eq!(outcome, IngestOutcome::Aborted);
    assert_eq!(store.job_count(), 0);
    assert_eq!(readmes.finds.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unreadable_readme_is_aborted_without_re_resolving() {
    let cluster = ClusterFs::new();
    cluster.make_finished(JOB_ID);
    let logfile = cluster.write_submission_log("1234567", now_local());
    let store = Arc::new(MemoryStore::new());
    let readmes = Arc::new(LockedReadme::default());

    let outcome = ingestor(&store)
        .with_readme_source(readmes.clone())
        .ingest(&logfile)
        .await
        .unwrap();

    assert_eq!(outcome, IngestOutcome::Aborted);
    assert_eq!(store.job_count(), 0);
    assert!(store.users().is_empty());
    assert_eq!(readmes.finds.load(Ordering::SeqCst), 1);
}
