//! Shared fixtures: a fake cluster filesystem in a temp directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime, Utc};
use jobdiary_lib::caefiles::submission_log::SUBMISSION_TIME_FORMAT;
use jobdiary_lib::models::{JobRecord, JobStatus};
use jobdiary_lib::services::{NewJobIngestor, StatusResolver};
use jobdiary_lib::store::MemoryStore;
use tempfile::TempDir;

pub const JOB_ID: i64 = 1234567;

/// Temp tree with a poll directory, a submission directory below a project
/// folder and a scratch area.
pub struct ClusterFs {
    pub root: TempDir,
    pub poll_dir: PathBuf,
    pub sub_dir: PathBuf,
    pub scratch_root: PathBuf,
}

impl ClusterFs {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let poll_dir = root.path().join("qstat");
        let sub_dir = root.path().join("W01_pcae_data").join("3001234").join("sim");
        let scratch_root = root.path().join("scratch");
        for dir in [&poll_dir, &sub_dir, &scratch_root] {
            fs::create_dir_all(dir).unwrap();
        }
        ClusterFs {
            root,
            poll_dir,
            sub_dir,
            scratch_root,
        }
    }

    pub fn finished_dir(&self, job_id: i64) -> PathBuf {
        self.sub_dir.join(job_id.to_string())
    }

    pub fn pending_dir(&self, job_id: i64) -> PathBuf {
        self.sub_dir.join(format!("{}.pending", job_id))
    }

    pub fn scratch_dir(&self, job_id: i64) -> PathBuf {
        self.scratch_root.join(job_id.to_string())
    }

    /// Pending job folder with a README.
    pub fn make_pending(&self, job_id: i64) -> PathBuf {
        let dir = self.pending_dir(job_id);
        fs::create_dir_all(&dir).unwrap();
        write_readme(&dir, "");
        dir
    }

    /// Scratch folder with a README plus the cluster script pointing at it.
    pub fn make_running(&self, job_id: i64) -> PathBuf {
        let dir = self.scratch_dir(job_id);
        fs::create_dir_all(&dir).unwrap();
        write_readme(&dir, "");
        write_cluster_script(&self.sub_dir, job_id, &dir);
        dir
    }

    /// Finished job folder with a README.
    pub fn make_finished(&self, job_id: i64) -> PathBuf {
        let dir = self.finished_dir(job_id);
        fs::create_dir_all(&dir).unwrap();
        write_readme(&dir, "");
        dir
    }

    /// Submission log for `job_number` submitted at `submitted`.
    pub fn write_submission_log(&self, job_number: &str, submitted: NaiveDateTime) -> PathBuf {
        let path = self.poll_dir.join(format!(
            "{}-{}.log",
            submitted.format("%Y-%m-%d__%H:%M:%S"),
            job_number
        ));
        fs::write(
            &path,
            submission_log_content(job_number, &self.sub_dir, submitted),
        )
        .unwrap();
        path
    }
}

pub fn submission_log_content(job_number: &str, sub_dir: &Path, submitted: NaiveDateTime) -> String {
    format!(
        "==============================================================\n\
         job_number:                 {}\n\
         exec_file:                  job_scripts/{}\n\
         submission_time:            {}\n\
         owner:                      usera\n\
         sge_o_home:                 /home/usera\n\
         sge_o_workdir:              {}\n",
        job_number,
        job_number,
        submitted.format(SUBMISSION_TIME_FORMAT),
        sub_dir.display()
    )
}

/// Write a complete README into `dir`.
pub fn write_readme(dir: &Path, base_runs: &str) -> PathBuf {
    let path = dir.join("README.0123_PRJ_VEHC_load_case.key.README");
    fs::write(
        &path,
        format!(
            "\nREADME for 0123_PRJ_VEHC_load_case.key\n\
             base-run (job-id): {}\n\
             information      :\n\
             Front crash, new bumper\n\
             second try\n\
             ********Header********\n\
             Sub-User:   usera\n\
             EMail:      jane.doe@example.com\n\
             Sub-Date:   2018-06-07__17:21:21\n\
             Solver:     dyn\n\
             FILE:       0123_PRJ_VEHC_load_case.key\n",
            base_runs
        ),
    )
    .unwrap();
    path
}

pub fn cluster_script_path(sub_dir: &Path, job_id: i64) -> PathBuf {
    sub_dir.join(format!("{}.dyn-dmp.l01cl012.16.sh", job_id))
}

/// Cluster script in `sub_dir` whose first line changes into `scratch`.
pub fn write_cluster_script(sub_dir: &Path, job_id: i64, scratch: &Path) -> PathBuf {
    let path = cluster_script_path(sub_dir, job_id);
    fs::write(&path, format!("cd {}*  \n", scratch.display())).unwrap();
    path
}

pub fn now_local() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Resolver with a short pause so retry bursts stay fast.
pub fn fast_resolver() -> StatusResolver {
    StatusResolver::new(3, Duration::from_millis(20))
}

pub fn ingestor(store: &Arc<MemoryStore>) -> NewJobIngestor {
    NewJobIngestor::new(store.clone(), fast_resolver())
}

/// Open job record pointing at `sub_dir`.
pub fn open_record(job_id: i64, sub_dir: &Path, status: JobStatus, job_dir: &Path) -> JobRecord {
    let now = Utc::now();
    JobRecord {
        job_id,
        sub_dir: sub_dir.to_string_lossy().into_owned(),
        job_dir: Some(job_dir.to_string_lossy().into_owned()),
        job_status: status,
        main_name: "0123_PRJ_VEHC_load_case.key".to_string(),
        solver: "dyn".to_string(),
        readme_filename: "README.0123_PRJ_VEHC_load_case.key.README".to_string(),
        sub_date: now,
        info: String::new(),
        logfile_path: String::new(),
        project: String::new(),
        user_id: None,
        base_runs: vec![],
        created_at: now,
        updated_at: now,
    }
}
