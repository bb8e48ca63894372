//! Shared helpers for the PostgreSQL store tests.

use chrono::Utc;
use jobdiary_lib::config::Config;
use jobdiary_lib::db::DbPool;
use jobdiary_lib::models::{JobRecord, JobStatus};
use tokio::sync::OnceCell;
use uuid::Uuid;

static MIGRATIONS_RUN: OnceCell<()> = OnceCell::const_new();

/// Create a fresh DB pool. Migrations run only once.
pub async fn create_test_pool() -> DbPool {
    let mut config = Config::from_env().expect(
        "Failed to load config. Ensure RUST_ENV and DATABASE_URL are set, \
         and that PostgreSQL is running.",
    );
    config.db_max_connections = 2;

    let pool = DbPool::new(&config)
        .await
        .expect("Failed to connect to database");

    MIGRATIONS_RUN
        .get_or_init(|| async {
            pool.run_migrations()
                .await
                .expect("Failed to run migrations");
        })
        .await;

    pool
}

/// Job id no other test uses.
pub fn unique_job_id() -> i64 {
    let (high, _) = Uuid::new_v4().as_u64_pair();
    (high >> 2) as i64 + 1
}

/// Username no other test uses.
pub fn unique_username(prefix: &str) -> String {
    format!(
        "{}-{}",
        prefix,
        Uuid::new_v4().to_string().split('-').next().unwrap()
    )
}

/// Job record in `status`, located at `job_dir`.
pub fn job_record(job_id: i64, status: JobStatus, job_dir: Option<&str>) -> JobRecord {
    let now = Utc::now();
    JobRecord {
        job_id,
        sub_dir: "/W01_pcae_data/3001234/sim".to_string(),
        job_dir: job_dir.map(str::to_string),
        job_status: status,
        main_name: "0123_PRJ_VEHC_load_case.key".to_string(),
        solver: "dyn".to_string(),
        readme_filename: "README.0123_PRJ_VEHC_load_case.key.README".to_string(),
        sub_date: now,
        info: "Front crash, new bumper".to_string(),
        logfile_path: "/DB/.qstat/2018-06-07__17:21:21-1234567.log".to_string(),
        project: "3001234".to_string(),
        user_id: None,
        base_runs: vec![],
        created_at: now,
        updated_at: now,
    }
}
