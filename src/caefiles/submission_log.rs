//! Submission logs written by the scheduler into the poll directory.
//!
//! A submission log is named like `2010-01-02__12:34:56-1234567.log` and holds
//! administrative `key: value` lines. Only `job_number`, `sge_o_workdir` and
//! `submission_time` are of interest here.

use std::io;
use std::path::Path;
use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use tracing::{debug, error, info, warn};

use super::key_value::value_of;

/// Format of the `submission_time` value, e.g. `Fri Jul 27 08:28:38 2018`.
pub const SUBMISSION_TIME_FORMAT: &str = "%a %b %d %H:%M:%S %Y";

static FILENAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}__[0-9]{2}:[0-9]{2}:[0-9]{2}-[0-9]+\.log$")
        .expect("valid submission log regex")
});

/// Information extracted from one submission log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionLog {
    pub job_id: Option<i64>,
    pub sub_dir: Option<String>,
    /// Local wall-clock time; the file carries no zone.
    pub submission_time: Option<NaiveDateTime>,
}

/// Check whether the basename of `path` follows the submission log grammar.
pub fn is_submission_log_filename(path: &Path) -> bool {
    path.file_name()
        .map(|name| FILENAME_PATTERN.is_match(&name.to_string_lossy()))
        .unwrap_or(false)
}

/// Parse a submission log.
///
/// A missing file is returned as an error for the caller to classify. A
/// job number that is not a positive integer or a malformed submission time
/// leaves that field empty without stopping the scan.
pub fn parse(path: &Path) -> io::Result<SubmissionLog> {
    info!("Getting job info from submission log: {}", path.display());

    let bytes = std::fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes);

    let mut log = SubmissionLog::default();

    for line in content.lines() {
        if line.contains("job_number") {
            let raw = last_field(line);
            match raw.parse::<i64>() {
                Ok(id) if id > 0 => log.job_id = Some(id),
                Ok(id) => error!("Job number {} is not a positive integer", id),
                Err(e) => error!("Job number '{}' is not an integer: {}", raw, e),
            }
        }

        if line.contains("sge_o_workdir") {
            let workdir = last_field(line);
            if !workdir.is_empty() {
                log.sub_dir = Some(workdir.to_string());
            }
        }

        if line.contains("submission_time") {
            let value = value_of(line);
            match NaiveDateTime::parse_from_str(&value, SUBMISSION_TIME_FORMAT) {
                Ok(time) => log.submission_time = Some(time),
                Err(e) => debug!("submission_time '{}' does not match expected format: {}", value, e),
            }
        }
    }

    if log.job_id.is_none() && log.sub_dir.is_none() {
        warn!(
            "No relevant content in submission log {}! Here is the content for examination:\n{}",
            path.display(),
            content
        );
    }

    info!(
        "Job info from submission log: job_id: {:?}, sub_dir: {:?}, submission_time: {:?}",
        log.job_id, log.sub_dir, log.submission_time
    );

    Ok(log)
}

/// Text after the last colon, trimmed. Job numbers and work directories
/// never contain colons themselves.
fn last_field(line: &str) -> &str {
    line.rsplit(':').next().unwrap_or_default().trim()
}
