//! Job README files.
//!
//! A README lives in the job directory and is named after the main input
//! file, e.g. `README.0696_OEM_VHIC_SLD_FRB_56_TH_p1_ident_variant_.key.README`.
//! It carries the user-entered description of the job as `key: value` lines
//! plus one multi-line information block.

use std::io;
use std::path::Path;
use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use tracing::{debug, error, info};

use super::key_value::value_of;

/// Format of the `Sub-Date` value, e.g. `2018-01-02__12:34:56`.
pub const SUB_DATE_FORMAT: &str = "%Y-%m-%d__%H:%M:%S";

const INFO_BLOCK_START: &str = "information      :";
const INFO_BLOCK_END: &str = "********Header********";

static FILENAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^README\..*\.README$").expect("valid README regex"));

/// Whatever a README yielded. Every field is optional; callers decide what
/// they need via [`ReadmeInfo::into_complete`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadmeInfo {
    pub main_name: Option<String>,
    pub base_runs: Option<Vec<i64>>,
    pub info_block: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub sub_date: Option<NaiveDateTime>,
    pub solver: Option<String>,
}

/// README content with every field needed to create a job record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompleteReadme {
    pub main_name: String,
    pub base_runs: Vec<i64>,
    pub info_block: String,
    pub username: String,
    pub email: String,
    pub sub_date: NaiveDateTime,
    pub solver: String,
}

impl ReadmeInfo {
    fn is_empty(&self) -> bool {
        *self == ReadmeInfo::default()
    }

    /// Names of the required keys that were not found.
    pub fn missing_keys(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.main_name.is_none() {
            missing.push("main_name");
        }
        if self.base_runs.is_none() {
            missing.push("base_runs");
        }
        if self.username.is_none() {
            missing.push("username");
        }
        if self.email.is_none() {
            missing.push("email");
        }
        if self.info_block.is_none() {
            missing.push("info_block");
        }
        if self.sub_date.is_none() {
            missing.push("sub_date");
        }
        if self.solver.is_none() {
            missing.push("solver");
        }
        missing
    }

    /// Convert into [`CompleteReadme`], or return the names of missing keys.
    pub fn into_complete(self) -> Result<CompleteReadme, Vec<&'static str>> {
        match self {
            ReadmeInfo {
                main_name: Some(main_name),
                base_runs: Some(base_runs),
                info_block: Some(info_block),
                username: Some(username),
                email: Some(email),
                sub_date: Some(sub_date),
                solver: Some(solver),
            } => Ok(CompleteReadme {
                main_name,
                base_runs,
                info_block,
                username,
                email,
                sub_date,
                solver,
            }),
            incomplete => Err(incomplete.missing_keys()),
        }
    }
}

/// Find the README in `job_dir`.
///
/// Listing errors are returned unchanged: a vanished `job_dir` means the job
/// moved on and the caller has to re-resolve it.
pub fn find_readme(job_dir: &Path) -> io::Result<Option<String>> {
    info!("Checking existence of README file in job_dir: {}", job_dir.display());

    let mut names = Vec::new();
    for entry in std::fs::read_dir(job_dir)? {
        names.push(entry?.file_name().to_string_lossy().into_owned());
    }
    names.sort();

    let found = names.into_iter().find(|name| FILENAME_PATTERN.is_match(name));
    match &found {
        Some(name) => info!("Found job README file: {}", name),
        None => info!("No job README found in {}", job_dir.display()),
    }
    Ok(found)
}

/// Parse a README file.
///
/// The file is decoded as ISO-8859-1 so that arbitrary bytes never abort
/// parsing. Returns `None` when not a single known key was found.
pub fn parse(path: &Path) -> io::Result<Option<ReadmeInfo>> {
    info!("Getting job info from README: {}", path.display());

    let bytes = std::fs::read(path)?;
    let content: String = bytes.iter().map(|&b| b as char).collect();

    Ok(parse_content(&content))
}

fn parse_content(content: &str) -> Option<ReadmeInfo> {
    let mut readme = ReadmeInfo::default();
    let mut reading_info_block = false;
    let mut info_block = String::new();

    for line in content.split_inclusive('\n') {
        if line.contains("FILE:") {
            readme.main_name = Some(value_of(line));
            debug!("main_name found in README: {:?}", readme.main_name);
        }

        if line.contains("base-run (job-id):") {
            readme.base_runs = Some(base_runs_of(line));
            debug!("base_runs found in README: {:?}", readme.base_runs);
        }

        if reading_info_block {
            if line.contains(INFO_BLOCK_END) {
                reading_info_block = false;
                readme.info_block = Some(info_block.trim_end().to_string());
                debug!("info_block found in README:\n{:?}", readme.info_block);
            } else {
                info_block.push_str(line);
            }
        }
        if line.contains(INFO_BLOCK_START) {
            reading_info_block = true;
        }

        if line.contains("Sub-User:") {
            readme.username = Some(value_of(line));
            debug!("username found in README: {:?}", readme.username);
        }

        if line.contains("EMail:") {
            readme.email = Some(value_of(line));
            debug!("email found in README: {:?}", readme.email);
        }

        if line.contains("Sub-Date:") {
            let value = value_of(line);
            match NaiveDateTime::parse_from_str(&value, SUB_DATE_FORMAT) {
                Ok(date) => readme.sub_date = Some(date),
                Err(e) => error!("Sub-Date '{}' does not match {}: {}", value, SUB_DATE_FORMAT, e),
            }
        }

        if line.contains("Solver:") {
            readme.solver = Some(value_of(line));
            debug!("solver found in README: {:?}", readme.solver);
        }
    }

    if readme.is_empty() {
        return None;
    }
    Some(readme)
}

/// Base run ids from a `base-run (job-id):` line. Every non-digit character
/// separates ids.
fn base_runs_of(line: &str) -> Vec<i64> {
    let value = value_of(line);
    let cleaned: String = value
        .chars()
        .map(|c| if c.is_ascii_digit() { c } else { ' ' })
        .collect();
    cleaned
        .split_whitespace()
        .filter_map(|num| num.parse::<i64>().ok())
        .collect()
}
