//! Cluster scripts written into the submission directory while a job runs.
//!
//! The filename looks like `1234567.dyn-dmp.x99xx123.16.sh` (job id, solver
//! and mode tags, execution host, core count). The content is typically a
//! single `cd /W04_cluster_scratch/1234567*` line naming the scratch
//! directory that holds the running job's data.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, error, info};

fn script_pattern(job_id: i64) -> Option<Regex> {
    Regex::new(&format!(
        r"^{}\.[a-z]{{3}}-[a-z]{{3}}\.[a-z][0-9]{{2}}[a-z]{{2}}[0-9]{{3}}\.[0-9]{{1,2}}\.sh$",
        job_id
    ))
    .ok()
}

/// First filename in `filenames` that is a cluster script for `job_id`.
pub fn find<'a, I>(job_id: i64, filenames: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a String>,
{
    let pattern = script_pattern(job_id)?;
    let found = filenames
        .into_iter()
        .map(String::as_str)
        .find(|name| pattern.is_match(name));

    match found {
        Some(name) => info!("Found cluster script: {}", name),
        None => debug!("No cluster script found for job {}", job_id),
    }
    found
}

/// Scratch directory named on the first line of a cluster script.
///
/// A trailing `*` glob is dropped. An unreadable or missing script is logged
/// and yields `None`.
pub fn scratch_dir_of(script_path: &Path) -> Option<PathBuf> {
    info!("Getting scratch dir from cluster script: {}", script_path.display());

    let line = match read_first_line(script_path) {
        Ok(line) => line,
        Err(e) => {
            error!(
                "Cluster script {} not found or no access, can not check for scratch dir: {}",
                script_path.display(),
                e
            );
            return None;
        }
    };

    if !line.contains("cd") {
        info!("No cluster scratch directory found");
        return None;
    }

    let scratch = line
        .split_whitespace()
        .nth(1)
        .map(|token| token.trim_end().trim_end_matches('*'))
        .filter(|token| !token.is_empty())
        .map(PathBuf::from);

    match &scratch {
        Some(dir) => info!("Cluster scratch directory found: {}", dir.display()),
        None => info!("No cluster scratch directory found"),
    }
    scratch
}

fn read_first_line(path: &Path) -> io::Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut buf = Vec::new();
    reader.read_until(b'\n', &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
