//! Watching the poll directory for new submission logs.

use std::collections::HashSet;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::ingest::NewJobIngestor;
use super::runner::LoopPass;
use crate::caefiles::is_submission_log_filename;
use crate::error::AppResult;

/// Ingest pass over the poll directory.
///
/// Only names that were not present in the previous listing are looked at.
pub struct PollDirWatcher {
    poll_dir: PathBuf,
    ingestor: NewJobIngestor,
    seen: HashSet<String>,
}

impl PollDirWatcher {
    pub fn new(poll_dir: PathBuf, ingestor: NewJobIngestor) -> Self {
        Self {
            poll_dir,
            ingestor,
            seen: HashSet::new(),
        }
    }

    /// Process new submission logs. Returns how many records were created.
    pub async fn poll(&mut self, token: &CancellationToken) -> AppResult<usize> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.poll_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();

        let new_names: Vec<&String> = names.iter().filter(|n| !self.seen.contains(*n)).collect();
        if !new_names.is_empty() {
            debug!("{} new files in poll directory", new_names.len());
        }

        let mut created = 0;
        for name in new_names {
            if token.is_cancelled() {
                info!("Polling cancelled, {} records created", created);
                return Ok(created);
            }

            let path = self.poll_dir.join(name);
            if !is_submission_log_filename(&path) {
                debug!("Not a submission log, skipped: {}", name);
                continue;
            }
            let is_file = tokio::fs::metadata(&path)
                .await
                .map(|meta| meta.is_file())
                .unwrap_or(false);
            if !is_file {
                debug!("Submission log gone before processing: {}", name);
                continue;
            }

            if self.ingestor.ingest(&path).await?.is_created() {
                created += 1;
            }
        }

        self.seen = names.into_iter().collect();
        Ok(created)
    }
}

#[async_trait]
impl LoopPass for PollDirWatcher {
    fn name(&self) -> &'static str {
        "ingest"
    }

    async fn run_pass(&mut self, token: &CancellationToken) -> AppResult<()> {
        let created = self.poll(token).await?;
        if created > 0 {
            info!("Created {} new job records", created);
        }
        Ok(())
    }
}
