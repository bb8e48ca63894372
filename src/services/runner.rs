//! Periodic driver shared by the ingest and refresh loops.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::AppResult;

/// One bounded unit of work of a loop.
#[async_trait]
pub trait LoopPass: Send {
    /// Name used in log lines.
    fn name(&self) -> &'static str;

    /// Run one pass. Long passes should check `token` between items.
    async fn run_pass(&mut self, token: &CancellationToken) -> AppResult<()>;
}

/// Runs a [`LoopPass`] every `interval_secs` seconds until cancelled.
#[derive(Clone)]
pub struct CancellableLoop {
    interval_secs: u64,
    token: CancellationToken,
}

impl CancellableLoop {
    pub fn new(interval_secs: u64, token: CancellationToken) -> Self {
        Self {
            interval_secs,
            token,
        }
    }

    /// Run until the token is cancelled.
    ///
    /// A failing pass ends the loop with that error; restarting is left to
    /// whoever supervises the process.
    pub async fn run<P: LoopPass>(&self, pass: &mut P) -> AppResult<()> {
        info!(
            "Starting {} loop (interval: {} seconds)",
            pass.name(),
            self.interval_secs
        );

        while !self.token.is_cancelled() {
            if let Err(e) = pass.run_pass(&self.token).await {
                error!("{} loop terminated: {}", pass.name(), e);
                return Err(e);
            }
            self.pause().await;
        }

        info!("{} loop stopped", pass.name());
        Ok(())
    }

    /// Sleep for the interval in one-second steps, returning early on
    /// cancellation.
    async fn pause(&self) {
        for _ in 0..self.interval_secs {
            tokio::select! {
                _ = self.token.cancelled() => return,
                _ = tokio::time::sleep(Duration::from_secs(1)) => {}
            }
        }
    }
}
