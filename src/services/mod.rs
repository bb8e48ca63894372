//! Job tracking services: status resolution, ingestion and the loops
//! driving them.

pub mod ingest;
pub mod poll;
pub mod refresh;
pub mod runner;
pub mod status;

pub use ingest::{is_recent, IngestOutcome, NewJobIngestor};
pub use poll::PollDirWatcher;
pub use refresh::{RefreshSummary, StatusRefresher};
pub use runner::{CancellableLoop, LoopPass};
pub use status::{Resolution, StatusResolver};
