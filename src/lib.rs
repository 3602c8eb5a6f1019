//! Benchmark sweep result collection.
//!
//! A driver opens one story run at a time on [`BenchmarkResults`], records
//! values, histograms and artifacts against it, and finally renders the
//! aggregate through an [`output::OutputFormatter`]. The [`server`] module
//! exposes the same lifecycle over HTTP.

pub mod artifacts;
pub mod config;
pub mod error;
pub mod handlers;
pub mod histogram;
pub mod middleware;
pub mod output;
pub mod platform;
pub mod results;
pub mod server;
pub mod story;
pub mod value;

use std::sync::Arc;

pub use error::{Error, PlatformError, Result, StorageError, UsageError};
pub use results::{BenchmarkResults, ResultsCollector, RunContext, RunRecord, RunStatus};
pub use story::Story;
pub use value::{ImprovementDirection, Payload, Value};

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    pub config: config::Config,

    /// The sweep being collected; replaced on every sweep start.
    pub results: Arc<ResultsCollector>,

    /// Upload target; `None` keeps artifacts local.
    pub storage: Option<Arc<dyn artifacts::ArtifactStorage>>,
}
