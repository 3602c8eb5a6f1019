use std::path::PathBuf;

use clap::Parser;
use serde::Deserialize;

use crate::results::RunContext;

// ─── Process configuration ───────────────────────────────────────

#[derive(Debug, Clone, Parser)]
#[command(
    name = "bench-results",
    version,
    about = "Collects benchmark sweep results and serves them as chart-JSON, JSON test results and histogram sets"
)]
pub struct Config {
    /// Address the HTTP API binds to
    #[arg(long, env = "BENCH_RESULTS_LISTEN", default_value = "0.0.0.0:3000")]
    pub listen: String,

    /// Directory for traces and per-run artifacts; artifacts are discarded without it
    #[arg(long, env = "BENCH_RESULTS_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Remote bucket artifacts are uploaded to
    #[arg(long, env = "BENCH_RESULTS_UPLOAD_BUCKET")]
    pub upload_bucket: Option<String>,

    /// Redis instance backing artifact upload
    #[arg(long, env = "BENCH_RESULTS_REDIS_URL")]
    pub redis_url: Option<String>,

    /// Shard this process runs as; reported for failed stories
    #[arg(long, env = "GTEST_SHARD_INDEX")]
    pub shard_index: Option<u32>,

    /// Verbose logging (overridden by RUST_LOG)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Run context for a new sweep, combining process-wide settings with
    /// the sweep's own identity.
    pub fn context_for(&self, sweep: &SweepConfig) -> RunContext {
        let mut ctx = RunContext::new(&sweep.benchmark_name)
            .with_description(&sweep.benchmark_description)
            .with_shard_index(self.shard_index);
        if let Some(label) = &sweep.results_label {
            ctx = ctx.with_results_label(label);
        }
        if let Some(dir) = &self.output_dir {
            ctx = ctx.with_output_dir(dir);
        }
        if let Some(bucket) = &self.upload_bucket {
            ctx = ctx.with_upload_bucket(bucket);
        }
        if !sweep.enabled {
            ctx = ctx.disabled();
        }
        ctx
    }
}

// ─── Per-sweep configuration ─────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct SweepConfig {
    pub benchmark_name: String,

    #[serde(default)]
    pub benchmark_description: String,

    /// Suffix for trace file names and the `labels` diagnostic
    #[serde(default)]
    pub results_label: Option<String>,

    /// A disabled benchmark still produces (minimal) output documents
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl SweepConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.benchmark_name.trim().is_empty() {
            return Err("benchmark_name must not be empty".into());
        }
        if self
            .results_label
            .as_deref()
            .is_some_and(|l| l.contains(['/', '\\']))
        {
            return Err("results_label must not contain path separators".into());
        }
        Ok(())
    }
}
