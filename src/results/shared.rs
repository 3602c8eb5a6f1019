use parking_lot::Mutex;
use tracing::info;

use super::{BenchmarkResults, RunContext, SweepStatus};
use crate::artifacts::ArtifactStorage;
use crate::error::Result;

// ─── Public types ────────────────────────────────────────────────

/// Thread-safe owner of the sweep currently being collected.
/// Handlers mutate it through `with()`, the SSE stream calls `status()`.
pub struct ResultsCollector {
    inner: Mutex<BenchmarkResults>,
}

// ─── ResultsCollector impl ───────────────────────────────────────

impl ResultsCollector {
    pub fn new(results: BenchmarkResults) -> Self {
        Self {
            inner: Mutex::new(results),
        }
    }

    /// Run `f` with exclusive access to the current sweep.
    pub fn with<R>(&self, f: impl FnOnce(&mut BenchmarkResults) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Discard the current sweep and start a fresh one.
    pub fn replace(&self, results: BenchmarkResults) -> BenchmarkResults {
        std::mem::replace(&mut *self.inner.lock(), results)
    }

    /// Starts a fresh sweep unless a story is in flight; the check and the
    /// swap happen under one lock. Returns the previous sweep, or the name
    /// of the running story.
    pub fn replace_if_idle(
        &self,
        results: BenchmarkResults,
    ) -> std::result::Result<BenchmarkResults, String> {
        let mut current = self.inner.lock();
        if let Some(run) = current.current_run() {
            return Err(run.story().name.clone());
        }
        Ok(std::mem::replace(&mut *current, results))
    }

    pub fn status(&self) -> SweepStatus {
        self.inner.lock().status()
    }

    /// Uploads the sweep's local artifacts without holding the lock across
    /// storage calls: paths are captured, uploaded unlocked, then each
    /// fully uploaded run is rewritten in one step. Returns the bucket, or
    /// `None` when uploads are not configured.
    pub fn upload_artifacts(&self, storage: &dyn ArtifactStorage) -> Result<Option<String>> {
        let Some(plan) = self.inner.lock().plan_artifact_upload()? else {
            return Ok(None);
        };
        let bucket = plan.bucket().to_string();
        let (rewrites, failure) = plan.execute(storage);
        let uploaded = self.inner.lock().apply_artifact_rewrites(rewrites);
        info!(%bucket, uploaded, "uploaded artifacts");
        match failure {
            Some(err) => Err(err),
            None => Ok(Some(bucket)),
        }
    }
}

impl Default for ResultsCollector {
    fn default() -> Self {
        Self::new(BenchmarkResults::new(RunContext::new("")))
    }
}
