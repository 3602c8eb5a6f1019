pub mod context;
pub mod run;
pub mod shared;
pub mod value_store;

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::artifacts::{ArtifactHandle, ArtifactManager, ArtifactStorage, RunRewrites, UploadPlan};
use crate::error::{Result, UsageError};
use crate::histogram::{Diagnostic, Histogram, HistogramDict, HistogramSet};
use crate::output::OutputFormatter;
use crate::story::Story;
use crate::value::Value;

pub use context::RunContext;
pub use run::{ArtifactPath, RunRecord, RunStatus};
pub use shared::ResultsCollector;
pub use value_store::{ValueFilter, ValueStore};

/// Skip reason recorded for runs closed by [`BenchmarkResults::interrupt_benchmark`].
pub const INTERRUPTED_REASON: &str = "benchmark interrupted";

/// The aggregate for one benchmark sweep: every closed run, the values and
/// histograms recorded during the sweep and the run context.
///
/// Lifecycle: `will_run_page` → (`add_*` | `fail` | `skip` | `create_artifact`)*
/// → `did_run_page`, strictly sequential. Misuse is reported as
/// [`UsageError`] and leaves the aggregate unchanged.
#[derive(Debug)]
pub struct BenchmarkResults {
    context: RunContext,
    current_run: Option<RunRecord>,
    all_runs: Vec<RunRecord>,
    values: ValueStore,
    /// Histograms added directly or imported eagerly.
    histograms: HistogramSet,
    /// Imported with `import_immediately = false`; merged on populate.
    pending_histograms: HistogramSet,
    /// Rebuilt from the value store on every populate.
    value_histograms: HistogramSet,
    artifacts: ArtifactManager,
}

/// Point-in-time overview of a sweep.
#[derive(Debug, Clone, Serialize)]
pub struct SweepStatus {
    pub benchmark_name: String,
    pub started_at: DateTime<Utc>,
    pub enabled: bool,
    pub interrupted: bool,
    pub running_story: Option<String>,
    pub runs: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub values: usize,
    pub histograms: usize,
}

impl BenchmarkResults {
    pub fn new(context: RunContext) -> Self {
        let artifacts =
            ArtifactManager::new(context.output_dir(), context.upload_bucket());
        Self {
            context,
            current_run: None,
            all_runs: Vec::new(),
            values: ValueStore::new(),
            histograms: HistogramSet::new(),
            pending_histograms: HistogramSet::new(),
            value_histograms: HistogramSet::new(),
            artifacts,
        }
    }

    /// Installs the acceptance predicate used for values and histograms.
    pub fn with_value_filter(
        mut self,
        filter: impl Fn(&str, bool) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.values = ValueStore::with_filter(Box::new(filter));
        self
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut RunContext {
        &mut self.context
    }

    pub fn is_running(&self) -> bool {
        self.current_run.is_some()
    }

    pub fn current_run(&self) -> Option<&RunRecord> {
        self.current_run.as_ref()
    }

    pub fn all_page_runs(&self) -> &[RunRecord] {
        &self.all_runs
    }

    pub fn values(&self) -> &ValueStore {
        &self.values
    }

    // ── Run lifecycle ───────────────────────────────────────────

    pub fn will_run_page(&mut self, story: Arc<Story>) -> Result<()> {
        if self.context.interrupted() {
            return Err(UsageError::SweepInterrupted.into());
        }
        if let Some(open) = &self.current_run {
            return Err(UsageError::AlreadyRunning {
                open: open.story().name.clone(),
            }
            .into());
        }
        debug!(story = %story.name, "will run story");
        self.context.will_run_story(story.clone());
        self.current_run = Some(RunRecord::start(story));
        Ok(())
    }

    pub fn did_run_page(&mut self, story: &Story) -> Result<()> {
        let open = self.current_run.as_ref().ok_or(UsageError::NotRunning)?;
        if **open.story() != *story {
            return Err(UsageError::StoryMismatch {
                expected: open.story().name.clone(),
                actual: story.name.clone(),
            }
            .into());
        }
        self.close_current_run();
        Ok(())
    }

    fn close_current_run(&mut self) {
        if let Some(mut run) = self.current_run.take() {
            run.finish();
            debug!(
                story = %run.story().name,
                status = %run.status(),
                duration_ms = run.duration().as_millis() as u64,
                "did run story"
            );
            self.all_runs.push(run);
            self.context.did_run_story();
        }
    }

    /// Marks the open run failed. Reasons accumulate.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<()> {
        let run = self.current_run.as_mut().ok_or(UsageError::NotRunning)?;
        let reason = reason.into();
        debug!(story = %run.story().name, %reason, "story failed");
        run.fail(reason);
        Ok(())
    }

    /// Marks the open run failed, capturing `err` and its source chain.
    pub fn fail_with_error(&mut self, err: &dyn std::error::Error) -> Result<()> {
        let mut reason = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            reason.push_str(": ");
            reason.push_str(&cause.to_string());
            source = cause.source();
        }
        self.fail(reason)
    }

    /// Marks the open run as an expected skip.
    pub fn skip(&mut self, reason: impl Into<String>) -> Result<()> {
        self.skip_with_expectation(reason, true)
    }

    pub fn skip_with_expectation(
        &mut self,
        reason: impl Into<String>,
        expected: bool,
    ) -> Result<()> {
        let run = self.current_run.as_mut().ok_or(UsageError::NotRunning)?;
        run.skip(reason.into(), expected);
        Ok(())
    }

    /// Terminates the sweep. `stories` is the full sweep order and
    /// `start_index` the first story not yet reached. An open run is closed
    /// as an interrupted skip and, when it belongs to `stories[start_index]`,
    /// stands in for that story. Every later story, and every earlier story
    /// that never produced a closed run, gets a synthesized interrupted skip
    /// in sweep order.
    pub fn interrupt_benchmark(
        &mut self,
        stories: &[Arc<Story>],
        start_index: usize,
    ) -> Result<()> {
        if self.context.interrupted() {
            return Err(UsageError::SweepInterrupted.into());
        }
        if start_index > stories.len() {
            return Err(UsageError::InterruptIndexOutOfRange {
                index: start_index,
                len: stories.len(),
            }
            .into());
        }

        let mut next = start_index;
        if let Some(run) = self.current_run.as_mut() {
            run.skip(INTERRUPTED_REASON.to_string(), false);
            if stories.get(next).is_some_and(|s| s == run.story()) {
                next += 1;
            }
            self.close_current_run();
        }

        let missing: Vec<Arc<Story>> = stories
            .iter()
            .enumerate()
            .filter(|&(i, story)| {
                if i < start_index {
                    !self.all_runs.iter().any(|r| r.story() == story)
                } else {
                    i >= next
                }
            })
            .map(|(_, story)| story.clone())
            .collect();
        let skipped = missing.len();
        for story in missing {
            let mut run = RunRecord::start(story);
            run.skip(INTERRUPTED_REASON.to_string(), false);
            run.finish();
            self.all_runs.push(run);
        }

        self.context.interrupt();
        warn!(
            skipped,
            total_runs = self.all_runs.len(),
            "benchmark interrupted"
        );
        Ok(())
    }

    // ── Derived queries ─────────────────────────────────────────

    /// Stories with at least one failed run, in first-run order.
    pub fn pages_that_failed(&self) -> Vec<Arc<Story>> {
        unique_stories(self.all_runs.iter().filter(|r| r.failed()))
    }

    /// Stories that ran and never failed (passes and skips).
    pub fn pages_that_succeeded(&self) -> Vec<Arc<Story>> {
        let failed = self.pages_that_failed();
        unique_stories(self.all_runs.iter())
            .into_iter()
            .filter(|s| !failed.contains(s))
            .collect()
    }

    /// Stories that passed at least once and never failed.
    pub fn pages_that_succeeded_and_not_skipped(&self) -> Vec<Arc<Story>> {
        let failed = self.pages_that_failed();
        unique_stories(self.all_runs.iter().filter(|r| r.ok()))
            .into_iter()
            .filter(|s| !failed.contains(s))
            .collect()
    }

    pub fn had_failures(&self) -> bool {
        self.all_runs.iter().any(RunRecord::failed)
    }

    pub fn status(&self) -> SweepStatus {
        let count = |status: RunStatus| self.all_runs.iter().filter(|r| r.status() == status).count();
        SweepStatus {
            benchmark_name: self.context.benchmark_name().to_string(),
            started_at: self.context.benchmark_start(),
            enabled: self.context.enabled(),
            interrupted: self.context.interrupted(),
            running_story: self.current_run.as_ref().map(|r| r.story().name.clone()),
            runs: self.all_runs.len(),
            passed: count(RunStatus::Pass),
            failed: count(RunStatus::Fail),
            skipped: count(RunStatus::Skip),
            values: self.values.len(),
            histograms: self.value_histograms.len()
                + self.histograms.len()
                + self.pending_histograms.len(),
        }
    }

    // ── Values ──────────────────────────────────────────────────

    fn open_run(&self) -> Result<&RunRecord> {
        Ok(self.current_run.as_ref().ok_or(UsageError::NotRunning)?)
    }

    /// True when the open run is the first run of its story.
    fn is_first_result(&self, run: &RunRecord) -> bool {
        !self.all_runs.iter().any(|r| r.story() == run.story())
    }

    /// Records a per-story value against the open run. Values rejected by
    /// the acceptance predicate are dropped silently.
    pub fn add_value(&mut self, value: Value) -> Result<()> {
        ValueStore::check_name(&value)?;
        let run = self.open_run()?;
        let Some(story) = value.story.as_deref() else {
            return Err(UsageError::PageValueWithoutStory { name: value.name }.into());
        };
        if story != &**run.story() {
            return Err(UsageError::StoryMismatch {
                expected: run.story().name.clone(),
                actual: story.name.clone(),
            }
            .into());
        }
        let is_first = self.is_first_result(run);
        let name = value.name.clone();
        if !self.values.add_page_value(value, is_first)? {
            debug!(value = %name, is_first, "value rejected by filter");
        }
        Ok(())
    }

    /// Records a value that belongs to no story. Only valid between runs.
    pub fn add_summary_value(&mut self, value: Value) -> Result<()> {
        ValueStore::check_name(&value)?;
        if self.current_run.is_some() {
            return Err(UsageError::SummaryValueDuringRun.into());
        }
        if value.story.is_some() {
            return Err(UsageError::SummaryValueHasStory { name: value.name }.into());
        }
        self.values.add_summary_value(value)?;
        Ok(())
    }

    pub fn find_page_specific_values_for_page(&self, story: &Story, name: &str) -> Vec<&Value> {
        self.values.find_page_specific_values_for_page(story, name)
    }

    pub fn find_all_page_specific_values_named(&self, name: &str) -> Vec<&Value> {
        self.values.find_all_page_specific_values_named(name)
    }

    pub fn find_values(&self, predicate: impl Fn(&Value) -> bool) -> Vec<&Value> {
        self.values.find_values(predicate)
    }

    pub fn all_page_specific_values(&self) -> &[Value] {
        self.values.all_page_specific_values()
    }

    pub fn all_summary_values(&self) -> &[Value] {
        self.values.all_summary_values()
    }

    // ── Histograms ──────────────────────────────────────────────

    /// Adds a histogram to the open run's scope, tagging it with the
    /// benchmark and story diagnostics. Dropped if the filter rejects its
    /// name.
    pub fn add_histogram(&mut self, mut hist: Histogram) -> Result<()> {
        let run = self.open_run()?;
        if !self.values.accepts(&hist.name, self.is_first_result(run)) {
            debug!(histogram = %hist.name, "histogram rejected by filter");
            return Ok(());
        }
        for (name, diag) in self.context.benchmark_diagnostics() {
            hist.set_diagnostic(name, diag.clone());
        }
        for (name, diag) in context::story_diagnostics(run.story()) {
            hist.set_diagnostic(name, diag);
        }
        self.histograms.add_histogram(hist);
        Ok(())
    }

    /// Imports wire dicts produced elsewhere during the open run. Rejected
    /// names are filtered out; with `import_immediately = false` the
    /// histograms only appear after [`Self::populate_histogram_set`].
    /// Malformed dicts fail the call without importing anything.
    pub fn import_histogram_dicts(
        &mut self,
        dicts: &[HistogramDict],
        import_immediately: bool,
    ) -> Result<()> {
        let run = self.open_run()?;
        let is_first = self.is_first_result(run);

        let mut imported = HistogramSet::new();
        imported.import_dicts(dicts)?;
        imported.filter_histograms(|h| self.values.accepts(&h.name, is_first));

        debug!(count = imported.len(), import_immediately, "imported histogram dicts");
        if import_immediately {
            self.histograms.extend(imported);
        } else {
            self.pending_histograms.extend(imported);
        }
        Ok(())
    }

    pub fn add_shared_diagnostic_to_all_histograms(&mut self, name: &str, diag: Diagnostic) {
        self.histograms.add_shared_diagnostic_to_all_histograms(name, diag);
    }

    /// Builds the histogram set: one histogram per (story, value name),
    /// pending imports merged in, and the benchmark diagnostics attached to
    /// every histogram that does not carry its own. Safe to call repeatedly.
    pub fn populate_histogram_set(&mut self) {
        let pending = std::mem::take(&mut self.pending_histograms);
        self.histograms.extend(pending);

        self.value_histograms = self.histograms_from_values();

        let shared: Vec<(String, Diagnostic)> = self
            .context
            .benchmark_diagnostics()
            .map(|(name, d)| (name.to_string(), d.clone()))
            .collect();
        for hist in self
            .value_histograms
            .iter_mut()
            .chain(self.histograms.iter_mut())
        {
            for (name, diag) in &shared {
                if hist.diagnostic(name).is_none() {
                    hist.set_diagnostic(name.clone(), diag.clone());
                }
            }
        }
        info!(
            histograms = self.value_histograms.len() + self.histograms.len(),
            "populated histogram set"
        );
    }

    fn histograms_from_values(&self) -> HistogramSet {
        let mut order: Vec<Histogram> = Vec::new();
        let mut index: HashMap<(&str, &str), usize> = HashMap::new();
        for value in self.values.all_page_specific_values() {
            let Some(story) = value.story.as_deref() else {
                continue;
            };
            let slot = *index
                .entry((story.name.as_str(), value.name.as_str()))
                .or_insert_with(|| {
                    let mut hist = Histogram::new(value.name.clone(), value.units.clone());
                    hist.description = value.description.clone();
                    for (name, diag) in context::story_diagnostics(story) {
                        hist.set_diagnostic(name, diag);
                    }
                    if let Some(label) = &value.grouping_label {
                        hist.set_diagnostic(
                            crate::histogram::diagnostic::names::GROUPING_LABEL,
                            Diagnostic::generic_set([label.clone()]),
                        );
                    }
                    order.push(hist);
                    order.len() - 1
                });
            for &x in value.payload.samples() {
                order[slot].add_sample(x);
            }
        }

        let mut set = HistogramSet::new();
        for hist in order {
            set.add_histogram(hist);
        }
        set
    }

    /// Snapshot of everything populated so far: value-derived histograms
    /// followed by directly added and eagerly imported ones.
    pub fn histogram_set(&self) -> HistogramSet {
        let mut set = self.value_histograms.clone();
        set.extend(self.histograms.clone());
        set
    }

    pub fn as_histogram_dicts(&self) -> Vec<HistogramDict> {
        self.histogram_set().as_dicts()
    }

    // ── Artifacts ───────────────────────────────────────────────

    /// Opens an artifact scoped to the open run; see [`ArtifactHandle`].
    pub fn create_artifact(&mut self, name: &str) -> Result<ArtifactHandle<'_>> {
        let run = self.current_run.as_mut().ok_or(UsageError::NotRunning)?;
        self.artifacts.open(run, name)
    }

    /// Captures every local artifact of every closed run for upload.
    /// `None` when no upload bucket is configured.
    pub fn plan_artifact_upload(&self) -> Result<Option<UploadPlan>> {
        if self.current_run.is_some() {
            return Err(UsageError::UploadWhileRunning.into());
        }
        let Some(bucket) = self.artifacts.upload_bucket() else {
            debug!("no upload bucket configured; artifacts stay local");
            return Ok(None);
        };
        Ok(Some(ArtifactManager::plan_upload(bucket, &self.all_runs)))
    }

    /// Rewrites the stored paths of each fully uploaded run to its remote
    /// identifiers. Returns the number of paths rewritten.
    pub fn apply_artifact_rewrites(&mut self, rewrites: Vec<RunRewrites>) -> usize {
        rewrites
            .into_iter()
            .map(|run| ArtifactManager::apply_rewrites(&mut self.all_runs, run))
            .sum()
    }

    /// Uploads every local artifact of every closed run and rewrites the
    /// stored paths to remote identifiers. A failure aborts the call;
    /// runs already uploaded keep their remote paths, the failing run keeps
    /// all of its local ones.
    pub fn upload_artifacts_to_cloud(&mut self, storage: &dyn ArtifactStorage) -> Result<()> {
        let Some(plan) = self.plan_artifact_upload()? else {
            return Ok(());
        };
        let bucket = plan.bucket().to_string();
        let (rewrites, failure) = plan.execute(storage);
        let uploaded = self.apply_artifact_rewrites(rewrites);
        info!(%bucket, uploaded, "uploaded artifacts");
        failure.map_or(Ok(()), Err)
    }

    // ── Output ──────────────────────────────────────────────────

    /// Populates the histogram set, then renders through `formatter`,
    /// using the disabled form when the benchmark is disabled.
    pub fn print_summary(
        &mut self,
        formatter: &dyn OutputFormatter,
        out: &mut dyn Write,
    ) -> Result<()> {
        self.populate_histogram_set();
        if self.context.enabled() {
            formatter.format(self, out)
        } else {
            formatter.format_disabled(self, out)
        }
    }
}

fn unique_stories<'a>(runs: impl Iterator<Item = &'a RunRecord>) -> Vec<Arc<Story>> {
    let mut stories: Vec<Arc<Story>> = Vec::new();
    for run in runs {
        if !stories.contains(run.story()) {
            stories.push(run.story().clone());
        }
    }
    stories
}
