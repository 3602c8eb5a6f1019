use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::histogram::diagnostic::names;
use crate::histogram::Diagnostic;
use crate::platform::Platform;
use crate::story::Story;

/// State that lives for one benchmark invocation: identity, output
/// locations, the story currently running and the benchmark-level
/// diagnostics derived from all of it.
#[derive(Debug, Clone)]
pub struct RunContext {
    benchmark_name: String,
    benchmark_description: String,
    results_label: Option<String>,
    output_dir: Option<PathBuf>,
    upload_bucket: Option<String>,
    shard_index: Option<u32>,
    benchmark_start: DateTime<Utc>,
    enabled: bool,
    interrupted: bool,
    current_story: Option<Arc<Story>>,
    stories_seen: Vec<String>,
    trace_local_path: Option<PathBuf>,
    device_facts: BTreeMap<String, Diagnostic>,
    diagnostics: BTreeMap<String, Diagnostic>,
}

impl RunContext {
    pub fn new(benchmark_name: impl Into<String>) -> Self {
        let mut ctx = Self {
            benchmark_name: benchmark_name.into(),
            benchmark_description: String::new(),
            results_label: None,
            output_dir: None,
            upload_bucket: None,
            shard_index: None,
            benchmark_start: Utc::now(),
            enabled: true,
            interrupted: false,
            current_story: None,
            stories_seen: Vec::new(),
            trace_local_path: None,
            device_facts: BTreeMap::new(),
            diagnostics: BTreeMap::new(),
        };
        ctx.rebuild_diagnostics();
        ctx
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.benchmark_description = description.into();
        self.rebuild_diagnostics();
        self
    }

    pub fn with_results_label(mut self, label: impl Into<String>) -> Self {
        self.results_label = Some(label.into());
        self.rebuild_diagnostics();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn with_upload_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.upload_bucket = Some(bucket.into());
        self
    }

    pub fn with_shard_index(mut self, shard: Option<u32>) -> Self {
        self.shard_index = shard;
        self
    }

    pub fn with_start_time(mut self, start: DateTime<Utc>) -> Self {
        self.benchmark_start = start;
        self.rebuild_diagnostics();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Records the device facts the platform supports. A supported query
    /// that fails aborts the whole attach.
    pub fn attach_platform(&mut self, platform: &dyn Platform) -> Result<()> {
        let mut facts = BTreeMap::new();
        if let Some(os) = platform.os_name()?.supported() {
            facts.insert(names::OS_NAMES.to_string(), Diagnostic::generic_set([os]));
        }
        if let Some(version) = platform.os_version_name()?.supported() {
            facts.insert(
                names::OS_VERSIONS.to_string(),
                Diagnostic::generic_set([version]),
            );
        }
        self.device_facts = facts;
        self.rebuild_diagnostics();
        Ok(())
    }

    // ── Accessors ───────────────────────────────────────────────

    pub fn benchmark_name(&self) -> &str {
        &self.benchmark_name
    }

    pub fn benchmark_description(&self) -> &str {
        &self.benchmark_description
    }

    pub fn results_label(&self) -> Option<&str> {
        self.results_label.as_deref()
    }

    pub fn output_dir(&self) -> Option<&Path> {
        self.output_dir.as_deref()
    }

    pub fn upload_bucket(&self) -> Option<&str> {
        self.upload_bucket.as_deref()
    }

    pub fn shard_index(&self) -> Option<u32> {
        self.shard_index
    }

    pub fn benchmark_start(&self) -> DateTime<Utc> {
        self.benchmark_start
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn interrupted(&self) -> bool {
        self.interrupted
    }

    pub fn current_story(&self) -> Option<&Arc<Story>> {
        self.current_story.as_ref()
    }

    pub fn trace_local_path(&self) -> Option<&Path> {
        self.trace_local_path.as_deref()
    }

    /// Benchmark identity, start, description, labels, every story seen so
    /// far and any device facts.
    pub fn diagnostics(&self) -> &BTreeMap<String, Diagnostic> {
        &self.diagnostics
    }

    /// The diagnostics shared by every histogram of the sweep (all but
    /// the story set).
    pub fn benchmark_diagnostics(&self) -> impl Iterator<Item = (&str, &Diagnostic)> {
        self.diagnostics
            .iter()
            .filter(|(name, _)| name.as_str() != names::STORIES)
            .map(|(name, d)| (name.as_str(), d))
    }

    // ── Lifecycle hooks ─────────────────────────────────────────

    pub(crate) fn will_run_story(&mut self, story: Arc<Story>) {
        if !self.stories_seen.contains(&story.name) {
            self.stories_seen.push(story.name.clone());
        }
        self.trace_local_path = self.output_dir.as_ref().map(|dir| {
            let mut file = format!(
                "{}_{}",
                story.file_safe_name(),
                Utc::now().format("%Y-%m-%d_%H-%M-%S")
            );
            if let Some(label) = &self.results_label {
                file.push('_');
                file.push_str(label);
            }
            file.push_str(".html");
            dir.join(file)
        });
        self.current_story = Some(story);
        self.rebuild_diagnostics();
    }

    pub(crate) fn did_run_story(&mut self) {
        self.current_story = None;
    }

    pub(crate) fn interrupt(&mut self) {
        self.interrupted = true;
    }

    fn rebuild_diagnostics(&mut self) {
        let mut diags = self.device_facts.clone();
        diags.insert(
            names::BENCHMARKS.to_string(),
            Diagnostic::generic_set([self.benchmark_name.clone()]),
        );
        diags.insert(
            names::BENCHMARK_START.to_string(),
            Diagnostic::date(self.benchmark_start),
        );
        diags.insert(
            names::BENCHMARK_DESCRIPTIONS.to_string(),
            Diagnostic::generic_set([self.benchmark_description.clone()]),
        );
        diags.insert(
            names::LABELS.to_string(),
            Diagnostic::generic_set(self.results_label.iter().cloned()),
        );
        diags.insert(
            names::STORIES.to_string(),
            Diagnostic::generic_set(self.stories_seen.iter().cloned()),
        );
        self.diagnostics = diags;
    }
}

/// Diagnostics describing a single story.
pub(crate) fn story_diagnostics(story: &Story) -> Vec<(&'static str, Diagnostic)> {
    let mut diags = vec![(names::STORIES, Diagnostic::generic_set([story.name.clone()]))];
    if !story.tags.is_empty() {
        diags.push((
            names::STORY_TAGS,
            Diagnostic::generic_set(story.tags.iter().cloned()),
        ));
    }
    if let Some(label) = story.grouping_label() {
        diags.push((names::GROUPING_LABEL, Diagnostic::generic_set([label])));
    }
    diags
}
