//! JSON Test Results, format version 3.
//!
//! Field order follows the declaration order below, which is kept
//! alphabetical so the document comes out with sorted keys.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::MAIN_SEPARATOR;

use serde::Serialize;

use super::{write_json_pretty, OutputFormatter};
use crate::error::Result;
use crate::results::{ArtifactPath, BenchmarkResults, RunStatus};

const VERSION: u32 = 3;

#[derive(Debug, Clone, Serialize)]
pub struct TestResults {
    pub interrupted: bool,
    pub num_failures_by_type: BTreeMap<&'static str, usize>,
    pub path_delimiter: &'static str,
    pub seconds_since_epoch: f64,
    /// benchmark name → story name → entry
    pub tests: BTreeMap<String, BTreeMap<String, TestEntry>>,
    pub version: u32,
}

/// Every repetition of one story.
#[derive(Debug, Clone, Serialize)]
pub struct TestEntry {
    /// Space-joined statuses, one per repetition.
    pub actual: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub artifacts: BTreeMap<String, Vec<String>>,
    pub expected: String,
    pub is_unexpected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shard: Option<u32>,
    pub time: f64,
    pub times: Vec<f64>,
}

impl TestEntry {
    fn new(status: RunStatus, expected: RunStatus, seconds: f64) -> Self {
        Self {
            actual: status.to_string(),
            artifacts: BTreeMap::new(),
            expected: expected.to_string(),
            is_unexpected: status != expected,
            shard: None,
            time: seconds,
            times: vec![seconds],
        }
    }

    fn add_repetition(&mut self, status: RunStatus, expected: RunStatus, seconds: f64) {
        self.actual.push(' ');
        self.actual.push_str(status.as_str());
        if !self.expected.split(' ').any(|e| e == expected.as_str()) {
            self.expected.push(' ');
            self.expected.push_str(expected.as_str());
        }
        self.is_unexpected |= status != expected;
        self.times.push(seconds);
    }

    /// Re-runs that all passed (or were all skipped) report a single status.
    fn collapse(&mut self) {
        let mut statuses = self.actual.split(' ');
        let Some(first) = statuses.next() else {
            return;
        };
        if (first == "PASS" || first == "SKIP") && statuses.all(|s| s == first) {
            self.actual = first.to_string();
        }
    }
}

fn standard_path(path: &ArtifactPath) -> String {
    match path {
        ArtifactPath::Local(p) => p.to_string_lossy().replace(MAIN_SEPARATOR, "/"),
        ArtifactPath::Remote(id) => id.clone(),
    }
}

pub fn results_as_dict(results: &BenchmarkResults) -> TestResults {
    let ctx = results.context();
    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut stories: BTreeMap<String, TestEntry> = BTreeMap::new();

    for run in results.all_page_runs() {
        let status = run.status();
        let expected = if run.is_expected() { status } else { RunStatus::Pass };
        let seconds = run.duration().as_secs_f64();
        *counts.entry(status.as_str()).or_default() += 1;

        let entry = stories
            .entry(run.story().name.clone())
            .and_modify(|e| e.add_repetition(status, expected, seconds))
            .or_insert_with(|| TestEntry::new(status, expected, seconds));

        for (name, path) in run.iter_artifacts() {
            entry
                .artifacts
                .entry(name.to_string())
                .or_default()
                .push(standard_path(path));
        }
        if run.failed() {
            if let Some(shard) = ctx.shard_index() {
                entry.shard = Some(shard);
            }
        }
    }

    for entry in stories.values_mut() {
        entry.collapse();
    }

    let mut tests = BTreeMap::new();
    if !stories.is_empty() {
        tests.insert(ctx.benchmark_name().to_string(), stories);
    }

    TestResults {
        interrupted: ctx.interrupted(),
        num_failures_by_type: counts,
        path_delimiter: "/",
        seconds_since_epoch: ctx.benchmark_start().timestamp_micros() as f64 / 1e6,
        tests,
        version: VERSION,
    }
}

/// Disabled benchmarks render the same document.
#[derive(Debug, Default, Clone, Copy)]
pub struct Json3Formatter;

impl OutputFormatter for Json3Formatter {
    fn format(&self, results: &BenchmarkResults, out: &mut dyn Write) -> Result<()> {
        write_json_pretty(out, &results_as_dict(results))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::DateTime;

    use super::*;
    use crate::results::RunContext;
    use crate::story::Story;

    fn story(name: &str) -> Arc<Story> {
        Arc::new(Story::new(name))
    }

    fn results() -> BenchmarkResults {
        let start = DateTime::from_timestamp(1_500_000_000, 250_000_000).unwrap();
        BenchmarkResults::new(RunContext::new("benchmark_name").with_start_time(start))
    }

    #[test]
    fn empty_sweep() {
        let doc = serde_json::to_value(results_as_dict(&results())).unwrap();
        assert_eq!(doc["version"], 3);
        assert_eq!(doc["path_delimiter"], "/");
        assert_eq!(doc["interrupted"], false);
        assert_eq!(doc["seconds_since_epoch"], 1_500_000_000.25);
        assert_eq!(doc["tests"], serde_json::json!({}));
        assert_eq!(doc["num_failures_by_type"], serde_json::json!({}));
    }

    #[test]
    fn pass_then_fail_is_flaky() {
        let s = story("foo");
        let mut r = results();
        r.will_run_page(s.clone()).unwrap();
        r.did_run_page(&s).unwrap();
        r.will_run_page(s.clone()).unwrap();
        r.fail("flake").unwrap();
        r.did_run_page(&s).unwrap();

        let doc = results_as_dict(&r);
        let entry = &doc.tests["benchmark_name"]["foo"];
        assert_eq!(entry.actual, "PASS FAIL");
        assert_eq!(entry.expected, "PASS");
        assert!(entry.is_unexpected);
        assert_eq!(entry.times.len(), 2);
        assert_eq!(entry.time, entry.times[0]);
        assert_eq!(doc.num_failures_by_type["PASS"], 1);
        assert_eq!(doc.num_failures_by_type["FAIL"], 1);
    }

    #[test]
    fn repeated_passes_and_skips_collapse() {
        let (a, b) = (story("a"), story("b"));
        let mut r = results();
        for _ in 0..2 {
            r.will_run_page(a.clone()).unwrap();
            r.did_run_page(&a).unwrap();
            r.will_run_page(b.clone()).unwrap();
            r.skip("not today").unwrap();
            r.did_run_page(&b).unwrap();
        }
        let doc = results_as_dict(&r);
        assert_eq!(doc.tests["benchmark_name"]["a"].actual, "PASS");
        assert_eq!(doc.tests["benchmark_name"]["b"].actual, "SKIP");
        assert_eq!(doc.tests["benchmark_name"]["b"].expected, "SKIP");
        assert_eq!(doc.num_failures_by_type["PASS"], 2);
        assert_eq!(doc.num_failures_by_type["SKIP"], 2);
    }

    #[test]
    fn unexpected_skip_expects_pass() {
        let s = story("s");
        let mut r = results();
        r.will_run_page(s.clone()).unwrap();
        r.skip_with_expectation("broken", false).unwrap();
        r.did_run_page(&s).unwrap();
        let entry = &results_as_dict(&r).tests["benchmark_name"]["s"];
        assert_eq!(entry.actual, "SKIP");
        assert_eq!(entry.expected, "PASS");
        assert!(entry.is_unexpected);
    }

    #[test]
    fn shard_index_only_on_failures() {
        let (ok, bad) = (story("ok"), story("bad"));
        let mut r = BenchmarkResults::new(
            RunContext::new("benchmark_name").with_shard_index(Some(7)),
        );
        r.will_run_page(ok.clone()).unwrap();
        r.did_run_page(&ok).unwrap();
        r.will_run_page(bad.clone()).unwrap();
        r.fail("nope").unwrap();
        r.did_run_page(&bad).unwrap();

        let doc = results_as_dict(&r);
        assert_eq!(doc.tests["benchmark_name"]["ok"].shard, None);
        assert_eq!(doc.tests["benchmark_name"]["bad"].shard, Some(7));
    }

    #[test]
    fn keys_are_sorted() {
        let s = story("s");
        let mut r = results();
        r.will_run_page(s.clone()).unwrap();
        r.did_run_page(&s).unwrap();
        let mut out = Vec::new();
        Json3Formatter.format(&r, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let keys: Vec<usize> = [
            "\"interrupted\"",
            "\"num_failures_by_type\"",
            "\"path_delimiter\"",
            "\"seconds_since_epoch\"",
            "\"tests\"",
            "\"version\"",
        ]
        .iter()
        .map(|k| text.find(k).unwrap())
        .collect();
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
        assert!(text.ends_with("}\n"));
    }
}
