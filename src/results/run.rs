use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::story::Story;

/// Final outcome of one story run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    Pass,
    Fail,
    Skip,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Skip => "SKIP",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an artifact currently lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactPath {
    Local(PathBuf),
    Remote(String),
}

impl ArtifactPath {
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }
}

impl fmt::Display for ArtifactPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Remote(id) => f.write_str(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SkipInfo {
    reason: String,
    expected: bool,
}

/// One execution of a story. Fields accumulate while the run is open and
/// are read-only once it has been closed.
#[derive(Debug, Clone)]
pub struct RunRecord {
    story: Arc<Story>,
    start_time: DateTime<Utc>,
    started: Instant,
    duration: Duration,
    failures: Vec<String>,
    skip: Option<SkipInfo>,
    artifacts: Vec<(String, Vec<ArtifactPath>)>,
}

impl RunRecord {
    pub(crate) fn start(story: Arc<Story>) -> Self {
        Self {
            story,
            start_time: Utc::now(),
            started: Instant::now(),
            duration: Duration::ZERO,
            failures: Vec::new(),
            skip: None,
            artifacts: Vec::new(),
        }
    }

    pub(crate) fn finish(&mut self) {
        self.duration = self.started.elapsed();
    }

    pub(crate) fn fail(&mut self, reason: String) {
        self.failures.push(reason);
    }

    pub(crate) fn skip(&mut self, reason: String, expected: bool) {
        self.skip = Some(SkipInfo { reason, expected });
    }

    pub(crate) fn add_artifact(&mut self, name: &str, path: ArtifactPath) {
        match self.artifacts.iter_mut().find(|(n, _)| n == name) {
            Some((_, paths)) => paths.push(path),
            None => self.artifacts.push((name.to_string(), vec![path])),
        }
    }

    pub(crate) fn artifacts_mut(&mut self) -> &mut [(String, Vec<ArtifactPath>)] {
        &mut self.artifacts
    }

    pub fn story(&self) -> &Arc<Story> {
        &self.story
    }

    /// Failure dominates skip; a run with neither passes.
    pub fn status(&self) -> RunStatus {
        if !self.failures.is_empty() {
            RunStatus::Fail
        } else if self.skip.is_some() {
            RunStatus::Skip
        } else {
            RunStatus::Pass
        }
    }

    pub fn ok(&self) -> bool {
        self.status() == RunStatus::Pass
    }

    pub fn failed(&self) -> bool {
        self.status() == RunStatus::Fail
    }

    pub fn skipped(&self) -> bool {
        self.status() == RunStatus::Skip
    }

    /// Failures are never expected; skips carry their own expectation.
    pub fn is_expected(&self) -> bool {
        match self.status() {
            RunStatus::Pass => true,
            RunStatus::Fail => false,
            RunStatus::Skip => self.skip.as_ref().map_or(true, |s| s.expected),
        }
    }

    pub fn failure_reasons(&self) -> &[String] {
        &self.failures
    }

    pub fn skip_reason(&self) -> Option<&str> {
        self.skip.as_ref().map(|s| s.reason.as_str())
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// `(name, path)` pairs in the order the artifacts were created.
    pub fn iter_artifacts(&self) -> impl Iterator<Item = (&str, &ArtifactPath)> {
        self.artifacts
            .iter()
            .flat_map(|(name, paths)| paths.iter().map(move |p| (name.as_str(), p)))
    }

    /// Like [`Self::iter_artifacts`], with each path's `(entry, slot)`
    /// position.
    pub(crate) fn iter_artifacts_indexed(
        &self,
    ) -> impl Iterator<Item = (usize, usize, &str, &ArtifactPath)> {
        self.artifacts.iter().enumerate().flat_map(|(entry, (name, paths))| {
            paths
                .iter()
                .enumerate()
                .map(move |(slot, p)| (entry, slot, name.as_str(), p))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run() -> RunRecord {
        RunRecord::start(Arc::new(Story::new("s")))
    }

    #[test]
    fn defaults_to_pass() {
        let mut r = run();
        r.finish();
        assert!(r.ok());
        assert!(r.is_expected());
    }

    #[test]
    fn fail_dominates_skip_in_either_order() {
        let mut a = run();
        a.fail("boom".into());
        a.skip("later".into(), true);
        assert_eq!(a.status(), RunStatus::Fail);

        let mut b = run();
        b.skip("first".into(), true);
        b.fail("boom".into());
        assert_eq!(b.status(), RunStatus::Fail);
        assert!(!b.is_expected());
        assert_eq!(b.skip_reason(), Some("first"));
    }

    #[test]
    fn failure_reasons_accumulate() {
        let mut r = run();
        r.fail("one".into());
        r.fail("two".into());
        assert_eq!(r.failure_reasons(), ["one", "two"]);
    }

    #[test]
    fn unexpected_skip() {
        let mut r = run();
        r.skip("interrupted".into(), false);
        assert!(r.skipped());
        assert!(!r.is_expected());
    }

    #[test]
    fn artifacts_group_by_name_in_order() {
        let mut r = run();
        r.add_artifact("log", ArtifactPath::Local("/a".into()));
        r.add_artifact("shot", ArtifactPath::Local("/b".into()));
        r.add_artifact("log", ArtifactPath::Remote("gs://c".into()));
        let pairs: Vec<(String, String)> = r
            .iter_artifacts()
            .map(|(n, p)| (n.to_string(), p.to_string()))
            .collect();
        assert_eq!(
            pairs,
            [
                ("log".to_string(), "/a".to_string()),
                ("log".to_string(), "gs://c".to_string()),
                ("shot".to_string(), "/b".to_string()),
            ]
        );
    }
}
