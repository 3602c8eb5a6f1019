use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bench_results::artifacts::ArtifactStorage;
use bench_results::results::ArtifactPath;
use bench_results::{BenchmarkResults, Error, RunContext, StorageError, Story, UsageError};
use parking_lot::Mutex;

const REMOTE_ID: &str = "fake_remote_id";

/// Records uploads and hands back a fixed identifier; optionally fails on
/// the n-th call.
#[derive(Default)]
struct MockStorage {
    calls: Mutex<Vec<(String, String, PathBuf)>>,
    fail_on_call: Option<usize>,
}

impl ArtifactStorage for MockStorage {
    fn insert(
        &self,
        bucket: &str,
        remote_name: &str,
        local_path: &Path,
    ) -> Result<String, StorageError> {
        let mut calls = self.calls.lock();
        if self.fail_on_call == Some(calls.len()) {
            return Err(StorageError::Transient("connection reset".into()));
        }
        calls.push((bucket.into(), remote_name.into(), local_path.to_path_buf()));
        Ok(REMOTE_ID.into())
    }
}

fn results(dir: &Path) -> BenchmarkResults {
    BenchmarkResults::new(
        RunContext::new("bench")
            .with_output_dir(dir)
            .with_upload_bucket("abc"),
    )
}

fn run_with_artifacts(r: &mut BenchmarkResults, story: &str, names: &[&str]) {
    let story = Arc::new(Story::new(story));
    r.will_run_page(story.clone()).unwrap();
    for name in names {
        let mut artifact = r.create_artifact(name).unwrap();
        writeln!(artifact, "contents of {name}").unwrap();
    }
    r.did_run_page(&story).unwrap();
}

fn paths(r: &BenchmarkResults) -> Vec<Vec<ArtifactPath>> {
    r.all_page_runs()
        .iter()
        .map(|run| run.iter_artifacts().map(|(_, p)| p.clone()).collect())
        .collect()
}

#[test]
fn artifacts_are_written_and_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let mut r = results(dir.path());
    run_with_artifacts(&mut r, "s", &["screenshot", "log"]);

    let run = &r.all_page_runs()[0];
    let recorded: Vec<(&str, &ArtifactPath)> = run.iter_artifacts().collect();
    assert_eq!(recorded.len(), 2);
    assert_eq!(recorded[0].0, "screenshot");
    let ArtifactPath::Local(path) = recorded[1].1 else {
        panic!("expected local path");
    };
    assert!(path.starts_with(dir.path().join("artifacts")));
    assert_eq!(std::fs::read_to_string(path).unwrap(), "contents of log\n");
}

#[test]
fn artifact_is_recorded_when_the_body_panics() {
    let dir = tempfile::tempdir().unwrap();
    let mut r = results(dir.path());
    let story = Arc::new(Story::new("s"));
    r.will_run_page(story.clone()).unwrap();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut artifact = r.create_artifact("trace").unwrap();
        artifact.write_all(b"partial").unwrap();
        panic!("story crashed mid-write");
    }));
    assert!(outcome.is_err());

    r.did_run_page(&story).unwrap();
    let recorded: Vec<_> = r.all_page_runs()[0].iter_artifacts().collect();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].0, "trace");
}

#[test]
fn artifacts_without_output_dir_are_discarded() {
    let mut r = BenchmarkResults::new(RunContext::new("bench"));
    let story = Arc::new(Story::new("s"));
    r.will_run_page(story.clone()).unwrap();
    {
        let mut artifact = r.create_artifact("log").unwrap();
        assert!(artifact.path().is_none());
        artifact.write_all(b"ignored").unwrap();
    }
    r.did_run_page(&story).unwrap();
    assert_eq!(r.all_page_runs()[0].iter_artifacts().count(), 0);
}

#[test]
fn create_artifact_requires_open_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut r = results(dir.path());
    assert!(matches!(
        r.create_artifact("log").err(),
        Some(Error::Usage(UsageError::NotRunning))
    ));
}

#[test]
fn upload_rewrites_every_path() {
    let dir = tempfile::tempdir().unwrap();
    let mut r = results(dir.path());
    run_with_artifacts(&mut r, "s1", &["screenshot"]);
    run_with_artifacts(&mut r, "s2", &["log"]);

    let storage = MockStorage::default();
    r.upload_artifacts_to_cloud(&storage).unwrap();

    for run_paths in paths(&r) {
        assert_eq!(run_paths, [ArtifactPath::Remote(REMOTE_ID.into())]);
    }
    let calls = storage.calls.lock();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|(bucket, _, _)| bucket == "abc"));
    assert!(calls[0].1.starts_with("screenshot_"));
    assert!(calls[1].1.starts_with("log_"));
}

#[test]
fn failed_upload_leaves_the_failing_run_local() {
    let dir = tempfile::tempdir().unwrap();
    let mut r = results(dir.path());
    run_with_artifacts(&mut r, "s1", &["a"]);
    run_with_artifacts(&mut r, "s2", &["b", "c"]);

    let storage = MockStorage {
        fail_on_call: Some(2),
        ..MockStorage::default()
    };
    let err = r.upload_artifacts_to_cloud(&storage).unwrap_err();
    assert!(matches!(err, Error::Storage(StorageError::Transient(_))));

    let paths = paths(&r);
    assert_eq!(paths[0], [ArtifactPath::Remote(REMOTE_ID.into())]);
    assert!(paths[1].iter().all(ArtifactPath::is_local));
}

#[test]
fn upload_is_refused_while_running() {
    let dir = tempfile::tempdir().unwrap();
    let mut r = results(dir.path());
    r.will_run_page(Arc::new(Story::new("s"))).unwrap();
    let err = r.upload_artifacts_to_cloud(&MockStorage::default()).unwrap_err();
    assert!(matches!(err, Error::Usage(UsageError::UploadWhileRunning)));
}

#[test]
fn upload_without_bucket_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let mut r = BenchmarkResults::new(RunContext::new("bench").with_output_dir(dir.path()));
    run_with_artifacts(&mut r, "s", &["log"]);

    let storage = MockStorage::default();
    r.upload_artifacts_to_cloud(&storage).unwrap();
    assert!(storage.calls.lock().is_empty());
    assert!(paths(&r)[0][0].is_local());
}
