use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use bench_results::artifacts::ArtifactStorage;
use bench_results::output::{ChartJsonFormatter, Json3Formatter, OutputFormatter};
use bench_results::{
    BenchmarkResults, ImprovementDirection, RunContext, StorageError, Story, Value,
};
use serde_json::json;

fn print(results: &mut BenchmarkResults, formatter: &dyn OutputFormatter) -> String {
    let mut out = Vec::new();
    results.print_summary(formatter, &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn chart_json_places_story_and_summary_values() {
    let story = Arc::new(Story::new("S"));
    let mut r = BenchmarkResults::new(RunContext::new("bench").with_description("desc"));
    r.will_run_page(story.clone()).unwrap();
    r.add_value(Value::scalar(Some(story.clone()), "a.b", "ms", 1.0, ImprovementDirection::Down))
        .unwrap();
    r.did_run_page(&story).unwrap();
    r.add_summary_value(Value::scalar(None, "a", "ms", 2.0, ImprovementDirection::Down))
        .unwrap();

    let doc: serde_json::Value = serde_json::from_str(&print(&mut r, &ChartJsonFormatter)).unwrap();
    assert_eq!(doc["charts"]["a"]["S"]["value"], 1.0);
    assert_eq!(doc["charts"]["a"]["S"]["story_tags"], json!([]));
    assert_eq!(doc["charts"]["a"]["summary"]["value"], 2.0);
    assert_eq!(
        doc["benchmark_metadata"],
        json!({"type": "telemetry_benchmark", "name": "bench", "description": "desc"})
    );
    assert_eq!(doc["next_version"], "0.2");
}

#[test]
fn disabled_chart_json_is_exact() {
    let mut r = BenchmarkResults::new(RunContext::new("benchmark_name").disabled());
    assert_eq!(
        print(&mut r, &ChartJsonFormatter),
        "{\n  \"enabled\": false,\n  \"benchmark_name\": \"benchmark_name\"\n}\n"
    );
}

#[test]
fn empty_sweep_still_renders() {
    let mut r = BenchmarkResults::new(RunContext::new("bench"));
    let chart: serde_json::Value = serde_json::from_str(&print(&mut r, &ChartJsonFormatter)).unwrap();
    assert_eq!(chart["charts"], json!({}));
    assert_eq!(chart["enabled"], true);

    let json3: serde_json::Value = serde_json::from_str(&print(&mut r, &Json3Formatter)).unwrap();
    assert_eq!(json3["tests"], json!({}));
    assert_eq!(json3["version"], 3);
}

#[test]
fn json3_flaky_story() {
    let story = Arc::new(Story::new("S"));
    let mut r = BenchmarkResults::new(RunContext::new("bench"));
    r.will_run_page(story.clone()).unwrap();
    r.did_run_page(&story).unwrap();
    r.will_run_page(story.clone()).unwrap();
    r.fail("oops").unwrap();
    r.did_run_page(&story).unwrap();

    let doc: serde_json::Value = serde_json::from_str(&print(&mut r, &Json3Formatter)).unwrap();
    let entry = &doc["tests"]["bench"]["S"];
    assert_eq!(entry["actual"], "PASS FAIL");
    assert_eq!(entry["expected"], "PASS");
    assert_eq!(entry["is_unexpected"], true);
    assert_eq!(entry["times"].as_array().unwrap().len(), 2);
    assert!(entry.get("shard").is_none());
    assert_eq!(doc["num_failures_by_type"], json!({"FAIL": 1, "PASS": 1}));
}

#[test]
fn json3_interrupted_sweep() {
    let stories: Vec<Arc<Story>> = ["a", "b"].into_iter().map(|n| Arc::new(Story::new(n))).collect();
    let mut r = BenchmarkResults::new(RunContext::new("bench"));
    r.interrupt_benchmark(&stories, 0).unwrap();

    let doc: serde_json::Value = serde_json::from_str(&print(&mut r, &Json3Formatter)).unwrap();
    assert_eq!(doc["interrupted"], true);
    assert_eq!(doc["tests"]["bench"]["a"]["actual"], "SKIP");
    assert_eq!(doc["tests"]["bench"]["a"]["expected"], "PASS");
    assert_eq!(doc["tests"]["bench"]["a"]["is_unexpected"], true);
    assert_eq!(doc["num_failures_by_type"], json!({"SKIP": 2}));
}

struct FixedStorage;

impl ArtifactStorage for FixedStorage {
    fn insert(
        &self,
        bucket: &str,
        remote_name: &str,
        _local_path: &Path,
    ) -> Result<String, StorageError> {
        Ok(format!("{bucket}/{remote_name}"))
    }
}

#[test]
fn json3_lists_artifacts_by_name() {
    let dir = tempfile::tempdir().unwrap();
    let context = RunContext::new("bench")
        .with_output_dir(dir.path())
        .with_upload_bucket("bucket");
    let mut r = BenchmarkResults::new(context);
    let with_artifacts = Arc::new(Story::new("S"));
    let without = Arc::new(Story::new("T"));

    r.will_run_page(with_artifacts.clone()).unwrap();
    r.create_artifact("log").unwrap().write_all(b"one").unwrap();
    r.create_artifact("screenshot").unwrap().write_all(b"png").unwrap();
    r.create_artifact("log").unwrap().write_all(b"two").unwrap();
    r.did_run_page(&with_artifacts).unwrap();
    run_story(&mut r, &without);

    let doc: serde_json::Value = serde_json::from_str(&print(&mut r, &Json3Formatter)).unwrap();
    let artifacts = &doc["tests"]["bench"]["S"]["artifacts"];
    let logs = artifacts["log"].as_array().unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(artifacts["screenshot"].as_array().unwrap().len(), 1);
    let prefix = dir.path().join("artifacts").to_string_lossy().replace('\\', "/");
    for path in logs.iter().chain(artifacts["screenshot"].as_array().unwrap()) {
        let path = path.as_str().unwrap();
        assert!(!path.contains('\\'));
        assert!(path.starts_with(&prefix), "{path}");
    }
    assert!(doc["tests"]["bench"]["T"].get("artifacts").is_none());

    r.upload_artifacts_to_cloud(&FixedStorage).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&print(&mut r, &Json3Formatter)).unwrap();
    let logs = doc["tests"]["bench"]["S"]["artifacts"]["log"].as_array().unwrap();
    assert_eq!(logs.len(), 2);
    assert!(logs
        .iter()
        .all(|id| id.as_str().unwrap().starts_with("bucket/log_")));
}

fn run_story(r: &mut BenchmarkResults, story: &Arc<Story>) {
    r.will_run_page(story.clone()).unwrap();
    r.did_run_page(story).unwrap();
}
