use std::collections::BTreeMap;
use std::io::Write;

use serde::Serialize;

use super::{write_json_pretty, OutputFormatter};
use crate::error::Result;
use crate::results::BenchmarkResults;
use crate::value::{Value, ValueDict};

const FORMAT_VERSION: &str = "0.1";
const NEXT_VERSION: &str = "0.2";

/// Values organised by chart, then trace.
#[derive(Debug, Clone, Serialize)]
pub struct ChartJson<'a> {
    pub format_version: &'static str,
    pub next_version: &'static str,
    pub benchmark_name: &'a str,
    pub benchmark_description: &'a str,
    pub benchmark_metadata: BenchmarkMetadata<'a>,
    pub charts: BTreeMap<String, BTreeMap<String, ValueDict>>,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkMetadata<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub name: &'a str,
    pub description: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct DisabledChartJson<'a> {
    pub enabled: bool,
    pub benchmark_name: &'a str,
}

/// Maps a `chart.trace` value name onto its chart and trace.
///
/// Per-story values are traced under the story name; a summary value whose
/// name has no trace part is traced under `summary`. A grouping label
/// prefixes the chart as `label@@chart`.
pub fn chart_and_trace_name(value: &Value) -> (String, String) {
    let (chart, trace) = value
        .name
        .split_once('.')
        .unwrap_or((value.name.as_str(), value.name.as_str()));

    let trace = match value.story_name() {
        Some(story) => story.to_string(),
        None if chart == trace => "summary".to_string(),
        None => trace.to_string(),
    };
    let chart = match &value.grouping_label {
        Some(label) => format!("{label}@@{chart}"),
        None => chart.to_string(),
    };
    (chart, trace)
}

/// Builds the chart document from per-story values followed by summary
/// values. A later value overwrites an earlier one with the same chart and
/// trace.
pub fn results_as_chart_dict(results: &BenchmarkResults) -> ChartJson<'_> {
    let mut charts: BTreeMap<String, BTreeMap<String, ValueDict>> = BTreeMap::new();
    for value in results
        .all_page_specific_values()
        .iter()
        .chain(results.all_summary_values())
    {
        let (chart, trace) = chart_and_trace_name(value);
        let mut dict = value.as_dict();
        if let Some(story) = &value.story {
            dict.story_tags = Some(story.tags.iter().cloned().collect());
        }
        charts.entry(chart).or_default().insert(trace, dict);
    }

    let ctx = results.context();
    ChartJson {
        format_version: FORMAT_VERSION,
        next_version: NEXT_VERSION,
        benchmark_name: ctx.benchmark_name(),
        benchmark_description: ctx.benchmark_description(),
        benchmark_metadata: BenchmarkMetadata {
            kind: "telemetry_benchmark",
            name: ctx.benchmark_name(),
            description: ctx.benchmark_description(),
        },
        charts,
        enabled: true,
    }
}

pub fn disabled_results_dict(benchmark_name: &str) -> DisabledChartJson<'_> {
    DisabledChartJson {
        enabled: false,
        benchmark_name,
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ChartJsonFormatter;

impl OutputFormatter for ChartJsonFormatter {
    fn format(&self, results: &BenchmarkResults, out: &mut dyn Write) -> Result<()> {
        write_json_pretty(out, &results_as_chart_dict(results))
    }

    fn format_disabled(&self, results: &BenchmarkResults, out: &mut dyn Write) -> Result<()> {
        write_json_pretty(out, &disabled_results_dict(results.context().benchmark_name()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::results::RunContext;
    use crate::story::Story;
    use crate::value::ImprovementDirection::Up;

    fn story() -> Arc<Story> {
        Arc::new(Story::new("http://www.foo.com/").with_tag("tag1").with_tag("tag2"))
    }

    #[test]
    fn chart_and_trace_for_story_value() {
        let v = Value::scalar(Some(story()), "foo.bar", "seconds", 3.0, Up);
        assert_eq!(
            chart_and_trace_name(&v),
            ("foo".to_string(), "http://www.foo.com/".to_string())
        );
    }

    #[test]
    fn chart_and_trace_for_summary_values() {
        let plain = Value::scalar(None, "foo", "seconds", 3.0, Up);
        assert_eq!(chart_and_trace_name(&plain), ("foo".into(), "summary".into()));
        let dotted = Value::scalar(None, "foo.bar", "seconds", 3.0, Up);
        assert_eq!(chart_and_trace_name(&dotted), ("foo".into(), "bar".into()));
    }

    #[test]
    fn grouping_label_prefixes_chart() {
        let v = Value::scalar(None, "foo.bar", "seconds", 3.0, Up).with_grouping_label("gl");
        assert_eq!(chart_and_trace_name(&v).0, "gl@@foo");
    }

    #[test]
    fn story_values_carry_tags_and_last_write_wins() {
        let s = story();
        let mut results = BenchmarkResults::new(RunContext::new("bench"));
        results.will_run_page(s.clone()).unwrap();
        results.add_value(Value::scalar(Some(s.clone()), "foo", "seconds", 1.0, Up)).unwrap();
        results.add_value(Value::scalar(Some(s.clone()), "foo", "seconds", 2.0, Up)).unwrap();
        results.did_run_page(&s).unwrap();

        let doc = serde_json::to_value(results_as_chart_dict(&results)).unwrap();
        let trace = &doc["charts"]["foo"]["http://www.foo.com/"];
        assert_eq!(trace["value"], 2.0);
        assert_eq!(trace["story_tags"], serde_json::json!(["tag1", "tag2"]));
        assert_eq!(doc["benchmark_metadata"]["type"], "telemetry_benchmark");
        assert_eq!(doc["format_version"], "0.1");
        assert_eq!(doc["enabled"], true);
    }

    #[test]
    fn disabled_document_has_two_keys() {
        let results = BenchmarkResults::new(RunContext::new("benchmark_name").disabled());
        let mut out = Vec::new();
        ChartJsonFormatter.format_disabled(&results, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "{\n  \"enabled\": false,\n  \"benchmark_name\": \"benchmark_name\"\n}\n"
        );
    }
}
