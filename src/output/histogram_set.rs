use std::io::Write;

use super::{write_json_pretty, OutputFormatter};
use crate::error::Result;
use crate::histogram::HistogramDict;
use crate::results::BenchmarkResults;

/// Writes the populated histogram set as a JSON array of dicts.
#[derive(Debug, Default, Clone, Copy)]
pub struct HistogramSetFormatter;

impl OutputFormatter for HistogramSetFormatter {
    fn format(&self, results: &BenchmarkResults, out: &mut dyn Write) -> Result<()> {
        write_json_pretty(out, &results.as_histogram_dicts())
    }

    /// A disabled benchmark has no histograms.
    fn format_disabled(&self, _results: &BenchmarkResults, out: &mut dyn Write) -> Result<()> {
        write_json_pretty::<[HistogramDict]>(out, &[])
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::histogram::HistogramSet;
    use crate::results::RunContext;
    use crate::story::Story;
    use crate::value::{ImprovementDirection, Value};

    #[test]
    fn output_parses_back_into_the_same_set() {
        let story = Arc::new(Story::new("s"));
        let mut results = BenchmarkResults::new(RunContext::new("bench"));
        results.will_run_page(story.clone()).unwrap();
        results
            .add_value(Value::list(
                Some(story.clone()),
                "load",
                "ms",
                vec![1.0, 2.0, 4.0],
                ImprovementDirection::Down,
            ))
            .unwrap();
        results.did_run_page(&story).unwrap();

        let mut out = Vec::new();
        results.print_summary(&HistogramSetFormatter, &mut out).unwrap();

        let mut parsed = HistogramSet::new();
        parsed.import_json(std::str::from_utf8(&out).unwrap()).unwrap();
        assert_eq!(parsed.as_dicts(), results.as_histogram_dicts());
        assert_eq!(parsed.first().unwrap().samples(), [1.0, 2.0, 4.0]);
    }

    #[test]
    fn disabled_is_an_empty_array() {
        let results = BenchmarkResults::new(RunContext::new("bench").disabled());
        let mut out = Vec::new();
        HistogramSetFormatter.format_disabled(&results, &mut out).unwrap();
        assert_eq!(out, b"[]\n");
    }
}
