use std::io::Write;

use super::OutputFormatter;
use crate::error::Result;
use crate::results::BenchmarkResults;

/// Human-readable report: run outcome counts, then one line per histogram
/// with its percentile breakdown.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextSummaryFormatter;

impl OutputFormatter for TextSummaryFormatter {
    fn format(&self, results: &BenchmarkResults, out: &mut dyn Write) -> Result<()> {
        let status = results.status();
        writeln!(
            out,
            "{}: {} runs, {} passed, {} failed, {} skipped{}",
            status.benchmark_name,
            status.runs,
            status.passed,
            status.failed,
            status.skipped,
            if status.interrupted { " (interrupted)" } else { "" },
        )?;

        for story in results.pages_that_failed() {
            writeln!(out, "  FAILED {}", story.name)?;
        }

        for hist in results.histogram_set().iter() {
            let p = hist.percentiles();
            if !p.has_data() {
                writeln!(out, "  {} ({}): no samples", hist.name, hist.unit)?;
                continue;
            }
            writeln!(
                out,
                "  {} ({}): count={} min={:.3} mean={:.3} p50={:.3} p95={:.3} p99={:.3} max={:.3}",
                hist.name, hist.unit, p.count, p.min, p.mean, p.p50, p.p95, p.p99, p.max,
            )?;
        }
        Ok(())
    }

    fn format_disabled(&self, results: &BenchmarkResults, out: &mut dyn Write) -> Result<()> {
        writeln!(out, "{}: disabled", results.context().benchmark_name())?;
        Ok(())
    }
}
