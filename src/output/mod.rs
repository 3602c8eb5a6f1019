//! Renderers that turn a [`BenchmarkResults`] aggregate into documents.
//!
//! Formatters never mutate the aggregate; call
//! [`BenchmarkResults::print_summary`] to populate histograms first.

pub mod chart_json;
pub mod histogram_set;
pub mod json3;
pub mod summary;

use std::io::Write;

use serde::Serialize;

use crate::error::Result;
use crate::results::BenchmarkResults;

pub use chart_json::ChartJsonFormatter;
pub use histogram_set::HistogramSetFormatter;
pub use json3::Json3Formatter;
pub use summary::TextSummaryFormatter;

pub trait OutputFormatter: Send + Sync {
    fn format(&self, results: &BenchmarkResults, out: &mut dyn Write) -> Result<()>;

    /// Output for a benchmark that was disabled before it ran.
    fn format_disabled(&self, results: &BenchmarkResults, out: &mut dyn Write) -> Result<()> {
        self.format(results, out)
    }
}

/// Two-space indented JSON followed by a newline.
pub(crate) fn write_json_pretty<T: Serialize + ?Sized>(out: &mut dyn Write, doc: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, doc)?;
    out.write_all(b"\n")?;
    Ok(())
}

/// Renders into a `String`; convenient for HTTP handlers.
pub fn render(
    formatter: &dyn OutputFormatter,
    results: &BenchmarkResults,
) -> Result<String> {
    let mut buf = Vec::new();
    if results.context().enabled() {
        formatter.format(results, &mut buf)?;
    } else {
        formatter.format_disabled(results, &mut buf)?;
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
