use hdrhistogram::Histogram as HdrHistogram;
use serde::Serialize;

/// Samples are recorded into HdrHistogram at this fixed-point scale so
/// fractional units (e.g. 0.25 ms) keep three decimal places.
const SCALE: f64 = 1_000.0;
const SIGFIG: u8 = 3;

/// A percentile breakdown of one histogram's samples.
/// Serialized straight into the summary report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PercentileSet {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
    pub p999: f64,
    pub count: u64,
}

impl PercentileSet {
    /// Build the breakdown from raw samples.
    /// Negative samples are clamped to zero; returns zeroed values if
    /// there are no samples.
    pub fn from_samples(samples: &[f64]) -> Self {
        let mut hist = match HdrHistogram::<u64>::new(SIGFIG) {
            Ok(h) => h,
            Err(_) => return Self::empty(),
        };
        for &x in samples {
            let _ = hist.record(to_fixed(x));
        }
        Self::from_histogram(&hist)
    }

    /// Extract a full percentile set from an HdrHistogram of fixed-point
    /// samples.
    pub fn from_histogram(hist: &HdrHistogram<u64>) -> Self {
        if hist.len() == 0 {
            return Self::empty();
        }

        Self {
            min: from_fixed(hist.min()),
            max: from_fixed(hist.max()),
            mean: hist.mean() / SCALE,
            p50: from_fixed(hist.value_at_percentile(50.0)),
            p95: from_fixed(hist.value_at_percentile(95.0)),
            p99: from_fixed(hist.value_at_percentile(99.0)),
            p999: from_fixed(hist.value_at_percentile(99.9)),
            count: hist.len(),
        }
    }

    /// All-zero placeholder used for histograms without samples.
    pub fn empty() -> Self {
        Self {
            min: 0.0,
            max: 0.0,
            mean: 0.0,
            p50: 0.0,
            p95: 0.0,
            p99: 0.0,
            p999: 0.0,
            count: 0,
        }
    }

    pub fn has_data(&self) -> bool {
        self.count > 0
    }
}

fn to_fixed(x: f64) -> u64 {
    if x.is_finite() && x > 0.0 {
        (x * SCALE).round() as u64
    } else {
        0
    }
}

fn from_fixed(v: u64) -> f64 {
    v as f64 / SCALE
}
