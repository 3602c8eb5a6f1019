pub mod diagnostic;
pub mod percentiles;
pub mod set;

use std::collections::BTreeMap;

pub use diagnostic::Diagnostic;
pub use percentiles::PercentileSet;
pub use set::{DiagnosticDict, HistogramDict, HistogramEntry, HistogramSet};

// ─── Running statistics ──────────────────────────────────────────

/// Streaming count/min/max/mean/variance over every sample seen.
/// `variance` is the sample variance (n - 1 denominator).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunningStatistics {
    pub count: u64,
    pub max: f64,
    pub mean: f64,
    pub min: f64,
    pub sum: f64,
    pub variance: f64,
}

impl RunningStatistics {
    fn first(x: f64) -> Self {
        Self {
            count: 1,
            max: x,
            mean: x,
            min: x,
            sum: x,
            variance: 0.0,
        }
    }

    fn m2(&self) -> f64 {
        if self.count > 1 {
            self.variance * (self.count - 1) as f64
        } else {
            0.0
        }
    }

    fn add(&mut self, x: f64) {
        let m2 = self.m2();
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        let m2 = m2 + delta * (x - self.mean);
        self.variance = m2 / (self.count - 1) as f64;
        self.sum += x;
        self.min = self.min.min(x);
        self.max = self.max.max(x);
    }

    /// Chan et al. parallel combination.
    fn merge(&mut self, other: &Self) {
        let n = (self.count + other.count) as f64;
        let delta = other.mean - self.mean;
        let m2 = self.m2()
            + other.m2()
            + delta * delta * (self.count as f64) * (other.count as f64) / n;
        self.mean += delta * other.count as f64 / n;
        self.count += other.count;
        self.variance = if self.count > 1 {
            m2 / (self.count - 1) as f64
        } else {
            0.0
        };
        self.sum += other.sum;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// `[count, max, mean, min, sum, variance]`
    fn to_array(self) -> [f64; 6] {
        [
            self.count as f64,
            self.max,
            self.mean,
            self.min,
            self.sum,
            self.variance,
        ]
    }

    /// `None` for an empty aggregate, which carries no usable mean.
    fn from_array(a: [f64; 6]) -> Option<Self> {
        let count = a[0] as u64;
        if count == 0 {
            return None;
        }
        Some(Self {
            count,
            max: a[1],
            mean: a[2],
            min: a[3],
            sum: a[4],
            variance: a[5],
        })
    }
}

// ─── Histogram ───────────────────────────────────────────────────

/// A named statistical aggregate plus its diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub name: String,
    pub unit: String,
    pub description: Option<String>,
    samples: Vec<f64>,
    running: Option<RunningStatistics>,
    diagnostics: BTreeMap<String, Diagnostic>,
}

impl Histogram {
    pub fn new(name: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            description: None,
            samples: Vec::new(),
            running: None,
            diagnostics: BTreeMap::new(),
        }
    }

    pub fn add_sample(&mut self, x: f64) {
        self.samples.push(x);
        match &mut self.running {
            Some(r) => r.add(x),
            None => self.running = Some(RunningStatistics::first(x)),
        }
    }

    /// Folds another histogram's samples into this one. Diagnostics of
    /// `other` are only taken where this histogram has none of that name.
    pub fn merge(&mut self, other: &Histogram) {
        self.samples.extend_from_slice(&other.samples);
        match (&mut self.running, &other.running) {
            (Some(mine), Some(theirs)) => mine.merge(theirs),
            (None, Some(theirs)) => self.running = Some(*theirs),
            _ => {}
        }
        for (name, diag) in &other.diagnostics {
            self.diagnostics
                .entry(name.clone())
                .or_insert_with(|| diag.clone());
        }
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn running(&self) -> Option<&RunningStatistics> {
        self.running.as_ref()
    }

    pub fn num_values(&self) -> u64 {
        self.running.map(|r| r.count).unwrap_or(0)
    }

    pub fn average(&self) -> Option<f64> {
        self.running.map(|r| r.mean)
    }

    pub fn diagnostics(&self) -> &BTreeMap<String, Diagnostic> {
        &self.diagnostics
    }

    pub fn diagnostic(&self, name: &str) -> Option<&Diagnostic> {
        self.diagnostics.get(name)
    }

    pub fn set_diagnostic(&mut self, name: impl Into<String>, diag: Diagnostic) {
        self.diagnostics.insert(name.into(), diag);
    }

    pub fn percentiles(&self) -> PercentileSet {
        PercentileSet::from_samples(&self.samples)
    }

    pub(crate) fn as_entry(&self) -> HistogramEntry {
        HistogramEntry {
            name: self.name.clone(),
            unit: self.unit.clone(),
            description: self.description.clone(),
            running: self.running.map(RunningStatistics::to_array),
            sample_values: self.samples.clone(),
            diagnostics: self
                .diagnostics
                .iter()
                .map(|(name, d)| (name.clone(), d.guid()))
                .collect(),
        }
    }

    /// Rebuilds a histogram from its wire entry, resolving diagnostic GUIDs
    /// through `lookup`.
    pub(crate) fn from_entry<'a>(
        entry: &HistogramEntry,
        lookup: impl Fn(&str) -> Option<&'a Diagnostic>,
    ) -> crate::Result<Self> {
        let mut diagnostics = BTreeMap::new();
        for (name, guid) in &entry.diagnostics {
            let diag = lookup(guid).ok_or_else(|| {
                crate::Error::histogram_dicts(format!(
                    "histogram '{}' references unknown diagnostic {guid}",
                    entry.name
                ))
            })?;
            diagnostics.insert(name.clone(), diag.clone());
        }
        Ok(Self {
            name: entry.name.clone(),
            unit: entry.unit.clone(),
            description: entry.description.clone(),
            samples: entry.sample_values.clone(),
            running: entry.running.and_then(RunningStatistics::from_array),
            diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn empty_imported_statistics_restart_on_next_sample() {
        let entry = HistogramEntry {
            name: "a".into(),
            unit: "ms".into(),
            description: None,
            running: Some([0.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
            sample_values: Vec::new(),
            diagnostics: BTreeMap::new(),
        };
        let mut h = Histogram::from_entry(&entry, |_| None).unwrap();
        assert!(h.running().is_none());

        h.add_sample(3.0);
        h.add_sample(5.0);
        let r = h.running().unwrap();
        assert_eq!(r.count, 2);
        assert!(close(r.mean, 4.0));
        assert!(close(r.variance, 2.0));
    }

    #[test]
    fn running_statistics_track_samples() {
        let mut h = Histogram::new("a", "ms");
        for x in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            h.add_sample(x);
        }
        let r = h.running().unwrap();
        assert_eq!(r.count, 8);
        assert_eq!(r.min, 2.0);
        assert_eq!(r.max, 9.0);
        assert!(close(r.mean, 5.0));
        assert!(close(r.sum, 40.0));
        assert!(close(r.variance, 32.0 / 7.0));
    }

    #[test]
    fn merge_matches_sequential_adds() {
        let mut left = Histogram::new("a", "ms");
        let mut right = Histogram::new("a", "ms");
        let mut all = Histogram::new("a", "ms");
        for x in [1.0, 3.0, 8.0] {
            left.add_sample(x);
            all.add_sample(x);
        }
        for x in [2.0, 10.0] {
            right.add_sample(x);
            all.add_sample(x);
        }
        left.merge(&right);
        let (m, a) = (left.running().unwrap(), all.running().unwrap());
        assert_eq!(m.count, a.count);
        assert!(close(m.mean, a.mean));
        assert!(close(m.variance, a.variance));
        assert_eq!(left.samples().len(), 5);
    }

    #[test]
    fn empty_histogram_has_no_running_stats() {
        let h = Histogram::new("foo", "count");
        assert!(h.running().is_none());
        assert_eq!(h.num_values(), 0);
        assert!(h.as_entry().running.is_none());
    }
}
