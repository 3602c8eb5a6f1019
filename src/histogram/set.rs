use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Diagnostic, Histogram};
use crate::error::{Error, Result};

// ─── Wire format ─────────────────────────────────────────────────

/// One element of the histogram-set wire format: either a shared
/// diagnostic (identified by GUID) or a histogram referencing
/// diagnostics by GUID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HistogramDict {
    Diagnostic(DiagnosticDict),
    Histogram(HistogramEntry),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticDict {
    pub guid: String,
    #[serde(flatten)]
    pub diagnostic: Diagnostic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistogramEntry {
    pub name: String,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `[count, max, mean, min, sum, variance]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub running: Option<[f64; 6]>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sample_values: Vec<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub diagnostics: BTreeMap<String, String>,
}

impl HistogramDict {
    pub fn histogram_name(&self) -> Option<&str> {
        match self {
            Self::Histogram(h) => Some(&h.name),
            Self::Diagnostic(_) => None,
        }
    }
}

// ─── HistogramSet ────────────────────────────────────────────────

/// Ordered histograms plus a registry of shared diagnostics. On the wire
/// every diagnostic is stored once and referenced by its content GUID.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistogramSet {
    histograms: Vec<Histogram>,
    shared: BTreeMap<String, Diagnostic>,
}

impl HistogramSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.histograms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histograms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Histogram> {
        self.histograms.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Histogram> {
        self.histograms.iter_mut()
    }

    pub fn first(&self) -> Option<&Histogram> {
        self.histograms.first()
    }

    pub fn get_histograms_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Histogram> + 'a {
        self.histograms.iter().filter(move |h| h.name == name)
    }

    pub fn add_histogram(&mut self, hist: Histogram) {
        self.histograms.push(hist);
    }

    /// Registers `diag` and attaches it under `name` to every histogram
    /// currently in the set.
    pub fn add_shared_diagnostic_to_all_histograms(
        &mut self,
        name: &str,
        diag: Diagnostic,
    ) {
        for hist in &mut self.histograms {
            hist.set_diagnostic(name, diag.clone());
        }
        self.shared.insert(diag.guid(), diag);
    }

    /// Drops every histogram for which `keep` returns false.
    pub fn filter_histograms(&mut self, keep: impl FnMut(&Histogram) -> bool) {
        self.histograms.retain(keep);
    }

    /// Appends another set's histograms and shared diagnostics.
    pub fn extend(&mut self, other: HistogramSet) {
        self.histograms.extend(other.histograms);
        self.shared.extend(other.shared);
    }

    pub fn lookup_diagnostic(&self, guid: &str) -> Option<&Diagnostic> {
        self.shared.get(guid).or_else(|| {
            self.histograms
                .iter()
                .flat_map(|h| h.diagnostics().values())
                .find(|d| d.guid() == guid)
        })
    }

    /// Parses wire dicts. Diagnostics may appear anywhere in the list;
    /// a histogram referencing an unknown GUID is a data error and
    /// nothing is imported.
    pub fn import_dicts(&mut self, dicts: &[HistogramDict]) -> Result<()> {
        let by_guid: BTreeMap<&str, &Diagnostic> = dicts
            .iter()
            .filter_map(|d| match d {
                HistogramDict::Diagnostic(dd) => {
                    Some((dd.guid.as_str(), &dd.diagnostic))
                }
                HistogramDict::Histogram(_) => None,
            })
            .collect();

        let mut imported = Vec::new();
        for dict in dicts {
            if let HistogramDict::Histogram(entry) = dict {
                imported.push(Histogram::from_entry(entry, |guid| {
                    by_guid.get(guid).copied()
                })?);
            }
        }

        for diag in by_guid.values() {
            self.shared.insert(diag.guid(), (*diag).clone());
        }
        self.histograms.extend(imported);
        Ok(())
    }

    pub fn import_json(&mut self, json: &str) -> Result<()> {
        let dicts: Vec<HistogramDict> = serde_json::from_str(json)
            .map_err(|e| Error::histogram_dicts(e.to_string()))?;
        self.import_dicts(&dicts)
    }

    /// Diagnostics first (ordered by GUID, each exactly once), then
    /// histograms in insertion order.
    pub fn as_dicts(&self) -> Vec<HistogramDict> {
        let mut diagnostics = self.shared.clone();
        for hist in &self.histograms {
            for diag in hist.diagnostics().values() {
                diagnostics
                    .entry(diag.guid())
                    .or_insert_with(|| diag.clone());
            }
        }

        let mut dicts: Vec<HistogramDict> = diagnostics
            .into_iter()
            .map(|(guid, diagnostic)| {
                HistogramDict::Diagnostic(DiagnosticDict { guid, diagnostic })
            })
            .collect();
        dicts.extend(
            self.histograms
                .iter()
                .map(|h| HistogramDict::Histogram(h.as_entry())),
        );
        dicts
    }
}
