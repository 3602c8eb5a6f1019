use axum::{extract::State, Json};
use serde::Deserialize;
use std::sync::Arc;

use crate::histogram::{Histogram, HistogramDict};
use crate::results::SweepStatus;
use crate::value::{ImprovementDirection, Payload, Value};
use crate::AppState;

use super::AppError;

// ─── Request types ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ValueRequest {
    pub name: String,
    pub units: String,
    /// A number or a list of numbers
    pub value: Payload,
    #[serde(default = "default_direction")]
    pub improvement_direction: ImprovementDirection,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub grouping_label: Option<String>,
}

fn default_direction() -> ImprovementDirection {
    ImprovementDirection::Down
}

impl ValueRequest {
    fn into_value(self, story: Option<Arc<crate::story::Story>>) -> Value {
        let mut value = Value::new(
            story,
            self.name,
            self.units,
            self.value,
            self.improvement_direction,
        );
        if let Some(description) = self.description {
            value = value.with_description(description);
        }
        if let Some(label) = self.grouping_label {
            value = value.with_grouping_label(label);
        }
        value
    }
}

#[derive(Debug, Deserialize)]
pub struct HistogramRequest {
    pub name: String,
    pub unit: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub samples: Vec<f64>,
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub dicts: Vec<HistogramDict>,
    #[serde(default = "default_import_immediately")]
    pub import_immediately: bool,
}

fn default_import_immediately() -> bool {
    true
}

// ─── POST /api/values ────────────────────────────────────────────
/// Records a value for the story that is currently running.

pub async fn add_value(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ValueRequest>,
) -> Result<Json<SweepStatus>, AppError> {
    state.results.with(|r| {
        let story = r.current_run().map(|run| run.story().clone());
        r.add_value(req.into_value(story))
    })?;
    Ok(Json(state.results.status()))
}

// ─── POST /api/values/summary ────────────────────────────────────

pub async fn add_summary_value(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ValueRequest>,
) -> Result<Json<SweepStatus>, AppError> {
    state
        .results
        .with(|r| r.add_summary_value(req.into_value(None)))?;
    Ok(Json(state.results.status()))
}

// ─── POST /api/histograms ────────────────────────────────────────

pub async fn add_histogram(
    State(state): State<Arc<AppState>>,
    Json(req): Json<HistogramRequest>,
) -> Result<Json<SweepStatus>, AppError> {
    let mut hist = Histogram::new(req.name, req.unit);
    hist.description = req.description;
    for x in req.samples {
        hist.add_sample(x);
    }
    state.results.with(|r| r.add_histogram(hist))?;
    Ok(Json(state.results.status()))
}

// ─── POST /api/histograms/import ─────────────────────────────────

pub async fn import_histograms(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ImportRequest>,
) -> Result<Json<SweepStatus>, AppError> {
    state
        .results
        .with(|r| r.import_histogram_dicts(&req.dicts, req.import_immediately))?;
    Ok(Json(state.results.status()))
}

// ─── POST /api/histograms/populate ───────────────────────────────

pub async fn populate_histograms(State(state): State<Arc<AppState>>) -> Json<SweepStatus> {
    state.results.with(|r| r.populate_histogram_set());
    Json(state.results.status())
}
