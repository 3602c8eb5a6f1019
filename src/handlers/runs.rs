use axum::{extract::State, Json};
use serde::Deserialize;
use std::sync::Arc;

use crate::results::SweepStatus;
use crate::story::Story;
use crate::AppState;

use super::AppError;

// ─── Request types ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct FailRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct SkipRequest {
    pub reason: String,

    /// Unexpected skips are reported as regressions
    #[serde(default = "default_expected")]
    pub expected: bool,
}

fn default_expected() -> bool {
    true
}

// ─── POST /api/runs/start ────────────────────────────────────────

pub async fn start_run(
    State(state): State<Arc<AppState>>,
    Json(story): Json<Story>,
) -> Result<Json<SweepStatus>, AppError> {
    state.results.with(|r| r.will_run_page(Arc::new(story)))?;
    Ok(Json(state.results.status()))
}

// ─── POST /api/runs/finish ───────────────────────────────────────

pub async fn finish_run(
    State(state): State<Arc<AppState>>,
    Json(story): Json<Story>,
) -> Result<Json<SweepStatus>, AppError> {
    state.results.with(|r| r.did_run_page(&story))?;
    Ok(Json(state.results.status()))
}

// ─── POST /api/runs/fail ─────────────────────────────────────────

pub async fn fail_run(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FailRequest>,
) -> Result<Json<SweepStatus>, AppError> {
    state.results.with(|r| r.fail(req.reason))?;
    Ok(Json(state.results.status()))
}

// ─── POST /api/runs/skip ─────────────────────────────────────────

pub async fn skip_run(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SkipRequest>,
) -> Result<Json<SweepStatus>, AppError> {
    state
        .results
        .with(|r| r.skip_with_expectation(req.reason, req.expected))?;
    Ok(Json(state.results.status()))
}
