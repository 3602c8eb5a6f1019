use axum::{extract::State, Json};
use serde::Deserialize;
use std::sync::Arc;

use crate::config::SweepConfig;
use crate::platform::HostPlatform;
use crate::results::{BenchmarkResults, SweepStatus};
use crate::story::Story;
use crate::AppState;

use super::AppError;

// ─── Request types ───────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct InterruptRequest {
    /// Every story of the sweep, in run order
    pub stories: Vec<Story>,

    /// First story without a finished run
    #[serde(default)]
    pub start_index: usize,
}

// ─── POST /api/sweep/start ───────────────────────────────────────

pub async fn start_sweep(
    State(state): State<Arc<AppState>>,
    Json(sweep): Json<SweepConfig>,
) -> Result<Json<SweepStatus>, AppError> {
    sweep.validate().map_err(AppError::BadRequest)?;

    let mut context = state.config.context_for(&sweep);
    context.attach_platform(&HostPlatform)?;
    let results = BenchmarkResults::new(context);
    let status = results.status();

    // Never discard a sweep with a story in flight
    state
        .results
        .replace_if_idle(results)
        .map_err(|story| AppError::Conflict(format!("story '{story}' is still running")))?;

    tracing::info!(
        benchmark = %sweep.benchmark_name,
        enabled = sweep.enabled,
        "sweep started"
    );
    Ok(Json(status))
}

// ─── POST /api/sweep/interrupt ───────────────────────────────────

pub async fn interrupt_sweep(
    State(state): State<Arc<AppState>>,
    Json(req): Json<InterruptRequest>,
) -> Result<Json<SweepStatus>, AppError> {
    let stories: Vec<Arc<Story>> = req.stories.into_iter().map(Arc::new).collect();
    state
        .results
        .with(|r| r.interrupt_benchmark(&stories, req.start_index))?;
    Ok(Json(state.results.status()))
}

// ─── GET /api/sweep/status ───────────────────────────────────────

pub async fn sweep_status(State(state): State<Arc<AppState>>) -> Json<SweepStatus> {
    Json(state.results.status())
}
