use axum::{
    middleware as axum_mw,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::middleware::timing;
use crate::AppState;

/// Builds the full Axum `Router` with all routes and middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // ── Sweep control ───────────────────────────────────────
        .route("/api/sweep/start", post(handlers::sweep::start_sweep))
        .route(
            "/api/sweep/interrupt",
            post(handlers::sweep::interrupt_sweep),
        )
        .route("/api/sweep/status", get(handlers::sweep::sweep_status))
        // ── Story runs ──────────────────────────────────────────
        .route("/api/runs/start", post(handlers::runs::start_run))
        .route("/api/runs/finish", post(handlers::runs::finish_run))
        .route("/api/runs/fail", post(handlers::runs::fail_run))
        .route("/api/runs/skip", post(handlers::runs::skip_run))
        // ── Measurements ────────────────────────────────────────
        .route("/api/values", post(handlers::values::add_value))
        .route(
            "/api/values/summary",
            post(handlers::values::add_summary_value),
        )
        .route("/api/histograms", post(handlers::values::add_histogram))
        .route(
            "/api/histograms/import",
            post(handlers::values::import_histograms),
        )
        .route(
            "/api/histograms/populate",
            post(handlers::values::populate_histograms),
        )
        // ── Artifacts ───────────────────────────────────────────
        .route("/api/artifacts", post(handlers::artifacts::create_artifact))
        .route(
            "/api/artifacts/upload",
            post(handlers::artifacts::upload_artifacts),
        )
        // ── Results ─────────────────────────────────────────────
        .route(
            "/api/results/chartjson",
            get(handlers::results::chart_json),
        )
        .route("/api/results/json3", get(handlers::results::json3))
        .route(
            "/api/results/histograms",
            get(handlers::results::histograms),
        )
        .route("/api/results/summary", get(handlers::results::summary))
        .route(
            "/api/results/stream",
            get(handlers::results::status_stream),
        )
        // ── Provide shared state to all routes above ────────────
        .with_state(state)
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(axum_mw::from_fn(timing::timing_middleware))
        .layer(CorsLayer::permissive())
}
