use axum::{
    extract::State,
    http::header,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;

use crate::output::{
    self, ChartJsonFormatter, HistogramSetFormatter, Json3Formatter, OutputFormatter,
    TextSummaryFormatter,
};
use crate::AppState;

use super::AppError;

/// Populates histograms, then renders the current sweep.
fn render(state: &AppState, formatter: &dyn OutputFormatter) -> Result<String, AppError> {
    let body = state.results.with(|r| {
        r.populate_histogram_set();
        output::render(formatter, r)
    })?;
    Ok(body)
}

fn json(body: String) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], body)
}

// ─── GET /api/results/chartjson ──────────────────────────────────

pub async fn chart_json(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    Ok(json(render(&state, &ChartJsonFormatter)?))
}

// ─── GET /api/results/json3 ──────────────────────────────────────

pub async fn json3(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    Ok(json(render(&state, &Json3Formatter)?))
}

// ─── GET /api/results/histograms ─────────────────────────────────

pub async fn histograms(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    Ok(json(render(&state, &HistogramSetFormatter)?))
}

// ─── GET /api/results/summary ────────────────────────────────────

pub async fn summary(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let body = render(&state, &TextSummaryFormatter)?;
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body))
}

// ─── GET /api/results/stream ─────────────────────────────────────
/// Server-Sent Events endpoint.
/// Pushes the sweep status as JSON every 500 ms.

pub async fn status_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let interval = tokio::time::interval(Duration::from_millis(500));

    let stream = IntervalStream::new(interval).map(move |_| {
        let status = state.results.status();
        let json = serde_json::to_string(&status).unwrap_or_default();
        Ok(Event::default().data(json))
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
