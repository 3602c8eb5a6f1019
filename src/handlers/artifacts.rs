use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::Arc;

use crate::AppState;

use super::AppError;

// ─── Request / response types ────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ArtifactRequest {
    pub name: String,
    /// Written verbatim to the artifact file
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ArtifactCreated {
    pub name: String,
    /// `None` when no output directory is configured
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadSummary {
    pub bucket: Option<String>,
    pub uploaded: bool,
}

// ─── POST /api/artifacts ─────────────────────────────────────────

pub async fn create_artifact(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ArtifactRequest>,
) -> Result<Json<ArtifactCreated>, AppError> {
    let path = state.results.with(|r| -> crate::Result<Option<String>> {
        let mut handle = r.create_artifact(&req.name)?;
        let path = handle.path().map(|p| p.display().to_string());
        handle.write_all(req.content.as_bytes())?;
        Ok(path)
    })?;

    Ok(Json(ArtifactCreated {
        name: req.name,
        path,
    }))
}

// ─── POST /api/artifacts/upload ──────────────────────────────────
/// Uploads on a blocking thread; the sweep is only locked to capture paths
/// and to commit rewrites.

pub async fn upload_artifacts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<UploadSummary>, AppError> {
    let Some(storage) = state.storage.clone() else {
        return Err(AppError::BadRequest(
            "no artifact storage configured (set --redis-url)".into(),
        ));
    };

    let results = state.results.clone();
    let bucket = tokio::task::spawn_blocking(move || results.upload_artifacts(storage.as_ref()))
        .await
        .map_err(|e| AppError::Internal(format!("upload task failed: {e}")))??;

    Ok(Json(UploadSummary {
        uploaded: bucket.is_some(),
        bucket,
    }))
}
