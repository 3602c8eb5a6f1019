use std::process::ExitCode;
use std::sync::Arc;

use bench_results::artifacts::{ArtifactStorage, RedisArtifactStorage};
use bench_results::config::Config;
use bench_results::{server, AppState, ResultsCollector};
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let level = if verbose {
        "bench_results=debug"
    } else {
        "bench_results=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();
    init_tracing(config.verbose);

    // ── 1. Artifact storage ──────────────────────────────────────
    let storage: Option<Arc<dyn ArtifactStorage>> = match &config.redis_url {
        Some(url) => {
            let redis = match RedisArtifactStorage::open(url) {
                Ok(redis) => redis,
                Err(e) => {
                    tracing::error!(%url, error = %e, "invalid Redis URL");
                    return ExitCode::FAILURE;
                }
            };
            if let Err(e) = redis.ping().await {
                tracing::error!(%url, error = %e, "cannot reach Redis");
                return ExitCode::FAILURE;
            }
            tracing::info!(%url, "artifact storage connected");
            let redis: Arc<dyn ArtifactStorage> = Arc::new(redis);
            Some(redis)
        }
        None => None,
    };
    if config.upload_bucket.is_some() && storage.is_none() {
        tracing::warn!("upload bucket set without --redis-url; artifacts stay local");
    }

    // ── 2. Build shared state ────────────────────────────────────
    let listen = config.listen.clone();
    let state = Arc::new(AppState {
        config,
        results: Arc::new(ResultsCollector::default()),
        storage,
    });

    // ── 3. Build Axum router ─────────────────────────────────────
    let app = server::create_router(state);

    // ── 4. Bind & serve ──────────────────────────────────────────
    let listener = match tokio::net::TcpListener::bind(&listen).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%listen, error = %e, "failed to bind");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(%listen, "result collector listening");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server exited with error");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
