mod config;
mod metrics;

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Serialize;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use config::{AppConfig, GraphBackend};
use extract::{LanguageClient, TextAnalyzer};
use index::{
    GraphIndexer, GraphStats, GremlinClient, InMemoryGraph, IngestionPipeline, PipelineConfig,
    RunReport, TraversalExecutor,
};
use ingest::Blob;
use metrics::{Metrics, MetricsSnapshot, TimedOperation};

#[derive(Clone)]
struct AppState {
    // Held for a whole run so runs never overlap
    pipeline: Arc<Mutex<IngestionPipeline>>,
    // Reads the same graph without waiting on a run
    stats: Arc<GraphIndexer>,
    metrics: Arc<Metrics>,
}

impl AppState {
    fn new(
        analyzer: Arc<dyn TextAnalyzer>,
        executor: Arc<dyn TraversalExecutor>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            pipeline: Arc::new(Mutex::new(IngestionPipeline::new(
                analyzer,
                executor.clone(),
                config,
            ))),
            stats: Arc::new(GraphIndexer::new(executor, *config)),
            metrics: Metrics::new(),
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;

    let executor: Arc<dyn TraversalExecutor> = match &config.graph {
        GraphBackend::Gremlin(graph) => Arc::new(GremlinClient::connect(graph.clone()).await?),
        GraphBackend::InMemory => {
            info!("Using the in-memory graph, nothing will be persisted");
            Arc::new(InMemoryGraph::new())
        }
    };
    let analyzer = Arc::new(LanguageClient::new(config.language.clone()));
    let state = AppState::new(analyzer, executor, &config.pipeline);

    let listener = tokio::net::TcpListener::bind(&config.server_addr).await?;
    info!("Server listening on http://{}", config.server_addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/blobs/*name", post(ingest_blob))
        .route("/stats", get(get_stats))
        .route("/metrics", get(get_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Blob trigger: the request body is the blob content
async fn ingest_blob(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<RunReport>, StatusCode> {
    let blob = Blob::new(name, body.to_vec());
    let documents = ingest::batch_from_blob(&blob).map_err(|e| {
        error!(error = %format!("{e:#}"), "Error");
        StatusCode::BAD_REQUEST
    })?;

    let pipeline = state.pipeline.lock().await;
    let timer = TimedOperation::start();

    match pipeline.run(&documents).await {
        Ok(report) => {
            state.metrics.record_success(timer.elapsed(), &report);
            Ok(Json(report))
        }
        Err(e) => {
            state.metrics.record_failure(timer.elapsed());
            error!(blob = %blob.name, error = %format!("{e:#}"), "Error");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn get_stats(State(state): State<AppState>) -> Result<Json<GraphStats>, StatusCode> {
    let stats = state.stats.get_stats().await.map_err(|e| {
        error!(error = %e, "Failed to read graph stats");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(stats))
}

async fn get_metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
