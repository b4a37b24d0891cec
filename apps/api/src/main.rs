mod answer;
mod audit;
mod config;
mod db;
mod embeddings;
mod errors;
mod ingest;
mod llm_client;
mod models;
mod query;
mod routes;
mod state;
mod vector;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::embeddings::EmbeddingsClient;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::vector::{QdrantStore, VectorIndex};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (panics on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resume search API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize Redis (query audit log)
    let redis = redis::Client::open(config.redis_url.clone())?;
    info!("Redis client initialized");

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized");

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone());
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Initialize embeddings client
    let embedder = EmbeddingsClient::new(
        &config.embeddings_endpoint,
        config.embeddings_api_key.clone(),
        config.embeddings_model.clone(),
        config.embedding_dimensions,
    );
    info!(
        "Embeddings client initialized (model: {}, dims: {})",
        config.embeddings_model, config.embedding_dimensions
    );

    // Initialize vector index
    let vector: Arc<dyn VectorIndex> = Arc::new(QdrantStore::new(
        config.qdrant_url.clone(),
        config.qdrant_collection.clone(),
        config.embedding_dimensions,
    ));
    match vector.ensure_collection().await {
        Ok(()) => info!("Qdrant collection '{}' ready", config.qdrant_collection),
        // The service still starts — indexing and queries will surface the
        // outage as UPSTREAM_UNAVAILABLE until Qdrant comes back.
        Err(e) => warn!("Could not verify Qdrant collection at startup: {e}"),
    }

    // Build app state
    let state = AppState {
        db,
        redis,
        s3,
        llm,
        embedder,
        vector,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "resume-search-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
