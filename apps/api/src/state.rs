use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;
use redis::Client as RedisClient;
use sqlx::PgPool;

use crate::config::Config;
use crate::embeddings::EmbeddingsClient;
use crate::llm_client::LlmClient;
use crate::vector::VectorIndex;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Redis holds the best-effort query audit log.
    pub redis: RedisClient,
    pub s3: S3Client,
    pub llm: LlmClient,
    pub embedder: EmbeddingsClient,
    /// Pluggable vector index behind the trait seam. Default: Qdrant over REST.
    pub vector: Arc<dyn VectorIndex>,
    pub config: Config,
}
