use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Panics at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub anthropic_api_key: String,
    pub embeddings_endpoint: String,
    pub embeddings_api_key: String,
    pub embeddings_model: String,
    pub embedding_dimensions: usize,
    pub qdrant_url: String,
    pub qdrant_collection: String,
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            embeddings_endpoint: std::env::var("EMBEDDINGS_ENDPOINT")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            embeddings_api_key: require_env("EMBEDDINGS_API_KEY")?,
            embeddings_model: std::env::var("EMBEDDINGS_MODEL")
                .unwrap_or_else(|_| "text-embedding-3-large".to_string()),
            embedding_dimensions: std::env::var("EMBEDDING_DIMENSIONS")
                .unwrap_or_else(|_| "3072".to_string())
                .parse::<usize>()
                .context("EMBEDDING_DIMENSIONS must be a positive integer")?,
            qdrant_url: std::env::var("QDRANT_URL")
                .unwrap_or_else(|_| "http://localhost:6333".to_string()),
            qdrant_collection: std::env::var("QDRANT_COLLECTION")
                .unwrap_or_else(|_| "resume_chunks".to_string()),
            max_upload_bytes: std::env::var("MAX_UPLOAD_BYTES")
                .unwrap_or_else(|_| "10485760".to_string())
                .parse::<usize>()
                .context("MAX_UPLOAD_BYTES must be a positive integer")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
