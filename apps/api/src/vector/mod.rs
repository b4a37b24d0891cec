//! Vector index boundary.
//!
//! The index stores one point per resume chunk and supports similarity
//! search and delete-by-resume. No native structured filtering is assumed —
//! metadata filters are applied client-side after retrieval.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

pub mod qdrant;

pub use qdrant::QdrantStore;

#[derive(Debug, Error)]
pub enum VectorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("vector dimension {got} does not match collection size {expected}")]
    DimensionMismatch { expected: usize, got: usize },
}

impl VectorError {
    /// True for connectivity/availability failures (timeout, refused, 5xx).
    pub fn is_unavailable(&self) -> bool {
        match self {
            VectorError::Http(e) => e.is_timeout() || e.is_connect(),
            VectorError::BackendResponse { .. } => true,
            _ => false,
        }
    }
}

/// Payload stored alongside each chunk vector. Carries enough provenance for
/// the query path to cite the owning candidate without a database round trip
/// per hit.
#[derive(Debug, Clone)]
pub struct ChunkPoint {
    pub chunk_id: Uuid,
    pub resume_id: Uuid,
    pub candidate_name: Option<String>,
    pub chunk_index: i32,
    pub section: String,
    pub text: String,
}

/// One similarity hit, in the index's native descending-score order.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk_id: String,
    pub resume_id: Uuid,
    pub candidate_name: Option<String>,
    pub section: String,
    pub text: String,
    pub score: f64,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Creates the backing collection if it does not exist.
    async fn ensure_collection(&self) -> Result<(), VectorError>;

    /// Indexes a single chunk; returns the index-side handle.
    /// Chunks are submitted individually so one failure never aborts siblings.
    async fn upsert_chunk(
        &self,
        point: &ChunkPoint,
        embedding: &[f32],
    ) -> Result<String, VectorError>;

    /// Similarity search. Results keep the backend's return order.
    async fn query(&self, embedding: &[f32], top_k: usize)
        -> Result<Vec<ScoredChunk>, VectorError>;

    /// Removes every point belonging to a resume (reindex supersedes).
    async fn delete_document(&self, resume_id: Uuid) -> Result<(), VectorError>;
}
