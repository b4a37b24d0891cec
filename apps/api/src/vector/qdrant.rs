use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::vector::{ChunkPoint, ScoredChunk, VectorError, VectorIndex};

const QDRANT_TIMEOUT_SECS: u64 = 15;

/// Qdrant store over its REST API. Point ids are chunk UUIDs; the payload
/// duplicates the provenance fields the query path needs.
pub struct QdrantStore {
    endpoint: String,
    collection: String,
    client: Client,
    vector_size: usize,
}

impl QdrantStore {
    pub fn new(endpoint: impl Into<String>, collection: impl Into<String>, vector_size: usize) -> Self {
        Self {
            endpoint: endpoint.into(),
            collection: collection.into(),
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(QDRANT_TIMEOUT_SECS))
                .build()
                .expect("Failed to build Qdrant HTTP client"),
            vector_size,
        }
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.endpoint, self.collection)
    }

    fn check_dimensions(&self, embedding: &[f32]) -> Result<(), VectorError> {
        if embedding.len() != self.vector_size {
            return Err(VectorError::DimensionMismatch {
                expected: self.vector_size,
                got: embedding.len(),
            });
        }
        Ok(())
    }
}

fn backend_error(details: impl Into<String>) -> VectorError {
    VectorError::BackendResponse {
        backend: "qdrant".to_string(),
        details: details.into(),
    }
}

#[async_trait]
impl VectorIndex for QdrantStore {
    async fn ensure_collection(&self) -> Result<(), VectorError> {
        let existing = self.client.get(self.collection_url()).send().await?;
        if existing.status().is_success() {
            return Ok(());
        }

        let response = self
            .client
            .put(self.collection_url())
            .json(&json!({
                "vectors": { "size": self.vector_size, "distance": "Cosine" }
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(format!(
                "collection create failed: {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn upsert_chunk(
        &self,
        point: &ChunkPoint,
        embedding: &[f32],
    ) -> Result<String, VectorError> {
        self.check_dimensions(embedding)?;

        let body = json!({
            "points": [{
                "id": point.chunk_id.to_string(),
                "vector": embedding,
                "payload": {
                    "resume_id": point.resume_id.to_string(),
                    "candidate_name": point.candidate_name,
                    "chunk_index": point.chunk_index,
                    "section": point.section,
                    "text": point.text,
                },
            }]
        });

        let response = self
            .client
            .put(format!("{}/points?wait=true", self.collection_url()))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(format!("upsert failed: {}", response.status())));
        }

        Ok(point.chunk_id.to_string())
    }

    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, VectorError> {
        self.check_dimensions(embedding)?;

        let response = self
            .client
            .post(format!("{}/points/search", self.collection_url()))
            .json(&json!({
                "vector": embedding,
                "limit": top_k,
                "with_payload": true,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(format!("search failed: {}", response.status())));
        }

        let parsed: Value = response.json().await?;
        let hits = parsed
            .pointer("/result")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut result = Vec::new();
        for hit in hits {
            let chunk_id = hit
                .pointer("/id")
                .map(|id| match id {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_default();
            let resume_id = hit
                .pointer("/payload/resume_id")
                .and_then(Value::as_str)
                .and_then(|s| Uuid::parse_str(s).ok());
            let resume_id = match resume_id {
                Some(id) => id,
                // A point without a parsable owner can't be filtered or cited.
                None => continue,
            };
            let candidate_name = hit
                .pointer("/payload/candidate_name")
                .and_then(Value::as_str)
                .map(String::from);
            let section = hit
                .pointer("/payload/section")
                .and_then(Value::as_str)
                .unwrap_or("general")
                .to_string();
            let text = hit
                .pointer("/payload/text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let score = hit.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0);

            result.push(ScoredChunk {
                chunk_id,
                resume_id,
                candidate_name,
                section,
                text,
                score,
            });
        }

        Ok(result)
    }

    async fn delete_document(&self, resume_id: Uuid) -> Result<(), VectorError> {
        let response = self
            .client
            .post(format!("{}/points/delete?wait=true", self.collection_url()))
            .json(&json!({
                "filter": {
                    "must": [{
                        "key": "resume_id",
                        "match": { "value": resume_id.to_string() }
                    }]
                }
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(format!("delete failed: {}", response.status())));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_is_rejected_before_any_request() {
        let store = QdrantStore::new("http://localhost:6333", "chunks", 4);
        let err = store.check_dimensions(&[0.0; 3]).unwrap_err();
        assert!(matches!(
            err,
            VectorError::DimensionMismatch { expected: 4, got: 3 }
        ));
    }

    #[test]
    fn test_collection_url_shape() {
        let store = QdrantStore::new("http://localhost:6333", "resume_chunks", 8);
        assert_eq!(
            store.collection_url(),
            "http://localhost:6333/collections/resume_chunks"
        );
    }

    #[test]
    fn test_backend_response_errors_count_as_unavailable() {
        assert!(backend_error("search failed: 502").is_unavailable());
    }
}
