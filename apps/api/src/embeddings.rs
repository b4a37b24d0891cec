//! Embeddings client for OpenAI-compatible `/embeddings` endpoints.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const EMBEDDINGS_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("expected {expected} embeddings, got {got}")]
    CountMismatch { expected: usize, got: usize },

    #[error("embedding dimension {got} does not match configured {expected}")]
    DimensionMismatch { expected: usize, got: usize },
}

impl EmbeddingError {
    /// True for connectivity/availability failures (timeout, refused, 429/5xx).
    pub fn is_unavailable(&self) -> bool {
        match self {
            EmbeddingError::Http(e) => e.is_timeout() || e.is_connect(),
            EmbeddingError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

/// Async embeddings client. One instance is shared through `AppState`;
/// the ingestion path wraps calls in its own bounded retry, the query path
/// calls exactly once.
#[derive(Clone)]
pub struct EmbeddingsClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl EmbeddingsClient {
    pub fn new(base_url: &str, api_key: String, model: String, dimensions: usize) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(EMBEDDINGS_TIMEOUT_SECS))
                .build()
                .expect("Failed to build embeddings HTTP client"),
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            api_key,
            model,
            dimensions,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embeds a batch of texts, returning vectors in input order.
    pub async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            model: &self.model,
            input: inputs,
            dimensions: Some(self.dimensions),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let mut parsed: EmbeddingResponse = response.json().await?;
        parsed.data.sort_by_key(|entry| entry.index);

        if parsed.data.len() != inputs.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: inputs.len(),
                got: parsed.data.len(),
            });
        }
        for entry in &parsed.data {
            if entry.embedding.len() != self.dimensions {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: self.dimensions,
                    got: entry.embedding.len(),
                });
            }
        }

        Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect())
    }

    /// Embeds a single text (the query path).
    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or(EmbeddingError::CountMismatch { expected: 1, got: 0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let client = EmbeddingsClient::new(
            "http://localhost:8081/v1/",
            "key".to_string(),
            "test-model".to_string(),
            64,
        );
        assert_eq!(client.endpoint, "http://localhost:8081/v1/embeddings");
    }

    #[test]
    fn test_response_entries_sort_by_index() {
        let json = r#"{"data": [
            {"embedding": [0.2], "index": 1},
            {"embedding": [0.1], "index": 0}
        ]}"#;
        let mut parsed: EmbeddingResponse = serde_json::from_str(json).unwrap();
        parsed.data.sort_by_key(|entry| entry.index);
        assert_eq!(parsed.data[0].embedding, vec![0.1]);
        assert_eq!(parsed.data[1].embedding, vec![0.2]);
    }

    #[tokio::test]
    async fn test_empty_batch_short_circuits() {
        let client = EmbeddingsClient::new(
            "http://localhost:1",
            "key".to_string(),
            "test-model".to_string(),
            64,
        );
        // No HTTP call happens for an empty batch, so the dead endpoint is fine.
        let vectors = client.embed_batch(&[]).await.unwrap();
        assert!(vectors.is_empty());
    }
}
