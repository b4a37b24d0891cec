//! Resume processing pipeline — runs once per ingested document.
//!
//! Flow: fetch row → download blob → extract text → profile (best-effort) →
//!       normalize + chunk → supersede prior chunk set → persist chunks →
//!       embed → concurrent per-chunk upserts → join barrier → status update.
//!
//! Status FSM: raw → parsed → chunked → indexed, `failed` from any stage.
//! `is_indexed` flips true only when every chunk of the document reports a
//! successful upsert. Per-chunk indexing failures are recorded and retried
//! within a small bound; they never abort sibling chunks.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::ingest::chunking::{chunk_resume_text, normalize_text, TextChunk};
use crate::ingest::extract::extract_text;
use crate::ingest::profile::{extract_profile, CandidateProfile};
use crate::models::resume::{ResumeRow, ResumeStatus};
use crate::state::AppState;
use crate::vector::{ChunkPoint, VectorError, VectorIndex};

const MAX_INDEX_ATTEMPTS: u32 = 3;
const INDEX_RETRY_BASE_MS: u64 = 500;

/// Entry point for spawned processing jobs. Never propagates — failures are
/// recorded on the resume row so the client sees them via status polling.
pub async fn process_resume(state: AppState, resume_id: Uuid) {
    info!("Processing resume {resume_id}");
    match run_pipeline(&state, resume_id).await {
        Ok(()) => info!("Resume {resume_id} processing finished"),
        Err(e) => {
            error!("Resume {resume_id} processing failed: {e}");
            if let Err(db_err) = mark_failed(&state.db, resume_id, &e.to_string()).await {
                error!("Could not record failure for resume {resume_id}: {db_err}");
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

async fn run_pipeline(state: &AppState, resume_id: Uuid) -> Result<(), AppError> {
    let resume = fetch_resume(&state.db, resume_id).await?;
    let bytes = download_blob(state, &resume.s3_key).await?;

    let raw_text = match extract_text(&bytes, &resume.file_type) {
        Ok(text) => text,
        Err(e) => {
            // Malformed document: terminal for this resume, not for the corpus.
            warn!("Resume {resume_id} could not be parsed: {e}");
            mark_failed(&state.db, resume_id, &e.to_string()).await?;
            return Ok(());
        }
    };

    // Metadata extraction is best-effort; a failed call leaves all fields null.
    let profile = match extract_profile(&raw_text, &state.llm).await {
        Ok(profile) => profile,
        Err(e) => {
            warn!("Profile extraction failed for resume {resume_id}: {e}");
            CandidateProfile::default()
        }
    };
    store_profile(&state.db, resume_id, &profile).await?;

    let normalized = normalize_text(&raw_text);
    let chunks = chunk_resume_text(&normalized);

    // Reindexing supersedes the prior chunk set. Vectors are removed first so
    // a crash between the two deletes cannot leave orphan points that the
    // query path would still surface.
    state
        .vector
        .delete_document(resume_id)
        .await
        .map_err(|e| AppError::Upstream {
            service: "vector index",
            detail: e.to_string(),
        })?;
    sqlx::query("DELETE FROM resume_chunks WHERE resume_id = $1")
        .bind(resume_id)
        .execute(&state.db)
        .await?;

    if chunks.is_empty() {
        // Processed but nothing to index — a distinguishable terminal state.
        sqlx::query(
            "UPDATE resumes SET status = $1, chunks_count = 0, is_indexed = FALSE, \
             processed_at = NOW() WHERE id = $2",
        )
        .bind(ResumeStatus::Chunked.as_str())
        .bind(resume_id)
        .execute(&state.db)
        .await?;
        info!("Resume {resume_id} has no indexable text");
        return Ok(());
    }

    // Ordinals are assigned here, before any indexing call is dispatched —
    // never inferred from completion order.
    let stored = store_chunks(&state.db, resume_id, &chunks).await?;
    sqlx::query("UPDATE resumes SET status = $1, chunks_count = $2 WHERE id = $3")
        .bind(ResumeStatus::Chunked.as_str())
        .bind(stored.len() as i32)
        .bind(resume_id)
        .execute(&state.db)
        .await?;

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let embeddings = match embed_with_retry(state, &texts).await {
        Ok(embeddings) => embeddings,
        Err(e) => {
            warn!("Embedding failed for resume {resume_id}: {e}");
            sqlx::query(
                "UPDATE resumes SET processing_error = $1, processed_at = NOW() WHERE id = $2",
            )
            .bind(format!("embedding service unavailable: {e}"))
            .bind(resume_id)
            .execute(&state.db)
            .await?;
            return Ok(());
        }
    };

    let candidate_name = profile.name.clone().or(resume.candidate_name);
    let total = stored.len();
    let failures = index_chunks(state, resume_id, candidate_name, stored, embeddings).await?;

    if failures == 0 {
        sqlx::query(
            "UPDATE resumes SET status = $1, is_indexed = TRUE, processing_error = NULL, \
             processed_at = NOW() WHERE id = $2",
        )
        .bind(ResumeStatus::Indexed.as_str())
        .bind(resume_id)
        .execute(&state.db)
        .await?;
        info!("Resume {resume_id} fully indexed ({total} chunks)");
    } else {
        sqlx::query(
            "UPDATE resumes SET processing_error = $1, processed_at = NOW() WHERE id = $2",
        )
        .bind(format!("{failures} of {total} chunks failed indexing"))
        .bind(resume_id)
        .execute(&state.db)
        .await?;
        warn!("Resume {resume_id}: {failures} of {total} chunks failed indexing");
    }

    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Concurrent chunk indexing
// ────────────────────────────────────────────────────────────────────────────

struct StoredChunk {
    id: Uuid,
    chunk_index: i32,
    section: String,
    text: String,
}

/// Upserts every chunk concurrently and waits for all of them (the join
/// barrier). Returns the number of chunks that exhausted their retries.
async fn index_chunks(
    state: &AppState,
    resume_id: Uuid,
    candidate_name: Option<String>,
    stored: Vec<StoredChunk>,
    embeddings: Vec<Vec<f32>>,
) -> Result<usize, AppError> {
    let mut join_set = JoinSet::new();
    for (chunk, embedding) in stored.into_iter().zip(embeddings) {
        let vector = Arc::clone(&state.vector);
        let point = ChunkPoint {
            chunk_id: chunk.id,
            resume_id,
            candidate_name: candidate_name.clone(),
            chunk_index: chunk.chunk_index,
            section: chunk.section,
            text: chunk.text,
        };
        join_set.spawn(async move {
            let outcome = upsert_with_retry(vector.as_ref(), &point, &embedding).await;
            (point.chunk_id, outcome)
        });
    }

    let mut failures = 0usize;
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((chunk_id, Ok(vector_id))) => {
                sqlx::query("UPDATE resume_chunks SET vector_id = $1 WHERE id = $2")
                    .bind(&vector_id)
                    .bind(chunk_id)
                    .execute(&state.db)
                    .await?;
            }
            Ok((chunk_id, Err(e))) => {
                warn!("Chunk {chunk_id} failed indexing after {MAX_INDEX_ATTEMPTS} attempts: {e}");
                failures += 1;
            }
            Err(join_err) => {
                warn!("Chunk indexing task aborted: {join_err}");
                failures += 1;
            }
        }
    }
    Ok(failures)
}

async fn upsert_with_retry(
    vector: &dyn VectorIndex,
    point: &ChunkPoint,
    embedding: &[f32],
) -> Result<String, VectorError> {
    let mut last_error: Option<VectorError> = None;
    for attempt in 0..MAX_INDEX_ATTEMPTS {
        if attempt > 0 {
            tokio::time::sleep(retry_backoff(attempt)).await;
        }
        match vector.upsert_chunk(point, embedding).await {
            Ok(vector_id) => return Ok(vector_id),
            Err(e) => {
                warn!(
                    "Upsert attempt {}/{} for chunk {} failed: {e}",
                    attempt + 1,
                    MAX_INDEX_ATTEMPTS,
                    point.chunk_id
                );
                last_error = Some(e);
            }
        }
    }
    Err(last_error.unwrap_or_else(|| VectorError::BackendResponse {
        backend: "qdrant".to_string(),
        details: "retries exhausted".to_string(),
    }))
}

async fn embed_with_retry(
    state: &AppState,
    texts: &[String],
) -> Result<Vec<Vec<f32>>, crate::embeddings::EmbeddingError> {
    let mut last_error = None;
    for attempt in 0..MAX_INDEX_ATTEMPTS {
        if attempt > 0 {
            tokio::time::sleep(retry_backoff(attempt)).await;
        }
        match state.embedder.embed_batch(texts).await {
            Ok(embeddings) => return Ok(embeddings),
            Err(e) => {
                warn!("Embedding attempt {}/{} failed: {e}", attempt + 1, MAX_INDEX_ATTEMPTS);
                last_error = Some(e);
            }
        }
    }
    Err(last_error.unwrap_or(crate::embeddings::EmbeddingError::CountMismatch {
        expected: texts.len(),
        got: 0,
    }))
}

fn retry_backoff(attempt: u32) -> Duration {
    // 500ms, 1s, 2s, ...
    Duration::from_millis(INDEX_RETRY_BASE_MS * (1 << (attempt - 1).min(5)))
}

// ────────────────────────────────────────────────────────────────────────────
// Persistence helpers
// ────────────────────────────────────────────────────────────────────────────

async fn fetch_resume(pool: &PgPool, resume_id: Uuid) -> Result<ResumeRow, AppError> {
    sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes WHERE id = $1")
        .bind(resume_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} not found")))
}

async fn download_blob(state: &AppState, s3_key: &str) -> Result<Vec<u8>, AppError> {
    let object = state
        .s3
        .get_object()
        .bucket(&state.config.s3_bucket)
        .key(s3_key)
        .send()
        .await
        .map_err(|e| AppError::Storage(format!("download of {s3_key} failed: {e}")))?;
    let data = object
        .body
        .collect()
        .await
        .map_err(|e| AppError::Storage(format!("reading {s3_key} failed: {e}")))?;
    Ok(data.into_bytes().to_vec())
}

async fn store_profile(
    pool: &PgPool,
    resume_id: Uuid,
    profile: &CandidateProfile,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE resumes SET
            candidate_name = $1, email = $2, phone = $3,
            current_role = $4, current_company = $5,
            years_experience = $6, domain = $7,
            skills = $8, technologies = $9,
            status = $10
        WHERE id = $11
        "#,
    )
    .bind(&profile.name)
    .bind(&profile.email)
    .bind(&profile.phone)
    .bind(&profile.current_role)
    .bind(&profile.current_company)
    .bind(profile.years_experience)
    .bind(&profile.domain)
    .bind(&profile.skills)
    .bind(&profile.technologies)
    .bind(ResumeStatus::Parsed.as_str())
    .bind(resume_id)
    .execute(pool)
    .await?;
    Ok(())
}

async fn store_chunks(
    pool: &PgPool,
    resume_id: Uuid,
    chunks: &[TextChunk],
) -> Result<Vec<StoredChunk>, AppError> {
    let mut stored = Vec::with_capacity(chunks.len());
    for (ordinal, chunk) in chunks.iter().enumerate() {
        let chunk_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO resume_chunks (id, resume_id, chunk_index, content, char_len, section)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(chunk_id)
        .bind(resume_id)
        .bind(ordinal as i32)
        .bind(&chunk.text)
        .bind(chunk.text.len() as i32)
        .bind(&chunk.section)
        .execute(pool)
        .await?;
        stored.push(StoredChunk {
            id: chunk_id,
            chunk_index: ordinal as i32,
            section: chunk.section.clone(),
            text: chunk.text.clone(),
        });
    }
    Ok(stored)
}

async fn mark_failed(pool: &PgPool, resume_id: Uuid, error: &str) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE resumes SET status = $1, processing_error = $2, processed_at = NOW() WHERE id = $3",
    )
    .bind(ResumeStatus::Failed.as_str())
    .bind(error)
    .bind(resume_id)
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_backoff_is_exponential() {
        assert_eq!(retry_backoff(1), Duration::from_millis(500));
        assert_eq!(retry_backoff(2), Duration::from_millis(1000));
        assert_eq!(retry_backoff(3), Duration::from_millis(2000));
    }

    #[test]
    fn test_retry_backoff_is_capped() {
        assert_eq!(retry_backoff(20), retry_backoff(6));
    }
}
