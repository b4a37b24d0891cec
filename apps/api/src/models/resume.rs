#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Processing lifecycle of an uploaded resume.
///
/// `raw → parsed → chunked → indexed`, with `failed` reachable from any stage.
/// A resume whose text yields zero chunks stops at `chunked` with
/// `chunks_count = 0` — processed, nothing to index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeStatus {
    Raw,
    Parsed,
    Chunked,
    Indexed,
    Failed,
}

impl ResumeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResumeStatus::Raw => "raw",
            ResumeStatus::Parsed => "parsed",
            ResumeStatus::Chunked => "chunked",
            ResumeStatus::Indexed => "indexed",
            ResumeStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "raw" => Some(ResumeStatus::Raw),
            "parsed" => Some(ResumeStatus::Parsed),
            "chunked" => Some(ResumeStatus::Chunked),
            "indexed" => Some(ResumeStatus::Indexed),
            "failed" => Some(ResumeStatus::Failed),
            _ => None,
        }
    }
}

/// One uploaded resume. Candidate metadata columns are nullable — extraction
/// is best-effort and may fail per field. Mutated only by the ingestion
/// pipeline; the query path reads it for post-retrieval filtering.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeRow {
    pub id: Uuid,
    pub s3_key: String,
    pub original_filename: String,
    pub file_size: i64,
    pub file_type: String,
    pub candidate_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub current_role: Option<String>,
    pub current_company: Option<String>,
    pub years_experience: Option<f64>,
    pub domain: Option<String>,
    pub skills: Vec<String>,
    pub technologies: Vec<String>,
    pub status: String,
    pub chunks_count: i32,
    pub is_indexed: bool,
    pub processing_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// A bounded span of a resume's normalized text.
///
/// `chunk_index` ordinals are contiguous from 0 per resume and assigned before
/// any indexing call is dispatched. `vector_id` is written once on successful
/// upsert and never mutated — reprocessing deletes the row and creates a new one.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeChunkRow {
    pub id: Uuid,
    pub resume_id: Uuid,
    pub chunk_index: i32,
    pub content: String,
    pub char_len: i32,
    pub section: String,
    pub vector_id: Option<String>,
    pub created_at: DateTime<Utc>,
}
