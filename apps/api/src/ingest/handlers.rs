use aws_sdk_s3::primitives::ByteStream;
use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::ingest::indexer::process_resume;
use crate::models::resume::{ResumeChunkRow, ResumeRow, ResumeStatus};
use crate::state::AppState;

const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "docx", "txt"];
const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Serialize)]
pub struct ResumeUploadResponse {
    pub id: Uuid,
    pub original_filename: String,
    pub file_size: i64,
    pub file_type: String,
    pub status: String,
}

/// Extracted candidate fields, every one optional — extraction is best-effort.
#[derive(Debug, Serialize)]
pub struct ResumeMetadata {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub current_role: Option<String>,
    pub current_company: Option<String>,
    pub years_experience: Option<f64>,
    pub domain: Option<String>,
    pub skills: Vec<String>,
    pub technologies: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ResumeResponse {
    pub id: Uuid,
    pub original_filename: String,
    pub file_size: i64,
    pub file_type: String,
    pub metadata: ResumeMetadata,
    pub status: String,
    pub is_indexed: bool,
    pub chunks_count: i32,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ResumeListResponse {
    pub resumes: Vec<ResumeResponse>,
    pub total: i64,
    pub page: i64,
    pub size: i64,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ResumeStatusResponse {
    pub id: Uuid,
    pub status: String,
    pub is_indexed: bool,
    pub chunks_count: i32,
    pub processing_error: Option<String>,
}

/// POST /api/v1/resumes
/// Accepts a multipart upload, stores the blob, and spawns background
/// processing. Returns immediately — clients poll the status endpoint.
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ResumeUploadResponse>, AppError> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let filename = field
                .file_name()
                .map(str::to_string)
                .ok_or_else(|| AppError::Validation("Upload is missing a filename".to_string()))?;
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Could not read upload: {e}")))?;
            upload = Some((filename, data.to_vec()));
            break;
        }
    }

    let (filename, data) = upload
        .ok_or_else(|| AppError::Validation("Multipart field 'file' is required".to_string()))?;

    let file_type = file_extension(&filename)
        .ok_or_else(|| AppError::Validation(format!("Cannot determine file type of '{filename}'")))?;
    if !ALLOWED_EXTENSIONS.contains(&file_type.as_str()) {
        return Err(AppError::Validation(format!(
            "File type '{file_type}' not allowed. Allowed types: {}",
            ALLOWED_EXTENSIONS.join(", ")
        )));
    }
    if data.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }
    if data.len() > state.config.max_upload_bytes {
        return Err(AppError::Validation(format!(
            "File size {} exceeds maximum allowed size {}",
            data.len(),
            state.config.max_upload_bytes
        )));
    }

    let resume_id = Uuid::new_v4();
    let file_size = data.len() as i64;
    let s3_key = format!("resumes/{resume_id}/{filename}");

    state
        .s3
        .put_object()
        .bucket(&state.config.s3_bucket)
        .key(&s3_key)
        .body(ByteStream::from(data))
        .send()
        .await
        .map_err(|e| AppError::Storage(format!("upload of {s3_key} failed: {e}")))?;

    sqlx::query(
        r#"
        INSERT INTO resumes
            (id, s3_key, original_filename, file_size, file_type,
             skills, technologies, status, chunks_count, is_indexed)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 0, FALSE)
        "#,
    )
    .bind(resume_id)
    .bind(&s3_key)
    .bind(&filename)
    .bind(file_size)
    .bind(&file_type)
    .bind(Vec::<String>::new())
    .bind(Vec::<String>::new())
    .bind(ResumeStatus::Raw.as_str())
    .execute(&state.db)
    .await?;

    info!("Uploaded resume {resume_id} ({filename}, {file_size} bytes)");
    tokio::spawn(process_resume(state.clone(), resume_id));

    Ok(Json(ResumeUploadResponse {
        id: resume_id,
        original_filename: filename,
        file_size,
        file_type,
        status: ResumeStatus::Raw.as_str().to_string(),
    }))
}

/// GET /api/v1/resumes
pub async fn handle_list(
    State(state): State<AppState>,
    Query(params): Query<PageQuery>,
) -> Result<Json<ResumeListResponse>, AppError> {
    let (page, size) = clamp_page(params.page, params.size);
    let offset = (page - 1) * size;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM resumes")
        .fetch_one(&state.db)
        .await?;

    let rows = sqlx::query_as::<_, ResumeRow>(
        "SELECT * FROM resumes ORDER BY created_at DESC LIMIT $1 OFFSET $2",
    )
    .bind(size)
    .bind(offset)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ResumeListResponse {
        resumes: rows.into_iter().map(to_response).collect(),
        total,
        page,
        size,
    }))
}

/// GET /api/v1/resumes/:id
pub async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResumeResponse>, AppError> {
    let row = fetch_resume(&state, id).await?;
    Ok(Json(to_response(row)))
}

/// GET /api/v1/resumes/:id/status
pub async fn handle_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResumeStatusResponse>, AppError> {
    let row = fetch_resume(&state, id).await?;
    Ok(Json(ResumeStatusResponse {
        id: row.id,
        status: row.status,
        is_indexed: row.is_indexed,
        chunks_count: row.chunks_count,
        processing_error: row.processing_error,
    }))
}

/// POST /api/v1/resumes/:id/reprocess
/// Re-runs the pipeline. The indexer supersedes the previous chunk set —
/// old vectors never accumulate as duplicates.
pub async fn handle_reprocess(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResumeStatusResponse>, AppError> {
    let row = fetch_resume(&state, id).await?;

    sqlx::query("UPDATE resumes SET status = $1, processing_error = NULL WHERE id = $2")
        .bind(ResumeStatus::Raw.as_str())
        .bind(id)
        .execute(&state.db)
        .await?;

    info!("Reprocessing resume {id}");
    tokio::spawn(process_resume(state.clone(), id));

    Ok(Json(ResumeStatusResponse {
        id,
        status: ResumeStatus::Raw.as_str().to_string(),
        is_indexed: false,
        chunks_count: row.chunks_count,
        processing_error: None,
    }))
}

/// GET /api/v1/resumes/:id/chunks
/// Returns the resume's chunks in ordinal order.
pub async fn handle_chunks(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ResumeChunkRow>>, AppError> {
    fetch_resume(&state, id).await?;
    let chunks = sqlx::query_as::<_, ResumeChunkRow>(
        "SELECT * FROM resume_chunks WHERE resume_id = $1 ORDER BY chunk_index ASC",
    )
    .bind(id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(chunks))
}

async fn fetch_resume(state: &AppState, id: Uuid) -> Result<ResumeRow, AppError> {
    sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {id} not found")))
}

fn to_response(row: ResumeRow) -> ResumeResponse {
    ResumeResponse {
        id: row.id,
        original_filename: row.original_filename,
        file_size: row.file_size,
        file_type: row.file_type,
        metadata: ResumeMetadata {
            name: row.candidate_name,
            email: row.email,
            phone: row.phone,
            current_role: row.current_role,
            current_company: row.current_company,
            years_experience: row.years_experience,
            domain: row.domain,
            skills: row.skills,
            technologies: row.technologies,
        },
        status: row.status,
        is_indexed: row.is_indexed,
        chunks_count: row.chunks_count,
        created_at: row.created_at,
        processed_at: row.processed_at,
    }
}

fn file_extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

fn clamp_page(page: Option<i64>, size: Option<i64>) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let size = size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    (page, size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_extension_lowercases() {
        assert_eq!(file_extension("Resume.PDF"), Some("pdf".to_string()));
        assert_eq!(file_extension("cv.v2.docx"), Some("docx".to_string()));
    }

    #[test]
    fn test_file_extension_rejects_bare_and_hidden_names() {
        assert_eq!(file_extension("resume"), None);
        assert_eq!(file_extension(".gitignore"), None);
        assert_eq!(file_extension("resume."), None);
    }

    #[test]
    fn test_clamp_page_defaults() {
        assert_eq!(clamp_page(None, None), (1, DEFAULT_PAGE_SIZE));
    }

    #[test]
    fn test_clamp_page_bounds() {
        assert_eq!(clamp_page(Some(0), Some(0)), (1, 1));
        assert_eq!(clamp_page(Some(-3), Some(500)), (1, MAX_PAGE_SIZE));
    }
}
