use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::answer::{normalize, CandidateRecord, ParsedBlock, RelevanceTier};
use crate::audit;
use crate::errors::AppError;
use crate::llm_client::LlmError;
use crate::models::resume::ResumeRow;
use crate::query::filters::SearchFilters;
use crate::query::prompts::{build_answer_prompt, ANSWER_SYSTEM};
use crate::query::resolver::{
    rank_candidates, resolve_query, score_tier, RankedCandidate, DEFAULT_RESULT_LIMIT,
};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(flatten)]
    pub filters: SearchFilters,
    pub limit: Option<usize>,
    /// Client-side request ordering: echoed back so the UI can discard
    /// responses that arrive after a newer query was issued.
    pub sequence: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub sequence: Option<u64>,
    pub message: String,
    pub response: String,
    pub structured: bool,
    pub blocks: Vec<ParsedBlock>,
    pub candidates: Vec<CandidateRecord>,
    pub filters_applied: SearchFilters,
    pub chunks_considered: usize,
    pub context_truncated: bool,
}

/// POST /api/v1/chat
/// Full pipeline: resolve context → generator → normalize. The generation
/// call is made exactly once — an upstream timeout surfaces as
/// UPSTREAM_UNAVAILABLE rather than being silently retried.
pub async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if req.message.trim().is_empty() {
        return Err(AppError::Validation("Message must not be empty".to_string()));
    }
    let limit = req.limit.unwrap_or(DEFAULT_RESULT_LIMIT);

    let payload = resolve_query(&state, &req.message, req.filters, limit).await?;
    let prompt = build_answer_prompt(&payload);

    let response = state
        .llm
        .call_once(&prompt, ANSWER_SYSTEM)
        .await
        .map_err(map_llm_error)?;
    // The normalizer is total — an empty generation degrades to prose.
    let raw = response.text().unwrap_or_default().to_string();
    let normalized = normalize(&raw);

    info!(
        "Chat answered: {} candidates extracted from {} chars (structured: {})",
        normalized.candidates.len(),
        raw.len(),
        normalized.structured
    );

    audit::record_query(
        &state.redis,
        &payload.query,
        &payload.filters,
        normalized.candidates.len(),
    )
    .await;

    Ok(Json(ChatResponse {
        sequence: req.sequence,
        message: req.message,
        response: raw,
        structured: normalized.structured,
        blocks: normalized.blocks,
        candidates: normalized.candidates,
        filters_applied: payload.filters,
        chunks_considered: payload.chunks.len(),
        context_truncated: payload.truncated,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(flatten)]
    pub filters: SearchFilters,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct CandidateSearchMatch {
    pub resume_id: Uuid,
    pub candidate_name: String,
    pub current_role: Option<String>,
    pub current_company: Option<String>,
    pub best_score: f64,
    pub relevance: RelevanceTier,
    pub matched_skills: Vec<String>,
    pub highlights: Vec<String>,
    pub justification: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub filters_applied: SearchFilters,
    pub candidates: Vec<CandidateSearchMatch>,
    pub total_found: usize,
}

/// POST /api/v1/search
/// Semantic retrieval plus metadata filtering, without generation — returns
/// ranked per-resume matches directly.
pub async fn handle_search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    if req.query.trim().is_empty() {
        return Err(AppError::Validation("Query must not be empty".to_string()));
    }
    let limit = req.limit.unwrap_or(DEFAULT_RESULT_LIMIT);

    let payload = resolve_query(&state, &req.query, req.filters, limit).await?;
    let ranked = rank_candidates(&payload.chunks);

    let ids: Vec<Uuid> = ranked.iter().map(|r| r.resume_id).collect();
    let rows = if ids.is_empty() {
        Vec::new()
    } else {
        sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes WHERE id = ANY($1)")
            .bind(&ids)
            .fetch_all(&state.db)
            .await?
    };

    let candidates: Vec<CandidateSearchMatch> = ranked
        .iter()
        .map(|entry| to_match(entry, rows.iter().find(|row| row.id == entry.resume_id), &payload.filters))
        .collect();

    Ok(Json(SearchResponse {
        query: payload.query,
        filters_applied: payload.filters,
        total_found: candidates.len(),
        candidates,
    }))
}

fn to_match(
    entry: &RankedCandidate,
    row: Option<&ResumeRow>,
    filters: &SearchFilters,
) -> CandidateSearchMatch {
    let matched_skills = match (row, filters.skills.as_ref()) {
        (Some(row), Some(requested)) => {
            let pool: Vec<String> = row
                .skills
                .iter()
                .chain(row.technologies.iter())
                .map(|s| s.to_lowercase())
                .collect();
            requested
                .iter()
                .filter(|want| pool.iter().any(|have| *have == want.to_lowercase()))
                .cloned()
                .collect()
        }
        _ => Vec::new(),
    };
    let highlights = row
        .map(|row| row.skills.iter().take(3).cloned().collect())
        .unwrap_or_default();
    let relevance = score_tier(entry.best_score);

    CandidateSearchMatch {
        resume_id: entry.resume_id,
        candidate_name: row
            .and_then(|row| row.candidate_name.clone())
            .unwrap_or_else(|| "Unknown".to_string()),
        current_role: row.and_then(|row| row.current_role.clone()),
        current_company: row.and_then(|row| row.current_company.clone()),
        best_score: entry.best_score,
        relevance,
        matched_skills: matched_skills.clone(),
        highlights,
        justification: format!(
            "{} relevance: {} matching skills across {} relevant resume chunks",
            relevance.as_str(),
            matched_skills.len(),
            entry.chunk_count
        ),
    }
}

fn map_llm_error(e: LlmError) -> AppError {
    if e.is_unavailable() {
        AppError::Upstream {
            service: "generator",
            detail: e.to_string(),
        }
    } else {
        AppError::Llm(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_flattens_filters() {
        let json = serde_json::json!({
            "message": "Find Rust engineers in fintech",
            "skills": ["Rust"],
            "domain": "fintech",
            "min_experience": 4,
            "limit": 5,
            "sequence": 17
        });
        let req: ChatRequest = serde_json::from_value(json).unwrap();
        assert_eq!(req.filters.skills, Some(vec!["Rust".to_string()]));
        assert_eq!(req.filters.domain.as_deref(), Some("fintech"));
        assert_eq!(req.filters.min_experience, Some(4.0));
        assert_eq!(req.limit, Some(5));
        assert_eq!(req.sequence, Some(17));
    }

    #[test]
    fn test_chat_request_minimal_body() {
        let req: ChatRequest =
            serde_json::from_value(serde_json::json!({ "message": "anyone?" })).unwrap();
        assert!(req.filters.is_empty());
        assert!(req.limit.is_none());
        assert!(req.sequence.is_none());
    }

    #[test]
    fn test_map_llm_error_distinguishes_unavailable() {
        let unavailable = map_llm_error(LlmError::Api {
            status: 529,
            message: "overloaded".to_string(),
        });
        assert!(matches!(
            unavailable,
            AppError::Upstream { service: "generator", .. }
        ));

        let hard = map_llm_error(LlmError::EmptyContent);
        assert!(matches!(hard, AppError::Llm(_)));
    }

    #[test]
    fn test_to_match_with_missing_row_degrades_gracefully() {
        let entry = RankedCandidate {
            resume_id: Uuid::new_v4(),
            best_score: 0.8,
            chunk_count: 2,
        };
        let m = to_match(&entry, None, &SearchFilters::default());
        assert_eq!(m.candidate_name, "Unknown");
        assert!(m.matched_skills.is_empty());
        assert_eq!(m.relevance, RelevanceTier::High);
    }
}
