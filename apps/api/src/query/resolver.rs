//! Query Resolver — turns a recruiter request into a bounded context payload.
//!
//! Flow: (embed + retrieve) ‖ (derive filters) → post-filter by owning-resume
//!       metadata → truncate to the limit → assemble the payload.
//!
//! Filtering happens after retrieval because the vector index carries no
//! structured-filter capability; dropped hits never cause a re-rank — the
//! surviving order is a strict prefix-preserving subsequence of the index's
//! similarity ordering. Zero surviving chunks is a normal outcome, not a
//! fault: the payload is valid and empty, and the answer prompt then tells
//! the generator to report "no match" explicitly.

use std::collections::HashMap;

use tracing::info;
use uuid::Uuid;

use crate::answer::RelevanceTier;
use crate::embeddings::EmbeddingError;
use crate::errors::AppError;
use crate::models::resume::ResumeRow;
use crate::query::extraction::derive_filters;
use crate::query::filters::{resume_matches, SearchFilters};
use crate::state::AppState;
use crate::vector::{ScoredChunk, VectorError};

pub const DEFAULT_RESULT_LIMIT: usize = 10;
pub const MAX_RESULT_LIMIT: usize = 50;
/// Retrieval over-fetches so post-filtering still has enough to fill the limit.
const OVERFETCH_FACTOR: usize = 3;
/// Total character budget for chunk text in one context payload.
pub const MAX_CONTEXT_CHARS: usize = 12_000;

const HIGH_SCORE_FLOOR: f64 = 0.75;
const MEDIUM_SCORE_FLOOR: f64 = 0.45;

/// One retrieved chunk with enough provenance for the generator to cite the
/// owning candidate.
#[derive(Debug, Clone)]
pub struct ContextChunk {
    pub resume_id: Uuid,
    pub candidate_name: Option<String>,
    pub section: String,
    pub text: String,
    pub score: f64,
}

/// The bundle handed to the generator: ranked chunks, the original query,
/// and the effective filters.
#[derive(Debug, Clone)]
pub struct ContextPayload {
    pub query: String,
    pub filters: SearchFilters,
    pub chunks: Vec<ContextChunk>,
    pub truncated: bool,
}

pub async fn resolve_query(
    state: &AppState,
    query_text: &str,
    explicit: SearchFilters,
    limit: usize,
) -> Result<ContextPayload, AppError> {
    let limit = limit.clamp(1, MAX_RESULT_LIMIT);

    // Retrieval and filter extraction depend only on the query text, so they
    // run concurrently. The filtering step below needs both.
    let retrieval = async {
        let embedding = state
            .embedder
            .embed_one(query_text)
            .await
            .map_err(embed_error)?;
        state
            .vector
            .query(&embedding, limit * OVERFETCH_FACTOR)
            .await
            .map_err(vector_error)
    };
    let extraction = async {
        if explicit.is_empty() {
            derive_filters(query_text, &state.llm).await
        } else {
            None
        }
    };
    let (hits, extracted) = tokio::join!(retrieval, extraction);
    let hits = hits?;

    let filters = SearchFilters::merged(&explicit, extracted);
    let resumes = load_resumes(state, &hits).await?;
    let kept = filter_hits(hits, &filters, &resumes);
    info!(
        "Query resolved to {} chunks after filtering (filters: {filters:?})",
        kept.len()
    );

    Ok(build_payload(query_text, filters, kept, limit))
}

/// Drops hits whose owning resume fails the filters. Never reorders — the
/// retrieval engine's similarity order is preserved, ties included.
pub fn filter_hits(
    hits: Vec<ScoredChunk>,
    filters: &SearchFilters,
    resumes: &HashMap<Uuid, ResumeRow>,
) -> Vec<ScoredChunk> {
    if filters.is_empty() {
        return hits;
    }
    hits.into_iter()
        .filter(|hit| {
            resumes
                .get(&hit.resume_id)
                .map(|resume| resume_matches(filters, resume))
                .unwrap_or(false)
        })
        .collect()
}

/// Truncates to the limit and the context character budget, preserving order.
pub fn build_payload(
    query: &str,
    filters: SearchFilters,
    hits: Vec<ScoredChunk>,
    limit: usize,
) -> ContextPayload {
    let mut chunks = Vec::new();
    let mut used = 0usize;
    let mut truncated = false;
    for hit in hits.into_iter().take(limit) {
        if !chunks.is_empty() && used + hit.text.len() > MAX_CONTEXT_CHARS {
            truncated = true;
            break;
        }
        used += hit.text.len();
        chunks.push(ContextChunk {
            resume_id: hit.resume_id,
            candidate_name: hit.candidate_name,
            section: hit.section,
            text: hit.text,
            score: hit.score,
        });
    }
    ContextPayload {
        query: query.to_string(),
        filters,
        chunks,
        truncated,
    }
}

/// Per-resume aggregation for the structured search endpoint: resumes appear
/// in the order their best chunk ranked, carrying that chunk's score.
#[derive(Debug, Clone)]
pub struct RankedCandidate {
    pub resume_id: Uuid,
    pub best_score: f64,
    pub chunk_count: usize,
}

pub fn rank_candidates(chunks: &[ContextChunk]) -> Vec<RankedCandidate> {
    let mut order: Vec<Uuid> = Vec::new();
    let mut by_id: HashMap<Uuid, RankedCandidate> = HashMap::new();
    for chunk in chunks {
        let entry = by_id.entry(chunk.resume_id).or_insert_with(|| {
            order.push(chunk.resume_id);
            RankedCandidate {
                resume_id: chunk.resume_id,
                best_score: chunk.score,
                chunk_count: 0,
            }
        });
        entry.chunk_count += 1;
        if chunk.score > entry.best_score {
            entry.best_score = chunk.score;
        }
    }
    order
        .into_iter()
        .filter_map(|id| by_id.remove(&id))
        .collect()
}

pub fn score_tier(score: f64) -> RelevanceTier {
    if score >= HIGH_SCORE_FLOOR {
        RelevanceTier::High
    } else if score >= MEDIUM_SCORE_FLOOR {
        RelevanceTier::Medium
    } else {
        RelevanceTier::Low
    }
}

async fn load_resumes(
    state: &AppState,
    hits: &[ScoredChunk],
) -> Result<HashMap<Uuid, ResumeRow>, AppError> {
    let mut ids: Vec<Uuid> = hits.iter().map(|hit| hit.resume_id).collect();
    ids.sort();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes WHERE id = ANY($1)")
        .bind(&ids)
        .fetch_all(&state.db)
        .await?;
    Ok(rows.into_iter().map(|row| (row.id, row)).collect())
}

fn embed_error(e: EmbeddingError) -> AppError {
    if e.is_unavailable() {
        AppError::Upstream {
            service: "embeddings",
            detail: e.to_string(),
        }
    } else {
        AppError::Internal(anyhow::anyhow!(e))
    }
}

fn vector_error(e: VectorError) -> AppError {
    if e.is_unavailable() {
        AppError::Upstream {
            service: "vector index",
            detail: e.to_string(),
        }
    } else {
        AppError::Internal(anyhow::anyhow!(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn make_resume(id: Uuid, domain: Option<&str>) -> ResumeRow {
        ResumeRow {
            id,
            s3_key: format!("resumes/{id}/resume.pdf"),
            original_filename: "resume.pdf".to_string(),
            file_size: 1024,
            file_type: "pdf".to_string(),
            candidate_name: Some("Candidate".to_string()),
            email: None,
            phone: None,
            current_role: None,
            current_company: None,
            years_experience: Some(5.0),
            domain: domain.map(String::from),
            skills: vec![],
            technologies: vec![],
            status: "indexed".to_string(),
            chunks_count: 1,
            is_indexed: true,
            processing_error: None,
            created_at: Utc::now(),
            processed_at: Some(Utc::now()),
        }
    }

    fn make_hit(resume_id: Uuid, ordinal: usize, score: f64) -> ScoredChunk {
        ScoredChunk {
            chunk_id: format!("chunk-{ordinal}"),
            resume_id,
            candidate_name: Some("Candidate".to_string()),
            section: "experience".to_string(),
            text: format!("chunk text {ordinal}"),
            score,
        }
    }

    #[test]
    fn test_filter_keeps_only_matching_documents_in_original_order() {
        // 10 retrieved chunks from 6 distinct documents, 2 of which are
        // fintech — only their chunks survive, relative order intact.
        let docs: Vec<Uuid> = (0..6).map(|_| Uuid::new_v4()).collect();
        let fintech_a = docs[1];
        let fintech_b = docs[4];
        let mut resumes = HashMap::new();
        for id in &docs {
            let domain = if *id == fintech_a || *id == fintech_b {
                Some("fintech")
            } else {
                Some("retail")
            };
            resumes.insert(*id, make_resume(*id, domain));
        }

        let owners = [
            docs[0], docs[1], docs[2], docs[3], docs[4], docs[5], docs[1], docs[4], docs[2],
            docs[1],
        ];
        let hits: Vec<ScoredChunk> = owners
            .iter()
            .enumerate()
            .map(|(i, owner)| make_hit(*owner, i, 1.0 - i as f64 * 0.05))
            .collect();

        let filters = SearchFilters {
            domain: Some("fintech".to_string()),
            ..Default::default()
        };
        let kept = filter_hits(hits, &filters, &resumes);

        assert_eq!(kept.len(), 5);
        assert!(kept
            .iter()
            .all(|hit| hit.resume_id == fintech_a || hit.resume_id == fintech_b));
        let ordinals: Vec<&str> = kept.iter().map(|hit| hit.chunk_id.as_str()).collect();
        assert_eq!(
            ordinals,
            vec!["chunk-1", "chunk-4", "chunk-6", "chunk-7", "chunk-9"],
            "filtering must preserve the original relative order"
        );
    }

    #[test]
    fn test_empty_filters_pass_everything_through_untouched() {
        let resume_id = Uuid::new_v4();
        let hits = vec![make_hit(resume_id, 0, 0.9), make_hit(resume_id, 1, 0.8)];
        // Deliberately empty metadata map: with no filters there is no lookup.
        let kept = filter_hits(hits, &SearchFilters::default(), &HashMap::new());
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_hit_with_unknown_owner_is_dropped_when_filtering() {
        let hits = vec![make_hit(Uuid::new_v4(), 0, 0.9)];
        let filters = SearchFilters {
            domain: Some("fintech".to_string()),
            ..Default::default()
        };
        assert!(filter_hits(hits, &filters, &HashMap::new()).is_empty());
    }

    #[test]
    fn test_payload_never_exceeds_limit_and_keeps_order() {
        let resume_id = Uuid::new_v4();
        let hits: Vec<ScoredChunk> = (0..20)
            .map(|i| make_hit(resume_id, i, 1.0 - i as f64 * 0.01))
            .collect();
        let payload = build_payload("query", SearchFilters::default(), hits, 5);
        assert_eq!(payload.chunks.len(), 5);
        for window in payload.chunks.windows(2) {
            assert!(window[0].score >= window[1].score);
        }
        assert!(!payload.truncated);
    }

    #[test]
    fn test_payload_respects_context_character_budget() {
        let resume_id = Uuid::new_v4();
        let hits: Vec<ScoredChunk> = (0..10)
            .map(|i| {
                let mut hit = make_hit(resume_id, i, 0.9);
                hit.text = "x".repeat(5_000);
                hit
            })
            .collect();
        let payload = build_payload("query", SearchFilters::default(), hits, 10);
        let used: usize = payload.chunks.iter().map(|c| c.text.len()).sum();
        assert!(used <= MAX_CONTEXT_CHARS);
        assert!(payload.truncated);
        // The first chunk always fits, whatever its size.
        assert!(!payload.chunks.is_empty());
    }

    #[test]
    fn test_zero_hits_produce_a_valid_empty_payload() {
        let payload = build_payload("query", SearchFilters::default(), vec![], 10);
        assert!(payload.chunks.is_empty());
        assert!(!payload.truncated);
        assert_eq!(payload.query, "query");
    }

    #[test]
    fn test_rank_candidates_groups_by_first_seen_order() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let chunks = vec![
            ContextChunk {
                resume_id: first,
                candidate_name: None,
                section: "experience".to_string(),
                text: "a".to_string(),
                score: 0.9,
            },
            ContextChunk {
                resume_id: second,
                candidate_name: None,
                section: "skills".to_string(),
                text: "b".to_string(),
                score: 0.8,
            },
            ContextChunk {
                resume_id: first,
                candidate_name: None,
                section: "skills".to_string(),
                text: "c".to_string(),
                score: 0.7,
            },
        ];
        let ranked = rank_candidates(&chunks);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].resume_id, first);
        assert_eq!(ranked[0].best_score, 0.9);
        assert_eq!(ranked[0].chunk_count, 2);
        assert_eq!(ranked[1].resume_id, second);
    }

    #[test]
    fn test_score_tier_thresholds() {
        assert_eq!(score_tier(0.9), RelevanceTier::High);
        assert_eq!(score_tier(0.75), RelevanceTier::High);
        assert_eq!(score_tier(0.6), RelevanceTier::Medium);
        assert_eq!(score_tier(0.1), RelevanceTier::Low);
    }
}
