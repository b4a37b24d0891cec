//! Best-effort structured-filter extraction from recruiter free text.
//!
//! One single-attempt LLM call in JSON mode. An all-null result is a normal
//! outcome — it means "unfiltered semantic search". So is any failure: the
//! query proceeds unfiltered rather than erroring.

use serde::Deserialize;
use tracing::warn;

use crate::llm_client::LlmClient;
use crate::query::filters::SearchFilters;
use crate::query::prompts::{FILTER_EXTRACT_PROMPT_TEMPLATE, FILTER_EXTRACT_SYSTEM};

#[derive(Debug, Default, Deserialize)]
struct ExtractedFilters {
    skills: Option<Vec<String>>,
    domain: Option<String>,
    min_experience: Option<f64>,
}

pub async fn derive_filters(query_text: &str, llm: &LlmClient) -> Option<SearchFilters> {
    let prompt = FILTER_EXTRACT_PROMPT_TEMPLATE.replace("{query}", query_text);
    match llm
        .call_json_once::<ExtractedFilters>(&prompt, FILTER_EXTRACT_SYSTEM)
        .await
    {
        Ok(extracted) => sanitize(extracted),
        Err(e) => {
            warn!("Filter extraction failed, searching unfiltered: {e}");
            None
        }
    }
}

fn sanitize(extracted: ExtractedFilters) -> Option<SearchFilters> {
    let filters = SearchFilters {
        skills: extracted
            .skills
            .map(|skills| {
                skills
                    .into_iter()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|skills| !skills.is_empty()),
        domain: extracted
            .domain
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
        min_experience: extracted.min_experience.filter(|min| *min >= 0.0),
    };
    if filters.is_empty() {
        None
    } else {
        Some(filters)
    }
}
