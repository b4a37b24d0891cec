// All LLM prompt constants and prompt builders for the query module.
// Reuses cross-cutting fragments from llm_client::prompts.

use crate::llm_client::prompts::{NO_MATCH_INSTRUCTION, TAGGED_FORMAT_INSTRUCTION};
use crate::query::resolver::ContextPayload;

/// System prompt for filter extraction — enforces JSON-only output.
pub const FILTER_EXTRACT_SYSTEM: &str =
    "You are a recruiting search assistant extracting structured filters \
    from a recruiter's free-text query. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Filter extraction prompt template. Replace `{query}` before sending.
pub const FILTER_EXTRACT_PROMPT_TEMPLATE: &str = r#"Extract structured search filters from the recruiter query below.

Return a JSON object with this EXACT schema (no extra fields):
{
  "skills": ["Python", "Django"],
  "domain": "fintech",
  "min_experience": 5.0
}

Rules:
- "skills": only skills or technologies the query explicitly requires. Use [] when none are named.
- "domain": a single lowercase industry (e.g. "fintech", "healthcare") or null when the query names none.
- "min_experience": the minimum years of experience as a number, or null when not stated.
- Extract only what the query states. Do NOT guess or infer. An all-null result is valid.

RECRUITER QUERY:
{query}"#;

/// System prompt for answer generation over retrieved resume chunks.
pub const ANSWER_SYSTEM: &str =
    "You are a resume analysis assistant helping recruiters find the best \
    candidates. Analyze the provided resume excerpts and answer the \
    recruiter's question with clear, concise summaries. Highlight relevant \
    skills and experience with specific examples, and rate each candidate's \
    fit as High, Medium, or Low. Mention ONLY candidates present in the \
    provided excerpts. Always be professional and objective.";

/// Answer prompt template.
/// Replace: {format_instruction}, {filters}, {context}, {query}
const ANSWER_PROMPT_TEMPLATE: &str = r#"{format_instruction}

ACTIVE FILTERS (already applied to the excerpts below):
{filters}

RESUME EXCERPTS (most relevant first):
{context}

RECRUITER QUESTION:
{query}"#;

/// Builds the full answer prompt from a resolved context payload.
/// An empty payload swaps the excerpt section for an explicit no-match
/// instruction so the generator reports the absence instead of inventing.
pub fn build_answer_prompt(payload: &ContextPayload) -> String {
    let filters =
        serde_json::to_string(&payload.filters).unwrap_or_else(|_| "{}".to_string());

    let context = if payload.chunks.is_empty() {
        NO_MATCH_INSTRUCTION.to_string()
    } else {
        let mut rendered = String::new();
        for chunk in &payload.chunks {
            let name = chunk.candidate_name.as_deref().unwrap_or("Unknown candidate");
            rendered.push_str(&format!(
                "--- Candidate: {name} (resume {}, section: {}) ---\n{}\n\n",
                chunk.resume_id, chunk.section, chunk.text
            ));
        }
        rendered.trim_end().to_string()
    };

    ANSWER_PROMPT_TEMPLATE
        .replace("{format_instruction}", TAGGED_FORMAT_INSTRUCTION)
        .replace("{filters}", &filters)
        .replace("{context}", &context)
        .replace("{query}", &payload.query)
}
