#![allow(dead_code)]

// Shared prompt constants and prompt-building utilities.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Answer-format instruction: the tagged-block dialect the normalizer parses
/// first. The generator is not contractually bound to follow it, which is why
/// the normalizer keeps fallback dialects.
pub const TAGGED_FORMAT_INSTRUCTION: &str = "\
    Format your answer as tagged sections. Start each section with a header \
    line of the form '### <TAG>:' where <TAG> is one of CANDIDATE, TABLE, \
    INFO, JUSTIFICATION, SUMMARY. \
    For each matching candidate emit one '### CANDIDATE: <full name>' section \
    containing labeled lines such as '**Role**:', '**Company**:', \
    '**Skills**:' (comma-separated), '**Experience**:', and '**Relevance**:' \
    (High, Medium, or Low).";

/// Appended to the answer prompt when retrieval produced zero context chunks,
/// so the generator reports the absence instead of inventing candidates.
pub const NO_MATCH_INSTRUCTION: &str = "\
    No candidate material matched this query. State explicitly that no \
    matching candidates were found. Do NOT invent candidates, names, or \
    qualifications.";
