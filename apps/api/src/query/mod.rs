// Query resolution: recruiter free text → filters → retrieval → context payload.
// Consumer side of the pipeline; one query per request, no shared mutable state.
// All LLM calls go through llm_client — no direct API calls here.

pub mod extraction;
pub mod filters;
pub mod handlers;
pub mod prompts;
pub mod resolver;
