// Resume ingestion: upload → extract → profile → chunk → embed → index.
// Implements the producer side of the pipeline; one document per job.
// All LLM calls go through llm_client — no direct API calls here.

pub mod chunking;
pub mod extract;
pub mod handlers;
pub mod indexer;
pub mod profile;
pub mod prompts;
