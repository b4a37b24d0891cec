//! Candidate profile extraction — pulls structured metadata out of raw resume
//! text with one LLM call. Every field is optional: extraction failing on a
//! field leaves it null, and a failed call leaves the whole profile empty.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::ingest::prompts::{PROFILE_EXTRACT_PROMPT_TEMPLATE, PROFILE_EXTRACT_SYSTEM};
use crate::llm_client::LlmClient;

/// Resume text beyond this many characters adds little signal for metadata
/// extraction and inflates the prompt.
const PROFILE_TEXT_LIMIT: usize = 8_000;

/// Structured candidate metadata extracted from a resume.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub current_role: Option<String>,
    pub current_company: Option<String>,
    pub years_experience: Option<f64>,
    pub domain: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
}

/// Extracts a candidate profile via the LLM. Uses the retrying call — the
/// ingestion path tolerates repeats.
pub async fn extract_profile(
    resume_text: &str,
    llm: &LlmClient,
) -> Result<CandidateProfile, AppError> {
    let excerpt = truncate_chars(resume_text, PROFILE_TEXT_LIMIT);
    let prompt = PROFILE_EXTRACT_PROMPT_TEMPLATE.replace("{resume_text}", excerpt);
    llm.call_json::<CandidateProfile>(&prompt, PROFILE_EXTRACT_SYSTEM)
        .await
        .map_err(|e| AppError::Llm(format!("Profile extraction failed: {e}")))
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_profile_deserializes() {
        let json = r#"{
            "name": "Jane Doe",
            "email": "jane@example.com",
            "phone": null,
            "current_role": "Senior Backend Engineer",
            "current_company": "Acme Corp",
            "years_experience": 6.5,
            "domain": "fintech",
            "skills": ["Python", "Django"],
            "technologies": ["Docker"]
        }"#;
        let profile: CandidateProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.name.as_deref(), Some("Jane Doe"));
        assert_eq!(profile.years_experience, Some(6.5));
        assert_eq!(profile.domain.as_deref(), Some("fintech"));
        assert_eq!(profile.skills, vec!["Python", "Django"]);
        assert!(profile.phone.is_none());
    }

    #[test]
    fn test_sparse_profile_tolerates_missing_lists() {
        // The model may omit list fields entirely when nothing was found.
        let json = r#"{"name": null, "email": null, "phone": null,
            "current_role": null, "current_company": null,
            "years_experience": null, "domain": null}"#;
        let profile: CandidateProfile = serde_json::from_str(json).unwrap();
        assert!(profile.name.is_none());
        assert!(profile.skills.is_empty());
        assert!(profile.technologies.is_empty());
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        let text = "résumé".repeat(10);
        let truncated = truncate_chars(&text, 7);
        assert_eq!(truncated.chars().count(), 7);
        assert!(text.starts_with(truncated));
    }

    #[test]
    fn test_truncate_chars_short_input_untouched() {
        assert_eq!(truncate_chars("short", 100), "short");
    }
}
