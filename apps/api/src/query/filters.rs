use serde::{Deserialize, Serialize};

use crate::models::resume::ResumeRow;

/// Structured filter predicates over candidate metadata. All optional,
/// combined with AND semantics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    pub skills: Option<Vec<String>>,
    pub domain: Option<String>,
    pub min_experience: Option<f64>,
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        self.skills.as_ref().map_or(true, |s| s.is_empty())
            && self.domain.is_none()
            && self.min_experience.is_none()
    }

    /// Field-by-field merge: explicit caller filters win over extracted ones.
    pub fn merged(explicit: &SearchFilters, extracted: Option<SearchFilters>) -> SearchFilters {
        let extracted = extracted.unwrap_or_default();
        SearchFilters {
            skills: explicit
                .skills
                .clone()
                .filter(|s| !s.is_empty())
                .or(extracted.skills),
            domain: explicit.domain.clone().or(extracted.domain),
            min_experience: explicit.min_experience.or(extracted.min_experience),
        }
    }
}

/// Whether a resume's metadata satisfies the filters: required skills must
/// all appear in the candidate's skills ∪ technologies (case-insensitive),
/// domain must match exactly, experience must meet the threshold. A resume
/// missing the metadata a present filter needs fails that filter.
pub fn resume_matches(filters: &SearchFilters, resume: &ResumeRow) -> bool {
    if let Some(required) = filters.skills.as_ref().filter(|s| !s.is_empty()) {
        let pool: Vec<String> = resume
            .skills
            .iter()
            .chain(resume.technologies.iter())
            .map(|s| s.to_lowercase())
            .collect();
        let all_present = required
            .iter()
            .all(|want| pool.iter().any(|have| *have == want.to_lowercase()));
        if !all_present {
            return false;
        }
    }

    if let Some(domain) = filters.domain.as_deref() {
        match resume.domain.as_deref() {
            Some(have) if have.eq_ignore_ascii_case(domain) => {}
            _ => return false,
        }
    }

    if let Some(min) = filters.min_experience {
        match resume.years_experience {
            Some(years) if years >= min => {}
            _ => return false,
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn make_resume(
        domain: Option<&str>,
        years: Option<f64>,
        skills: Vec<&str>,
        technologies: Vec<&str>,
    ) -> ResumeRow {
        ResumeRow {
            id: Uuid::new_v4(),
            s3_key: "resumes/test/key.pdf".to_string(),
            original_filename: "resume.pdf".to_string(),
            file_size: 1024,
            file_type: "pdf".to_string(),
            candidate_name: Some("Test Candidate".to_string()),
            email: None,
            phone: None,
            current_role: None,
            current_company: None,
            years_experience: years,
            domain: domain.map(String::from),
            skills: skills.into_iter().map(String::from).collect(),
            technologies: technologies.into_iter().map(String::from).collect(),
            status: "indexed".to_string(),
            chunks_count: 3,
            is_indexed: true,
            processing_error: None,
            created_at: Utc::now(),
            processed_at: Some(Utc::now()),
        }
    }

    #[test]
    fn test_is_empty_treats_empty_skill_list_as_absent() {
        assert!(SearchFilters::default().is_empty());
        assert!(SearchFilters {
            skills: Some(vec![]),
            ..Default::default()
        }
        .is_empty());
        assert!(!SearchFilters {
            domain: Some("fintech".to_string()),
            ..Default::default()
        }
        .is_empty());
    }

    #[test]
    fn test_merged_explicit_wins_field_by_field() {
        let explicit = SearchFilters {
            skills: Some(vec!["Rust".to_string()]),
            domain: None,
            min_experience: None,
        };
        let extracted = SearchFilters {
            skills: Some(vec!["Python".to_string()]),
            domain: Some("fintech".to_string()),
            min_experience: Some(5.0),
        };
        let merged = SearchFilters::merged(&explicit, Some(extracted));
        assert_eq!(merged.skills, Some(vec!["Rust".to_string()]));
        assert_eq!(merged.domain.as_deref(), Some("fintech"));
        assert_eq!(merged.min_experience, Some(5.0));
    }

    #[test]
    fn test_merged_without_extraction_keeps_explicit() {
        let explicit = SearchFilters {
            domain: Some("healthcare".to_string()),
            ..Default::default()
        };
        let merged = SearchFilters::merged(&explicit, None);
        assert_eq!(merged, explicit);
    }

    #[test]
    fn test_skills_subset_matches_across_skills_and_technologies() {
        let resume = make_resume(None, None, vec!["Python"], vec!["Docker"]);
        let filters = SearchFilters {
            skills: Some(vec!["python".to_string(), "DOCKER".to_string()]),
            ..Default::default()
        };
        assert!(resume_matches(&filters, &resume));

        let missing = SearchFilters {
            skills: Some(vec!["Python".to_string(), "Kafka".to_string()]),
            ..Default::default()
        };
        assert!(!resume_matches(&missing, &resume));
    }

    #[test]
    fn test_domain_equality_is_case_insensitive() {
        let resume = make_resume(Some("Fintech"), None, vec![], vec![]);
        let filters = SearchFilters {
            domain: Some("fintech".to_string()),
            ..Default::default()
        };
        assert!(resume_matches(&filters, &resume));

        let other = SearchFilters {
            domain: Some("healthcare".to_string()),
            ..Default::default()
        };
        assert!(!resume_matches(&other, &resume));
    }

    #[test]
    fn test_min_experience_threshold() {
        let resume = make_resume(None, Some(6.0), vec![], vec![]);
        let at = SearchFilters {
            min_experience: Some(6.0),
            ..Default::default()
        };
        let above = SearchFilters {
            min_experience: Some(7.5),
            ..Default::default()
        };
        assert!(resume_matches(&at, &resume));
        assert!(!resume_matches(&above, &resume));
    }

    #[test]
    fn test_missing_metadata_fails_a_present_filter() {
        let resume = make_resume(None, None, vec![], vec![]);
        let domain = SearchFilters {
            domain: Some("fintech".to_string()),
            ..Default::default()
        };
        let experience = SearchFilters {
            min_experience: Some(1.0),
            ..Default::default()
        };
        assert!(!resume_matches(&domain, &resume));
        assert!(!resume_matches(&experience, &resume));
        // No filters at all: everything passes.
        assert!(resume_matches(&SearchFilters::default(), &resume));
    }
}
