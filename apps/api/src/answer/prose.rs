//! Prose-leaning dialects: section-delimited candidate blocks, numbered
//! lists, and the negative-result fallback. Also home of the label-prefix
//! matching shared with the tagged-block dialect.

use std::sync::OnceLock;

use regex::Regex;

use crate::answer::{CandidateRecord, NormalizedResponse, ParsedBlock, RelevanceTier};

const NO_DIRECT_MATCH_JUSTIFICATION: &str =
    "No direct match for the searched name; showing the closest similar profile.";

// ────────────────────────────────────────────────────────────────────────────
// Label-prefix field extraction
// ────────────────────────────────────────────────────────────────────────────

/// Extracts the value of a labeled line such as `**Skills**: Python, Go`,
/// `- Key Skills: Python`, or `Relevance Score: High`, matching any of the
/// given label aliases case-insensitively.
pub(crate) fn label_value<'a>(line: &'a str, labels: &[&str]) -> Option<&'a str> {
    let rest = line
        .trim_start()
        .trim_start_matches(|c: char| matches!(c, '-' | '•'))
        .trim_start();
    let rest = rest.strip_prefix("**").unwrap_or(rest);

    for label in labels {
        let Some(head) = rest.get(..label.len()) else {
            continue;
        };
        if !head.eq_ignore_ascii_case(label) {
            continue;
        }
        let after = &rest[label.len()..];
        let after = after.strip_prefix("**").unwrap_or(after).trim_start();
        if let Some(value) = after.strip_prefix(':') {
            let value = value
                .trim()
                .trim_start_matches("**")
                .trim_end_matches("**")
                .trim();
            return Some(value);
        }
    }
    None
}

/// Splits a skills-style enumeration on commas, semicolons, and "and".
pub(crate) fn split_list(value: &str) -> Vec<String> {
    value
        .split(|c: char| matches!(c, ',' | ';' | '|'))
        .flat_map(|part| part.split(" and "))
        .map(|part| {
            part.trim()
                .trim_matches(|c: char| matches!(c, '*' | '.' | ' '))
                .to_string()
        })
        .filter(|part| !part.is_empty())
        .collect()
}

/// Applies one labeled detail line to a record. First value wins per field.
pub(crate) fn apply_labeled_line(record: &mut CandidateRecord, line: &str) -> bool {
    if let Some(value) = label_value(line, &["current role", "role", "title", "position"]) {
        if record.role.is_none() && !value.is_empty() {
            record.role = Some(value.to_string());
        }
        return true;
    }
    if let Some(value) = label_value(line, &["current company", "company", "employer"]) {
        if record.company.is_none() && !value.is_empty() {
            record.company = Some(value.to_string());
        }
        return true;
    }
    if let Some(value) = label_value(line, &["key skills", "top skills", "skills"]) {
        if record.skills.is_empty() {
            record.skills = split_list(value);
        }
        return true;
    }
    if let Some(value) = label_value(line, &["years of experience", "experience"]) {
        if record.experience.is_none() && !value.is_empty() {
            record.experience = Some(value.to_string());
        }
        return true;
    }
    if let Some(value) = label_value(line, &["relevance score", "relevance", "match", "fit"]) {
        if record.relevance.is_none() {
            record.relevance = RelevanceTier::parse(value);
        }
        return true;
    }
    if let Some(value) = label_value(line, &["why relevant", "justification", "reason", "why"]) {
        if record.justification.is_none() && !value.is_empty() {
            record.justification = Some(value.to_string());
        }
        return true;
    }
    false
}

pub(crate) fn strip_markup(value: &str) -> String {
    value
        .trim()
        .trim_matches(|c: char| matches!(c, '*' | '_' | '#' | ' '))
        .to_string()
}

// ────────────────────────────────────────────────────────────────────────────
// Dialect 3: section-delimited prose
// ────────────────────────────────────────────────────────────────────────────

/// Blocks separated by horizontal rules, each starting with a
/// `### Candidate …` heading. Every field is optional except the name.
pub(crate) fn parse_candidate_sections(raw: &str) -> Option<NormalizedResponse> {
    let mut sections: Vec<Vec<&str>> = vec![Vec::new()];
    for line in raw.lines() {
        if is_horizontal_rule(line) {
            sections.push(Vec::new());
        } else if let Some(last) = sections.last_mut() {
            last.push(line);
        }
    }

    let mut blocks = Vec::new();
    let mut found = false;
    for section in sections {
        let body = section.join("\n");
        let body = body.trim();
        if body.is_empty() {
            continue;
        }
        match parse_candidate_section(body) {
            Some(record) => {
                found = true;
                blocks.push(ParsedBlock::Candidate(record));
            }
            None => blocks.push(ParsedBlock::Text(body.to_string())),
        }
    }

    if !found {
        return None;
    }
    Some(NormalizedResponse::from_blocks(blocks))
}

fn parse_candidate_section(body: &str) -> Option<CandidateRecord> {
    let mut lines = body.lines();
    let heading = lines.next()?.trim();
    let remainder = candidate_heading_re()
        .captures(heading)
        .map(|caps| strip_markup(caps.get(1).map_or("", |m| m.as_str())))?;

    let mut record = CandidateRecord::new(String::new());
    for line in lines {
        apply_labeled_line(&mut record, line);
    }

    record.name = if remainder.is_empty() {
        // Heading carried no name — look for a labeled one.
        body.lines()
            .find_map(|line| label_value(line, &["candidate name", "name"]))
            .map(strip_markup)?
    } else {
        remainder
    };
    if record.name.is_empty() {
        return None;
    }
    Some(record)
}

fn is_horizontal_rule(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 3
        && (trimmed.chars().all(|c| c == '-')
            || trimmed.chars().all(|c| c == '*')
            || trimmed.chars().all(|c| c == '_'))
}

fn candidate_heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^#{2,4}\s*Candidate\b[\s\d]*[:.\-–]?\s*(.*)$").expect("static regex")
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Dialect 4: numbered list
// ────────────────────────────────────────────────────────────────────────────

/// Items like `1. Jane Doe - Senior Engineer` followed by labeled detail
/// lines (Why relevant / Key Skills / Experience / Relevance Score).
pub(crate) fn parse_numbered_list(raw: &str) -> Option<NormalizedResponse> {
    let mut blocks: Vec<ParsedBlock> = Vec::new();
    let mut preamble: Vec<&str> = Vec::new();
    let mut current: Option<(CandidateRecord, bool)> = None; // (record, saw_detail)

    for line in raw.lines() {
        if let Some(first_line) = numbered_item_re()
            .captures(line)
            .and_then(|caps| caps.get(1))
        {
            finalize_item(&mut blocks, current.take());
            current = start_item(first_line.as_str());
            continue;
        }
        match current.as_mut() {
            Some((record, saw_detail)) => {
                if apply_labeled_line(record, line) {
                    *saw_detail = true;
                }
            }
            None => preamble.push(line),
        }
    }
    finalize_item(&mut blocks, current.take());

    if !blocks
        .iter()
        .any(|b| matches!(b, ParsedBlock::Candidate(_)))
    {
        return None;
    }

    let preamble = preamble.join("\n");
    let preamble = preamble.trim();
    if !preamble.is_empty() {
        blocks.insert(0, ParsedBlock::Text(preamble.to_string()));
    }
    Some(NormalizedResponse::from_blocks(blocks))
}

fn start_item(first_line: &str) -> Option<(CandidateRecord, bool)> {
    let (name_part, role_part) = match first_line.split_once(" - ") {
        Some((name, role)) => (name, Some(role)),
        None => (first_line, None),
    };
    let name = strip_markup(name_part);
    // Items that look like instructions or labels are not candidates.
    if name.is_empty() || name.len() > 80 || name.contains(':') {
        return None;
    }
    let mut record = CandidateRecord::new(name);
    record.role = role_part.map(strip_markup).filter(|r| !r.is_empty());
    Some((record, false))
}

fn finalize_item(blocks: &mut Vec<ParsedBlock>, item: Option<(CandidateRecord, bool)>) {
    if let Some((record, saw_detail)) = item {
        // A bare numbered line with no role and no details is ordinary prose,
        // not a candidate.
        if record.role.is_some() || saw_detail {
            blocks.push(ParsedBlock::Candidate(record));
        }
    }
}

fn numbered_item_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\d{1,3}[.)]\s+(.+)$").expect("static regex"))
}

// ────────────────────────────────────────────────────────────────────────────
// Dialect 5: negative-result fallback
// ────────────────────────────────────────────────────────────────────────────

/// The generator found no candidate by the searched name but still described
/// a similar profile. Synthesizes one low-confidence record from whatever
/// skill/experience/relevance mentions the prose carries.
pub(crate) fn parse_negative_result(raw: &str) -> Option<NormalizedResponse> {
    let caps = negative_name_re().captures(raw)?;
    let name = strip_markup(caps.get(1).map_or("", |m| m.as_str()));
    if name.is_empty() {
        return None;
    }

    // Without a descriptive remainder there is nothing to synthesize from.
    let matched = caps.get(0).map_or(0..0, |m| m.range());
    let remainder_words = raw[..matched.start]
        .split_whitespace()
        .count()
        + raw[matched.end..].split_whitespace().count();
    if remainder_words < 5 {
        return None;
    }

    let mut record = CandidateRecord::new(name);
    record.skills = scrape_skills(raw);
    record.experience = scrape_experience(raw);
    record.relevance = Some(scrape_relevance(raw).unwrap_or(RelevanceTier::Medium));
    record.justification = Some(NO_DIRECT_MATCH_JUSTIFICATION.to_string());

    Some(NormalizedResponse::from_blocks(vec![
        ParsedBlock::Candidate(record),
        ParsedBlock::Info(raw.trim().to_string()),
    ]))
}

fn scrape_skills(raw: &str) -> Vec<String> {
    skills_mention_re()
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| split_list(m.as_str()))
        .unwrap_or_default()
}

fn scrape_experience(raw: &str) -> Option<String> {
    experience_mention_re()
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

fn scrape_relevance(raw: &str) -> Option<RelevanceTier> {
    relevance_mention_re()
        .captures(raw)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
        .and_then(|m| RelevanceTier::parse(m.as_str()))
}

fn negative_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)no\s+candidates?\s+named\s+["'“”]([^"'“”]+)["'“”]"#)
            .expect("static regex")
    })
}

fn skills_mention_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)skills?\s+(?:like|such as|including|in)\s+(.+?)(?:\s+(?:was|were|is|are|has|have|had)\b|[.!?\n]|$)",
        )
        .expect("static regex")
    })
}

fn experience_mention_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(\d+\+?\s*(?:years?|yrs)\b[^.!?\n]{0,40})").expect("static regex")
    })
}

fn relevance_mention_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(high|medium|low)\b[\s-]*(?:relevance|match|fit|confidence)|(?:relevance|match|fit)[^.!?\n]{0,15}?\b(high|medium|low)\b",
        )
        .expect("static regex")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_value_handles_bold_variants() {
        assert_eq!(
            label_value("**Skills**: Python, Go", &["skills"]),
            Some("Python, Go")
        );
        assert_eq!(
            label_value("**Skills:** Python", &["skills"]),
            Some("Python")
        );
        assert_eq!(
            label_value("- Key Skills: Rust", &["key skills", "skills"]),
            Some("Rust")
        );
        assert_eq!(label_value("Skills Python", &["skills"]), None);
        assert_eq!(label_value("", &["skills"]), None);
    }

    #[test]
    fn test_split_list_variants() {
        assert_eq!(split_list("Python, Django"), vec!["Python", "Django"]);
        assert_eq!(split_list("Go and SQL"), vec!["Go", "SQL"]);
        assert_eq!(
            split_list("Rust; Kubernetes | AWS"),
            vec!["Rust", "Kubernetes", "AWS"]
        );
        assert!(split_list("  ,  ; ").is_empty());
    }

    #[test]
    fn test_candidate_sections_dialect() {
        let raw = "Here are the matches.\n\
                   ---\n\
                   ### Candidate 1: Jane Doe\n\
                   **Role**: Senior Engineer\n\
                   **Skills**: Rust, Go\n\
                   **Relevance**: High\n\
                   ---\n\
                   ### Candidate 2: John Smith\n\
                   **Why Relevant**: Led two fintech launches\n";
        let response = parse_candidate_sections(raw).unwrap();
        assert!(response.structured);
        assert_eq!(response.candidates.len(), 2);
        assert_eq!(response.candidates[0].name, "Jane Doe");
        assert_eq!(response.candidates[0].role.as_deref(), Some("Senior Engineer"));
        assert_eq!(response.candidates[0].skills, vec!["Rust", "Go"]);
        assert_eq!(response.candidates[0].relevance, Some(RelevanceTier::High));
        assert_eq!(response.candidates[1].name, "John Smith");
        assert_eq!(
            response.candidates[1].justification.as_deref(),
            Some("Led two fintech launches")
        );
        // Preamble survives as a prose block.
        assert!(matches!(&response.blocks[0], ParsedBlock::Text(t) if t.contains("matches")));
    }

    #[test]
    fn test_candidate_sections_tolerate_missing_fields() {
        let raw = "---\n### Candidate: Ada\n---";
        let response = parse_candidate_sections(raw).unwrap();
        assert_eq!(response.candidates.len(), 1);
        assert_eq!(response.candidates[0].name, "Ada");
        assert!(response.candidates[0].skills.is_empty());
    }

    #[test]
    fn test_candidate_sections_require_a_candidate_heading() {
        assert!(parse_candidate_sections("Just some prose\n---\nmore prose").is_none());
    }

    #[test]
    fn test_numbered_list_extracts_labeled_details() {
        let raw = "1. Jane Doe - Senior Engineer\n\
                   Why relevant: 6 years Python\n\
                   Key Skills: Python, Django\n\
                   Experience: 6 years\n\
                   Relevance Score: High";
        let response = parse_numbered_list(raw).unwrap();
        assert_eq!(response.candidates.len(), 1);
        let record = &response.candidates[0];
        assert_eq!(record.name, "Jane Doe");
        assert_eq!(record.role.as_deref(), Some("Senior Engineer"));
        assert_eq!(record.skills, vec!["Python", "Django"]);
        assert_eq!(record.experience.as_deref(), Some("6 years"));
        assert_eq!(record.relevance, Some(RelevanceTier::High));
        assert_eq!(record.justification.as_deref(), Some("6 years Python"));
    }

    #[test]
    fn test_numbered_list_rejects_plain_enumerations() {
        let raw = "Steps to follow:\n1. Review the résumés\n2. Shortlist three people";
        assert!(parse_numbered_list(raw).is_none());
    }

    #[test]
    fn test_negative_result_synthesizes_single_profile() {
        let raw = "No Candidates Named \"Amit Shah\" Found. However, a similar profile \
                   with skills like Go and SQL was located.";
        let response = parse_negative_result(raw).unwrap();
        assert_eq!(response.candidates.len(), 1);
        let record = &response.candidates[0];
        assert_eq!(record.name, "Amit Shah");
        assert!(record.skills.contains(&"Go".to_string()));
        assert!(record.skills.contains(&"SQL".to_string()));
        assert_eq!(record.relevance, Some(RelevanceTier::Medium));
        assert!(record
            .justification
            .as_deref()
            .unwrap()
            .contains("No direct match"));
    }

    #[test]
    fn test_negative_result_without_summary_does_not_fire() {
        assert!(parse_negative_result("No candidates named \"X Y\" found.").is_none());
    }

    #[test]
    fn test_negative_result_scrapes_experience_and_relevance() {
        let raw = "No candidate named \"Maria Cruz\" was found in the pool. A nearby \
                   profile offers 8+ years of backend work and a high relevance match.";
        let response = parse_negative_result(raw).unwrap();
        let record = &response.candidates[0];
        assert!(record.experience.as_deref().unwrap().starts_with("8+ years"));
        assert_eq!(record.relevance, Some(RelevanceTier::High));
    }

    #[test]
    fn test_horizontal_rule_detection() {
        assert!(is_horizontal_rule("---"));
        assert!(is_horizontal_rule("  ****  "));
        assert!(is_horizontal_rule("_____"));
        assert!(!is_horizontal_rule("--"));
        assert!(!is_horizontal_rule("- item"));
    }
}
