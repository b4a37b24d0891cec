//! Text normalization and chunking for resume ingestion.
//!
//! Chunks target a 500–800 character band: paragraphs are packed greedily up
//! to the max, oversize paragraphs are split on sentence boundaries, and only
//! the final chunk of a document may fall short of the band. Concatenating
//! chunk texts in ordinal order reconstructs the normalized text modulo
//! joining whitespace — nothing is ever dropped.

pub const CHUNK_MAX_CHARS: usize = 800;
pub const CHUNK_MIN_CHARS: usize = 500;

/// Section tag used when no heading could be classified.
/// Downstream filtering never has to special-case a missing section.
pub const SECTION_GENERAL: &str = "general";

/// A chunk of normalized text plus its section classification.
#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    pub text: String,
    pub section: String,
}

/// Normalizes raw extracted text: unifies line endings, replaces NBSP,
/// strips trailing whitespace per line, and collapses blank-line runs so
/// paragraphs are separated by exactly one blank line.
pub fn normalize_text(raw: &str) -> String {
    let cleaned = raw
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\u{a0}', " ");

    let mut paragraphs: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in cleaned.lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join("\n"));
    }
    paragraphs.join("\n\n")
}

/// Splits normalized text into ordered chunks. Empty or whitespace-only
/// input yields zero chunks. A chunk never spans a section boundary; the
/// heading line itself belongs to the section it opens.
pub fn chunk_resume_text(normalized: &str) -> Vec<TextChunk> {
    if normalized.trim().is_empty() {
        return Vec::new();
    }

    let mut chunks: Vec<TextChunk> = Vec::new();
    let mut current = String::new();
    let mut section: &'static str = SECTION_GENERAL;

    for paragraph in normalized.split("\n\n") {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }

        let first_line = paragraph.lines().next().unwrap_or("");
        if let Some(next_section) = classify_section(first_line) {
            flush(&mut chunks, &mut current, section);
            section = next_section;
        }

        for unit in split_units(paragraph) {
            if !current.is_empty() && current.len() + 2 + unit.len() > CHUNK_MAX_CHARS {
                flush(&mut chunks, &mut current, section);
            }
            if !current.is_empty() {
                current.push_str("\n\n");
            }
            current.push_str(&unit);
        }
    }
    flush(&mut chunks, &mut current, section);

    chunks
}

fn flush(chunks: &mut Vec<TextChunk>, current: &mut String, section: &str) {
    if !current.trim().is_empty() {
        chunks.push(TextChunk {
            text: std::mem::take(current),
            section: section.to_string(),
        });
    } else {
        current.clear();
    }
}

/// Classifies a heading line into a resume section tag.
/// Returns `None` for anything that does not look like a short heading.
pub fn classify_section(line: &str) -> Option<&'static str> {
    let heading = line
        .trim()
        .trim_start_matches(|c: char| matches!(c, '#' | '*' | '-' | ' '))
        .trim_end_matches(|c: char| matches!(c, ':' | '*' | ' '));

    if heading.is_empty() || heading.len() > 40 || heading.split_whitespace().count() > 4 {
        return None;
    }

    let lowered = heading.to_lowercase();
    const KEYWORDS: &[(&str, &str)] = &[
        ("experience", "experience"),
        ("employment", "experience"),
        ("work history", "experience"),
        ("education", "education"),
        ("academic", "education"),
        ("skill", "skills"),
        ("technolog", "skills"),
        ("project", "projects"),
        ("certification", "certifications"),
        ("license", "certifications"),
        ("summary", "summary"),
        ("objective", "summary"),
        ("profile", "summary"),
        ("about", "summary"),
    ];
    KEYWORDS
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, section)| *section)
}

/// Breaks a paragraph into units that each fit the chunk band: whole
/// paragraph if small enough, otherwise sentence groups, hard-split as a
/// last resort for pathological unbroken runs.
fn split_units(paragraph: &str) -> Vec<String> {
    if paragraph.len() <= CHUNK_MAX_CHARS {
        return vec![paragraph.to_string()];
    }

    let mut units = Vec::new();
    let mut current = String::new();
    for sentence in split_sentences(paragraph) {
        if sentence.len() > CHUNK_MAX_CHARS {
            if !current.is_empty() {
                units.push(std::mem::take(&mut current));
            }
            let chars: Vec<char> = sentence.chars().collect();
            for piece in chars.chunks(CHUNK_MAX_CHARS) {
                units.push(piece.iter().collect());
            }
            continue;
        }
        if !current.is_empty() && current.len() + 1 + sentence.len() > CHUNK_MAX_CHARS {
            units.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(sentence);
    }
    if !current.is_empty() {
        units.push(current);
    }
    units
}

/// Splits on sentence-terminating punctuation followed by whitespace or EOF.
fn split_sentences(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if matches!(bytes[i], b'.' | b'!' | b'?') {
            let mut end = i + 1;
            while end < bytes.len() && matches!(bytes[end], b'.' | b'!' | b'?') {
                end += 1;
            }
            if end >= bytes.len() || bytes[end].is_ascii_whitespace() {
                let sentence = text[start..end].trim();
                if !sentence.is_empty() {
                    sentences.push(sentence);
                }
                start = end;
                i = end;
                continue;
            }
        }
        i += 1;
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collapse_whitespace(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_normalize_collapses_blank_runs_and_line_endings() {
        let raw = "Jane Doe\r\n\r\n\r\n\r\nSenior Engineer\t \nAcme Corp\u{a0}Inc";
        let normalized = normalize_text(raw);
        assert_eq!(normalized, "Jane Doe\n\nSenior Engineer\nAcme Corp Inc");
    }

    #[test]
    fn test_empty_and_whitespace_input_yield_zero_chunks() {
        assert!(chunk_resume_text("").is_empty());
        assert!(chunk_resume_text("   \n\n  \t ").is_empty());
        assert!(chunk_resume_text(&normalize_text("  \r\n \r\n ")).is_empty());
    }

    #[test]
    fn test_chunks_stay_within_max_and_round_trip() {
        let sentence = "Led the migration of a payments platform onto new rails. ";
        let long_text = normalize_text(&sentence.repeat(60));
        let chunks = chunk_resume_text(&long_text);

        assert!(chunks.len() > 1, "expected multiple chunks");
        for chunk in &chunks {
            assert!(
                chunk.text.len() <= CHUNK_MAX_CHARS,
                "chunk of {} chars exceeds band",
                chunk.text.len()
            );
        }
        // Non-final chunks stay within the band's lower bound too.
        for chunk in &chunks[..chunks.len() - 1] {
            assert!(
                chunk.text.len() >= CHUNK_MIN_CHARS,
                "non-final chunk of {} chars is below band",
                chunk.text.len()
            );
        }

        let reassembled = chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(
            collapse_whitespace(&reassembled),
            collapse_whitespace(&long_text),
            "concatenated chunks must reconstruct the normalized text"
        );
    }

    #[test]
    fn test_round_trip_with_sections_and_paragraphs() {
        let text = normalize_text(
            "Summary\n\nSeasoned backend engineer.\n\nExperience\n\nBuilt the billing \
             system at Acme.\n\nSkills\n\nRust, Go, SQL",
        );
        let chunks = chunk_resume_text(&text);
        let reassembled = chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(collapse_whitespace(&reassembled), collapse_whitespace(&text));
    }

    #[test]
    fn test_sections_follow_headings_and_default_to_general() {
        let text = normalize_text(
            "Jane Doe, Berlin\n\nProfessional Experience\n\nBuilt things at Acme.\n\n\
             Technical Skills\n\nRust, Python, Kubernetes",
        );
        let chunks = chunk_resume_text(&text);
        let sections: Vec<&str> = chunks.iter().map(|c| c.section.as_str()).collect();
        assert_eq!(sections, vec!["general", "experience", "skills"]);
    }

    #[test]
    fn test_chunk_never_spans_section_boundary() {
        let text = normalize_text("Experience\n\nShort entry.\n\nEducation\n\nBSc somewhere.");
        let chunks = chunk_resume_text(&text);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].section, "experience");
        assert!(chunks[0].text.contains("Short entry"));
        assert_eq!(chunks[1].section, "education");
    }

    #[test]
    fn test_classify_section_keywords() {
        assert_eq!(classify_section("EXPERIENCE"), Some("experience"));
        assert_eq!(classify_section("## Work History:"), Some("experience"));
        assert_eq!(classify_section("Technical Skills"), Some("skills"));
        assert_eq!(classify_section("Technologies & Tools"), Some("skills"));
        assert_eq!(classify_section("Certifications"), Some("certifications"));
        assert_eq!(classify_section("Career Objective"), Some("summary"));
    }

    #[test]
    fn test_classify_section_rejects_prose_lines() {
        // Sentence-length lines mentioning a keyword are not headings.
        assert_eq!(
            classify_section("Gained experience building fintech systems at scale"),
            None
        );
        assert_eq!(classify_section("Hired in 2019"), None);
        assert_eq!(classify_section(""), None);
    }

    #[test]
    fn test_oversize_unbroken_run_is_hard_split() {
        let blob = "x".repeat(2_000);
        let chunks = chunk_resume_text(&blob);
        assert!(chunks.len() >= 3);
        for chunk in &chunks {
            assert!(chunk.text.len() <= CHUNK_MAX_CHARS);
        }
        let total: usize = chunks.iter().map(|c| c.text.len()).sum();
        assert_eq!(total, 2_000);
    }

    #[test]
    fn test_split_sentences_keeps_terminators() {
        let sentences = split_sentences("Shipped v1. Scaled to 1M users! Next?");
        assert_eq!(
            sentences,
            vec!["Shipped v1.", "Scaled to 1M users!", "Next?"]
        );
    }
}
