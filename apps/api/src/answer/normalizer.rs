//! The dialect cascade. Parsers are speculative and tried in a fixed
//! priority order; the first match wins. The tagged-block dialect leads
//! because the answer prompt explicitly instructs it, making it unambiguous
//! when the generator complies.

use crate::answer::prose::{
    apply_labeled_line, label_value, parse_candidate_sections, parse_negative_result,
    parse_numbered_list, strip_markup,
};
use crate::answer::table::{extract_table_records, parse_markdown_table};
use crate::answer::{CandidateRecord, NormalizedResponse, ParsedBlock};

/// Normalizes a raw generator answer into typed blocks and candidate records.
///
/// Total over any input: empty, whitespace, and adversarial unterminated
/// markdown all come back as a valid (possibly empty) result. The universal
/// fallback is "render as prose".
pub fn normalize(raw: &str) -> NormalizedResponse {
    if raw.trim().is_empty() {
        return NormalizedResponse::prose(raw);
    }

    parse_tagged_blocks(raw)
        .or_else(|| parse_markdown_table(raw))
        .or_else(|| parse_candidate_sections(raw))
        .or_else(|| parse_numbered_list(raw))
        .or_else(|| parse_negative_result(raw))
        .unwrap_or_else(|| NormalizedResponse::prose(raw))
}

// ────────────────────────────────────────────────────────────────────────────
// Dialect 1: tagged blocks
// ────────────────────────────────────────────────────────────────────────────

const RECOGNIZED_TAGS: &[&str] = &["CANDIDATE", "TABLE", "INFO", "JUSTIFICATION", "SUMMARY"];

struct Segment<'a> {
    /// (tag, header remainder, raw header line); `None` for the preamble.
    header: Option<(String, String, &'a str)>,
    lines: Vec<&'a str>,
}

/// Splits the response on `### <TAG>:` header markers and types each segment.
/// Matches only when at least one recognized tag is present; unrecognized
/// segments become opaque prose blocks.
fn parse_tagged_blocks(raw: &str) -> Option<NormalizedResponse> {
    let mut segments: Vec<Segment> = Vec::new();
    let mut current = Segment {
        header: None,
        lines: Vec::new(),
    };
    let mut any_recognized = false;

    for line in raw.lines() {
        if let Some((tag, remainder)) = header_line(line) {
            if RECOGNIZED_TAGS.contains(&tag.as_str()) {
                any_recognized = true;
            }
            segments.push(current);
            current = Segment {
                header: Some((tag, remainder, line)),
                lines: Vec::new(),
            };
        } else {
            current.lines.push(line);
        }
    }
    segments.push(current);

    if !any_recognized {
        return None;
    }

    let mut blocks: Vec<ParsedBlock> = Vec::new();
    for segment in segments {
        let body = segment.lines.join("\n");
        let body = body.trim();
        match segment.header {
            None => {
                if !body.is_empty() {
                    blocks.push(ParsedBlock::Text(body.to_string()));
                }
            }
            Some((tag, remainder, raw_line)) => match tag.as_str() {
                "CANDIDATE" => match parse_candidate_segment(&remainder, &segment.lines) {
                    Some(record) => blocks.push(ParsedBlock::Candidate(record)),
                    None => push_opaque(&mut blocks, raw_line, body),
                },
                "TABLE" => match extract_table_records(body) {
                    Some(records) => blocks.push(ParsedBlock::Table(records)),
                    None => push_opaque(&mut blocks, raw_line, body),
                },
                "INFO" | "SUMMARY" => {
                    blocks.push(ParsedBlock::Info(join_header_body(&remainder, body)));
                }
                "JUSTIFICATION" => attach_justification(&mut blocks, &remainder, body),
                _ => push_opaque(&mut blocks, raw_line, body),
            },
        }
    }

    Some(NormalizedResponse::from_blocks(blocks))
}

/// `### TAG: remainder` → (uppercased tag, remainder). Tags are short
/// alphabetic words — longer heading text is not a tag marker.
fn header_line(line: &str) -> Option<(String, String)> {
    let rest = line.trim().strip_prefix("###")?.trim_start();
    let (tag_part, remainder) = rest.split_once(':')?;
    let tag = tag_part.trim();
    if tag.is_empty() || tag.len() > 16 || !tag.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    Some((tag.to_uppercase(), remainder.trim().to_string()))
}

fn parse_candidate_segment(remainder: &str, lines: &[&str]) -> Option<CandidateRecord> {
    let mut record = CandidateRecord::new(String::new());
    for line in lines {
        apply_labeled_line(&mut record, line);
    }

    let name = if remainder.is_empty() {
        lines
            .iter()
            .find_map(|line| label_value(line, &["candidate name", "name"]))
            .map(strip_markup)?
    } else {
        strip_markup(remainder)
    };
    if name.is_empty() {
        return None;
    }
    record.name = name;
    Some(record)
}

/// A justification segment belongs to the closest preceding candidate that
/// does not already carry one; with no such candidate it stands alone.
fn attach_justification(blocks: &mut Vec<ParsedBlock>, remainder: &str, body: &str) {
    let content = join_header_body(remainder, body);
    if content.is_empty() {
        return;
    }
    let open_idx = blocks.iter().rposition(|block| {
        matches!(block, ParsedBlock::Candidate(record) if record.justification.is_none())
    });
    match open_idx {
        Some(idx) => {
            if let ParsedBlock::Candidate(record) = &mut blocks[idx] {
                record.justification = Some(content);
            }
        }
        None => blocks.push(ParsedBlock::Info(content)),
    }
}

fn push_opaque(blocks: &mut Vec<ParsedBlock>, raw_line: &str, body: &str) {
    let content = if body.is_empty() {
        raw_line.trim().to_string()
    } else {
        format!("{}\n{}", raw_line.trim(), body)
    };
    blocks.push(ParsedBlock::Text(content));
}

fn join_header_body(remainder: &str, body: &str) -> String {
    match (remainder.is_empty(), body.is_empty()) {
        (true, _) => body.to_string(),
        (_, true) => remainder.to_string(),
        _ => format!("{remainder}\n{body}"),
    }
}
