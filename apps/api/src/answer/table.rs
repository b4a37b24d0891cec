//! Markdown-table dialect: a pipe-delimited table whose header row carries
//! Name and Skills columns. Body rows map to candidate records by the column
//! positions found in the header.

use crate::answer::prose::{split_list, strip_markup};
use crate::answer::{CandidateRecord, NormalizedResponse, ParsedBlock, RelevanceTier};

struct ColumnMap {
    name: usize,
    role: Option<usize>,
    company: Option<usize>,
    skills: usize,
    experience: Option<usize>,
    relevance: Option<usize>,
    justification: Option<usize>,
}

pub(crate) fn parse_markdown_table(raw: &str) -> Option<NormalizedResponse> {
    let lines: Vec<&str> = raw.lines().collect();
    let (start, end, records) = find_table(&lines)?;

    let mut blocks = Vec::new();
    let before = lines[..start].join("\n");
    let before = before.trim();
    if !before.is_empty() {
        blocks.push(ParsedBlock::Text(before.to_string()));
    }
    blocks.push(ParsedBlock::Table(records));
    let after = lines[end..].join("\n");
    let after = after.trim();
    if !after.is_empty() {
        blocks.push(ParsedBlock::Text(after.to_string()));
    }
    Some(NormalizedResponse::from_blocks(blocks))
}

/// Extracts candidate records from the first qualifying table in `text`.
/// Used directly for `### TABLE:` segments of the tagged dialect.
pub(crate) fn extract_table_records(text: &str) -> Option<Vec<CandidateRecord>> {
    let lines: Vec<&str> = text.lines().collect();
    find_table(&lines).map(|(_, _, records)| records)
}

/// Returns (header line index, one-past-last table line index, records).
fn find_table(lines: &[&str]) -> Option<(usize, usize, Vec<CandidateRecord>)> {
    for (i, line) in lines.iter().enumerate() {
        if !line.contains('|') {
            continue;
        }
        let Some(columns) = map_columns(&split_row(line)) else {
            continue;
        };

        let mut records = Vec::new();
        let mut end = i + 1;
        for row_line in &lines[i + 1..] {
            if !row_line.contains('|') {
                break;
            }
            end += 1;
            let cells = split_row(row_line);
            if is_separator_row(&cells) {
                continue;
            }
            if let Some(record) = row_to_record(&columns, &cells) {
                records.push(record);
            }
        }

        if records.is_empty() {
            continue;
        }
        return Some((i, end, records));
    }
    None
}

fn map_columns(headers: &[String]) -> Option<ColumnMap> {
    let lowered: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();
    let find = |needles: &[&str]| {
        lowered
            .iter()
            .position(|h| needles.iter().any(|needle| h.contains(needle)))
    };

    let name = find(&["name"])?;
    let skills = find(&["skill"])?;
    Some(ColumnMap {
        name,
        role: find(&["role", "title", "position"]),
        company: find(&["company", "employer"]),
        skills,
        experience: find(&["experience", "years"]),
        relevance: find(&["relevance", "match", "score"]),
        justification: find(&["justification", "why", "reason"]),
    })
}

fn row_to_record(columns: &ColumnMap, cells: &[String]) -> Option<CandidateRecord> {
    let cell = |idx: usize| cells.get(idx).map(|c| strip_markup(c)).unwrap_or_default();
    let optional = |idx: Option<usize>| {
        idx.map(|i| cell(i)).filter(|v| !v.is_empty())
    };

    let name = cell(columns.name);
    if name.is_empty() {
        return None;
    }
    let mut record = CandidateRecord::new(name);
    record.role = optional(columns.role);
    record.company = optional(columns.company);
    record.skills = split_list(&cell(columns.skills));
    record.experience = optional(columns.experience);
    record.relevance = optional(columns.relevance).and_then(|v| RelevanceTier::parse(&v));
    record.justification = optional(columns.justification);
    Some(record)
}

fn split_row(line: &str) -> Vec<String> {
    line.trim()
        .trim_start_matches('|')
        .trim_end_matches('|')
        .split('|')
        .map(|cell| cell.trim().to_string())
        .collect()
}

fn is_separator_row(cells: &[String]) -> bool {
    cells
        .iter()
        .all(|cell| !cell.is_empty() && cell.chars().all(|c| matches!(c, '-' | ':' | ' ')))
        || cells.iter().all(|cell| cell.is_empty())
}
