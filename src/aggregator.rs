//! Groups parsed records per file and prepares them for display.

use crate::display::fold;
use crate::parsers::merge_spans;
use crate::types::{DisplayGroup, DisplayLine, FileGroup, LineKind, RawMatch};
use std::collections::HashMap;

/// Group records by file.
///
/// Files keep the order in which they first appear (the tool's traversal
/// order); lines inside a file are sorted by line number. Records for the same
/// `(file, line)` are merged into one.
pub fn aggregate(matches: Vec<RawMatch>) -> Vec<FileGroup> {
    let mut groups: Vec<FileGroup> = Vec::new();
    let mut group_index: HashMap<String, usize> = HashMap::new();
    let mut line_index: Vec<HashMap<u64, usize>> = Vec::new();

    for record in matches {
        let gi = *group_index.entry(record.file_path.clone()).or_insert_with(|| {
            groups.push(FileGroup {
                file_path: record.file_path.clone(),
                matches: Vec::new(),
            });
            line_index.push(HashMap::new());
            groups.len() - 1
        });

        let group = &mut groups[gi];
        let existing = line_index[gi].get(&record.line_number).copied();
        match existing {
            Some(li) => merge_into(&mut group.matches[li], record),
            None => {
                line_index[gi].insert(record.line_number, group.matches.len());
                group.matches.push(record);
            }
        }
    }

    for group in &mut groups {
        group.matches.sort_by_key(|m| m.line_number);
    }
    groups
}

fn merge_into(existing: &mut RawMatch, other: RawMatch) {
    existing
        .contributing_flow_indices
        .extend(other.contributing_flow_indices);
    let mut spans = std::mem::take(&mut existing.match_spans);
    spans.extend(other.match_spans);
    existing.match_spans = merge_spans(spans);
    if other.kind == LineKind::Match {
        existing.kind = LineKind::Match;
    }
}

/// Turn file groups into display groups, folding long lines when asked.
pub fn fold_groups(
    groups: Vec<FileGroup>,
    fold_requested: bool,
    max_len: usize,
    marker: &str,
) -> Vec<DisplayGroup> {
    groups
        .into_iter()
        .map(|group| DisplayGroup {
            file_path: group.file_path,
            lines: group
                .matches
                .into_iter()
                .map(|m| display_line(m, fold_requested, max_len, marker))
                .collect(),
        })
        .collect()
}

pub fn display_line(record: RawMatch, fold_requested: bool, max_len: usize, marker: &str) -> DisplayLine {
    DisplayLine {
        line_number: record.line_number,
        kind: record.kind,
        line: fold(&record.line_text, &record.match_spans, fold_requested, max_len, marker),
        contributing_flow_indices: record.contributing_flow_indices,
    }
}
