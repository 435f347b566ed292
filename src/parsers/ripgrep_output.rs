//! ripgrep output parser
//!
//! Expected shape (`--no-heading --with-filename --line-number --null`):
//!
//! ```text
//! path/to/file\012:matched line
//! path/to/file\013-context line
//! --
//! ```

use super::span_locator::SpanLocator;
use crate::error::{Result, SearchError};
use crate::types::{LineKind, RawMatch};
use std::collections::BTreeSet;

/// Marker ripgrep prints between non-contiguous context blocks
pub const GROUP_SEPARATOR: &[u8] = b"--";

/// Printed in place of matched lines when a searched file holds NUL bytes
const BINARY_NOTICE: &[u8] = b": binary file matches (";

/// Parse one output line.
///
/// `line_index` is the 1-based position in the output, used for error
/// reporting. Returns `Ok(None)` for separators and blank lines.
pub fn parse_line(line: &[u8], line_index: usize, locator: &SpanLocator) -> Result<Option<RawMatch>> {
    let line = strip_line_ending(line);
    if line.is_empty() || line == GROUP_SEPARATOR {
        return Ok(None);
    }
    if let Some(path) = binary_notice(line) {
        log::warn!(
            "Skipping binary file {} (output line {})",
            String::from_utf8_lossy(path),
            line_index
        );
        return Ok(None);
    }

    let nul = line
        .iter()
        .position(|b| *b == 0)
        .ok_or_else(|| parse_error(line_index, "missing path terminator"))?;
    let (path, rest) = (&line[..nul], &line[nul + 1..]);
    if path.is_empty() {
        return Err(parse_error(line_index, "empty file path"));
    }

    let digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return Err(parse_error(line_index, "missing line number"));
    }
    let line_number: u64 = std::str::from_utf8(&rest[..digits])
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|n| *n > 0)
        .ok_or_else(|| parse_error(line_index, "invalid line number"))?;

    let kind = match rest.get(digits) {
        Some(b':') => LineKind::Match,
        Some(b'-') => LineKind::Context,
        _ => return Err(parse_error(line_index, "missing field separator")),
    };

    let file_path = String::from_utf8_lossy(path).into_owned();
    let line_text = String::from_utf8_lossy(&rest[digits + 1..]).into_owned();

    let (match_spans, contributing_flow_indices) = match kind {
        LineKind::Match => {
            let located = locator.locate(&line_text);
            if located.0.is_empty() {
                log::warn!(
                    "Could not re-locate any variation in {}:{}",
                    file_path,
                    line_number
                );
            }
            located
        }
        LineKind::Context => (Vec::new(), BTreeSet::new()),
    };

    Ok(Some(RawMatch {
        file_path,
        line_number,
        line_text,
        match_spans,
        contributing_flow_indices,
        kind,
    }))
}

/// Path of a `PATH: binary file matches (...)` notice, if `line` is one.
fn binary_notice(line: &[u8]) -> Option<&[u8]> {
    let at = line
        .windows(BINARY_NOTICE.len())
        .position(|window| window == BINARY_NOTICE)?;
    let path = &line[..at];
    let path = path.strip_suffix(b"\0").unwrap_or(path);
    (!path.is_empty() && !path.contains(&0)).then_some(path)
}

/// Parse a complete ripgrep output buffer, preserving tool order.
pub fn parse(raw_output: &[u8], locator: &SpanLocator) -> Result<Vec<RawMatch>> {
    let mut records = Vec::new();
    for (index, line) in raw_output.split(|b| *b == b'\n').enumerate() {
        if let Some(record) = parse_line(line, index + 1, locator)? {
            records.push(record);
        }
    }
    log::debug!("Parsed {} records from ripgrep output", records.len());
    Ok(records)
}

fn strip_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn parse_error(line: usize, reason: &str) -> SearchError {
    SearchError::ParseError {
        line,
        reason: reason.to_string(),
    }
}
