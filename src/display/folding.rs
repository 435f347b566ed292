//! Long-line folding
//!
//! Shortens a line around its matched region so the hit stays visible,
//! translating match spans into the shortened text.

use crate::types::{FoldedLine, Span};

/// Default maximum display width in characters
pub const DEFAULT_FOLD_WIDTH: usize = 1000;
pub const DEFAULT_MARKER: &str = "...";

/// Fold `line_text` to at most `max_len` characters (markers included).
///
/// Spans are byte offsets into `line_text`; the returned spans are byte
/// offsets into `display_text`. Lines that fit, or when `fold_requested` is
/// false, are returned unchanged.
pub fn fold(
    line_text: &str,
    match_spans: &[Span],
    fold_requested: bool,
    max_len: usize,
    marker: &str,
) -> FoldedLine {
    let char_count = line_text.chars().count();
    if !fold_requested || char_count <= max_len {
        return FoldedLine {
            display_text: line_text.to_string(),
            was_folded: false,
            match_spans_in_display: match_spans.to_vec(),
        };
    }

    // byte offset of every char boundary, plus the end of the string
    let boundaries: Vec<usize> = line_text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(line_text.len()))
        .collect();
    let to_char = |byte: usize| boundaries.partition_point(|b| *b < byte);

    let marker_len = marker.chars().count();
    let (start, end) = window(
        char_count,
        match_spans
            .iter()
            .map(|(s, _)| to_char(*s))
            .min()
            .zip(match_spans.iter().map(|(_, e)| to_char(*e)).max()),
        max_len,
        marker_len,
    );

    let (start_byte, end_byte) = (boundaries[start], boundaries[end]);
    let prefix = if start > 0 { marker } else { "" };
    let suffix = if end < char_count { marker } else { "" };

    let display_text = format!("{}{}{}", prefix, &line_text[start_byte..end_byte], suffix);

    let match_spans_in_display = match_spans
        .iter()
        .filter_map(|(s, e)| {
            let s = (*s).clamp(start_byte, end_byte);
            let e = (*e).clamp(start_byte, end_byte);
            (s < e).then(|| (s - start_byte + prefix.len(), e - start_byte + prefix.len()))
        })
        .collect();

    FoldedLine {
        display_text,
        was_folded: true,
        match_spans_in_display,
    }
}

/// Character window `[start, end)` for a line of `len` chars.
///
/// Centres on `region` when there is one; a region near an edge slides the
/// window so the far side gets cut instead. Without a region the window
/// starts at zero. Room is reserved for a marker on every cut edge.
fn window(len: usize, region: Option<(usize, usize)>, max_len: usize, marker_len: usize) -> (usize, usize) {
    let Some((region_start, region_end)) = region else {
        return (0, max_len.saturating_sub(marker_len).max(1).min(len));
    };

    let width = max_len.saturating_sub(2 * marker_len).max(1);
    let region_len = region_end.saturating_sub(region_start);

    let mut start = if region_len >= width {
        region_start
    } else {
        region_start.saturating_sub((width - region_len) / 2)
    };
    let mut end = (start + width).min(len);
    if end - start < width {
        start = end.saturating_sub(width);
    }

    // a side that is not cut needs no marker, hand its room to the other side
    if start == 0 {
        end = (end + marker_len).min(len);
    } else if end == len {
        start = start.saturating_sub(marker_len);
    }

    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fold_default(line: &str, spans: &[Span]) -> FoldedLine {
        fold(line, spans, true, DEFAULT_FOLD_WIDTH, DEFAULT_MARKER)
    }

    #[test]
    fn test_short_line_passes_through() {
        let folded = fold_default("Call 123-456-7890 now", &[(5, 17)]);
        assert!(!folded.was_folded);
        assert_eq!(folded.display_text, "Call 123-456-7890 now");
        assert_eq!(folded.match_spans_in_display, vec![(5, 17)]);
    }

    #[test]
    fn test_fold_not_requested() {
        let line = "x".repeat(3000);
        let folded = fold(&line, &[], false, DEFAULT_FOLD_WIDTH, DEFAULT_MARKER);
        assert!(!folded.was_folded);
        assert_eq!(folded.display_text.len(), 3000);
    }

    #[test]
    fn test_match_near_end() {
        let mut line = "a".repeat(1990);
        line.push_str("HELLO");
        line.push_str(&"b".repeat(5));
        assert_eq!(line.len(), 2000);

        let folded = fold_default(&line, &[(1990, 1995)]);
        assert!(folded.was_folded);
        assert!(folded.display_text.chars().count() <= DEFAULT_FOLD_WIDTH);
        assert!(folded.display_text.starts_with("..."));
        assert!(folded.display_text.ends_with("HELLObbbbb"));

        let (s, e) = folded.match_spans_in_display[0];
        assert_eq!(&folded.display_text[s..e], "HELLO");
    }

    #[test]
    fn test_match_in_middle_cuts_both_sides() {
        let line = format!("{}NEEDLE{}", "a".repeat(1500), "b".repeat(1500));
        let folded = fold_default(&line, &[(1500, 1506)]);
        assert!(folded.display_text.starts_with("..."));
        assert!(folded.display_text.ends_with("..."));
        assert!(folded.display_text.chars().count() <= DEFAULT_FOLD_WIDTH);

        let (s, e) = folded.match_spans_in_display[0];
        assert_eq!(&folded.display_text[s..e], "NEEDLE");
        // roughly centred
        let before = s - 3;
        let after = folded.display_text.len() - 3 - e;
        assert!(before.abs_diff(after) <= 2);
    }

    #[test]
    fn test_context_line_folds_from_start() {
        let line = "c".repeat(1500);
        let folded = fold_default(&line, &[]);
        assert!(folded.was_folded);
        assert!(folded.display_text.starts_with("ccc"));
        assert!(folded.display_text.ends_with("..."));
        assert_eq!(folded.display_text.chars().count(), DEFAULT_FOLD_WIDTH);
    }

    #[test]
    fn test_folding_is_idempotent_for_folded_output() {
        let line = format!("{}NEEDLE{}", "a".repeat(1500), "b".repeat(1500));
        let once = fold_default(&line, &[(1500, 1506)]);
        let twice = fold_default(&once.display_text, &once.match_spans_in_display);
        assert!(!twice.was_folded);
        assert_eq!(twice.display_text, once.display_text);
        assert_eq!(twice.match_spans_in_display, once.match_spans_in_display);
    }

    #[test]
    fn test_multibyte_boundaries() {
        let line = format!("{}ＡＢＣ{}", "é".repeat(1200), "ü".repeat(1200));
        let start = "é".repeat(1200).len();
        let end = start + "ＡＢＣ".len();
        let folded = fold_default(&line, &[(start, end)]);

        assert!(folded.display_text.chars().count() <= DEFAULT_FOLD_WIDTH);
        let (s, e) = folded.match_spans_in_display[0];
        assert_eq!(&folded.display_text[s..e], "ＡＢＣ");
    }

    #[test]
    fn test_oversized_region_keeps_its_start() {
        let line = format!("{}{}", "a".repeat(100), "Z".repeat(2000));
        let folded = fold_default(&line, &[(100, 2100)]);
        assert!(folded.display_text.chars().count() <= DEFAULT_FOLD_WIDTH);
        let (s, e) = folded.match_spans_in_display[0];
        assert!(folded.display_text[s..e].chars().all(|c| c == 'Z'));
        assert_eq!(s, 3);
    }
}
