//! Command compiler
//!
//! Builds the ripgrep argument vector for a set of variations and renders the
//! same vector as a copy-pasteable preview. No I/O happens here.

use crate::config::EngineConfig;
use crate::error::{Result, SearchError};
use crate::types::{CompiledInvocation, Variation};
use std::collections::BTreeSet;

/// Path/context options that shape an invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    pub search_path: String,
    pub context: i64,
}

/// Escape a variation for ripgrep's regex syntax (literal ones only).
pub fn escape_variation(variation: &Variation) -> String {
    if variation.is_regex {
        variation.pattern.clone()
    } else {
        regex::escape(&variation.pattern)
    }
}

/// Combine every variation into one alternation.
///
/// Longer alternatives come first so the leftmost match covers the widest
/// form, e.g. `(123) 456-7890` before `456-7890`. Duplicates are dropped.
pub fn alternation(variations: &[Variation]) -> String {
    let mut escaped: Vec<String> = variations.iter().map(escape_variation).collect();
    escaped.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    escaped.dedup();
    escaped.join("|")
}

/// Resolve the context window, rejecting negatives and clamping large values.
pub fn resolve_context(context: i64, max_context: u32) -> Result<u32> {
    if context < 0 {
        return Err(SearchError::invalid_request(
            "context",
            format!("must be non-negative, got {}", context),
        ));
    }
    if context > max_context as i64 {
        log::warn!("Clamping context {} to {}", context, max_context);
        return Ok(max_context);
    }
    Ok(context as u32)
}

/// Compile variations into a single ripgrep invocation.
pub fn compile(
    variations: &[Variation],
    options: &CompileOptions,
    config: &EngineConfig,
) -> Result<CompiledInvocation> {
    if variations.is_empty() {
        return Err(SearchError::invalid_request(
            "queries",
            "at least one query flow is required",
        ));
    }

    let context = resolve_context(options.context, config.max_context)?;
    let search_path = if options.search_path.trim().is_empty() {
        ".".to_string()
    } else {
        options.search_path.clone()
    };

    let tool_args: Vec<String> = vec![
        "--no-config".to_string(),
        "--no-heading".to_string(),
        "--with-filename".to_string(),
        "--line-number".to_string(),
        "--null".to_string(),
        "--color".to_string(),
        "never".to_string(),
        "--ignore-case".to_string(),
        "--max-count".to_string(),
        config.max_count_per_file.to_string(),
        "--context".to_string(),
        context.to_string(),
        "--regexp".to_string(),
        alternation(variations),
        "--".to_string(),
        search_path,
    ];

    let preview_text = shell_words::join(
        std::iter::once(config.rg_binary.as_str()).chain(tool_args.iter().map(String::as_str)),
    );

    let flow_indices: BTreeSet<usize> = variations.iter().map(|v| v.origin_flow_index).collect();

    log::debug!("Compiled invocation: {}", preview_text);

    Ok(CompiledInvocation {
        program: config.rg_binary.clone(),
        tool_args,
        preview_text,
        flow_indices,
    })
}
