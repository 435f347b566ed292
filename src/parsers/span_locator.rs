//! Re-locates variation text inside a reported line.
//!
//! ripgrep's plain output only says *that* a line matched. The locator finds
//! *where*, and which flows are responsible, without another pass over the
//! corpus.

use crate::compiler::alternation;
use crate::error::{Result, SearchError};
use crate::types::{Span, Variation};
use regex::{Regex, RegexBuilder};
use std::collections::{BTreeMap, BTreeSet};

/// Case-insensitive matcher per flow
#[derive(Debug, Clone)]
pub struct SpanLocator {
    flows: Vec<(usize, Regex)>,
}

impl SpanLocator {
    pub fn new(variations: &[Variation]) -> Result<Self> {
        let mut by_flow: BTreeMap<usize, Vec<Variation>> = BTreeMap::new();
        for variation in variations {
            by_flow
                .entry(variation.origin_flow_index)
                .or_default()
                .push(variation.clone());
        }

        let mut flows = Vec::with_capacity(by_flow.len());
        for (flow_index, flow_variations) in by_flow {
            let regex = RegexBuilder::new(&alternation(&flow_variations))
                .case_insensitive(true)
                .build()
                .map_err(|e| SearchError::invalid_query(flow_index, e.to_string()))?;
            flows.push((flow_index, regex));
        }

        Ok(Self { flows })
    }

    /// Spans of every flow's occurrences in `line`, merged, plus the flows
    /// that produced them.
    pub fn locate(&self, line: &str) -> (Vec<Span>, BTreeSet<usize>) {
        let mut spans = Vec::new();
        let mut contributing = BTreeSet::new();

        for (flow_index, regex) in &self.flows {
            let before = spans.len();
            spans.extend(
                regex
                    .find_iter(line)
                    .filter(|m| m.start() < m.end())
                    .map(|m| (m.start(), m.end())),
            );
            if spans.len() > before {
                contributing.insert(*flow_index);
            }
        }

        (merge_spans(spans), contributing)
    }
}

/// Sort spans and union the ones that overlap.
pub fn merge_spans(mut spans: Vec<Span>) -> Vec<Span> {
    spans.sort_unstable();
    let mut merged: Vec<Span> = Vec::with_capacity(spans.len());
    for (start, end) in spans {
        match merged.last_mut() {
            Some(last) if start < last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}
