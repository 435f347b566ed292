//! Query expansion
//!
//! Turns one typed flow into the literal strings that must all be searched
//! for. Pure and deterministic.

use crate::error::{Result, SearchError};
use crate::types::{FlowType, QueryFlow, Variation};

/// Number of digits a phone query must normalise to
pub const PHONE_DIGITS: usize = 10;

/// Expand a flow's query according to its type.
pub fn generate(query: &str, flow_type: FlowType, flow_index: usize) -> Result<Vec<Variation>> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(SearchError::invalid_query(flow_index, "query is empty"));
    }

    match flow_type {
        FlowType::Generic | FlowType::Name | FlowType::Email => {
            Ok(vec![Variation::literal(trimmed, flow_index)])
        }
        FlowType::Phone => phone_variations(trimmed, flow_index),
    }
}

/// Expand a wire-level flow, rejecting unknown types.
pub fn generate_for_flow(flow: &QueryFlow, flow_index: usize) -> Result<Vec<Variation>> {
    let flow_type = flow
        .kind
        .parse::<FlowType>()
        .map_err(|reason| SearchError::invalid_query(flow_index, reason))?;
    generate(&flow.query, flow_type, flow_index)
}

/// Expand every flow of a request in order. Fails on the first bad flow.
pub fn generate_all(flows: &[QueryFlow]) -> Result<Vec<Variation>> {
    let mut variations = Vec::new();
    for (index, flow) in flows.iter().enumerate() {
        variations.extend(generate_for_flow(flow, index)?);
    }
    Ok(variations)
}

/// Strip everything that is not an ASCII digit.
pub fn normalize_digits(text: &str) -> String {
    text.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn phone_variations(query: &str, flow_index: usize) -> Result<Vec<Variation>> {
    let digits = normalize_digits(query);
    if digits.len() != PHONE_DIGITS {
        return Err(SearchError::invalid_query(
            flow_index,
            format!(
                "phone number must contain exactly {} digits, found {}",
                PHONE_DIGITS,
                digits.len()
            ),
        ));
    }

    let (area, rest) = digits.split_at(3);
    let (exchange, line) = rest.split_at(3);

    let formats = [
        digits.clone(),
        format!("{}-{}-{}", area, exchange, line),
        format!("{}.{}.{}", area, exchange, line),
        format!("({}) {}-{}", area, exchange, line),
        format!("({})-{}-{}", area, exchange, line),
    ];

    Ok(formats
        .into_iter()
        .map(|pattern| Variation::literal(pattern, flow_index))
        .collect())
}
