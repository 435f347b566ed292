//! Request / response data model shared by every stage of the search pipeline.
//!
//! Everything here is request-scoped: values are built while one request is
//! handled and dropped once its response has been produced.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Half-open `(start, end)` byte range inside a line.
pub type Span = (usize, usize);

/// Semantic type of a flow's query.
///
/// Each variant has exactly one expansion rule in [`crate::variations`], so a
/// new PII type only compiles once that rule exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowType {
    Generic,
    Name,
    Phone,
    Email,
}

impl FlowType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowType::Generic => "generic",
            FlowType::Name => "name",
            FlowType::Phone => "phone",
            FlowType::Email => "email",
        }
    }
}

impl std::str::FromStr for FlowType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "generic" => Ok(FlowType::Generic),
            "name" => Ok(FlowType::Name),
            "phone" => Ok(FlowType::Phone),
            "email" => Ok(FlowType::Email),
            other => Err(format!("unknown flow type '{}'", other)),
        }
    }
}

/// One user-submitted `(query, type)` pair.
///
/// `kind` stays a raw string on the wire so an unknown type surfaces as
/// `InvalidQuery` instead of a deserialisation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFlow {
    pub query: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl QueryFlow {
    pub fn new(query: impl Into<String>, kind: FlowType) -> Self {
        Self {
            query: query.into(),
            kind: kind.as_str().to_string(),
        }
    }
}

fn default_search_path() -> String {
    ".".to_string()
}

fn default_context() -> i64 {
    1
}

fn default_fold() -> bool {
    true
}

/// A complete search submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(rename = "queries")]
    pub flows: Vec<QueryFlow>,
    #[serde(default = "default_search_path")]
    pub search_path: String,
    /// Signed on purpose: a negative value must be rejected, not fail to parse.
    #[serde(default = "default_context")]
    pub context: i64,
    #[serde(default = "default_fold")]
    pub fold: bool,
}

impl SearchRequest {
    pub fn new(flows: Vec<QueryFlow>, search_path: impl Into<String>) -> Self {
        Self {
            flows,
            search_path: search_path.into(),
            context: default_context(),
            fold: default_fold(),
        }
    }

    pub fn with_context(mut self, context: i64) -> Self {
        self.context = context;
        self
    }

    pub fn with_fold(mut self, fold: bool) -> Self {
        self.fold = fold;
        self
    }
}

/// A concrete pattern derived from one flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variation {
    pub pattern: String,
    pub is_regex: bool,
    pub origin_flow_index: usize,
}

impl Variation {
    pub fn literal(pattern: impl Into<String>, origin_flow_index: usize) -> Self {
        Self {
            pattern: pattern.into(),
            is_regex: false,
            origin_flow_index,
        }
    }
}

/// Fully resolved external invocation plus its display form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledInvocation {
    pub program: String,
    pub tool_args: Vec<String>,
    pub preview_text: String,
    /// Flows this invocation searches for.
    pub flow_indices: BTreeSet<usize>,
}

/// Whether a line was reported as a hit or as surrounding context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    Match,
    Context,
}

/// One line reported by the search tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMatch {
    pub file_path: String,
    pub line_number: u64,
    pub line_text: String,
    pub match_spans: Vec<Span>,
    pub contributing_flow_indices: BTreeSet<usize>,
    pub kind: LineKind,
}

impl RawMatch {
    pub fn is_match(&self) -> bool {
        self.kind == LineKind::Match
    }
}

/// All lines reported for one file, ordered by line number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileGroup {
    pub file_path: String,
    pub matches: Vec<RawMatch>,
}

/// Display form of one line after optional folding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldedLine {
    pub display_text: String,
    pub was_folded: bool,
    pub match_spans_in_display: Vec<Span>,
}

/// A line as handed to a renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayLine {
    pub line_number: u64,
    pub kind: LineKind,
    pub contributing_flow_indices: BTreeSet<usize>,
    pub line: FoldedLine,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayGroup {
    pub file_path: String,
    pub lines: Vec<DisplayLine>,
}

/// Output of the "perform search" operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub groups: Vec<DisplayGroup>,
    pub total_matches: usize,
    pub variations: Vec<String>,
    #[serde(rename = "command_executed")]
    pub preview_text: String,
}

/// Output of the "preview only" operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewResponse {
    #[serde(rename = "command_executed")]
    pub preview_text: String,
}

/// Incremental search output, in emission order: one `Preview`, any number
/// of `Line`s, then exactly one of `Done` / `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum SearchEvent {
    Preview {
        command_executed: String,
        variations: Vec<String>,
    },
    Line {
        file_path: String,
        #[serde(flatten)]
        line: DisplayLine,
    },
    Done {
        total_matches: usize,
    },
    Failed {
        kind: &'static str,
        message: String,
    },
}

impl SearchEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SearchEvent::Done { .. } | SearchEvent::Failed { .. })
    }
}

/// Summary of what a search over `resolved_path` would scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathInfo {
    pub resolved_path: String,
    pub total_size_bytes: u64,
    pub file_count: u64,
    pub est_search_seconds: f64,
}
