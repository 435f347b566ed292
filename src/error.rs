use std::time::Duration;

/// Result type for search operations
pub type Result<T> = std::result::Result<T, SearchError>;

/// Search error types
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Invalid query in flow {flow_index}: {reason}")]
    InvalidQuery { flow_index: usize, reason: String },

    #[error("Invalid request field '{field}': {reason}")]
    InvalidRequest { field: &'static str, reason: String },

    #[error("Search tool not found: {binary}")]
    ToolNotFound { binary: String },

    #[error("Search timed out after {}ms", .elapsed.as_millis())]
    Timeout { elapsed: Duration },

    #[error("Search cancelled")]
    Cancelled,

    #[error("Search tool failed (exit status {status:?}): {stderr}")]
    ExecutionFailed { status: Option<i32>, stderr: String },

    #[error("Unexpected tool output at line {line}: {reason}")]
    ParseError { line: usize, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SearchError {
    pub fn invalid_query(flow_index: usize, reason: impl Into<String>) -> Self {
        Self::InvalidQuery {
            flow_index,
            reason: reason.into(),
        }
    }

    pub fn invalid_request(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            field,
            reason: reason.into(),
        }
    }

    /// Stable machine-readable name, used by the CLI and stream events.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidQuery { .. } => "invalid_query",
            Self::InvalidRequest { .. } => "invalid_request",
            Self::ToolNotFound { .. } => "tool_not_found",
            Self::Timeout { .. } => "timeout",
            Self::Cancelled => "cancelled",
            Self::ExecutionFailed { .. } => "execution_failed",
            Self::ParseError { .. } => "parse_error",
            Self::Io(_) => "io",
        }
    }

    /// Errors raised before anything is spawned.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidQuery { .. } | Self::InvalidRequest { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_detail() {
        let err = SearchError::invalid_request("context", "must be non-negative, got -1");
        assert_eq!(
            err.to_string(),
            "Invalid request field 'context': must be non-negative, got -1"
        );
        assert!(err.is_validation());

        let err = SearchError::ExecutionFailed {
            status: Some(2),
            stderr: "rg: /nope: No such file or directory".to_string(),
        };
        assert!(err.to_string().contains("No such file"));
        assert_eq!(err.kind(), "execution_failed");
        assert!(!err.is_validation());
    }

    #[test]
    fn test_timeout_message() {
        let err = SearchError::Timeout {
            elapsed: Duration::from_millis(1500),
        };
        assert_eq!(err.to_string(), "Search timed out after 1500ms");
    }
}
