//! Search orchestration
//!
//! Runs one request through the pipeline: expand flows, compile, execute,
//! parse, aggregate and fold. The service keeps no per-request state, so one
//! instance can serve any number of concurrent requests.

use super::backend::{RipgrepBackend, SearchBackend};
use super::path_guard;
use crate::aggregator::{aggregate, display_line, fold_groups};
use crate::compiler::{compile, CompileOptions};
use crate::config::EngineConfig;
use crate::error::{Result, SearchError};
use crate::parsers::{parse, parse_line, SpanLocator};
use crate::types::{
    CompiledInvocation, PreviewResponse, SearchEvent, SearchRequest, SearchResponse, Variation,
};
use crate::variations::generate_all;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Capacity of the line / event channels used by streaming search
pub const STREAM_BUFFER: usize = 256;

/// Everything derived from a request before anything runs
#[derive(Debug, Clone)]
pub struct PreparedSearch {
    pub variations: Vec<Variation>,
    pub invocation: CompiledInvocation,
    pub locator: SpanLocator,
}

impl PreparedSearch {
    /// Distinct variation patterns in generation order
    pub fn variation_patterns(&self) -> Vec<String> {
        let mut patterns: Vec<String> = Vec::with_capacity(self.variations.len());
        for variation in &self.variations {
            if !patterns.contains(&variation.pattern) {
                patterns.push(variation.pattern.clone());
            }
        }
        patterns
    }
}

/// Request handler for search and preview
#[derive(Clone)]
pub struct SearchService {
    config: EngineConfig,
    backend: Arc<dyn SearchBackend>,
}

impl SearchService {
    /// Service backed by the real ripgrep binary
    pub fn new(config: EngineConfig) -> Self {
        Self::with_backend(config, Arc::new(RipgrepBackend::new()))
    }

    pub fn with_backend(config: EngineConfig, backend: Arc<dyn SearchBackend>) -> Self {
        Self { config, backend }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate a request and compile it. Never spawns anything.
    pub fn prepare(&self, request: &SearchRequest) -> Result<PreparedSearch> {
        if request.flows.is_empty() {
            return Err(SearchError::invalid_request(
                "queries",
                "at least one query flow is required",
            ));
        }
        if request.context < 0 {
            return Err(SearchError::invalid_request(
                "context",
                format!("must be non-negative, got {}", request.context),
            ));
        }
        let search_path = path_guard::resolve(&request.search_path, &self.config.blocked_prefixes)?;

        let variations = generate_all(&request.flows)?;
        let options = CompileOptions {
            search_path,
            context: request.context,
        };
        let invocation = compile(&variations, &options, &self.config)?;
        let locator = SpanLocator::new(&variations)?;

        Ok(PreparedSearch {
            variations,
            invocation,
            locator,
        })
    }

    /// Preview only: the command that `search` would run
    pub fn preview(&self, request: &SearchRequest) -> Result<PreviewResponse> {
        let prepared = self.prepare(request)?;
        Ok(PreviewResponse {
            preview_text: prepared.invocation.preview_text,
        })
    }

    /// Perform search
    pub async fn search(
        &self,
        request: &SearchRequest,
        cancellation_token: CancellationToken,
    ) -> Result<SearchResponse> {
        let prepared = self.prepare(request)?;
        let variations = prepared.variation_patterns();
        log::info!(
            "Starting search over '{}' with {} flows ({} variations)",
            request.search_path,
            request.flows.len(),
            variations.len()
        );

        let output = self
            .backend
            .execute(&prepared.invocation, self.config.timeout(), cancellation_token)
            .await
            .map_err(|e| {
                log::error!("Search execution failed: {}", e);
                e
            })?;

        let groups = if output.has_matches() {
            aggregate(parse(&output.stdout, &prepared.locator)?)
        } else {
            Vec::new()
        };

        let total_matches = groups
            .iter()
            .flat_map(|g| g.matches.iter())
            .filter(|m| m.is_match())
            .count();

        log::info!(
            "Search completed: {} matches in {} files",
            total_matches,
            groups.len()
        );

        Ok(SearchResponse {
            groups: fold_groups(
                groups,
                request.fold,
                self.config.fold_width,
                &self.config.truncation_marker,
            ),
            total_matches,
            variations,
            preview_text: prepared.invocation.preview_text,
        })
    }

    /// Streaming search.
    ///
    /// Validation errors are returned directly; once the receiver is handed
    /// out every outcome arrives as an event. Dropping the receiver or
    /// cancelling the token terminates the subprocess.
    pub fn search_stream(
        &self,
        request: &SearchRequest,
        cancellation_token: CancellationToken,
    ) -> Result<mpsc::Receiver<SearchEvent>> {
        let prepared = self.prepare(request)?;
        let (event_tx, event_rx) = mpsc::channel(STREAM_BUFFER);

        let backend = Arc::clone(&self.backend);
        let timeout = self.config.timeout();
        let fold_requested = request.fold;
        let fold_width = self.config.fold_width;
        let marker = self.config.truncation_marker.clone();

        tokio::spawn(async move {
            let preview = SearchEvent::Preview {
                command_executed: prepared.invocation.preview_text.clone(),
                variations: prepared.variation_patterns(),
            };
            if event_tx.send(preview).await.is_err() {
                return;
            }

            let token = cancellation_token.child_token();
            let (line_tx, line_rx) = mpsc::channel::<Vec<u8>>(STREAM_BUFFER);
            let execution =
                backend.execute_streaming(&prepared.invocation, timeout, token.clone(), line_tx);

            // The consumer owns `line_rx`: once it stops, the backend's next
            // send fails and the subprocess is killed.
            let consume = async {
                let mut line_rx = line_rx;
                let mut total_matches = 0usize;
                let mut index = 0usize;
                loop {
                    let raw = tokio::select! {
                        raw = line_rx.recv() => match raw {
                            Some(raw) => raw,
                            None => break,
                        },
                        _ = event_tx.closed() => {
                            log::info!("Stream receiver dropped, cancelling search");
                            token.cancel();
                            return Err(SearchError::Cancelled);
                        }
                    };
                    index += 1;
                    let record = match parse_line(&raw, index, &prepared.locator) {
                        Ok(Some(record)) => record,
                        Ok(None) => continue,
                        Err(e) => {
                            token.cancel();
                            return Err(e);
                        }
                    };
                    if record.is_match() {
                        total_matches += 1;
                    }
                    let event = SearchEvent::Line {
                        file_path: record.file_path.clone(),
                        line: display_line(record, fold_requested, fold_width, &marker),
                    };
                    if event_tx.send(event).await.is_err() {
                        log::info!("Stream receiver dropped, cancelling search");
                        token.cancel();
                        return Err(SearchError::Cancelled);
                    }
                }
                Ok(total_matches)
            };

            let (executed, consumed) = tokio::join!(execution, consume);
            let terminal = match (executed, consumed) {
                (_, Err(e)) | (Err(e), Ok(_)) => {
                    log::warn!("Streaming search failed: {}", e);
                    SearchEvent::Failed {
                        kind: e.kind(),
                        message: e.to_string(),
                    }
                }
                (Ok(_), Ok(total_matches)) => SearchEvent::Done { total_matches },
            };
            let _ = event_tx.send(terminal).await;
        });

        Ok(event_rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::backend::{ExecutionOutput, MockSearchBackend};
    use crate::types::{FlowType, LineKind, QueryFlow};
    use std::collections::BTreeSet;

    fn service(mock: MockSearchBackend) -> SearchService {
        SearchService::with_backend(EngineConfig::default(), Arc::new(mock))
    }

    fn never_runs() -> MockSearchBackend {
        let mut mock = MockSearchBackend::new();
        mock.expect_execute().times(0);
        mock.expect_execute_streaming().times(0);
        mock
    }

    fn returns(stdout: &'static [u8], exit_code: i32) -> MockSearchBackend {
        let mut mock = MockSearchBackend::new();
        mock.expect_execute().times(1).returning(move |_, _, _| {
            Ok(ExecutionOutput {
                stdout: stdout.to_vec(),
                stderr: String::new(),
                exit_code: Some(exit_code),
            })
        });
        mock
    }

    fn phone_request() -> SearchRequest {
        SearchRequest::new(vec![QueryFlow::new("1234567890", FlowType::Phone)], ".")
            .with_context(2)
            .with_fold(true)
    }

    #[tokio::test]
    async fn test_empty_flows_spawn_nothing() {
        let service = service(never_runs());
        let request = SearchRequest::new(Vec::new(), ".");

        let err = service.search(&request, CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, SearchError::InvalidRequest { field: "queries", .. }));
        assert!(service.preview(&request).is_err());
        assert!(service.search_stream(&request, CancellationToken::new()).is_err());
    }

    #[tokio::test]
    async fn test_validation_errors_spawn_nothing() {
        let service = service(never_runs());

        let negative = phone_request().with_context(-1);
        assert!(matches!(
            service.search(&negative, CancellationToken::new()).await,
            Err(SearchError::InvalidRequest { field: "context", .. })
        ));

        let bad_phone = SearchRequest::new(vec![QueryFlow::new("12345", FlowType::Phone)], ".");
        assert!(matches!(
            service.search(&bad_phone, CancellationToken::new()).await,
            Err(SearchError::InvalidQuery { flow_index: 0, .. })
        ));

        let unknown = SearchRequest::new(
            vec![QueryFlow {
                query: "x".to_string(),
                kind: "ssn".to_string(),
            }],
            ".",
        );
        assert!(matches!(
            service.search(&unknown, CancellationToken::new()).await,
            Err(SearchError::InvalidQuery { .. })
        ));

        let blocked = SearchRequest::new(vec![QueryFlow::new("root", FlowType::Generic)], "/etc");
        assert!(matches!(
            service.search(&blocked, CancellationToken::new()).await,
            Err(SearchError::InvalidRequest { field: "search_path", .. })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_into_blocked_path_spawns_nothing() {
        let dir = tempfile::TempDir::new().unwrap();
        let link = dir.path().join("cfg");
        std::os::unix::fs::symlink("/etc", &link).unwrap();

        let service = service(never_runs());
        let request = SearchRequest::new(
            vec![QueryFlow::new("root", FlowType::Generic)],
            link.to_string_lossy(),
        );
        assert!(matches!(
            service.search(&request, CancellationToken::new()).await,
            Err(SearchError::InvalidRequest { field: "search_path", .. })
        ));
        assert!(service.preview(&request).is_err());
    }

    #[test]
    fn test_invocation_searches_resolved_path() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("data")).unwrap();
        let request = SearchRequest::new(
            vec![QueryFlow::new("john", FlowType::Generic)],
            dir.path().join("data/../data").to_string_lossy(),
        );

        let prepared = service(never_runs()).prepare(&request).unwrap();
        let expected = std::fs::canonicalize(dir.path().join("data")).unwrap();
        assert_eq!(
            prepared.invocation.tool_args.last().map(String::as_str),
            Some(expected.to_string_lossy().as_ref())
        );
    }

    #[test]
    fn test_preview_matches_compiled_invocation() {
        let service = service(never_runs());
        let preview = service.preview(&phone_request()).unwrap();
        let prepared = service.prepare(&phone_request()).unwrap();
        assert_eq!(preview.preview_text, prepared.invocation.preview_text);
        assert!(preview.preview_text.starts_with("rg "));
    }

    #[tokio::test]
    async fn test_phone_scenario() {
        let stdout = b"./calls.txt\x001-header\n./calls.txt\x002:Call 123-456-7890 now\n./calls.txt\x003-footer\n";
        let service = service(returns(stdout, 0));

        let response = service.search(&phone_request(), CancellationToken::new()).await.unwrap();
        assert_eq!(response.groups.len(), 1);
        assert_eq!(response.total_matches, 1);
        assert_eq!(response.variations.len(), 5);

        let group = &response.groups[0];
        assert_eq!(group.file_path, "./calls.txt");
        let hits: Vec<_> = group.lines.iter().filter(|l| l.kind == LineKind::Match).collect();
        assert_eq!(hits.len(), 1);
        let (s, e) = hits[0].line.match_spans_in_display[0];
        assert_eq!(&hits[0].line.display_text[s..e], "123-456-7890");
    }

    #[tokio::test]
    async fn test_two_flows_attribute_lines() {
        let stdout = b"people.csv\x001:john,doe\npeople.csv\x004:(123) 456-7890\n";
        let service = service(returns(stdout, 0));
        let request = SearchRequest::new(
            vec![
                QueryFlow::new("john", FlowType::Generic),
                QueryFlow::new("1234567890", FlowType::Phone),
            ],
            ".",
        );

        let response = service.search(&request, CancellationToken::new()).await.unwrap();
        assert_eq!(response.groups.len(), 1);
        let lines = &response.groups[0].lines;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].contributing_flow_indices, BTreeSet::from([0]));
        assert_eq!(lines[1].contributing_flow_indices, BTreeSet::from([1]));
    }

    #[tokio::test]
    async fn test_no_matches_is_empty_result() {
        let service = service(returns(b"", 1));
        let response = service.search(&phone_request(), CancellationToken::new()).await.unwrap();
        assert!(response.groups.is_empty());
        assert_eq!(response.total_matches, 0);
        assert!(!response.preview_text.is_empty());
    }

    #[tokio::test]
    async fn test_execution_failure_propagates() {
        let mut mock = MockSearchBackend::new();
        mock.expect_execute().returning(|_, _, _| {
            Err(SearchError::ExecutionFailed {
                status: Some(2),
                stderr: "rg: ./missing: No such file or directory".to_string(),
            })
        });
        let err = service(mock)
            .search(&phone_request(), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::ExecutionFailed { status: Some(2), .. }));
    }

    #[tokio::test]
    async fn test_malformed_output_is_parse_error() {
        let service = service(returns(b"garbage without structure\n", 0));
        let err = service.search(&phone_request(), CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, SearchError::ParseError { .. }));
    }

    #[tokio::test]
    async fn test_stream_emits_preview_lines_and_done() {
        let mut mock = MockSearchBackend::new();
        mock.expect_execute_streaming().times(1).returning(|_, _, _, lines| {
            lines.try_send(b"a.txt\x001:john\n".to_vec()).unwrap();
            lines.try_send(b"a.txt\x002-next\n".to_vec()).unwrap();
            Ok(ExecutionOutput {
                exit_code: Some(0),
                ..Default::default()
            })
        });
        let service = service(mock);
        let request = SearchRequest::new(vec![QueryFlow::new("john", FlowType::Generic)], ".");

        let mut rx = service.search_stream(&request, CancellationToken::new()).unwrap();
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        assert!(matches!(events[0], SearchEvent::Preview { .. }));
        assert_eq!(events.len(), 4);
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
        assert_eq!(events[3], SearchEvent::Done { total_matches: 1 });
    }

    #[tokio::test]
    async fn test_stream_reports_failure_event() {
        let mut mock = MockSearchBackend::new();
        mock.expect_execute_streaming()
            .returning(|_, timeout, _, _| Err(SearchError::Timeout { elapsed: timeout }));
        let service = service(mock);
        let request = SearchRequest::new(vec![QueryFlow::new("john", FlowType::Generic)], ".");

        let mut rx = service.search_stream(&request, CancellationToken::new()).unwrap();
        let mut last = None;
        while let Some(event) = rx.recv().await {
            last = Some(event);
        }
        assert!(matches!(last, Some(SearchEvent::Failed { kind: "timeout", .. })));
    }
}
