//! CLI argument parsing

use crate::config::EngineConfig;
use crate::types::{FlowType, QueryFlow, SearchRequest};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Separator between a flow type and its query, e.g. `phone:5551234567`
pub const FLOW_TYPE_SEPARATOR: char = ':';

#[derive(Debug, Parser)]
#[command(name = "flowgrep", version, about = "Search files for typed query flows")]
pub struct Cli {
    /// JSON engine config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// ripgrep binary to run
    #[arg(long, global = true, env = "FLOWGREP_RG")]
    pub rg: Option<String>,

    /// Execution timeout in milliseconds
    #[arg(long, global = true, env = "FLOWGREP_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run a search and print grouped results as JSON
    Search(RequestArgs),
    /// Print the command a search would run, without running it
    Preview(RequestArgs),
    /// Stream results as newline-delimited JSON events
    Stream(RequestArgs),
    /// Report size and file count of a search path
    PathInfo {
        #[arg(default_value = ".")]
        path: String,
    },
}

#[derive(Debug, Args)]
pub struct RequestArgs {
    /// Query flow as `[type:]query` (types: generic, name, phone, email)
    #[arg(short, long = "query", required_unless_present = "request")]
    pub queries: Vec<String>,

    /// Read the whole request from a JSON file instead
    #[arg(long, conflicts_with = "queries")]
    pub request: Option<PathBuf>,

    /// File or directory to search
    #[arg(short, long, default_value = ".")]
    pub path: String,

    /// Context lines before and after each match
    #[arg(short = 'C', long, default_value_t = 1, allow_negative_numbers = true)]
    pub context: i64,

    /// Do not fold long lines
    #[arg(long)]
    pub no_fold: bool,
}

impl RequestArgs {
    pub fn to_request(&self) -> Result<SearchRequest> {
        if let Some(path) = &self.request {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read request file {}", path.display()))?;
            return serde_json::from_str(&content)
                .with_context(|| format!("Invalid request JSON in {}", path.display()));
        }

        let flows = self.queries.iter().map(|q| parse_flow_arg(q)).collect();
        Ok(SearchRequest::new(flows, self.path.clone())
            .with_context(self.context)
            .with_fold(!self.no_fold))
    }
}

impl Cli {
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => EngineConfig::default(),
        };
        if let Some(rg) = &self.rg {
            config = config.with_rg_binary(rg.clone());
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config = config.with_timeout(Duration::from_millis(timeout_ms));
        }
        Ok(config)
    }
}

/// Parse a `[type:]query` argument.
///
/// A prefix that is not a known flow type is kept as part of a generic query,
/// so `http://host` searches for the whole string.
///
/// # Examples
/// ```
/// use flowgrep::cli::parse_flow_arg;
///
/// let flow = parse_flow_arg("phone:(555) 123-4567");
/// assert_eq!(flow.kind, "phone");
/// assert_eq!(flow.query, "(555) 123-4567");
///
/// let flow = parse_flow_arg("john smith");
/// assert_eq!(flow.kind, "generic");
/// ```
pub fn parse_flow_arg(arg: &str) -> QueryFlow {
    if let Some((prefix, query)) = arg.split_once(FLOW_TYPE_SEPARATOR) {
        if let Ok(flow_type) = prefix.parse::<FlowType>() {
            return QueryFlow::new(query, flow_type);
        }
    }
    QueryFlow::new(arg, FlowType::Generic)
}
