//! flowgrep - typed multi-flow search over files
//!
//! Command-line usage:
//!   flowgrep search -q phone:1234567890 -q john -p ./data -C 2
//!   flowgrep preview -q "name:Jane Doe"
//!   flowgrep stream --request request.json
//!   flowgrep path-info ./data

use anyhow::{Context, Result};
use clap::Parser;
use flowgrep::cli::{Cli, CliCommand};
use flowgrep::services::path_info;
use flowgrep::SearchService;
use tokio_util::sync::CancellationToken;

/// Cancel the token on Ctrl-C so a running search is terminated
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Interrupted, cancelling search");
            cancel.cancel();
        }
    });
    token
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let cli = Cli::parse();
    let config = cli.engine_config()?;

    match &cli.command {
        CliCommand::Preview(args) => {
            let service = SearchService::new(config);
            let preview = service.preview(&args.to_request()?)?;
            println!("{}", serde_json::to_string_pretty(&preview)?);
        }
        CliCommand::Search(args) => {
            let service = SearchService::new(config);
            let request = args.to_request()?;
            let response = service
                .search(&request, cancel_on_ctrl_c())
                .await
                .context("Search failed")?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        CliCommand::Stream(args) => {
            let service = SearchService::new(config);
            let request = args.to_request()?;
            let mut events = service.search_stream(&request, cancel_on_ctrl_c())?;
            while let Some(event) = events.recv().await {
                println!("{}", serde_json::to_string(&event)?);
            }
        }
        CliCommand::PathInfo { path } => {
            let info = path_info(path, &config.blocked_prefixes)?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
    }

    Ok(())
}
