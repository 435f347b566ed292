pub mod aggregator;
pub mod cli;
pub mod compiler;
pub mod config;
pub mod display;
pub mod error;
pub mod parsers;
pub mod services;
pub mod types;
pub mod variations;

// 公開API
pub use config::EngineConfig;
pub use error::{Result, SearchError};
pub use services::{SearchBackend, SearchService};
pub use types::*;
