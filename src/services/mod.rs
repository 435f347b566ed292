//! Services module
//!
//! 検索リクエストを処理するサービス群です。検索の実行そのものは `backend`
//! 経由で外部ツールに委譲します。

pub mod backend;
pub mod path_guard;
pub mod path_info;
pub mod search_service;

// Re-exports for convenience
pub use backend::{ExecutionOutput, RipgrepBackend, SearchBackend};
pub use path_info::path_info;
pub use search_service::{PreparedSearch, SearchService};
