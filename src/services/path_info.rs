//! Size estimate for a search target

use super::path_guard;
use crate::error::{Result, SearchError};
use crate::types::PathInfo;
use walkdir::WalkDir;

/// Assumed sequential read throughput (bytes/sec)
pub const DISK_THROUGHPUT_BPS: u64 = 150 * 1024 * 1024;

/// Resolve `search_path` and report what a search over it would scan.
pub fn path_info(search_path: &str, blocked_prefixes: &[String]) -> Result<PathInfo> {
    path_guard::check(search_path, blocked_prefixes)?;

    let path = if search_path.trim().is_empty() { "." } else { search_path };
    let resolved = std::fs::canonicalize(path).map_err(|e| {
        SearchError::invalid_request("search_path", format!("{}: {}", search_path, e))
    })?;
    // symlinks may lead somewhere the lexical check could not see
    path_guard::check_resolved(&resolved, search_path, blocked_prefixes)?;

    let mut total_size_bytes = 0u64;
    let mut file_count = 0u64;
    for entry in WalkDir::new(&resolved).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::debug!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        match entry.metadata() {
            Ok(metadata) => {
                total_size_bytes += metadata.len();
                file_count += 1;
            }
            Err(e) => log::debug!("Skipping {}: {}", entry.path().display(), e),
        }
    }

    let est_search_seconds = if total_size_bytes > 0 {
        (total_size_bytes as f64 / DISK_THROUGHPUT_BPS as f64 * 100.0).round() / 100.0
    } else {
        0.0
    };

    Ok(PathInfo {
        resolved_path: resolved.to_string_lossy().to_string(),
        total_size_bytes,
        file_count,
        est_search_seconds,
    })
}
