//! Search path policy
//!
//! Refuses paths that point into sensitive system directories. Existing
//! paths are checked again after symlinks are resolved.

use crate::error::{Result, SearchError};
use std::path::{Component, Path, PathBuf};

/// Make `path` absolute against the working directory and fold `.`/`..`.
pub fn normalize(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Fail with `InvalidRequest` when `search_path` is under a blocked prefix.
pub fn check(search_path: &str, blocked_prefixes: &[String]) -> Result<()> {
    let path = if search_path.trim().is_empty() {
        Path::new(".")
    } else {
        Path::new(search_path)
    };
    check_resolved(&normalize(path), search_path, blocked_prefixes)
}

/// Check `search_path` and return the path the tool should search.
///
/// An existing path is canonicalised and the canonical form is both checked
/// and searched, so a symlink cannot lead into a blocked directory. A path
/// that cannot be resolved passes through unchanged for the tool to report.
pub fn resolve(search_path: &str, blocked_prefixes: &[String]) -> Result<String> {
    check(search_path, blocked_prefixes)?;

    let path = if search_path.trim().is_empty() { "." } else { search_path };
    match std::fs::canonicalize(path) {
        Ok(resolved) => {
            check_resolved(&resolved, search_path, blocked_prefixes)?;
            Ok(resolved.to_string_lossy().into_owned())
        }
        Err(e) => {
            log::debug!("Could not resolve search path '{}': {}", search_path, e);
            Ok(path.to_string())
        }
    }
}

pub(crate) fn check_resolved(resolved: &Path, original: &str, blocked_prefixes: &[String]) -> Result<()> {
    match blocked_prefixes
        .iter()
        .find(|prefix| resolved.starts_with(Path::new(prefix.as_str())))
    {
        Some(prefix) => {
            log::warn!("Refusing search path '{}' (under {})", original, prefix);
            Err(SearchError::invalid_request(
                "search_path",
                format!("access to {} is not allowed", prefix),
            ))
        }
        None => Ok(()),
    }
}
