//! Task document discovery.
//!
//! Walks a workspace root and collects Markdown files whose file name
//! matches one of the configured patterns. Matching is case-insensitive
//! and applies to the file name only, so `docs/Auth-PRD.md` and
//! `PRD.md` both qualify under the defaults.

use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{PrdError, Result};

/// Directories never descended into.
const SKIPPED_DIRS: &[&str] = &["node_modules", "target", ".git", ".hg", ".svn"];

/// Build a case-insensitive matcher from filename patterns.
///
/// # Errors
///
/// Returns a configuration error when a pattern is not valid glob syntax.
pub fn build_matcher(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| PrdError::InvalidConfig {
                field: "filePatterns".to_string(),
                reason: format!("'{pattern}': {e}"),
            })?;
        builder.add(glob);
    }
    builder.build().map_err(PrdError::other)
}

/// Find every task document under `root`, sorted by path.
///
/// # Errors
///
/// Returns an error for invalid patterns; unreadable directory entries
/// are skipped rather than fatal.
pub fn find_documents(root: impl AsRef<Path>, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let matcher = build_matcher(patterns)?;
    let mut found = Vec::new();

    let walker = WalkDir::new(root.as_ref())
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || entry
                    .file_name()
                    .to_str()
                    .is_none_or(|name| !SKIPPED_DIRS.contains(&name))
        });

    for entry in walker {
        let Ok(entry) = entry else {
            continue;
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name();
        if matcher.is_match(name) {
            found.push(entry.into_path());
        }
    }

    found.sort();
    debug!(count = found.len(), "discovered task documents");
    Ok(found)
}

// ============================================================================
// Tests
// ============================================================================
