// SPDX-License-Identifier: GPL-3.0-only

use std::path::Path;

use fileman_types::{Query, SearchResult, sort_results};
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

use super::fs_ops::object_from_metadata;
use crate::error::{ExecError, Result};
use crate::executable::check_cancelled;

pub(crate) fn search(
    dir: &Path,
    query: &Query,
    cancel: &CancellationToken,
) -> Result<Vec<SearchResult>> {
    check_search_args(dir, query)?;

    let mut results = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1) {
        check_cancelled(cancel)?;
        // Unreadable subtrees are skipped, matching `find 2>/dev/null`.
        let Ok(entry) = entry else {
            continue;
        };

        let name = entry.file_name().to_string_lossy();
        if !query.matches(&name) {
            continue;
        }

        if let Ok(metadata) = entry.metadata() {
            let object = object_from_metadata(entry.path(), &metadata);
            results.push(SearchResult::new(object, query));
        }
    }

    sort_results(&mut results);
    Ok(results)
}

/// Preconditions shared with the shell search.
pub(crate) fn check_search_args(dir: &Path, query: &Query) -> Result<()> {
    if query.is_empty() {
        return Err(ExecError::InvalidArgument("empty search query".to_string()));
    }

    let metadata = std::fs::metadata(dir).map_err(|e| ExecError::from_io(e, dir))?;
    if !metadata.is_dir() {
        return Err(ExecError::InvalidArgument(format!(
            "{} is not a directory",
            dir.display()
        )));
    }
    Ok(())
}
