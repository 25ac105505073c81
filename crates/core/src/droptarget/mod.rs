//! Drop interception.
//!
//! When the process runs elevated, the windowing system's cross-privilege
//! message filter (UIPI) blocks the toolkit's in-process drag-and-drop path
//! for drags that originate in lower-privilege processes, so dropped files
//! silently never arrive. The [`win`] module registers explicit filter
//! exceptions and decodes the lower-level `WM_DROPFILES` notification
//! instead; this module holds the platform-neutral payload handling.

#[cfg(windows)]
pub mod win;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::format::TargetFormat;

/// Filters a raw drop payload down to convertible files.
///
/// Keeps paths whose extension the target format accepts; a dropped
/// directory is expanded recursively into its matching descendant files and
/// never returned itself. The result is deduplicated, preserving first-seen
/// order; directory traversal is sorted so expansion is deterministic.
///
/// Runs synchronously on the UI thread as part of native message dispatch,
/// so it does nothing beyond decoding one payload.
pub fn filter_drop_payload(raw_paths: &[PathBuf], format: TargetFormat) -> Vec<PathBuf> {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut result = Vec::new();

    for path in raw_paths {
        if path.is_dir() {
            collect_matching(path, format, &mut seen, &mut result);
        } else if format.accepts_input(path) && seen.insert(path.clone()) {
            result.push(path.clone());
        }
    }

    debug!(
        dropped = raw_paths.len(),
        accepted = result.len(),
        "Filtered drop payload"
    );
    result
}

fn collect_matching(
    dir: &Path,
    format: TargetFormat,
    seen: &mut HashSet<PathBuf>,
    out: &mut Vec<PathBuf>,
) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        debug!(dir = %dir.display(), "Skipping unreadable directory in drop payload");
        return;
    };

    let mut paths: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
    paths.sort();

    for path in paths {
        if path.is_dir() {
            collect_matching(&path, format, seen, out);
        } else if format.accepts_input(&path) && seen.insert(path.clone()) {
            out.push(path);
        }
    }
}
