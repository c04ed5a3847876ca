//! Recursive discovery of study files

use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::DiscoveryConfig;

/// Every regular file under `root` with the configured extension, sorted by
/// path. Unreadable directory entries are logged and skipped.
pub fn discover_files(root: &Path, config: &DiscoveryConfig) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable path during traversal");
                continue;
            }
        };

        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }
        if path.extension().map_or(true, |ext| ext != config.extension.as_str()) {
            continue;
        }

        // Whole path components only: "drafts" skips drafts/x.json, not drafts2/x.json
        let relative = path.strip_prefix(root).unwrap_or(path);
        if config.skip_prefixes.iter().any(|p| relative.starts_with(p)) {
            debug!(path = %path.display(), "skipped by prefix");
            continue;
        }

        files.push(path.to_path_buf());
    }

    files.sort();
    files
}
