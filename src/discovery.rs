use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Collect the PSD documents to export from a file or folder.
///
/// A single `.psd` file yields itself; a folder is walked recursively and every
/// `.psd` beneath it is returned, sorted by file name within each directory.
/// Anything else yields an empty list.
pub fn find_sources<P: AsRef<Path>>(path: P) -> Vec<PathBuf> {
    let path = path.as_ref();

    if path.is_file() {
        return if is_psd_file(path) {
            vec![path.to_path_buf()]
        } else {
            Vec::new()
        };
    }

    if !path.is_dir() {
        log::debug!("Input path does not exist: {}", path.display());
        return Vec::new();
    }

    let mut sources = Vec::new();
    for entry in WalkDir::new(path).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry under {}: {}", path.display(), e);
                continue;
            }
        };

        if entry.file_type().is_file() && is_psd_file(entry.path()) {
            sources.push(entry.into_path());
        }
    }

    log::debug!("Discovered {} PSD file(s) under {}", sources.len(), path.display());
    sources
}

fn is_psd_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("psd"))
        .unwrap_or(false)
}
