use std::path::{Path, PathBuf};

/// Reset `<root>/<folder>`: remove it if present, then create it.
///
/// Failures are logged and otherwise ignored; a folder that could not be
/// created surfaces later as a write error.
pub fn prepare_output_location(root: &Path, folder: &str) -> PathBuf {
    let output_dir = root.join(folder);

    if output_dir.exists() {
        if let Err(e) = std::fs::remove_dir_all(&output_dir) {
            log::error!("Failed to remove output folder {}: {}", output_dir.display(), e);
        }
    }

    if let Err(e) = std::fs::create_dir_all(&output_dir) {
        log::error!("Failed to create output folder {}: {}", output_dir.display(), e);
    }

    output_dir
}
