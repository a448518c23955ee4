//! Folder scanning for uploadable files.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions the service accepts, lowercase.
pub const ALLOWED_EXTENSIONS: [&str; 8] = ["pdf", "jpg", "jpeg", "png", "txt", "tiff", "tif", "webp"];

/// Result of scanning a folder.
#[derive(Debug, Clone, Default)]
pub struct FolderScan {
    /// Number of regular files seen
    pub total_files: usize,
    /// Files with a supported extension, sorted by path
    pub allowed: Vec<PathBuf>,
}

/// Case-insensitive extension check.
pub fn is_allowed(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .is_some_and(|e| ALLOWED_EXTENSIONS.contains(&e.as_str()))
}

/// Scans `folder` for regular files; descends into subfolders when `recursive`.
pub fn scan_folder(folder: &Path, recursive: bool) -> std::io::Result<FolderScan> {
    if !folder.is_dir() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} is not a directory", folder.display()),
        ));
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut scan = FolderScan::default();

    for entry in WalkDir::new(folder).min_depth(1).max_depth(max_depth) {
        let entry = entry.map_err(std::io::Error::other)?;
        if !entry.file_type().is_file() {
            continue;
        }
        scan.total_files += 1;
        if is_allowed(entry.path()) {
            scan.allowed.push(entry.into_path());
        }
    }

    scan.allowed.sort();
    log::info!(
        "Found {} total files; {} valid files (allowed extensions: {}).",
        scan.total_files,
        scan.allowed.len(),
        ALLOWED_EXTENSIONS.join(", ")
    );
    Ok(scan)
}
