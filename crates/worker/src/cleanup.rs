//! Removal of the artifact files the benchmark library leaves behind.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Suffixes of files written by the benchmark library.
pub const OUTPUT_SUFFIXES: [&str; 3] = [".out", ".clean", ".hdf5"];

/// What a cleanup pass did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed: Vec<PathBuf>,
    /// Files that could not be removed. Already logged.
    pub failed: Vec<PathBuf>,
}

/// Whether `name` is a library artifact. Hidden files never are.
pub fn is_output_file(name: &str) -> bool {
    !name.starts_with('.')
        && OUTPUT_SUFFIXES
            .iter()
            .any(|suffix| name.len() > suffix.len() && name.ends_with(suffix))
}

/// List artifact files and symlinks directly inside `dir`, sorted.
///
/// An unreadable directory is logged and yields nothing.
pub async fn list_output_files(dir: &Path) -> Vec<PathBuf> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "Cannot list work directory");
            return Vec::new();
        }
    };

    let mut files = Vec::new();
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "Error while listing work directory");
                break;
            }
        };
        // A symlink is removed as a link, whatever it points at.
        let removable = entry
            .file_type()
            .await
            .map(|t| t.is_file() || t.is_symlink())
            .unwrap_or(false);
        if removable && is_output_file(&entry.file_name().to_string_lossy()) {
            files.push(entry.path());
        }
    }
    files.sort();
    files
}

/// Remove `files`.
///
/// A file that is already gone counts as neither removed nor failed: with a
/// shared work directory another worker may have cleaned it up first.
pub async fn remove_files(files: Vec<PathBuf>) -> CleanupReport {
    let mut report = CleanupReport::default();
    for path in files {
        match tokio::fs::remove_file(&path).await {
            Ok(()) => report.removed.push(path),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Artifact already removed");
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Could not remove file");
                report.failed.push(path);
            }
        }
    }
    report
}

/// Remove every artifact file directly inside `dir`.
pub async fn remove_output_files(dir: &Path) -> CleanupReport {
    let files = list_output_files(dir).await;
    remove_files(files).await
}
