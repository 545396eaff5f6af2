use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::CleanupWarning;

/// What happened to the scratch files at the end of a run
#[derive(Debug, Clone, Default)]
pub struct CleanupReport {
    pub removed: Vec<PathBuf>,
    pub missing: Vec<PathBuf>,
    pub warnings: Vec<CleanupWarning>,
}

impl CleanupReport {
    /// No deletion failed
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    Missing,
}

/// Remove one scratch file; an absent file is not an error
pub fn remove_scratch_file(path: &Path) -> Result<Removal, CleanupWarning> {
    let warning = |e: std::io::Error| CleanupWarning {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    if !path.try_exists().map_err(warning)? {
        return Ok(Removal::Missing);
    }

    match fs_err::remove_file(path) {
        Ok(()) => Ok(Removal::Removed),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Removal::Missing),
        Err(e) => Err(warning(e)),
    }
}

/// Remove both scratch files independently of each other.
///
/// Unset paths are skipped and failures are collected as warnings, never returned.
pub fn remove_scratch_files(video: Option<&Path>, audio: Option<&Path>) -> CleanupReport {
    tracing::info!("Removing temporary files...");
    let mut report = CleanupReport::default();

    for (label, path) in [("video", video), ("audio", audio)] {
        let Some(path) = path else {
            tracing::debug!("No temporary {} file was created", label);
            continue;
        };

        match remove_scratch_file(path) {
            Ok(Removal::Removed) => {
                tracing::info!("Removed temporary {} file: {}", label, path.display());
                report.removed.push(path.to_path_buf());
            }
            Ok(Removal::Missing) => {
                tracing::info!(
                    "Temporary {} file not found (may have been already removed): {}",
                    label,
                    path.display()
                );
                report.missing.push(path.to_path_buf());
            }
            Err(warning) => {
                tracing::warn!("Error removing {} file: {}", label, warning);
                report.warnings.push(warning);
            }
        }
    }

    tracing::info!("Cleanup completed");
    report
}
