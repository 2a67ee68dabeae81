//! Report file writer.
//!
//! All commands drop their Markdown (and CSV) artifacts into one report
//! directory with timestamped names, so repeated runs never clobber each
//! other.

use crate::domain::DomainError;
use chrono::Local;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

/// Writes `content` into `dir` as `{prefix}_{YYYYMMDD_HHMMSS}.{extension}`,
/// creating the directory on demand. Returns the written path.
pub async fn write_report(
    dir: impl AsRef<Path>,
    prefix: &str,
    extension: &str,
    content: &str,
) -> Result<PathBuf, DomainError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)
        .await
        .map_err(|e| DomainError::Report(format!("Failed to create report dir: {}", e)))?;

    let filename = format!(
        "{}_{}.{}",
        prefix,
        Local::now().format("%Y%m%d_%H%M%S"),
        extension
    );
    let path = dir.join(filename);

    fs::write(&path, content)
        .await
        .map_err(|e| DomainError::Report(format!("Failed to write report: {}", e)))?;

    info!(path = %path.display(), "report written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn creates_directory_and_timestamped_file() {
        let dir = tempdir().unwrap();
        let reports = dir.path().join("reports");

        let path = write_report(&reports, "migration_plan", "md", "# Plan\n")
            .await
            .unwrap();

        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("migration_plan_"));
        assert!(name.ends_with(".md"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# Plan\n");
    }
}
