//! Template import: push local MediaWiki template files into the target
//! wiki as `Template:` pages.
//!
//! Per-file failures are collected, not fatal, so one bad template never
//! blocks the rest of the import.

use crate::domain::DomainError;
use crate::ports::WikiTarget;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

/// Edit summary attached to imported templates.
const TEMPLATE_SUMMARY: &str = "Imported wiki template";

/// End-of-run counters for a template import.
#[derive(Debug, Default)]
pub struct TemplateImportOutcome {
    pub imported: usize,
    pub failed: usize,
}

/// Template import service.
pub struct TemplateService {
    target: Arc<dyn WikiTarget>,
}

impl TemplateService {
    pub fn new(target: Arc<dyn WikiTarget>) -> Self {
        Self { target }
    }

    /// Import every `*.mediawiki` / `*.wiki` file under `dir`. Dry-run
    /// lists what would be imported without writing.
    pub async fn import_dir(
        &self,
        dir: &Path,
        dry_run: bool,
    ) -> Result<TemplateImportOutcome, DomainError> {
        let files = template_files(dir).await?;
        if files.is_empty() {
            warn!(dir = %dir.display(), "no template files found (*.mediawiki, *.wiki)");
            return Ok(TemplateImportOutcome::default());
        }
        info!(count = files.len(), dir = %dir.display(), "importing templates");

        let mut outcome = TemplateImportOutcome::default();
        for file in files {
            let title = template_title(&file);

            if dry_run {
                info!(title = %title, file = %file.display(), "dry-run: would import template");
                outcome.imported += 1;
                continue;
            }

            let content = match fs::read_to_string(&file).await {
                Ok(content) => content,
                Err(e) => {
                    warn!(file = %file.display(), error = %e, "template file not readable");
                    outcome.failed += 1;
                    continue;
                }
            };

            match self.target.upsert_page(&title, &content, TEMPLATE_SUMMARY).await {
                Ok(()) => {
                    debug!(title = %title, "template imported");
                    outcome.imported += 1;
                }
                Err(e) => {
                    warn!(title = %title, error = %e, "template import failed");
                    outcome.failed += 1;
                }
            }
        }

        info!(
            imported = outcome.imported,
            failed = outcome.failed,
            "template import finished"
        );
        Ok(outcome)
    }
}

/// Template files in `dir`, sorted by name for a stable import order.
async fn template_files(dir: &Path) -> Result<Vec<PathBuf>, DomainError> {
    let mut entries = fs::read_dir(dir).await.map_err(|e| {
        DomainError::Config(format!(
            "template directory '{}' not readable: {}",
            dir.display(),
            e
        ))
    })?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| DomainError::Config(format!("failed to list templates: {}", e)))?
    {
        let path = entry.path();
        match path.extension().and_then(|e| e.to_str()) {
            Some("mediawiki") | Some("wiki") => files.push(path),
            _ => {}
        }
    }
    files.sort();
    Ok(files)
}

/// `Template:{name}` for a template file, with any `Template_` filename
/// prefix stripped so files can carry it for clarity.
fn template_title(file: &Path) -> String {
    let stem = file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let name = stem.strip_prefix("Template_").unwrap_or(stem);
    format!("Template:{}", name)
}
