//! Main migration logic: list pages -> filter -> fetch -> convert -> post.
//!
//! - Skips pages the checkpoint already recorded as migrated
//! - Per-page failures are recorded and the run continues
//! - Dry-run reads everything but never touches the target or the checkpoint
//! - A run with failures ends with a manual-review report (Markdown + CSV)
//!   and keeps the checkpoint; a clean run clears it

use crate::adapters::conversion::{markdown_to_wikitext, page_title};
use crate::adapters::reports::{failed_pages_to_csv, write_report};
use crate::adapters::ui::page_bar;
use crate::domain::{DomainError, MigrationOutcome, Wiki, WikiPage};
use crate::ports::{CheckpointStore, WikiSource, WikiTarget};
use chrono::{DateTime, Local, Utc};
use regex::Regex;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Edit summary attached to every migrated page.
pub const EDIT_SUMMARY: &str = "Migrated from Azure DevOps";

/// Per-run knobs, filled from CLI flags and config defaults.
#[derive(Debug, Clone, Default)]
pub struct MigrateOptions {
    /// Wiki to migrate. None selects the first wiki in the project.
    pub wiki_name: Option<String>,
    pub dry_run: bool,
    pub batch_size: usize,
    /// Explicit page paths to migrate. Empty means all pages.
    pub pages: Vec<String>,
    /// Regex on page paths; matching pages are dropped.
    pub exclude_pattern: Option<String>,
    /// Keep only pages modified after this instant. Undated pages are kept.
    pub modified_after: Option<DateTime<Utc>>,
    /// Drop every page listed before this path.
    pub resume_from: Option<String>,
}

/// Migration service. Coordinates source, converter, target and checkpoint.
pub struct MigrateService {
    source: Arc<dyn WikiSource>,
    target: Arc<dyn WikiTarget>,
    checkpoint: Arc<dyn CheckpointStore>,
    report_dir: PathBuf,
}

impl MigrateService {
    pub fn new(
        source: Arc<dyn WikiSource>,
        target: Arc<dyn WikiTarget>,
        checkpoint: Arc<dyn CheckpointStore>,
        report_dir: PathBuf,
    ) -> Self {
        Self {
            source,
            target,
            checkpoint,
            report_dir,
        }
    }

    /// Migrate one wiki. Returns end-of-run counters.
    pub async fn migrate(&self, options: &MigrateOptions) -> Result<MigrationOutcome, DomainError> {
        let Some(wiki) = select_wiki(self.source.as_ref(), options.wiki_name.as_deref()).await?
        else {
            return Ok(MigrationOutcome::default());
        };
        info!(wiki = %wiki.name, dry_run = options.dry_run, "starting migration");

        let pages = self.source.list_pages(&wiki.id).await?;
        if pages.is_empty() {
            warn!(wiki = %wiki.name, "wiki has no pages");
            return Ok(MigrationOutcome::default());
        }
        let listed = pages.len();
        let pages = filter_pages(pages, options)?;
        info!(selected = pages.len(), listed, "pages selected for migration");

        let mut outcome = MigrationOutcome::default();
        let mut failures: Vec<(WikiPage, String)> = Vec::new();

        let batch_size = options.batch_size.max(1);
        let batch_count = pages.len().div_ceil(batch_size);
        let bar = page_bar(pages.len() as u64);

        for (i, batch) in pages.chunks(batch_size).enumerate() {
            info!(
                batch = i + 1,
                of = batch_count,
                size = batch.len(),
                "processing batch"
            );
            for page in batch {
                self.migrate_page(&wiki, page, options, &mut outcome, &mut failures)
                    .await?;
                bar.inc(1);
            }
        }
        bar.finish();

        if !failures.is_empty() {
            self.write_failure_report(&wiki, &failures).await?;
        } else if !options.dry_run {
            self.checkpoint.clear().await?;
        }

        info!(
            migrated = outcome.migrated,
            failed = outcome.failed,
            skipped = outcome.skipped,
            "migration finished"
        );
        Ok(outcome)
    }

    async fn migrate_page(
        &self,
        wiki: &Wiki,
        page: &WikiPage,
        options: &MigrateOptions,
        outcome: &mut MigrationOutcome,
        failures: &mut Vec<(WikiPage, String)>,
    ) -> Result<(), DomainError> {
        if self.checkpoint.is_processed(page.id).await? {
            debug!(path = %page.path, "already migrated, skipping");
            outcome.migrated += 1;
            return Ok(());
        }

        let markdown = match self.source.page_content(&wiki.id, page.id).await {
            Ok(content) => content,
            Err(e) => {
                let msg = format!("Failed to retrieve content: {}", e);
                warn!(path = %page.path, error = %e, "content fetch failed");
                if !options.dry_run {
                    self.checkpoint.mark_failed(page.id, &msg).await?;
                }
                failures.push((page.clone(), msg));
                outcome.failed += 1;
                return Ok(());
            }
        };

        if markdown.trim().is_empty() {
            debug!(path = %page.path, "empty page, skipping");
            if !options.dry_run {
                self.checkpoint.mark_skipped(page.id, "Empty content").await?;
            }
            outcome.skipped += 1;
            return Ok(());
        }

        let wikitext = markdown_to_wikitext(&markdown);
        let title = page_title(&page.path, page.id);

        if options.dry_run {
            info!(title = %title, chars = wikitext.chars().count(), "dry-run: would create page");
            outcome.migrated += 1;
            return Ok(());
        }

        match self.target.upsert_page(&title, &wikitext, EDIT_SUMMARY).await {
            Ok(()) => {
                self.checkpoint.mark_processed(page.id).await?;
                debug!(title = %title, "page migrated");
                outcome.migrated += 1;
            }
            Err(e) => {
                let msg = e.to_string();
                warn!(title = %title, error = %e, "page creation failed");
                self.checkpoint.mark_failed(page.id, &msg).await?;
                failures.push((page.clone(), msg));
                outcome.failed += 1;
            }
        }
        Ok(())
    }

    async fn write_failure_report(
        &self,
        wiki: &Wiki,
        failures: &[(WikiPage, String)],
    ) -> Result<(), DomainError> {
        let markdown = failure_report_markdown(&wiki.name, failures);
        let md_path = write_report(&self.report_dir, "migration_failures", "md", &markdown).await?;

        let csv = failed_pages_to_csv(failures)
            .map_err(|e| DomainError::Report(format!("CSV export failed: {}", e)))?;
        let csv_path = write_report(&self.report_dir, "migration_failures", "csv", &csv).await?;

        warn!(
            failed = failures.len(),
            report = %md_path.display(),
            csv = %csv_path.display(),
            "some pages need manual review"
        );
        Ok(())
    }
}

/// Pick the wiki to work on. None when the project has no wikis at all;
/// a named wiki that does not exist is an error naming the alternatives.
pub(crate) async fn select_wiki(
    source: &dyn WikiSource,
    wanted: Option<&str>,
) -> Result<Option<Wiki>, DomainError> {
    let wikis = source.list_wikis().await?;
    if wikis.is_empty() {
        warn!("no wikis found in the project");
        return Ok(None);
    }

    match wanted {
        Some(name) => wikis
            .iter()
            .find(|w| w.name.eq_ignore_ascii_case(name))
            .cloned()
            .map(Some)
            .ok_or_else(|| {
                let available: Vec<&str> = wikis.iter().map(|w| w.name.as_str()).collect();
                DomainError::Config(format!(
                    "wiki '{}' not found, available wikis: {}",
                    name,
                    available.join(", ")
                ))
            }),
        None => {
            let first = wikis.into_iter().next();
            if let Some(w) = &first {
                info!(wiki = %w.name, "no wiki named, using the first one");
            }
            Ok(first)
        }
    }
}

/// Apply the page filters in order: explicit paths, exclude pattern,
/// modification date, resume point.
fn filter_pages(
    mut pages: Vec<WikiPage>,
    options: &MigrateOptions,
) -> Result<Vec<WikiPage>, DomainError> {
    if !options.pages.is_empty() {
        let wanted: Vec<&str> = options
            .pages
            .iter()
            .map(|p| p.trim_start_matches('/'))
            .collect();
        pages.retain(|p| wanted.contains(&p.path.trim_start_matches('/')));
    }

    if let Some(pattern) = &options.exclude_pattern {
        let re = Regex::new(pattern).map_err(|e| {
            DomainError::Config(format!("invalid --exclude-pattern '{}': {}", pattern, e))
        })?;
        pages.retain(|p| !re.is_match(&p.path));
    }

    if let Some(after) = options.modified_after {
        // Listings do not always carry a modification date; keep undated
        // pages rather than silently dropping them.
        pages.retain(|p| p.last_modified.map_or(true, |t| t > after));
    }

    if let Some(resume_path) = &options.resume_from {
        let needle = resume_path.trim_start_matches('/');
        let position = pages
            .iter()
            .position(|p| p.path.trim_start_matches('/') == needle)
            .ok_or_else(|| {
                DomainError::Config(format!(
                    "--resume-from page '{}' not found in the listing",
                    resume_path
                ))
            })?;
        pages.drain(..position);
    }

    Ok(pages)
}

fn failure_report_markdown(wiki_name: &str, failures: &[(WikiPage, String)]) -> String {
    let mut report = format!(
        "# Migration Manual Review Report - {}\n\n\
         {} page(s) failed after all retries and need manual attention.\n\n\
         ## 🚨 Failed Pages\n\n",
        wiki_name,
        failures.len()
    );

    for (i, (page, error)) in failures.iter().enumerate() {
        report.push_str(&format!("{}. **{}** - {}\n", i + 1, page.path, error));
    }

    report.push_str(
        "\n## 🎯 Recommendations\n\n\
         - Fix the cause (credentials, network, page content) and re-run the migration;\n\
           the checkpoint skips pages that already migrated\n\
         - Persistent failures can be created manually from the CSV export\n\n",
    );
    report.push_str(&format!(
        "---\n*Report generated by MediaWiki Migration Tools on {}*\n",
        Local::now().format("%B %d, %Y")
    ));
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Wiki;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::tempdir;

    fn page(id: i64, path: &str) -> WikiPage {
        WikiPage {
            id,
            path: path.to_string(),
            remote_url: None,
            last_modified: None,
        }
    }

    fn dated(id: i64, path: &str, rfc3339: &str) -> WikiPage {
        WikiPage {
            last_modified: Some(rfc3339.parse().unwrap()),
            ..page(id, path)
        }
    }

    struct FakeSource {
        pages: Vec<WikiPage>,
        contents: HashMap<i64, String>,
        fail_ids: HashSet<i64>,
    }

    impl FakeSource {
        fn new(pages: Vec<WikiPage>, contents: &[(i64, &str)]) -> Self {
            Self {
                pages,
                contents: contents
                    .iter()
                    .map(|(id, c)| (*id, c.to_string()))
                    .collect(),
                fail_ids: HashSet::new(),
            }
        }
    }

    #[async_trait::async_trait]
    impl WikiSource for FakeSource {
        async fn list_wikis(&self) -> Result<Vec<Wiki>, DomainError> {
            Ok(vec![Wiki {
                id: "w1".to_string(),
                name: "TeamDocs".to_string(),
            }])
        }

        async fn list_pages(&self, _wiki_id: &str) -> Result<Vec<WikiPage>, DomainError> {
            Ok(self.pages.clone())
        }

        async fn page_content(&self, _wiki_id: &str, page_id: i64) -> Result<String, DomainError> {
            if self.fail_ids.contains(&page_id) {
                return Err(DomainError::Source("API error 500: broken".to_string()));
            }
            Ok(self.contents.get(&page_id).cloned().unwrap_or_default())
        }
    }

    #[derive(Default)]
    struct RecordingTarget {
        edits: Mutex<Vec<(String, String)>>,
    }

    #[async_trait::async_trait]
    impl WikiTarget for RecordingTarget {
        async fn upsert_page(
            &self,
            title: &str,
            text: &str,
            _summary: &str,
        ) -> Result<(), DomainError> {
            self.edits
                .lock()
                .unwrap()
                .push((title.to_string(), text.to_string()));
            Ok(())
        }

        async fn list_titles(&self) -> Result<Vec<String>, DomainError> {
            Ok(Vec::new())
        }

        async fn page_text(&self, _title: &str) -> Result<String, DomainError> {
            Ok(String::new())
        }
    }

    #[derive(Default)]
    struct MemoryCheckpoint {
        processed: Mutex<HashSet<i64>>,
        failed: Mutex<HashMap<i64, String>>,
        skipped: Mutex<HashMap<i64, String>>,
        cleared: AtomicBool,
    }

    #[async_trait::async_trait]
    impl CheckpointStore for MemoryCheckpoint {
        async fn is_processed(&self, page_id: i64) -> Result<bool, DomainError> {
            Ok(self.processed.lock().unwrap().contains(&page_id))
        }

        async fn mark_processed(&self, page_id: i64) -> Result<(), DomainError> {
            self.processed.lock().unwrap().insert(page_id);
            Ok(())
        }

        async fn mark_failed(&self, page_id: i64, error: &str) -> Result<(), DomainError> {
            self.failed.lock().unwrap().insert(page_id, error.to_string());
            Ok(())
        }

        async fn mark_skipped(&self, page_id: i64, reason: &str) -> Result<(), DomainError> {
            self.skipped.lock().unwrap().insert(page_id, reason.to_string());
            Ok(())
        }

        async fn processed_count(&self) -> Result<usize, DomainError> {
            Ok(self.processed.lock().unwrap().len())
        }

        async fn clear(&self) -> Result<(), DomainError> {
            self.cleared.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn service(
        source: FakeSource,
        report_dir: std::path::PathBuf,
    ) -> (MigrateService, Arc<RecordingTarget>, Arc<MemoryCheckpoint>) {
        let target = Arc::new(RecordingTarget::default());
        let checkpoint = Arc::new(MemoryCheckpoint::default());
        let svc = MigrateService::new(
            Arc::new(source),
            target.clone(),
            checkpoint.clone(),
            report_dir,
        );
        (svc, target, checkpoint)
    }

    fn options() -> MigrateOptions {
        MigrateOptions {
            batch_size: 50,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn migrates_pages_and_clears_checkpoint_on_clean_run() {
        let dir = tempdir().unwrap();
        let source = FakeSource::new(
            vec![page(1, "/Home"), page(2, "/Guides/Setup")],
            &[(1, "# Home\n"), (2, "Some **docs**.\n")],
        );
        let (svc, target, checkpoint) = service(source, dir.path().to_path_buf());

        let outcome = svc.migrate(&options()).await.unwrap();

        assert_eq!(outcome.migrated, 2);
        assert_eq!(outcome.failed, 0);
        let edits = target.edits.lock().unwrap();
        assert_eq!(edits.len(), 2);
        assert_eq!(edits[0].0, "Home");
        assert_eq!(edits[0].1, "= Home =\n");
        assert_eq!(edits[1].0, "Guides/Setup");
        assert!(edits[1].1.contains("'''docs'''"));
        assert!(checkpoint.cleared.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn dry_run_never_touches_target_or_checkpoint() {
        let dir = tempdir().unwrap();
        let source = FakeSource::new(
            vec![page(1, "/Home"), page(2, "/Setup")],
            &[(1, "# Home\n"), (2, "text\n")],
        );
        let (svc, target, checkpoint) = service(source, dir.path().to_path_buf());

        let outcome = svc
            .migrate(&MigrateOptions {
                dry_run: true,
                ..options()
            })
            .await
            .unwrap();

        assert_eq!(outcome.migrated, 2);
        assert!(target.edits.lock().unwrap().is_empty());
        assert!(checkpoint.processed.lock().unwrap().is_empty());
        assert!(!checkpoint.cleared.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn resume_skips_pages_already_in_checkpoint() {
        let dir = tempdir().unwrap();
        let source = FakeSource::new(
            vec![page(1, "/Home"), page(2, "/Setup")],
            &[(1, "one\n"), (2, "two\n")],
        );
        let (svc, target, checkpoint) = service(source, dir.path().to_path_buf());
        checkpoint.processed.lock().unwrap().insert(1);

        let outcome = svc.migrate(&options()).await.unwrap();

        // Page 1 counts as migrated without a second edit.
        assert_eq!(outcome.migrated, 2);
        let edits = target.edits.lock().unwrap();
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].0, "Setup");
    }

    #[tokio::test]
    async fn empty_pages_are_skipped_with_reason() {
        let dir = tempdir().unwrap();
        let source = FakeSource::new(
            vec![page(1, "/Blank"), page(2, "/Full")],
            &[(1, "  \n\n"), (2, "content\n")],
        );
        let (svc, target, checkpoint) = service(source, dir.path().to_path_buf());

        let outcome = svc.migrate(&options()).await.unwrap();

        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.migrated, 1);
        assert_eq!(target.edits.lock().unwrap().len(), 1);
        assert_eq!(
            checkpoint.skipped.lock().unwrap().get(&1).map(String::as_str),
            Some("Empty content")
        );
    }

    #[tokio::test]
    async fn fetch_failure_is_recorded_and_run_continues() {
        let dir = tempdir().unwrap();
        let mut source = FakeSource::new(
            vec![page(1, "/Broken"), page(2, "/Fine")],
            &[(2, "content\n")],
        );
        source.fail_ids.insert(1);
        let (svc, target, checkpoint) = service(source, dir.path().to_path_buf());

        let outcome = svc.migrate(&options()).await.unwrap();

        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.migrated, 1);
        assert_eq!(target.edits.lock().unwrap().len(), 1);
        assert!(checkpoint.failed.lock().unwrap().contains_key(&1));
        // A run with failures keeps the checkpoint and leaves a report behind.
        assert!(!checkpoint.cleared.load(Ordering::SeqCst));
        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(names.iter().any(|n| n.starts_with("migration_failures_") && n.ends_with(".md")));
        assert!(names.iter().any(|n| n.starts_with("migration_failures_") && n.ends_with(".csv")));
    }

    #[tokio::test]
    async fn named_wiki_not_found_lists_available() {
        let dir = tempdir().unwrap();
        let source = FakeSource::new(vec![page(1, "/Home")], &[(1, "x\n")]);
        let (svc, _, _) = service(source, dir.path().to_path_buf());

        let err = svc
            .migrate(&MigrateOptions {
                wiki_name: Some("Nope".to_string()),
                ..options()
            })
            .await
            .unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("'Nope' not found"));
        assert!(msg.contains("TeamDocs"));
    }

    #[tokio::test]
    async fn resume_from_drops_prior_pages() {
        let dir = tempdir().unwrap();
        let source = FakeSource::new(
            vec![page(1, "/A"), page(2, "/B"), page(3, "/C")],
            &[(1, "a\n"), (2, "b\n"), (3, "c\n")],
        );
        let (svc, target, _) = service(source, dir.path().to_path_buf());

        let outcome = svc
            .migrate(&MigrateOptions {
                resume_from: Some("/B".to_string()),
                ..options()
            })
            .await
            .unwrap();

        assert_eq!(outcome.migrated, 2);
        let edits = target.edits.lock().unwrap();
        let titles: Vec<&str> = edits.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(titles, vec!["B", "C"]);
    }

    #[test]
    fn pages_filter_matches_with_or_without_leading_slash() {
        let pages = vec![page(1, "/A"), page(2, "/B"), page(3, "/C")];
        let opts = MigrateOptions {
            pages: vec!["B".to_string(), "/C".to_string()],
            ..options()
        };

        let kept = filter_pages(pages, &opts).unwrap();
        let paths: Vec<&str> = kept.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(paths, vec!["/B", "/C"]);
    }

    #[test]
    fn exclude_pattern_drops_matching_paths() {
        let pages = vec![page(1, "/Archive/Old"), page(2, "/Current")];
        let opts = MigrateOptions {
            exclude_pattern: Some("^/Archive/".to_string()),
            ..options()
        };

        let kept = filter_pages(pages, &opts).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].path, "/Current");
    }

    #[test]
    fn invalid_exclude_pattern_is_a_config_error() {
        let err = filter_pages(
            vec![page(1, "/A")],
            &MigrateOptions {
                exclude_pattern: Some("[broken".to_string()),
                ..options()
            },
        )
        .unwrap_err();

        assert!(matches!(err, DomainError::Config(_)));
    }

    #[test]
    fn modified_after_keeps_undated_pages() {
        let pages = vec![
            dated(1, "/Old", "2023-01-01T00:00:00Z"),
            dated(2, "/New", "2025-06-01T00:00:00Z"),
            page(3, "/Undated"),
        ];
        let opts = MigrateOptions {
            modified_after: Some("2024-01-01T00:00:00Z".parse().unwrap()),
            ..options()
        };

        let kept = filter_pages(pages, &opts).unwrap();
        let paths: Vec<&str> = kept.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(paths, vec!["/New", "/Undated"]);
    }

    #[test]
    fn resume_from_unknown_path_is_an_error() {
        let err = filter_pages(
            vec![page(1, "/A")],
            &MigrateOptions {
                resume_from: Some("/Missing".to_string()),
                ..options()
            },
        )
        .unwrap_err();

        assert!(err.to_string().contains("/Missing"));
    }
}
