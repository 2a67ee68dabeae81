//! Conversion preview: show how pages will look in MediaWiki before
//! anything is written.
//!
//! - Single-page preview by path, or a diverse sample of the whole wiki
//! - Flags content that needs attention (images, HTML, footnotes)
//! - Writes a side-by-side Markdown report, never touches the target

use crate::adapters::conversion::{conversion_issues, markdown_to_wikitext};
use crate::adapters::reports::write_report;
use crate::domain::{ConversionIssue, DomainError, IssueSeverity, Wiki, WikiPage};
use crate::ports::WikiSource;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::migrate_service::select_wiki;

/// Comparison blocks in the report are capped to keep it readable.
const PREVIEW_CHARS: usize = 500;

/// One previewed page: source Markdown, converted wikitext and findings.
#[derive(Debug)]
pub struct PagePreview {
    pub page: WikiPage,
    pub original: String,
    pub converted: String,
    pub issues: Vec<ConversionIssue>,
}

/// Preview service. Converts pages in memory and reports on the result.
pub struct PreviewService {
    source: Arc<dyn WikiSource>,
    report_dir: PathBuf,
}

impl PreviewService {
    pub fn new(source: Arc<dyn WikiSource>, report_dir: PathBuf) -> Self {
        Self { source, report_dir }
    }

    /// Preview a single page by its path. Returns the report path.
    pub async fn preview_one(
        &self,
        wiki_name: Option<&str>,
        page_path: &str,
    ) -> Result<Option<PathBuf>, DomainError> {
        let Some(wiki) = select_wiki(self.source.as_ref(), wiki_name).await? else {
            return Ok(None);
        };

        let pages = self.source.list_pages(&wiki.id).await?;
        let page = pages
            .iter()
            .find(|p| p.path.eq_ignore_ascii_case(page_path))
            .cloned()
            .ok_or_else(|| {
                DomainError::Config(format!(
                    "page '{}' not found in wiki '{}'",
                    page_path, wiki.name
                ))
            })?;

        let content = self.source.page_content(&wiki.id, page.id).await?;
        let preview = build_preview(page, content);
        self.write_preview_report(&wiki, &[preview]).await.map(Some)
    }

    /// Preview a diverse sample of pages: the first page, the largest, a
    /// middle-sized one, then evenly stepped picks up to `sample_size`.
    pub async fn preview_sample(
        &self,
        wiki_name: Option<&str>,
        sample_size: usize,
    ) -> Result<Option<PathBuf>, DomainError> {
        let Some(wiki) = select_wiki(self.source.as_ref(), wiki_name).await? else {
            return Ok(None);
        };

        let pages = self.source.list_pages(&wiki.id).await?;
        if pages.is_empty() {
            warn!(wiki = %wiki.name, "wiki has no pages");
            return Ok(None);
        }

        let first_content = match self.source.page_content(&wiki.id, pages[0].id).await {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %pages[0].path, error = %e, "first page fetch failed");
                String::new()
            }
        };
        let first = (pages[0].clone(), first_content);

        let mut rest: Vec<(WikiPage, String)> = Vec::new();
        for page in &pages[1..] {
            match self.source.page_content(&wiki.id, page.id).await {
                Ok(content) if !content.trim().is_empty() => {
                    rest.push((page.clone(), content));
                }
                Ok(_) => debug!(path = %page.path, "skipping empty page"),
                Err(e) => warn!(path = %page.path, error = %e, "skipping page, fetch failed"),
            }
        }

        let previews: Vec<PagePreview> = pick_sample(first, rest, sample_size)
            .into_iter()
            .map(|(page, content)| {
                debug!(path = %page.path, "previewing page");
                build_preview(page, content)
            })
            .collect();

        self.write_preview_report(&wiki, &previews).await.map(Some)
    }

    async fn write_preview_report(
        &self,
        wiki: &Wiki,
        previews: &[PagePreview],
    ) -> Result<PathBuf, DomainError> {
        let report = preview_report_markdown(&wiki.name, previews);
        let path = write_report(&self.report_dir, "content_preview_report", "md", &report).await?;
        info!(
            pages = previews.len(),
            report = %path.display(),
            "preview complete"
        );
        Ok(path)
    }
}

/// Convert one page and analyze it. An empty page yields an Info finding
/// instead of a conversion.
fn build_preview(page: WikiPage, content: String) -> PagePreview {
    if content.trim().is_empty() {
        return PagePreview {
            page,
            original: content,
            converted: String::new(),
            issues: vec![ConversionIssue::new(IssueSeverity::Info, "Page is empty")],
        };
    }

    let converted = markdown_to_wikitext(&content);
    let issues = conversion_issues(&content);
    PagePreview {
        page,
        original: content,
        converted,
        issues,
    }
}

/// Select a diverse sample: the first page always, then the largest page,
/// a middle-sized page, and evenly stepped picks over the size-sorted rest.
/// May return fewer than `sample_size` pages on small wikis.
fn pick_sample(
    first: (WikiPage, String),
    mut rest: Vec<(WikiPage, String)>,
    sample_size: usize,
) -> Vec<(WikiPage, String)> {
    let mut sample = vec![first];
    rest.sort_by(|a, b| b.1.len().cmp(&a.1.len()));

    if !rest.is_empty() {
        sample.push(rest[0].clone());
    }
    if rest.len() > 2 {
        sample.push(rest[rest.len() / 2].clone());
    }

    let remaining = sample_size.saturating_sub(sample.len());
    let step = if remaining > 0 {
        (rest.len() / remaining).max(1)
    } else {
        1
    };

    let mut i = 0;
    while i < rest.len().min(remaining * step) {
        if sample.len() >= sample_size {
            break;
        }
        let candidate = &rest[i];
        if !sample.iter().any(|(p, _)| p.id == candidate.0.id) {
            sample.push(candidate.clone());
        }
        i += step;
    }

    sample.truncate(sample_size.max(1));
    sample
}

fn truncated(text: &str) -> String {
    let mut out: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().count() > PREVIEW_CHARS {
        out.push_str("\n... (truncated)");
    }
    out
}

fn preview_report_markdown(wiki_name: &str, previews: &[PagePreview]) -> String {
    let mut report = format!(
        "# Content Preview Report - {}\n\n\
         This report shows how your Azure DevOps wiki content will look after\n\
         conversion to MediaWiki.\n\n\
         ## 📊 Sample Analysis\n\n\
         Previewed {} pages to assess conversion quality.\n\n",
        wiki_name,
        previews.len()
    );

    for (i, preview) in previews.iter().enumerate() {
        report.push_str(&format!(
            "## {}. {}\n\n\
             **Original content length**: {} characters\n\
             **Converted content length**: {} characters\n\n",
            i + 1,
            preview.page.path,
            preview.original.chars().count(),
            preview.converted.chars().count()
        ));

        push_issue_section(
            &mut report,
            "### 🚨 Manual Review Required:",
            preview,
            IssueSeverity::ManualReview,
        );
        push_issue_section(&mut report, "### ⚠️ Warnings:", preview, IssueSeverity::Warning);
        push_issue_section(&mut report, "### ℹ️ Info:", preview, IssueSeverity::Info);

        report.push_str(&format!(
            "### 📋 Content Comparison\n\n\
             **Original (Markdown):**\n```markdown\n{}\n```\n\n\
             **Converted (MediaWiki):**\n```mediawiki\n{}\n```\n\n\
             ---\n\n",
            truncated(&preview.original),
            truncated(&preview.converted)
        ));
    }

    let total_issues: usize = previews
        .iter()
        .map(|p| {
            p.issues
                .iter()
                .filter(|i| i.severity != IssueSeverity::Info)
                .count()
        })
        .sum();
    let manual_pages = previews
        .iter()
        .filter(|p| p.issues.iter().any(|i| i.severity == IssueSeverity::ManualReview))
        .count();
    let warning_pages = previews
        .iter()
        .filter(|p| p.issues.iter().any(|i| i.severity == IssueSeverity::Warning))
        .count();

    report.push_str(&format!(
        "## 📋 Summary\n\n\
         Based on the {} sample pages:\n\n\
         - **Total conversion issues found**: {}\n\
         - **Pages needing manual review**: {}\n\
         - **Pages with warnings**: {}\n\n\
         ### 🎯 Recommendations\n\n\
         1. **Review all pages with manual review requirements** before migration\n\
         2. **Test the conversion** with a small batch first\n\
         3. **Prepare to handle images manually** - they need to be uploaded separately\n\
         4. **Check internal links** after migration to ensure they still work\n\
         5. **Review table formatting** in MediaWiki after conversion\n\n\
         ### ✅ Next Steps\n\n\
         1. If the preview looks good, proceed with the full migration\n\
         2. If issues are found, consider pre-processing problematic content in Azure DevOps\n\
         3. Plan extra time for manual review of flagged pages\n\n\
         ---\n\
         *Preview report generated by Content Preview Tool*\n",
        previews.len(),
        total_issues,
        manual_pages,
        warning_pages
    ));

    report
}

fn push_issue_section(
    report: &mut String,
    heading: &str,
    preview: &PagePreview,
    severity: IssueSeverity,
) {
    let matching: Vec<&ConversionIssue> = preview
        .issues
        .iter()
        .filter(|i| i.severity == severity)
        .collect();
    if matching.is_empty() {
        return;
    }
    report.push_str(heading);
    report.push('\n');
    for issue in matching {
        report.push_str(&format!("- {}\n", issue.message));
    }
    report.push('\n');
}
