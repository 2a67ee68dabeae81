//! Post-migration validation: grade migrated pages and check internal
//! links against the target wiki.
//!
//! Read-only against MediaWiki. Quality grading is capped to the first
//! 100 pages and link checking samples the first 50, so validation stays
//! cheap even on large wikis.

use crate::adapters::conversion::{content_quality, internal_link_targets};
use crate::adapters::reports::write_report;
use crate::domain::{DomainError, PageQuality, QualityLevel};
use crate::ports::WikiTarget;
use chrono::Local;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Quality grading stops after this many pages.
const QUALITY_PAGE_CAP: usize = 100;
/// Link validation samples this many pages.
const LINK_SAMPLE: usize = 50;

/// What the CLI reports after a validation run.
#[derive(Debug)]
pub struct ValidationOutcome {
    pub report_path: PathBuf,
    pub pages_found: usize,
    pub pages_accessible: usize,
    pub accessibility_rate: f64,
    pub quality_rate: f64,
    pub total_issues: usize,
    pub broken_links: usize,
}

struct ValidationResults {
    pages_found: usize,
    pages_accessible: usize,
    pages_with_issues: usize,
    total_issues: usize,
    qualities: Vec<PageQuality>,
    inaccessible: Vec<String>,
    links: LinkCheck,
}

#[derive(Default)]
struct LinkCheck {
    total: usize,
    valid: usize,
    broken: usize,
    pages_with_broken: Vec<(String, Vec<String>)>,
}

impl ValidationResults {
    fn accessibility_rate(&self) -> f64 {
        if self.pages_found == 0 {
            return 0.0;
        }
        round1(self.pages_accessible as f64 / self.pages_found as f64 * 100.0)
    }

    fn quality_rate(&self) -> f64 {
        if self.pages_accessible == 0 {
            return 0.0;
        }
        round1(
            (self.pages_accessible - self.pages_with_issues) as f64
                / self.pages_accessible as f64
                * 100.0,
        )
    }

    fn level_count(&self, level: QualityLevel) -> usize {
        self.qualities.iter().filter(|q| q.level == level).count()
    }
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Validation service. Reads back what the migration wrote.
pub struct ValidateService {
    target: Arc<dyn WikiTarget>,
    wiki_url: String,
    report_dir: PathBuf,
}

impl ValidateService {
    pub fn new(target: Arc<dyn WikiTarget>, wiki_url: String, report_dir: PathBuf) -> Self {
        Self {
            target,
            wiki_url,
            report_dir,
        }
    }

    /// Run the full validation and write the report.
    pub async fn validate(&self) -> Result<ValidationOutcome, DomainError> {
        let results = self.collect().await?;
        let report = validation_report_markdown(&self.wiki_url, &results);
        let path = write_report(
            &self.report_dir,
            "migration_validation_report",
            "md",
            &report,
        )
        .await?;

        info!(
            pages = results.pages_found,
            accessible = results.pages_accessible,
            issues = results.total_issues,
            broken_links = results.links.broken,
            report = %path.display(),
            "validation complete"
        );
        Ok(ValidationOutcome {
            pages_found: results.pages_found,
            pages_accessible: results.pages_accessible,
            accessibility_rate: results.accessibility_rate(),
            quality_rate: results.quality_rate(),
            total_issues: results.total_issues,
            broken_links: results.links.broken,
            report_path: path,
        })
    }

    async fn collect(&self) -> Result<ValidationResults, DomainError> {
        let titles = self.target.list_titles().await?;
        info!(pages = titles.len(), "validating migrated pages");

        let mut results = ValidationResults {
            pages_found: titles.len(),
            pages_accessible: 0,
            pages_with_issues: 0,
            total_issues: 0,
            qualities: Vec::new(),
            inaccessible: Vec::new(),
            links: LinkCheck::default(),
        };

        // Texts fetched during grading are reused for link validation.
        let mut texts: HashMap<&str, String> = HashMap::new();

        for title in titles.iter().take(QUALITY_PAGE_CAP) {
            let text = match self.target.page_text(title).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(title = %title, error = %e, "page not readable");
                    results.inaccessible.push(title.clone());
                    continue;
                }
            };
            if text.is_empty() {
                results.inaccessible.push(title.clone());
                continue;
            }

            results.pages_accessible += 1;
            let quality = content_quality(title, &text);
            if !quality.issues.is_empty() {
                results.pages_with_issues += 1;
                results.total_issues += quality.issues.len();
            }
            results.qualities.push(quality);
            texts.insert(title.as_str(), text);
        }

        let title_set: HashSet<&str> = titles.iter().map(String::as_str).collect();
        for title in titles.iter().take(LINK_SAMPLE) {
            let Some(text) = texts.get(title.as_str()) else {
                continue;
            };
            let mut broken_here = Vec::new();
            for link in internal_link_targets(text) {
                results.links.total += 1;
                if title_set.contains(link.as_str()) {
                    results.links.valid += 1;
                } else {
                    results.links.broken += 1;
                    broken_here.push(link);
                }
            }
            if !broken_here.is_empty() {
                results
                    .links
                    .pages_with_broken
                    .push((title.clone(), broken_here));
            }
        }

        Ok(results)
    }
}

fn recommendations(results: &ValidationResults) -> Vec<String> {
    let mut recs = Vec::new();

    let inaccessible = results.pages_found.saturating_sub(results.pages_accessible);
    if inaccessible > 0 {
        recs.push(format!(
            "🔧 Fix {} inaccessible pages - check page titles and permissions",
            inaccessible
        ));
    }
    if results.pages_with_issues > 0 {
        recs.push(format!(
            "📝 Review {} pages with content issues",
            results.pages_with_issues
        ));
    }
    let poor = results.level_count(QualityLevel::Poor);
    if poor > 0 {
        recs.push(format!(
            "⚠️ Manually review {} pages with poor quality scores",
            poor
        ));
    }
    if results.links.broken > 0 {
        recs.push(format!("🔗 Fix {} broken internal links", results.links.broken));
    }

    if recs.is_empty() {
        recs.push("🎉 Migration validation looks excellent! No major issues found.".to_string());
    } else {
        recs.push("📋 After fixes, run validation again to verify improvements".to_string());
    }
    recs
}

fn validation_report_markdown(wiki_url: &str, results: &ValidationResults) -> String {
    let mut report = format!(
        "# MediaWiki Migration Validation Report\n\n\
         **Generated**: {}\n\
         **MediaWiki URL**: {}\n\n\
         ## 📊 Overall Results\n\n\
         ### Migration Success Metrics\n\
         - **Pages Found**: {}\n\
         - **Pages Accessible**: {} ({}%)\n\
         - **Pages with Issues**: {}\n\
         - **Quality Success Rate**: {}%\n\n\
         ### Content Quality Distribution\n",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        wiki_url,
        results.pages_found,
        results.pages_accessible,
        results.accessibility_rate(),
        results.pages_with_issues,
        results.quality_rate(),
    );

    for level in [
        QualityLevel::Excellent,
        QualityLevel::Good,
        QualityLevel::Fair,
        QualityLevel::Poor,
    ] {
        let count = results.level_count(level);
        let pct = if results.pages_accessible > 0 {
            count as f64 / results.pages_accessible as f64 * 100.0
        } else {
            0.0
        };
        report.push_str(&format!("- **{}**: {} pages ({:.1}%)\n", level, count, pct));
    }

    if results.links.total > 0 {
        report.push_str(&format!(
            "\n### 🔗 Link Validation\n\
             - **Total Internal Links Checked**: {}\n\
             - **Valid Links**: {}\n\
             - **Broken Links**: {}\n",
            results.links.total, results.links.valid, results.links.broken
        ));
        if results.links.broken > 0 {
            report.push_str(&format!(
                "- **Link Success Rate**: {:.1}%\n",
                results.links.valid as f64 / results.links.total as f64 * 100.0
            ));
        }
    }

    report.push_str("\n## 🚨 Issues Found\n\n");
    let mut by_type: HashMap<&str, usize> = HashMap::new();
    for quality in &results.qualities {
        for issue in &quality.issues {
            *by_type.entry(issue.as_str()).or_insert(0) += 1;
        }
    }
    if by_type.is_empty() {
        report.push_str("🎉 No content issues found!\n");
    } else {
        let mut sorted: Vec<(&str, usize)> = by_type.into_iter().collect();
        sorted.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        for (issue, count) in sorted {
            report.push_str(&format!("- **{}**: {} pages\n", issue, count));
        }
    }

    if results.links.broken > 0 {
        report.push_str("\n### 🔗 Broken Links Details\n\n");
        for (page, links) in results.links.pages_with_broken.iter().take(10) {
            report.push_str(&format!("**{}**:\n", page));
            for link in links.iter().take(5) {
                report.push_str(&format!("  - {}\n", link));
            }
            report.push('\n');
        }
    }

    report.push_str("\n## 🎯 Recommendations\n\n");
    for rec in recommendations(results) {
        report.push_str(&format!("- {}\n", rec));
    }

    report.push_str(
        "\n## 🚀 Next Steps\n\n\
         1. **Fix broken internal links** - Update page references\n\
         2. **Review pages with poor quality scores** - Manual content verification\n\
         3. **Test key user workflows** - Ensure critical pages work correctly\n\
         4. **Update bookmarks and documentation** - Point to new MediaWiki URLs\n\n\
         ---\n\
         *Validation report generated by MediaWiki Migration Tools*\n",
    );

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    struct FakeTarget {
        titles: Vec<String>,
        texts: HashMap<String, String>,
    }

    impl FakeTarget {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                titles: pages.iter().map(|(t, _)| t.to_string()).collect(),
                texts: pages
                    .iter()
                    .map(|(t, x)| (t.to_string(), x.to_string()))
                    .collect(),
            }
        }
    }

    #[async_trait::async_trait]
    impl WikiTarget for FakeTarget {
        async fn upsert_page(
            &self,
            _title: &str,
            _text: &str,
            _summary: &str,
        ) -> Result<(), DomainError> {
            Err(DomainError::Target("validation never writes".to_string()))
        }

        async fn list_titles(&self) -> Result<Vec<String>, DomainError> {
            Ok(self.titles.clone())
        }

        async fn page_text(&self, title: &str) -> Result<String, DomainError> {
            Ok(self.texts.get(title).cloned().unwrap_or_default())
        }
    }

    fn service(target: FakeTarget, dir: PathBuf) -> ValidateService {
        ValidateService::new(Arc::new(target), "https://wiki.example.org".to_string(), dir)
    }

    const CLEAN: &str =
        "== Heading ==\n\nLong enough converted prose that passes every quality check easily.";

    #[tokio::test]
    async fn grades_pages_and_counts_accessibility() {
        let target = FakeTarget::new(&[
            ("Good", CLEAN),
            ("Residual", "**bold** left behind"),
            ("Ghost", ""),
        ]);
        let svc = service(target, PathBuf::from("unused"));

        let results = svc.collect().await.unwrap();

        assert_eq!(results.pages_found, 3);
        assert_eq!(results.pages_accessible, 2);
        assert_eq!(results.pages_with_issues, 1);
        assert_eq!(results.inaccessible, vec!["Ghost"]);
        assert_eq!(results.accessibility_rate(), 66.7);
        assert_eq!(results.quality_rate(), 50.0);
        assert_eq!(results.level_count(QualityLevel::Excellent), 1);
    }

    #[tokio::test]
    async fn detects_broken_internal_links() {
        let home = "See [[Other]] and [[Missing]] for details, plus the [[Home|self link]].";
        let target = FakeTarget::new(&[("Home", home), ("Other", CLEAN)]);
        let svc = service(target, PathBuf::from("unused"));

        let results = svc.collect().await.unwrap();

        assert_eq!(results.links.total, 3);
        assert_eq!(results.links.valid, 2);
        assert_eq!(results.links.broken, 1);
        assert_eq!(
            results.links.pages_with_broken,
            vec![("Home".to_string(), vec!["Missing".to_string()])]
        );
    }

    #[tokio::test]
    async fn writes_report_with_summary_and_recommendations() {
        let dir = tempdir().unwrap();
        let target = FakeTarget::new(&[("Good", CLEAN), ("Bad", "# still markdown\n")]);
        let svc = service(target, dir.path().to_path_buf());

        let outcome = svc.validate().await.unwrap();

        assert_eq!(outcome.pages_found, 2);
        assert_eq!(outcome.total_issues, 1);
        let body = std::fs::read_to_string(&outcome.report_path).unwrap();
        assert!(body.contains("# MediaWiki Migration Validation Report"));
        assert!(body.contains("**MediaWiki URL**: https://wiki.example.org"));
        assert!(body.contains("Header markdown not converted"));
        assert!(body.contains("Review 1 pages with content issues"));
    }

    #[tokio::test]
    async fn empty_wiki_still_produces_a_report() {
        let dir = tempdir().unwrap();
        let svc = service(FakeTarget::new(&[]), dir.path().to_path_buf());

        let outcome = svc.validate().await.unwrap();

        assert_eq!(outcome.pages_found, 0);
        assert_eq!(outcome.accessibility_rate, 0.0);
        let body = std::fs::read_to_string(&outcome.report_path).unwrap();
        assert!(body.contains("looks excellent"));
    }
}
