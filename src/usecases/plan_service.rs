//! Pre-migration analysis: score every page, estimate the effort, write a
//! planning report.
//!
//! Read-only against Azure DevOps; never touches MediaWiki.

use crate::adapters::conversion::analyze_page;
use crate::adapters::reports::write_report;
use crate::adapters::ui::page_bar;
use crate::domain::{ComplexityLevel, ContentStats, DomainError, PageComplexity};
use crate::ports::WikiSource;
use chrono::Local;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::migrate_service::select_wiki;

/// Pages above this word count land in the "largest pages" list.
const LARGE_PAGE_WORDS: usize = 500;
/// Pages above this score land in the "most complex pages" list.
const COMPLEX_PAGE_SCORE: usize = 15;
/// Both lists are capped for readable reports.
const TOP_PAGES: usize = 10;

/// Aggregated analysis of one wiki.
#[derive(Debug, Default)]
pub struct WikiAnalysis {
    pub wiki_name: String,
    pub total_pages: usize,
    pub pages_with_content: usize,
    pub total_score: usize,
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    /// Field-wise sums over all analyzed pages.
    pub totals: ContentStats,
    /// Top pages by word count, above LARGE_PAGE_WORDS.
    pub largest: Vec<PageComplexity>,
    /// Top pages by score, above COMPLEX_PAGE_SCORE.
    pub most_complex: Vec<PageComplexity>,
}

impl WikiAnalysis {
    /// Total migration effort in minutes, weighted by complexity. Images get
    /// their own allowance because uploads are manual.
    pub fn estimate_minutes(&self) -> usize {
        self.low * 3 + self.medium * 12 + self.high * 45 + self.totals.images * 7
    }
}

/// Planning service. Analyzes a wiki and writes the analysis report.
pub struct PlanService {
    source: Arc<dyn WikiSource>,
    report_dir: PathBuf,
}

impl PlanService {
    pub fn new(source: Arc<dyn WikiSource>, report_dir: PathBuf) -> Self {
        Self { source, report_dir }
    }

    /// Analyze the wiki and write the planning report. Returns the report
    /// path, or None when there is nothing to analyze.
    pub async fn plan(&self, wiki_name: Option<&str>) -> Result<Option<PathBuf>, DomainError> {
        let Some(analysis) = self.analyze(wiki_name).await? else {
            return Ok(None);
        };

        let report = analysis_report_markdown(&analysis);
        let path = write_report(&self.report_dir, "migration_analysis_report", "md", &report).await?;
        info!(
            pages = analysis.pages_with_content,
            high_complexity = analysis.high,
            images = analysis.totals.images,
            report = %path.display(),
            "analysis complete"
        );
        Ok(Some(path))
    }

    /// Fetch and score every page of the wiki.
    pub async fn analyze(&self, wiki_name: Option<&str>) -> Result<Option<WikiAnalysis>, DomainError> {
        let Some(wiki) = select_wiki(self.source.as_ref(), wiki_name).await? else {
            return Ok(None);
        };
        info!(wiki = %wiki.name, "analyzing wiki");

        let pages = self.source.list_pages(&wiki.id).await?;
        if pages.is_empty() {
            warn!(wiki = %wiki.name, "wiki has no pages");
            return Ok(None);
        }

        let mut analysis = WikiAnalysis {
            wiki_name: wiki.name.clone(),
            total_pages: pages.len(),
            ..Default::default()
        };

        let bar = page_bar(pages.len() as u64);
        for page in &pages {
            bar.inc(1);
            let content = match self.source.page_content(&wiki.id, page.id).await {
                Ok(content) => content,
                Err(e) => {
                    warn!(path = %page.path, error = %e, "skipping page, content fetch failed");
                    continue;
                }
            };
            if content.trim().is_empty() {
                debug!(path = %page.path, "skipping empty page");
                continue;
            }

            let complexity = analyze_page(&page.path, &content);
            analysis.pages_with_content += 1;
            analysis.total_score += complexity.score;
            match complexity.level {
                ComplexityLevel::Low => analysis.low += 1,
                ComplexityLevel::Medium => analysis.medium += 1,
                ComplexityLevel::High => analysis.high += 1,
            }
            accumulate(&mut analysis.totals, &complexity.stats);

            if complexity.stats.word_count > LARGE_PAGE_WORDS {
                analysis.largest.push(complexity.clone());
            }
            if complexity.score > COMPLEX_PAGE_SCORE {
                analysis.most_complex.push(complexity);
            }
        }
        bar.finish();

        analysis
            .largest
            .sort_by(|a, b| b.stats.word_count.cmp(&a.stats.word_count));
        analysis.largest.truncate(TOP_PAGES);
        analysis.most_complex.sort_by(|a, b| b.score.cmp(&a.score));
        analysis.most_complex.truncate(TOP_PAGES);

        Ok(Some(analysis))
    }
}

fn accumulate(totals: &mut ContentStats, stats: &ContentStats) {
    totals.word_count += stats.word_count;
    totals.char_count += stats.char_count;
    totals.line_count += stats.line_count;
    totals.headers += stats.headers;
    totals.links += stats.links;
    totals.images += stats.images;
    totals.code_blocks += stats.code_blocks;
    totals.inline_code += stats.inline_code;
    totals.tables += stats.tables;
    totals.lists += stats.lists;
    totals.numbered_lists += stats.numbered_lists;
    totals.bold += stats.bold;
    totals.italic += stats.italic;
    totals.html_tags += stats.html_tags;
}

/// Per-page notes called out for the most complex pages.
fn complexity_notes(stats: &ContentStats) -> Vec<String> {
    let mut notes = Vec::new();
    if stats.images > 0 {
        notes.push(format!("{} images (need manual handling)", stats.images));
    }
    if stats.tables > 3 {
        notes.push(format!("{} tables (complex conversion)", stats.tables));
    }
    if stats.html_tags > 0 {
        notes.push(format!("{} HTML tags (may need conversion)", stats.html_tags));
    }
    if stats.code_blocks > 5 {
        notes.push(format!(
            "{} code blocks (check syntax highlighting)",
            stats.code_blocks
        ));
    }
    notes
}

/// Human-readable effort estimate: minutes, hours or 8-hour work days.
fn format_estimate(minutes: usize) -> String {
    if minutes < 60 {
        format!("{} minutes", minutes)
    } else if minutes < 480 {
        format!("{:.1} hours", minutes as f64 / 60.0)
    } else {
        format!("{:.1} work days", minutes as f64 / 480.0)
    }
}

fn analysis_report_markdown(analysis: &WikiAnalysis) -> String {
    let avg = if analysis.pages_with_content > 0 {
        analysis.total_score as f64 / analysis.pages_with_content as f64
    } else {
        0.0
    };
    let estimate = format_estimate(analysis.estimate_minutes());

    let mut report = format!(
        "# Azure DevOps Wiki Migration Analysis Report\n\n\
         ## 📊 Executive Summary\n\
         - **Wiki Name**: {}\n\
         - **Total Pages**: {}\n\
         - **Pages with Content**: {}\n\
         - **Empty Pages**: {}\n\
         - **Average Complexity Score**: {:.1}\n\
         - **Estimated Migration Time**: {}\n\n\
         ## 📈 Content Statistics\n\
         - **Total Words**: {}\n\
         - **Total Characters**: {}\n\
         - **Total Lines**: {}\n\
         - **Headers**: {}\n\
         - **Links**: {}\n\
         - **Images**: {} ⚠️ *Need manual handling*\n\
         - **Code Blocks**: {}\n\
         - **Tables**: {}\n\n\
         ## 🎯 Migration Complexity Assessment\n\n\
         ### Complexity Distribution\n\
         - **Low Complexity**: {} pages (easy migration)\n\
         - **Medium Complexity**: {} pages (moderate attention needed)\n\
         - **High Complexity**: {} pages (requires careful review)\n\n\
         ### Risk Assessment\n",
        analysis.wiki_name,
        analysis.total_pages,
        analysis.pages_with_content,
        analysis.total_pages - analysis.pages_with_content,
        avg,
        estimate,
        analysis.totals.word_count,
        analysis.totals.char_count,
        analysis.totals.line_count,
        analysis.totals.headers,
        analysis.totals.links,
        analysis.totals.images,
        analysis.totals.code_blocks,
        analysis.totals.tables,
        analysis.low,
        analysis.medium,
        analysis.high,
    );

    if analysis.high == 0 {
        report.push_str("✅ **Low Risk Migration** - No high-complexity pages detected\n\n");
    } else if analysis.high < 5 {
        report.push_str("⚠️ **Medium Risk Migration** - Few complex pages, manageable effort\n\n");
    } else {
        report.push_str(
            "🚨 **High Risk Migration** - Many complex pages require significant planning\n\n",
        );
    }

    report.push_str("## 🔍 Pages Requiring Special Attention\n\n### 📚 Largest Pages (Top 10)\n");
    if analysis.largest.is_empty() {
        report.push_str("No particularly large pages found.\n");
    } else {
        for (i, page) in analysis.largest.iter().enumerate() {
            report.push_str(&format!(
                "{}. **{}** - {} words ({} complexity)\n",
                i + 1,
                page.path,
                page.stats.word_count,
                page.level
            ));
        }
    }

    report.push_str("\n### 🔧 Most Complex Pages (Top 10)\n");
    if analysis.most_complex.is_empty() {
        report.push_str("No particularly complex pages found.\n");
    } else {
        for (i, page) in analysis.most_complex.iter().enumerate() {
            report.push_str(&format!(
                "{}. **{}** - Score: {} ({})\n",
                i + 1,
                page.path,
                page.score,
                page.level
            ));
            for note in complexity_notes(&page.stats) {
                report.push_str(&format!("   - {}\n", note));
            }
        }
    }

    report.push_str(&format!(
        "\n## 🎯 Estimated Migration Time\n\n\
         - **Low complexity pages** ({}): ~3 minutes each\n\
         - **Medium complexity pages** ({}): ~12 minutes each\n\
         - **High complexity pages** ({}): ~45 minutes each\n\
         - **Image handling**: {} images × ~7 minutes each\n\n\
         **Total Estimated Time**: {}\n\n\
         ## 🚀 Recommended Migration Order\n\n\
         1. **Low-complexity pages first** to validate the pipeline\n\
         2. **Medium-complexity pages** once the process is proven\n\
         3. **High-complexity pages last**, with manual review of each\n\
         4. **Images** uploaded manually after the text migration\n\n\
         ---\n\
         *Report generated by MediaWiki Migration Analysis Tool on {}*\n",
        analysis.low,
        analysis.medium,
        analysis.high,
        analysis.totals.images,
        estimate,
        Local::now().format("%B %d, %Y"),
    ));

    report
}
