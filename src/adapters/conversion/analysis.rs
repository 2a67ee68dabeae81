//! Content analyzers behind the plan, preview and validate commands.
//!
//! Counts Markdown constructs for complexity scoring, flags constructs the
//! converter cannot translate, and grades already-migrated wikitext.

use crate::domain::{
    ContentStats, ConversionIssue, IssueSeverity, PageComplexity, PageQuality, QualityLevel,
};
use once_cell::sync::Lazy;
use regex::Regex;

static MD_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#+\s").unwrap());
static MD_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[.*?\]\(.*?\)").unwrap());
static MD_IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[.*?\]\(.*?\)").unwrap());
static MD_CODE_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```.*?```").unwrap());
static MD_INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`[^`]+`").unwrap());
static MD_TABLE_ROW: Lazy<Regex> = Lazy::new(|| Regex::new(r"\|.*?\|").unwrap());
static MD_LIST_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*[-*+]\s").unwrap());
static MD_NUMBERED_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*\d+\.\s").unwrap());
static MD_BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*.*?\*\*").unwrap());
static MD_ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*.*?\*").unwrap());
static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static HTML_TAG_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</?([a-zA-Z][a-zA-Z0-9]*)[^>]*>").unwrap());
static HTML_OPEN_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<([a-zA-Z]+)[^>]*>").unwrap());
static MD_LINK_CAPTURE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap());
static TASK_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"- \[[ x]\]").unwrap());
static STRIKETHROUGH: Lazy<Regex> = Lazy::new(|| Regex::new(r"~~.*?~~").unwrap());
static FOOTNOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\^.*?\]").unwrap());
static WIKI_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[([^\]|]+)(?:\|[^\]]*)?\]\]").unwrap());

// Residual Markdown in supposedly converted wikitext. Each hit costs 15
// quality points.
static RESIDUAL_MARKDOWN: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (Regex::new(r"(?ms)\*\*.*?\*\*").unwrap(), "Bold"),
        (Regex::new(r"(?ms)\*.*?\*").unwrap(), "Italic"),
        (Regex::new(r"(?ms)```.*?```").unwrap(), "Code block"),
        (Regex::new(r"(?ms)\[.*?\]\(.*?\)").unwrap(), "Link"),
        (Regex::new(r"(?m)^#+\s").unwrap(), "Header"),
    ]
});

/// Counts every Markdown construct the converter and the planners care about.
pub fn content_stats(content: &str) -> ContentStats {
    ContentStats {
        word_count: content.split_whitespace().count(),
        char_count: content.chars().count(),
        line_count: content.split('\n').count(),
        headers: MD_HEADER.find_iter(content).count(),
        links: MD_LINK.find_iter(content).count(),
        images: MD_IMAGE.find_iter(content).count(),
        code_blocks: MD_CODE_BLOCK.find_iter(content).count(),
        inline_code: MD_INLINE_CODE.find_iter(content).count(),
        tables: MD_TABLE_ROW.find_iter(content).count(),
        lists: MD_LIST_ITEM.find_iter(content).count(),
        numbered_lists: MD_NUMBERED_ITEM.find_iter(content).count(),
        bold: MD_BOLD.find_iter(content).count(),
        italic: MD_ITALIC.find_iter(content).count(),
        html_tags: HTML_TAG.find_iter(content).count(),
    }
}

/// Stats plus the derived complexity score and level for one page.
pub fn analyze_page(path: &str, content: &str) -> PageComplexity {
    let stats = content_stats(content);
    PageComplexity {
        path: path.to_string(),
        score: stats.score(),
        level: stats.level(),
        stats,
    }
}

/// Flags constructs that will not survive the conversion untouched.
pub fn conversion_issues(markdown: &str) -> Vec<ConversionIssue> {
    let mut issues = Vec::new();

    let images: Vec<&str> = MD_IMAGE.find_iter(markdown).map(|m| m.as_str()).collect();
    if !images.is_empty() {
        issues.push(ConversionIssue::new(
            IssueSeverity::ManualReview,
            format!("{} image(s) need manual upload to MediaWiki", images.len()),
        ));
        for image in images.iter().take(3) {
            issues.push(ConversionIssue::new(
                IssueSeverity::ManualReview,
                format!("Image: {image}"),
            ));
        }
    }

    let mut tag_names: Vec<String> = HTML_TAG_NAME
        .captures_iter(markdown)
        .map(|caps| caps[1].to_lowercase())
        .collect();
    tag_names.sort();
    tag_names.dedup();
    if !tag_names.is_empty() {
        issues.push(ConversionIssue::new(
            IssueSeverity::Warning,
            format!("HTML tags present, check rendering: {}", tag_names.join(", ")),
        ));
    }

    let internal_links = MD_LINK_CAPTURE
        .captures_iter(markdown)
        .filter(|caps| !caps[2].starts_with("http"))
        .count();
    if internal_links > 0 {
        issues.push(ConversionIssue::new(
            IssueSeverity::Warning,
            format!("{internal_links} internal link(s) keep their old wiki paths"),
        ));
    }

    if TASK_ITEM.is_match(markdown) {
        issues.push(ConversionIssue::new(
            IssueSeverity::Info,
            "Task list checkboxes become plain list items",
        ));
    }

    if STRIKETHROUGH.is_match(markdown) {
        issues.push(ConversionIssue::new(
            IssueSeverity::Warning,
            "Strikethrough needs manual conversion to <s> tags",
        ));
    }

    if FOOTNOTE.is_match(markdown) {
        issues.push(ConversionIssue::new(
            IssueSeverity::ManualReview,
            "Footnotes have no MediaWiki equivalent and need rework",
        ));
    }

    issues
}

/// Grades migrated wikitext. Starts at 100 and deducts for leftover
/// Markdown, unmigrated images and suspiciously short pages.
pub fn content_quality(title: &str, wikitext: &str) -> PageQuality {
    let mut issues = Vec::new();
    let mut warnings = Vec::new();
    let mut score: i32 = 100;

    if !wikitext.contains("[[File:") && wikitext.contains("![") {
        issues.push("Markdown image syntax survived the conversion".to_string());
        score -= 20;
    }

    for (pattern, what) in RESIDUAL_MARKDOWN.iter() {
        if pattern.is_match(wikitext) {
            issues.push(format!("{what} markdown not converted"));
            score -= 15;
        }
    }

    let html_tags = HTML_OPEN_TAG.find_iter(wikitext).count();
    if html_tags > 0 {
        warnings.push(format!("Contains {html_tags} HTML tag(s), check that they render"));
    }

    if wikitext.trim().chars().count() < 50 {
        warnings.push("Page content is suspiciously short".to_string());
        score -= 10;
    }

    PageQuality {
        title: title.to_string(),
        length: wikitext.chars().count(),
        word_count: wikitext.split_whitespace().count(),
        issues,
        warnings,
        score,
        level: QualityLevel::from_score(score),
    }
}

/// Targets of `[[...]]` links in wikitext, display text stripped.
pub fn internal_link_targets(wikitext: &str) -> Vec<String> {
    WIKI_LINK
        .captures_iter(wikitext)
        .map(|caps| caps[1].to_string())
        .collect()
}
