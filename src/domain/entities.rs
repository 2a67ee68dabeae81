//! Domain entities. Pure data structures for the core business.
//!
//! No HTTP/wire types here; adapters map their DTOs into these.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A wiki in the Azure DevOps project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wiki {
    pub id: String,
    pub name: String,
}

/// A page listing entry from the source wiki. The path is unique within a wiki.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WikiPage {
    pub id: i64,
    pub path: String,
    /// Browser URL of the original page, when the listing provides one.
    pub remote_url: Option<String>,
    /// Last modification time. Not every listing carries this; filters keep
    /// undated pages.
    pub last_modified: Option<DateTime<Utc>>,
}

/// A page together with its fetched Markdown content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageContent {
    pub page: WikiPage,
    pub markdown: String,
}

/// End-of-run counters for a migration.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MigrationOutcome {
    pub migrated: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Markdown construct counters for a single page.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ContentStats {
    pub word_count: usize,
    pub char_count: usize,
    pub line_count: usize,
    pub headers: usize,
    pub links: usize,
    pub images: usize,
    pub code_blocks: usize,
    pub inline_code: usize,
    pub tables: usize,
    pub lists: usize,
    pub numbered_lists: usize,
    pub bold: usize,
    pub italic: usize,
    pub html_tags: usize,
}

impl ContentStats {
    /// Weighted conversion-difficulty score. Tables, code and embedded
    /// media need the most manual attention after migration.
    pub fn score(&self) -> usize {
        self.tables * 3 + self.code_blocks * 2 + self.images * 2 + self.html_tags * 2 + self.links
    }

    pub fn level(&self) -> ComplexityLevel {
        match self.score() {
            s if s < 10 => ComplexityLevel::Low,
            s if s < 25 => ComplexityLevel::Medium,
            _ => ComplexityLevel::High,
        }
    }
}

/// Per-page planner verdict: counters plus the derived score and level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageComplexity {
    pub path: String,
    pub stats: ContentStats,
    pub score: usize,
    pub level: ComplexityLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for ComplexityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComplexityLevel::Low => write!(f, "Low"),
            ComplexityLevel::Medium => write!(f, "Medium"),
            ComplexityLevel::High => write!(f, "High"),
        }
    }
}

/// A single finding from the conversion previewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionIssue {
    pub severity: IssueSeverity,
    pub message: String,
}

impl ConversionIssue {
    pub fn new(severity: IssueSeverity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Info,
    Warning,
    /// Needs a human after migration (image uploads, footnotes).
    ManualReview,
}

impl std::fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueSeverity::Info => write!(f, "Info"),
            IssueSeverity::Warning => write!(f, "Warning"),
            IssueSeverity::ManualReview => write!(f, "Manual review"),
        }
    }
}

/// Post-migration quality verdict for a single target page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageQuality {
    pub title: String,
    pub length: usize,
    pub word_count: usize,
    /// Score deductions that point at a real conversion defect.
    pub issues: Vec<String>,
    /// Softer observations worth a look, not necessarily defects.
    pub warnings: Vec<String>,
    pub score: i32,
    pub level: QualityLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityLevel {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl QualityLevel {
    pub fn from_score(score: i32) -> Self {
        match score {
            s if s >= 90 => QualityLevel::Excellent,
            s if s >= 75 => QualityLevel::Good,
            s if s >= 60 => QualityLevel::Fair,
            _ => QualityLevel::Poor,
        }
    }
}

impl std::fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QualityLevel::Excellent => write!(f, "Excellent"),
            QualityLevel::Good => write!(f, "Good"),
            QualityLevel::Fair => write!(f, "Fair"),
            QualityLevel::Poor => write!(f, "Poor"),
        }
    }
}
