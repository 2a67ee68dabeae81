//! Outbound ports. Application calls into infrastructure.
//!
//! Implemented by adapters.

use crate::domain::{DomainError, Wiki, WikiPage};

/// Source wiki gateway. List wikis and pages, fetch Markdown content.
#[async_trait::async_trait]
pub trait WikiSource: Send + Sync {
    /// List all wikis in the project.
    async fn list_wikis(&self) -> Result<Vec<Wiki>, DomainError>;

    /// List every page of a wiki, full recursion.
    async fn list_pages(&self, wiki_id: &str) -> Result<Vec<WikiPage>, DomainError>;

    /// Fetch the Markdown content of one page. A page without content
    /// yields an empty string.
    async fn page_content(&self, wiki_id: &str, page_id: i64) -> Result<String, DomainError>;
}

/// Target wiki gateway. Create pages and read back what was migrated.
#[async_trait::async_trait]
pub trait WikiTarget: Send + Sync {
    /// Create or overwrite a page. Idempotent: re-running an edit with the
    /// same text is safe.
    async fn upsert_page(&self, title: &str, text: &str, summary: &str)
    -> Result<(), DomainError>;

    /// List all page titles on the target wiki.
    async fn list_titles(&self) -> Result<Vec<String>, DomainError>;

    /// Fetch the current wikitext of a page. A missing page yields an
    /// empty string.
    async fn page_text(&self, title: &str) -> Result<String, DomainError>;
}

/// Checkpoint port. Tracks per-page progress so an interrupted run resumes
/// without re-posting pages.
#[async_trait::async_trait]
pub trait CheckpointStore: Send + Sync {
    /// True when the page was already migrated in an earlier run.
    async fn is_processed(&self, page_id: i64) -> Result<bool, DomainError>;

    /// Record a successful migration. Persistence cadence is up to the
    /// implementation.
    async fn mark_processed(&self, page_id: i64) -> Result<(), DomainError>;

    /// Record a failure with its error message. Persisted immediately.
    async fn mark_failed(&self, page_id: i64, error: &str) -> Result<(), DomainError>;

    /// Record a page that was intentionally not migrated.
    async fn mark_skipped(&self, page_id: i64, reason: &str) -> Result<(), DomainError>;

    /// Number of pages recorded as processed.
    async fn processed_count(&self) -> Result<usize, DomainError>;

    /// Drop the checkpoint after a fully successful run.
    async fn clear(&self) -> Result<(), DomainError>;
}
