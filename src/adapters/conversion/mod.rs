//! Markdown to wikitext conversion and the content analyzers built on it.

pub mod analysis;
pub mod markdown;

pub use analysis::{
    analyze_page, content_quality, content_stats, conversion_issues, internal_link_targets,
};
pub use markdown::{markdown_to_wikitext, page_title, sanitize_title};
