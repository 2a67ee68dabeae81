//! Core domain layer. No external I/O dependencies.
//!
//! Entities and business rules live here. Dependencies flow inward.

pub mod entities;
pub mod errors;

pub use entities::{
    ComplexityLevel, ContentStats, ConversionIssue, IssueSeverity, MigrationOutcome,
    PageComplexity, PageContent, PageQuality, QualityLevel, Wiki, WikiPage,
};
pub use errors::DomainError;
