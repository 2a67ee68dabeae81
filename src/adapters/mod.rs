//! Infrastructure adapters. Implement outbound ports.
//!
//! Azure DevOps, MediaWiki, checkpoint persistence, report files. Map
//! transport errors to DomainError.

pub mod azure;
pub mod conversion;
pub mod mediawiki;
pub mod persistence;
pub mod reports;
pub mod ui;
