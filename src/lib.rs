//! wiki-migrate: Azure DevOps wiki to MediaWiki migration with Hexagonal Architecture.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod shared;
pub mod usecases;
