//! MediaWiki target wiki adapter.

pub mod client;

pub use client::MediaWikiClient;
