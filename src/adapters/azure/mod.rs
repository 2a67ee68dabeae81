//! Azure DevOps source wiki adapter.

pub mod client;

pub use client::AzureDevOpsClient;
