//! Persistence adapters for migration state.

pub mod checkpoint_json;

pub use checkpoint_json::CheckpointJson;
