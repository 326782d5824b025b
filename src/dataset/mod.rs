//! Dataset intake for the rollout trainer.
//!
//! This module provides:
//! - [`record::PromptRecord`] -- one input record: a prompt plus arbitrary
//!   extra fields that become the sample's metadata.
//! - [`record::derive_metas`] -- the ordered metadata derivation handed to
//!   the dynamic prompt hook and the reward pipeline.
//! - [`loader`] -- JSONL file loading and a built-in sample batch for mock
//!   runs.

pub mod loader;
pub mod record;

// Re-export the most commonly used items at the module level.
pub use loader::{load_jsonl, sample_records};
pub use record::{derive_metas, MetaMap, PromptRecord};
