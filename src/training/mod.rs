//! Training loop built around generate-and-score cycles.
//!
//! This module holds the GRPO-style trainer together with its collaborators:
//! device placement, the memory carried between cycles, and the dynamic
//! prompt rewriting hook.

pub mod accelerator;
pub mod cycle;
pub mod dynamic;
pub mod grpo;

pub use accelerator::Accelerator;
pub use cycle::{CycleMemory, CycleOutcome};
pub use dynamic::{reward_feedback, DynamicPromptFn};
pub use grpo::{GrpoTrainer, RunSummary};
