//! Reward scoring for generated completions.
//!
//! A reward pipeline is a weighted set of [`RewardFunction`]s evaluated over
//! a full batch at once. Built-in rules live in [`rules`]; runs with custom
//! grading implement the trait directly.

pub mod rules;
pub mod traits;

pub use rules::{ExactMatchReward, KeywordReward, LengthReward};
pub use traits::{RewardFunction, WeightedRewards};
