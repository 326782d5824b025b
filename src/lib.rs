//! Molt: GRPO-style generate-and-score rollouts with dynamic prompt rewriting
//!
//! A trainer repeatedly sends batches of prompts to an LLM policy, scores the
//! completions with a weighted reward pipeline, and remembers each cycle's
//! outcome. An optional hook can rewrite the prompts of every cycle using the
//! previous cycle's results, which is how curricula such as revise-on-low-reward
//! are expressed.

pub mod config;
pub mod dataset;
pub mod model;
pub mod reward;
pub mod training;
