//! Cycle results and trainer memory.
//!
//! Each generate-and-score pass produces a [`CycleOutcome`]: the prompts
//! actually sent to the policy, the completions it returned, and their
//! rewards, kept as parallel columns. The trainer retains exactly one
//! outcome between cycles in a [`CycleMemory`], which is what prompt
//! rewriting sees as "last cycle" state.

use serde::{Deserialize, Serialize};

use crate::dataset::MetaMap;

// ---------------------------------------------------------------------------
// CycleOutcome
// ---------------------------------------------------------------------------

/// Result of one generate-and-score cycle. Columns are index-aligned:
/// `completions[i]` answers `prompts[i]` and earned `rewards[i]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleOutcome {
    /// Prompts sent to the policy, after any dynamic rewriting.
    pub prompts: Vec<String>,
    /// Completions returned by the policy.
    pub completions: Vec<String>,
    /// Combined reward per sample.
    pub rewards: Vec<f64>,
    /// Per-sample metadata carried alongside the prompts.
    pub metas: Vec<MetaMap>,
}

impl CycleOutcome {
    /// Number of samples in the cycle.
    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    /// Whether the cycle carried no samples.
    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    /// Mean reward across the cycle, 0.0 when empty.
    pub fn mean_reward(&self) -> f64 {
        if self.rewards.is_empty() {
            return 0.0;
        }
        self.rewards.iter().sum::<f64>() / self.rewards.len() as f64
    }

    /// Standard deviation of rewards, floored at 1e-8 to keep downstream
    /// normalization finite.
    pub fn reward_std(&self) -> f64 {
        if self.rewards.len() < 2 {
            return 1e-8;
        }
        let mean = self.mean_reward();
        let variance = self
            .rewards
            .iter()
            .map(|r| (r - mean).powi(2))
            .sum::<f64>()
            / self.rewards.len() as f64;
        variance.sqrt().max(1e-8)
    }
}

// ---------------------------------------------------------------------------
// CycleMemory
// ---------------------------------------------------------------------------

/// What the trainer remembers of the previous successful cycle.
///
/// The memory is replaced wholesale when a cycle completes and is never
/// touched by a failed cycle, so readers always observe either the empty
/// initial state or the full result of the last cycle that finished.
#[derive(Debug, Clone, Default)]
pub struct CycleMemory {
    prompts: Vec<String>,
    completions: Vec<String>,
    rewards: Vec<f64>,
    metas: Vec<MetaMap>,
}

impl CycleMemory {
    /// Fresh memory with no recorded cycle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the remembered cycle with `outcome`.
    pub fn record(&mut self, outcome: &CycleOutcome) {
        self.prompts = outcome.prompts.clone();
        self.completions = outcome.completions.clone();
        self.rewards = outcome.rewards.clone();
        self.metas = outcome.metas.clone();
    }

    /// Prompts from the last recorded cycle, empty before the first.
    pub fn last_prompts(&self) -> &[String] {
        &self.prompts
    }

    /// Completions from the last recorded cycle, empty before the first.
    pub fn last_completions(&self) -> &[String] {
        &self.completions
    }

    /// Rewards from the last recorded cycle, empty before the first.
    pub fn last_rewards(&self) -> &[f64] {
        &self.rewards
    }

    /// Metadata from the last recorded cycle, empty before the first.
    pub fn last_metas(&self) -> &[MetaMap] {
        &self.metas
    }

    /// Number of samples in the remembered cycle.
    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    /// Whether any cycle has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }
}
