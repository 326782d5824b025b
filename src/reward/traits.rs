//! The reward-scoring collaborator.
//!
//! Scoring is rule-based and synchronous: each [`RewardFunction`] maps a
//! batch of (prompt, completion, metadata) triples to one score per sample,
//! and [`WeightedRewards`] combines several functions into the single reward
//! sequence the trainer records for the cycle.

use anyhow::{bail, Result};
use tracing::debug;

use crate::dataset::MetaMap;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A single scoring rule applied to a whole batch at once.
pub trait RewardFunction: Send + Sync {
    /// Short name for logging and `inspect` output.
    fn name(&self) -> &str;

    /// Score each sample; the returned vector must have one entry per input.
    ///
    /// `metas[i]` carries the extra fields of record `i` (reference answers,
    /// labels, ...) for rules that grade against them.
    fn compute(
        &self,
        prompts: &[String],
        completions: &[String],
        metas: &[MetaMap],
    ) -> Result<Vec<f64>>;
}

// ---------------------------------------------------------------------------
// Weighted combination
// ---------------------------------------------------------------------------

/// An ordered set of reward functions with per-function weights.
///
/// The score of sample `i` is `sum_k(weight_k * score_k[i])`. An empty set
/// scores every sample 0.0.
pub struct WeightedRewards {
    functions: Vec<(Box<dyn RewardFunction>, f64)>,
}

impl WeightedRewards {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self {
            functions: Vec::new(),
        }
    }

    /// Add a reward function with the given weight (builder-style).
    pub fn with_function(mut self, function: Box<dyn RewardFunction>, weight: f64) -> Self {
        self.functions.push((function, weight));
        self
    }

    /// Number of reward functions in the pipeline.
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Whether the pipeline contains no functions.
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Names of the configured functions, in application order.
    pub fn names(&self) -> Vec<String> {
        self.functions
            .iter()
            .map(|(f, _)| f.name().to_string())
            .collect()
    }

    /// Score a batch: one weighted total per sample.
    ///
    /// # Errors
    ///
    /// Fails if the input sequences disagree in length or any function
    /// returns the wrong number of scores.
    pub fn score(
        &self,
        prompts: &[String],
        completions: &[String],
        metas: &[MetaMap],
    ) -> Result<Vec<f64>> {
        let n = prompts.len();
        if completions.len() != n || metas.len() != n {
            bail!(
                "reward inputs disagree in length: {} prompts, {} completions, {} metas",
                n,
                completions.len(),
                metas.len()
            );
        }

        let mut totals = vec![0.0; n];

        for (function, weight) in &self.functions {
            let scores = function.compute(prompts, completions, metas)?;
            if scores.len() != n {
                bail!(
                    "reward function '{}' returned {} scores for {} samples",
                    function.name(),
                    scores.len(),
                    n
                );
            }

            for (total, score) in totals.iter_mut().zip(&scores) {
                *total += weight * score;
            }

            debug!(
                function = function.name(),
                weight,
                mean = scores.iter().sum::<f64>() / n.max(1) as f64,
                "reward function applied"
            );
        }

        Ok(totals)
    }
}

impl Default for WeightedRewards {
    fn default() -> Self {
        Self::new()
    }
}
