//! Built-in reward rules.
//!
//! Three rule families cover the common grading needs of a rollout run:
//! exact-match against a reference answer carried in sample metadata,
//! keyword coverage, and a length budget. Each is deliberately simple --
//! the interesting rewards in a real run are user-supplied, and these exist
//! so a mock run produces a meaningful reward signal out of the box.

use anyhow::Result;

use crate::config::RewardConfig;
use crate::dataset::MetaMap;

use super::traits::{RewardFunction, WeightedRewards};

// ---------------------------------------------------------------------------
// Exact match
// ---------------------------------------------------------------------------

/// Grades a completion against a reference answer stored in metadata.
///
/// Scoring: 1.0 for an exact match (trimmed, case-insensitive), 0.5 when the
/// completion contains the reference, 0.0 otherwise. Samples whose metadata
/// lacks a string reference score 0.0.
pub struct ExactMatchReward {
    /// Metadata key holding the reference answer.
    answer_field: String,
}

impl ExactMatchReward {
    /// Create a rule reading the reference from `answer_field`.
    pub fn new(answer_field: impl Into<String>) -> Self {
        Self {
            answer_field: answer_field.into(),
        }
    }

    fn score_one(&self, completion: &str, meta: &MetaMap) -> f64 {
        let Some(reference) = meta.get(&self.answer_field).and_then(|v| v.as_str()) else {
            return 0.0;
        };

        let completion = completion.trim();
        let reference = reference.trim();
        if reference.is_empty() {
            return 0.0;
        }

        if completion.eq_ignore_ascii_case(reference) {
            1.0
        } else if completion.to_lowercase().contains(&reference.to_lowercase()) {
            0.5
        } else {
            0.0
        }
    }
}

impl RewardFunction for ExactMatchReward {
    fn name(&self) -> &str {
        "exact_match"
    }

    fn compute(
        &self,
        _prompts: &[String],
        completions: &[String],
        metas: &[MetaMap],
    ) -> Result<Vec<f64>> {
        Ok(completions
            .iter()
            .zip(metas)
            .map(|(completion, meta)| self.score_one(completion, meta))
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Keyword coverage
// ---------------------------------------------------------------------------

/// Scores the fraction of required keywords present in the completion
/// (case-insensitive). With no keywords configured, every sample scores 0.0.
pub struct KeywordReward {
    keywords: Vec<String>,
}

impl KeywordReward {
    /// Create a rule requiring the given keywords.
    pub fn new(keywords: Vec<String>) -> Self {
        Self { keywords }
    }
}

impl RewardFunction for KeywordReward {
    fn name(&self) -> &str {
        "keyword"
    }

    fn compute(
        &self,
        _prompts: &[String],
        completions: &[String],
        _metas: &[MetaMap],
    ) -> Result<Vec<f64>> {
        Ok(completions
            .iter()
            .map(|completion| {
                if self.keywords.is_empty() {
                    return 0.0;
                }
                let haystack = completion.to_lowercase();
                let hits = self
                    .keywords
                    .iter()
                    .filter(|k| haystack.contains(&k.to_lowercase()))
                    .count();
                hits as f64 / self.keywords.len() as f64
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Length budget
// ---------------------------------------------------------------------------

/// Rewards staying within a character budget: 1.0 at or under
/// `target_length`, decaying as `target / len` beyond it.
pub struct LengthReward {
    target_length: usize,
}

impl LengthReward {
    /// Create a rule with the given character budget.
    pub fn new(target_length: usize) -> Self {
        Self { target_length }
    }
}

impl RewardFunction for LengthReward {
    fn name(&self) -> &str {
        "length"
    }

    fn compute(
        &self,
        _prompts: &[String],
        completions: &[String],
        _metas: &[MetaMap],
    ) -> Result<Vec<f64>> {
        Ok(completions
            .iter()
            .map(|completion| {
                let len = completion.chars().count();
                if len <= self.target_length {
                    1.0
                } else if self.target_length == 0 {
                    0.0
                } else {
                    self.target_length as f64 / len as f64
                }
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Config-driven assembly
// ---------------------------------------------------------------------------

impl WeightedRewards {
    /// Assemble the built-in pipeline from configuration.
    ///
    /// Only rules with a positive weight are included, so zeroing a weight in
    /// the config file disables that rule.
    pub fn from_config(config: &RewardConfig) -> Self {
        let mut rewards = WeightedRewards::new();

        if config.exact_match_weight > 0.0 {
            rewards = rewards.with_function(
                Box::new(ExactMatchReward::new(config.answer_field.clone())),
                config.exact_match_weight,
            );
        }
        if config.keyword_weight > 0.0 && !config.keywords.is_empty() {
            rewards = rewards.with_function(
                Box::new(KeywordReward::new(config.keywords.clone())),
                config.keyword_weight,
            );
        }
        if config.length_weight > 0.0 {
            rewards = rewards.with_function(
                Box::new(LengthReward::new(config.target_length)),
                config.length_weight,
            );
        }

        rewards
    }
}
