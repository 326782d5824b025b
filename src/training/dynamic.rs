//! Dynamic prompt rewriting.
//!
//! A trainer can carry an optional rewrite hook that replaces the batch
//! prompts at the start of every generate-and-score cycle. The hook sees the
//! previous cycle's prompts, completions, and rewards together with the
//! current batch's metadata, and returns the prompts to use this cycle. One
//! built-in strategy lives here; callers with their own curriculum pass any
//! closure of the same shape.

use anyhow::{bail, Result};

use crate::dataset::MetaMap;

/// Signature of a prompt rewrite hook.
///
/// Called exactly once per cycle, before generation and scoring:
///
/// * `last_prompts`, `last_completions`, `last_rewards` come from the
///   previous successful cycle and are empty on the first.
/// * `metas` describes the current batch, one map per sample, with the
///   `prompt` key removed.
///
/// The returned vector must contain one prompt per sample in the current
/// batch. An error return aborts the cycle before the policy is invoked and
/// leaves trainer state untouched.
pub type DynamicPromptFn =
    Box<dyn Fn(&[String], &[String], &[f64], &[MetaMap]) -> Result<Vec<String>> + Send + Sync>;

// ---------------------------------------------------------------------------
// Built-in strategy
// ---------------------------------------------------------------------------

/// Rewrite strategy that asks low-reward samples to revise their previous
/// attempt.
///
/// The base prompt for sample `i` is read from `source_field` in its
/// metadata. When the previous cycle holds a sample at the same index whose
/// reward fell below `reward_threshold`, the prior completion and its reward
/// are appended as revision feedback; otherwise the base prompt is used
/// as-is.
///
/// # Errors
///
/// The returned hook fails when a sample's metadata lacks a string value
/// under `source_field`.
pub fn reward_feedback(source_field: impl Into<String>, reward_threshold: f64) -> DynamicPromptFn {
    let source_field = source_field.into();
    Box::new(move |_last_prompts, last_completions, last_rewards, metas| {
        let mut prompts = Vec::with_capacity(metas.len());
        for (i, meta) in metas.iter().enumerate() {
            let Some(base) = meta.get(&source_field).and_then(|v| v.as_str()) else {
                bail!(
                    "sample {} has no string field '{}' to build a prompt from",
                    i,
                    source_field
                );
            };

            let needs_feedback = i < last_rewards.len() && last_rewards[i] < reward_threshold;
            if needs_feedback {
                prompts.push(format!(
                    "{}\n\nYour previous answer was:\n{}\n\nIt scored {:.2}. Give a better answer.",
                    base, last_completions[i], last_rewards[i]
                ));
            } else {
                prompts.push(base.to_string());
            }
        }
        Ok(prompts)
    })
}
