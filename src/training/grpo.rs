//! GRPO-style generate-and-score trainer.
//!
//! The trainer owns a policy, a reward pipeline, and the memory of the
//! previous cycle. Its unit of work is the generate-and-score cycle:
//! resolve the batch prompts (through the dynamic hook when one is armed),
//! generate one completion per prompt, score the completions, and record the
//! result. The run loop repeats cycles over a dataset in shuffled batches.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::thread_rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::TrainerConfig;
use crate::dataset::{derive_metas, MetaMap, PromptRecord};
use crate::model::{PolicyModel, SamplingParams};
use crate::reward::WeightedRewards;

use super::accelerator::Accelerator;
use super::cycle::{CycleMemory, CycleOutcome};
use super::dynamic::DynamicPromptFn;

// ---------------------------------------------------------------------------
// RunSummary
// ---------------------------------------------------------------------------

/// Aggregate result of a full run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Identifier assigned to the trainer at construction.
    pub run_id: String,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
    /// Number of generate-and-score cycles executed.
    pub cycles: usize,
    /// Mean reward of each cycle, in execution order.
    pub mean_rewards: Vec<f64>,
}

impl RunSummary {
    /// Mean of the per-cycle mean rewards, 0.0 for an empty run.
    pub fn overall_mean_reward(&self) -> f64 {
        if self.mean_rewards.is_empty() {
            return 0.0;
        }
        self.mean_rewards.iter().sum::<f64>() / self.mean_rewards.len() as f64
    }
}

// ---------------------------------------------------------------------------
// Trainer
// ---------------------------------------------------------------------------

/// Generate-and-score trainer over an LLM policy.
///
/// Between cycles the trainer remembers exactly one [`CycleOutcome`] in its
/// [`CycleMemory`]. When a dynamic prompt hook is armed it is called once at
/// the start of every cycle with that remembered state plus the current
/// batch's metadata, and its output replaces the batch prompts for the rest
/// of the cycle.
pub struct GrpoTrainer<P: PolicyModel> {
    config: TrainerConfig,
    policy: P,
    accelerator: Accelerator,
    rewards: WeightedRewards,
    dynamic_prompts: Option<DynamicPromptFn>,
    memory: CycleMemory,
    run_id: String,
    cycles_completed: usize,
}

impl<P: PolicyModel> GrpoTrainer<P> {
    /// Create a trainer with no dynamic prompt hook.
    pub fn new(
        config: TrainerConfig,
        policy: P,
        accelerator: Accelerator,
        rewards: WeightedRewards,
    ) -> Self {
        Self {
            config,
            policy,
            accelerator,
            rewards,
            dynamic_prompts: None,
            memory: CycleMemory::new(),
            run_id: Uuid::new_v4().to_string(),
            cycles_completed: 0,
        }
    }

    /// Arm a dynamic prompt hook. The hook is fixed for the trainer's
    /// lifetime; there is no way to swap or disarm it afterwards.
    pub fn with_dynamic_prompts(mut self, hook: DynamicPromptFn) -> Self {
        self.dynamic_prompts = Some(hook);
        self
    }

    /// The policy collaborator.
    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// The placement this trainer runs under.
    pub fn accelerator(&self) -> &Accelerator {
        &self.accelerator
    }

    /// Memory of the previous successful cycle.
    pub fn memory(&self) -> &CycleMemory {
        &self.memory
    }

    /// Whether a dynamic prompt hook is armed.
    pub fn has_dynamic_prompts(&self) -> bool {
        self.dynamic_prompts.is_some()
    }

    /// Number of cycles completed so far.
    pub fn cycles_completed(&self) -> usize {
        self.cycles_completed
    }

    /// Identifier for this trainer instance.
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Sampling parameters for the next generation, derived from config.
    /// A policy that is not in training mode decodes greedily.
    fn sampling_params(&self) -> SamplingParams {
        SamplingParams {
            temperature: if self.policy.training() {
                self.config.temperature
            } else {
                0.0
            },
            top_p: self.config.top_p,
            max_tokens: self.config.max_completion_length,
        }
    }

    /// Resolve the prompts for this cycle.
    ///
    /// With no hook armed the batch prompts are used in order. With a hook
    /// armed, it receives the previous cycle's prompts, completions, and
    /// rewards (all empty on the first cycle) together with the metadata of
    /// the current batch, and its return value becomes the cycle's prompts.
    /// Hook errors propagate untouched.
    fn resolve_prompts(&self, batch: &[PromptRecord], metas: &[MetaMap]) -> Result<Vec<String>> {
        let Some(hook) = &self.dynamic_prompts else {
            return Ok(batch.iter().map(|r| r.prompt.clone()).collect());
        };

        debug!(
            remembered = self.memory.len(),
            samples = batch.len(),
            "Rewriting prompts via dynamic hook"
        );
        let prompts = hook(
            self.memory.last_prompts(),
            self.memory.last_completions(),
            self.memory.last_rewards(),
            metas,
        )?;

        if prompts.len() != batch.len() {
            bail!(
                "Dynamic prompt hook returned {} prompts for a batch of {}",
                prompts.len(),
                batch.len()
            );
        }
        Ok(prompts)
    }

    /// Execute one generate-and-score cycle over `batch`.
    ///
    /// # Algorithm
    ///
    /// 1. Derive per-sample metadata from the batch.
    /// 2. Resolve prompts, through the dynamic hook when armed.
    /// 3. Generate one completion per prompt via the policy.
    /// 4. Score the completions through the reward pipeline.
    /// 5. Record the outcome into cycle memory and return it.
    ///
    /// # Errors
    ///
    /// Fails on an empty batch, on a hook error or wrong-length hook output,
    /// and on generation or scoring errors. Any failure leaves cycle memory
    /// and the cycle counter exactly as they were before the call.
    pub async fn generate_and_score(&mut self, batch: &[PromptRecord]) -> Result<CycleOutcome> {
        if batch.is_empty() {
            bail!("Cannot run a generate-and-score cycle on an empty batch");
        }

        debug!(
            cycle = self.cycles_completed + 1,
            samples = batch.len(),
            device = self.accelerator.device(),
            process_index = self.accelerator.process_index(),
            "Starting generate-and-score cycle"
        );

        let metas = derive_metas(batch);
        let prompts = self.resolve_prompts(batch, &metas)?;

        let oversize = prompts
            .iter()
            .filter(|p| p.chars().count() > self.config.max_prompt_length)
            .count();
        if oversize > 0 {
            warn!(
                count = oversize,
                limit = self.config.max_prompt_length,
                "Prompts exceed the configured length limit"
            );
        }

        let params = self.sampling_params();
        let completions = self.policy.generate_batch(&prompts, &params).await?;
        if completions.len() != prompts.len() {
            bail!(
                "Policy returned {} completions for {} prompts",
                completions.len(),
                prompts.len()
            );
        }

        let rewards = self.rewards.score(&prompts, &completions, &metas)?;

        let outcome = CycleOutcome {
            prompts,
            completions,
            rewards,
            metas,
        };
        self.memory.record(&outcome);
        self.cycles_completed += 1;

        info!(
            cycle = self.cycles_completed,
            samples = outcome.len(),
            mean_reward = outcome.mean_reward(),
            "Cycle complete"
        );
        Ok(outcome)
    }

    /// Run generate-and-score cycles over `records`.
    ///
    /// Makes `num_passes` passes over the dataset, shuffling before each
    /// pass when configured, and executes one cycle per batch of
    /// `batch_size` records. The first failing cycle aborts the run.
    pub async fn run(&mut self, records: &[PromptRecord]) -> Result<RunSummary> {
        if records.is_empty() {
            bail!("Cannot run on an empty record set");
        }
        if self.config.batch_size == 0 {
            bail!("batch_size must be at least 1");
        }

        let started_at = Utc::now();
        info!(
            run_id = %self.run_id,
            records = records.len(),
            passes = self.config.num_passes,
            batch_size = self.config.batch_size,
            model = self.policy.model_id(),
            dynamic_prompts = self.has_dynamic_prompts(),
            "Starting run"
        );

        let mut mean_rewards = Vec::new();
        for pass in 0..self.config.num_passes {
            let mut epoch: Vec<PromptRecord> = records.to_vec();
            if self.config.shuffle {
                epoch.shuffle(&mut thread_rng());
            }
            for batch in epoch.chunks(self.config.batch_size) {
                let outcome = self.generate_and_score(batch).await?;
                mean_rewards.push(outcome.mean_reward());
            }
            debug!(pass = pass + 1, "Finished pass over dataset");
        }

        let summary = RunSummary {
            run_id: self.run_id.clone(),
            started_at,
            finished_at: Utc::now(),
            cycles: mean_rewards.len(),
            mean_rewards,
        };
        info!(
            run_id = %summary.run_id,
            cycles = summary.cycles,
            overall_mean_reward = summary.overall_mean_reward(),
            "Run complete"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MockPolicy;
    use crate::reward::ExactMatchReward;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    type CapturedCall = (Vec<String>, Vec<String>, Vec<f64>, Vec<MetaMap>);

    fn test_config() -> TrainerConfig {
        TrainerConfig {
            batch_size: 2,
            num_passes: 1,
            shuffle: false,
            max_prompt_length: 6000,
            max_completion_length: 64,
            temperature: 0.7,
            top_p: 0.95,
        }
    }

    fn echo_trainer(policy: MockPolicy) -> GrpoTrainer<MockPolicy> {
        GrpoTrainer::new(
            test_config(),
            policy,
            Accelerator::local(),
            WeightedRewards::new(),
        )
    }

    /// Hook that records every call and returns fixed replacement prompts.
    fn capturing_hook(
        calls: Arc<Mutex<Vec<CapturedCall>>>,
        replacements: Vec<String>,
    ) -> DynamicPromptFn {
        Box::new(move |last_prompts, last_completions, last_rewards, metas| {
            calls.lock().unwrap().push((
                last_prompts.to_vec(),
                last_completions.to_vec(),
                last_rewards.to_vec(),
                metas.to_vec(),
            ));
            Ok(replacements.clone())
        })
    }

    fn record_with_meta(prompt: &str, key: &str, value: serde_json::Value) -> PromptRecord {
        PromptRecord::new(prompt).with_field(key, value)
    }

    /// Seed the trainer's memory as if a previous cycle had completed.
    fn seed_memory(trainer: &mut GrpoTrainer<MockPolicy>) {
        let mut meta = MetaMap::new();
        meta.insert("meta".into(), json!(99));
        trainer.memory.record(&CycleOutcome {
            prompts: vec!["old_prompt".to_string()],
            completions: vec!["old_completion".to_string()],
            rewards: vec![0.5],
            metas: vec![meta],
        });
    }

    // ------------------------------------------------------------------
    // Prompt resolution
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_no_hook_uses_batch_prompts() {
        let mut trainer = echo_trainer(MockPolicy::new());
        let batch = vec![PromptRecord::new("p1"), PromptRecord::new("p2")];

        let outcome = trainer.generate_and_score(&batch).await.unwrap();
        assert_eq!(outcome.prompts, ["p1", "p2"]);
        assert_eq!(
            outcome.completions,
            ["mock completion for: p1", "mock completion for: p2"]
        );
    }

    #[tokio::test]
    async fn test_hook_receives_stale_outcomes_and_fresh_metas() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut trainer = echo_trainer(MockPolicy::new())
            .with_dynamic_prompts(capturing_hook(calls.clone(), vec!["new_prompt".into()]));
        seed_memory(&mut trainer);

        let batch = vec![record_with_meta("initial_prompt", "meta", json!(123))];
        trainer.generate_and_score(&batch).await.unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (last_prompts, last_completions, last_rewards, metas) = &calls[0];
        assert_eq!(last_prompts, &["old_prompt".to_string()]);
        assert_eq!(last_completions, &["old_completion".to_string()]);
        assert_eq!(last_rewards, &[0.5]);
        // Metadata comes from the current batch, prompt key stripped.
        assert_eq!(metas.len(), 1);
        assert_eq!(metas[0].get("meta"), Some(&json!(123)));
        assert!(!metas[0].contains_key("prompt"));
    }

    #[tokio::test]
    async fn test_hook_output_replaces_batch_prompts() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut trainer = echo_trainer(MockPolicy::new())
            .with_dynamic_prompts(capturing_hook(calls, vec!["rewritten".into()]));

        let batch = vec![PromptRecord::new("original")];
        let outcome = trainer.generate_and_score(&batch).await.unwrap();

        assert_eq!(outcome.prompts, ["rewritten"]);
        assert_eq!(outcome.completions, ["mock completion for: rewritten"]);
        // Memory holds the effective prompts, not the raw batch ones.
        assert_eq!(trainer.memory().last_prompts(), ["rewritten"]);
    }

    #[tokio::test]
    async fn test_first_cycle_passes_empty_history() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut trainer = echo_trainer(MockPolicy::new())
            .with_dynamic_prompts(capturing_hook(calls.clone(), vec!["p".into()]));

        let batch = vec![record_with_meta("first", "id", json!("a"))];
        trainer.generate_and_score(&batch).await.unwrap();

        let calls = calls.lock().unwrap();
        let (last_prompts, last_completions, last_rewards, metas) = &calls[0];
        assert!(last_prompts.is_empty());
        assert!(last_completions.is_empty());
        assert!(last_rewards.is_empty());
        assert_eq!(metas[0].get("id"), Some(&json!("a")));
    }

    #[tokio::test]
    async fn test_second_cycle_sees_first_cycle_outcome() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut trainer = echo_trainer(MockPolicy::new())
            .with_dynamic_prompts(capturing_hook(calls.clone(), vec!["effective".into()]));

        let first = vec![record_with_meta("b1", "idx", json!(1))];
        let second = vec![record_with_meta("b2", "idx", json!(2))];
        trainer.generate_and_score(&first).await.unwrap();
        trainer.generate_and_score(&second).await.unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        let (last_prompts, last_completions, _, metas) = &calls[1];
        // History is one cycle stale, metadata is current.
        assert_eq!(last_prompts, &["effective".to_string()]);
        assert_eq!(
            last_completions,
            &["mock completion for: effective".to_string()]
        );
        assert_eq!(metas[0].get("idx"), Some(&json!(2)));
    }

    // ------------------------------------------------------------------
    // Failure handling
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_hook_error_propagates_verbatim() {
        let mut trainer = echo_trainer(MockPolicy::new())
            .with_dynamic_prompts(Box::new(|_, _, _, _| anyhow::bail!("dynamic hook called")));
        seed_memory(&mut trainer);

        let batch = vec![record_with_meta("initial_prompt", "meta", json!(123))];
        let err = trainer.generate_and_score(&batch).await.unwrap_err();
        assert_eq!(err.to_string(), "dynamic hook called");

        // The failed cycle touched neither the policy nor the memory.
        assert_eq!(trainer.policy().calls(), 0);
        assert_eq!(trainer.cycles_completed(), 0);
        assert_eq!(trainer.memory().last_prompts(), ["old_prompt"]);
        assert_eq!(trainer.memory().last_completions(), ["old_completion"]);
        assert_eq!(trainer.memory().last_rewards(), [0.5]);
    }

    #[tokio::test]
    async fn test_wrong_length_hook_output_rejected() {
        let mut trainer = echo_trainer(MockPolicy::new()).with_dynamic_prompts(Box::new(
            |_, _, _, _| Ok(vec!["a".to_string(), "b".to_string()]),
        ));

        let batch = vec![PromptRecord::new("only one")];
        let err = trainer.generate_and_score(&batch).await.unwrap_err();
        assert!(err.to_string().contains("2 prompts for a batch of 1"));
        assert_eq!(trainer.policy().calls(), 0);
        assert!(trainer.memory().is_empty());
    }

    #[tokio::test]
    async fn test_generation_failure_leaves_memory_untouched() {
        let mut trainer = echo_trainer(MockPolicy::failing("backend unavailable"));

        let batch = vec![PromptRecord::new("p")];
        let err = trainer.generate_and_score(&batch).await.unwrap_err();
        assert!(err.to_string().contains("backend unavailable"));
        assert!(trainer.memory().is_empty());
        assert_eq!(trainer.cycles_completed(), 0);
    }

    #[tokio::test]
    async fn test_empty_batch_rejected() {
        let mut trainer = echo_trainer(MockPolicy::new());
        let err = trainer.generate_and_score(&[]).await.unwrap_err();
        assert!(err.to_string().contains("empty batch"));
    }

    // ------------------------------------------------------------------
    // Sampling and scoring
    // ------------------------------------------------------------------

    #[test]
    fn test_eval_mode_decodes_greedily() {
        let trainer = echo_trainer(MockPolicy::new().with_training(false));
        assert!(trainer.sampling_params().temperature.abs() < 1e-9);

        let trainer = echo_trainer(MockPolicy::new());
        assert!((trainer.sampling_params().temperature - 0.7).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_rewards_scored_against_fresh_metas() {
        let rewards =
            WeightedRewards::new().with_function(Box::new(ExactMatchReward::new("answer")), 1.0);
        let policy = MockPolicy::with_responses(vec!["Paris".into(), "Berlin".into()]);
        let mut trainer = GrpoTrainer::new(test_config(), policy, Accelerator::local(), rewards);

        let batch = vec![
            record_with_meta("capital of France?", "answer", json!("Paris")),
            record_with_meta("capital of Spain?", "answer", json!("Madrid")),
        ];
        let outcome = trainer.generate_and_score(&batch).await.unwrap();
        assert!((outcome.rewards[0] - 1.0).abs() < 1e-9);
        assert!(outcome.rewards[1].abs() < 1e-9);
        assert_eq!(trainer.memory().last_rewards(), outcome.rewards.as_slice());
    }

    // ------------------------------------------------------------------
    // Run loop
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_run_chunks_dataset_into_cycles() {
        let mut config = test_config();
        config.num_passes = 2;
        let mut trainer = GrpoTrainer::new(
            config,
            MockPolicy::new(),
            Accelerator::local(),
            WeightedRewards::new(),
        );

        let records: Vec<PromptRecord> =
            (0..5).map(|i| PromptRecord::new(format!("p{i}"))).collect();
        let summary = trainer.run(&records).await.unwrap();

        // 5 records in batches of 2 gives 3 cycles per pass.
        assert_eq!(summary.cycles, 6);
        assert_eq!(summary.mean_rewards.len(), 6);
        assert_eq!(trainer.cycles_completed(), 6);
        assert!(summary.finished_at >= summary.started_at);
    }

    #[tokio::test]
    async fn test_run_rejects_empty_dataset() {
        let mut trainer = echo_trainer(MockPolicy::new());
        assert!(trainer.run(&[]).await.is_err());
    }
}
