use serde::{Deserialize, Serialize};

/// Complete configuration for a molt run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoltConfig {
    pub trainer: TrainerConfig,
    pub dynamic_prompts: DynamicPromptsConfig,
    pub model: ModelConfig,
    pub reward: RewardConfig,
}

/// Trainer loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Records per generate-and-score cycle (default: 8).
    pub batch_size: usize,
    /// Passes over the dataset in one run (default: 10).
    pub num_passes: usize,
    /// Shuffle records before each pass (default: true).
    pub shuffle: bool,
    /// Prompt length in characters above which a warning is logged (default: 6000).
    pub max_prompt_length: usize,
    /// Maximum completion length in tokens (default: 1024).
    pub max_completion_length: usize,
    /// Sampling temperature while the policy is in training mode (default: 0.7).
    pub temperature: f64,
    /// Nucleus sampling cutoff (default: 0.95).
    pub top_p: f64,
}

/// Dynamic prompt rewriting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicPromptsConfig {
    /// Arm the built-in reward-feedback hook (default: false).
    pub enabled: bool,
    /// Metadata field the hook builds base prompts from (default: "question").
    pub source_field: String,
    /// Rewards below this threshold trigger revision feedback (default: 0.5).
    pub reward_threshold: f64,
}

/// Model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Base URL for the policy model API.
    pub policy_api_base: String,
    /// Model identifier for the policy (e.g., "Qwen/Qwen2.5-7B-Instruct").
    pub policy_model_id: String,
    /// API key for the policy model.
    pub policy_api_key: String,
}

/// Reward pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardConfig {
    /// Metadata field holding the reference answer (default: "answer").
    pub answer_field: String,
    /// Weight of the exact-match rule, zero disables it (default: 1.0).
    pub exact_match_weight: f64,
    /// Keywords the keyword rule checks for (default: empty, rule disabled).
    pub keywords: Vec<String>,
    /// Weight of the keyword rule (default: 0.5).
    pub keyword_weight: f64,
    /// Weight of the length rule (default: 0.1).
    pub length_weight: f64,
    /// Completion character budget for the length rule (default: 256).
    pub target_length: usize,
}

impl Default for MoltConfig {
    fn default() -> Self {
        Self {
            trainer: TrainerConfig {
                batch_size: 8,
                num_passes: 10,
                shuffle: true,
                max_prompt_length: 6000,
                max_completion_length: 1024,
                temperature: 0.7,
                top_p: 0.95,
            },
            dynamic_prompts: DynamicPromptsConfig {
                enabled: false,
                source_field: "question".into(),
                reward_threshold: 0.5,
            },
            model: ModelConfig {
                policy_api_base: "http://localhost:8000/v1".into(),
                policy_model_id: "Qwen/Qwen2.5-7B-Instruct".into(),
                policy_api_key: String::new(),
            },
            reward: RewardConfig {
                answer_field: "answer".into(),
                exact_match_weight: 1.0,
                keywords: Vec::new(),
                keyword_weight: 0.5,
                length_weight: 0.1,
                target_length: 256,
            },
        }
    }
}
