//! The policy-model collaborator: the thing that turns prompts into
//! completions.
//!
//! The trainer only ever talks to a [`PolicyModel`]; whether completions come
//! from a live OpenAI-compatible server ([`ApiPolicy`]) or a deterministic
//! mock ([`MockPolicy`]) is decided at wiring time.

use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use tracing::debug;

use super::api::{LlmClient, SamplingParams};

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A policy model that samples completions for a batch of prompts.
#[allow(async_fn_in_trait)]
pub trait PolicyModel: Send + Sync {
    /// Generate one completion per prompt, order preserved.
    async fn generate_batch(
        &self,
        prompts: &[String],
        params: &SamplingParams,
    ) -> Result<Vec<String>>;

    /// Whether the policy is in training mode. In eval mode the trainer
    /// switches to greedy decoding (temperature 0.0).
    fn training(&self) -> bool;

    /// Model identifier for logging.
    fn model_id(&self) -> &str;
}

// ---------------------------------------------------------------------------
// API-backed policy
// ---------------------------------------------------------------------------

/// A policy served by an OpenAI-compatible chat completions API.
#[derive(Debug, Clone)]
pub struct ApiPolicy {
    client: LlmClient,
    model_id: String,
    training: bool,
}

impl ApiPolicy {
    /// Create a policy client for the given server and model.
    pub fn new(api_base: &str, api_key: &str, model_id: &str) -> Self {
        Self {
            client: LlmClient::new(api_base, api_key),
            model_id: model_id.to_string(),
            training: true,
        }
    }

    /// Set the training-mode flag (builder-style).
    pub fn with_training(mut self, training: bool) -> Self {
        self.training = training;
        self
    }
}

impl PolicyModel for ApiPolicy {
    async fn generate_batch(
        &self,
        prompts: &[String],
        params: &SamplingParams,
    ) -> Result<Vec<String>> {
        debug!(
            model = %self.model_id,
            batch_size = prompts.len(),
            "generating completions via API"
        );

        let mut completions = Vec::with_capacity(prompts.len());
        for prompt in prompts {
            let completion = self.client.generate(prompt, &self.model_id, params).await?;
            completions.push(completion);
        }
        Ok(completions)
    }

    fn training(&self) -> bool {
        self.training
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ---------------------------------------------------------------------------
// Mock policy for tests and offline runs
// ---------------------------------------------------------------------------

/// A deterministic policy that needs no network.
///
/// With canned responses it cycles through them in order; without, it echoes
/// a transform of each prompt. The batch-call counter lets tests assert
/// whether (and how often) generation actually happened.
#[derive(Debug)]
pub struct MockPolicy {
    responses: Vec<String>,
    fail_with: Option<String>,
    training: bool,
    cursor: AtomicUsize,
    calls: AtomicUsize,
}

impl MockPolicy {
    /// Create an echoing mock: each completion is derived from its prompt.
    pub fn new() -> Self {
        Self {
            responses: Vec::new(),
            fail_with: None,
            training: true,
            cursor: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    /// Create a mock that cycles through the given canned responses.
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses,
            ..Self::new()
        }
    }

    /// Create a mock whose every generation attempt fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            fail_with: Some(message.into()),
            ..Self::new()
        }
    }

    /// Set the training-mode flag (builder-style).
    pub fn with_training(mut self, training: bool) -> Self {
        self.training = training;
        self
    }

    /// Number of `generate_batch` calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyModel for MockPolicy {
    async fn generate_batch(
        &self,
        prompts: &[String],
        _params: &SamplingParams,
    ) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = &self.fail_with {
            anyhow::bail!("{message}");
        }

        let completions = prompts
            .iter()
            .map(|prompt| {
                if self.responses.is_empty() {
                    format!("mock completion for: {prompt}")
                } else {
                    let idx = self.cursor.fetch_add(1, Ordering::SeqCst);
                    self.responses[idx % self.responses.len()].clone()
                }
            })
            .collect();

        Ok(completions)
    }

    fn training(&self) -> bool {
        self.training
    }

    fn model_id(&self) -> &str {
        "mock-policy"
    }
}

// ---------------------------------------------------------------------------
// AnyPolicy: enum dispatch wrapper for runtime policy selection
// ---------------------------------------------------------------------------

/// An enum wrapper around all concrete policy types, enabling runtime
/// selection without `dyn` (which is incompatible with async trait methods).
pub enum AnyPolicy {
    Api(ApiPolicy),
    Mock(MockPolicy),
}

impl PolicyModel for AnyPolicy {
    async fn generate_batch(
        &self,
        prompts: &[String],
        params: &SamplingParams,
    ) -> Result<Vec<String>> {
        match self {
            Self::Api(p) => p.generate_batch(prompts, params).await,
            Self::Mock(p) => p.generate_batch(prompts, params).await,
        }
    }

    fn training(&self) -> bool {
        match self {
            Self::Api(p) => p.training(),
            Self::Mock(p) => p.training(),
        }
    }

    fn model_id(&self) -> &str {
        match self {
            Self::Api(p) => p.model_id(),
            Self::Mock(p) => p.model_id(),
        }
    }
}
