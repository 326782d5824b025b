//! OpenAI-compatible LLM API client.
//!
//! Provides typed request/response structures and methods for chat
//! completion and plain text generation, which is all the rollout loop needs
//! from a policy server: prompts in, sampled completions out.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// A single message in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The role of the message author: `"system"`, `"user"`, or `"assistant"`.
    pub role: String,
    /// The textual content of the message.
    pub content: String,
}

impl ChatMessage {
    /// Convenience constructor for a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Convenience constructor for a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Convenience constructor for an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Sampling knobs for a generation request.
///
/// Built by the trainer each cycle from its configuration; the temperature
/// is forced to 0.0 when the policy reports it is not in training mode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SamplingParams {
    /// Sampling temperature (0.0 = greedy).
    pub temperature: f64,
    /// Nucleus sampling cutoff.
    pub top_p: f64,
    /// Maximum number of completion tokens to generate.
    pub max_tokens: usize,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.95,
            max_tokens: 1024,
        }
    }
}

/// A single completion choice returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    /// Zero-based index of this choice within the response.
    pub index: usize,
    /// The generated message.
    pub message: ChatMessage,
    /// The reason the model stopped generating (e.g. `"stop"`, `"length"`).
    pub finish_reason: Option<String>,
}

/// Token usage statistics for a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens consumed by the prompt.
    pub prompt_tokens: usize,
    /// Tokens generated in the completion.
    pub completion_tokens: usize,
    /// Total tokens (prompt + completion).
    pub total_tokens: usize,
}

/// A chat completion response from the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Unique identifier for this completion.
    pub id: String,
    /// The list of generated choices.
    pub choices: Vec<Choice>,
    /// Token usage statistics.
    pub usage: Usage,
}

impl ChatResponse {
    /// The text content of the first choice, or an empty string if the
    /// response carried no choices.
    pub fn first_text(&self) -> String {
        self.choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP client for an OpenAI-compatible chat completions API.
///
/// Wraps [`reqwest::Client`] with the base URL and API key needed to call
/// `POST {base_url}/chat/completions`.
#[derive(Debug, Clone)]
pub struct LlmClient {
    /// The base URL for API requests (e.g. `"https://api.openai.com/v1"`).
    api_base: String,
    /// The API key used for bearer authentication.
    api_key: String,
    /// The underlying HTTP client.
    http: reqwest::Client,
}

impl LlmClient {
    /// Create a new client pointing at `base_url` (e.g. `"https://api.openai.com/v1"`).
    pub fn new(base_url: &str, api_key: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("failed to build reqwest client");

        Self {
            api_base: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            http,
        }
    }

    /// The configured API base URL.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    // ------------------------------------------------------------------
    // Chat completions
    // ------------------------------------------------------------------

    /// Send a chat completion request and return the parsed response.
    ///
    /// Calls `POST {base_url}/chat/completions`.
    pub async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
        params: &SamplingParams,
    ) -> Result<ChatResponse> {
        let url = format!("{}/chat/completions", self.api_base);
        debug!(
            model,
            temperature = params.temperature,
            top_p = params.top_p,
            max_tokens = params.max_tokens,
            "sending chat completion request"
        );

        let body = serde_json::json!({
            "model": model,
            "messages": messages,
            "temperature": params.temperature,
            "top_p": params.top_p,
            "max_tokens": params.max_tokens,
        });

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("failed to send chat completion request")?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("chat completion API returned {status}: {text}");
        }

        let chat_response: ChatResponse = resp
            .json()
            .await
            .context("failed to parse chat completion response")?;

        info!(
            model,
            prompt_tokens = chat_response.usage.prompt_tokens,
            completion_tokens = chat_response.usage.completion_tokens,
            "chat completion succeeded"
        );

        Ok(chat_response)
    }

    // ------------------------------------------------------------------
    // Simple text generation
    // ------------------------------------------------------------------

    /// Send a user prompt to the model and return the generated text.
    ///
    /// This is a convenience wrapper around [`Self::chat_completion`] that
    /// returns only the text content of the first choice.
    pub async fn generate(
        &self,
        prompt: &str,
        model_id: &str,
        params: &SamplingParams,
    ) -> Result<String> {
        let messages = vec![ChatMessage::user(prompt)];
        let resp = self.chat_completion(model_id, &messages, params).await?;
        Ok(resp.first_text())
    }

    /// Send a user prompt with a system message and return the generated text.
    pub async fn generate_with_system(
        &self,
        prompt: &str,
        system: &str,
        model_id: &str,
        params: &SamplingParams,
    ) -> Result<String> {
        let messages = vec![ChatMessage::system(system), ChatMessage::user(prompt)];
        let resp = self.chat_completion(model_id, &messages, params).await?;
        Ok(resp.first_text())
    }
}
