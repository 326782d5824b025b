//! Model collaborator abstractions for sampling completions.
//!
//! This module provides:
//! - [`api::LlmClient`] -- OpenAI-compatible chat completion client used by
//!   the API-backed policy.
//! - [`policy::PolicyModel`] -- the trait the trainer generates through, with
//!   live ([`policy::ApiPolicy`]) and mock ([`policy::MockPolicy`])
//!   implementations unified by [`policy::AnyPolicy`].

pub mod api;
pub mod policy;

// Re-export the most commonly used types at the module level.
pub use api::{ChatMessage, ChatResponse, Choice, LlmClient, SamplingParams, Usage};
pub use policy::{AnyPolicy, ApiPolicy, MockPolicy, PolicyModel};
