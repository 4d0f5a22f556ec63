//! LLM integration module.
//!
//! Provides the [`Generator`] seam the pipeline calls through, an
//! OpenAI-compatible client implementing it, and the fixed prompt texts.

mod client;
mod prompts;

pub(crate) use client::ApiError;
pub use client::{LlmClient, LlmResponse, Message, Role, TokenUsage};
pub use prompts::Prompts;

use crate::error::Result;
use async_trait::async_trait;

/// Single-turn, stateless text generation.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a completion for `prompt`, trimmed of surrounding whitespace.
    async fn generate(&self, prompt: &str) -> Result<String>;
}
