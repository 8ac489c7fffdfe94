use async_trait::async_trait;

use crate::Result;

/// A single chat-completion call.
///
/// Two call profiles exist, distinguished only by system prompt and
/// token/temperature settings: conversational replies and moderation
/// classification.
#[derive(Clone, Debug)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
}

impl CompletionRequest {
    pub fn conversational(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            max_tokens: 1000,
            temperature: 0.9,
            top_p: 0.9,
        }
    }

    pub fn moderation(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            max_tokens: 100,
            temperature: 0.3,
            top_p: 0.9,
        }
    }
}

/// Port for the remote completion service.
///
/// Implementations return the generated text or a typed error
/// (`Network` / `RateLimited` / `Timeout` / `Upstream`); failure policy is
/// layered on top by the conversational responder and the classifier adapter.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, req: CompletionRequest) -> Result<String>;
}
