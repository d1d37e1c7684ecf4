mod openai;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;

pub use openai::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, Choice, HttpError, OpenAiClient,
    Usage,
};

/// The two text generation backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    /// Hosted chat-completion API over HTTP.
    #[serde(rename = "openai")]
    Network,
    /// Browser automation against a conversational web front end.
    #[serde(rename = "gemini")]
    Automation,
}

impl ProviderKind {
    pub fn label(&self) -> &'static str {
        match self {
            ProviderKind::Network => "openai",
            ProviderKind::Automation => "gemini",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[async_trait]
pub trait TextProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Sends `prompt` and returns the raw completion text.
    async fn generate(&self, prompt: &str, temperature: f32) -> AppResult<String>;
}
