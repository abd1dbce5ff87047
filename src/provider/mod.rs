//! Completion provider abstraction
//!
//! The orchestrator only depends on this request/response shape; the wire
//! protocol belongs to the implementation.

mod openai;

pub use openai::{OpenAiProvider, DEFAULT_BASE_URL};

use crate::message::Message;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One completion call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Choice {
    pub message: Message,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Usage {
    pub total_tokens: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CompletionResponse {
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Usage,
}

impl CompletionResponse {
    /// Build a single-choice response
    pub fn single(answer: impl Into<String>, total_tokens: u64) -> Self {
        Self {
            choices: vec![Choice {
                message: Message::assistant(answer),
            }],
            usage: Usage { total_tokens },
        }
    }

    /// Text of the first choice
    pub fn first_text(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content())
    }
}

/// A chat-completion backend. Failures surface as [`crate::ChatError::Provider`].
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;
}
