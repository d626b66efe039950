//! Language model client interface.
//!
//! The planner talks to the model through the object-safe [`LlmClient`]
//! trait so the HTTP server can hold an `Arc<dyn LlmClient>` and tests can
//! swap in an in-process fake. [`OpenAiClient`] is the production
//! implementation for any OpenAI-compatible chat completions endpoint.

pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use openai::{LlmConfig, OpenAiClient};

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A single chat completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    /// Ask the provider to constrain output to a JSON object.
    pub json_object: bool,
    pub temperature: Option<f32>,
}

impl ChatRequest {
    /// System instruction plus one user message, JSON output requested.
    pub fn json(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            json_object: true,
            temperature: Some(0.7),
        }
    }
}

/// Errors from a language model call.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("language model client is misconfigured: {0}")]
    Config(String),

    #[error("language model request timed out")]
    Timeout,

    #[error("language model request failed")]
    Transport(#[source] reqwest::Error),

    #[error("language model returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("language model response is malformed: {0}")]
    Malformed(String),
}

/// A chat completion provider.
///
/// # Object Safety
///
/// This trait is object-safe so it can be stored as `Arc<dyn LlmClient>`
/// in shared application state.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Model identifier sent with each request.
    fn model(&self) -> &str;

    /// Run one completion and return the assistant's text.
    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError>;
}

// Compile-time assertion: LlmClient must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn LlmClient) {}
};
