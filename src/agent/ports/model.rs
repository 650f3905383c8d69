//! Port for chat-completion backends.

use crate::agent::domain::{AssistantTurn, ChatMessage, ToolSpec};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Input for one model completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    /// Conversation so far.
    pub messages: Vec<ChatMessage>,
    /// Tools the model may call.
    pub tools: Vec<ToolSpec>,
}

/// Failures raised by a [`ModelBackend`].
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// The request could not be sent or the body could not be read.
    #[error("model request failed: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
    /// The backend answered with a non-success status.
    #[error("model backend returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },
    /// The backend answered with a body that is not a chat completion.
    #[error("invalid model response: {0}")]
    InvalidResponse(String),
    /// A scripted backend ran out of replies.
    #[error("model backend has no more replies")]
    Exhausted,
}

impl ModelError {
    /// Wraps a transport failure.
    #[must_use]
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }
}

/// Produces the next assistant turn for a conversation.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Requests one completion.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] when the backend is unreachable or replies with
    /// something other than a chat completion.
    async fn complete(&self, request: &ChatRequest) -> Result<AssistantTurn, ModelError>;
}
