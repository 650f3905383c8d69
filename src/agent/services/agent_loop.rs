//! Bounded loop alternating model turns and tool invocations.

use crate::agent::domain::{ChatMessage, Conversation, ToolCall};
use crate::agent::ports::{ChatRequest, ModelBackend, ModelError, ToolCatalog};
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default cap on model turns per run.
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Failures that end an agent run.
#[derive(Debug, Clone, Error)]
pub enum AgentLoopError {
    /// The run started without any message.
    #[error("conversation is empty")]
    EmptyConversation,
    /// The model kept requesting tools past the iteration cap.
    #[error("agent loop exceeded {limit} iterations without a final answer")]
    IterationLimitExceeded {
        /// Configured cap.
        limit: usize,
    },
    /// The model backend failed.
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// One tool call made during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallRecord {
    /// Tool name requested by the model.
    pub name: String,
    /// Arguments requested by the model.
    pub arguments: Value,
    /// Text returned to the model.
    pub output: String,
    /// Whether the output describes a failure.
    pub is_error: bool,
}

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentRun {
    conversation: Conversation,
    final_message: String,
    iterations: usize,
    tool_calls: Vec<ToolCallRecord>,
}

impl AgentRun {
    /// Returns the model's final answer.
    #[must_use]
    pub fn final_message(&self) -> &str {
        &self.final_message
    }

    /// Returns the full conversation including tool traffic.
    #[must_use]
    pub const fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Returns the number of model turns taken.
    #[must_use]
    pub const fn iterations(&self) -> usize {
        self.iterations
    }

    /// Returns the tool calls in the order they were requested.
    #[must_use]
    pub fn tool_calls(&self) -> &[ToolCallRecord] {
        &self.tool_calls
    }
}

/// Drives a model against a tool catalog until it produces an answer.
pub struct AgentLoop<M, T>
where
    M: ModelBackend,
    T: ToolCatalog,
{
    model: Arc<M>,
    tools: Arc<T>,
    max_iterations: usize,
    system_prompt: Option<String>,
}

impl<M, T> AgentLoop<M, T>
where
    M: ModelBackend,
    T: ToolCatalog,
{
    /// Creates a loop with [`DEFAULT_MAX_ITERATIONS`] and no system prompt.
    #[must_use]
    pub const fn new(model: Arc<M>, tools: Arc<T>) -> Self {
        Self {
            model,
            tools,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            system_prompt: None,
        }
    }

    /// Sets the maximum number of model turns. Zero is raised to one.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Prepends `prompt` as a system message to conversations lacking one.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Answers a single user query.
    ///
    /// # Errors
    ///
    /// See [`Self::run`].
    pub async fn ask(&self, query: &str) -> Result<AgentRun, AgentLoopError> {
        self.run(Conversation::from_user(query)).await
    }

    /// Runs the loop on `conversation`.
    ///
    /// Each iteration sends the conversation and the catalog's tools to the
    /// model. A reply without tool calls ends the run. Otherwise every
    /// requested tool runs concurrently and its output, or the invocation
    /// error, is appended as a `tool` message.
    ///
    /// # Errors
    ///
    /// Returns [`AgentLoopError::EmptyConversation`] for an empty input,
    /// [`AgentLoopError::Model`] when the backend fails, and
    /// [`AgentLoopError::IterationLimitExceeded`] when no answer arrives
    /// within the cap.
    pub async fn run(&self, mut conversation: Conversation) -> Result<AgentRun, AgentLoopError> {
        if conversation.is_empty() {
            return Err(AgentLoopError::EmptyConversation);
        }
        if let Some(prompt) = &self.system_prompt {
            conversation.ensure_system_prompt(prompt);
        }

        let tools = self.tools.tool_specs().await;
        let mut records = Vec::new();

        for iteration in 1..=self.max_iterations {
            let request = ChatRequest {
                messages: conversation.messages().to_vec(),
                tools: tools.clone(),
            };
            let turn = self.model.complete(&request).await?;

            if turn.is_final() {
                let final_message = turn.content.unwrap_or_default();
                conversation.push(ChatMessage::assistant(final_message.clone()));
                info!(iterations = iteration, tool_calls = records.len(), "agent run finished");
                return Ok(AgentRun {
                    conversation,
                    final_message,
                    iterations: iteration,
                    tool_calls: records,
                });
            }

            debug!(iteration, calls = turn.tool_calls.len(), "model requested tools");
            let outcomes = join_all(turn.tool_calls.iter().map(|call| self.run_tool(call))).await;
            conversation.push(ChatMessage::assistant_tool_calls(
                turn.content,
                turn.tool_calls.clone(),
            ));
            for (call, record) in turn.tool_calls.into_iter().zip(outcomes) {
                conversation.push(ChatMessage::tool_result(call.id, record.output.clone()));
                records.push(record);
            }
        }

        warn!(limit = self.max_iterations, "agent run hit the iteration cap");
        Err(AgentLoopError::IterationLimitExceeded {
            limit: self.max_iterations,
        })
    }

    async fn run_tool(&self, call: &ToolCall) -> ToolCallRecord {
        let (output, is_error) = match self.tools.call(&call.name, call.arguments.clone()).await {
            Ok(response) => (response.text(), response.is_error),
            Err(err) => {
                warn!(tool = %call.name, error = %err, "tool invocation failed");
                (format!("Error: {err}"), true)
            }
        };
        ToolCallRecord {
            name: call.name.clone(),
            arguments: call.arguments.clone(),
            output,
            is_error,
        }
    }
}
