//! Domain model for the agent loop.

mod conversation;

pub use conversation::{AssistantTurn, ChatMessage, Conversation, Role, ToolCall, ToolSpec};
