//! Adapter implementations for the agent ports.

mod openai;
mod registry;
mod scripted;

pub use openai::{DEFAULT_API_BASE, OpenAiCompatibleBackend};
pub use scripted::ScriptedModelBackend;
