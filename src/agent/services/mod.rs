//! Agent orchestration services.

mod agent_loop;

pub use agent_loop::{AgentLoop, AgentLoopError, AgentRun, DEFAULT_MAX_ITERATIONS, ToolCallRecord};
