//! Agent policy loop over discovered tools.
//!
//! A language model backend proposes tool calls, the registry executes them,
//! and the results are fed back until the model answers in plain text or the
//! iteration cap is reached.
//!
//! - Conversation types in [`domain`]
//! - Model and tool catalog contracts in [`ports`]
//! - HTTP and scripted model backends in [`adapters`]
//! - The loop itself in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
