//! Deterministic model backend replaying canned turns.

use crate::agent::domain::AssistantTurn;
use crate::agent::ports::{ChatRequest, ModelBackend, ModelError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// Model backend that returns pre-recorded turns in order.
///
/// Every request is recorded so tests can inspect what the agent loop sent.
/// Once the script is exhausted further requests fail with
/// [`ModelError::Exhausted`].
#[derive(Debug, Default)]
pub struct ScriptedModelBackend {
    turns: Mutex<VecDeque<AssistantTurn>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedModelBackend {
    /// Creates a backend replaying `turns`.
    #[must_use]
    pub fn new(turns: impl IntoIterator<Item = AssistantTurn>) -> Self {
        Self {
            turns: Mutex::new(turns.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Returns every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of turns not yet replayed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.turns
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl ModelBackend for ScriptedModelBackend {
    async fn complete(&self, request: &ChatRequest) -> Result<AssistantTurn, ModelError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        self.turns
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .ok_or(ModelError::Exhausted)
    }
}
