//! Per-server transport state machine and status snapshots.

use super::ToolRegistryDomainError;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection state of a registered MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportState {
    /// Descriptor stored, no transport opened yet.
    Disconnected,
    /// Transport is being opened and the MCP handshake is running.
    Connecting,
    /// Session established and idle.
    Ready,
    /// At least one tool call is in flight.
    Invoking,
    /// The last connection attempt or session failed.
    Failed,
    /// Shutdown has started for this server.
    Closing,
    /// The session is closed and resources are released.
    Closed,
}

impl TransportState {
    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Ready => "ready",
            Self::Invoking => "invoking",
            Self::Failed => "failed",
            Self::Closing => "closing",
            Self::Closed => "closed",
        }
    }

    /// Returns whether tool calls may be dispatched in this state.
    #[must_use]
    pub const fn accepts_calls(self) -> bool {
        matches!(self, Self::Ready | Self::Invoking)
    }

    /// Returns whether transition to `target` is allowed.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Disconnected | Self::Failed, Self::Connecting)
                | (Self::Connecting, Self::Ready | Self::Failed)
                | (Self::Ready, Self::Invoking | Self::Failed)
                | (Self::Invoking, Self::Ready | Self::Failed)
                | (
                    Self::Disconnected
                        | Self::Connecting
                        | Self::Ready
                        | Self::Invoking
                        | Self::Failed,
                    Self::Closing
                )
                | (Self::Closing, Self::Closed)
        )
    }
}

impl fmt::Display for TransportState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Timestamped status snapshot for an MCP server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStatus {
    state: TransportState,
    changed_at: DateTime<Utc>,
    last_error: Option<String>,
}

impl ServerStatus {
    /// Creates a `disconnected` status.
    #[must_use]
    pub fn disconnected(clock: &impl Clock) -> Self {
        Self {
            state: TransportState::Disconnected,
            changed_at: clock.utc(),
            last_error: None,
        }
    }

    /// Moves to `target`, stamping the change time.
    ///
    /// Entering `connecting` or `ready` clears the last error.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRegistryDomainError::InvalidStateTransition`] when the
    /// transition is not allowed.
    pub fn transition(
        &mut self,
        target: TransportState,
        clock: &impl Clock,
    ) -> Result<(), ToolRegistryDomainError> {
        if !self.state.can_transition_to(target) {
            return Err(ToolRegistryDomainError::InvalidStateTransition {
                from: self.state.as_str().to_owned(),
                to: target.as_str().to_owned(),
            });
        }

        self.state = target;
        self.changed_at = clock.utc();
        if matches!(target, TransportState::Connecting | TransportState::Ready) {
            self.last_error = None;
        }
        Ok(())
    }

    /// Moves to `failed` and records the failure reason.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRegistryDomainError::InvalidStateTransition`] when the
    /// current state cannot fail.
    pub fn fail(
        &mut self,
        reason: impl Into<String>,
        clock: &impl Clock,
    ) -> Result<(), ToolRegistryDomainError> {
        self.transition(TransportState::Failed, clock)?;
        self.last_error = Some(reason.into());
        Ok(())
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> TransportState {
        self.state
    }

    /// Returns when the state last changed.
    #[must_use]
    pub const fn changed_at(&self) -> DateTime<Utc> {
        self.changed_at
    }

    /// Returns the most recent failure reason, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}
