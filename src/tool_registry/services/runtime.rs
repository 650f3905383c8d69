//! Per-server runtime bookkeeping: status, live session and in-flight calls.

use crate::tool_registry::domain::{ServerDescriptor, ServerStatus, TransportState};
use crate::tool_registry::ports::McpSession;
use mockable::Clock;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

pub(crate) type SharedSession = Arc<dyn McpSession>;

pub(crate) struct ServerRuntime {
    descriptor: ServerDescriptor,
    inner: Mutex<RuntimeInner>,
}

struct RuntimeInner {
    status: ServerStatus,
    session: Option<SharedSession>,
    in_flight: usize,
}

impl RuntimeInner {
    fn move_to(&mut self, target: TransportState, clock: &impl Clock) -> bool {
        match self.status.transition(target, clock) {
            Ok(()) => true,
            Err(err) => {
                debug!(error = %err, "ignored transport state change");
                false
            }
        }
    }
}

impl ServerRuntime {
    pub(crate) fn new(descriptor: ServerDescriptor, clock: &impl Clock) -> Self {
        Self {
            descriptor,
            inner: Mutex::new(RuntimeInner {
                status: ServerStatus::disconnected(clock),
                session: None,
                in_flight: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RuntimeInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) const fn descriptor(&self) -> &ServerDescriptor {
        &self.descriptor
    }

    pub(crate) fn status(&self) -> ServerStatus {
        self.lock().status.clone()
    }

    /// Returns the live session when the server accepts calls.
    pub(crate) fn ready_session(&self) -> Option<SharedSession> {
        let inner = self.lock();
        if inner.status.state().accepts_calls() {
            inner.session.clone()
        } else {
            None
        }
    }

    /// Enters `connecting`. Returns `false` once shutdown has begun.
    pub(crate) fn begin_connect(&self, clock: &impl Clock) -> bool {
        self.lock().move_to(TransportState::Connecting, clock)
    }

    /// Stores a freshly opened session and enters `ready`.
    ///
    /// Hands the session back when shutdown raced the connection so the
    /// caller can close it.
    pub(crate) fn connected(
        &self,
        session: SharedSession,
        clock: &impl Clock,
    ) -> Result<(), SharedSession> {
        let mut inner = self.lock();
        if inner.status.state() != TransportState::Connecting
            || !inner.move_to(TransportState::Ready, clock)
        {
            return Err(session);
        }
        inner.session = Some(session);
        inner.in_flight = 0;
        Ok(())
    }

    /// Enters `failed`, returning any session that must now be closed.
    pub(crate) fn failed(&self, reason: &str, clock: &impl Clock) -> Option<SharedSession> {
        let mut inner = self.lock();
        if !inner.status.state().can_transition_to(TransportState::Failed) {
            return None;
        }
        if let Err(err) = inner.status.fail(reason, clock) {
            debug!(error = %err, "ignored transport failure");
            return None;
        }
        inner.in_flight = 0;
        inner.session.take()
    }

    /// Reserves the session for one call and enters `invoking`.
    pub(crate) fn begin_call(&self, clock: &impl Clock) -> Result<SharedSession, TransportState> {
        let mut inner = self.lock();
        let state = inner.status.state();
        let session = match (state.accepts_calls(), inner.session.clone()) {
            (true, Some(session)) => session,
            _ => return Err(state),
        };
        if state == TransportState::Ready {
            inner.move_to(TransportState::Invoking, clock);
        }
        inner.in_flight += 1;
        Ok(session)
    }

    /// Releases a call reservation.
    ///
    /// A fatal transport error moves the server to `failed` and returns the
    /// broken session for closing. Otherwise the server returns to `ready`
    /// once no calls remain.
    pub(crate) fn end_call(
        &self,
        fatal_reason: Option<&str>,
        clock: &impl Clock,
    ) -> Option<SharedSession> {
        let mut inner = self.lock();
        if inner.status.state() != TransportState::Invoking {
            return None;
        }
        inner.in_flight = inner.in_flight.saturating_sub(1);

        if let Some(reason) = fatal_reason {
            drop(inner);
            return self.failed(reason, clock);
        }
        if inner.in_flight == 0 {
            inner.move_to(TransportState::Ready, clock);
        }
        None
    }

    /// Enters `closing` and returns the session to close, if any.
    pub(crate) fn begin_close(&self, clock: &impl Clock) -> Option<SharedSession> {
        let mut inner = self.lock();
        if !inner.move_to(TransportState::Closing, clock) {
            return None;
        }
        inner.in_flight = 0;
        inner.session.take()
    }

    pub(crate) fn mark_closed(&self, clock: &impl Clock) {
        self.lock().move_to(TransportState::Closed, clock);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool_registry::adapters::InMemoryConnector;
    use crate::tool_registry::domain::{McpServerName, McpTransport};
    use crate::tool_registry::ports::McpConnector;
    use mockable::DefaultClock;

    fn runtime() -> ServerRuntime {
        let descriptor = ServerDescriptor::new(
            McpServerName::new("math").expect("valid name"),
            McpTransport::stdio("memory").expect("valid transport"),
        )
        .expect("valid descriptor");
        ServerRuntime::new(descriptor, &DefaultClock)
    }

    async fn session(runtime: &ServerRuntime) -> SharedSession {
        InMemoryConnector::new()
            .connect(runtime.descriptor())
            .await
            .expect("in-memory connect")
    }

    #[tokio::test]
    async fn calls_move_between_ready_and_invoking() {
        let clock = DefaultClock;
        let server = runtime();
        assert!(server.begin_connect(&clock));
        let live = session(&server).await;
        assert!(server.connected(live, &clock).is_ok());

        assert!(server.begin_call(&clock).is_ok());
        assert!(server.begin_call(&clock).is_ok());
        assert_eq!(server.status().state(), TransportState::Invoking);

        assert!(server.end_call(None, &clock).is_none());
        assert_eq!(server.status().state(), TransportState::Invoking);
        assert!(server.end_call(None, &clock).is_none());
        assert_eq!(server.status().state(), TransportState::Ready);
    }

    #[tokio::test]
    async fn fatal_call_error_fails_server() {
        let clock = DefaultClock;
        let server = runtime();
        server.begin_connect(&clock);
        let live = session(&server).await;
        assert!(server.connected(live, &clock).is_ok());
        assert!(server.begin_call(&clock).is_ok());

        assert!(server.end_call(Some("broken pipe"), &clock).is_some());
        let status = server.status();
        assert_eq!(status.state(), TransportState::Failed);
        assert_eq!(status.last_error(), Some("broken pipe"));
        assert_eq!(server.begin_call(&clock).err(), Some(TransportState::Failed));
    }

    #[tokio::test]
    async fn close_during_connect_returns_session() {
        let clock = DefaultClock;
        let server = runtime();
        server.begin_connect(&clock);
        let live = session(&server).await;
        assert!(server.begin_close(&clock).is_none());
        assert_eq!(server.status().state(), TransportState::Closing);
        assert!(server.connected(live, &clock).is_err());

        server.mark_closed(&clock);
        assert_eq!(server.status().state(), TransportState::Closed);
        assert!(!server.begin_connect(&clock));
    }
}
