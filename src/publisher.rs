// src/publisher.rs - Transport seam between the publish loop and a broker
use crate::error::Result;
use async_trait::async_trait;
use std::fmt;

/// Lifecycle of a broker session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No session, never connected or closed on purpose
    Disconnected,
    /// Session established and usable
    Connected,
    /// Session dropped by the transport; a new `connect` is needed
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connected => "connected",
            ConnectionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A message sink with at-least-once delivery.
///
/// Implementations own the whole session. `publish` resolves only once the
/// broker has acknowledged the message; when the session is lost it returns an
/// error and moves `state()` to [`ConnectionState::Failed`].
#[async_trait]
pub trait Publisher: Send {
    /// Open a fresh session, replacing any previous one.
    async fn connect(&mut self) -> Result<()>;

    /// Send one message and wait for the broker acknowledgement.
    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<()>;

    /// Close the session. Never fails; errors are logged by the implementation.
    async fn disconnect(&mut self);

    /// Current session state.
    fn state(&self) -> ConnectionState;

    /// Human readable transport name for logs.
    fn name(&self) -> &str;
}
