//! Concurrent multi-host command execution.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │ BatchDispatcher │  ← one task per host, join barrier
//! └────────┬────────┘
//!          │
//!    ┌─────┴─────┐
//!    ▼           ▼
//! ┌──────┐   ┌──────┐
//! │Runner│   │Runner│  ← connect, run commands in order, close
//! └──┬───┘   └──┬───┘
//!    ▼          ▼
//! ┌─────────────────┐
//! │ dyn Connector   │  ← SSH in production, scripted in tests
//! └─────────────────┘
//! ```
//!
//! Host-scoped errors never leave a runner: they are recorded in the
//! [`types::HostOutcome`] for that host.

pub mod dispatcher;
#[cfg(test)]
pub(crate) mod mock;
pub mod report;
pub mod runner;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;

pub use dispatcher::{BatchDispatcher, DispatchOptions};
pub use report::ConsoleReporter;
pub use types::{CommandFailure, ConnectionError, HostCredential};

/// Opens authenticated connections to hosts.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Connection: HostConnection;

    /// Dial and authenticate. Anything partially set up must be released
    /// before an error is returned.
    async fn connect(
        &self,
        credential: &HostCredential,
    ) -> std::result::Result<Self::Connection, ConnectionError>;
}

/// One authenticated connection owned by a single host runner.
#[async_trait]
pub trait HostConnection: Send + Sync + 'static {
    /// Run one command on a fresh session and return its stdout.
    async fn exec(&self, command: &str) -> std::result::Result<Vec<u8>, CommandFailure>;

    /// Release the connection.
    async fn close(self);
}

/// Deadlines applied to the two blocking points of a host run.
///
/// `None` means wait indefinitely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecLimits {
    pub connect_timeout: Option<Duration>,
    pub command_timeout: Option<Duration>,
}
