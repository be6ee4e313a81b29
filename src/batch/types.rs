//! Data carried through a batch run.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

/// Connection record for one roster entry.
///
/// Identity is `(host, port)`. The port is kept as written in the roster and
/// only parsed when dialing, so a bad port fails that host alone. The password
/// is kept behind [`SecretString`] so it never shows up in `Debug` output or
/// logs.
pub struct HostCredential {
    pub host: String,
    pub port: String,
    pub username: String,
    password: SecretString,
}

impl HostCredential {
    pub fn new(
        host: impl Into<String>,
        port: impl ToString,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: port.to_string(),
            username: username.into(),
            password: SecretString::new(password.into()),
        }
    }

    pub fn id(&self) -> (&str, &str) {
        (&self.host, &self.port)
    }

    /// Host and numeric port to dial.
    pub fn dial_target(&self) -> Result<(&str, u16), ConnectionError> {
        let invalid = |reason: String| ConnectionError::InvalidAddress {
            addr: self.to_string(),
            reason,
        };

        if self.host.is_empty() {
            return Err(invalid("host is empty".to_string()));
        }
        let port = self
            .port
            .parse::<u16>()
            .map_err(|_| invalid(format!("invalid port '{}'", self.port)))?;
        Ok((&self.host, port))
    }

    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

impl fmt::Display for HostCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for HostCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostCredential")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Why a host could not be connected to. Recorded as data, never propagated.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("Invalid address {addr}: {reason}")]
    InvalidAddress { addr: String, reason: String },

    #[error("Failed to dial {addr}: {reason}")]
    Dial { addr: String, reason: String },

    #[error("Host key for {addr} rejected: {reason}")]
    HostKeyRejected { addr: String, reason: String },

    #[error("Authentication failed for {user}@{addr}: {reason}")]
    Authentication {
        user: String,
        addr: String,
        reason: String,
    },

    #[error("Connection attempt timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Cancelled before the connection was established")]
    Cancelled,

    /// The runner task itself died (panic or abort).
    #[error("Host runner aborted: {0}")]
    Aborted(String),
}

/// Why a single command failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandFailure {
    #[error("Failed to open session: {0}")]
    SessionOpen(String),

    #[error("Command execution failed: {0}")]
    Execution(String),

    #[error("Process exited with status {code}{}", stderr_suffix(.stderr))]
    ExitStatus { code: u32, stderr: String },

    #[error("Process killed by signal {0}")]
    Signal(String),

    #[error("Command timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Cancelled")]
    Cancelled,
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {}", trimmed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Raw captured stdout.
    Success(Vec<u8>),
    Failure(CommandFailure),
}

/// Result of running one command on one host.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub command: String,
    pub host: Arc<HostCredential>,
    pub outcome: CommandOutcome,
}

impl CommandResult {
    pub fn is_success(&self) -> bool {
        self.output().is_some()
    }

    pub fn output(&self) -> Option<&[u8]> {
        match &self.outcome {
            CommandOutcome::Success(bytes) => Some(bytes),
            CommandOutcome::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&CommandFailure> {
        match &self.outcome {
            CommandOutcome::Success(_) => None,
            CommandOutcome::Failure(failure) => Some(failure),
        }
    }
}

/// Everything one host's run produced.
///
/// When `connection_failure` is set the host was never reached and `results`
/// is empty. Otherwise `results` holds one entry per executed command, in
/// order; only the last one can be a failure.
#[derive(Debug, Clone)]
pub struct HostOutcome {
    pub host: Arc<HostCredential>,
    pub results: Vec<CommandResult>,
    pub connection_failure: Option<ConnectionError>,
    pub elapsed: Duration,
}

impl HostOutcome {
    pub fn connection_failed(
        host: Arc<HostCredential>,
        error: ConnectionError,
        elapsed: Duration,
    ) -> Self {
        Self {
            host,
            results: Vec::new(),
            connection_failure: Some(error),
            elapsed,
        }
    }

    /// True when the host was reached and every executed command succeeded.
    pub fn is_success(&self) -> bool {
        self.connection_failure.is_none() && self.results.iter().all(CommandResult::is_success)
    }

    /// The command that stopped this host's run, if any.
    pub fn failed_command(&self) -> Option<&CommandResult> {
        self.results.iter().find(|r| !r.is_success())
    }
}
