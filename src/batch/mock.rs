//! Scripted in-memory connector for exercising the executor without a network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::report::Reporter;
use super::types::{CommandFailure, CommandResult, ConnectionError, HostCredential, HostOutcome};
use super::{Connector, HostConnection};

#[derive(Debug, Clone, Default)]
enum ConnectBehavior {
    #[default]
    Accept,
    Unreachable,
    RejectPassword,
    Panic,
}

/// Behaviour of one scripted host. Commands echo themselves by default.
#[derive(Debug, Clone, Default)]
pub struct HostScript {
    connect: ConnectBehavior,
    connect_delay: Option<Duration>,
    fail_on: Option<String>,
    command_delays: HashMap<String, Duration>,
}

impl HostScript {
    pub fn unreachable() -> Self {
        Self {
            connect: ConnectBehavior::Unreachable,
            ..Default::default()
        }
    }

    pub fn bad_password() -> Self {
        Self {
            connect: ConnectBehavior::RejectPassword,
            ..Default::default()
        }
    }

    pub fn panicking() -> Self {
        Self {
            connect: ConnectBehavior::Panic,
            ..Default::default()
        }
    }

    pub fn failing_on(command: &str) -> Self {
        Self {
            fail_on: Some(command.to_string()),
            ..Default::default()
        }
    }

    pub fn connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = Some(delay);
        self
    }

    pub fn command_delay(mut self, command: &str, delay: Duration) -> Self {
        self.command_delays.insert(command.to_string(), delay);
        self
    }
}

#[derive(Default)]
struct Ledger {
    executed: Mutex<HashMap<String, Vec<String>>>,
    closed: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

#[derive(Default)]
pub struct ScriptedConnector {
    hosts: HashMap<String, HostScript>,
    ledger: Arc<Ledger>,
}

impl ScriptedConnector {
    pub fn with_host(mut self, host: &str, script: HostScript) -> Self {
        self.hosts.insert(host.to_string(), script);
        self
    }

    pub fn executed(&self, host: &str) -> Vec<String> {
        self.ledger
            .executed
            .lock()
            .unwrap()
            .get(host)
            .cloned()
            .unwrap_or_default()
    }

    pub fn closed(&self, host: &str) -> usize {
        self.ledger
            .closed
            .lock()
            .unwrap()
            .get(host)
            .copied()
            .unwrap_or(0)
    }

    /// Highest number of simultaneously open connections seen so far.
    pub fn peak_in_flight(&self) -> usize {
        self.ledger.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    type Connection = ScriptedConnection;

    async fn connect(&self, credential: &HostCredential) -> Result<ScriptedConnection, ConnectionError> {
        credential.dial_target()?;
        let script = self.hosts.get(&credential.host).cloned().unwrap_or_default();

        if let Some(delay) = script.connect_delay {
            tokio::time::sleep(delay).await;
        }

        let addr = credential.to_string();
        match script.connect {
            ConnectBehavior::Accept => {}
            ConnectBehavior::Unreachable => {
                return Err(ConnectionError::Dial {
                    addr,
                    reason: "Connection refused (os error 111)".to_string(),
                })
            }
            ConnectBehavior::RejectPassword => {
                return Err(ConnectionError::Authentication {
                    user: credential.username.clone(),
                    addr,
                    reason: "server rejected password".to_string(),
                })
            }
            ConnectBehavior::Panic => panic!("scripted panic for {}", addr),
        }

        let now = self.ledger.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.ledger.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        Ok(ScriptedConnection {
            host: credential.host.clone(),
            script,
            ledger: self.ledger.clone(),
        })
    }
}

pub struct ScriptedConnection {
    host: String,
    script: HostScript,
    ledger: Arc<Ledger>,
}

#[async_trait]
impl HostConnection for ScriptedConnection {
    async fn exec(&self, command: &str) -> Result<Vec<u8>, CommandFailure> {
        self.ledger
            .executed
            .lock()
            .unwrap()
            .entry(self.host.clone())
            .or_default()
            .push(command.to_string());

        if let Some(delay) = self.script.command_delays.get(command) {
            tokio::time::sleep(*delay).await;
        }

        if self.script.fail_on.as_deref() == Some(command) {
            return Err(CommandFailure::ExitStatus {
                code: 1,
                stderr: format!("{}: failed", command),
            });
        }

        Ok(format!("{}\n", command).into_bytes())
    }

    async fn close(self) {
        self.ledger.in_flight.fetch_sub(1, Ordering::SeqCst);
        *self
            .ledger
            .closed
            .lock()
            .unwrap()
            .entry(self.host.clone())
            .or_default() += 1;
    }
}

/// Reporter that keeps a compact log of what it was told.
#[derive(Default)]
pub struct RecordingReporter {
    commands: Mutex<Vec<String>>,
    connection_failures: Mutex<Vec<String>>,
    finished: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    pub fn connection_failures(&self) -> Vec<String> {
        self.connection_failures.lock().unwrap().clone()
    }

    pub fn finished_hosts(&self) -> Vec<String> {
        self.finished.lock().unwrap().clone()
    }
}

impl Reporter for RecordingReporter {
    fn command_finished(&self, result: &CommandResult) {
        let status = if result.is_success() { "ok" } else { "failed" };
        self.commands
            .lock()
            .unwrap()
            .push(format!("{} {} {}", result.host, result.command, status));
    }

    fn connection_failed(&self, host: &HostCredential, _error: &ConnectionError) {
        self.connection_failures.lock().unwrap().push(host.to_string());
    }

    fn host_finished(&self, outcome: &HostOutcome) {
        self.finished.lock().unwrap().push(outcome.host.to_string());
    }
}
