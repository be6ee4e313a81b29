//! Lifecycle of one host's batch run.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use super::report::Reporter;
use super::types::{
    CommandFailure, CommandOutcome, CommandResult, ConnectionError, HostCredential, HostOutcome,
};
use super::{Connector, ExecLimits, HostConnection};

/// Connects to one host, runs the command list in order and releases the
/// connection.
///
/// A failed command stops the run for this host; the remaining commands are
/// not attempted.
pub struct HostRunner<C: Connector> {
    connector: Arc<C>,
    limits: ExecLimits,
    cancel: CancellationToken,
    reporter: Arc<dyn Reporter>,
}

impl<C: Connector> Clone for HostRunner<C> {
    fn clone(&self) -> Self {
        Self {
            connector: self.connector.clone(),
            limits: self.limits,
            cancel: self.cancel.clone(),
            reporter: self.reporter.clone(),
        }
    }
}

/// How a bounded wait ended when it did not produce a value.
enum Interrupted {
    TimedOut(Duration),
    Cancelled,
}

impl<C: Connector> HostRunner<C> {
    pub fn new(
        connector: Arc<C>,
        limits: ExecLimits,
        cancel: CancellationToken,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            connector,
            limits,
            cancel,
            reporter,
        }
    }

    pub async fn run_all(&self, credential: Arc<HostCredential>, commands: &[String]) -> HostOutcome {
        let started = Instant::now();
        self.reporter.host_started(&credential);
        tracing::info!(host = %credential, user = %credential.username, "Connecting");

        let connected = self
            .bounded(self.limits.connect_timeout, self.connector.connect(&credential))
            .await;
        let connection = match connected {
            Ok(Ok(connection)) => connection,
            Ok(Err(error)) => return self.connection_failed(credential, error, started),
            Err(Interrupted::TimedOut(after)) => {
                return self.connection_failed(credential, ConnectionError::TimedOut(after), started)
            }
            Err(Interrupted::Cancelled) => {
                return self.connection_failed(credential, ConnectionError::Cancelled, started)
            }
        };

        let results = self.run_commands(&connection, &credential, commands).await;
        connection.close().await;
        tracing::debug!(host = %credential, "Connection closed");

        let outcome = HostOutcome {
            host: credential,
            results,
            connection_failure: None,
            elapsed: started.elapsed(),
        };
        self.reporter.host_finished(&outcome);
        outcome
    }

    async fn run_commands(
        &self,
        connection: &C::Connection,
        credential: &Arc<HostCredential>,
        commands: &[String],
    ) -> Vec<CommandResult> {
        let mut results = Vec::with_capacity(commands.len());

        for command in commands {
            tracing::debug!(host = %credential, command = %command, "Running command");

            let outcome = match self
                .bounded(self.limits.command_timeout, connection.exec(command))
                .await
            {
                Ok(Ok(output)) => CommandOutcome::Success(output),
                Ok(Err(failure)) => CommandOutcome::Failure(failure),
                Err(Interrupted::TimedOut(after)) => {
                    CommandOutcome::Failure(CommandFailure::TimedOut(after))
                }
                Err(Interrupted::Cancelled) => CommandOutcome::Failure(CommandFailure::Cancelled),
            };

            let result = CommandResult {
                command: command.clone(),
                host: credential.clone(),
                outcome,
            };
            self.reporter.command_finished(&result);

            let failed = !result.is_success();
            if let Some(failure) = result.failure() {
                let remaining = commands.len() - results.len() - 1;
                tracing::warn!(
                    host = %credential,
                    command = %command,
                    skipped = remaining,
                    "Command failed: {}",
                    failure
                );
            }
            results.push(result);

            if failed {
                break;
            }
        }

        results
    }

    pub(super) fn connection_failed(
        &self,
        credential: Arc<HostCredential>,
        error: ConnectionError,
        started: Instant,
    ) -> HostOutcome {
        tracing::warn!(host = %credential, "Connection failed: {}", error);
        self.reporter.connection_failed(&credential, &error);
        let outcome = HostOutcome::connection_failed(credential, error, started.elapsed());
        self.reporter.host_finished(&outcome);
        outcome
    }

    /// Await `fut` unless the deadline passes or the run is cancelled first.
    async fn bounded<F, T>(
        &self,
        deadline: Option<Duration>,
        fut: F,
    ) -> std::result::Result<T, Interrupted>
    where
        F: Future<Output = T>,
    {
        let limited = async {
            match deadline {
                Some(after) => tokio::time::timeout(after, fut)
                    .await
                    .map_err(|_| Interrupted::TimedOut(after)),
                None => Ok(fut.await),
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Interrupted::Cancelled),
            result = limited => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::batch::mock::{HostScript, RecordingReporter, ScriptedConnector};

    fn commands(list: &[&str]) -> Vec<String> {
        list.iter().map(|c| c.to_string()).collect()
    }

    fn runner(connector: Arc<ScriptedConnector>, limits: ExecLimits) -> HostRunner<ScriptedConnector> {
        HostRunner::new(
            connector,
            limits,
            CancellationToken::new(),
            Arc::new(RecordingReporter::default()),
        )
    }

    #[tokio::test]
    async fn test_runs_every_command_in_order() {
        let connector = Arc::new(ScriptedConnector::default());
        let runner = runner(connector.clone(), ExecLimits::default());
        let cred = Arc::new(HostCredential::new("h1", 22, "u", "p"));

        let outcome = runner
            .run_all(cred, &commands(&["echo one", "echo two", "echo three"]))
            .await;

        assert!(outcome.is_success());
        let ran: Vec<_> = outcome.results.iter().map(|r| r.command.as_str()).collect();
        assert_eq!(ran, vec!["echo one", "echo two", "echo three"]);
        assert_eq!(outcome.results[1].output(), Some(&b"echo two\n"[..]));
        assert_eq!(connector.closed("h1"), 1);
    }

    #[tokio::test]
    async fn test_failed_command_stops_remaining_commands() {
        let connector = Arc::new(
            ScriptedConnector::default().with_host("h1", HostScript::failing_on("fail_cmd")),
        );
        let runner = runner(connector.clone(), ExecLimits::default());
        let cred = Arc::new(HostCredential::new("h1", 22, "u", "p"));

        let outcome = runner
            .run_all(cred, &commands(&["ok_cmd", "fail_cmd", "never_runs"]))
            .await;

        assert_eq!(outcome.results.len(), 2);
        assert!(outcome.results[0].is_success());
        assert!(!outcome.results[1].is_success());
        assert!(outcome.results.iter().all(|r| r.command != "never_runs"));
        assert_eq!(connector.executed("h1"), vec!["ok_cmd", "fail_cmd"]);
        assert_eq!(connector.closed("h1"), 1);
    }

    #[tokio::test]
    async fn test_connect_failure_yields_empty_results() {
        let connector = Arc::new(
            ScriptedConnector::default().with_host("down", HostScript::unreachable()),
        );
        let runner = runner(connector.clone(), ExecLimits::default());
        let cred = Arc::new(HostCredential::new("down", 22, "u", "p"));

        let outcome = runner.run_all(cred, &commands(&["uptime"])).await;

        assert!(outcome.results.is_empty());
        assert!(matches!(
            outcome.connection_failure,
            Some(ConnectionError::Dial { .. })
        ));
        assert_eq!(connector.closed("down"), 0);
    }

    #[tokio::test]
    async fn test_authentication_failure_is_distinct_from_dial() {
        let connector = Arc::new(
            ScriptedConnector::default().with_host("locked", HostScript::bad_password()),
        );
        let runner = runner(connector, ExecLimits::default());
        let cred = Arc::new(HostCredential::new("locked", 22, "u", "wrong"));

        let outcome = runner.run_all(cred, &commands(&["uptime"])).await;

        assert!(matches!(
            outcome.connection_failure,
            Some(ConnectionError::Authentication { .. })
        ));
    }

    #[tokio::test]
    async fn test_connect_timeout() {
        let connector = Arc::new(
            ScriptedConnector::default()
                .with_host("slow", HostScript::default().connect_delay(Duration::from_secs(30))),
        );
        let limits = ExecLimits {
            connect_timeout: Some(Duration::from_millis(50)),
            command_timeout: None,
        };
        let runner = runner(connector, limits);
        let cred = Arc::new(HostCredential::new("slow", 22, "u", "p"));

        let outcome = runner.run_all(cred, &commands(&["uptime"])).await;

        assert_eq!(
            outcome.connection_failure,
            Some(ConnectionError::TimedOut(Duration::from_millis(50)))
        );
    }

    #[tokio::test]
    async fn test_command_timeout_stops_host_and_closes_connection() {
        let connector = Arc::new(
            ScriptedConnector::default().with_host(
                "h1",
                HostScript::default().command_delay("sleep 999", Duration::from_secs(30)),
            ),
        );
        let limits = ExecLimits {
            connect_timeout: None,
            command_timeout: Some(Duration::from_millis(50)),
        };
        let runner = runner(connector.clone(), limits);
        let cred = Arc::new(HostCredential::new("h1", 22, "u", "p"));

        let outcome = runner
            .run_all(cred, &commands(&["hostname", "sleep 999", "uptime"]))
            .await;

        assert_eq!(outcome.results.len(), 2);
        assert_eq!(
            outcome.results[1].failure(),
            Some(&CommandFailure::TimedOut(Duration::from_millis(50)))
        );
        assert_eq!(connector.closed("h1"), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_connect() {
        let connector = Arc::new(ScriptedConnector::default());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let runner = HostRunner::new(
            connector.clone(),
            ExecLimits::default(),
            cancel,
            Arc::new(RecordingReporter::default()),
        );
        let cred = Arc::new(HostCredential::new("h1", 22, "u", "p"));

        let outcome = runner.run_all(cred, &commands(&["uptime"])).await;

        assert_eq!(outcome.connection_failure, Some(ConnectionError::Cancelled));
        assert!(connector.executed("h1").is_empty());
    }

    #[tokio::test]
    async fn test_reporter_sees_each_result() {
        let connector = Arc::new(
            ScriptedConnector::default().with_host("h1", HostScript::failing_on("b")),
        );
        let reporter = Arc::new(RecordingReporter::default());
        let runner = HostRunner::new(
            connector,
            ExecLimits::default(),
            CancellationToken::new(),
            reporter.clone(),
        );
        let cred = Arc::new(HostCredential::new("h1", 22, "u", "p"));

        runner.run_all(cred, &commands(&["a", "b", "c"])).await;

        assert_eq!(reporter.commands(), vec!["h1:22 a ok", "h1:22 b failed"]);
        assert_eq!(reporter.finished_hosts(), vec!["h1:22"]);
    }
}
