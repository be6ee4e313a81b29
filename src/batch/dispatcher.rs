//! Fan-out of host runners across the whole roster.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::report::Reporter;
use super::runner::HostRunner;
use super::types::{ConnectionError, HostCredential, HostOutcome};
use super::{Connector, ExecLimits};

/// Tuning for a dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Maximum number of hosts in flight at once. `None` is unbounded.
    pub max_concurrency: Option<usize>,
    pub limits: ExecLimits,
}

/// Runs one [`HostRunner`] task per credential and waits for all of them.
pub struct BatchDispatcher<C: Connector> {
    runner: HostRunner<C>,
    max_concurrency: Option<usize>,
    permits: Option<Arc<Semaphore>>,
    cancel: CancellationToken,
}

impl<C: Connector> BatchDispatcher<C> {
    pub fn new(
        connector: Arc<C>,
        options: DispatchOptions,
        cancel: CancellationToken,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        let max_concurrency = options.max_concurrency.map(|limit| limit.max(1));
        let permits = max_concurrency.map(|limit| Arc::new(Semaphore::new(limit)));

        Self {
            runner: HostRunner::new(connector, options.limits, cancel.clone(), reporter),
            max_concurrency,
            permits,
            cancel,
        }
    }

    /// Run `commands` on every host and return one outcome per credential.
    ///
    /// Outcomes are returned in roster order. A runner that panics is recorded
    /// as [`ConnectionError::Aborted`] for its own host only.
    pub async fn dispatch(
        &self,
        credentials: Vec<Arc<HostCredential>>,
        commands: Arc<[String]>,
    ) -> Vec<HostOutcome> {
        tracing::info!(
            hosts = credentials.len(),
            commands = commands.len(),
            max_concurrency = ?self.max_concurrency,
            "Dispatching batch"
        );

        let handles: Vec<(Arc<HostCredential>, Instant, JoinHandle<HostOutcome>)> = credentials
            .into_iter()
            .map(|credential| {
                let started = Instant::now();
                let handle = self.spawn_host(credential.clone(), commands.clone());
                (credential, started, handle)
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (credential, started, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    let reason = if e.is_panic() {
                        "runner panicked".to_string()
                    } else {
                        e.to_string()
                    };
                    tracing::error!(host = %credential, "Host runner aborted: {}", reason);
                    self.runner
                        .connection_failed(credential, ConnectionError::Aborted(reason), started)
                }
            };
            outcomes.push(outcome);
        }

        tracing::info!(hosts = outcomes.len(), "Batch complete");
        outcomes
    }

    fn spawn_host(
        &self,
        credential: Arc<HostCredential>,
        commands: Arc<[String]>,
    ) -> JoinHandle<HostOutcome> {
        let runner = self.runner.clone();
        let permits = self.permits.clone();
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            let _permit = match permits {
                Some(semaphore) => {
                    let waited = Instant::now();
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            return runner.connection_failed(credential, ConnectionError::Cancelled, waited);
                        }
                        permit = semaphore.acquire_owned() => match permit {
                            Ok(permit) => Some(permit),
                            Err(_) => {
                                let error = ConnectionError::Aborted("concurrency limiter closed".to_string());
                                return runner.connection_failed(credential, error, waited);
                            }
                        },
                    }
                }
                None => None,
            };

            runner.run_all(credential, &commands).await
        })
    }
}
