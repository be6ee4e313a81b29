//! SSH client implementation using russh.
//!
//! Provides password-authenticated connections for batch runs.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use russh::client::{self, Handle};
use russh::Disconnect;

use crate::batch::{CommandFailure, ConnectionError, Connector, HostConnection, HostCredential};
use crate::error::BatchError;
use crate::ssh::config::{HostKeyPolicy, SshConfig};

/// Opens one russh connection per host.
pub struct SshConnector {
    config: SshConfig,
    russh_config: Arc<client::Config>,
}

impl SshConnector {
    pub fn new(config: SshConfig) -> Self {
        let russh_config = Arc::new(client::Config {
            // Commands may legitimately stay silent for a long time
            inactivity_timeout: None,
            keepalive_interval: config.keepalive_interval,
            keepalive_max: 4,
            ..Default::default()
        });

        Self {
            config,
            russh_config,
        }
    }

    fn handler_for(&self, host: &str, port: u16) -> ClientHandler {
        ClientHandler {
            host: host.to_string(),
            port,
            host_key_policy: self.config.host_key_policy,
            known_hosts: self.config.known_hosts.clone(),
        }
    }
}

#[async_trait]
impl Connector for SshConnector {
    type Connection = SshConnection;

    async fn connect(&self, credential: &HostCredential) -> Result<SshConnection, ConnectionError> {
        let addr = credential.to_string();
        let (host, port) = credential.dial_target()?;
        let handler = self.handler_for(host, port);

        let mut handle = client::connect(self.russh_config.clone(), (host, port), handler)
        .await
        .map_err(|e| classify_connect_error(&addr, e))?;

        tracing::debug!(host = %addr, "Handshake complete, authenticating");

        let auth = handle
            .authenticate_password(credential.username.as_str(), credential.password())
            .await;

        let rejection = match auth {
            Ok(true) => None,
            Ok(false) => Some("server rejected the password".to_string()),
            Err(e) => Some(e.to_string()),
        };

        if let Some(reason) = rejection {
            disconnect(&handle, &addr).await;
            return Err(ConnectionError::Authentication {
                user: credential.username.clone(),
                addr,
                reason,
            });
        }

        tracing::debug!(host = %addr, "Authenticated");
        Ok(SshConnection { handle, addr })
    }
}

fn classify_connect_error(addr: &str, error: BatchError) -> ConnectionError {
    match error {
        BatchError::HostKey(reason) => ConnectionError::HostKeyRejected {
            addr: addr.to_string(),
            reason,
        },
        BatchError::SshProtocol(russh::Error::UnknownKey) => ConnectionError::HostKeyRejected {
            addr: addr.to_string(),
            reason: "server key not accepted".to_string(),
        },
        other => ConnectionError::Dial {
            addr: addr.to_string(),
            reason: other.to_string(),
        },
    }
}

async fn disconnect(handle: &Handle<ClientHandler>, addr: &str) {
    if let Err(e) = handle
        .disconnect(Disconnect::ByApplication, "", "English")
        .await
    {
        tracing::debug!(host = %addr, "Disconnect failed: {}", e);
    }
}

/// An authenticated connection to one host.
pub struct SshConnection {
    handle: Handle<ClientHandler>,
    addr: String,
}

#[async_trait]
impl HostConnection for SshConnection {
    async fn exec(&self, command: &str) -> Result<Vec<u8>, CommandFailure> {
        crate::ssh::session::exec_command(&self.handle, command).await
    }

    async fn close(self) {
        disconnect(&self.handle, &self.addr).await;
    }
}

/// Client handler for russh connection callbacks.
pub struct ClientHandler {
    host: String,
    port: u16,
    host_key_policy: HostKeyPolicy,
    known_hosts: PathBuf,
}

#[async_trait]
impl client::Handler for ClientHandler {
    type Error = BatchError;

    async fn check_server_key(
        &mut self,
        server_public_key: &russh_keys::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        match self.host_key_policy {
            HostKeyPolicy::AcceptAny => Ok(true),
            HostKeyPolicy::KnownHosts => {
                match russh_keys::check_known_hosts_path(
                    &self.host,
                    self.port,
                    server_public_key,
                    &self.known_hosts,
                ) {
                    Ok(true) => Ok(true),
                    Ok(false) => Err(BatchError::HostKey(format!(
                        "{}:{} is not listed in {}",
                        self.host,
                        self.port,
                        self.known_hosts.display()
                    ))),
                    Err(e) => Err(BatchError::HostKey(e.to_string())),
                }
            }
        }
    }
}
