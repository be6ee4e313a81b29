//! Single-command execution over one session channel.

use russh::client::{Handle, Msg};
use russh::{Channel, ChannelMsg};

use crate::batch::CommandFailure;
use crate::ssh::client::ClientHandler;

/// Run `command` on a fresh channel and return its stdout.
///
/// The channel is closed before returning, whatever the outcome.
pub async fn exec_command(
    session: &Handle<ClientHandler>,
    command: &str,
) -> Result<Vec<u8>, CommandFailure> {
    let mut channel = session
        .channel_open_session()
        .await
        .map_err(|e| CommandFailure::SessionOpen(e.to_string()))?;

    let result = drive(&mut channel, command).await;

    if let Err(e) = channel.close().await {
        tracing::debug!(command = %command, "Channel close after exec: {}", e);
    }

    result
}

async fn drive(channel: &mut Channel<Msg>, command: &str) -> Result<Vec<u8>, CommandFailure> {
    channel
        .exec(true, command)
        .await
        .map_err(|e| CommandFailure::Execution(e.to_string()))?;

    let mut capture = Capture::default();
    while !capture.is_done() {
        match channel.wait().await {
            Some(msg) => capture.absorb(msg),
            None => break,
        }
    }

    capture.finish()
}

/// Accumulates what the server sends back for one exec request.
#[derive(Debug, Default)]
pub struct Capture {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    exit_status: Option<u32>,
    signal: Option<String>,
    eof: bool,
    closed: bool,
}

impl Capture {
    fn absorb(&mut self, msg: ChannelMsg) {
        match msg {
            ChannelMsg::Data { data } => self.push_stdout(&data),
            // SSH_EXTENDED_DATA_STDERR
            ChannelMsg::ExtendedData { data, ext: 1 } => self.push_stderr(&data),
            ChannelMsg::ExitStatus { exit_status } => self.set_exit_status(exit_status),
            ChannelMsg::ExitSignal { signal_name, .. } => {
                self.set_signal(format!("{:?}", signal_name))
            }
            ChannelMsg::Eof => self.eof = true,
            ChannelMsg::Close => self.closed = true,
            _ => {}
        }
    }

    pub fn push_stdout(&mut self, data: &[u8]) {
        self.stdout.extend_from_slice(data);
    }

    pub fn push_stderr(&mut self, data: &[u8]) {
        self.stderr.extend_from_slice(data);
    }

    pub fn set_exit_status(&mut self, code: u32) {
        self.exit_status = Some(code);
    }

    pub fn set_signal(&mut self, name: impl Into<String>) {
        self.signal = Some(name.into());
    }

    /// Eof can arrive before the exit status, so both are required.
    fn is_done(&self) -> bool {
        self.closed || (self.eof && (self.exit_status.is_some() || self.signal.is_some()))
    }

    pub fn finish(self) -> Result<Vec<u8>, CommandFailure> {
        if let Some(signal) = self.signal {
            return Err(CommandFailure::Signal(signal));
        }

        match self.exit_status {
            Some(0) => Ok(self.stdout),
            Some(code) => Err(CommandFailure::ExitStatus {
                code,
                stderr: String::from_utf8_lossy(&self.stderr).into_owned(),
            }),
            None => Err(CommandFailure::Execution(
                "remote closed the channel without reporting an exit status".to_string(),
            )),
        }
    }
}
