//! Roster file parsing.
//!
//! One host per line: `host----port----username----password`. A line is
//! malformed only when it does not split into exactly four fields; it is
//! reported and skipped, never aborting the read. Field contents are not
//! validated here: a bad port or empty host fails that host when dialing.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::batch::HostCredential;
use crate::error::{BatchError, Result};

pub const FIELD_DELIMITER: &str = "----";

/// Why a roster line was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedReason {
    FieldCount(usize),
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FieldCount(n) => write!(
                f,
                "expected 4 fields separated by '{}', found {}",
                FIELD_DELIMITER, n
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedLine {
    /// 1-based line number in the roster file.
    pub line: usize,
    pub content: String,
    pub reason: MalformedReason,
}

#[derive(Debug, Default)]
pub struct Roster {
    pub credentials: Vec<HostCredential>,
    pub malformed: Vec<MalformedLine>,
}

impl Roster {
    /// Move the credentials behind `Arc` so host tasks can share them.
    pub fn into_shared(self) -> Vec<Arc<HostCredential>> {
        self.credentials.into_iter().map(Arc::new).collect()
    }
}

/// Read and parse a roster file.
pub fn load_roster(path: &Path) -> Result<Roster> {
    let content = std::fs::read_to_string(path).map_err(|source| BatchError::Setup {
        kind: "roster",
        path: path.to_path_buf(),
        source,
    })?;

    let roster = parse_roster(&content);
    tracing::debug!(
        path = %path.display(),
        hosts = roster.credentials.len(),
        malformed = roster.malformed.len(),
        "Loaded roster"
    );
    Ok(roster)
}

pub fn parse_roster(content: &str) -> Roster {
    let mut roster = Roster::default();

    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        match parse_line(line) {
            Ok(credential) => roster.credentials.push(credential),
            Err(reason) => {
                tracing::warn!(line = index + 1, "Invalid roster line: {} ({})", line, reason);
                roster.malformed.push(MalformedLine {
                    line: index + 1,
                    content: line.to_string(),
                    reason,
                });
            }
        }
    }

    roster
}

fn parse_line(line: &str) -> std::result::Result<HostCredential, MalformedReason> {
    let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();
    let [host, port, username, password] = fields[..] else {
        return Err(MalformedReason::FieldCount(fields.len()));
    };

    Ok(HostCredential::new(
        host.trim(),
        port.trim(),
        username.trim(),
        password,
    ))
}
