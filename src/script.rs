//! Command file parsing: one command per line, no comment syntax.

use std::path::Path;
use std::sync::Arc;

use crate::error::{BatchError, Result};

/// Read a command file.
///
/// Blank lines are dropped unless `keep_blank` is set, in which case they are
/// run as literal (empty) commands.
pub fn load_commands(path: &Path, keep_blank: bool) -> Result<Arc<[String]>> {
    let content = std::fs::read_to_string(path).map_err(|source| BatchError::Setup {
        kind: "command",
        path: path.to_path_buf(),
        source,
    })?;

    let commands = parse_commands(&content, keep_blank);
    tracing::debug!(path = %path.display(), commands = commands.len(), "Loaded commands");
    Ok(commands.into())
}

pub fn parse_commands(content: &str, keep_blank: bool) -> Vec<String> {
    content
        .lines()
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| keep_blank || !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}
