use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Roster or command file could not be read. Fatal before any host is contacted.
    #[error("Failed to read {kind} file '{}': {source}", path.display())]
    Setup {
        kind: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Host key verification failed: {0}")]
    HostKey(String),

    #[error("SSH protocol error: {0}")]
    SshProtocol(#[from] russh::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, BatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_error_names_file() {
        let err = BatchError::Setup {
            kind: "roster",
            path: PathBuf::from("ssh_info.txt"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "No such file"),
        };

        let msg = err.to_string();
        assert!(msg.contains("roster"));
        assert!(msg.contains("ssh_info.txt"));
        assert!(msg.contains("No such file"));
    }
}
