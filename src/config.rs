use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::batch::{DispatchOptions, ExecLimits};
use crate::error::{BatchError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// Roster file: `host----port----username----password` per line.
    pub roster: String,
    /// Command file: one command per line.
    pub commands: String,
    /// Cap on hosts in flight at once. Unset means unbounded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<usize>,
    pub connect_timeout: String,
    /// `0` disables the per-command deadline.
    pub command_timeout: String,
    pub verify_host_identity: bool,
    pub known_hosts: String,
    pub keep_blank_commands: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            roster: "ssh_info.txt".to_string(),
            commands: "command.txt".to_string(),
            max_concurrency: None,
            connect_timeout: "30s".to_string(),
            command_timeout: "0".to_string(),
            verify_host_identity: false,
            known_hosts: "~/.ssh/known_hosts".to_string(),
            keep_blank_commands: false,
        }
    }
}

/// Values given on the command line; each one wins over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub roster: Option<String>,
    pub commands: Option<String>,
    pub max_concurrency: Option<usize>,
    pub connect_timeout: Option<String>,
    pub command_timeout: Option<String>,
    pub verify_host_identity: bool,
    pub known_hosts: Option<String>,
    pub keep_blank_commands: bool,
}

impl AppConfig {
    pub fn config_dir() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .map_err(|_| BatchError::Config("HOME environment variable not set".to_string()))?;
        Ok(PathBuf::from(home).join(".config").join("batssh"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.yaml"))
    }

    /// Load from an explicit path, or from the default location.
    ///
    /// A missing default file is not an error; an explicit path must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(BatchError::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                path.to_path_buf()
            }
            None => match Self::config_path() {
                Ok(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };

        let content = std::fs::read_to_string(&path)?;
        let config: AppConfig = serde_yaml::from_str(&content)
            .map_err(|e| BatchError::Config(format!("Invalid config {}: {}", path.display(), e)))?;

        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .map_err(|e| BatchError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(&path, perms)?;
        }

        Ok(())
    }

    pub fn apply(mut self, overrides: Overrides) -> Self {
        if let Some(roster) = overrides.roster {
            self.roster = roster;
        }
        if let Some(commands) = overrides.commands {
            self.commands = commands;
        }
        if let Some(limit) = overrides.max_concurrency {
            self.max_concurrency = Some(limit);
        }
        if let Some(timeout) = overrides.connect_timeout {
            self.connect_timeout = timeout;
        }
        if let Some(timeout) = overrides.command_timeout {
            self.command_timeout = timeout;
        }
        if overrides.verify_host_identity {
            self.verify_host_identity = true;
        }
        if let Some(known_hosts) = overrides.known_hosts {
            self.known_hosts = known_hosts;
        }
        if overrides.keep_blank_commands {
            self.keep_blank_commands = true;
        }
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == Some(0) {
            return Err(BatchError::Config(
                "max_concurrency must be at least 1 (leave it unset for no limit)".to_string(),
            ));
        }

        for (name, value) in [
            ("connect_timeout", &self.connect_timeout),
            ("command_timeout", &self.command_timeout),
        ] {
            if parse_duration(value).is_none() {
                return Err(BatchError::Config(format!(
                    "Invalid {} '{}'. Use format like '2h', '30m', '45s' or '0' for none",
                    name, value
                )));
            }
        }

        Ok(())
    }

    pub fn roster_path(&self) -> PathBuf {
        expand(&self.roster)
    }

    pub fn commands_path(&self) -> PathBuf {
        expand(&self.commands)
    }

    pub fn known_hosts_path(&self) -> PathBuf {
        expand(&self.known_hosts)
    }

    pub fn exec_limits(&self) -> ExecLimits {
        ExecLimits {
            connect_timeout: parse_deadline(&self.connect_timeout),
            command_timeout: parse_deadline(&self.command_timeout),
        }
    }

    pub fn dispatch_options(&self) -> DispatchOptions {
        DispatchOptions {
            max_concurrency: self.max_concurrency,
            limits: self.exec_limits(),
        }
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

/// A zero duration means no deadline.
fn parse_deadline(s: &str) -> Option<Duration> {
    parse_duration(s).filter(|d| !d.is_zero())
}

fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim().to_lowercase();

    if let Some(hours) = s.strip_suffix('h') {
        hours
            .parse::<u64>()
            .ok()
            .and_then(|h| h.checked_mul(3600))
            .map(Duration::from_secs)
    } else if let Some(minutes) = s.strip_suffix('m') {
        minutes
            .parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else if let Some(seconds) = s.strip_suffix('s') {
        seconds.parse::<u64>().ok().map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}
