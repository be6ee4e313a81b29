//! SSH connection configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::config::AppConfig;

/// Settings shared by every connection in a batch.
#[derive(Debug, Clone)]
pub struct SshConfig {
    /// Host key verification policy.
    pub host_key_policy: HostKeyPolicy,

    /// known_hosts file consulted by [`HostKeyPolicy::KnownHosts`].
    pub known_hosts: PathBuf,

    /// Keep-alive interval for long-running commands.
    pub keepalive_interval: Option<Duration>,
}

/// Host key verification policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostKeyPolicy {
    /// Accept any host key (insecure, matches OpenSSH StrictHostKeyChecking=no).
    #[default]
    AcceptAny,

    /// Require the key to be present and unchanged in the known_hosts file.
    KnownHosts,
}

impl HostKeyPolicy {
    pub fn from_verify_flag(verify_host_identity: bool) -> Self {
        if verify_host_identity {
            Self::KnownHosts
        } else {
            Self::AcceptAny
        }
    }
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            host_key_policy: HostKeyPolicy::AcceptAny,
            known_hosts: PathBuf::from(shellexpand::tilde("~/.ssh/known_hosts").as_ref()),
            keepalive_interval: Some(Duration::from_secs(15)),
        }
    }
}

impl From<&AppConfig> for SshConfig {
    fn from(app_config: &AppConfig) -> Self {
        Self {
            host_key_policy: HostKeyPolicy::from_verify_flag(app_config.verify_host_identity),
            known_hosts: app_config.known_hosts_path(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_accepts_any_host_key() {
        let config = SshConfig::default();
        assert_eq!(config.host_key_policy, HostKeyPolicy::AcceptAny);
        assert!(config.known_hosts.ends_with(".ssh/known_hosts"));
    }

    #[test]
    fn test_from_app_config_honours_verify_flag() {
        let app = AppConfig {
            verify_host_identity: true,
            known_hosts: "/etc/ssh/ssh_known_hosts".to_string(),
            ..Default::default()
        };
        let config = SshConfig::from(&app);
        assert_eq!(config.host_key_policy, HostKeyPolicy::KnownHosts);
        assert_eq!(config.known_hosts, PathBuf::from("/etc/ssh/ssh_known_hosts"));

        let config = SshConfig::from(&AppConfig::default());
        assert_eq!(config.host_key_policy, HostKeyPolicy::AcceptAny);
    }
}
