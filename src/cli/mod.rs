pub mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{AppConfig, Overrides};
use crate::error::Result;

#[derive(Parser)]
#[command(name = "batssh")]
#[command(version)]
#[command(about = "Run a list of shell commands on many hosts over SSH")]
#[command(long_about = "Reads a roster of hosts (host----port----user----password per line) and a \
command file, then runs every command, in order, on every host concurrently.\n\n\
A failing command stops that host only; other hosts keep going.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to a YAML config file (default: ~/.config/batssh/config.yaml)
    #[arg(short, long, global = true, env = "BATSSH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the command file against every host in the roster
    Run {
        #[command(flatten)]
        inputs: InputArgs,

        /// Maximum number of hosts processed at once (default: unbounded)
        #[arg(short = 'j', long)]
        max_concurrency: Option<usize>,

        /// Give up connecting to a host after this long (e.g. 10s, 2m; 0 for never)
        #[arg(long)]
        connect_timeout: Option<String>,

        /// Give up on a single command after this long (e.g. 30s, 1h; 0 for never)
        #[arg(long)]
        command_timeout: Option<String>,

        /// Reject hosts whose key is missing from or changed in known_hosts
        #[arg(long)]
        verify_host_identity: bool,

        /// known_hosts file used with --verify-host-identity
        #[arg(long)]
        known_hosts: Option<String>,
    },

    /// Parse the roster and command file without contacting any host
    Check {
        #[command(flatten)]
        inputs: InputArgs,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct InputArgs {
    /// Roster file (host----port----username----password per line)
    #[arg(short, long, env = "BATSSH_ROSTER")]
    pub roster: Option<String>,

    /// Command file (one command per line)
    #[arg(short = 'f', long, env = "BATSSH_COMMANDS")]
    pub commands: Option<String>,

    /// Run blank lines in the command file as empty commands instead of skipping them
    #[arg(long)]
    pub keep_blank_commands: bool,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl InputArgs {
    fn into_overrides(self) -> Overrides {
        Overrides {
            roster: self.roster,
            commands: self.commands,
            keep_blank_commands: self.keep_blank_commands,
            ..Default::default()
        }
    }
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config_file = self.config;

        match self.command {
            Commands::Run {
                inputs,
                max_concurrency,
                connect_timeout,
                command_timeout,
                verify_host_identity,
                known_hosts,
            } => {
                let overrides = Overrides {
                    max_concurrency,
                    connect_timeout,
                    command_timeout,
                    verify_host_identity,
                    known_hosts,
                    ..inputs.into_overrides()
                };
                let config = AppConfig::load(config_file.as_deref())?.apply(overrides);
                config.validate()?;
                commands::run::execute(&config).await
            }
            Commands::Check { inputs } => {
                let config = AppConfig::load(config_file.as_deref())?.apply(inputs.into_overrides());
                commands::check::execute(&config).await
            }
            Commands::Config { command } => match command {
                ConfigCommands::Show => commands::config::show(config_file.as_deref()).await,
                ConfigCommands::Init { force } => commands::config::init(force).await,
            },
        }
    }
}
