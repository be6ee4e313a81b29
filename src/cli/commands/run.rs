//! Run command
//!
//! Load the roster and command file, then fan the batch out over SSH.

use std::sync::Arc;
use std::time::Instant;

use console::style;
use tokio_util::sync::CancellationToken;

use crate::batch::report::BatchSummary;
use crate::batch::{BatchDispatcher, ConsoleReporter};
use crate::config::AppConfig;
use crate::error::Result;
use crate::roster::load_roster;
use crate::script::load_commands;
use crate::ssh::{SshConfig, SshConnector};
use crate::utils::format_duration;

pub async fn execute(config: &AppConfig) -> Result<()> {
    // Both files are read before any host is contacted
    let commands = load_commands(&config.commands_path(), config.keep_blank_commands)?;
    let roster = load_roster(&config.roster_path())?;

    for bad in &roster.malformed {
        println!(
            "{} {}",
            style(format!("Invalid line {} in roster:", bad.line)).yellow(),
            bad.content
        );
    }

    if roster.credentials.is_empty() {
        println!("{}", style("No valid hosts in roster, nothing to do.").dim());
        return Ok(());
    }
    if commands.is_empty() {
        // Hosts are still dialed, which doubles as a connectivity check
        println!(
            "{}",
            style("Command file is empty, only connecting to each host.").dim()
        );
    }

    let ssh_config = SshConfig::from(config);
    if ssh_config.host_key_policy == crate::ssh::HostKeyPolicy::AcceptAny {
        tracing::debug!("Host keys are not verified (verify_host_identity = false)");
    }

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let dispatcher = BatchDispatcher::new(
        Arc::new(SshConnector::new(ssh_config)),
        config.dispatch_options(),
        cancel,
        Arc::new(ConsoleReporter),
    );

    let started = Instant::now();
    let outcomes = dispatcher.dispatch(roster.into_shared(), commands).await;
    let summary = BatchSummary::from_outcomes(&outcomes);

    println!();
    println!(
        "{} {} hosts: {} succeeded, {} failed ({} unreachable) in {}",
        style("Done.").bold(),
        summary.hosts,
        style(summary.succeeded).green(),
        if summary.failed() > 0 {
            style(summary.failed()).red()
        } else {
            style(summary.failed()).dim()
        },
        summary.unreachable,
        format_duration(started.elapsed().as_secs() as i64)
    );

    Ok(())
}

/// First Ctrl-C cancels in-flight hosts; the batch still reports what it has.
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!(
                "{}",
                style("Interrupted, cancelling remaining hosts...").yellow()
            );
            cancel.cancel();
        }
    });
}
