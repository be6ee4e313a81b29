//! Live reporting of results as they complete.

use console::style;

use super::types::{CommandOutcome, CommandResult, ConnectionError, HostCredential, HostOutcome};
use crate::utils::format_duration;

/// Observer for a batch run. Called from many host tasks at once.
pub trait Reporter: Send + Sync {
    fn host_started(&self, _host: &HostCredential) {}

    fn command_finished(&self, result: &CommandResult);

    fn connection_failed(&self, host: &HostCredential, error: &ConnectionError);

    fn host_finished(&self, _outcome: &HostOutcome) {}
}

/// Prints each result to stdout as soon as it arrives.
///
/// Every block is rendered into one string and written with a single
/// `print!` so output from concurrent hosts does not interleave mid-block.
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn command_finished(&self, result: &CommandResult) {
        print!("{}", render_result(result));
    }

    fn connection_failed(&self, host: &HostCredential, error: &ConnectionError) {
        println!(
            "{} {} {}",
            style("✗").red().bold(),
            style(host).bold(),
            style(error).red()
        );
    }

    fn host_finished(&self, outcome: &HostOutcome) {
        if outcome.connection_failure.is_none() {
            print!("{}", render_host_footer(outcome));
        }
    }
}

pub fn render_result(result: &CommandResult) -> String {
    let header = format!(
        "{} {}",
        style(&result.host).bold(),
        style(format!("$ {}", result.command)).cyan()
    );

    match &result.outcome {
        CommandOutcome::Success(output) => {
            let text = String::from_utf8_lossy(output);
            let mut block = format!("{} {}\n", style("==>").green().bold(), header);
            block.push_str(&text);
            if !text.is_empty() && !text.ends_with('\n') {
                block.push('\n');
            }
            block
        }
        CommandOutcome::Failure(failure) => format!(
            "{} {} {}\n",
            style("✗").red().bold(),
            header,
            style(failure).red()
        ),
    }
}

fn render_host_footer(outcome: &HostOutcome) -> String {
    let elapsed = format_duration(outcome.elapsed.as_secs() as i64);
    match outcome.failed_command() {
        None => format!(
            "{}\n",
            style(format!("End of output for {} ({})", outcome.host, elapsed)).dim()
        ),
        Some(failed) => format!(
            "{} {}\n",
            style(format!("End of output for {} ({})", outcome.host, elapsed)).dim(),
            style(format!("stopped at '{}'", failed.command)).yellow()
        ),
    }
}

/// Counts for the closing summary line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub hosts: usize,
    pub succeeded: usize,
    pub unreachable: usize,
    pub command_failures: usize,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[HostOutcome]) -> Self {
        let mut summary = Self {
            hosts: outcomes.len(),
            ..Default::default()
        };
        for outcome in outcomes {
            if outcome.connection_failure.is_some() {
                summary.unreachable += 1;
            } else if outcome.is_success() {
                summary.succeeded += 1;
            } else {
                summary.command_failures += 1;
            }
        }
        summary
    }

    pub fn failed(&self) -> usize {
        self.unreachable + self.command_failures
    }
}
