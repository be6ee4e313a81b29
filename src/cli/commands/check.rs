//! Check command
//!
//! Show what a run would target without opening any connection.

use std::collections::HashSet;

use console::style;

use crate::config::AppConfig;
use crate::error::Result;
use crate::roster::load_roster;
use crate::script::load_commands;
use crate::utils::truncate;

pub async fn execute(config: &AppConfig) -> Result<()> {
    let commands = load_commands(&config.commands_path(), config.keep_blank_commands)?;
    let roster = load_roster(&config.roster_path())?;

    println!(
        "{} {}",
        style("Hosts").bold().cyan(),
        style(format!("({})", roster.credentials.len())).dim()
    );
    let mut seen = HashSet::new();
    for credential in &roster.credentials {
        // Duplicates are legal and run once per entry
        let note = if seen.insert(credential.id()) {
            style("").dim()
        } else {
            style(" (duplicate)").yellow()
        };
        println!("  {}@{}{}", credential.username, credential, note);
    }

    if !roster.malformed.is_empty() {
        println!();
        println!(
            "{} {}",
            style("Skipped lines").bold().yellow(),
            style(format!("({})", roster.malformed.len())).dim()
        );
        for bad in &roster.malformed {
            println!(
                "  {:>4}: {}  {}",
                bad.line,
                truncate(&bad.content, 60),
                style(&bad.reason).dim()
            );
        }
    }

    println!();
    println!(
        "{} {}",
        style("Commands").bold().cyan(),
        style(format!("({})", commands.len())).dim()
    );
    for (index, command) in commands.iter().enumerate() {
        println!("  {:>3}. {}", index + 1, command);
    }

    Ok(())
}
