use std::path::Path;

use console::style;

use crate::config::AppConfig;
use crate::error::Result;

pub async fn show(explicit: Option<&Path>) -> Result<()> {
    let config = AppConfig::load(explicit)?;

    let source = match explicit {
        Some(path) => path.display().to_string(),
        None => match AppConfig::config_path() {
            Ok(path) if path.exists() => path.display().to_string(),
            _ => "(defaults)".to_string(),
        },
    };

    println!("{}", style("Current Configuration").bold().cyan());
    println!();
    print!("{}", serde_yaml::to_string(&config)?);
    println!();
    println!("Config file: {}", style(source).dim());

    Ok(())
}

pub async fn init(force: bool) -> Result<()> {
    let path = AppConfig::config_path()?;

    if path.exists() && !force {
        println!(
            "Config already exists at {}. Use {} to overwrite.",
            style(path.display()).dim(),
            style("--force").cyan()
        );
        return Ok(());
    }

    AppConfig::default().save()?;
    println!(
        "{} {}",
        style("Wrote default configuration to").green(),
        path.display()
    );

    Ok(())
}
