use crate::config::{Config, expand_home};
use crate::db::SqliteGateway;
use crate::roadmap::timeline::{LATEST_START_MINUTES, format_clock, parse_clock};
use crate::session::Session;
use anyhow::{Context, Result};
use chrono::Local;
use dialoguer::{Confirm, Input, theme::ColorfulTheme};
use std::sync::Arc;

pub fn run_init(accept_defaults: bool) -> Result<()> {
    let existing = Config::load().unwrap_or_default();

    let config = if accept_defaults {
        existing
    } else {
        prompt_config(existing)?
    };

    config.ensure_bootstrap_files()?;
    config.save()?;

    let gateway = Arc::new(SqliteGateway::new(config.db_path.clone()));
    let mut session = Session::open_with_start(
        gateway,
        &config.owner,
        Local::now().date_naive(),
        config.default_start_minutes,
    )?;

    let seed = accept_defaults
        || (session.activities().is_empty()
            && Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt("  Add the default activities?")
                .default(true)
                .interact()
                .context("Failed to read seed confirmation")?);

    let added = if seed { session.seed_defaults()? } else { 0 };

    println!("\nRoadmap ready for {}", config.owner);
    println!("- config: {}", Config::config_path()?.display());
    println!("- database: {}", config.db_path.display());
    if added > 0 {
        println!("- added {added} default activities");
    }
    println!("Run `roadmap show` to see today's timeline.");

    Ok(())
}

fn prompt_config(existing: Config) -> Result<Config> {
    let theme = ColorfulTheme::default();

    println!("[1/3] Who is this roadmap for?");
    let owner: String = Input::with_theme(&theme)
        .with_prompt("  Name")
        .default(existing.owner.clone())
        .validate_with(|input: &String| -> std::result::Result<(), &str> {
            if input.trim().is_empty() {
                Err("Name must not be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()
        .context("Failed to read owner")?;

    println!("\n[2/3] When does your day usually start?");
    let start: String = Input::with_theme(&theme)
        .with_prompt("  Start time")
        .default(format_clock(existing.default_start_minutes))
        .validate_with(|input: &String| -> std::result::Result<(), &str> {
            match parse_clock(input) {
                Some(minutes) if minutes <= LATEST_START_MINUTES => Ok(()),
                Some(_) => Err("Start time must not be later than 23:00"),
                None => Err("Use HH:MM format (example: 06:00)"),
            }
        })
        .interact_text()
        .context("Failed to read start time")?;

    println!("\n[3/3] Where should weekly reports be saved?");
    let report_dir: String = Input::with_theme(&theme)
        .with_prompt("  Report folder")
        .default(existing.report_dir.display().to_string())
        .interact_text()
        .context("Failed to read report directory")?;

    Ok(Config {
        owner: owner.trim().to_string(),
        default_start_minutes: parse_clock(&start).unwrap_or(existing.default_start_minutes),
        report_dir: expand_home(&report_dir),
        ..existing
    })
}
