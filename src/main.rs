mod api;
mod cli;
mod config;
mod db;
mod model;
mod report;
mod roadmap;
mod session;
mod store;

use crate::cli::onboard::run_init;
use crate::cli::{Cli, Commands, ConfigCommands, StartCommands, parse_duration_change};
use crate::config::{Config, expand_home};
use crate::db::SqliteGateway;
use crate::model::{ActivityId, DEFAULT_DURATION_MINUTES};
use crate::report::{WeekReport, render_day, render_week_text, save_report_files};
use crate::roadmap::timeline::{START_STEP_MINUTES, format_clock, format_duration, parse_clock};
use crate::session::actor::SessionHandle;
use crate::session::{ActivityEdit, Session, StartChange};
use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use clap::Parser;
use dialoguer::{Confirm, theme::ColorfulTheme};
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { yes } => run_init(yes),
        Commands::Config { command } => handle_config_command(command),
        Commands::Show { date } => handle_show(date),
        Commands::Add {
            title,
            duration,
            notes,
        } => handle_add(&title, duration, &notes),
        Commands::Rename { id, title } => handle_edit(id, ActivityEdit::Rename(title)),
        Commands::Duration { id, delta } => {
            let edit = parse_duration_change(&delta)
                .with_context(|| format!("Invalid duration change: {delta}. Example: +15"))?;
            handle_edit(id, edit)
        }
        Commands::Notes { id, text } => handle_edit(id, ActivityEdit::Notes(text)),
        Commands::Delete { id, yes } => handle_delete(id, yes),
        Commands::Move { from, to } => handle_move(from, to),
        Commands::Reorder { ids } => handle_reorder(ids),
        Commands::Toggle { id, date } => handle_toggle(id, date),
        Commands::Start { command } => handle_start_command(command),
        Commands::Week { days, out } => handle_week(days, out).await,
        Commands::Dates => handle_dates(),
        Commands::Serve => {
            let config = load_config()?;
            run_service(config).await
        }
    }
}

fn handle_config_command(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Set { key, value } => {
            let mut config = load_or_default_config()?;
            config.set_value(&key, &value)?;
            config.ensure_bootstrap_files()?;
            config.save()?;

            println!("Config saved: {key} = {value}");
            Ok(())
        }
        ConfigCommands::Get { key } => {
            let config = load_config()?;
            let value = config
                .get_value(&key)
                .with_context(|| format!("Unsupported config key: {key}"))?;

            println!("{value}");
            Ok(())
        }
    }
}

fn handle_show(date: Option<String>) -> Result<()> {
    let config = load_config()?;
    let mut session = open_session(&config)?;
    session.select_date(parse_optional_date(date)?)?;

    print!("{}", render_day(&session.day_view()));
    Ok(())
}

fn handle_add(title: &str, duration: Option<u32>, notes: &str) -> Result<()> {
    let config = load_config()?;
    let mut session = open_session(&config)?;
    let activity = session.add_activity(
        title,
        duration.unwrap_or(DEFAULT_DURATION_MINUTES),
        notes,
    )?;

    let window = session
        .timeline()
        .window_for(activity.id)
        .map(|window| window.range_label())
        .unwrap_or_default();
    println!(
        "Added #{} {} ({}) {window}",
        activity.id,
        activity.title,
        format_duration(activity.duration_minutes)
    );
    Ok(())
}

fn handle_edit(id: i64, edit: ActivityEdit) -> Result<()> {
    let config = load_config()?;
    let mut session = open_session(&config)?;
    let id = ActivityId(id);

    let activity = session
        .edit_activity(id, edit)?
        .with_context(|| format!("No activity with id {id}"))?;

    println!(
        "Saved #{} {} ({})",
        activity.id,
        activity.title,
        format_duration(activity.duration_minutes)
    );
    Ok(())
}

fn handle_delete(id: i64, yes: bool) -> Result<()> {
    let config = load_config()?;
    let mut session = open_session(&config)?;
    let id = ActivityId(id);

    let title = session
        .activities()
        .get(id)
        .map(|activity| activity.title.clone())
        .with_context(|| format!("No activity with id {id}"))?;

    let confirmed = yes
        || Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Delete \"{title}\"? Its history stays on record."))
            .default(false)
            .interact()
            .context("Failed to read delete confirmation")?;

    if !confirmed {
        println!("Kept \"{title}\"");
        return Ok(());
    }

    session.delete_activity(id)?;
    println!("Deleted \"{title}\"");
    Ok(())
}

fn handle_move(from: usize, to: usize) -> Result<()> {
    if from == 0 || to == 0 {
        bail!("Positions start at 1");
    }

    let config = load_config()?;
    let mut session = open_session(&config)?;
    if session.move_activity(from - 1, to - 1)? {
        print_order(&session);
    } else {
        println!("Order unchanged");
    }
    Ok(())
}

fn handle_reorder(ids: Vec<i64>) -> Result<()> {
    let config = load_config()?;
    let mut session = open_session(&config)?;
    let order = ids.into_iter().map(ActivityId).collect::<Vec<_>>();

    session.reorder(&order)?;
    print_order(&session);
    Ok(())
}

fn handle_toggle(id: i64, date: Option<String>) -> Result<()> {
    let config = load_config()?;
    let mut session = open_session(&config)?;
    let id = ActivityId(id);
    session.select_date(parse_optional_date(date)?)?;

    let completed = session
        .toggle(id)?
        .with_context(|| format!("No activity with id {id}"))?;
    let view = session.day_view();

    println!(
        "#{id} {} on {} ({}/{} done, {}%)",
        if completed { "completed" } else { "reopened" },
        view.date,
        view.summary.completed_count,
        view.summary.total_activities,
        view.summary.percentage
    );
    Ok(())
}

fn handle_start_command(command: StartCommands) -> Result<()> {
    let (change, date) = match command {
        StartCommands::Adjust { delta, date } => (StartChange::Adjust(delta), date),
        StartCommands::Earlier { date } => (StartChange::Adjust(-START_STEP_MINUTES), date),
        StartCommands::Later { date } => (StartChange::Adjust(START_STEP_MINUTES), date),
        StartCommands::Reset { date } => (StartChange::Reset, date),
        StartCommands::Set { time, date } => {
            let minutes = parse_clock(&time)
                .with_context(|| format!("Invalid time format: {time}. Example: 06:00"))?;
            (StartChange::Set(minutes), date)
        }
    };

    let config = load_config()?;
    let mut session = open_session(&config)?;
    session.select_date(parse_optional_date(date)?)?;
    let before = session.start_minutes();
    let start = session.change_start(change)?;
    let timeline = session.timeline();

    println!(
        "Day start {} -> {}, ends at {}",
        format_clock(before),
        format_clock(start),
        format_clock(timeline.day_end_minutes)
    );
    Ok(())
}

async fn handle_week(days: Option<u32>, out: Option<String>) -> Result<()> {
    let config = load_config()?;
    let session = open_session(&config)?;
    let summary = session
        .summary_request(days.unwrap_or(config.summary_days))?
        .run()
        .await;

    print!("{}", render_week_text(&summary));

    if let Some(dir) = out {
        let report = WeekReport::new(session.owner(), summary);
        let saved = save_report_files(&report, &expand_home(&dir))?;
        println!("- Markdown: {}", saved.markdown_path.display());
        println!("- JSON: {}", saved.json_path.display());
    }
    Ok(())
}

fn handle_dates() -> Result<()> {
    let config = load_config()?;
    let session = open_session(&config)?;

    for date in session.history_dates() {
        println!("{date}");
    }
    Ok(())
}

async fn run_service(config: Config) -> Result<()> {
    config.ensure_bootstrap_files()?;
    let handle = SessionHandle::spawn(open_session(&config)?);

    info!(owner = %config.owner, "roadmap service started");

    tokio::select! {
        api_result = api::run_server(&config, handle) => {
            api_result?;
        }
        _ = signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    Ok(())
}

fn open_session(config: &Config) -> Result<Session> {
    let gateway = Arc::new(SqliteGateway::new(config.db_path.clone()));

    Session::open_with_start(
        gateway,
        &config.owner,
        Local::now().date_naive(),
        config.default_start_minutes,
    )
    .with_context(|| format!("Failed to load roadmap for {}", config.owner))
}

fn print_order(session: &Session) {
    let timeline = session.timeline();
    for (position, (activity, window)) in session
        .activities()
        .items()
        .iter()
        .zip(&timeline.windows)
        .enumerate()
    {
        println!(
            "{}. #{} {}  {}",
            position + 1,
            activity.id,
            window.range_label(),
            activity.title
        );
    }
}

fn parse_optional_date(input: Option<String>) -> Result<NaiveDate> {
    input
        .as_deref()
        .map(|date| {
            NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .with_context(|| format!("Invalid date format: {date}. Example: 2026-02-18"))
        })
        .transpose()?
        .map_or_else(|| Ok(Local::now().date_naive()), Ok)
}

fn load_or_default_config() -> Result<Config> {
    Config::load().or_else(|_| {
        let config = Config::default();
        config.ensure_bootstrap_files()?;
        config.save()?;
        Ok(config)
    })
}

fn load_config() -> Result<Config> {
    Config::load().with_context(|| "Config file not found. Run `roadmap init` first.".to_string())
}
