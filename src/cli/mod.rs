pub mod onboard;

use crate::model::DURATION_STEP_MINUTES;
use crate::session::ActivityEdit;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "roadmap",
    about = "Daily activity timeline and progress tracker"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Write the config file, create the database and seed default activities
    Init {
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Print the timeline and progress for a day
    Show {
        #[arg(long)]
        date: Option<String>,
    },
    Add {
        title: String,
        #[arg(long)]
        duration: Option<u32>,
        #[arg(long, default_value = "")]
        notes: String,
    },
    Rename {
        id: i64,
        title: String,
    },
    /// Change a duration: `+15`, `-30`, `+` for one step, or `45` to set it
    Duration {
        id: i64,
        #[arg(allow_hyphen_values = true)]
        delta: String,
    },
    Notes {
        id: i64,
        text: String,
    },
    Delete {
        id: i64,
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
    /// Move the activity at position `from` to position `to` (1-based)
    Move {
        from: usize,
        to: usize,
    },
    /// Set the full order by listing every activity id
    Reorder {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    Toggle {
        id: i64,
        #[arg(long)]
        date: Option<String>,
    },
    Start {
        #[command(subcommand)]
        command: StartCommands,
    },
    Week {
        #[arg(long)]
        days: Option<u32>,
        #[arg(long)]
        out: Option<String>,
    },
    /// List dates with recorded progress, newest first
    Dates,
    Serve,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    Set { key: String, value: String },
    Get { key: String },
}

#[derive(Debug, Subcommand)]
pub enum StartCommands {
    Adjust {
        #[arg(allow_hyphen_values = true)]
        delta: i32,
        #[arg(long)]
        date: Option<String>,
    },
    /// One step earlier
    Earlier {
        #[arg(long)]
        date: Option<String>,
    },
    /// One step later
    Later {
        #[arg(long)]
        date: Option<String>,
    },
    Reset {
        #[arg(long)]
        date: Option<String>,
    },
    Set {
        time: String,
        #[arg(long)]
        date: Option<String>,
    },
}

/// `+15` or `-15` adjusts by that much, a lone sign by one step, and a
/// bare number sets the duration outright.
pub fn parse_duration_change(raw: &str) -> Option<ActivityEdit> {
    let trimmed = raw.trim();
    match trimmed {
        "+" => Some(ActivityEdit::AdjustDuration(DURATION_STEP_MINUTES)),
        "-" => Some(ActivityEdit::AdjustDuration(-DURATION_STEP_MINUTES)),
        _ if trimmed.starts_with(['+', '-']) => trimmed
            .trim_start_matches('+')
            .parse::<i32>()
            .ok()
            .map(ActivityEdit::AdjustDuration),
        _ => trimmed.parse::<u32>().ok().map(ActivityEdit::SetDuration),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_changes_parse() {
        assert_eq!(
            parse_duration_change("+15"),
            Some(ActivityEdit::AdjustDuration(15))
        );
        assert_eq!(
            parse_duration_change("-30"),
            Some(ActivityEdit::AdjustDuration(-30))
        );
        assert_eq!(
            parse_duration_change("-"),
            Some(ActivityEdit::AdjustDuration(-15))
        );
        assert_eq!(
            parse_duration_change(" 45 "),
            Some(ActivityEdit::SetDuration(45))
        );
        assert_eq!(parse_duration_change("fifteen"), None);
        assert_eq!(parse_duration_change("+x"), None);
    }

    #[test]
    fn negative_duration_is_not_a_flag() {
        let cli = Cli::try_parse_from(["roadmap", "duration", "3", "-15"]).expect("parse");
        match cli.command {
            Commands::Duration { id, delta } => {
                assert_eq!(id, 3);
                assert_eq!(delta, "-15");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn reorder_requires_ids() {
        assert!(Cli::try_parse_from(["roadmap", "reorder"]).is_err());
        assert!(Cli::try_parse_from(["roadmap", "start", "adjust", "-30"]).is_ok());
    }
}
