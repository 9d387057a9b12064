use crate::roadmap::summary::{DayOutcome, RangeSummary};
use crate::roadmap::timeline::{format_clock, format_duration};
use crate::session::DayView;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize)]
pub struct WeekReport {
    pub owner: String,
    pub generated_at: String,
    pub summary: RangeSummary,
}

#[derive(Debug)]
pub struct SavedReport {
    pub markdown_path: PathBuf,
    pub json_path: PathBuf,
}

impl WeekReport {
    pub fn new(owner: &str, summary: RangeSummary) -> Self {
        let generated_at: DateTime<Utc> = Utc::now();
        Self {
            owner: owner.to_string(),
            generated_at: generated_at.to_rfc3339(),
            summary,
        }
    }
}

pub fn motivation(percentage: u8) -> &'static str {
    match percentage {
        100.. => "Incredible! You've completed all tasks today!",
        75..=99 => "Almost there! You're on fire!",
        50..=74 => "Great progress! Keep going strong!",
        25..=49 => "Nice momentum! Keep pushing forward!",
        _ => "Every journey begins with a single step. You've got this!",
    }
}

pub fn render_day(view: &DayView) -> String {
    let heading = if view.is_today {
        format!("Daily Roadmap - {} (today)", view.date)
    } else {
        format!("Daily Roadmap - {}", view.date)
    };

    let rows = if view.entries.is_empty() {
        "  No activities yet. Add one with `roadmap add <title>`.".to_string()
    } else {
        view.entries
            .iter()
            .map(|entry| {
                let mark = if entry.completed { "[x]" } else { "[ ]" };
                let id = format!("#{}", entry.activity.id);
                let mut row = format!(
                    "  {mark} {id:<5} {}  {} ({})",
                    entry.window.range_label(),
                    entry.activity.title,
                    format_duration(entry.activity.duration_minutes)
                );
                if !entry.activity.notes.is_empty() {
                    row.push_str(&format!("\n         {}", entry.activity.notes));
                }
                row
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "{heading}\n\n{rows}\n\nDay: {} - {} ({:.1}h planned)\nProgress: {}/{} ({}%)\n{}\n",
        format_clock(view.timeline.start_minutes),
        format_clock(view.timeline.day_end_minutes),
        view.timeline.total_hours(),
        view.summary.completed_count,
        view.summary.total_activities,
        view.summary.percentage,
        motivation(view.summary.percentage)
    )
}

pub fn render_week_text(summary: &RangeSummary) -> String {
    let rows = summary
        .days
        .iter()
        .map(|outcome| match outcome {
            DayOutcome::Loaded(day) => format!(
                "  {}  {:>3}%  {}/{}{}",
                day.date,
                day.percentage,
                day.completed_count,
                day.total_activities,
                if day.is_perfect() { "  perfect" } else { "" }
            ),
            DayOutcome::Unknown { .. } => format!("  {}     ?  unavailable", outcome.date()),
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{} - {}\n{rows}\n\nPerfect days: {}\nAverage: {}\n",
        summary.range.first,
        summary.range.last,
        summary.perfect_day_count,
        average_label(summary)
    )
}

pub fn render_markdown(report: &WeekReport) -> String {
    let summary = &report.summary;
    let day_rows = summary
        .days
        .iter()
        .map(|outcome| match outcome {
            DayOutcome::Loaded(day) => format!(
                "| {} | {}/{} | {}% | {} |",
                day.date,
                day.completed_count,
                day.total_activities,
                day.percentage,
                if day.is_perfect() { "yes" } else { "" }
            ),
            DayOutcome::Unknown { date, error } => {
                format!("| {date} | - | unknown | {error} |")
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "# Weekly Progress - {} to {}\n\n## Summary\n- Owner: {}\n- Perfect days: {}\n- Days loaded: {} of {}\n- Average completion: {}\n\n## Days\n| Date | Done | Completion | Perfect |\n|------|------|------------|---------|\n{}\n",
        summary.range.first,
        summary.range.last,
        report.owner,
        summary.perfect_day_count,
        summary.loaded_days,
        summary.days.len(),
        average_label(summary),
        day_rows
    )
}

pub fn save_report_files(report: &WeekReport, report_dir: &Path) -> Result<SavedReport> {
    fs::create_dir_all(report_dir).with_context(|| {
        format!(
            "Failed to create report directory: {}",
            report_dir.display()
        )
    })?;

    let stem = format!("week-{}", report.summary.range.last.format("%Y-%m-%d"));
    let markdown_path = report_dir.join(format!("{stem}.md"));
    let json_path = report_dir.join(format!("{stem}.json"));

    fs::write(&markdown_path, render_markdown(report)).with_context(|| {
        format!(
            "Failed to write Markdown report: {}",
            markdown_path.display()
        )
    })?;

    let json_content =
        serde_json::to_string_pretty(report).context("Failed to serialize report JSON")?;
    fs::write(&json_path, json_content)
        .with_context(|| format!("Failed to write JSON report: {}", json_path.display()))?;

    Ok(SavedReport {
        markdown_path,
        json_path,
    })
}

fn average_label(summary: &RangeSummary) -> String {
    summary
        .average_percentage
        .map(|value| format!("{value}%"))
        .unwrap_or_else(|| "n/a".to_string())
}
