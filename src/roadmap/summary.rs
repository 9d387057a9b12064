use crate::model::ActivityId;
use crate::store::{Gateway, ProgressMap, StoreResult, ValidationError};
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

pub const DEFAULT_SUMMARY_DAYS: u32 = 7;
pub const MAX_SUMMARY_DAYS: u32 = 366;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub first: NaiveDate,
    pub last: NaiveDate,
}

impl DateRange {
    /// `days` consecutive dates ending at `last`, between 1 and 366.
    pub fn ending(last: NaiveDate, days: u32) -> Result<Self, ValidationError> {
        if !(1..=MAX_SUMMARY_DAYS).contains(&days) {
            return Err(ValidationError::SummaryDaysOutOfRange(days));
        }
        let first = last
            .checked_sub_signed(Duration::days(i64::from(days) - 1))
            .ok_or(ValidationError::SummaryDaysOutOfRange(days))?;
        Ok(Self { first, last })
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        let last = self.last;
        self.first.iter_days().take_while(move |date| *date <= last)
    }

    pub fn len(&self) -> usize {
        ((self.last - self.first).num_days() + 1).max(0) as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub total_activities: usize,
    pub completed_count: usize,
    pub percentage: u8,
}

impl DailySummary {
    pub fn is_perfect(&self) -> bool {
        self.percentage == 100 && self.total_activities > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DayOutcome {
    Loaded(DailySummary),
    /// The load failed; this is not the same as an empty day.
    Unknown { date: NaiveDate, error: String },
}

impl DayOutcome {
    pub fn date(&self) -> NaiveDate {
        match self {
            DayOutcome::Loaded(summary) => summary.date,
            DayOutcome::Unknown { date, .. } => *date,
        }
    }

    pub fn summary(&self) -> Option<&DailySummary> {
        match self {
            DayOutcome::Loaded(summary) => Some(summary),
            DayOutcome::Unknown { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangeSummary {
    pub range: DateRange,
    pub days: Vec<DayOutcome>,
    pub perfect_day_count: usize,
    pub loaded_days: usize,
    pub unknown_days: usize,
    pub average_percentage: Option<u8>,
}

/// Rounds half up; only a fully completed day reaches 100.
pub fn percentage(completed: usize, total: usize) -> u8 {
    let total = total.max(1) as u64;
    let completed = (completed as u64).min(total);
    let rounded = ((200 * completed + total) / (2 * total)) as u8;
    if completed < total {
        rounded.min(99)
    } else {
        rounded
    }
}

pub fn summarize_day(
    date: NaiveDate,
    current: &HashSet<ActivityId>,
    map: &ProgressMap,
) -> DailySummary {
    let completed_count = map
        .iter()
        .filter(|(id, completed)| **completed && current.contains(id))
        .count();
    let total_activities = current.len();

    DailySummary {
        date,
        total_activities,
        completed_count,
        percentage: percentage(completed_count, total_activities),
    }
}

pub fn summarize_loaded(
    range: DateRange,
    current_ids: &[ActivityId],
    mut loaded: BTreeMap<NaiveDate, StoreResult<ProgressMap>>,
) -> RangeSummary {
    let current = current_ids.iter().copied().collect::<HashSet<_>>();

    let days = range
        .dates()
        .map(|date| match loaded.remove(&date) {
            Some(Ok(map)) => DayOutcome::Loaded(summarize_day(date, &current, &map)),
            Some(Err(error)) => DayOutcome::Unknown {
                date,
                error: error.to_string(),
            },
            None => DayOutcome::Unknown {
                date,
                error: "completion load did not finish".to_string(),
            },
        })
        .collect::<Vec<_>>();

    let summaries = days.iter().filter_map(DayOutcome::summary).collect::<Vec<_>>();
    let perfect_day_count = summaries.iter().filter(|summary| summary.is_perfect()).count();
    let loaded_days = summaries.len();
    let average_percentage = (loaded_days > 0).then(|| {
        let sum = summaries
            .iter()
            .map(|summary| u64::from(summary.percentage))
            .sum::<u64>();
        let count = loaded_days as u64;
        ((2 * sum + count) / (2 * count)) as u8
    });

    RangeSummary {
        range,
        perfect_day_count,
        loaded_days,
        unknown_days: days.len() - loaded_days,
        average_percentage,
        days,
    }
}

pub async fn summarize_range(
    gateway: Arc<dyn Gateway>,
    owner: &str,
    range: DateRange,
    current_ids: &[ActivityId],
) -> RangeSummary {
    let mut loads = JoinSet::new();
    for date in range.dates() {
        let gateway = Arc::clone(&gateway);
        let owner = owner.to_string();
        loads.spawn_blocking(move || (date, gateway.load_completion(&owner, date)));
    }

    let mut loaded = BTreeMap::new();
    while let Some(joined) = loads.join_next().await {
        match joined {
            Ok((date, result)) => {
                if let Err(error) = &result {
                    warn!(date = %date, error = %error, "completion load failed");
                }
                loaded.insert(date, result);
            }
            Err(join_error) => {
                error!(error = %join_error, "completion load task aborted");
            }
        }
    }

    let summary = summarize_loaded(range, current_ids, loaded);
    info!(
        first = %range.first,
        last = %range.last,
        days = range.len(),
        perfect = summary.perfect_day_count,
        unknown = summary.unknown_days,
        "range summary built"
    );
    summary
}
