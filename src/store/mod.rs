#[cfg(test)]
pub mod memory;

use crate::model::{Activity, ActivityId, ActivityPatch, NewActivity};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

pub type ProgressMap = BTreeMap<ActivityId, bool>;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Transient(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("activity {0} not found")]
    NotFound(ActivityId),
}

impl StoreError {
    pub fn transient(error: impl std::fmt::Display) -> Self {
        Self::Transient(error.to_string())
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::transient(value)
    }
}

impl From<anyhow::Error> for StoreError {
    fn from(value: anyhow::Error) -> Self {
        Self::Transient(format!("{value:#}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("title must not be empty")]
    EmptyTitle,

    #[error("title is {0} characters, the limit is 100")]
    TitleTooLong(usize),

    #[error("notes are {0} characters, the limit is 500")]
    NotesTooLong(usize),

    #[error("duration {0}m is below the 15 minute floor")]
    DurationBelowFloor(u32),

    #[error("duration {0}m is longer than a day")]
    DurationAboveCeiling(u32),

    #[error("start time {0} is outside 0..=1439 minutes")]
    StartOutOfRange(i64),

    #[error("reorder must list every current activity exactly once")]
    NotAPermutation,

    #[error("position {0} is outside the activity list")]
    PositionOutOfRange(usize),

    #[error("summary covers {0} days, it must be between 1 and 366")]
    SummaryDaysOutOfRange(u32),
}

pub trait Gateway: Send + Sync {
    /// Ordered by `sort_order` ascending, ties by insertion order.
    fn list_activities(&self, owner: &str) -> StoreResult<Vec<Activity>>;

    fn insert_activity(&self, owner: &str, fields: NewActivity) -> StoreResult<Activity>;

    /// `NotFound` when the id is not owned by `owner`.
    fn update_activity(&self, owner: &str, id: ActivityId, patch: &ActivityPatch)
    -> StoreResult<()>;

    fn delete_activity(&self, owner: &str, id: ActivityId) -> StoreResult<()>;

    fn bulk_set_sort_order(&self, owner: &str, ranks: &[(ActivityId, i64)]) -> StoreResult<()>;

    fn load_completion(&self, owner: &str, date: NaiveDate) -> StoreResult<ProgressMap>;

    fn upsert_completion(
        &self,
        owner: &str,
        activity_id: ActivityId,
        date: NaiveDate,
        completed: bool,
    ) -> StoreResult<()>;

    fn load_start_time(&self, owner: &str, date: NaiveDate) -> StoreResult<Option<u32>>;

    fn upsert_start_time(&self, owner: &str, date: NaiveDate, minutes: u32) -> StoreResult<()>;

    fn list_distinct_completion_dates(&self, owner: &str) -> StoreResult<BTreeSet<NaiveDate>>;
}
