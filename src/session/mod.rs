pub mod actor;

use crate::model::{
    Activity, ActivityId, ActivityPatch, IconTag, NewActivity, adjusted_duration, default_seed,
    rotate_color, validate_duration, validate_notes, validate_title,
};
use crate::roadmap::progress::{ProgressStore, is_completed};
use crate::roadmap::reorder::{ActivityList, ReorderEngine};
use crate::roadmap::summary::{self, DailySummary, DateRange, RangeSummary};
use crate::roadmap::timeline::{
    DEFAULT_START_MINUTES, ScheduledWindow, Timeline, build_timeline, clamp_start,
};
use crate::store::{Gateway, ProgressMap, StoreError, StoreResult, ValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityEdit {
    Rename(String),
    Notes(String),
    AdjustDuration(i32),
    SetDuration(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartChange {
    Adjust(i32),
    Set(u32),
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Prev,
    Next,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayEntry {
    pub activity: Activity,
    pub window: ScheduledWindow,
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayView {
    pub date: NaiveDate,
    pub is_today: bool,
    pub version: u64,
    pub timeline: Timeline,
    pub entries: Vec<DayEntry>,
    pub summary: DailySummary,
}

pub struct SummaryRequest {
    gateway: Arc<dyn Gateway>,
    owner: String,
    range: DateRange,
    current_ids: Vec<ActivityId>,
}

impl SummaryRequest {
    pub async fn run(self) -> RangeSummary {
        summary::summarize_range(self.gateway, &self.owner, self.range, &self.current_ids).await
    }
}

pub struct Session {
    gateway: Arc<dyn Gateway>,
    owner: String,
    today: NaiveDate,
    activities: ActivityList,
    progress_store: ProgressStore,
    reorder: ReorderEngine,
    selected_date: NaiveDate,
    progress: ProgressMap,
    start_minutes: u32,
    default_start: u32,
    history: BTreeSet<NaiveDate>,
}

impl Session {
    pub fn open(gateway: Arc<dyn Gateway>, owner: &str, today: NaiveDate) -> StoreResult<Self> {
        Self::open_with_start(gateway, owner, today, DEFAULT_START_MINUTES)
    }

    pub fn open_with_start(
        gateway: Arc<dyn Gateway>,
        owner: &str,
        today: NaiveDate,
        default_start: u32,
    ) -> StoreResult<Self> {
        let default_start = clamp_start(i64::from(default_start));
        let activities = ActivityList::new(gateway.list_activities(owner)?);
        let progress_store = ProgressStore::new(Arc::clone(&gateway), owner);
        let progress = progress_store.load(today)?;
        let start_minutes = gateway
            .load_start_time(owner, today)?
            .unwrap_or(default_start);
        let history = gateway.list_distinct_completion_dates(owner)?;

        info!(owner, activities = activities.len(), date = %today, "session opened");

        Ok(Self {
            reorder: ReorderEngine::new(Arc::clone(&gateway), owner),
            gateway,
            owner: owner.to_string(),
            today,
            activities,
            progress_store,
            selected_date: today,
            progress,
            start_minutes,
            default_start,
            history,
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn activities(&self) -> &ActivityList {
        &self.activities
    }

    pub fn selected_date(&self) -> NaiveDate {
        self.selected_date
    }

    pub fn start_minutes(&self) -> u32 {
        self.start_minutes
    }

    pub fn seed_defaults(&mut self) -> StoreResult<usize> {
        if !self.activities.is_empty() {
            return Ok(0);
        }

        for (index, seed) in default_seed().into_iter().enumerate() {
            let fields = NewActivity::validated(
                seed.title,
                seed.duration_minutes,
                "",
                seed.icon_tag,
                seed.color_tag,
                index as i64,
            )?;
            let activity = self.gateway.insert_activity(&self.owner, fields)?;
            self.activities.push(activity);
        }

        info!(count = self.activities.len(), "default activities seeded");
        Ok(self.activities.len())
    }

    pub fn add_activity(
        &mut self,
        title: &str,
        duration_minutes: u32,
        notes: &str,
    ) -> StoreResult<Activity> {
        let rank = self.activities.len();
        let fields = NewActivity::validated(
            title,
            duration_minutes,
            notes,
            IconTag::rotate(rank),
            rotate_color(rank),
            rank as i64,
        )?;

        // The store assigns the id, so this one cannot be applied ahead.
        let activity = self.gateway.insert_activity(&self.owner, fields)?;
        info!(activity = %activity.id, title = %activity.title, "activity added");
        self.activities.push(activity.clone());
        Ok(activity)
    }

    pub fn edit_activity(
        &mut self,
        id: ActivityId,
        edit: ActivityEdit,
    ) -> StoreResult<Option<Activity>> {
        let Some(current) = self.activities.get(id) else {
            warn!(activity = %id, "edit for unknown activity ignored");
            return Ok(None);
        };

        let patch = match edit {
            ActivityEdit::Rename(title) => ActivityPatch {
                title: Some(validate_title(&title)?),
                ..ActivityPatch::default()
            },
            ActivityEdit::Notes(notes) => ActivityPatch {
                notes: Some(validate_notes(&notes)?),
                ..ActivityPatch::default()
            },
            ActivityEdit::AdjustDuration(delta) => ActivityPatch {
                duration_minutes: Some(adjusted_duration(current.duration_minutes, delta)),
                ..ActivityPatch::default()
            },
            ActivityEdit::SetDuration(minutes) => ActivityPatch {
                duration_minutes: Some(validate_duration(minutes)?),
                ..ActivityPatch::default()
            },
        };

        self.apply_patch(id, patch)
    }

    pub fn patch_activity(
        &mut self,
        id: ActivityId,
        patch: ActivityPatch,
    ) -> StoreResult<Option<Activity>> {
        let patch = patch.validated()?;
        if patch.is_empty() {
            return Ok(self.activities.get(id).cloned());
        }
        self.apply_patch(id, patch)
    }

    fn apply_patch(
        &mut self,
        id: ActivityId,
        patch: ActivityPatch,
    ) -> StoreResult<Option<Activity>> {
        let Some(previous) = self.activities.update(id, |activity| patch.apply_to(activity)) else {
            return Ok(None);
        };

        match self.gateway.update_activity(&self.owner, id, &patch) {
            Ok(()) => Ok(self.activities.get(id).cloned()),
            Err(StoreError::NotFound(missing)) => {
                warn!(activity = %missing, "activity no longer exists, dropping local copy");
                self.activities.remove(missing);
                Ok(None)
            }
            Err(error) => {
                warn!(activity = %id, error = %error, "activity update failed, reverting");
                self.activities.update(id, |activity| *activity = previous);
                Err(error)
            }
        }
    }

    pub fn delete_activity(&mut self, id: ActivityId) -> StoreResult<Option<Activity>> {
        let Some((index, removed)) = self.activities.remove(id) else {
            return Ok(None);
        };

        if let Err(error) = self.gateway.delete_activity(&self.owner, id) {
            warn!(activity = %id, error = %error, "activity delete failed, restoring");
            self.activities.insert_at(index, removed);
            return Err(error);
        }

        info!(activity = %id, "activity deleted");
        Ok(Some(removed))
    }

    pub fn reorder(&mut self, order: &[ActivityId]) -> StoreResult<()> {
        self.reorder.reorder(&mut self.activities, order)
    }

    pub fn move_activity(&mut self, from: usize, to: usize) -> StoreResult<bool> {
        self.reorder.move_item(&mut self.activities, from, to)
    }

    pub fn toggle(&mut self, id: ActivityId) -> StoreResult<Option<bool>> {
        if self.activities.get(id).is_none() {
            warn!(activity = %id, "toggle for unknown activity ignored");
            return Ok(None);
        }

        let prior = self.progress.get(&id).copied();
        let previous = is_completed(&self.progress, id);
        self.progress.insert(id, !previous);

        match self.progress_store.toggle(id, self.selected_date, previous) {
            Ok(completed) => {
                self.history.insert(self.selected_date);
                Ok(Some(completed))
            }
            Err(error) => {
                warn!(activity = %id, error = %error, "toggle failed, reverting");
                match prior {
                    Some(value) => self.progress.insert(id, value),
                    None => self.progress.remove(&id),
                };
                Err(error)
            }
        }
    }

    pub fn select_date(&mut self, date: NaiveDate) -> StoreResult<()> {
        let progress = self.progress_store.load(date)?;
        let start_minutes = self
            .gateway
            .load_start_time(&self.owner, date)?
            .unwrap_or(self.default_start);

        self.selected_date = date;
        self.progress = progress;
        self.start_minutes = start_minutes;
        Ok(())
    }

    pub fn change_start(&mut self, change: StartChange) -> StoreResult<u32> {
        let next = match change {
            StartChange::Adjust(delta) => clamp_start(i64::from(self.start_minutes) + i64::from(delta)),
            StartChange::Set(minutes) if minutes > 1439 => {
                return Err(ValidationError::StartOutOfRange(i64::from(minutes)).into());
            }
            StartChange::Set(minutes) => clamp_start(i64::from(minutes)),
            StartChange::Reset => self.default_start,
        };

        let previous = self.start_minutes;
        self.start_minutes = next;

        if let Err(error) = self
            .gateway
            .upsert_start_time(&self.owner, self.selected_date, next)
        {
            warn!(error = %error, "start time save failed, reverting");
            self.start_minutes = previous;
            return Err(error);
        }

        Ok(next)
    }

    pub fn timeline(&self) -> Timeline {
        build_timeline(self.activities.items(), self.start_minutes)
    }

    pub fn history_dates(&self) -> Vec<NaiveDate> {
        let mut dates = self.history.clone();
        dates.insert(self.today);
        dates.into_iter().rev().collect()
    }

    pub fn navigate(&mut self, direction: Direction) -> StoreResult<Option<NaiveDate>> {
        let mut dates = self.history_dates();
        if !dates.contains(&self.selected_date) {
            dates.push(self.selected_date);
            dates.sort_unstable_by(|left, right| right.cmp(left));
        }

        let Some(index) = dates.iter().position(|date| *date == self.selected_date) else {
            return Ok(None);
        };
        let target = match direction {
            Direction::Prev => dates.get(index + 1),
            Direction::Next => index.checked_sub(1).and_then(|newer| dates.get(newer)),
        };

        match target.copied() {
            Some(date) => {
                self.select_date(date)?;
                Ok(Some(date))
            }
            None => Ok(None),
        }
    }

    pub fn day_view(&self) -> DayView {
        let timeline = self.timeline();
        let entries = self
            .activities
            .items()
            .iter()
            .zip(&timeline.windows)
            .map(|(activity, window)| DayEntry {
                activity: activity.clone(),
                window: *window,
                completed: is_completed(&self.progress, activity.id),
            })
            .collect::<Vec<_>>();
        let current = self.activities.ids().into_iter().collect::<HashSet<_>>();

        DayView {
            date: self.selected_date,
            is_today: self.selected_date == self.today,
            version: self.activities.version(),
            summary: summary::summarize_day(self.selected_date, &current, &self.progress),
            timeline,
            entries,
        }
    }

    pub fn summary_request(&self, days: u32) -> StoreResult<SummaryRequest> {
        Ok(SummaryRequest {
            gateway: Arc::clone(&self.gateway),
            owner: self.owner.clone(),
            range: DateRange::ending(self.today, days)?,
            current_ids: self.activities.ids(),
        })
    }
}
