use super::{Gateway, ProgressMap, StoreError, StoreResult};
use crate::model::{Activity, ActivityId, ActivityPatch, NewActivity};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListActivities,
    InsertActivity,
    UpdateActivity,
    DeleteActivity,
    BulkSetSortOrder,
    LoadCompletion,
    UpsertCompletion,
    LoadStartTime,
    UpsertStartTime,
    ListCompletionDates,
}

#[derive(Debug, Clone)]
struct StoredActivity {
    owner: String,
    activity: Activity,
}

#[derive(Debug, Default)]
struct MemoryState {
    next_id: i64,
    activities: Vec<StoredActivity>,
    completions: BTreeMap<(String, NaiveDate, ActivityId), bool>,
    start_times: BTreeMap<(String, NaiveDate), u32>,
    sort_batches: Vec<Vec<(ActivityId, i64)>>,
    failing: HashSet<Operation>,
    failing_dates: HashSet<NaiveDate>,
}

#[derive(Debug, Default)]
pub struct MemoryGateway {
    state: Mutex<MemoryState>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, operation: Operation) {
        if let Ok(mut state) = self.state.lock() {
            state.failing.insert(operation);
        }
    }

    pub fn recover(&self, operation: Operation) {
        if let Ok(mut state) = self.state.lock() {
            state.failing.remove(&operation);
        }
    }

    /// Makes `load_completion` fail for one date only.
    pub fn fail_completion_load_on(&self, date: NaiveDate) {
        if let Ok(mut state) = self.state.lock() {
            state.failing_dates.insert(date);
        }
    }

    pub fn sort_batches(&self) -> Vec<Vec<(ActivityId, i64)>> {
        self.state
            .lock()
            .map(|state| state.sort_batches.clone())
            .unwrap_or_default()
    }

    fn guard(&self, operation: Operation) -> StoreResult<MutexGuard<'_, MemoryState>> {
        let state = self
            .state
            .lock()
            .map_err(|_| StoreError::transient("memory store lock poisoned"))?;
        if state.failing.contains(&operation) {
            return Err(StoreError::Transient(format!("{operation:?} failed")));
        }
        Ok(state)
    }
}

impl Gateway for MemoryGateway {
    fn list_activities(&self, owner: &str) -> StoreResult<Vec<Activity>> {
        let state = self.guard(Operation::ListActivities)?;
        let mut owned = state
            .activities
            .iter()
            .filter(|stored| stored.owner == owner)
            .map(|stored| stored.activity.clone())
            .collect::<Vec<_>>();
        // Ids grow with insertion, so they double as the tie breaker.
        owned.sort_by_key(|activity| (activity.sort_order, activity.id));
        Ok(owned)
    }

    fn insert_activity(&self, owner: &str, fields: NewActivity) -> StoreResult<Activity> {
        let mut state = self.guard(Operation::InsertActivity)?;
        state.next_id += 1;
        let activity = fields.into_activity(ActivityId(state.next_id));
        state.activities.push(StoredActivity {
            owner: owner.to_string(),
            activity: activity.clone(),
        });
        Ok(activity)
    }

    fn update_activity(
        &self,
        owner: &str,
        id: ActivityId,
        patch: &ActivityPatch,
    ) -> StoreResult<()> {
        let mut state = self.guard(Operation::UpdateActivity)?;
        let stored = state
            .activities
            .iter_mut()
            .find(|stored| stored.owner == owner && stored.activity.id == id)
            .ok_or(StoreError::NotFound(id))?;
        patch.apply_to(&mut stored.activity);
        Ok(())
    }

    fn delete_activity(&self, owner: &str, id: ActivityId) -> StoreResult<()> {
        let mut state = self.guard(Operation::DeleteActivity)?;
        state
            .activities
            .retain(|stored| !(stored.owner == owner && stored.activity.id == id));
        Ok(())
    }

    fn bulk_set_sort_order(&self, owner: &str, ranks: &[(ActivityId, i64)]) -> StoreResult<()> {
        let mut state = self.guard(Operation::BulkSetSortOrder)?;
        for (id, rank) in ranks {
            if let Some(stored) = state
                .activities
                .iter_mut()
                .find(|stored| stored.owner == owner && stored.activity.id == *id)
            {
                stored.activity.sort_order = *rank;
            }
        }
        state.sort_batches.push(ranks.to_vec());
        Ok(())
    }

    fn load_completion(&self, owner: &str, date: NaiveDate) -> StoreResult<ProgressMap> {
        let state = self.guard(Operation::LoadCompletion)?;
        if state.failing_dates.contains(&date) {
            return Err(StoreError::Transient(format!("completion load failed for {date}")));
        }
        Ok(state
            .completions
            .iter()
            .filter(|((row_owner, row_date, _), _)| row_owner == owner && *row_date == date)
            .map(|((_, _, id), completed)| (*id, *completed))
            .collect())
    }

    fn upsert_completion(
        &self,
        owner: &str,
        activity_id: ActivityId,
        date: NaiveDate,
        completed: bool,
    ) -> StoreResult<()> {
        let mut state = self.guard(Operation::UpsertCompletion)?;
        state
            .completions
            .insert((owner.to_string(), date, activity_id), completed);
        Ok(())
    }

    fn load_start_time(&self, owner: &str, date: NaiveDate) -> StoreResult<Option<u32>> {
        let state = self.guard(Operation::LoadStartTime)?;
        Ok(state.start_times.get(&(owner.to_string(), date)).copied())
    }

    fn upsert_start_time(&self, owner: &str, date: NaiveDate, minutes: u32) -> StoreResult<()> {
        let mut state = self.guard(Operation::UpsertStartTime)?;
        state.start_times.insert((owner.to_string(), date), minutes);
        Ok(())
    }

    fn list_distinct_completion_dates(&self, owner: &str) -> StoreResult<BTreeSet<NaiveDate>> {
        let state = self.guard(Operation::ListCompletionDates)?;
        Ok(state
            .completions
            .keys()
            .filter(|(row_owner, _, _)| row_owner == owner)
            .map(|(_, date, _)| *date)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::IconTag;

    fn new_activity(title: &str, sort_order: i64) -> NewActivity {
        NewActivity::validated(title, 30, "", IconTag::Sun, "c", sort_order).expect("valid")
    }

    #[test]
    fn activities_are_scoped_by_owner() {
        let store = MemoryGateway::new();
        store
            .insert_activity("alice", new_activity("Exercise", 0))
            .expect("insert");
        let bob = store
            .insert_activity("bob", new_activity("Reading", 0))
            .expect("insert");

        assert_eq!(store.list_activities("alice").expect("list").len(), 1);
        assert_eq!(
            store.update_activity("alice", bob.id, &ActivityPatch::default()),
            Err(StoreError::NotFound(bob.id))
        );
    }

    #[test]
    fn upsert_completion_is_idempotent() {
        let store = MemoryGateway::new();
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).expect("date");

        store
            .upsert_completion("me", ActivityId(1), date, true)
            .expect("first upsert");
        let first = store.load_completion("me", date).expect("load");
        store
            .upsert_completion("me", ActivityId(1), date, true)
            .expect("second upsert");

        assert_eq!(store.load_completion("me", date).expect("load"), first);
    }

    #[test]
    fn failure_switch_applies_per_operation() {
        let store = MemoryGateway::new();
        store.fail(Operation::InsertActivity);
        assert!(matches!(
            store.insert_activity("me", new_activity("Exercise", 0)),
            Err(StoreError::Transient(_))
        ));
        assert!(store.list_activities("me").is_ok());

        store.recover(Operation::InsertActivity);
        assert!(store.insert_activity("me", new_activity("Exercise", 0)).is_ok());
    }
}
