use crate::model::{Activity, ActivityId};
use crate::store::{Gateway, StoreResult, ValidationError};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivityList {
    version: u64,
    items: Vec<Activity>,
}

impl ActivityList {
    pub fn new(items: Vec<Activity>) -> Self {
        Self { version: 0, items }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn items(&self) -> &[Activity] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn ids(&self) -> Vec<ActivityId> {
        self.items.iter().map(|activity| activity.id).collect()
    }

    pub fn get(&self, id: ActivityId) -> Option<&Activity> {
        self.items.iter().find(|activity| activity.id == id)
    }

    pub fn push(&mut self, activity: Activity) {
        self.items.push(activity);
        self.version += 1;
    }

    /// Removes without renumbering the remaining ranks.
    pub fn remove(&mut self, id: ActivityId) -> Option<(usize, Activity)> {
        let index = self.items.iter().position(|activity| activity.id == id)?;
        let removed = self.items.remove(index);
        self.version += 1;
        Some((index, removed))
    }

    pub fn insert_at(&mut self, index: usize, activity: Activity) {
        let index = index.min(self.items.len());
        self.items.insert(index, activity);
        self.version += 1;
    }

    pub fn update<F>(&mut self, id: ActivityId, change: F) -> Option<Activity>
    where
        F: FnOnce(&mut Activity),
    {
        let activity = self.items.iter_mut().find(|activity| activity.id == id)?;
        let previous = activity.clone();
        change(activity);
        self.version += 1;
        Some(previous)
    }

    pub fn replace_items(&mut self, items: Vec<Activity>) {
        self.items = items;
        self.version += 1;
    }
}

pub fn permute(items: &[Activity], order: &[ActivityId]) -> Result<Vec<Activity>, ValidationError> {
    if order.len() != items.len() {
        return Err(ValidationError::NotAPermutation);
    }

    let mut seen = HashSet::with_capacity(order.len());
    order
        .iter()
        .enumerate()
        .map(|(index, id)| {
            if !seen.insert(*id) {
                return Err(ValidationError::NotAPermutation);
            }
            items
                .iter()
                .find(|activity| activity.id == *id)
                .map(|activity| Activity {
                    sort_order: index as i64,
                    ..activity.clone()
                })
                .ok_or(ValidationError::NotAPermutation)
        })
        .collect()
}

/// The order produced by one drag-over event: lift `from`, drop at `to`.
pub fn moved_order(
    ids: &[ActivityId],
    from: usize,
    to: usize,
) -> Result<Vec<ActivityId>, ValidationError> {
    if from >= ids.len() {
        return Err(ValidationError::PositionOutOfRange(from));
    }
    if to >= ids.len() {
        return Err(ValidationError::PositionOutOfRange(to));
    }

    let mut order = ids.to_vec();
    let dragged = order.remove(from);
    order.insert(to, dragged);
    Ok(order)
}

pub fn rank_assignment(items: &[Activity]) -> Vec<(ActivityId, i64)> {
    items
        .iter()
        .enumerate()
        .map(|(index, activity)| (activity.id, index as i64))
        .collect()
}

pub struct ReorderEngine {
    gateway: Arc<dyn Gateway>,
    owner: String,
}

impl ReorderEngine {
    pub fn new(gateway: Arc<dyn Gateway>, owner: impl Into<String>) -> Self {
        Self {
            gateway,
            owner: owner.into(),
        }
    }

    pub fn reorder(&self, list: &mut ActivityList, order: &[ActivityId]) -> StoreResult<()> {
        let reordered = permute(list.items(), order)?;
        let previous = list.items().to_vec();
        list.replace_items(reordered);

        let ranks = rank_assignment(list.items());
        if let Err(error) = self.gateway.bulk_set_sort_order(&self.owner, &ranks) {
            warn!(error = %error, "sort order write failed, restoring previous order");
            list.replace_items(previous);
            return Err(error);
        }

        info!(count = ranks.len(), version = list.version(), "activity order saved");
        Ok(())
    }

    /// Returns `false` without writing when the item does not move.
    pub fn move_item(&self, list: &mut ActivityList, from: usize, to: usize) -> StoreResult<bool> {
        let order = moved_order(&list.ids(), from, to)?;
        if from == to {
            return Ok(false);
        }
        self.reorder(list, &order)?;
        Ok(true)
    }
}
