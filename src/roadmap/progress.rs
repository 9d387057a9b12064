use crate::model::ActivityId;
use crate::store::{Gateway, ProgressMap, StoreResult};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct ProgressStore {
    gateway: Arc<dyn Gateway>,
    owner: String,
}

impl ProgressStore {
    pub fn new(gateway: Arc<dyn Gateway>, owner: impl Into<String>) -> Self {
        Self {
            gateway,
            owner: owner.into(),
        }
    }

    pub fn load(&self, date: NaiveDate) -> StoreResult<ProgressMap> {
        self.gateway.load_completion(&self.owner, date)
    }

    // Same-key races are last write wins.
    pub fn toggle(
        &self,
        activity_id: ActivityId,
        date: NaiveDate,
        previous: bool,
    ) -> StoreResult<bool> {
        let next = !previous;
        self.gateway
            .upsert_completion(&self.owner, activity_id, date, next)?;
        info!(activity = %activity_id, date = %date, completed = next, "completion toggled");
        Ok(next)
    }
}

pub fn is_completed(map: &ProgressMap, id: ActivityId) -> bool {
    map.get(&id).copied().unwrap_or(false)
}
