use super::{DayView, Direction, Session, StartChange};
use crate::model::{Activity, ActivityId, ActivityPatch};
use crate::roadmap::reorder::ActivityList;
use crate::roadmap::summary::RangeSummary;
use crate::store::{StoreError, StoreResult};
use chrono::NaiveDate;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

const COMMAND_BUFFER: usize = 64;

type Reply<T> = oneshot::Sender<StoreResult<T>>;

enum SessionCommand {
    Snapshot {
        resp: Reply<ActivityList>,
    },
    Day {
        date: Option<NaiveDate>,
        resp: Reply<DayView>,
    },
    Navigate {
        direction: Direction,
        resp: Reply<DayView>,
    },
    History {
        resp: Reply<Vec<NaiveDate>>,
    },
    Add {
        title: String,
        duration_minutes: u32,
        notes: String,
        resp: Reply<Activity>,
    },
    Patch {
        id: ActivityId,
        patch: ActivityPatch,
        resp: Reply<Option<Activity>>,
    },
    Delete {
        id: ActivityId,
        resp: Reply<Option<Activity>>,
    },
    Reorder {
        order: Vec<ActivityId>,
        resp: Reply<ActivityList>,
    },
    Move {
        from: usize,
        to: usize,
        resp: Reply<ActivityList>,
    },
    Toggle {
        id: ActivityId,
        date: Option<NaiveDate>,
        resp: Reply<Option<bool>>,
    },
    Start {
        date: Option<NaiveDate>,
        change: StartChange,
        resp: Reply<u32>,
    },
    Summary {
        days: u32,
        resp: oneshot::Sender<StoreResult<super::SummaryRequest>>,
    },
}

#[derive(Clone)]
pub struct SessionHandle {
    sender: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub fn spawn(session: Session) -> Self {
        let (sender, mut rx) = mpsc::channel(COMMAND_BUFFER);

        tokio::task::spawn_blocking(move || {
            let mut session = session;
            info!(owner = session.owner(), "session worker started");
            while let Some(command) = rx.blocking_recv() {
                handle_command(&mut session, command);
            }
            info!(owner = session.owner(), "session worker stopped");
        });

        Self { sender }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> SessionCommand,
    ) -> StoreResult<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .await
            .map_err(|_| StoreError::transient("session worker gone"))?;
        rx.await
            .map_err(|_| StoreError::transient("session worker dropped the reply"))?
    }

    pub async fn snapshot(&self) -> StoreResult<ActivityList> {
        self.request(|resp| SessionCommand::Snapshot { resp }).await
    }

    pub async fn day(&self, date: Option<NaiveDate>) -> StoreResult<DayView> {
        self.request(|resp| SessionCommand::Day { date, resp }).await
    }

    pub async fn navigate(&self, direction: Direction) -> StoreResult<DayView> {
        self.request(|resp| SessionCommand::Navigate { direction, resp })
            .await
    }

    pub async fn history(&self) -> StoreResult<Vec<NaiveDate>> {
        self.request(|resp| SessionCommand::History { resp }).await
    }

    pub async fn add(
        &self,
        title: String,
        duration_minutes: u32,
        notes: String,
    ) -> StoreResult<Activity> {
        self.request(|resp| SessionCommand::Add {
            title,
            duration_minutes,
            notes,
            resp,
        })
        .await
    }

    pub async fn patch(
        &self,
        id: ActivityId,
        patch: ActivityPatch,
    ) -> StoreResult<Option<Activity>> {
        self.request(|resp| SessionCommand::Patch { id, patch, resp })
            .await
    }

    pub async fn delete(&self, id: ActivityId) -> StoreResult<Option<Activity>> {
        self.request(|resp| SessionCommand::Delete { id, resp }).await
    }

    pub async fn reorder(&self, order: Vec<ActivityId>) -> StoreResult<ActivityList> {
        self.request(|resp| SessionCommand::Reorder { order, resp })
            .await
    }

    pub async fn move_item(&self, from: usize, to: usize) -> StoreResult<ActivityList> {
        self.request(|resp| SessionCommand::Move { from, to, resp })
            .await
    }

    pub async fn toggle(
        &self,
        id: ActivityId,
        date: Option<NaiveDate>,
    ) -> StoreResult<Option<bool>> {
        self.request(|resp| SessionCommand::Toggle { id, date, resp })
            .await
    }

    pub async fn change_start(
        &self,
        date: Option<NaiveDate>,
        change: StartChange,
    ) -> StoreResult<u32> {
        self.request(|resp| SessionCommand::Start { date, change, resp })
            .await
    }

    pub async fn summary(&self, days: u32) -> StoreResult<RangeSummary> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SessionCommand::Summary { days, resp: tx })
            .await
            .map_err(|_| StoreError::transient("session worker gone"))?;
        let request = rx
            .await
            .map_err(|_| StoreError::transient("session worker dropped the reply"))??;
        Ok(request.run().await)
    }
}

fn handle_command(session: &mut Session, command: SessionCommand) {
    match command {
        SessionCommand::Snapshot { resp } => {
            resp.send(Ok(session.activities().clone())).ok();
        }
        SessionCommand::Day { date, resp } => {
            let result = switch_date(session, date).map(|()| session.day_view());
            resp.send(result).ok();
        }
        SessionCommand::Navigate { direction, resp } => {
            let result = session
                .navigate(direction)
                .map(|_| session.day_view());
            resp.send(result).ok();
        }
        SessionCommand::History { resp } => {
            resp.send(Ok(session.history_dates())).ok();
        }
        SessionCommand::Add {
            title,
            duration_minutes,
            notes,
            resp,
        } => {
            resp.send(session.add_activity(&title, duration_minutes, &notes))
                .ok();
        }
        SessionCommand::Patch { id, patch, resp } => {
            resp.send(session.patch_activity(id, patch)).ok();
        }
        SessionCommand::Delete { id, resp } => {
            resp.send(session.delete_activity(id)).ok();
        }
        SessionCommand::Reorder { order, resp } => {
            let result = session
                .reorder(&order)
                .map(|()| session.activities().clone());
            resp.send(result).ok();
        }
        SessionCommand::Move { from, to, resp } => {
            let result = session
                .move_activity(from, to)
                .map(|_| session.activities().clone());
            resp.send(result).ok();
        }
        SessionCommand::Toggle { id, date, resp } => {
            let result = switch_date(session, date).and_then(|()| session.toggle(id));
            resp.send(result).ok();
        }
        SessionCommand::Start { date, change, resp } => {
            let result = switch_date(session, date).and_then(|()| session.change_start(change));
            resp.send(result).ok();
        }
        SessionCommand::Summary { days, resp } => {
            if resp.send(session.summary_request(days)).is_err() {
                warn!("summary requester went away");
            }
        }
    }
}

fn switch_date(session: &mut Session, date: Option<NaiveDate>) -> StoreResult<()> {
    match date {
        Some(date) if date != session.selected_date() => session.select_date(date),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ValidationError;
    use crate::store::memory::MemoryGateway;
    use std::sync::Arc;

    fn handle() -> SessionHandle {
        let today = NaiveDate::from_ymd_opt(2024, 1, 10).expect("date");
        let session =
            Session::open(Arc::new(MemoryGateway::new()), "me", today).expect("open session");
        SessionHandle::spawn(session)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn commands_are_applied_in_order() {
        let handle = handle();
        let exercise = handle
            .add("Exercise".to_string(), 60, String::new())
            .await
            .expect("add");
        let reading = handle
            .add("Reading".to_string(), 30, String::new())
            .await
            .expect("add");

        let list = handle
            .reorder(vec![reading.id, exercise.id])
            .await
            .expect("reorder");
        assert_eq!(list.ids(), vec![reading.id, exercise.id]);

        assert_eq!(
            handle.toggle(exercise.id, None).await.expect("toggle"),
            Some(true)
        );
        let day = handle.day(None).await.expect("day");
        assert_eq!(day.summary.completed_count, 1);
        assert_eq!(day.entries[0].activity.id, reading.id);
        assert_eq!(day.entries[1].window.start_minutes, 390);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn oversized_summary_is_rejected_and_worker_keeps_serving() {
        let handle = handle();

        let result = handle.summary(200_000_000).await;
        assert!(matches!(
            result,
            Err(StoreError::Validation(ValidationError::SummaryDaysOutOfRange(
                200_000_000
            )))
        ));

        let exercise = handle
            .add("Exercise".to_string(), 60, String::new())
            .await
            .expect("worker still running");
        assert_eq!(handle.summary(366).await.expect("year").days.len(), 366);
        assert_eq!(
            handle.snapshot().await.expect("snapshot").ids(),
            vec![exercise.id]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn invalid_patch_leaves_activity_untouched() {
        let handle = handle();
        let exercise = handle
            .add("Exercise".to_string(), 60, String::new())
            .await
            .expect("add");

        let result = handle
            .patch(
                exercise.id,
                ActivityPatch {
                    title: Some(String::new()),
                    duration_minutes: Some(75),
                    notes: Some("never applied".to_string()),
                },
            )
            .await;
        assert!(matches!(result, Err(StoreError::Validation(_))));

        let list = handle.snapshot().await.expect("snapshot");
        let stored = list.get(exercise.id).expect("present");
        assert_eq!(stored.duration_minutes, 60);
        assert!(stored.notes.is_empty());
        assert_eq!(list.version(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn toggle_on_another_date_switches_selection() {
        let handle = handle();
        let exercise = handle
            .add("Exercise".to_string(), 60, String::new())
            .await
            .expect("add");
        let earlier = NaiveDate::from_ymd_opt(2024, 1, 8).expect("date");

        handle
            .toggle(exercise.id, Some(earlier))
            .await
            .expect("toggle");
        let summary = handle.summary(3).await.expect("summary");

        assert_eq!(summary.perfect_day_count, 1);
        assert_eq!(
            handle.history().await.expect("history"),
            vec![NaiveDate::from_ymd_opt(2024, 1, 10).expect("date"), earlier]
        );
    }
}
