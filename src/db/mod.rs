pub mod queries;

use crate::model::{Activity, ActivityId, ActivityPatch, IconTag, NewActivity};
use crate::store::{Gateway, ProgressMap, StoreError, StoreResult};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const ACTIVITY_COLUMNS: &str =
    "id, title, duration_minutes, icon_tag, color_tag, sort_order, notes";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite DB: {}", path.display()))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .context("Failed to set SQLite busy timeout")?;

        let database = Self { conn };
        database.init_schema()?;

        Ok(database)
    }

    pub fn init_schema(&self) -> Result<()> {
        queries::schema_statements()
            .iter()
            .try_for_each(|statement| {
                self.conn
                    .execute(statement, [])
                    .context("Failed to initialize schema")
                    .map(|_| ())
            })
    }

    pub fn activities(&self, owner: &str) -> Result<Vec<Activity>> {
        let mut statement = self.conn.prepare(&format!(
            "SELECT {ACTIVITY_COLUMNS}
             FROM activities
             WHERE owner = ?1
             ORDER BY sort_order ASC, id ASC"
        ))?;

        let rows = statement
            .query_map(params![owner], activity_from_row)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query activities")?;

        Ok(rows)
    }

    pub fn insert_activity(&self, owner: &str, fields: NewActivity) -> Result<Activity> {
        self.conn
            .execute(
                "INSERT INTO activities (owner, title, duration_minutes, icon_tag, color_tag, sort_order, notes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    owner,
                    &fields.title,
                    fields.duration_minutes,
                    fields.icon_tag.as_str(),
                    &fields.color_tag,
                    fields.sort_order,
                    &fields.notes
                ],
            )
            .context("Failed to insert activity")?;

        let id = ActivityId(self.conn.last_insert_rowid());
        Ok(fields.into_activity(id))
    }

    /// Returns the number of rows touched; zero means the id is not owned.
    pub fn update_activity(
        &self,
        owner: &str,
        id: ActivityId,
        patch: &ActivityPatch,
    ) -> Result<usize> {
        let updated = self
            .conn
            .execute(
                "UPDATE activities
                 SET title = COALESCE(?1, title),
                     duration_minutes = COALESCE(?2, duration_minutes),
                     notes = COALESCE(?3, notes)
                 WHERE id = ?4 AND owner = ?5",
                params![
                    patch.title.as_deref(),
                    patch.duration_minutes,
                    patch.notes.as_deref(),
                    id.0,
                    owner
                ],
            )
            .context("Failed to update activity")?;

        Ok(updated)
    }

    pub fn delete_activity(&self, owner: &str, id: ActivityId) -> Result<()> {
        self.conn
            .execute(
                "DELETE FROM activities WHERE id = ?1 AND owner = ?2",
                params![id.0, owner],
            )
            .context("Failed to delete activity")?;

        Ok(())
    }

    pub fn replace_sort_orders(&mut self, owner: &str, ranks: &[(ActivityId, i64)]) -> Result<()> {
        let transaction = self
            .conn
            .transaction()
            .context("Failed to start transaction")?;

        ranks.iter().try_for_each(|(id, rank)| {
            transaction
                .execute(
                    "UPDATE activities SET sort_order = ?1 WHERE id = ?2 AND owner = ?3",
                    params![rank, id.0, owner],
                )
                .context("Failed to update sort order")
                .map(|_| ())
        })?;

        transaction
            .commit()
            .context("Failed to commit sort orders")?;
        Ok(())
    }

    pub fn completions_for_date(&self, owner: &str, date: NaiveDate) -> Result<ProgressMap> {
        let mut statement = self.conn.prepare(
            "SELECT activity_id, completed
             FROM completions
             WHERE owner = ?1 AND date = ?2",
        )?;

        let rows = statement
            .query_map(params![owner, date], |row| {
                Ok((ActivityId(row.get(0)?), row.get::<_, bool>(1)?))
            })?
            .collect::<Result<ProgressMap, _>>()
            .context("Failed to query completions")?;

        Ok(rows)
    }

    pub fn upsert_completion(
        &self,
        owner: &str,
        activity_id: ActivityId,
        date: NaiveDate,
        completed: bool,
    ) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO completions (owner, activity_id, date, completed)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(owner, activity_id, date)
                 DO UPDATE SET completed=excluded.completed",
                params![owner, activity_id.0, date, completed],
            )
            .context("Failed to upsert completion")?;

        Ok(())
    }

    pub fn start_time(&self, owner: &str, date: NaiveDate) -> Result<Option<u32>> {
        let minutes = self
            .conn
            .query_row(
                "SELECT start_minutes FROM day_settings WHERE owner = ?1 AND date = ?2",
                params![owner, date],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to query day start time")?;

        Ok(minutes)
    }

    pub fn upsert_start_time(&self, owner: &str, date: NaiveDate, minutes: u32) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO day_settings (owner, date, start_minutes)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(owner, date)
                 DO UPDATE SET start_minutes=excluded.start_minutes",
                params![owner, date, minutes],
            )
            .context("Failed to upsert day start time")?;

        Ok(())
    }

    pub fn completion_dates(&self, owner: &str) -> Result<BTreeSet<NaiveDate>> {
        let mut statement = self.conn.prepare(
            "SELECT DISTINCT date FROM completions WHERE owner = ?1 ORDER BY date DESC",
        )?;

        let dates = statement
            .query_map(params![owner], |row| row.get::<_, NaiveDate>(0))?
            .collect::<Result<BTreeSet<_>, _>>()
            .context("Failed to list completion dates")?;

        Ok(dates)
    }
}

fn activity_from_row(row: &Row<'_>) -> rusqlite::Result<Activity> {
    let icon: String = row.get(3)?;
    Ok(Activity {
        id: ActivityId(row.get(0)?),
        title: row.get(1)?,
        duration_minutes: row.get(2)?,
        icon_tag: IconTag::from_stored(&icon),
        color_tag: row.get(4)?,
        sort_order: row.get(5)?,
        notes: row.get(6)?,
    })
}

#[derive(Debug, Clone)]
pub struct SqliteGateway {
    db_path: PathBuf,
}

impl SqliteGateway {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    fn open(&self) -> StoreResult<Database> {
        Ok(Database::open(&self.db_path)?)
    }
}

impl Gateway for SqliteGateway {
    fn list_activities(&self, owner: &str) -> StoreResult<Vec<Activity>> {
        Ok(self.open()?.activities(owner)?)
    }

    fn insert_activity(&self, owner: &str, fields: NewActivity) -> StoreResult<Activity> {
        Ok(self.open()?.insert_activity(owner, fields)?)
    }

    fn update_activity(
        &self,
        owner: &str,
        id: ActivityId,
        patch: &ActivityPatch,
    ) -> StoreResult<()> {
        match self.open()?.update_activity(owner, id, patch)? {
            0 => Err(StoreError::NotFound(id)),
            _ => Ok(()),
        }
    }

    fn delete_activity(&self, owner: &str, id: ActivityId) -> StoreResult<()> {
        Ok(self.open()?.delete_activity(owner, id)?)
    }

    fn bulk_set_sort_order(&self, owner: &str, ranks: &[(ActivityId, i64)]) -> StoreResult<()> {
        Ok(self.open()?.replace_sort_orders(owner, ranks)?)
    }

    fn load_completion(&self, owner: &str, date: NaiveDate) -> StoreResult<ProgressMap> {
        Ok(self.open()?.completions_for_date(owner, date)?)
    }

    fn upsert_completion(
        &self,
        owner: &str,
        activity_id: ActivityId,
        date: NaiveDate,
        completed: bool,
    ) -> StoreResult<()> {
        Ok(self
            .open()?
            .upsert_completion(owner, activity_id, date, completed)?)
    }

    fn load_start_time(&self, owner: &str, date: NaiveDate) -> StoreResult<Option<u32>> {
        Ok(self.open()?.start_time(owner, date)?)
    }

    fn upsert_start_time(&self, owner: &str, date: NaiveDate, minutes: u32) -> StoreResult<()> {
        Ok(self.open()?.upsert_start_time(owner, date, minutes)?)
    }

    fn list_distinct_completion_dates(&self, owner: &str) -> StoreResult<BTreeSet<NaiveDate>> {
        Ok(self.open()?.completion_dates(owner)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn gateway() -> (TempDir, SqliteGateway) {
        let dir = tempfile::tempdir().expect("temp dir");
        let gateway = SqliteGateway::new(dir.path().join("db").join("roadmap.db"));
        (dir, gateway)
    }

    fn seed(gateway: &SqliteGateway, owner: &str, title: &str, sort_order: i64) -> Activity {
        let fields =
            NewActivity::validated(title, 30, "", IconTag::Code, "c", sort_order).expect("valid");
        gateway.insert_activity(owner, fields).expect("insert")
    }

    fn date(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("date")
    }

    #[test]
    fn list_orders_by_rank_then_insertion() {
        let (_dir, gateway) = gateway();
        let first = seed(&gateway, "me", "First", 1);
        let second = seed(&gateway, "me", "Second", 0);
        let third = seed(&gateway, "me", "Third", 1);
        seed(&gateway, "other", "Foreign", 0);

        let ids = gateway
            .list_activities("me")
            .expect("list")
            .into_iter()
            .map(|activity| activity.id)
            .collect::<Vec<_>>();

        assert_eq!(ids, vec![second.id, first.id, third.id]);
    }

    #[test]
    fn update_reports_not_found_for_foreign_ids() {
        let (_dir, gateway) = gateway();
        let foreign = seed(&gateway, "other", "Foreign", 0);
        let patch = ActivityPatch {
            title: Some("Mine".to_string()),
            ..ActivityPatch::default()
        };

        assert_eq!(
            gateway.update_activity("me", foreign.id, &patch),
            Err(StoreError::NotFound(foreign.id))
        );
    }

    #[test]
    fn partial_update_keeps_other_fields() {
        let (_dir, gateway) = gateway();
        let activity = seed(&gateway, "me", "Exercise", 0);
        let patch = ActivityPatch {
            duration_minutes: Some(75),
            ..ActivityPatch::default()
        };
        gateway
            .update_activity("me", activity.id, &patch)
            .expect("update");

        let stored = gateway.list_activities("me").expect("list");
        assert_eq!(stored[0].title, "Exercise");
        assert_eq!(stored[0].duration_minutes, 75);
    }

    #[test]
    fn completion_upsert_overwrites_and_is_idempotent() {
        let (_dir, gateway) = gateway();
        let day = date("2024-01-10");

        gateway
            .upsert_completion("me", ActivityId(7), day, true)
            .expect("upsert");
        gateway
            .upsert_completion("me", ActivityId(7), day, true)
            .expect("upsert again");
        assert_eq!(
            gateway.load_completion("me", day).expect("load"),
            ProgressMap::from([(ActivityId(7), true)])
        );

        gateway
            .upsert_completion("me", ActivityId(7), day, false)
            .expect("toggle off");
        assert_eq!(
            gateway.load_completion("me", day).expect("load"),
            ProgressMap::from([(ActivityId(7), false)])
        );
    }

    #[test]
    fn start_time_defaults_to_absent_and_upserts() {
        let (_dir, gateway) = gateway();
        let day = date("2024-01-10");

        assert_eq!(gateway.load_start_time("me", day).expect("load"), None);
        gateway.upsert_start_time("me", day, 420).expect("upsert");
        gateway.upsert_start_time("me", day, 435).expect("upsert");
        assert_eq!(gateway.load_start_time("me", day).expect("load"), Some(435));
    }

    #[test]
    fn bulk_sort_order_rewrites_every_rank() {
        let (_dir, gateway) = gateway();
        let a = seed(&gateway, "me", "A", 0);
        let b = seed(&gateway, "me", "B", 1);
        let c = seed(&gateway, "me", "C", 2);

        gateway
            .bulk_set_sort_order("me", &[(c.id, 0), (a.id, 1), (b.id, 2)])
            .expect("reorder");

        let listed = gateway.list_activities("me").expect("list");
        let ranks = listed
            .iter()
            .map(|activity| (activity.id, activity.sort_order))
            .collect::<Vec<_>>();
        assert_eq!(ranks, vec![(c.id, 0), (a.id, 1), (b.id, 2)]);
    }

    #[test]
    fn distinct_dates_survive_activity_deletion() {
        let (_dir, gateway) = gateway();
        let activity = seed(&gateway, "me", "Exercise", 0);
        gateway
            .upsert_completion("me", activity.id, date("2024-01-09"), true)
            .expect("upsert");
        gateway
            .upsert_completion("me", activity.id, date("2024-01-10"), false)
            .expect("upsert");
        gateway.delete_activity("me", activity.id).expect("delete");

        let dates = gateway
            .list_distinct_completion_dates("me")
            .expect("dates");
        assert_eq!(
            dates.into_iter().collect::<Vec<_>>(),
            vec![date("2024-01-09"), date("2024-01-10")]
        );
        assert_eq!(
            gateway
                .load_completion("me", date("2024-01-09"))
                .expect("load")
                .get(&activity.id),
            Some(&true)
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn session_round_trip_over_sqlite() {
        use crate::session::Session;
        use std::sync::Arc;

        let (_dir, gateway) = gateway();
        let gateway = Arc::new(gateway);
        let today = date("2024-01-10");

        let mut session = Session::open(gateway.clone(), "me", today).expect("open");
        assert_eq!(session.seed_defaults().expect("seed"), 6);
        let ids = session.activities().ids();
        for id in &ids {
            session.toggle(*id).expect("toggle");
        }
        session.select_date(date("2024-01-09")).expect("select");
        session.toggle(ids[0]).expect("toggle");

        let summary = session.summary_request(7).expect("range").run().await;
        assert_eq!(summary.days.len(), 7);
        assert_eq!(summary.unknown_days, 0);
        assert_eq!(summary.perfect_day_count, 1);
        assert_eq!(
            summary.days[5].summary().map(|day| day.percentage),
            Some(17)
        );

        let reopened = Session::open(gateway, "me", today).expect("reopen");
        assert_eq!(reopened.activities().ids(), ids);
        assert_eq!(
            reopened.history_dates(),
            vec![date("2024-01-10"), date("2024-01-09")]
        );
    }
}
