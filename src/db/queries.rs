pub const CREATE_ACTIVITIES: &str = r#"
CREATE TABLE IF NOT EXISTS activities (
  id               INTEGER PRIMARY KEY AUTOINCREMENT,
  owner            TEXT NOT NULL,
  title            TEXT NOT NULL,
  duration_minutes INTEGER NOT NULL DEFAULT 60,
  icon_tag         TEXT NOT NULL DEFAULT 'Target',
  color_tag        TEXT NOT NULL DEFAULT '',
  sort_order       INTEGER NOT NULL DEFAULT 0,
  notes            TEXT NOT NULL DEFAULT ''
);
"#;

// No foreign key to activities: completion rows outlive deleted activities.
pub const CREATE_COMPLETIONS: &str = r#"
CREATE TABLE IF NOT EXISTS completions (
  id          INTEGER PRIMARY KEY AUTOINCREMENT,
  owner       TEXT NOT NULL,
  activity_id INTEGER NOT NULL,
  date        TEXT NOT NULL,
  completed   INTEGER NOT NULL DEFAULT 0,
  UNIQUE(owner, activity_id, date)
);
"#;

pub const CREATE_DAY_SETTINGS: &str = r#"
CREATE TABLE IF NOT EXISTS day_settings (
  id            INTEGER PRIMARY KEY AUTOINCREMENT,
  owner         TEXT NOT NULL,
  date          TEXT NOT NULL,
  start_minutes INTEGER NOT NULL,
  UNIQUE(owner, date)
);
"#;

pub const INDEX_ACTIVITIES_OWNER_ORDER: &str =
    "CREATE INDEX IF NOT EXISTS idx_activities_owner_order ON activities(owner, sort_order);";

pub const INDEX_COMPLETIONS_OWNER_DATE: &str =
    "CREATE INDEX IF NOT EXISTS idx_completions_owner_date ON completions(owner, date);";

pub fn schema_statements() -> Vec<&'static str> {
    vec![
        CREATE_ACTIVITIES,
        CREATE_COMPLETIONS,
        CREATE_DAY_SETTINGS,
        INDEX_ACTIVITIES_OWNER_ORDER,
        INDEX_COMPLETIONS_OWNER_DATE,
    ]
}
