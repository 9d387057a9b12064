use crate::roadmap::summary::{DEFAULT_SUMMARY_DAYS, MAX_SUMMARY_DAYS};
use crate::roadmap::timeline::{DEFAULT_START_MINUTES, LATEST_START_MINUTES, format_clock, parse_clock};
use anyhow::{Context, Result, anyhow, bail};
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

const APP_DIR: &str = ".DailyRoadmap";
const CONFIG_FILE: &str = "config.json";
const DEFAULT_OWNER: &str = "local";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub owner: String,
    pub db_path: PathBuf,
    pub report_dir: PathBuf,
    pub api_port: u16,
    pub default_start_minutes: u32,
    pub summary_days: u32,
}

impl Default for Config {
    fn default() -> Self {
        let root = default_root_dir();

        Self {
            owner: DEFAULT_OWNER.to_string(),
            db_path: root.join("db").join("roadmap.db"),
            report_dir: root.join("reports"),
            api_port: 7891,
            default_start_minutes: DEFAULT_START_MINUTES,
            summary_days: DEFAULT_SUMMARY_DAYS,
        }
    }
}

impl Config {
    pub fn root_dir() -> Result<PathBuf> {
        Ok(default_root_dir())
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(default_root_dir().join(CONFIG_FILE))
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.default_start_minutes = config.default_start_minutes.min(LATEST_START_MINUTES);

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;
        set_mode_600(config_path)?;

        Ok(())
    }

    pub fn ensure_bootstrap_files(&self) -> Result<()> {
        let root = Self::root_dir()?;
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create root directory: {}", root.display()))?;

        if let Some(parent) = self.db_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        fs::create_dir_all(&self.report_dir).with_context(|| {
            format!(
                "Failed to create report directory: {}",
                self.report_dir.display()
            )
        })?;

        Ok(())
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match normalize_config_key(key) {
            "owner" => {
                let owner = value.trim();
                if owner.is_empty() {
                    bail!("owner must not be empty");
                }
                self.owner = owner.to_string();
            }
            "db_path" => {
                self.db_path = expand_home(value);
            }
            "report_dir" => {
                self.report_dir = expand_home(value);
            }
            "api_port" => {
                self.api_port = value
                    .parse::<u16>()
                    .map_err(|_| anyhow!("api_port must be a number"))?;
            }
            "default_start_minutes" => {
                let minutes = parse_clock(value)
                    .ok_or_else(|| anyhow!("Invalid time format: {value}. Example: 06:00"))?;
                if minutes > LATEST_START_MINUTES {
                    bail!("default start time must not be later than 23:00");
                }
                self.default_start_minutes = minutes;
            }
            "summary_days" => {
                let days = value
                    .parse::<u32>()
                    .map_err(|_| anyhow!("summary_days must be a number"))?;
                if !(1..=MAX_SUMMARY_DAYS).contains(&days) {
                    bail!("summary_days must be between 1 and {MAX_SUMMARY_DAYS}");
                }
                self.summary_days = days;
            }
            _ => {
                bail!(
                    "Unsupported config key: {key}. Supported keys: owner|user.owner, db_path|db.path, report_dir|report.dir, api_port|api.port, default_start_minutes|day.start, summary_days|summary.days"
                );
            }
        }

        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Option<String> {
        match normalize_config_key(key) {
            "owner" => Some(self.owner.clone()),
            "db_path" => Some(self.db_path.display().to_string()),
            "report_dir" => Some(self.report_dir.display().to_string()),
            "api_port" => Some(self.api_port.to_string()),
            "default_start_minutes" => Some(format_clock(self.default_start_minutes)),
            "summary_days" => Some(self.summary_days.to_string()),
            _ => None,
        }
    }
}

fn normalize_config_key(key: &str) -> &str {
    match key {
        "owner" | "user.owner" => "owner",
        "db_path" | "db.path" => "db_path",
        "report_dir" | "report.dir" => "report_dir",
        "api_port" | "api.port" => "api_port",
        "default_start_minutes" | "day.start" => "default_start_minutes",
        "summary_days" | "summary.days" => "summary_days",
        _ => key,
    }
}

pub fn expand_home(raw: &str) -> PathBuf {
    raw.strip_prefix("~/")
        .and_then(|stripped| home_dir().map(|home| home.join(stripped)))
        .unwrap_or_else(|| PathBuf::from(raw))
}

fn default_root_dir() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn set_mode_600(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to set file permissions: {}", path.display()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_aliases_reach_the_same_field() {
        let mut config = Config::default();
        config.set_value("day.start", "07:30").expect("set start");
        config.set_value("summary_days", "14").expect("set days");

        assert_eq!(config.default_start_minutes, 450);
        assert_eq!(config.get_value("default_start_minutes").as_deref(), Some("07:30"));
        assert_eq!(config.get_value("summary.days").as_deref(), Some("14"));
        assert!(config.get_value("polling_seconds").is_none());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut config = Config::default();

        assert!(config.set_value("owner", "   ").is_err());
        assert!(config.set_value("day.start", "23:15").is_err());
        assert!(config.set_value("day.start", "6am").is_err());
        assert!(config.set_value("summary_days", "0").is_err());
        assert!(config.set_value("api.port", "seventy").is_err());
        assert!(config.set_value("theme", "dark").is_err());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, r#"{"owner":"sam","default_start_minutes":2000}"#).expect("write");

        let config = Config::load_from(&path).expect("load");
        assert_eq!(config.owner, "sam");
        assert_eq!(config.default_start_minutes, LATEST_START_MINUTES);
        assert_eq!(config.summary_days, DEFAULT_SUMMARY_DAYS);
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join(CONFIG_FILE);
        let config = Config {
            owner: "sam".to_string(),
            api_port: 9000,
            ..Config::default()
        };

        config.save_to(&path).expect("save");
        assert_eq!(Config::load_from(&path).expect("load"), config);

        #[cfg(unix)]
        {
            let mode = fs::metadata(&path).expect("metadata").permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }
}
