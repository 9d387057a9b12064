use crate::store::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MIN_DURATION_MINUTES: u32 = 15;
pub const MAX_DURATION_MINUTES: u32 = 1440;
pub const DURATION_STEP_MINUTES: i32 = 15;
pub const DEFAULT_DURATION_MINUTES: u32 = 60;
pub const MAX_TITLE_CHARS: usize = 100;
pub const MAX_NOTES_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityId(pub i64);

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ActivityId {
    type Err = std::num::ParseIntError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        raw.trim().parse::<i64>().map(Self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IconTag {
    Sun,
    Dumbbell,
    Briefcase,
    Code,
    Brain,
    TrendingUp,
    Target,
    Award,
    Clock,
    Zap,
}

impl IconTag {
    pub const ALL: [IconTag; 10] = [
        IconTag::Sun,
        IconTag::Dumbbell,
        IconTag::Briefcase,
        IconTag::Code,
        IconTag::Brain,
        IconTag::TrendingUp,
        IconTag::Target,
        IconTag::Award,
        IconTag::Clock,
        IconTag::Zap,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IconTag::Sun => "Sun",
            IconTag::Dumbbell => "Dumbbell",
            IconTag::Briefcase => "Briefcase",
            IconTag::Code => "Code",
            IconTag::Brain => "Brain",
            IconTag::TrendingUp => "TrendingUp",
            IconTag::Target => "Target",
            IconTag::Award => "Award",
            IconTag::Clock => "Clock",
            IconTag::Zap => "Zap",
        }
    }

    /// Stored tags outside the known set render as `Target`.
    pub fn from_stored(raw: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|icon| icon.as_str().eq_ignore_ascii_case(raw.trim()))
            .unwrap_or(IconTag::Target)
    }

    pub fn rotate(index: usize) -> Self {
        Self::ALL[index % Self::ALL.len()]
    }
}

pub const COLOR_PALETTE: [&str; 8] = [
    "bg-gradient-to-br from-amber-400 to-orange-500",
    "bg-gradient-to-br from-rose-400 to-pink-500",
    "bg-gradient-to-br from-sky-400 to-cyan-500",
    "bg-gradient-to-br from-emerald-400 to-green-500",
    "bg-gradient-to-br from-violet-400 to-purple-500",
    "bg-gradient-to-br from-pink-400 to-rose-500",
    "bg-gradient-to-br from-orange-400 to-red-500",
    "bg-gradient-to-br from-cyan-400 to-blue-500",
];

pub fn rotate_color(index: usize) -> &'static str {
    COLOR_PALETTE[index % COLOR_PALETTE.len()]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    pub title: String,
    pub duration_minutes: u32,
    pub icon_tag: IconTag,
    pub color_tag: String,
    pub sort_order: i64,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewActivity {
    pub title: String,
    pub duration_minutes: u32,
    pub icon_tag: IconTag,
    pub color_tag: String,
    pub sort_order: i64,
    pub notes: String,
}

impl NewActivity {
    pub fn validated(
        title: &str,
        duration_minutes: u32,
        notes: &str,
        icon_tag: IconTag,
        color_tag: &str,
        sort_order: i64,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            title: validate_title(title)?,
            duration_minutes: validate_duration(duration_minutes)?,
            icon_tag,
            color_tag: color_tag.to_string(),
            sort_order,
            notes: validate_notes(notes)?,
        })
    }

    pub fn into_activity(self, id: ActivityId) -> Activity {
        Activity {
            id,
            title: self.title,
            duration_minutes: self.duration_minutes,
            icon_tag: self.icon_tag,
            color_tag: self.color_tag,
            sort_order: self.sort_order,
            notes: self.notes,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityPatch {
    pub title: Option<String>,
    pub duration_minutes: Option<u32>,
    pub notes: Option<String>,
}

impl ActivityPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.duration_minutes.is_none() && self.notes.is_none()
    }

    pub fn validated(self) -> Result<Self, ValidationError> {
        Ok(Self {
            title: self.title.as_deref().map(validate_title).transpose()?,
            duration_minutes: self.duration_minutes.map(validate_duration).transpose()?,
            notes: self.notes.as_deref().map(validate_notes).transpose()?,
        })
    }

    pub fn apply_to(&self, activity: &mut Activity) {
        if let Some(title) = &self.title {
            activity.title = title.clone();
        }
        if let Some(duration) = self.duration_minutes {
            activity.duration_minutes = duration;
        }
        if let Some(notes) = &self.notes {
            activity.notes = notes.clone();
        }
    }
}

pub fn validate_title(raw: &str) -> Result<String, ValidationError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    let chars = title.chars().count();
    if chars > MAX_TITLE_CHARS {
        return Err(ValidationError::TitleTooLong(chars));
    }
    Ok(title.to_string())
}

pub fn validate_notes(raw: &str) -> Result<String, ValidationError> {
    let notes = raw.trim();
    let chars = notes.chars().count();
    if chars > MAX_NOTES_CHARS {
        return Err(ValidationError::NotesTooLong(chars));
    }
    Ok(notes.to_string())
}

pub fn validate_duration(minutes: u32) -> Result<u32, ValidationError> {
    if minutes < MIN_DURATION_MINUTES {
        return Err(ValidationError::DurationBelowFloor(minutes));
    }
    if minutes > MAX_DURATION_MINUTES {
        return Err(ValidationError::DurationAboveCeiling(minutes));
    }
    Ok(minutes)
}

pub fn adjusted_duration(current: u32, delta: i32) -> u32 {
    let next = i64::from(current) + i64::from(delta);
    let clamped = next.clamp(
        i64::from(MIN_DURATION_MINUTES),
        i64::from(MAX_DURATION_MINUTES),
    );
    u32::try_from(clamped).unwrap_or(MAX_DURATION_MINUTES)
}

pub struct SeedActivity {
    pub title: &'static str,
    pub duration_minutes: u32,
    pub icon_tag: IconTag,
    pub color_tag: &'static str,
}

pub fn default_seed() -> Vec<SeedActivity> {
    vec![
        SeedActivity {
            title: "Morning Messages & Meditation",
            duration_minutes: 30,
            icon_tag: IconTag::Sun,
            color_tag: COLOR_PALETTE[0],
        },
        SeedActivity {
            title: "Exercise",
            duration_minutes: 60,
            icon_tag: IconTag::Dumbbell,
            color_tag: COLOR_PALETTE[1],
        },
        SeedActivity {
            title: "Job Hunting",
            duration_minutes: 60,
            icon_tag: IconTag::Briefcase,
            color_tag: COLOR_PALETTE[2],
        },
        SeedActivity {
            title: "Selenium Automation Training",
            duration_minutes: 120,
            icon_tag: IconTag::Code,
            color_tag: COLOR_PALETTE[3],
        },
        SeedActivity {
            title: "ML Engineer Training",
            duration_minutes: 180,
            icon_tag: IconTag::Brain,
            color_tag: COLOR_PALETTE[4],
        },
        SeedActivity {
            title: "Business Development",
            duration_minutes: 120,
            icon_tag: IconTag::TrendingUp,
            color_tag: COLOR_PALETTE[5],
        },
    ]
}
