use crate::model::{Activity, ActivityId};
use serde::Serialize;

pub const DEFAULT_START_MINUTES: u32 = 360;
pub const LATEST_START_MINUTES: u32 = 1380;
pub const START_STEP_MINUTES: i32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScheduledWindow {
    pub activity_id: ActivityId,
    pub start_minutes: u32,
    pub end_minutes: u32,
}

impl ScheduledWindow {
    pub fn range_label(&self) -> String {
        format!(
            "{} - {}",
            format_clock(self.start_minutes),
            format_clock(self.end_minutes)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Timeline {
    pub start_minutes: u32,
    pub day_end_minutes: u32,
    pub windows: Vec<ScheduledWindow>,
}

impl Timeline {
    pub fn total_minutes(&self) -> u32 {
        self.day_end_minutes - self.start_minutes
    }

    pub fn total_hours(&self) -> f64 {
        f64::from(self.total_minutes()) / 60.0
    }

    pub fn window_for(&self, id: ActivityId) -> Option<&ScheduledWindow> {
        self.windows.iter().find(|window| window.activity_id == id)
    }
}

/// Lays the activities end to end from `start_minutes`.
pub fn build_timeline(activities: &[Activity], start_minutes: u32) -> Timeline {
    let mut cursor = start_minutes;
    let windows = activities
        .iter()
        .map(|activity| {
            let start = cursor;
            // Saturates for stored rows written before durations were capped.
            cursor = cursor.saturating_add(activity.duration_minutes);
            ScheduledWindow {
                activity_id: activity.id,
                start_minutes: start,
                end_minutes: cursor,
            }
        })
        .collect::<Vec<_>>();

    Timeline {
        start_minutes,
        day_end_minutes: cursor,
        windows,
    }
}

pub fn clamp_start(minutes: i64) -> u32 {
    minutes.clamp(0, i64::from(LATEST_START_MINUTES)) as u32
}

/// Hours are not wrapped, so a window running past midnight reads "25:00".
pub fn format_clock(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

pub fn format_duration(minutes: u32) -> String {
    let hours = minutes / 60;
    let mins = minutes % 60;

    match (hours, mins) {
        (0, _) => format!("{mins}m"),
        (_, 0) => format!("{hours}h"),
        _ => format!("{hours}h {mins}m"),
    }
}

pub fn parse_clock(raw: &str) -> Option<u32> {
    let (hours, minutes) = raw.trim().split_once(':')?;
    let hours = hours.parse::<u32>().ok()?;
    let minutes = minutes.parse::<u32>().ok()?;
    (hours < 24 && minutes < 60).then_some(hours * 60 + minutes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::IconTag;

    fn activity(id: i64, title: &str, duration_minutes: u32) -> Activity {
        Activity {
            id: ActivityId(id),
            title: title.to_string(),
            duration_minutes,
            icon_tag: IconTag::Target,
            color_tag: String::new(),
            sort_order: id,
            notes: String::new(),
        }
    }

    #[test]
    fn exercise_then_reading_from_six() {
        let activities = vec![activity(1, "Exercise", 60), activity(2, "Reading", 30)];
        let timeline = build_timeline(&activities, 360);

        let spans = timeline
            .windows
            .iter()
            .map(|window| (window.start_minutes, window.end_minutes))
            .collect::<Vec<_>>();
        assert_eq!(spans, vec![(360, 420), (420, 450)]);
        assert_eq!(timeline.windows[0].range_label(), "06:00 - 07:00");
        assert_eq!(timeline.windows[1].range_label(), "07:00 - 07:30");
        assert_eq!(timeline.day_end_minutes, 450);
        assert_eq!(timeline.total_minutes(), 90);
    }

    #[test]
    fn windows_are_contiguous_and_sized_by_duration() {
        let durations = [15, 45, 120, 30, 90, 15];
        let activities = durations
            .iter()
            .enumerate()
            .map(|(index, minutes)| activity(index as i64, "a", *minutes))
            .collect::<Vec<_>>();

        for start in [0, 360, 725, 1380] {
            let timeline = build_timeline(&activities, start);
            assert_eq!(timeline.windows.len(), activities.len());
            assert_eq!(timeline.windows[0].start_minutes, start);
            for (window, activity) in timeline.windows.iter().zip(&activities) {
                assert_eq!(
                    window.end_minutes - window.start_minutes,
                    activity.duration_minutes
                );
            }
            for pair in timeline.windows.windows(2) {
                assert_eq!(pair[1].start_minutes, pair[0].end_minutes);
            }
        }
    }

    #[test]
    fn oversized_durations_saturate_instead_of_wrapping() {
        let activities = vec![activity(1, "a", u32::MAX), activity(2, "b", 60)];
        let timeline = build_timeline(&activities, 360);

        assert_eq!(timeline.windows[0].start_minutes, 360);
        assert_eq!(timeline.windows[0].end_minutes, u32::MAX);
        assert_eq!(timeline.windows[1].start_minutes, u32::MAX);
        assert_eq!(timeline.day_end_minutes, u32::MAX);
        for pair in timeline.windows.windows(2) {
            assert!(pair[1].start_minutes >= pair[0].end_minutes);
        }
    }

    #[test]
    fn empty_list_keeps_day_end_at_start() {
        let timeline = build_timeline(&[], 480);
        assert!(timeline.windows.is_empty());
        assert_eq!(timeline.day_end_minutes, 480);
    }

    #[test]
    fn clock_and_duration_formatting() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(1500), "25:00");
        assert_eq!(format_duration(45), "45m");
        assert_eq!(format_duration(120), "2h");
        assert_eq!(format_duration(90), "1h 30m");
        assert_eq!(parse_clock("06:45"), Some(405));
        assert_eq!(parse_clock("24:00"), None);
    }

    #[test]
    fn start_is_clamped_to_eleven_pm() {
        assert_eq!(clamp_start(-15), 0);
        assert_eq!(clamp_start(1395), 1380);
        assert_eq!(clamp_start(375), 375);
    }
}
