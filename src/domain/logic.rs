use crate::domain::models::{StudyDay, Task};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Streak days roll over at midnight India Standard Time, whatever the configured local zone.
pub const STREAK_TIMEZONE: Tz = chrono_tz::Asia::Kolkata;

const STREAK_DATE_FORMAT: &str = "%Y-%m-%d";

/// Stable sort: High before Moderate before Low, insertion order kept within a priority.
pub fn sort_tasks_by_priority(mut tasks: Vec<Task>) -> Vec<Task> {
    tasks.sort_by_key(|task| task.priority.rank());
    tasks
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XpSummary {
    pub total_xp: f64,
    pub completed_xp: f64,
}

pub fn xp_summary(day: &StudyDay) -> XpSummary {
    day.tasks.iter().fold(
        XpSummary {
            total_xp: 0.0,
            completed_xp: 0.0,
        },
        |mut summary, task| {
            let xp = task.xp_value();
            summary.total_xp += xp;
            if task.done {
                summary.completed_xp += xp;
            }
            summary
        },
    )
}

/// Completion percentage in `[0, 100]`, XP-weighted when any task carries XP.
pub fn calculate_day_progress(day: &StudyDay) -> f64 {
    if day.tasks.is_empty() {
        return 0.0;
    }

    let summary = xp_summary(day);
    if summary.total_xp > 0.0 {
        return summary.completed_xp / summary.total_xp * 100.0;
    }

    day.done_count() as f64 / day.tasks.len() as f64 * 100.0
}

pub fn local_date(instant: DateTime<Utc>, timezone: Tz) -> NaiveDate {
    instant.with_timezone(&timezone).date_naive()
}

/// First instant of `date` in `timezone`.
pub fn local_midnight(date: NaiveDate, timezone: Tz) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    timezone
        .from_local_datetime(&naive)
        .earliest()
        .map(|value| value.with_timezone(&Utc))
        // a DST gap swallowed midnight; the day starts one hour later
        .or_else(|| {
            timezone
                .from_local_datetime(&(naive + Duration::hours(1)))
                .earliest()
                .map(|value| value.with_timezone(&Utc))
        })
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

pub fn get_next_date(days: &[StudyDay], now: DateTime<Utc>, timezone: Tz) -> DateTime<Utc> {
    let Some(last) = days.last() else {
        return local_midnight(local_date(now, timezone), timezone);
    };
    let last_date = local_date(last.date, timezone);
    let next_date = last_date.succ_opt().unwrap_or(last_date);
    local_midnight(next_date, timezone)
}

/// Long-form day label, e.g. `Monday, October 19, 2026`.
pub fn format_date(instant: DateTime<Utc>, timezone: Tz) -> String {
    instant
        .with_timezone(&timezone)
        .format("%A, %B %-d, %Y")
        .to_string()
}

pub fn is_same_day(left: DateTime<Utc>, right: DateTime<Utc>, timezone: Tz) -> bool {
    local_date(left, timezone) == local_date(right, timezone)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreakUpdate {
    pub new_streak: u32,
    pub today: String,
}

pub fn ist_date_string(instant: DateTime<Utc>) -> String {
    instant
        .with_timezone(&STREAK_TIMEZONE)
        .format(STREAK_DATE_FORMAT)
        .to_string()
}

pub fn update_engagement_streak(
    last_visit_day: Option<&str>,
    current_streak: u32,
    now: DateTime<Utc>,
) -> StreakUpdate {
    let today = ist_date_string(now);
    let Some(last_visit_day) = last_visit_day.map(str::trim).filter(|value| !value.is_empty())
    else {
        return StreakUpdate {
            new_streak: 1,
            today,
        };
    };

    if last_visit_day == today {
        return StreakUpdate {
            new_streak: current_streak,
            today,
        };
    }

    let yesterday = ist_date_string(now - Duration::hours(24));
    let new_streak = if last_visit_day == yesterday {
        current_streak.saturating_add(1)
    } else {
        1
    };
    StreakUpdate { new_streak, today }
}
