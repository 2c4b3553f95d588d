use crate::domain::logic::{local_date, local_midnight};
use crate::domain::models::{StudyDay, Subject};
use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;

const WEEKDAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DailyCount {
    pub day: &'static str,
    pub completed: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SubjectCount {
    pub subject: Subject,
    pub completed: usize,
    pub total: usize,
}

/// Completion figures for the Sunday-started week containing "now".
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WeeklyAnalytics {
    pub week_start: NaiveDate,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub completion_rate: u32,
    pub daily: Vec<DailyCount>,
    pub subject_breakdown: Vec<SubjectCount>,
}

pub fn week_start(today: NaiveDate) -> NaiveDate {
    today
        .checked_sub_days(Days::new(u64::from(today.weekday().num_days_from_sunday())))
        .unwrap_or(today)
}

pub fn compute_weekly_analytics(
    days: &[StudyDay],
    now: DateTime<Utc>,
    timezone: Tz,
) -> WeeklyAnalytics {
    let start_date = week_start(local_date(now, timezone));
    let end_date = start_date
        .checked_add_days(Days::new(7))
        .unwrap_or(start_date);
    let window_start = local_midnight(start_date, timezone);
    let window_end = local_midnight(end_date, timezone);

    let week_days = days
        .iter()
        .filter(|day| day.date >= window_start && day.date < window_end)
        .collect::<Vec<_>>();

    let total_tasks = week_days.iter().map(|day| day.tasks.len()).sum::<usize>();
    let completed_tasks = week_days.iter().map(|day| day.done_count()).sum::<usize>();
    let completion_rate = if total_tasks > 0 {
        (completed_tasks as f64 / total_tasks as f64 * 100.0).round() as u32
    } else {
        0
    };

    let daily = WEEKDAY_LABELS
        .into_iter()
        .enumerate()
        .map(|(offset, label)| {
            let date = start_date
                .checked_add_days(Days::new(offset as u64))
                .unwrap_or(start_date);
            // first stored day on that date wins, duplicates are not summed
            let matched = week_days
                .iter()
                .find(|day| local_date(day.date, timezone) == date);
            DailyCount {
                day: label,
                completed: matched.map(|day| day.done_count()).unwrap_or(0),
                total: matched.map(|day| day.tasks.len()).unwrap_or(0),
            }
        })
        .collect();

    let mut subject_breakdown: Vec<SubjectCount> = Vec::new();
    for task in week_days.iter().flat_map(|day| day.tasks.iter()) {
        let entry = match subject_breakdown
            .iter()
            .position(|entry| entry.subject == task.subject)
        {
            Some(position) => &mut subject_breakdown[position],
            None => {
                subject_breakdown.push(SubjectCount {
                    subject: task.subject,
                    completed: 0,
                    total: 0,
                });
                let last = subject_breakdown.len() - 1;
                &mut subject_breakdown[last]
            }
        };
        entry.total += 1;
        if task.done {
            entry.completed += 1;
        }
    }
    // stable: subjects with equal totals keep first-seen order
    subject_breakdown.sort_by(|left, right| right.total.cmp(&left.total));

    WeeklyAnalytics {
        week_start: start_date,
        total_tasks,
        completed_tasks,
        completion_rate,
        daily,
        subject_breakdown,
    }
}
