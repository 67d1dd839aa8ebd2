use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate};
use uuid::Uuid;

use crate::models::Task;

/// One local calendar day of tracked time with its 5-level heatmap
/// intensity. Level thresholds are percentage-of-maximum buckets:
/// 0, (0,25], (25,50], (50,75], (75,100].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeatmapDay {
    pub date: NaiveDate,
    pub total_ms: u64,
    pub level: u8,
}

/// Group tasks by the local calendar date they were created on, summing
/// tracked time per day. Purely a read of the snapshot.
pub fn daily_heatmap(tasks: &[Task]) -> Vec<HeatmapDay> {
    let mut totals: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for task in tasks {
        let date = task.created_at.with_timezone(&Local).date_naive();
        let entry = totals.entry(date).or_insert(0);
        *entry = entry.saturating_add(task.time_spent_ms);
    }

    let max = totals.values().copied().max().unwrap_or(0);
    totals
        .into_iter()
        .map(|(date, total_ms)| HeatmapDay {
            date,
            total_ms,
            level: intensity_level(total_ms, max),
        })
        .collect()
}

fn intensity_level(total_ms: u64, max_ms: u64) -> u8 {
    if total_ms == 0 || max_ms == 0 {
        return 0;
    }
    let percentage = total_ms as f64 / max_ms as f64 * 100.0;
    if percentage <= 25.0 {
        1
    } else if percentage <= 50.0 {
        2
    } else if percentage <= 75.0 {
        3
    } else {
        4
    }
}

/// A task's share of the total tracked time, ranked descending.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakdownEntry {
    pub task_id: Uuid,
    pub title: String,
    pub time_spent_ms: u64,
    pub percent: f64,
}

/// Rank tasks with tracked time by share of the grand total. Tasks with no
/// time are excluded, so the shares sum to at most 100%.
pub fn breakdown(tasks: &[Task]) -> Vec<BreakdownEntry> {
    let total: u64 = tasks.iter().map(|task| task.time_spent_ms).sum();

    let mut ranked: Vec<&Task> = tasks
        .iter()
        .filter(|task| task.time_spent_ms > 0)
        .collect();
    ranked.sort_by(|a, b| b.time_spent_ms.cmp(&a.time_spent_ms));

    ranked
        .into_iter()
        .map(|task| BreakdownEntry {
            task_id: task.id,
            title: task.title.clone(),
            time_spent_ms: task.time_spent_ms,
            percent: if total > 0 {
                task.time_spent_ms as f64 / total as f64 * 100.0
            } else {
                0.0
            },
        })
        .collect()
}

/// Headline totals: all time, today, and the current week (starting Sunday).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeTotals {
    pub total_ms: u64,
    pub today_ms: u64,
    pub week_ms: u64,
}

pub fn totals(tasks: &[Task], now: DateTime<Local>) -> TimeTotals {
    let today = now.date_naive();
    let week_start = today - Duration::days(i64::from(today.weekday().num_days_from_sunday()));

    let mut out = TimeTotals {
        total_ms: 0,
        today_ms: 0,
        week_ms: 0,
    };
    for task in tasks {
        let date = task.created_at.with_timezone(&Local).date_naive();
        out.total_ms += task.time_spent_ms;
        if date == today {
            out.today_ms += task.time_spent_ms;
        }
        if date >= week_start && date <= today {
            out.week_ms += task.time_spent_ms;
        }
    }
    out
}

/// Footer summary for a calendar year of heatmap days.
#[derive(Debug, Clone, PartialEq)]
pub struct YearlyActivity {
    pub hours: f64,
    pub active_days: usize,
}

pub fn yearly_activity(days: &[HeatmapDay], year: i32) -> YearlyActivity {
    let mut total_ms: u64 = 0;
    let mut active_days = 0;
    for day in days.iter().filter(|day| day.date.year() == year) {
        total_ms += day.total_ms;
        if day.total_ms > 0 {
            active_days += 1;
        }
    }
    YearlyActivity {
        hours: total_ms as f64 / 3_600_000.0,
        active_days,
    }
}
