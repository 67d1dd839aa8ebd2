use chrono::{DateTime, Local, Utc};

use crate::models::Task;

const HEADER: &str = "Task Title,Time Spent (HH:MM:SS),Completed,Date Created";

/// Render a duration as zero-padded `HH:MM:SS`, truncating sub-second time.
pub fn format_hms(ms: u64) -> String {
    let total_seconds = ms / 1000;
    format!(
        "{:02}:{:02}:{:02}",
        total_seconds / 3600,
        (total_seconds % 3600) / 60,
        total_seconds % 60
    )
}

fn format_created_at(created_at: DateTime<Utc>) -> String {
    created_at
        .with_timezone(&Local)
        .format("%-m/%-d/%Y")
        .to_string()
}

fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// On-demand dump of the task snapshot to delimited text. Read-only; the
/// caller decides where the bytes go.
pub fn tasks_to_csv(tasks: &[Task]) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');
    for task in tasks {
        out.push_str(&format!(
            "{},{},{},{}\n",
            csv_field(&task.title),
            format_hms(task.time_spent_ms),
            if task.completed { "Yes" } else { "No" },
            format_created_at(task.created_at),
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn sample_task() -> Task {
        Task {
            id: Uuid::new_v4(),
            title: "A".to_string(),
            completed: true,
            time_spent_ms: 3_661_000,
            is_active: false,
            created_at: DateTime::parse_from_rfc3339("2026-08-07T12:00:00Z")
                .expect("valid datetime")
                .with_timezone(&Utc),
        }
    }

    #[test]
    fn format_hms_carries_hours_minutes_seconds() {
        assert_eq!(format_hms(3_661_000), "01:01:01");
        assert_eq!(format_hms(0), "00:00:00");
        assert_eq!(format_hms(59_999), "00:00:59");
        assert_eq!(format_hms(90_061_000), "25:01:01");
    }

    #[test]
    fn export_row_formats_time_and_completion() {
        let csv = tasks_to_csv(&[sample_task()]);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("Task Title,Time Spent (HH:MM:SS),Completed,Date Created")
        );

        let row = lines.next().expect("data row");
        let columns: Vec<&str> = row.split(',').collect();
        assert_eq!(columns[0], "\"A\"");
        assert_eq!(columns[1], "01:01:01");
        assert_eq!(columns[2], "Yes");
    }

    #[test]
    fn incomplete_task_reads_no() {
        let mut task = sample_task();
        task.completed = false;
        task.time_spent_ms = 0;

        let csv = tasks_to_csv(&[task]);
        let row = csv.lines().nth(1).expect("data row");
        assert!(row.contains(",00:00:00,No,"));
    }

    #[test]
    fn titles_with_quotes_are_escaped() {
        let mut task = sample_task();
        task.title = "say \"hi\"".to_string();

        let csv = tasks_to_csv(&[task]);
        assert!(csv.contains("\"say \"\"hi\"\"\""));
    }
}
