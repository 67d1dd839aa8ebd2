use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use log::error;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use super::Database;
use crate::models::Task;

fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

fn parse_datetime(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| anyhow!("invalid datetime '{value}': {err}"))
}

fn row_to_task(row: &Row) -> Result<Task> {
    let id: String = row.get("id")?;
    let created_at: String = row.get("created_at")?;
    let time_spent_ms: i64 = row.get("time_spent_ms")?;

    Ok(Task {
        id: id
            .parse::<Uuid>()
            .map_err(|err| anyhow!("invalid task id '{id}': {err}"))?,
        title: row.get("title")?,
        completed: row.get("completed")?,
        time_spent_ms: u64::try_from(time_spent_ms)
            .map_err(|_| anyhow!("time_spent_ms contains negative value {time_spent_ms}"))?,
        is_active: row.get("is_active")?,
        created_at: parse_datetime(&created_at)?,
    })
}

impl Database {
    /// Read the full task list in stored order. Called once at startup.
    pub fn load_tasks(&self) -> Result<Vec<Task>> {
        self.call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, completed, time_spent_ms, is_active, created_at
                 FROM tasks
                 ORDER BY position ASC",
            )?;

            let mut rows = stmt.query([])?;
            let mut tasks = Vec::new();
            while let Some(row) = rows.next()? {
                tasks.push(row_to_task(row)?);
            }

            Ok(tasks)
        })
    }

    /// Overwrite the stored task list wholesale. Fire-and-forget: a fault is
    /// logged and the in-memory list stays authoritative.
    pub fn replace_tasks(&self, tasks: Vec<Task>) {
        self.submit(Box::new(move |conn| {
            if let Err(err) = write_all(conn, &tasks) {
                error!("failed to persist task list: {err:#}");
            }
        }));
    }
}

fn write_all(conn: &mut Connection, tasks: &[Task]) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM tasks", [])?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO tasks (id, title, completed, time_spent_ms, is_active, created_at, position)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for (position, task) in tasks.iter().enumerate() {
            stmt.execute(params![
                task.id.to_string(),
                task.title,
                task.completed,
                to_i64(task.time_spent_ms)?,
                task.is_active,
                task.created_at.to_rfc3339(),
                position as i64,
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}
