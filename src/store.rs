use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use log::warn;
use uuid::Uuid;

use crate::{db::Database, models::Task};

/// Ordered collection of tasks with wholesale fire-and-forget persistence.
///
/// Owns the two invariants the analytics and timer layers rely on: at most
/// one task is active at a time, and `time_spent_ms` never decreases short
/// of deleting the record. Mutations that interact with a live stopwatch
/// session (`delete`, `flush`, `bind`, `unbind`) are crate-internal and are
/// reached through `TimerEngine`.
#[derive(Clone)]
pub struct TaskStore {
    tasks: Arc<Mutex<Vec<Task>>>,
    db: Option<Database>,
}

impl TaskStore {
    /// Load the persisted list. A read fault falls back to an empty list; a
    /// stale active flag left by a crashed session is cleared, since a
    /// stopwatch binding never survives the process that created it.
    pub fn load(db: Database) -> Self {
        let mut tasks = match db.load_tasks() {
            Ok(tasks) => tasks,
            Err(err) => {
                warn!("failed to load tasks, starting empty: {err:#}");
                Vec::new()
            }
        };

        let mut cleared_stale = false;
        for task in &mut tasks {
            if task.is_active {
                task.is_active = false;
                cleared_stale = true;
            }
        }

        let store = Self {
            tasks: Arc::new(Mutex::new(tasks)),
            db: Some(db),
        };
        if cleared_stale {
            warn!("cleared stale active flag left by a previous session");
            store.persist();
        }
        store
    }

    /// Store without durable backing; used by tests and embedders that bring
    /// their own persistence.
    pub fn ephemeral() -> Self {
        Self {
            tasks: Arc::new(Mutex::new(Vec::new())),
            db: None,
        }
    }

    pub fn create(&self, title: &str) -> Result<Task> {
        let Some(task) = Task::new(title, Utc::now()) else {
            bail!("task title must not be empty");
        };
        self.tasks.lock().unwrap().push(task.clone());
        self.persist();
        Ok(task)
    }

    pub fn toggle_completed(&self, id: Uuid) {
        {
            let mut tasks = self.tasks.lock().unwrap();
            let Some(task) = tasks.iter_mut().find(|task| task.id == id) else {
                return;
            };
            task.completed = !task.completed;
        }
        self.persist();
    }

    pub(crate) fn delete(&self, id: Uuid) {
        self.tasks.lock().unwrap().retain(|task| task.id != id);
        self.persist();
    }

    /// Commit stopwatch time into the task's durable total and release the
    /// binding. The single commit path for stopwatch time.
    pub(crate) fn flush(&self, id: Uuid, elapsed_ms: u64) {
        {
            let mut tasks = self.tasks.lock().unwrap();
            let Some(task) = tasks.iter_mut().find(|task| task.id == id) else {
                return;
            };
            task.time_spent_ms = task.time_spent_ms.saturating_add(elapsed_ms);
            task.is_active = false;
        }
        self.persist();
    }

    /// Mark `id` as the active task. Sweeps every other flag off so the
    /// single-active invariant holds even if a stale flag slipped through.
    pub(crate) fn bind(&self, id: Uuid) {
        {
            let mut tasks = self.tasks.lock().unwrap();
            for task in tasks.iter_mut() {
                task.is_active = task.id == id;
            }
        }
        self.persist();
    }

    pub(crate) fn unbind(&self, id: Uuid) {
        {
            let mut tasks = self.tasks.lock().unwrap();
            let Some(task) = tasks.iter_mut().find(|task| task.id == id) else {
                return;
            };
            task.is_active = false;
        }
        self.persist();
    }

    /// Append the synthetic record for a completed focus phase.
    pub(crate) fn append_completed(&self, title: String, duration_ms: u64, created_at: DateTime<Utc>) {
        {
            let mut tasks = self.tasks.lock().unwrap();
            tasks.push(Task {
                id: Uuid::new_v4(),
                title,
                completed: true,
                time_spent_ms: duration_ms,
                is_active: false,
                created_at,
            });
        }
        self.persist();
    }

    pub fn get(&self, id: Uuid) -> Option<Task> {
        self.tasks.lock().unwrap().iter().find(|task| task.id == id).cloned()
    }

    /// Point-in-time copy for the read-only consumers (analytics, export,
    /// coach). No back-pressure on the engine.
    pub fn snapshot(&self) -> Vec<Task> {
        self.tasks.lock().unwrap().clone()
    }

    pub fn active_task(&self) -> Option<Task> {
        self.tasks.lock().unwrap().iter().find(|task| task.is_active).cloned()
    }

    fn persist(&self) {
        if let Some(db) = &self.db {
            db.replace_tasks(self.tasks.lock().unwrap().clone());
        }
    }
}
