pub mod analytics;
mod audio;
pub mod coach;
mod db;
pub mod export;
pub mod models;
pub mod notify;
pub mod settings;
pub mod store;
pub mod timer;

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use log::info;

use db::Database;
use notify::{ChimeNotifier, NotificationSink};
use settings::SettingsStore;
use store::TaskStore;
use timer::{clock::TokioClock, ClockSubscription, TimerEngine};

/// Initialize logging (reads RUST_LOG env var).
pub fn init_logging() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
}

/// Wires the stores, the engine, and the notification sink together from a
/// data directory. The timer state itself is rebuilt fresh on every start;
/// only tasks and settings are durable.
pub struct App {
    pub tasks: TaskStore,
    pub settings: SettingsStore,
    pub engine: TimerEngine,
    clock_subscription: Option<ClockSubscription>,
}

impl App {
    /// Open the application rooted at `data_dir`, creating it on first run.
    pub fn open(data_dir: &Path) -> Result<Self> {
        Self::open_with_sink(data_dir, Arc::new(ChimeNotifier::new()))
    }

    pub fn open_with_sink(data_dir: &Path, sink: Arc<dyn NotificationSink>) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let database = Database::new(data_dir.join("timekeep.sqlite3"))?;
        let tasks = TaskStore::load(database);
        let settings = SettingsStore::new(data_dir.join("settings.json"));
        let engine = TimerEngine::new(tasks.clone(), settings.clone(), sink);

        info!("timekeep ready, {} tasks loaded", tasks.snapshot().len());

        Ok(Self {
            tasks,
            settings,
            engine,
            clock_subscription: None,
        })
    }

    /// Start the 10 ms tick source driving the engine. Must be called from
    /// within a tokio runtime.
    pub fn start_clock(&mut self) {
        if self.clock_subscription.is_some() {
            return;
        }
        let clock = TokioClock::default_tick();
        self.clock_subscription = Some(self.engine.attach_clock(&clock));
    }

    /// Stop delivering ticks. Engine state is left as-is.
    pub fn stop_clock(&mut self) {
        self.clock_subscription = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::SilentSink;
    use std::path::PathBuf;

    fn test_data_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("timekeep-app-tests").join(name);
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn tasks_survive_a_restart() {
        let dir = test_data_dir("restart");

        let created = {
            let app = App::open_with_sink(&dir, Arc::new(SilentSink)).expect("open app");
            let task = app.tasks.create("write report").expect("create task");
            app.engine.start_task(task.id);
            for _ in 0..100 {
                app.engine.tick();
            }
            app.engine.stop();
            task
            // Dropping the app drains pending writes.
        };

        let app = App::open_with_sink(&dir, Arc::new(SilentSink)).expect("reopen app");
        let task = app.tasks.get(created.id).expect("task persisted");
        assert_eq!(task.time_spent_ms, 1_000);
        assert!(!task.is_active);
    }

    #[test]
    fn stale_active_flag_is_cleared_on_load() {
        let dir = test_data_dir("stale-active");

        {
            let app = App::open_with_sink(&dir, Arc::new(SilentSink)).expect("open app");
            let task = app.tasks.create("interrupted").expect("create task");
            // Simulate a crash mid-session: bound and never flushed.
            app.engine.start_task(task.id);
        }

        let app = App::open_with_sink(&dir, Arc::new(SilentSink)).expect("reopen app");
        assert!(app.tasks.active_task().is_none());
    }

    #[test]
    fn timer_state_is_rebuilt_fresh() {
        let dir = test_data_dir("fresh-state");

        {
            let app = App::open_with_sink(&dir, Arc::new(SilentSink)).expect("open app");
            app.engine.switch_mode(timer::TimerMode::Cycle);
            app.engine.start_or_resume();
        }

        let app = App::open_with_sink(&dir, Arc::new(SilentSink)).expect("reopen app");
        let state = app.engine.snapshot();
        assert_eq!(state.mode, timer::TimerMode::Stopwatch);
        assert!(!state.running);
        assert_eq!(state.counter_ms, 0);
    }
}
