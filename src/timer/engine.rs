use std::sync::{Arc, Mutex};

use chrono::Utc;
use log::debug;
use uuid::Uuid;

use super::{
    clock::{Clock, ClockSubscription, TICK_MS},
    state::{CyclePhase, Effect, ModeSwitchPolicy, TimerMode, TimerState},
};
use crate::{
    notify::NotificationSink,
    settings::{CycleSettings, SettingsStore},
    store::TaskStore,
};

/// Owns the timer state and applies the commands the state machine emits
/// against the task store and the notification sink.
///
/// Transitions are serialized by the state mutex and run to completion
/// before the next event is processed; effects are applied after the lock
/// is released. Invalid transitions are silent no-ops, matching the
/// engine-boundary contract.
#[derive(Clone)]
pub struct TimerEngine {
    state: Arc<Mutex<TimerState>>,
    tasks: TaskStore,
    settings: SettingsStore,
    sink: Arc<dyn NotificationSink>,
    mode_switch_policy: ModeSwitchPolicy,
}

impl TimerEngine {
    pub fn new(tasks: TaskStore, settings: SettingsStore, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            state: Arc::new(Mutex::new(TimerState::new())),
            tasks,
            settings,
            sink,
            mode_switch_policy: ModeSwitchPolicy::default(),
        }
    }

    pub fn with_mode_switch_policy(mut self, policy: ModeSwitchPolicy) -> Self {
        self.mode_switch_policy = policy;
        self
    }

    /// Drive this engine from a tick source. The subscription stops the
    /// callbacks when dropped.
    pub fn attach_clock(&self, clock: &dyn Clock) -> ClockSubscription {
        let engine = self.clone();
        clock.subscribe(Box::new(move || engine.tick()))
    }

    pub fn snapshot(&self) -> TimerState {
        self.state.lock().unwrap().clone()
    }

    pub fn tasks(&self) -> &TaskStore {
        &self.tasks
    }

    /// Apply one clock delta. Public so a clock callback can reach it; a
    /// halted or paused engine ignores the tick.
    pub fn tick(&self) {
        let settings = self.settings.cycle();
        let effects = self.state.lock().unwrap().tick(TICK_MS, &settings);
        self.apply(effects, &settings);
    }

    /// Bind a task and start timing it, flushing any previous binding first.
    pub fn start_task(&self, task_id: Uuid) {
        if self.tasks.get(task_id).is_none() {
            debug!("ignoring start for unknown task {task_id}");
            return;
        }
        let settings = self.settings.cycle();
        let effects = self.state.lock().unwrap().start_task(task_id);
        self.apply(effects, &settings);
    }

    pub fn start_or_resume(&self) {
        let settings = self.settings.cycle();
        self.state.lock().unwrap().start_or_resume(&settings);
    }

    pub fn toggle_pause(&self) {
        self.state.lock().unwrap().toggle_pause();
    }

    pub fn stop(&self) {
        let settings = self.settings.cycle();
        let effects = self.state.lock().unwrap().stop(&settings);
        self.apply(effects, &settings);
    }

    pub fn skip_break(&self) {
        let settings = self.settings.cycle();
        self.state.lock().unwrap().skip_break(&settings);
    }

    pub fn switch_mode(&self, mode: TimerMode) {
        let settings = self.settings.cycle();
        let effects = self
            .state
            .lock()
            .unwrap()
            .switch_mode(mode, &settings, self.mode_switch_policy);
        self.apply(effects, &settings);
    }

    /// Persist new cycle settings. An idle counter follows the new duration
    /// immediately; a running phase picks it up at the next boundary.
    pub fn apply_settings(&self, settings: CycleSettings) {
        self.settings.save(settings);
        let sanitized = self.settings.cycle();
        self.state.lock().unwrap().settings_changed(&sanitized);
    }

    /// Delete a task. If it is bound to the stopwatch the session is
    /// cancelled outright and the partial time discarded.
    pub fn delete_task(&self, task_id: Uuid) {
        self.state.lock().unwrap().cancel_binding(task_id);
        self.tasks.delete(task_id);
    }

    fn apply(&self, effects: Vec<Effect>, settings: &CycleSettings) {
        for effect in effects {
            match effect {
                Effect::Flush {
                    task_id,
                    elapsed_ms,
                } => self.tasks.flush(task_id, elapsed_ms),
                Effect::Bind { task_id } => self.tasks.bind(task_id),
                Effect::Unbind { task_id } => self.tasks.unbind(task_id),
                Effect::AppendFocusRecord {
                    ordinal,
                    duration_ms,
                } => self
                    .tasks
                    .append_completed(format!("Focus Session #{ordinal}"), duration_ms, Utc::now()),
                Effect::Notify {
                    completed,
                    entering,
                } => self.notify(completed, entering, settings),
            }
        }
    }

    fn notify(&self, completed: CyclePhase, entering: CyclePhase, settings: &CycleSettings) {
        if settings.sound_on_phase_end {
            self.sink.chime();
        }
        if settings.desktop_alerts {
            let message = match (completed, entering) {
                (CyclePhase::Focus, CyclePhase::LongBreak) => {
                    "Focus session complete. Time for a long break."
                }
                (CyclePhase::Focus, _) => "Focus session complete. Time for a short break.",
                _ => "Break finished. Ready to focus.",
            };
            self.sink.alert(message);
        }
    }
}
