use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::settings::CycleSettings;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TimerMode {
    Stopwatch,
    Cycle,
}

impl Default for TimerMode {
    fn default() -> Self {
        TimerMode::Stopwatch
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CyclePhase {
    Focus,
    ShortBreak,
    LongBreak,
}

impl Default for CyclePhase {
    fn default() -> Self {
        CyclePhase::Focus
    }
}

impl CyclePhase {
    pub fn is_break(self) -> bool {
        !matches!(self, CyclePhase::Focus)
    }
}

/// What a transition asks the surrounding engine to do. The state machine
/// itself never touches the task store or the notification sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Commit `elapsed_ms` into the task's durable total and release it.
    Flush { task_id: Uuid, elapsed_ms: u64 },
    /// Mark the task as the one bound to the stopwatch.
    Bind { task_id: Uuid },
    /// Release the task without committing any time.
    Unbind { task_id: Uuid },
    /// Append the synthetic completed record for a finished focus phase.
    AppendFocusRecord { ordinal: u32, duration_ms: u64 },
    /// Signal the notification sink at a phase boundary.
    Notify {
        completed: CyclePhase,
        entering: CyclePhase,
    },
}

/// What happens to an unflushed stopwatch counter on a bare mode switch.
///
/// By default it is discarded; flushing only ever happens through an
/// explicit Stop or a task switch. `FlushToTask` is available for callers
/// that consider the discard an oversight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeSwitchPolicy {
    DiscardUnflushed,
    FlushToTask,
}

impl Default for ModeSwitchPolicy {
    fn default() -> Self {
        ModeSwitchPolicy::DiscardUnflushed
    }
}

/// Ephemeral timer state, rebuilt fresh at every process start.
///
/// `counter_ms` counts up in stopwatch mode and down in cycle mode. Being
/// unsigned, it can never go negative; the boundary tick clamps at zero
/// before the phase completes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub mode: TimerMode,
    pub running: bool,
    pub paused: bool,
    pub counter_ms: u64,
    pub phase: CyclePhase,
    /// Duration the current cycle phase was entered with. A settings edit
    /// mid-phase neither truncates nor extends the phase in flight, and the
    /// completed focus record carries this value, not the latest setting.
    pub phase_total_ms: u64,
    pub completed_focus_count: u32,
    pub bound_task_id: Option<Uuid>,
}

impl Default for TimerState {
    fn default() -> Self {
        Self {
            mode: TimerMode::Stopwatch,
            running: false,
            paused: false,
            counter_ms: 0,
            phase: CyclePhase::Focus,
            phase_total_ms: 0,
            completed_focus_count: 0,
            bound_task_id: None,
        }
    }
}

impl TimerState {
    pub fn new() -> Self {
        Self::default()
    }

    fn phase_duration(phase: CyclePhase, settings: &CycleSettings) -> u64 {
        let ms = match phase {
            CyclePhase::Focus => settings.focus_ms,
            CyclePhase::ShortBreak => settings.short_break_ms,
            CyclePhase::LongBreak => settings.long_break_ms,
        };
        ms.max(1)
    }

    /// Advance by one delta. Only moves while running and not paused; in
    /// cycle mode a counter reaching zero completes the phase in the same
    /// call.
    pub fn tick(&mut self, delta_ms: u64, settings: &CycleSettings) -> Vec<Effect> {
        let mut effects = Vec::new();
        if !self.running || self.paused {
            return effects;
        }

        match self.mode {
            TimerMode::Stopwatch => {
                self.counter_ms = self.counter_ms.saturating_add(delta_ms);
            }
            TimerMode::Cycle => {
                debug_assert!(
                    self.counter_ms <= self.phase_total_ms,
                    "cycle counter above the phase it was entered with"
                );
                self.counter_ms = self.counter_ms.saturating_sub(delta_ms);
                if self.counter_ms == 0 {
                    self.complete_phase(settings, &mut effects);
                }
            }
        }
        effects
    }

    /// Bind a task to the stopwatch and begin timing it. If another task is
    /// already bound its elapsed time is flushed first, so no instant is
    /// ever counted twice.
    pub fn start_task(&mut self, task_id: Uuid) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.mode != TimerMode::Stopwatch {
            return effects;
        }

        if let Some(previous) = self.bound_task_id {
            effects.push(Effect::Flush {
                task_id: previous,
                elapsed_ms: self.counter_ms,
            });
        }

        self.bound_task_id = Some(task_id);
        effects.push(Effect::Bind { task_id });
        self.counter_ms = 0;
        self.running = true;
        self.paused = false;
        effects
    }

    /// Begin running, or clear a pause. Refused as a no-op in stopwatch mode
    /// while no task is bound.
    pub fn start_or_resume(&mut self, settings: &CycleSettings) {
        if self.running {
            self.paused = false;
            return;
        }

        if self.mode == TimerMode::Stopwatch && self.bound_task_id.is_none() {
            return;
        }

        if self.mode == TimerMode::Cycle && self.counter_ms == 0 {
            self.phase_total_ms = Self::phase_duration(self.phase, settings);
            self.counter_ms = self.phase_total_ms;
        }

        self.running = true;
        self.paused = false;
    }

    /// Freeze or unfreeze the counter. Pausing never flushes.
    pub fn toggle_pause(&mut self) {
        if self.running {
            self.paused = !self.paused;
        }
    }

    /// In stopwatch mode, flush the bound task and reset. In cycle mode,
    /// fall back to an idle focus phase without touching any task.
    pub fn stop(&mut self, settings: &CycleSettings) -> Vec<Effect> {
        let mut effects = Vec::new();
        match self.mode {
            TimerMode::Stopwatch => {
                if let Some(task_id) = self.bound_task_id.take() {
                    effects.push(Effect::Flush {
                        task_id,
                        elapsed_ms: self.counter_ms,
                    });
                }
                self.counter_ms = 0;
            }
            TimerMode::Cycle => {
                self.phase = CyclePhase::Focus;
                self.phase_total_ms = Self::phase_duration(CyclePhase::Focus, settings);
                self.counter_ms = self.phase_total_ms;
            }
        }
        self.running = false;
        self.paused = false;
        effects
    }

    /// Jump from a break straight back to an idle focus phase. No-op while
    /// focused; the user must explicitly restart afterwards.
    pub fn skip_break(&mut self, settings: &CycleSettings) {
        if self.mode != TimerMode::Cycle || self.phase == CyclePhase::Focus {
            return;
        }
        self.phase = CyclePhase::Focus;
        self.phase_total_ms = Self::phase_duration(CyclePhase::Focus, settings);
        self.counter_ms = self.phase_total_ms;
        self.running = false;
        self.paused = false;
    }

    /// Change timing modes. A no-op when the mode is unchanged; otherwise the
    /// current session ends according to `policy` and the counter resets for
    /// the new mode. `completed_focus_count` survives.
    pub fn switch_mode(
        &mut self,
        mode: TimerMode,
        settings: &CycleSettings,
        policy: ModeSwitchPolicy,
    ) -> Vec<Effect> {
        let mut effects = Vec::new();
        if mode == self.mode {
            return effects;
        }

        if let Some(task_id) = self.bound_task_id.take() {
            match policy {
                ModeSwitchPolicy::FlushToTask => effects.push(Effect::Flush {
                    task_id,
                    elapsed_ms: self.counter_ms,
                }),
                ModeSwitchPolicy::DiscardUnflushed => {
                    effects.push(Effect::Unbind { task_id })
                }
            }
        }

        self.mode = mode;
        self.running = false;
        self.paused = false;
        self.phase = CyclePhase::Focus;
        match mode {
            TimerMode::Stopwatch => {
                self.counter_ms = 0;
                self.phase_total_ms = 0;
            }
            TimerMode::Cycle => {
                self.phase_total_ms = Self::phase_duration(CyclePhase::Focus, settings);
                self.counter_ms = self.phase_total_ms;
            }
        }
        effects
    }

    /// React to a settings save. A running phase keeps the duration it was
    /// entered with; only an idle cycle counter is re-initialized.
    pub fn settings_changed(&mut self, settings: &CycleSettings) {
        if self.running {
            return;
        }
        if self.mode == TimerMode::Cycle {
            self.phase_total_ms = Self::phase_duration(self.phase, settings);
            self.counter_ms = self.phase_total_ms;
        }
    }

    /// The bound task is being deleted: cancel the session outright. The
    /// partial counter is discarded, never attributed to the removed record.
    pub fn cancel_binding(&mut self, task_id: Uuid) {
        if self.bound_task_id != Some(task_id) {
            return;
        }
        self.bound_task_id = None;
        self.counter_ms = 0;
        self.running = false;
        self.paused = false;
    }

    fn complete_phase(&mut self, settings: &CycleSettings, effects: &mut Vec<Effect>) {
        let completed = self.phase;
        let mut record = None;

        let next = if completed == CyclePhase::Focus {
            self.completed_focus_count += 1;
            record = Some(Effect::AppendFocusRecord {
                ordinal: self.completed_focus_count,
                duration_ms: self.phase_total_ms,
            });
            let per_long = settings.sessions_per_long_break.max(1);
            if self.completed_focus_count % per_long == 0 {
                CyclePhase::LongBreak
            } else {
                CyclePhase::ShortBreak
            }
        } else {
            CyclePhase::Focus
        };

        effects.push(Effect::Notify {
            completed,
            entering: next,
        });
        if let Some(record) = record {
            effects.push(record);
        }

        self.phase = next;
        self.phase_total_ms = Self::phase_duration(next, settings);
        debug_assert!(self.phase_total_ms > 0, "phase entered with zero duration");
        self.counter_ms = self.phase_total_ms;
        self.running = if next.is_break() {
            settings.auto_start_breaks
        } else {
            settings.auto_start_focus
        };
        self.paused = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pomodoro_settings() -> CycleSettings {
        CycleSettings {
            focus_ms: 1_500_000,
            short_break_ms: 300_000,
            long_break_ms: 900_000,
            sessions_per_long_break: 4,
            auto_start_breaks: false,
            auto_start_focus: false,
            sound_on_phase_end: true,
            desktop_alerts: true,
        }
    }

    fn small_settings() -> CycleSettings {
        CycleSettings {
            focus_ms: 100,
            short_break_ms: 30,
            long_break_ms: 50,
            sessions_per_long_break: 4,
            auto_start_breaks: false,
            auto_start_focus: false,
            sound_on_phase_end: true,
            desktop_alerts: true,
        }
    }

    fn cycle_state(settings: &CycleSettings) -> TimerState {
        let mut state = TimerState::new();
        state.switch_mode(TimerMode::Cycle, settings, ModeSwitchPolicy::default());
        state
    }

    /// Restart if halted and tick until the next phase boundary fires.
    fn run_to_boundary(state: &mut TimerState, settings: &CycleSettings) -> Vec<Effect> {
        state.start_or_resume(settings);
        assert!(state.running, "state should be running before the boundary");
        loop {
            let effects = state.tick(10, settings);
            if !effects.is_empty() {
                return effects;
            }
        }
    }

    #[test]
    fn cycle_arithmetic_long_break_every_fourth_focus() {
        let settings = pomodoro_settings();
        let mut state = cycle_state(&settings);

        let mut entered = Vec::new();
        // 4 focus completions with the 3 short breaks between them.
        for _ in 0..7 {
            run_to_boundary(&mut state, &settings);
            entered.push(state.phase);
        }

        assert_eq!(
            entered,
            vec![
                CyclePhase::ShortBreak,
                CyclePhase::Focus,
                CyclePhase::ShortBreak,
                CyclePhase::Focus,
                CyclePhase::ShortBreak,
                CyclePhase::Focus,
                CyclePhase::LongBreak,
            ]
        );
        assert_eq!(state.completed_focus_count, 4);
    }

    #[test]
    fn boundary_tick_never_goes_negative() {
        let settings = pomodoro_settings();
        let mut state = cycle_state(&settings);
        state.start_or_resume(&settings);

        // Force an uneven remainder smaller than one delta.
        state.counter_ms = 5;
        let effects = state.tick(10, &settings);

        assert!(effects
            .iter()
            .any(|effect| matches!(effect, Effect::Notify { .. })));
        assert_eq!(state.phase, CyclePhase::ShortBreak);
        // The counter clamped to zero at the boundary and was re-initialized
        // for the entered phase.
        assert_eq!(state.counter_ms, settings.short_break_ms);
    }

    #[test]
    fn focus_completion_appends_record_with_entered_duration() {
        let settings = small_settings();
        let mut state = cycle_state(&settings);

        let effects = run_to_boundary(&mut state, &settings);
        assert!(effects.contains(&Effect::AppendFocusRecord {
            ordinal: 1,
            duration_ms: settings.focus_ms,
        }));
    }

    #[test]
    fn auto_continue_follows_the_entering_phase_flag() {
        let mut settings = small_settings();
        settings.auto_start_breaks = false;
        let mut state = cycle_state(&settings);
        run_to_boundary(&mut state, &settings);
        assert_eq!(state.phase, CyclePhase::ShortBreak);
        assert!(!state.running);

        settings.auto_start_breaks = true;
        let mut state = cycle_state(&settings);
        run_to_boundary(&mut state, &settings);
        assert_eq!(state.phase, CyclePhase::ShortBreak);
        assert!(state.running);
    }

    #[test]
    fn start_refused_with_no_bound_task() {
        let settings = pomodoro_settings();
        let mut state = TimerState::new();
        state.start_or_resume(&settings);
        assert!(!state.running);
    }

    #[test]
    fn start_task_flushes_previous_binding_first() {
        let settings = pomodoro_settings();
        let mut state = TimerState::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        state.start_task(a);
        state.counter_ms = 5_000;
        let effects = state.start_task(b);

        assert_eq!(
            effects,
            vec![
                Effect::Flush {
                    task_id: a,
                    elapsed_ms: 5_000
                },
                Effect::Bind { task_id: b },
            ]
        );
        assert_eq!(state.bound_task_id, Some(b));
        assert_eq!(state.counter_ms, 0);
        assert!(state.running && !state.paused);
        let _ = settings;
    }

    #[test]
    fn pause_freezes_without_flushing() {
        let settings = pomodoro_settings();
        let mut state = TimerState::new();
        let a = Uuid::new_v4();
        state.start_task(a);
        state.tick(10, &settings);
        state.tick(10, &settings);

        state.toggle_pause();
        assert!(state.paused);
        assert_eq!(state.counter_ms, 20);
        assert_eq!(state.bound_task_id, Some(a));

        // Ticks while paused change nothing.
        let effects = state.tick(10, &settings);
        assert!(effects.is_empty());
        assert_eq!(state.counter_ms, 20);

        state.toggle_pause();
        assert!(!state.paused);
        state.tick(10, &settings);
        assert_eq!(state.counter_ms, 30);
    }

    #[test]
    fn stop_flushes_and_resets_stopwatch() {
        let settings = pomodoro_settings();
        let mut state = TimerState::new();
        let a = Uuid::new_v4();
        state.start_task(a);
        state.counter_ms = 1_234;

        let effects = state.stop(&settings);
        assert_eq!(
            effects,
            vec![Effect::Flush {
                task_id: a,
                elapsed_ms: 1_234
            }]
        );
        assert_eq!(state.counter_ms, 0);
        assert!(!state.running && !state.paused);
        assert_eq!(state.bound_task_id, None);
    }

    #[test]
    fn stop_in_cycle_mode_resets_to_focus_without_effects() {
        let settings = pomodoro_settings();
        let mut state = cycle_state(&settings);
        run_to_boundary(&mut state, &settings);
        assert_eq!(state.phase, CyclePhase::ShortBreak);

        let effects = state.stop(&settings);
        assert!(effects.is_empty());
        assert_eq!(state.phase, CyclePhase::Focus);
        assert_eq!(state.counter_ms, settings.focus_ms);
        assert!(!state.running);
        // The session tally is never reset automatically.
        assert_eq!(state.completed_focus_count, 1);
    }

    #[test]
    fn skip_break_only_valid_during_breaks() {
        let settings = pomodoro_settings();
        let mut state = cycle_state(&settings);

        // In focus: refused.
        let before = state.clone();
        state.skip_break(&settings);
        assert_eq!(state, before);

        run_to_boundary(&mut state, &settings);
        assert!(state.phase.is_break());
        state.skip_break(&settings);
        assert_eq!(state.phase, CyclePhase::Focus);
        assert_eq!(state.counter_ms, settings.focus_ms);
        assert!(!state.running);
    }

    #[test]
    fn mode_switch_is_idempotent() {
        let settings = pomodoro_settings();
        let mut state = TimerState::new();
        let a = Uuid::new_v4();
        state.start_task(a);
        state.counter_ms = 500;

        let before = state.clone();
        let effects = state.switch_mode(
            TimerMode::Stopwatch,
            &settings,
            ModeSwitchPolicy::default(),
        );
        assert!(effects.is_empty());
        assert_eq!(state, before);
    }

    #[test]
    fn mode_switch_discards_by_default_and_flushes_on_request() {
        let settings = pomodoro_settings();
        let a = Uuid::new_v4();

        let mut state = TimerState::new();
        state.start_task(a);
        state.counter_ms = 500;
        let effects =
            state.switch_mode(TimerMode::Cycle, &settings, ModeSwitchPolicy::DiscardUnflushed);
        assert_eq!(effects, vec![Effect::Unbind { task_id: a }]);
        assert_eq!(state.counter_ms, settings.focus_ms);
        assert_eq!(state.phase, CyclePhase::Focus);

        let mut state = TimerState::new();
        state.start_task(a);
        state.counter_ms = 500;
        let effects =
            state.switch_mode(TimerMode::Cycle, &settings, ModeSwitchPolicy::FlushToTask);
        assert_eq!(
            effects,
            vec![Effect::Flush {
                task_id: a,
                elapsed_ms: 500
            }]
        );
    }

    #[test]
    fn settings_change_reinitializes_idle_counter_only() {
        let settings = small_settings();
        let mut state = cycle_state(&settings);
        assert_eq!(state.counter_ms, 100);

        // Idle: the displayed counter follows the new duration immediately.
        let mut changed = settings.clone();
        changed.focus_ms = 200;
        state.settings_changed(&changed);
        assert_eq!(state.counter_ms, 200);

        // Running: the in-flight phase is neither truncated nor extended.
        state.start_or_resume(&changed);
        state.tick(10, &changed);
        let mut changed_again = changed.clone();
        changed_again.focus_ms = 10_000;
        state.settings_changed(&changed_again);
        assert_eq!(state.counter_ms, 190);

        // And the record for the in-flight phase carries the entered duration.
        let mut effects = Vec::new();
        state.counter_ms = 10;
        effects.extend(state.tick(10, &changed_again));
        assert!(effects.contains(&Effect::AppendFocusRecord {
            ordinal: 1,
            duration_ms: 200,
        }));
        // The next phase is entered with the newest settings.
        assert_eq!(state.counter_ms, changed_again.short_break_ms);
    }

    #[test]
    fn deleting_the_bound_task_discards_the_session() {
        let settings = pomodoro_settings();
        let mut state = TimerState::new();
        let a = Uuid::new_v4();
        state.start_task(a);
        state.counter_ms = 700;

        state.cancel_binding(a);
        assert_eq!(state.bound_task_id, None);
        assert_eq!(state.counter_ms, 0);
        assert!(!state.running);
        let _ = settings;
    }

    #[test]
    fn sessions_per_long_break_of_zero_acts_as_one() {
        let mut settings = small_settings();
        settings.sessions_per_long_break = 0;
        let mut state = cycle_state(&settings);

        run_to_boundary(&mut state, &settings);
        // Every focus completion earns a long break when the modulus is 1.
        assert_eq!(state.phase, CyclePhase::LongBreak);
    }
}
