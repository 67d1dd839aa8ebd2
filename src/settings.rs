use anyhow::Result;
use log::{error, warn};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};

/// Durations and automation flags for the focus/break cycle.
///
/// Mutated only by an explicit save; a change takes effect at the next phase
/// boundary unless the engine is idle, in which case the idle counter is
/// re-initialized immediately (see `TimerEngine::apply_settings`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CycleSettings {
    pub focus_ms: u64,
    pub short_break_ms: u64,
    pub long_break_ms: u64,
    pub sessions_per_long_break: u32,
    pub auto_start_breaks: bool,
    pub auto_start_focus: bool,
    pub sound_on_phase_end: bool,
    pub desktop_alerts: bool,
}

impl Default for CycleSettings {
    fn default() -> Self {
        Self {
            focus_ms: 25 * 60 * 1000,
            short_break_ms: 5 * 60 * 1000,
            long_break_ms: 15 * 60 * 1000,
            sessions_per_long_break: 4,
            auto_start_breaks: false,
            auto_start_focus: false,
            sound_on_phase_end: true,
            desktop_alerts: true,
        }
    }
}

impl CycleSettings {
    /// Clamp stored values into the ranges the engine relies on: phase
    /// durations stay positive and `sessions_per_long_break` is at least 1.
    pub fn sanitized(&self) -> Self {
        let mut out = self.clone();
        out.focus_ms = out.focus_ms.max(1);
        out.short_break_ms = out.short_break_ms.max(1);
        out.long_break_ms = out.long_break_ms.max(1);
        out.sessions_per_long_break = out.sessions_per_long_break.max(1);
        out
    }
}

struct SettingsInner {
    path: Option<PathBuf>,
    data: RwLock<CycleSettings>,
}

/// Durable store for `CycleSettings`, overwritten wholesale on every save.
///
/// A load fault falls back to defaults; a write fault is logged and the
/// in-memory value stays authoritative.
#[derive(Clone)]
pub struct SettingsStore {
    inner: Arc<SettingsInner>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Self {
        let data = if path.exists() {
            match fs::read_to_string(&path) {
                Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
                    warn!(
                        "settings file {} is corrupt ({err}); using defaults",
                        path.display()
                    );
                    CycleSettings::default()
                }),
                Err(err) => {
                    warn!(
                        "failed to read settings from {} ({err}); using defaults",
                        path.display()
                    );
                    CycleSettings::default()
                }
            }
        } else {
            CycleSettings::default()
        };

        Self {
            inner: Arc::new(SettingsInner {
                path: Some(path),
                data: RwLock::new(data.sanitized()),
            }),
        }
    }

    /// Store without a backing file. Persistence is advisory, so everything
    /// else behaves identically.
    pub fn ephemeral(settings: CycleSettings) -> Self {
        Self {
            inner: Arc::new(SettingsInner {
                path: None,
                data: RwLock::new(settings.sanitized()),
            }),
        }
    }

    pub fn cycle(&self) -> CycleSettings {
        self.inner.data.read().unwrap().clone()
    }

    pub fn save(&self, settings: CycleSettings) {
        let mut guard = self.inner.data.write().unwrap();
        *guard = settings.sanitized();
        if let Some(path) = &self.inner.path {
            if let Err(err) = persist(path, &guard) {
                error!("failed to write settings to {}: {err:#}", path.display());
            }
        }
    }
}

fn persist(path: &Path, data: &CycleSettings) -> Result<()> {
    let serialized = serde_json::to_string_pretty(data)?;
    fs::write(path, serialized)?;
    Ok(())
}
