use log::{info, warn};

use crate::audio::ChimeHandle;

/// Fire-and-forget phase-boundary signals with two independent channels.
/// Failures in an implementation must never reach the timer engine.
pub trait NotificationSink: Send + Sync {
    /// Best-effort audible tone.
    fn chime(&self);
    /// Best-effort visual alert.
    fn alert(&self, message: &str);
}

/// Default sink: plays a synthesized tone on the audio thread and surfaces
/// alerts through the log for the embedding shell to pick up.
pub struct ChimeNotifier {
    audio: ChimeHandle,
}

impl ChimeNotifier {
    pub fn new() -> Self {
        Self {
            audio: ChimeHandle::new(),
        }
    }
}

impl Default for ChimeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationSink for ChimeNotifier {
    fn chime(&self) {
        if let Err(err) = self.audio.play_chime() {
            warn!("failed to play chime: {err}");
        }
    }

    fn alert(&self, message: &str) {
        info!("{message}");
    }
}

/// Sink that drops every signal. Useful headless or in tests.
pub struct SilentSink;

impl NotificationSink for SilentSink {
    fn chime(&self) {}

    fn alert(&self, _message: &str) {}
}
