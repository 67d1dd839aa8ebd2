mod chime;

use chime::Chime;

use rodio::{OutputStream, Sink};
use std::sync::{
    mpsc::{self, Sender},
    Arc, Mutex,
};
use std::thread;

const CHIME_FREQ_HZ: f32 = 880.0;

enum AudioCommand {
    PlayChime,
}

/// Handle to the dedicated audio thread holding the non-Send rodio objects.
/// The thread is spawned lazily on the first chime.
pub struct ChimeHandle {
    tx: Arc<Mutex<Option<Sender<AudioCommand>>>>,
}

impl ChimeHandle {
    pub fn new() -> Self {
        Self {
            tx: Arc::new(Mutex::new(None)),
        }
    }

    fn ensure_thread(&self) -> Result<Sender<AudioCommand>, String> {
        if let Some(tx) = self.tx.lock().map_err(|e| e.to_string())?.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<AudioCommand>();

        thread::Builder::new()
            .name("timekeep-audio".to_string())
            .spawn(move || {
                let mut _stream: Option<OutputStream> = None;
                let mut sink: Option<Sink> = None;

                fn ensure_sink(
                    stream: &mut Option<OutputStream>,
                    sink: &mut Option<Sink>,
                ) -> Result<(), String> {
                    if sink.is_none() {
                        let (s, handle) = OutputStream::try_default()
                            .map_err(|e| format!("Failed to create audio output stream: {}", e))?;
                        let new_sink = Sink::try_new(&handle)
                            .map_err(|e| format!("Failed to create audio sink: {}", e))?;
                        *stream = Some(s);
                        *sink = Some(new_sink);
                    }
                    Ok(())
                }

                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        AudioCommand::PlayChime => {
                            // Best effort: a machine without an output device
                            // simply stays silent.
                            if ensure_sink(&mut _stream, &mut sink).is_err() {
                                continue;
                            }
                            if let Some(ref s) = sink {
                                s.append(Chime::new(CHIME_FREQ_HZ));
                            }
                        }
                    }
                }
            })
            .map_err(|e| e.to_string())?;

        let tx_clone = tx.clone();
        *self.tx.lock().map_err(|e| e.to_string())? = Some(tx);
        Ok(tx_clone)
    }

    pub fn play_chime(&self) -> Result<(), String> {
        let tx = self.ensure_thread()?;
        tx.send(AudioCommand::PlayChime).map_err(|e| e.to_string())
    }
}

impl Default for ChimeHandle {
    fn default() -> Self {
        Self::new()
    }
}
