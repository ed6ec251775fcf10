#[cfg(feature = "audio")]
pub mod chime;

#[cfg(feature = "audio")]
pub use engine::AudioEngineHandle;

/// Capability to play the "timer finished" cue.
///
/// Failures are reported but never affect timer state; the caller logs them.
pub trait CompletionCue: Send + Sync {
    fn play(&self) -> Result<(), String>;

    /// Blocks until any cue still sounding has played out, then releases the
    /// output device.
    fn finish(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Cue that does nothing, for headless sessions.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentCue;

impl CompletionCue for SilentCue {
    fn play(&self) -> Result<(), String> {
        Ok(())
    }
}

#[cfg(feature = "audio")]
mod engine {
    use super::chime::Chime;
    use super::CompletionCue;
    use crate::settings::ChimeSettings;

    use rodio::{OutputStream, Sink};
    use std::sync::{
        mpsc::{self, Sender},
        Arc, Mutex,
    };
    use std::thread;

    enum AudioCommand {
        PlayChime { frequency_hz: f32 },
        Finish(Sender<()>),
    }

    pub struct AudioEngineHandle {
        tx: Arc<Mutex<Option<Sender<AudioCommand>>>>,
        settings: ChimeSettings,
    }

    impl AudioEngineHandle {
        pub fn new(settings: ChimeSettings) -> Self {
            Self {
                tx: Arc::new(Mutex::new(None)),
                settings,
            }
        }

        fn ensure_thread(&self) -> Result<Sender<AudioCommand>, String> {
            if let Some(tx) = self.tx.lock().map_err(|e| e.to_string())?.as_ref() {
                return Ok(tx.clone());
            }

            let (tx, rx) = mpsc::channel::<AudioCommand>();
            let volume = self.settings.volume.clamp(0.0, 1.0);

            // Dedicated audio thread holding non-Send audio objects
            thread::Builder::new()
                .name("audio-engine".to_string())
                .spawn(move || {
                    let mut _stream: Option<OutputStream> = None;
                    let mut sink: Option<Sink> = None;

                    fn ensure_sink(
                        stream: &mut Option<OutputStream>,
                        sink: &mut Option<Sink>,
                        volume: f32,
                    ) -> Result<(), String> {
                        if sink.is_none() {
                            let (s, handle) = OutputStream::try_default()
                                .map_err(|e| format!("Failed to create audio output stream: {}", e))?;
                            let new_sink = Sink::try_new(&handle)
                                .map_err(|e| format!("Failed to create audio sink: {}", e))?;
                            new_sink.set_volume(volume);
                            *stream = Some(s);
                            *sink = Some(new_sink);
                        }
                        Ok(())
                    }

                    while let Ok(cmd) = rx.recv() {
                        match cmd {
                            AudioCommand::PlayChime { frequency_hz } => {
                                if let Err(err) = ensure_sink(&mut _stream, &mut sink, volume) {
                                    log::warn!("completion chime unavailable: {}", err);
                                    continue;
                                }
                                if let Some(ref s) = sink {
                                    s.append(Chime::new(frequency_hz));
                                    s.play();
                                }
                            }
                            AudioCommand::Finish(done) => {
                                if let Some(s_old) = sink.take() {
                                    s_old.sleep_until_end();
                                }
                                _stream = None;
                                let _ = done.send(());
                            }
                        }
                    }
                })
                .map_err(|e| e.to_string())?;

            let tx_clone = tx.clone();
            *self.tx.lock().map_err(|e| e.to_string())? = Some(tx);
            Ok(tx_clone)
        }
    }

    impl CompletionCue for AudioEngineHandle {
        fn play(&self) -> Result<(), String> {
            if !self.settings.enabled {
                return Ok(());
            }
            let tx = self.ensure_thread()?;
            tx.send(AudioCommand::PlayChime {
                frequency_hz: self.settings.frequency_hz,
            })
            .map_err(|e| e.to_string())
        }

        fn finish(&self) -> Result<(), String> {
            // Nothing was ever played, so there is no thread to wait on.
            let Some(tx) = self.tx.lock().map_err(|e| e.to_string())?.clone() else {
                return Ok(());
            };
            let (done_tx, done_rx) = mpsc::channel();
            tx.send(AudioCommand::Finish(done_tx))
                .map_err(|e| e.to_string())?;
            done_rx.recv().map_err(|e| e.to_string())
        }
    }
}
