use anyhow::{anyhow, Result};
use log::{error, info};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, AtomicU32, Ordering},
        mpsc::{self, Sender},
        Arc, Mutex,
    },
    thread,
    time::Duration,
};

use super::{siren::Siren, AudioPlayback};

/// Length of a single non-looping siren burst.
const ONE_SHOT_SECS: u64 = 2;

enum AudioCommand {
    Play,
    Pause,
    Rewind,
    SetVolume(f32),
    Release,
}

/// rodio-backed alarm output.
///
/// `OutputStream` is not `Send`, so the device lives on a dedicated thread
/// and this handle talks to it over a channel. Commands never wait for the
/// thread; a failure it hits is parked in `fault` until the alarm asks for it.
/// The thread is spawned lazily and torn down by [`AudioPlayback::release`];
/// the next call spawns it again.
#[derive(Clone)]
pub struct AudioEngineHandle {
    tx: Arc<Mutex<Option<Sender<AudioCommand>>>>,
    volume: Arc<AtomicU32>,
    looping: Arc<AtomicBool>,
    fault: Arc<Mutex<Option<String>>>,
    sound_path: Option<PathBuf>,
}

impl AudioEngineHandle {
    /// `sound_path` selects a sound file; `None` plays the built-in siren.
    pub fn new(sound_path: Option<PathBuf>) -> Self {
        Self {
            tx: Arc::new(Mutex::new(None)),
            volume: Arc::new(AtomicU32::new(1.0f32.to_bits())),
            looping: Arc::new(AtomicBool::new(true)),
            fault: Arc::new(Mutex::new(None)),
            sound_path,
        }
    }

    fn ensure_thread(&self) -> Result<Sender<AudioCommand>> {
        let mut guard = self
            .tx
            .lock()
            .map_err(|_| anyhow!("audio handle lock poisoned"))?;
        if let Some(tx) = guard.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<AudioCommand>();
        let volume = Arc::clone(&self.volume);
        let looping = Arc::clone(&self.looping);
        let fault = Arc::clone(&self.fault);
        let sound_path = self.sound_path.clone();

        thread::Builder::new()
            .name("alarm-audio".to_string())
            .spawn(move || {
                let mut output: Option<(OutputStream, OutputStreamHandle)> = None;
                let mut sink: Option<Sink> = None;

                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        AudioCommand::Play => {
                            let current_volume = f32::from_bits(volume.load(Ordering::SeqCst));
                            let result = start_playback(
                                &mut output,
                                &mut sink,
                                sound_path.as_deref(),
                                looping.load(Ordering::SeqCst),
                                current_volume,
                            );
                            if let Err(e) = result {
                                error!("{e}");
                                if let Ok(mut slot) = fault.lock() {
                                    *slot = Some(e);
                                }
                            }
                        }
                        AudioCommand::Pause => {
                            if let Some(ref s) = sink {
                                s.pause();
                            }
                        }
                        AudioCommand::Rewind => {
                            // Dropping the queued source; the next play starts from the top.
                            if let Some(s_old) = sink.take() {
                                s_old.stop();
                            }
                        }
                        AudioCommand::SetVolume(v) => {
                            if let Some(ref s) = sink {
                                s.set_volume(v);
                            }
                        }
                        AudioCommand::Release => {
                            if let Some(s_old) = sink.take() {
                                s_old.stop();
                            }
                            output = None;
                            break;
                        }
                    }
                }
                drop(output);
                info!("alarm audio thread stopped");
            })
            .map_err(|e| anyhow!("failed to spawn audio thread: {e}"))?;

        *guard = Some(tx.clone());
        Ok(tx)
    }

    fn send(&self, cmd: AudioCommand) -> Result<()> {
        let tx = self.ensure_thread()?;
        tx.send(cmd)
            .map_err(|e| anyhow!("audio thread unavailable: {e}"))
    }
}

fn start_playback(
    output: &mut Option<(OutputStream, OutputStreamHandle)>,
    sink: &mut Option<Sink>,
    sound_path: Option<&Path>,
    looping: bool,
    volume: f32,
) -> Result<(), String> {
    if output.is_none() {
        let pair = OutputStream::try_default()
            .map_err(|e| format!("Failed to create audio output stream: {}", e))?;
        *output = Some(pair);
    }

    if sink.is_none() {
        let Some((_, handle)) = output.as_ref() else {
            return Err("audio output stream missing".to_string());
        };
        let new_sink =
            Sink::try_new(handle).map_err(|e| format!("Failed to create audio sink: {}", e))?;
        queue_alarm(&new_sink, sound_path, looping)?;
        *sink = Some(new_sink);
    }

    if let Some(ref s) = sink {
        s.set_volume(volume);
        s.play();
    }
    Ok(())
}

fn queue_alarm(sink: &Sink, sound_path: Option<&Path>, looping: bool) -> Result<(), String> {
    match sound_path {
        Some(path) => {
            let file = File::open(path)
                .map_err(|e| format!("Failed to open alarm sound {}: {}", path.display(), e))?;
            let decoder = Decoder::new(BufReader::new(file))
                .map_err(|e| format!("Failed to decode alarm sound {}: {}", path.display(), e))?;
            if looping {
                sink.append(decoder.repeat_infinite());
            } else {
                sink.append(decoder);
            }
        }
        None => {
            if looping {
                sink.append(Siren::new());
            } else {
                sink.append(Siren::new().take_duration(Duration::from_secs(ONE_SHOT_SECS)));
            }
        }
    }
    Ok(())
}

impl AudioPlayback for AudioEngineHandle {
    fn set_looping(&self, looping: bool) {
        self.looping.store(looping, Ordering::SeqCst);
    }

    fn volume(&self) -> f32 {
        f32::from_bits(self.volume.load(Ordering::SeqCst))
    }

    fn set_volume(&self, volume: f32) -> Result<()> {
        let volume = volume.clamp(0.0, 1.0);
        self.volume.store(volume.to_bits(), Ordering::SeqCst);
        self.send(AudioCommand::SetVolume(volume))
    }

    fn play(&self) -> Result<()> {
        self.send(AudioCommand::Play)
    }

    fn pause(&self) -> Result<()> {
        self.send(AudioCommand::Pause)
    }

    fn rewind(&self) -> Result<()> {
        self.send(AudioCommand::Rewind)
    }

    fn release(&self) {
        match self.tx.lock() {
            Ok(mut guard) => {
                if let Some(tx) = guard.take() {
                    let _ = tx.send(AudioCommand::Release);
                }
            }
            Err(_) => error!("audio handle lock poisoned during release"),
        }
    }

    fn take_fault(&self) -> Option<String> {
        self.fault.lock().ok().and_then(|mut slot| slot.take())
    }
}
