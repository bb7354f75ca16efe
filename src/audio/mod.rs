pub mod alarm;
#[cfg(feature = "audio-output")]
pub mod engine;
#[cfg(feature = "audio-output")]
pub mod siren;

pub use alarm::{AlarmController, AlarmState};
#[cfg(feature = "audio-output")]
pub use engine::AudioEngineHandle;

use anyhow::Result;
use log::debug;
use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

/// Playback primitives the alarm drives.
///
/// Calls may block on the output device; the session controller only makes
/// them from the blocking pool.
pub trait AudioPlayback: Send + Sync {
    fn set_looping(&self, looping: bool);
    fn volume(&self) -> f32;
    fn set_volume(&self, volume: f32) -> Result<()>;
    fn play(&self) -> Result<()>;
    fn pause(&self) -> Result<()>;
    /// Seek back to the start of the sound.
    fn rewind(&self) -> Result<()>;
    /// Free the output device.
    fn release(&self);
    /// A device failure noticed after the call that caused it returned.
    /// Taking it clears it.
    fn take_fault(&self) -> Option<String> {
        None
    }
}

/// Stand-in used when the crate is built without `audio-output`.
/// Tracks the volume and logs instead of making sound.
#[derive(Clone)]
pub struct SilentPlayback {
    volume: Arc<AtomicU32>,
}

impl SilentPlayback {
    pub fn new() -> Self {
        Self {
            volume: Arc::new(AtomicU32::new(1.0f32.to_bits())),
        }
    }
}

impl Default for SilentPlayback {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioPlayback for SilentPlayback {
    fn set_looping(&self, looping: bool) {
        debug!("silent playback: looping={looping}");
    }

    fn volume(&self) -> f32 {
        f32::from_bits(self.volume.load(Ordering::SeqCst))
    }

    fn set_volume(&self, volume: f32) -> Result<()> {
        self.volume
            .store(volume.clamp(0.0, 1.0).to_bits(), Ordering::SeqCst);
        Ok(())
    }

    fn play(&self) -> Result<()> {
        debug!("silent playback: play");
        Ok(())
    }

    fn pause(&self) -> Result<()> {
        debug!("silent playback: pause");
        Ok(())
    }

    fn rewind(&self) -> Result<()> {
        Ok(())
    }

    fn release(&self) {
        debug!("silent playback: release");
    }
}

/// Real output when compiled with `audio-output`, silent otherwise.
pub fn default_playback(
    #[allow(unused_variables)] sound_path: Option<std::path::PathBuf>,
) -> Box<dyn AudioPlayback> {
    #[cfg(feature = "audio-output")]
    {
        Box::new(AudioEngineHandle::new(sound_path))
    }

    #[cfg(not(feature = "audio-output"))]
    {
        log::warn!("built without audio-output; the alarm will be silent");
        Box::new(SilentPlayback::new())
    }
}
