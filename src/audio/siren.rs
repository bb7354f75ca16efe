use rodio::Source;
use std::time::Duration;

const SAMPLE_RATE: u32 = 44100;
const HIGH_HZ: f32 = 960.0;
const LOW_HZ: f32 = 770.0;
/// Seconds each tone holds before switching.
const TONE_SECS: f32 = 0.5;

/// Two-tone siren, the built-in alarm sound when no sound file is configured.
/// Endless, so looping it is a no-op.
pub struct Siren {
    sample_rate: u32,
    phase: f32,
    elapsed_samples: u64,
}

impl Siren {
    pub fn new() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            phase: 0.0,
            elapsed_samples: 0,
        }
    }

    fn current_frequency(&self) -> f32 {
        let tone_samples = (self.sample_rate as f32 * TONE_SECS) as u64;
        if (self.elapsed_samples / tone_samples) % 2 == 0 {
            HIGH_HZ
        } else {
            LOW_HZ
        }
    }
}

impl Default for Siren {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for Siren {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        let frequency = self.current_frequency();
        self.phase += frequency / self.sample_rate as f32;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        self.elapsed_samples = self.elapsed_samples.wrapping_add(1);

        // soft-clipped sine
        let sine = (self.phase * std::f32::consts::TAU).sin();
        Some((sine * 3.0).tanh() * 0.6)
    }
}

impl Source for Siren {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1 // Mono
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}
