use rodio::Source;
use std::f32::consts::PI;
use std::time::Duration;

const CHIME_SECONDS: f32 = 1.2;
const DECAY_PER_SECOND: f32 = 4.0;

/// Short bell-like chime played when a step timer runs out.
/// A fundamental plus a fifth above it, fading out exponentially.
pub struct Chime {
    frequency: f32,
    sample_rate: u32,
    num_sample: usize,
    total_samples: usize,
}

impl Chime {
    pub fn new(frequency: f32) -> Self {
        let sample_rate = 44100;
        Self {
            frequency,
            sample_rate,
            num_sample: 0,
            total_samples: (sample_rate as f32 * CHIME_SECONDS) as usize,
        }
    }
}

impl Iterator for Chime {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.num_sample >= self.total_samples {
            return None;
        }

        let t = self.num_sample as f32 / self.sample_rate as f32;
        self.num_sample += 1;

        let envelope = (-DECAY_PER_SECOND * t).exp();
        let tone = 0.6 * (2.0 * PI * self.frequency * t).sin()
            + 0.4 * (2.0 * PI * self.frequency * 1.5 * t).sin();

        Some(tone * envelope * 0.3) // Lower amplitude to prevent clipping
    }
}

impl Source for Chime {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_secs_f32(CHIME_SECONDS))
    }
}
