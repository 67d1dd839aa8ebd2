use rodio::Source;
use std::f32::consts::PI;
use std::time::Duration;

const SAMPLE_RATE: u32 = 44100;
const CHIME_MS: u64 = 350;

/// Short synthesized tone played at a phase boundary.
pub struct Chime {
    freq: f32,
    num_sample: usize,
    total_samples: usize,
}

impl Chime {
    pub fn new(freq: f32) -> Self {
        Self {
            freq,
            num_sample: 0,
            total_samples: (SAMPLE_RATE as u64 * CHIME_MS / 1000) as usize,
        }
    }
}

impl Iterator for Chime {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.num_sample >= self.total_samples {
            return None;
        }
        self.num_sample += 1;

        let t = self.num_sample as f32 / SAMPLE_RATE as f32;
        // Linear fade-out keeps the tone from clicking at the end.
        let fade = 1.0 - self.num_sample as f32 / self.total_samples as f32;

        Some((2.0 * PI * self.freq * t).sin() * 0.2 * fade)
    }
}

impl Source for Chime {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.total_samples - self.num_sample)
    }

    fn channels(&self) -> u16 {
        1 // Mono
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_millis(CHIME_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chime_is_finite_and_bounded() {
        let samples: Vec<f32> = Chime::new(880.0).collect();
        assert_eq!(samples.len(), (SAMPLE_RATE as u64 * CHIME_MS / 1000) as usize);
        assert!(samples.iter().all(|sample| sample.abs() <= 0.2));
        // The fade-out lands the final sample at silence.
        assert!(samples.last().expect("non-empty").abs() < 1e-3);
    }
}
