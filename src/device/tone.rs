//! SineTone - real-time safe tone generation for the output backends
//!
//! The device backends need something to render while their stream runs.
//! `SineTone` is a phase accumulator: no allocations, no locks, bounded work
//! per sample, so it can be driven directly from the audio callback. A
//! frequency of 0 Hz renders silence.

use std::f32::consts::TAU;

/// Phase-accumulating sine generator.
#[derive(Debug, Clone)]
pub struct SineTone {
    phase: f32,
    step: f32,
    amplitude: f32,
}

impl SineTone {
    /// Create a tone generator
    ///
    /// # Arguments
    /// * `frequency_hz` - Tone frequency; 0 or negative renders silence
    /// * `sample_rate` - Output sample rate in Hz
    /// * `amplitude` - Peak amplitude, clamped to 0.0..=1.0
    pub fn new(frequency_hz: f32, sample_rate: u32, amplitude: f32) -> Self {
        let step = if frequency_hz > 0.0 && sample_rate > 0 {
            TAU * frequency_hz / sample_rate as f32
        } else {
            0.0
        };
        Self {
            phase: 0.0,
            step,
            amplitude: amplitude.clamp(0.0, 1.0),
        }
    }

    /// Generator that always outputs 0.0
    pub fn silent() -> Self {
        Self::new(0.0, 0, 0.0)
    }

    pub fn is_silent(&self) -> bool {
        self.step == 0.0 || self.amplitude == 0.0
    }

    /// Next mono sample
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        if self.is_silent() {
            return 0.0;
        }
        let value = self.phase.sin() * self.amplitude;
        self.phase += self.step;
        if self.phase >= TAU {
            self.phase -= TAU;
        }
        value
    }

    /// Fill an interleaved buffer, writing the same sample to every channel
    /// of a frame.
    pub fn fill_interleaved(&mut self, out: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        for frame in out.chunks_mut(channels) {
            let sample = self.next_sample();
            frame.fill(sample);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_tone_outputs_zero() {
        let mut tone = SineTone::silent();
        let mut buffer = [1.0_f32; 16];
        tone.fill_interleaved(&mut buffer, 2);
        assert!(buffer.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_tone_respects_amplitude() {
        let mut tone = SineTone::new(440.0, 48_000, 0.25);
        for _ in 0..48_000 {
            assert!(tone.next_sample().abs() <= 0.25 + f32::EPSILON);
        }
    }

    #[test]
    fn test_interleaved_channels_share_sample() {
        let mut tone = SineTone::new(1_000.0, 48_000, 0.5);
        let mut buffer = [0.0_f32; 64];
        tone.fill_interleaved(&mut buffer, 2);
        for frame in buffer.chunks(2) {
            assert_eq!(frame[0], frame[1]);
        }
        assert!(buffer.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn test_quarter_period_reaches_peak() {
        // 12 kHz at 48 kHz: four samples per period, peak on the second
        let mut tone = SineTone::new(12_000.0, 48_000, 1.0);
        assert!(tone.next_sample().abs() < 1e-6);
        assert!((tone.next_sample() - 1.0).abs() < 1e-5);
    }
}
