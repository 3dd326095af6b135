//! Stateless oscillators evaluated at an elapsed time.
//!
//! A tone's phase is derived from the time since it started rather than
//! accumulated per sample, so any block of the timeline can be rendered
//! independently.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Supported waveform shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Triangle,
}

/// A fixed-frequency oscillator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Oscillator {
    waveform: Waveform,
    frequency: f64,
}

impl Oscillator {
    pub fn new(waveform: Waveform, frequency: f64) -> Self {
        Oscillator { waveform, frequency }
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Sample value `elapsed` seconds after the oscillator started.
    pub fn sample_at(&self, elapsed: f64) -> f64 {
        if elapsed < 0.0 {
            return 0.0;
        }
        let phase = (self.frequency * elapsed).fract();
        match self.waveform {
            Waveform::Sine => (2.0 * PI * phase).sin(),
            // -1 → +1 over the first half cycle, back down over the second
            Waveform::Triangle => {
                if phase < 0.5 {
                    4.0 * phase - 1.0
                } else {
                    3.0 - 4.0 * phase
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sine_zero_at_start() {
        let osc = Oscillator::new(Waveform::Sine, 432.0);
        let sample = osc.sample_at(0.0);
        assert!(sample.abs() < 1e-10, "Sine should start near 0, got {sample}");
    }

    #[test]
    fn sine_peaks_at_quarter_period() {
        let osc = Oscillator::new(Waveform::Sine, 500.0);
        let s = osc.sample_at(1.0 / 500.0 / 4.0);
        assert!((s - 1.0).abs() < 1e-9, "expected peak, got {s}");
    }

    #[test]
    fn sine_range() {
        let osc = Oscillator::new(Waveform::Sine, 528.0);
        for i in 0..44100 {
            let s = osc.sample_at(i as f64 / 44100.0);
            assert!((-1.0..=1.0).contains(&s), "Sine out of range: {s}");
        }
    }

    #[test]
    fn triangle_range() {
        let osc = Oscillator::new(Waveform::Triangle, 440.0);
        for i in 0..44100 {
            let s = osc.sample_at(i as f64 / 44100.0);
            assert!((-1.0..=1.0).contains(&s), "Triangle out of range: {s}");
        }
    }

    #[test]
    fn silent_before_start() {
        let osc = Oscillator::new(Waveform::Triangle, 440.0);
        assert_eq!(osc.sample_at(-0.01), 0.0);
    }
}
