//! Mixer — sums voice outputs and applies the shared gain timeline.

use super::automation::GainAutomation;

/// A summing mixer over one block of frames starting at a device time.
#[derive(Debug, Clone)]
pub struct Mixer {
    sample_rate: f64,
    start_time: f64,
    buffer: Vec<f64>,
}

impl Mixer {
    pub fn new(sample_rate: f64) -> Self {
        Mixer {
            sample_rate,
            start_time: 0.0,
            buffer: Vec::new(),
        }
    }

    /// Prepare a zeroed block of `frames` beginning at `start_time`.
    pub fn clear(&mut self, start_time: f64, frames: usize) {
        self.start_time = start_time;
        self.buffer.clear();
        self.buffer.resize(frames, 0.0);
    }

    /// Device time of frame `index` in the current block.
    pub fn time_of(&self, index: usize) -> f64 {
        self.start_time + index as f64 / self.sample_rate
    }

    /// Accumulate a source evaluated at each frame's device time.
    pub fn add_source(&mut self, mut source: impl FnMut(f64) -> f64) {
        for i in 0..self.buffer.len() {
            let t = self.time_of(i);
            self.buffer[i] += source(t);
        }
    }

    /// Mixed block with gain automation and soft clipping applied.
    pub fn output(&self, gain: &GainAutomation) -> Vec<f32> {
        self.buffer
            .iter()
            .enumerate()
            .map(|(i, &s)| soft_clip(s * gain.value_at(self.time_of(i))) as f32)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

/// Soft clipper using tanh to prevent harsh digital clipping.
fn soft_clip(x: f64) -> f64 {
    x.tanh()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_block_is_silent() {
        let mut m = Mixer::new(1000.0);
        m.clear(0.0, 128);
        let out = m.output(&GainAutomation::new(1.0));
        assert_eq!(out.len(), 128);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn sources_accumulate() {
        let mut m = Mixer::new(1000.0);
        m.clear(0.0, 4);
        m.add_source(|_| 0.5);
        m.add_source(|t| if t < 0.002 { 0.3 } else { 0.0 });
        let out = m.output(&GainAutomation::new(1.0));
        assert!((f64::from(out[0]) - soft_clip(0.8)).abs() < 1e-6);
        assert!((f64::from(out[3]) - soft_clip(0.5)).abs() < 1e-6);
    }

    #[test]
    fn gain_timeline_is_applied_per_frame() {
        let mut gain = GainAutomation::new(0.0);
        gain.set_value_at(0.0, 0.0);
        gain.linear_ramp_to(1.0, 0.004);

        let mut m = Mixer::new(1000.0);
        m.clear(0.0, 5);
        m.add_source(|_| 0.1);
        let out = m.output(&gain);
        assert_eq!(out[0], 0.0);
        assert!(out[1] < out[2] && out[2] < out[4]);
    }

    #[test]
    fn soft_clip_prevents_overflow() {
        let mut m = Mixer::new(1000.0);
        m.clear(0.0, 1);
        m.add_source(|_| 100.0);
        let out = m.output(&GainAutomation::new(1.0));
        assert!(out[0].abs() <= 1.0, "Soft clip should keep output <= 1.0, got {}", out[0]);
    }
}
