//! Audio device abstraction.
//!
//! An [`AudioDevice`] is a cheap, cloneable handle to one output graph: a
//! single gain node feeding the output, and any number of oscillator voices
//! feeding the gain. All scheduling is expressed in seconds on the device's
//! own clock, which only advances while the device is running.

pub mod software;

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::dsp::oscillator::Waveform;
use crate::error::DeviceError;

/// Run state of the output pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceState {
    /// Created but not producing audio; the clock is frozen.
    Suspended,
    Running,
}

/// Whether the platform lets audio start without a user gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AutoplayPolicy {
    #[default]
    Allowed,
    RequiresGesture,
}

/// Identifier of a voice node inside one device's graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VoiceId(pub u64);

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Platform audio output: a clock, one shared gain, and oscillator voices.
pub trait AudioDevice: Clone + Send + Sync + 'static {
    fn state(&self) -> DeviceState;

    /// Try to leave the suspended state. May be declined by autoplay policy.
    fn resume(&self) -> impl Future<Output = Result<(), DeviceError>> + Send;

    /// Seconds on the device clock.
    fn current_time(&self) -> f64;

    /// Gain value in effect at device time `t`.
    fn gain_value_at(&self, t: f64) -> f64;

    /// Set the gain immediately, discarding any scheduled automation.
    fn set_gain(&self, value: f64);

    /// Cancel gain automation at or after `t` and pin the value in effect
    /// at `t`. Returns the pinned value.
    fn hold_gain(&self, t: f64) -> f64;

    fn set_gain_at(&self, value: f64, t: f64);

    /// Ramp linearly from the previous scheduled point to `value` at `t`.
    fn ramp_gain_to(&self, value: f64, t: f64);

    /// Create an oscillator connected to the gain. It is silent until started.
    fn create_voice(&self, waveform: Waveform, frequency: f64) -> Result<VoiceId, DeviceError>;

    fn start_voice(&self, id: VoiceId, at: f64) -> Result<(), DeviceError>;

    /// Schedule the voice to go silent at device time `at`.
    fn stop_voice(&self, id: VoiceId, at: f64) -> Result<(), DeviceError>;

    /// Remove the voice from the graph.
    fn disconnect_voice(&self, id: VoiceId) -> Result<(), DeviceError>;

    /// Number of voices currently connected to the gain.
    fn connected_voices(&self) -> usize;

    fn gain_value(&self) -> f64 {
        self.gain_value_at(self.current_time())
    }
}

/// Lazily opens the platform device.
pub trait DeviceFactory<D: AudioDevice>: Send {
    fn open(&mut self) -> Result<D, DeviceError>;
}

impl<D, F> DeviceFactory<D> for F
where
    D: AudioDevice,
    F: FnMut() -> Result<D, DeviceError> + Send,
{
    fn open(&mut self) -> Result<D, DeviceError> {
        self()
    }
}
