//! In-process audio device.
//!
//! Keeps the whole graph (clock, gain timeline, voices) behind one mutex and
//! renders real samples on demand. The clock follows `tokio::time::Instant`,
//! so tests running on a paused runtime see deterministic device time.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::time::Instant;
use tracing::debug;

use crate::dsp::automation::GainAutomation;
use crate::dsp::mixer::Mixer;
use crate::dsp::oscillator::{Oscillator, Waveform};
use crate::error::DeviceError;

use super::{AudioDevice, AutoplayPolicy, DeviceState, VoiceId};

/// Default output rate.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

#[derive(Debug)]
struct VoiceNode {
    oscillator: Oscillator,
    start: Option<f64>,
    stop: Option<f64>,
}

impl VoiceNode {
    fn sample_at(&self, t: f64) -> f64 {
        match self.start {
            Some(start) if t >= start && self.stop.is_none_or(|stop| t < stop) => {
                self.oscillator.sample_at(t - start)
            }
            _ => 0.0,
        }
    }
}

/// Device clock: accumulated running time plus the current running span.
#[derive(Debug)]
struct DeviceClock {
    frozen: f64,
    running_since: Option<Instant>,
}

impl DeviceClock {
    fn now(&self) -> f64 {
        self.frozen
            + self
                .running_since
                .map_or(0.0, |since| since.elapsed().as_secs_f64())
    }

    fn run(&mut self) {
        if self.running_since.is_none() {
            self.running_since = Some(Instant::now());
        }
    }

    fn freeze(&mut self) {
        self.frozen = self.now();
        self.running_since = None;
    }
}

#[derive(Debug)]
struct Graph {
    sample_rate: u32,
    policy: AutoplayPolicy,
    gesture_seen: bool,
    /// Offline graphs never advance their clock in real time.
    realtime: bool,
    state: DeviceState,
    clock: DeviceClock,
    gain: GainAutomation,
    voices: BTreeMap<VoiceId, VoiceNode>,
    next_id: u64,
}

impl Graph {
    fn voice_mut(&mut self, id: VoiceId) -> Result<&mut VoiceNode, DeviceError> {
        self.voices.get_mut(&id).ok_or(DeviceError::UnknownVoice(id))
    }
}

/// A software audio graph shared by every clone of the handle.
#[derive(Debug, Clone)]
pub struct SoftwareDevice {
    graph: Arc<Mutex<Graph>>,
}

impl SoftwareDevice {
    /// Create a real-time device. Under [`AutoplayPolicy::RequiresGesture`]
    /// it starts suspended and refuses to resume until
    /// [`grant_user_gesture`](Self::grant_user_gesture) is called.
    pub fn new(sample_rate: u32, policy: AutoplayPolicy) -> Self {
        let mut clock = DeviceClock {
            frozen: 0.0,
            running_since: None,
        };
        let state = match policy {
            AutoplayPolicy::Allowed => {
                clock.run();
                DeviceState::Running
            }
            AutoplayPolicy::RequiresGesture => DeviceState::Suspended,
        };
        Self::from_graph(Graph {
            sample_rate,
            policy,
            gesture_seen: false,
            realtime: true,
            state,
            clock,
            gain: GainAutomation::new(0.0),
            voices: BTreeMap::new(),
            next_id: 0,
        })
    }

    /// Create a running device whose clock stays at 0, for rendering a
    /// timeline scheduled up front.
    pub fn offline(sample_rate: u32) -> Self {
        Self::from_graph(Graph {
            sample_rate,
            policy: AutoplayPolicy::Allowed,
            gesture_seen: false,
            realtime: false,
            state: DeviceState::Running,
            clock: DeviceClock {
                frozen: 0.0,
                running_since: None,
            },
            gain: GainAutomation::new(0.0),
            voices: BTreeMap::new(),
            next_id: 0,
        })
    }

    fn from_graph(graph: Graph) -> Self {
        SoftwareDevice {
            graph: Arc::new(Mutex::new(graph)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Graph> {
        self.graph.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn sample_rate(&self) -> u32 {
        self.lock().sample_rate
    }

    /// Record a user interaction, lifting the autoplay restriction.
    pub fn grant_user_gesture(&self) {
        self.lock().gesture_seen = true;
    }

    /// Pause output and freeze the clock.
    pub fn suspend(&self) {
        let mut graph = self.lock();
        graph.clock.freeze();
        graph.state = DeviceState::Suspended;
    }

    fn try_resume(&self) -> Result<(), DeviceError> {
        let mut graph = self.lock();
        if graph.state == DeviceState::Running {
            return Ok(());
        }
        if graph.policy == AutoplayPolicy::RequiresGesture && !graph.gesture_seen {
            return Err(DeviceError::AutoplayBlocked);
        }
        graph.state = DeviceState::Running;
        if graph.realtime {
            graph.clock.run();
        }
        debug!(time = graph.clock.now(), "software device resumed");
        Ok(())
    }

    /// Render `frames` mono samples starting at device time `start`.
    pub fn render(&self, start: f64, frames: usize) -> Vec<f32> {
        let graph = self.lock();
        let mut mixer = Mixer::new(f64::from(graph.sample_rate));
        mixer.clear(start, frames);
        for voice in graph.voices.values() {
            mixer.add_source(|t| voice.sample_at(t));
        }
        mixer.output(&graph.gain)
    }
}

impl AudioDevice for SoftwareDevice {
    fn state(&self) -> DeviceState {
        self.lock().state
    }

    fn resume(&self) -> impl Future<Output = Result<(), DeviceError>> + Send {
        let result = self.try_resume();
        async move { result }
    }

    fn current_time(&self) -> f64 {
        self.lock().clock.now()
    }

    fn gain_value_at(&self, t: f64) -> f64 {
        self.lock().gain.value_at(t)
    }

    fn set_gain(&self, value: f64) {
        let mut graph = self.lock();
        let now = graph.clock.now();
        graph.gain.set_now(value, now);
    }

    fn hold_gain(&self, t: f64) -> f64 {
        self.lock().gain.hold_at(t)
    }

    fn set_gain_at(&self, value: f64, t: f64) {
        self.lock().gain.set_value_at(value, t);
    }

    fn ramp_gain_to(&self, value: f64, t: f64) {
        self.lock().gain.linear_ramp_to(value, t);
    }

    fn create_voice(&self, waveform: Waveform, frequency: f64) -> Result<VoiceId, DeviceError> {
        let mut graph = self.lock();
        graph.next_id += 1;
        let id = VoiceId(graph.next_id);
        graph.voices.insert(
            id,
            VoiceNode {
                oscillator: Oscillator::new(waveform, frequency),
                start: None,
                stop: None,
            },
        );
        Ok(id)
    }

    fn start_voice(&self, id: VoiceId, at: f64) -> Result<(), DeviceError> {
        let mut graph = self.lock();
        let voice = graph.voice_mut(id)?;
        if voice.start.is_some() {
            return Err(DeviceError::VoiceLifecycle {
                id,
                op: "start",
                state: "already started",
            });
        }
        voice.start = Some(at);
        Ok(())
    }

    fn stop_voice(&self, id: VoiceId, at: f64) -> Result<(), DeviceError> {
        let mut graph = self.lock();
        let voice = graph.voice_mut(id)?;
        if voice.start.is_none() {
            return Err(DeviceError::VoiceLifecycle {
                id,
                op: "stop",
                state: "not started",
            });
        }
        voice.stop = Some(at);
        Ok(())
    }

    fn disconnect_voice(&self, id: VoiceId) -> Result<(), DeviceError> {
        self.lock()
            .voices
            .remove(&id)
            .map(|_| ())
            .ok_or(DeviceError::UnknownVoice(id))
    }

    fn connected_voices(&self) -> usize {
        self.lock().voices.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn clock_advances_only_while_running() {
        let device = SoftwareDevice::new(DEFAULT_SAMPLE_RATE, AutoplayPolicy::RequiresGesture);
        assert_eq!(device.state(), DeviceState::Suspended);

        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        assert_eq!(device.current_time(), 0.0);

        assert_eq!(device.resume().await, Err(DeviceError::AutoplayBlocked));
        device.grant_user_gesture();
        device.resume().await.expect("resume after gesture");
        assert_eq!(device.state(), DeviceState::Running);

        tokio::time::sleep(std::time::Duration::from_millis(250)).await;
        assert!((device.current_time() - 0.25).abs() < 2e-3);

        device.suspend();
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        assert!((device.current_time() - 0.25).abs() < 2e-3);
    }

    #[test]
    fn voice_lifecycle_is_enforced() {
        let device = SoftwareDevice::offline(8000);
        let id = device.create_voice(Waveform::Sine, 432.0).expect("create");
        assert!(device.stop_voice(id, 1.0).is_err(), "stop before start");
        device.start_voice(id, 0.0).expect("start");
        assert!(device.start_voice(id, 0.0).is_err(), "double start");
        device.stop_voice(id, 1.0).expect("stop");
        device.disconnect_voice(id).expect("disconnect");
        assert_eq!(device.disconnect_voice(id), Err(DeviceError::UnknownVoice(id)));
        assert_eq!(device.connected_voices(), 0);
    }

    #[test]
    fn render_respects_start_stop_and_gain() {
        let device = SoftwareDevice::offline(8000);
        device.set_gain(0.3);
        let id = device.create_voice(Waveform::Sine, 400.0).expect("create");
        device.start_voice(id, 0.1).expect("start");
        device.stop_voice(id, 0.2).expect("stop");

        let out = device.render(0.0, 2400);
        let peak = |range: std::ops::Range<usize>| {
            out[range].iter().fold(0.0f32, |m, s| m.max(s.abs()))
        };
        assert_eq!(peak(0..800), 0.0, "silent before start");
        assert!(peak(800..1600) > 0.25, "audible while running");
        assert_eq!(peak(1600..2400), 0.0, "silent after stop");
    }

    #[test]
    fn unstarted_voice_is_silent() {
        let device = SoftwareDevice::offline(8000);
        device.set_gain(0.3);
        device.create_voice(Waveform::Sine, 400.0).expect("create");
        assert!(device.render(0.0, 800).iter().all(|&s| s == 0.0));
    }
}
