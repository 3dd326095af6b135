//! Tone engine — plays, retunes and stops a continuous tone without clicks.
//!
//! The engine owns the audio device, the shared gain and the current voice.
//! State changes happen synchronously when an operation is called; only the
//! teardown of outgoing voices is deferred. A station switch starts the new
//! voice immediately and makes it current, while the old one is stopped at
//! the crossfade midpoint and disconnected by a timer that owns it. Rapid
//! switching therefore never has to reason about more than one outgoing
//! voice, and a stale timer can only touch the voice it captured.
//!
//! Calls are expected to be serialized by the caller (every mutating
//! operation takes `&mut self`). Gain changes are always anchored to absolute
//! device times so overlapping ramps compose on the device clock.

mod state;
mod voice;


use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::clock::{SystemClock, Timestamp, WallClock};
use crate::config::EngineConfig;
use crate::device::software::{DEFAULT_SAMPLE_RATE, SoftwareDevice};
use crate::device::{AudioDevice, AutoplayPolicy, DeviceFactory, DeviceState};
use crate::error::{DeviceError, Result, ToneError};
use crate::prefs::{MemoryVolumeStore, VolumeStore};

pub use state::PlaybackMonitor;
pub use voice::ToneVoice;

use state::PlaybackState;

/// Result of [`ToneEngine::ensure_ready`]. Never an error: audio failures
/// degrade to silence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    /// The device exists but the platform declined to resume it. Retry after
    /// a user gesture.
    Suspended,
    /// No audio output could be opened.
    Unavailable,
}

/// Result of [`ToneEngine::play`] for a valid frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// The tone started; `at` is the wall-clock start of the session.
    Started { at: Timestamp },
    /// Audio is not available right now; nothing is playing.
    DeviceUnavailable,
}

impl PlayOutcome {
    pub fn started_at(self) -> Option<Timestamp> {
        match self {
            PlayOutcome::Started { at } => Some(at),
            PlayOutcome::DeviceUnavailable => None,
        }
    }
}

/// Check that `hz` is a finite frequency in `(0, max_hz]`.
pub fn validate_frequency(hz: f64, max_hz: f64) -> Result<()> {
    if hz.is_finite() && hz > 0.0 && hz <= max_hz {
        Ok(())
    } else {
        Err(ToneError::InvalidFrequency { hz, max: max_hz })
    }
}

fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or_default()
}

/// Pure-tone playback engine.
pub struct ToneEngine<D: AudioDevice> {
    factory: Box<dyn DeviceFactory<D>>,
    device: Option<D>,
    prefs: Box<dyn VolumeStore>,
    clock: Arc<dyn WallClock>,
    config: EngineConfig,
    state: PlaybackState<D>,
    next_generation: u64,
}

impl ToneEngine<SoftwareDevice> {
    /// Engine backed by the in-process software device.
    pub fn software(policy: AutoplayPolicy) -> Self {
        Self::new(
            move || Ok::<_, DeviceError>(SoftwareDevice::new(DEFAULT_SAMPLE_RATE, policy)),
            MemoryVolumeStore::new(),
        )
    }
}

impl<D: AudioDevice> ToneEngine<D> {
    /// Create an engine. The device is not opened until first use.
    pub fn new(
        factory: impl DeviceFactory<D> + 'static,
        prefs: impl VolumeStore + 'static,
    ) -> Self {
        ToneEngine {
            factory: Box::new(factory),
            device: None,
            prefs: Box::new(prefs),
            clock: Arc::new(SystemClock),
            config: EngineConfig::default(),
            state: PlaybackState::new(),
            next_generation: 0,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_clock(mut self, clock: impl WallClock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// A read-only handle for components that poll playback state.
    pub fn monitor(&self) -> PlaybackMonitor {
        self.state.monitor()
    }

    /// The device, once it has been opened.
    pub fn device(&self) -> Option<&D> {
        self.device.as_ref()
    }

    /// Open the device on first call (gain starts at 0) and try to resume
    /// it if it is suspended. A declined resume is logged and reported as
    /// [`Readiness::Suspended`]; the caller should retry after a user
    /// gesture.
    pub async fn ensure_ready(&mut self) -> Readiness {
        let device = match self.device.clone() {
            Some(device) => device,
            None => match self.factory.open() {
                Ok(device) => {
                    device.set_gain(0.0);
                    info!(state = ?device.state(), "audio device opened");
                    self.device = Some(device.clone());
                    device
                }
                Err(error) => {
                    info!(%error, "audio device unavailable");
                    return Readiness::Unavailable;
                }
            },
        };

        if device.state() == DeviceState::Suspended {
            if let Err(error) = device.resume().await {
                info!(%error, "audio resume declined; waiting for a user gesture");
                return Readiness::Suspended;
            }
        }
        Readiness::Ready
    }

    /// Start a tone from silence.
    ///
    /// Any voice already playing is cut immediately (this is the cold start
    /// path; use [`transition`](Self::transition) to switch). The gain ramps
    /// from 0 to the volume ceiling over the play fade-in window.
    ///
    /// Only an invalid frequency is an error. If audio is unavailable the
    /// call resolves to [`PlayOutcome::DeviceUnavailable`] and nothing plays.
    pub async fn play(&mut self, frequency: f64) -> Result<PlayOutcome> {
        validate_frequency(frequency, self.config.max_frequency_hz)?;

        if self.ensure_ready().await != Readiness::Ready {
            return Ok(PlayOutcome::DeviceUnavailable);
        }
        let Some(device) = self.device.clone() else {
            return Ok(PlayOutcome::DeviceUnavailable);
        };

        let now = device.current_time();
        if let Some(previous) = self.state.detach() {
            debug!(generation = previous.generation(), "cutting previous voice for restart");
            previous.retire(now);
        }

        let voice = match self.spawn_voice(&device, frequency, now) {
            Ok(voice) => voice,
            Err(error) => {
                warn!(frequency, %error, "could not start voice");
                self.state.clear();
                return Ok(PlayOutcome::DeviceUnavailable);
            }
        };

        let target = self.target_gain();
        device.hold_gain(now);
        device.set_gain_at(0.0, now);
        device.ramp_gain_to(target, now + self.config.play_fade_in_secs);

        info!(frequency, generation = voice.generation(), "tone started");
        self.state.replace_current(voice);
        Ok(PlayOutcome::Started {
            at: self.clock.now(),
        })
    }

    /// Switch to a new frequency without a gap.
    ///
    /// With nothing playing this is [`play`](Self::play). Otherwise the new
    /// voice starts now and becomes current immediately; the gain dips to 0
    /// at the crossfade midpoint, where the outgoing voice stops, and climbs
    /// back to the ceiling by the end of the window. The outgoing voice is
    /// disconnected by a timer shortly after its stop. Does not wait for the
    /// fade.
    pub async fn transition(&mut self, frequency: f64) -> Result<()> {
        validate_frequency(frequency, self.config.max_frequency_hz)?;

        if self.state.current().is_none() {
            return self.play(frequency).await.map(|_| ());
        }
        let Some(device) = self.device.clone() else {
            return self.play(frequency).await.map(|_| ());
        };

        let now = device.current_time();
        let midpoint = now + self.config.crossfade_midpoint_secs();
        let end = now + self.config.crossfade_secs;

        let incoming = match self.spawn_voice(&device, frequency, now) {
            Ok(voice) => voice,
            Err(error) => {
                warn!(frequency, %error, "could not start incoming voice; keeping current tone");
                return Ok(());
            }
        };

        let target = self.target_gain();
        device.hold_gain(now);
        device.ramp_gain_to(0.0, midpoint);
        device.ramp_gain_to(target, end);

        debug!(frequency, generation = incoming.generation(), "crossfade started");
        let Some(mut outgoing) = self.state.replace_current(incoming) else {
            return Ok(());
        };
        if let Err(error) = outgoing.stop_at(midpoint) {
            warn!(generation = outgoing.generation(), %error, "failed to schedule outgoing stop");
        }

        let delay = secs(self.config.crossfade_midpoint_secs() + self.config.cleanup_slack_secs);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            outgoing.finish_crossfade();
        });
        Ok(())
    }

    /// Fade out and tear down the current voice.
    ///
    /// Returns `None` if nothing was playing. Otherwise playback state is
    /// cleared at once, the gain ramps to 0 over the stop window, and the
    /// call resolves after the voice has been stopped and disconnected with
    /// the wall-clock end of the session. Teardown errors are logged, never
    /// returned.
    ///
    /// The fade and teardown run on their own task, so dropping this future
    /// early still lets the voice fade out before it is disconnected.
    pub async fn stop(&mut self) -> Option<Timestamp> {
        let voice = self.state.clear()?;
        let generation = voice.generation();

        if let Some(device) = self.device.clone() {
            let now = device.current_time();
            let fade = self.config.stop_fade_out_secs;
            device.hold_gain(now);
            device.ramp_gain_to(0.0, now + fade);
            let teardown = tokio::spawn(async move {
                tokio::time::sleep(secs(fade)).await;
                voice.retire(device.current_time());
            });
            if let Err(error) = teardown.await {
                warn!(generation, %error, "stop teardown task did not finish");
            }
        } else {
            drop(voice);
        }

        info!(generation, "tone stopped");
        Some(self.clock.now())
    }

    /// Silence or restore output without touching the voice.
    ///
    /// Sets the gain directly: 0 when muted, the volume ceiling otherwise.
    pub async fn set_mute(&mut self, muted: bool) {
        self.ensure_ready().await;
        let level = if muted { 0.0 } else { self.target_gain() };
        if let Some(device) = &self.device {
            device.set_gain(level);
            debug!(muted, level, "mute changed");
        }
    }

    /// Persist a 0–100 volume and apply it: ramped if a tone is playing,
    /// immediately otherwise.
    pub fn set_volume(&mut self, percent: u8) {
        let percent = percent.min(100);
        if let Err(error) = self.prefs.save_volume(percent) {
            warn!(%error, percent, "failed to save volume preference");
        }

        let gain = self.config.volume_to_gain(percent);
        let Some(device) = &self.device else {
            return;
        };
        if self.state.current().is_some() {
            let now = device.current_time();
            device.hold_gain(now);
            device.ramp_gain_to(gain, now + self.config.volume_ramp_secs);
        } else {
            device.set_gain(gain);
        }
    }

    /// Stored volume percent, or the configured default.
    pub fn get_volume(&self) -> u8 {
        match self.prefs.load_volume() {
            Ok(Some(percent)) => percent.min(100),
            Ok(None) => self.config.default_volume,
            Err(error) => {
                warn!(%error, "failed to read volume preference");
                self.config.default_volume
            }
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    /// Device clock in seconds, or `None` before the device is opened.
    pub fn current_time(&self) -> Option<f64> {
        self.device.as_ref().map(|device| device.current_time())
    }

    pub fn current_voice(&self) -> Option<&ToneVoice<D>> {
        self.state.current()
    }

    pub fn current_frequency(&self) -> Option<f64> {
        self.state.current().map(|voice| voice.frequency())
    }

    fn target_gain(&self) -> f64 {
        self.config.volume_to_gain(self.get_volume())
    }

    fn spawn_voice(
        &mut self,
        device: &D,
        frequency: f64,
        at: f64,
    ) -> std::result::Result<ToneVoice<D>, DeviceError> {
        self.next_generation += 1;
        let mut voice =
            ToneVoice::create(device, self.next_generation, self.config.waveform, frequency)?;
        voice.start(at)?;
        Ok(voice)
    }
}
