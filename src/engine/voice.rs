//! ToneVoice — one oscillator in the device graph, owned by exactly one holder.
//!
//! Whoever holds a voice is the only code that can stop or disconnect it.
//! The engine holds the current voice; a crossfade cleanup task holds the
//! outgoing one. Dropping a voice that is still connected disconnects it.

use std::fmt;

use tracing::{debug, warn};

use crate::device::{AudioDevice, VoiceId};
use crate::dsp::oscillator::Waveform;
use crate::error::DeviceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Created,
    Started,
    StopScheduled,
    Disconnected,
}

impl Lifecycle {
    fn name(self) -> &'static str {
        match self {
            Lifecycle::Created => "not started",
            Lifecycle::Started => "started",
            Lifecycle::StopScheduled => "stop scheduled",
            Lifecycle::Disconnected => "disconnected",
        }
    }
}

/// A single tone at a fixed frequency.
pub struct ToneVoice<D: AudioDevice> {
    device: D,
    id: VoiceId,
    generation: u64,
    frequency: f64,
    lifecycle: Lifecycle,
}

impl<D: AudioDevice> ToneVoice<D> {
    /// Create a voice connected to the device gain. It stays silent until
    /// [`start`](Self::start).
    pub(crate) fn create(
        device: &D,
        generation: u64,
        waveform: Waveform,
        frequency: f64,
    ) -> Result<Self, DeviceError> {
        let id = device.create_voice(waveform, frequency)?;
        debug!(%id, generation, frequency, "voice created");
        Ok(ToneVoice {
            device: device.clone(),
            id,
            generation,
            frequency,
            lifecycle: Lifecycle::Created,
        })
    }

    pub fn id(&self) -> VoiceId {
        self.id
    }

    /// Engine-wide sequence number, unique per voice.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn is_connected(&self) -> bool {
        self.lifecycle != Lifecycle::Disconnected
    }

    fn lifecycle_error(&self, op: &'static str) -> DeviceError {
        DeviceError::VoiceLifecycle {
            id: self.id,
            op,
            state: self.lifecycle.name(),
        }
    }

    pub(crate) fn start(&mut self, at: f64) -> Result<(), DeviceError> {
        if self.lifecycle != Lifecycle::Created {
            return Err(self.lifecycle_error("start"));
        }
        self.device.start_voice(self.id, at)?;
        self.lifecycle = Lifecycle::Started;
        Ok(())
    }

    /// Schedule the voice to fall silent at device time `at`. A later call
    /// reschedules.
    pub(crate) fn stop_at(&mut self, at: f64) -> Result<(), DeviceError> {
        match self.lifecycle {
            Lifecycle::Started | Lifecycle::StopScheduled => {
                self.device.stop_voice(self.id, at)?;
                self.lifecycle = Lifecycle::StopScheduled;
                Ok(())
            }
            Lifecycle::Created | Lifecycle::Disconnected => Err(self.lifecycle_error("stop")),
        }
    }

    pub(crate) fn disconnect(&mut self) -> Result<(), DeviceError> {
        if self.lifecycle == Lifecycle::Disconnected {
            return Err(self.lifecycle_error("disconnect"));
        }
        // Marked first so a failing device call is not retried on drop
        self.lifecycle = Lifecycle::Disconnected;
        self.device.disconnect_voice(self.id)?;
        debug!(id = %self.id, generation = self.generation, "voice disconnected");
        Ok(())
    }

    /// Stop at `at` and disconnect right away. Failures are logged; the voice
    /// is considered gone either way.
    pub(crate) fn retire(mut self, at: f64) {
        if let Err(error) = self.stop_at(at) {
            warn!(generation = self.generation, %error, "teardown: failed to stop voice");
        }
        if let Err(error) = self.disconnect() {
            warn!(generation = self.generation, %error, "teardown: failed to disconnect voice");
        }
    }

    /// Disconnect an outgoing voice once its scheduled stop has passed.
    pub(crate) fn finish_crossfade(mut self) {
        match self.disconnect() {
            Ok(()) => {}
            Err(DeviceError::UnknownVoice(id)) => {
                warn!(
                    %id,
                    generation = self.generation,
                    "crossfade cleanup fired for a voice no longer in the graph"
                );
            }
            Err(error) => {
                warn!(generation = self.generation, %error, "crossfade cleanup failed");
            }
        }
    }
}

impl<D: AudioDevice> Drop for ToneVoice<D> {
    fn drop(&mut self) {
        if self.lifecycle != Lifecycle::Disconnected {
            self.lifecycle = Lifecycle::Disconnected;
            let _ = self.device.disconnect_voice(self.id);
            debug!(id = %self.id, generation = self.generation, "voice dropped while connected");
        }
    }
}

impl<D: AudioDevice> fmt::Debug for ToneVoice<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToneVoice")
            .field("id", &self.id)
            .field("generation", &self.generation)
            .field("frequency", &self.frequency)
            .field("lifecycle", &self.lifecycle)
            .finish()
    }
}
