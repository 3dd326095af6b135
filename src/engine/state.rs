//! Playback state and the read-only monitor handed to other components.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::device::AudioDevice;

use super::voice::ToneVoice;

#[derive(Debug, Default)]
struct Shared {
    playing: AtomicBool,
    frequency_bits: AtomicU64,
}

/// Cloneable read-only view of the engine's playback state.
///
/// Meant to be polled, e.g. once per animation frame.
#[derive(Debug, Clone, Default)]
pub struct PlaybackMonitor {
    shared: Arc<Shared>,
}

impl PlaybackMonitor {
    pub fn is_playing(&self) -> bool {
        self.shared.playing.load(Ordering::Acquire)
    }

    /// Frequency of the current tone, if one is playing.
    pub fn frequency(&self) -> Option<f64> {
        self.is_playing()
            .then(|| f64::from_bits(self.shared.frequency_bits.load(Ordering::Acquire)))
    }

    // The frequency is written before the flag is raised and left in place
    // when it is lowered, so a poller that sees `playing` always reads the
    // frequency of a voice that really played.
    fn publish_playing(&self, frequency: f64) {
        self.shared
            .frequency_bits
            .store(frequency.to_bits(), Ordering::Release);
        self.shared.playing.store(true, Ordering::Release);
    }

    fn publish_stopped(&self) {
        self.shared.playing.store(false, Ordering::Release);
    }
}

/// The current voice, if any, and whether audio is playing.
///
/// Only the engine mutates this.
pub(crate) struct PlaybackState<D: AudioDevice> {
    active: Option<ToneVoice<D>>,
    playing: bool,
    monitor: PlaybackMonitor,
}

impl<D: AudioDevice> PlaybackState<D> {
    pub(crate) fn new() -> Self {
        PlaybackState {
            active: None,
            playing: false,
            monitor: PlaybackMonitor::default(),
        }
    }

    pub(crate) fn monitor(&self) -> PlaybackMonitor {
        self.monitor.clone()
    }

    pub(crate) fn is_playing(&self) -> bool {
        self.playing
    }

    pub(crate) fn current(&self) -> Option<&ToneVoice<D>> {
        self.active.as_ref()
    }

    /// Make `voice` current and return the one it replaces.
    pub(crate) fn replace_current(&mut self, voice: ToneVoice<D>) -> Option<ToneVoice<D>> {
        self.monitor.publish_playing(voice.frequency());
        self.playing = true;
        self.active.replace(voice)
    }

    /// Take the current voice without changing the playing flag, for a
    /// restart that immediately installs a replacement.
    pub(crate) fn detach(&mut self) -> Option<ToneVoice<D>> {
        self.active.take()
    }

    /// Reset to not playing and hand back the voice that was current.
    pub(crate) fn clear(&mut self) -> Option<ToneVoice<D>> {
        self.monitor.publish_stopped();
        self.playing = false;
        self.active.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::software::SoftwareDevice;
    use crate::dsp::oscillator::Waveform;

    #[test]
    fn monitor_follows_state() {
        let device = SoftwareDevice::offline(8000);
        let mut state = PlaybackState::new();
        let monitor = state.monitor();
        assert!(!monitor.is_playing());
        assert_eq!(monitor.frequency(), None);

        let voice = ToneVoice::create(&device, 1, Waveform::Sine, 432.0).expect("create");
        assert!(state.replace_current(voice).is_none());
        assert!(monitor.is_playing());
        assert_eq!(monitor.frequency(), Some(432.0));

        let next = ToneVoice::create(&device, 2, Waveform::Sine, 528.0).expect("create");
        let previous = state.replace_current(next).expect("previous voice");
        assert_eq!(previous.generation(), 1);
        assert_eq!(monitor.frequency(), Some(528.0));

        assert!(state.clear().is_some());
        assert!(!state.is_playing());
        assert!(!monitor.is_playing());
        assert!(state.current().is_none());
    }

    #[test]
    fn poller_never_sees_a_blank_frequency() {
        let monitor = PlaybackMonitor::default();
        let reader = monitor.clone();
        let poller = std::thread::spawn(move || {
            for _ in 0..20_000 {
                if let Some(hz) = reader.frequency() {
                    assert!(hz == 432.0 || hz == 528.0, "read {hz} while playing");
                }
            }
        });

        for i in 0..20_000 {
            monitor.publish_playing(if i % 2 == 0 { 432.0 } else { 528.0 });
            monitor.publish_stopped();
        }
        poller.join().expect("poller panicked");
        assert_eq!(monitor.frequency(), None);
    }
}
