//! Error types for the tone engine.
//!
//! Only [`ToneError`] ever reaches a caller of the engine. Device and
//! persistence failures are logged and absorbed where they happen.

use thiserror::Error;

use crate::device::VoiceId;

/// Errors surfaced by engine operations and offline rendering.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToneError {
    #[error("invalid frequency {hz} Hz (expected a finite value in (0, {max}] Hz)")]
    InvalidFrequency { hz: f64, max: f64 },

    #[error("invalid render length {seconds} s (expected a finite value in [0, {max}] s)")]
    InvalidDuration { seconds: f64, max: f64 },

    #[error("invalid sample rate {rate} Hz (expected 1..={max} Hz)")]
    InvalidSampleRate { rate: u32, max: u32 },
}

/// Failures reported by an [`AudioDevice`](crate::device::AudioDevice).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeviceError {
    /// The platform exposes no audio output at all.
    #[error("no audio device available: {0}")]
    Unavailable(String),

    /// Resume was declined until the user interacts with the page.
    #[error("audio resume blocked until a user gesture")]
    AutoplayBlocked,

    #[error("voice {0} is not connected to the graph")]
    UnknownVoice(VoiceId),

    #[error("voice {id}: cannot {op} while {state}")]
    VoiceLifecycle {
        id: VoiceId,
        op: &'static str,
        state: &'static str,
    },
}

/// Rejected engine configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("config field `{field}` out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

/// Failures reading or writing the volume preference.
#[derive(Error, Debug)]
pub enum PrefsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid preferences file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("could not determine a config directory")]
    NoConfigDir,
}

pub type Result<T> = std::result::Result<T, ToneError>;
