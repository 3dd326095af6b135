//! Configuration for the tone engine.
//!
//! The constant modules hold the fixed timings and levels; [`EngineConfig`]
//! carries them at runtime and can be overridden from JSON.

use serde::{Deserialize, Serialize};

use crate::dsp::oscillator::Waveform;
use crate::error::ConfigError;

/// Fade windows, in seconds on the device clock
pub mod fade {
    /// Gain ramp 0 → target when starting cold
    pub const PLAY_FADE_IN_SECS: f64 = 0.5;

    /// Full crossfade window; the outgoing voice stops at its midpoint
    pub const CROSSFADE_SECS: f64 = 0.35;

    /// Gain ramp current → 0 before a stopped voice is torn down
    pub const STOP_FADE_OUT_SECS: f64 = 0.8;

    /// Gain ramp when the volume changes mid-playback
    pub const VOLUME_RAMP_SECS: f64 = 0.1;

    /// Delay past an outgoing voice's scheduled stop before it is disconnected
    pub const CLEANUP_SLACK_SECS: f64 = 0.05;
}

/// Gain and volume levels
pub mod level {
    /// Gain ceiling at 100% volume. Long tones stay well below full scale.
    pub const MAX_GAIN: f64 = 0.3;

    /// Volume percent used when no preference has been stored
    pub const DEFAULT_VOLUME: u8 = 50;
}

/// Accepted tone frequencies
pub mod frequency {
    /// Upper bound of the audible range
    pub const MAX_HZ: f64 = 20_000.0;
}

/// Offline rendering limits
pub mod render {
    /// Longest preview that can be rendered in one call
    pub const MAX_SECS: f64 = 60.0;

    pub const MAX_SAMPLE_RATE: u32 = 192_000;
}

/// Runtime engine configuration.
///
/// Every field defaults to the matching constant, so a partial JSON object
/// only overrides what it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub play_fade_in_secs: f64,
    pub crossfade_secs: f64,
    pub stop_fade_out_secs: f64,
    pub volume_ramp_secs: f64,
    pub cleanup_slack_secs: f64,
    pub max_gain: f64,
    pub max_frequency_hz: f64,
    pub default_volume: u8,
    pub waveform: Waveform,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            play_fade_in_secs: fade::PLAY_FADE_IN_SECS,
            crossfade_secs: fade::CROSSFADE_SECS,
            stop_fade_out_secs: fade::STOP_FADE_OUT_SECS,
            volume_ramp_secs: fade::VOLUME_RAMP_SECS,
            cleanup_slack_secs: fade::CLEANUP_SLACK_SECS,
            max_gain: level::MAX_GAIN,
            max_frequency_hz: frequency::MAX_HZ,
            default_volume: level::DEFAULT_VOLUME,
            waveform: Waveform::Sine,
        }
    }
}

impl EngineConfig {
    /// Parse a (possibly partial) JSON configuration object and
    /// [`validate`](Self::validate) it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject windows, levels and limits that cannot be scheduled: every
    /// window must be finite and non-negative, the gain ceiling within
    /// `[0, 1]`, the frequency ceiling positive and the default volume at
    /// most 100.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let windows = [
            ("playFadeInSecs", self.play_fade_in_secs),
            ("crossfadeSecs", self.crossfade_secs),
            ("stopFadeOutSecs", self.stop_fade_out_secs),
            ("volumeRampSecs", self.volume_ramp_secs),
            ("cleanupSlackSecs", self.cleanup_slack_secs),
        ];
        for (field, value) in windows {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::OutOfRange { field, value });
            }
        }
        if !(0.0..=1.0).contains(&self.max_gain) {
            return Err(ConfigError::OutOfRange {
                field: "maxGain",
                value: self.max_gain,
            });
        }
        if !(self.max_frequency_hz.is_finite() && self.max_frequency_hz > 0.0) {
            return Err(ConfigError::OutOfRange {
                field: "maxFrequencyHz",
                value: self.max_frequency_hz,
            });
        }
        if self.default_volume > 100 {
            return Err(ConfigError::OutOfRange {
                field: "defaultVolume",
                value: f64::from(self.default_volume),
            });
        }
        Ok(())
    }

    /// Convert a 0–100 volume percent into a gain ceiling in `[0, max_gain]`.
    pub fn volume_to_gain(&self, percent: u8) -> f64 {
        f64::from(percent.min(100)) / 100.0 * self.max_gain
    }

    /// Half of the crossfade window: where gain bottoms out and the
    /// outgoing voice stops.
    pub fn crossfade_midpoint_secs(&self) -> f64 {
        self.crossfade_secs / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.play_fade_in_secs, 0.5);
        assert_eq!(cfg.crossfade_secs, 0.35);
        assert_eq!(cfg.stop_fade_out_secs, 0.8);
        assert_eq!(cfg.max_gain, 0.3);
        assert_eq!(cfg.waveform, Waveform::Sine);
    }

    #[test]
    fn partial_json_overrides() {
        let cfg = EngineConfig::from_json(r#"{"crossfadeSecs": 1.0, "defaultVolume": 80}"#)
            .expect("parse failed");
        assert_eq!(cfg.crossfade_secs, 1.0);
        assert_eq!(cfg.default_volume, 80);
        assert_eq!(cfg.stop_fade_out_secs, fade::STOP_FADE_OUT_SECS);
    }

    #[test]
    fn out_of_range_windows_rejected() {
        for json in [
            r#"{"stopFadeOutSecs": -0.8}"#,
            r#"{"volumeRampSecs": -0.1}"#,
            r#"{"maxGain": 1.5}"#,
            r#"{"maxFrequencyHz": 0}"#,
            r#"{"defaultVolume": 150}"#,
        ] {
            assert!(
                matches!(EngineConfig::from_json(json), Err(ConfigError::OutOfRange { .. })),
                "{json} should be rejected"
            );
        }
        assert!(matches!(
            EngineConfig::from_json("{not json"),
            Err(ConfigError::Parse(_))
        ));

        let nan_window = EngineConfig {
            play_fade_in_secs: f64::NAN,
            ..EngineConfig::default()
        };
        assert!(matches!(
            nan_window.validate(),
            Err(ConfigError::OutOfRange { field: "playFadeInSecs", .. })
        ));
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn volume_to_gain_is_linear_and_bounded() {
        let cfg = EngineConfig::default();
        for percent in 0..=100u8 {
            let gain = cfg.volume_to_gain(percent);
            assert!((0.0..=0.3).contains(&gain), "gain out of range: {gain}");
            let expected = f64::from(percent) * 0.003;
            assert!((gain - expected).abs() < 1e-12);
        }
        assert_eq!(cfg.volume_to_gain(255), cfg.volume_to_gain(100));
    }

    #[test]
    fn midpoint_is_half_the_window() {
        let cfg = EngineConfig::default();
        assert!((cfg.crossfade_midpoint_secs() - 0.175).abs() < 1e-12);
    }
}
