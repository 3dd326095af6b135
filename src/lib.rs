pub mod clock;
pub mod config;
pub mod device;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod prefs;
pub mod station;

pub use crate::clock::{Timestamp, session_duration_secs};
pub use crate::config::EngineConfig;
pub use crate::device::{AudioDevice, AutoplayPolicy};
pub use crate::engine::{PlayOutcome, PlaybackMonitor, Readiness, ToneEngine};
pub use crate::error::{ConfigError, DeviceError, ToneError};

use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the tonestation-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// A JS number as a 0–100 volume percent. Out-of-range values clamp and
/// NaN reads as 0.
fn percent_from_js(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

/// WASM-exposed: gain ceiling for a 0–100 volume percent.
#[wasm_bindgen]
pub fn volume_to_gain(percent: f64) -> f64 {
    EngineConfig::default().volume_to_gain(percent_from_js(percent))
}

/// WASM-exposed: whether `hz` would be accepted by `play`/`transition`.
#[wasm_bindgen]
pub fn is_valid_frequency(hz: f64) -> bool {
    engine::validate_frequency(hz, config::frequency::MAX_HZ).is_ok()
}

/// WASM-exposed: whole seconds between two millisecond timestamps.
#[wasm_bindgen]
pub fn session_duration_seconds(start_ms: f64, end_ms: f64) -> f64 {
    let start = Timestamp(start_ms.max(0.0) as u64);
    let end = Timestamp(end_ms.max(0.0) as u64);
    session_duration_secs(start, end) as f64
}

/// WASM-exposed: the built-in station catalog as an array of objects.
#[wasm_bindgen]
pub fn station_catalog() -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(station::catalog()).map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// WASM-exposed: render a tone preview (fade in, hold, fade out) to WAV bytes.
#[wasm_bindgen]
pub fn render_tone_wav(
    frequency: f64,
    seconds: f64,
    sample_rate: u32,
    volume: f64,
) -> Result<Vec<u8>, JsValue> {
    dsp::renderer::render_tone_wav(
        frequency,
        seconds,
        sample_rate,
        percent_from_js(volume),
        &EngineConfig::default(),
    )
    .map_err(|e| JsValue::from_str(&format!("{e}")))
}
