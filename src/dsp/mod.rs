//! DSP — pure Rust signal generation behind the software audio device.
//!
//! Oscillators are evaluated at absolute device times and the shared gain
//! is an automation timeline, so the same code serves real-time playback
//! and offline WAV rendering.

pub mod automation;
pub mod mixer;
pub mod oscillator;
pub mod renderer;
