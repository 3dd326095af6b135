//! WAV renderer — captures device output as 16-bit mono PCM.

use tracing::warn;

use crate::config::{EngineConfig, render};
use crate::device::AudioDevice;
use crate::device::software::SoftwareDevice;
use crate::engine::{ToneVoice, validate_frequency};
use crate::error::ToneError;

/// Check a render request against [`render::MAX_SECS`] and
/// [`render::MAX_SAMPLE_RATE`].
pub fn validate_render(seconds: f64, sample_rate: u32) -> Result<(), ToneError> {
    if !(seconds.is_finite() && (0.0..=render::MAX_SECS).contains(&seconds)) {
        return Err(ToneError::InvalidDuration {
            seconds,
            max: render::MAX_SECS,
        });
    }
    if sample_rate == 0 || sample_rate > render::MAX_SAMPLE_RATE {
        return Err(ToneError::InvalidSampleRate {
            rate: sample_rate,
            max: render::MAX_SAMPLE_RATE,
        });
    }
    Ok(())
}

/// Render `seconds` of a device's output, starting at device time `start`.
pub fn render_wav(
    device: &SoftwareDevice,
    start: f64,
    seconds: f64,
) -> Result<Vec<u8>, ToneError> {
    let sample_rate = device.sample_rate();
    validate_render(seconds, sample_rate)?;
    let frames = (seconds * f64::from(sample_rate)) as usize;
    let samples = device.render(start, frames);
    Ok(encode_wav(&to_pcm_i16(&samples), sample_rate, 1))
}

/// Render a standalone tone preview: the play fade-in, a steady hold, and
/// the stop fade-out, all at the given volume.
pub fn render_tone_wav(
    frequency: f64,
    seconds: f64,
    sample_rate: u32,
    volume: u8,
    config: &EngineConfig,
) -> Result<Vec<u8>, ToneError> {
    validate_frequency(frequency, config.max_frequency_hz)?;
    validate_render(seconds, sample_rate)?;
    let target = config.volume_to_gain(volume);
    let device = SoftwareDevice::offline(sample_rate);

    let peak = config.play_fade_in_secs.min(seconds / 2.0);
    let release = (seconds - config.stop_fade_out_secs).max(peak);
    device.set_gain_at(0.0, 0.0);
    device.ramp_gain_to(target, peak);
    device.set_gain_at(target, release);
    device.ramp_gain_to(0.0, seconds);

    let voice = ToneVoice::create(&device, 0, config.waveform, frequency).and_then(|mut voice| {
        voice.start(0.0)?;
        voice.stop_at(seconds)?;
        Ok(voice)
    });
    if let Err(error) = &voice {
        warn!(frequency, %error, "preview voice failed; rendering silence");
    }

    let wav = render_wav(&device, 0.0, seconds);
    drop(voice);
    wav
}

fn to_pcm_i16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16)
        .collect()
}

/// Encode interleaved i16 PCM samples to a WAV byte buffer.
fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
    let bits_per_sample: u16 = 16;
    let byte_rate = sample_rate * channels as u32 * (bits_per_sample as u32 / 8);
    let block_align = channels * (bits_per_sample / 8);
    let data_size = (samples.len() * 2) as u32;
    let file_size = 36 + data_size;

    let mut buf = Vec::with_capacity(44 + data_size as usize);

    // RIFF header
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&file_size.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    // fmt chunk
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM format
    buf.extend_from_slice(&channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());

    // data chunk
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for &sample in samples {
        buf.extend_from_slice(&sample.to_le_bytes());
    }

    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pcm(wav: &[u8]) -> Vec<i16> {
        wav[44..]
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect()
    }

    #[test]
    fn wav_header_valid() {
        let wav = render_tone_wav(432.0, 1.0, 8000, 100, &EngineConfig::default())
            .expect("render failed");

        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(&wav[36..40], b"data");

        let sr = u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]);
        assert_eq!(sr, 8000);
        let ch = u16::from_le_bytes([wav[22], wav[23]]);
        assert_eq!(ch, 1);

        // 1 s at 8 kHz mono 16-bit
        let data_size = u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]);
        assert_eq!(data_size, 16_000);
        assert_eq!(wav.len(), 44 + 16_000);
    }

    #[test]
    fn tone_preview_fades_in_and_out() {
        let wav = render_tone_wav(432.0, 2.0, 8000, 100, &EngineConfig::default())
            .expect("render failed");
        let samples = pcm(&wav);
        let peak = |range: std::ops::Range<usize>| {
            samples[range].iter().map(|s| s.unsigned_abs()).max().unwrap_or(0)
        };

        assert!(peak(0..80) < 1500, "starts near silence");
        assert!(peak(6000..8000) > 8000, "holds at the ceiling");
        assert!(peak(15_920..16_000) < 1500, "ends near silence");
    }

    #[test]
    fn invalid_preview_frequency_rejected() {
        let result = render_tone_wav(30_000.0, 1.0, 8000, 50, &EngineConfig::default());
        assert!(matches!(result, Err(ToneError::InvalidFrequency { .. })));
    }

    #[test]
    fn unbounded_lengths_rejected() {
        let cfg = EngineConfig::default();
        for seconds in [f64::INFINITY, f64::NAN, -1.0, render::MAX_SECS + 1.0, 1e7] {
            let result = render_tone_wav(432.0, seconds, 8000, 50, &cfg);
            assert!(
                matches!(result, Err(ToneError::InvalidDuration { .. })),
                "{seconds} s should be rejected"
            );
        }

        let device = SoftwareDevice::offline(8000);
        assert!(matches!(
            render_wav(&device, 0.0, f64::INFINITY),
            Err(ToneError::InvalidDuration { .. })
        ));
    }

    #[test]
    fn unsupported_sample_rates_rejected() {
        let cfg = EngineConfig::default();
        for rate in [0, render::MAX_SAMPLE_RATE + 1, u32::MAX] {
            assert!(matches!(
                render_tone_wav(432.0, 1.0, rate, 50, &cfg),
                Err(ToneError::InvalidSampleRate { .. })
            ));
        }
    }

    #[test]
    fn silent_device_renders_zeros() {
        let device = SoftwareDevice::offline(8000);
        let wav = render_wav(&device, 0.0, 0.5).expect("render failed");
        assert_eq!(wav.len(), 44 + 8000);
        assert!(pcm(&wav).iter().all(|&s| s == 0));
    }
}
