//! Container decoding for synthesized speech.
//!
//! Only the first channel is kept; synthesis engines emit mono and any extra
//! channels are duplicates at best.

use std::io::Cursor;

use claxon::FlacReader;

use crate::error::DurationError;
use crate::types::Waveform;

const RIFF_MAGIC: &[u8; 4] = b"RIFF";
const FLAC_MAGIC: &[u8; 4] = b"fLaC";

pub fn decode_audio_bytes(audio_bytes: &[u8]) -> Result<Waveform, DurationError> {
    if audio_bytes.is_empty() {
        return Err(DurationError::decode("empty audio input"));
    }

    let waveform = if audio_bytes.starts_with(RIFF_MAGIC) {
        decode_wav_bytes(audio_bytes)?
    } else if audio_bytes.starts_with(FLAC_MAGIC) {
        decode_flac_bytes(audio_bytes)?
    } else {
        return Err(DurationError::decode(
            "unsupported audio container (expected RIFF/WAVE or FLAC)",
        ));
    };

    if waveform.sample_rate_hz == 0 {
        return Err(DurationError::decode(
            "decoded audio is missing a sample rate",
        ));
    }
    Ok(waveform)
}

fn decode_wav_bytes(wav_bytes: &[u8]) -> Result<Waveform, DurationError> {
    let mut reader = hound::WavReader::new(Cursor::new(wav_bytes))
        .map_err(|e| DurationError::decode(format!("failed to parse WAV: {e}")))?;

    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let scale = int_scale(spec.bits_per_sample as u32);
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| pcm_to_unit(s, scale)))
                .collect::<Result<_, _>>()
                .map_err(|e| DurationError::decode(format!("failed reading WAV samples: {e}")))?
        }
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| DurationError::decode(format!("failed reading WAV samples: {e}")))?,
    };

    Ok(Waveform::new(
        spec.sample_rate,
        first_channel(interleaved, channels),
    ))
}

fn decode_flac_bytes(flac_bytes: &[u8]) -> Result<Waveform, DurationError> {
    let mut reader = FlacReader::new(Cursor::new(flac_bytes))
        .map_err(|e| DurationError::decode(format!("failed to parse FLAC: {e}")))?;
    let streaminfo = reader.streaminfo();
    let channels = streaminfo.channels as usize;
    if channels == 0 {
        return Err(DurationError::decode("FLAC stream has zero channels"));
    }
    let scale = int_scale(streaminfo.bits_per_sample);
    let sample_rate_hz = streaminfo.sample_rate;

    let interleaved = reader
        .samples()
        .map(|s| s.map(|s| pcm_to_unit(s, scale)))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| DurationError::decode(format!("failed reading FLAC samples: {e}")))?;

    Ok(Waveform::new(
        sample_rate_hz,
        first_channel(interleaved, channels),
    ))
}

fn int_scale(bits_per_sample: u32) -> f32 {
    if bits_per_sample > 1 {
        ((1_i64 << (bits_per_sample - 1)) - 1) as f32
    } else {
        1.0
    }
}

/// Integer PCM to [-1, 1]; the most negative code would land just past -1.
fn pcm_to_unit(sample: i32, scale: f32) -> f32 {
    (sample as f32 / scale).clamp(-1.0, 1.0)
}

fn first_channel(interleaved: Vec<f32>, channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved;
    }
    interleaved.into_iter().step_by(channels).collect()
}
