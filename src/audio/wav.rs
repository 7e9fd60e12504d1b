//! In-memory WAV encoding for cloud uploads.
//!
//! Produces a 44-byte RIFF/WAVE header followed by signed 16-bit
//! little-endian PCM, mono, 16kHz — the container the transcription
//! endpoint expects.

use crate::defaults::SAMPLE_RATE;
use crate::error::{Result, VoxnoteError};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::Cursor;

/// Convert one [-1, 1] float sample to i16.
///
/// Positive values scale by 32767, negative by 32768, so both endpoints of
/// the float range map exactly onto the int16 range.
pub fn f32_to_i16(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);
    if clamped >= 0.0 {
        (clamped * 32767.0) as i16
    } else {
        (clamped * 32768.0) as i16
    }
}

/// Encode f32 samples as a complete 16-bit PCM mono 16kHz WAV file.
pub fn encode_wav(samples: &[f32]) -> Result<Vec<u8>> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut buffer = Cursor::new(Vec::new());
    {
        let mut writer =
            WavWriter::new(&mut buffer, spec).map_err(|e| VoxnoteError::CloudTranscription {
                message: format!("failed to create WAV writer: {e}"),
            })?;

        for &sample in samples {
            writer
                .write_sample(f32_to_i16(sample))
                .map_err(|e| VoxnoteError::CloudTranscription {
                    message: format!("failed to write sample: {e}"),
                })?;
        }

        writer
            .finalize()
            .map_err(|e| VoxnoteError::CloudTranscription {
                message: format!("failed to finalize WAV: {e}"),
            })?;
    }

    Ok(buffer.into_inner())
}
