use std::io::Cursor;

use hound::{SampleFormat, WavReader};

use crate::config::BitDepth;
use crate::error::{RecorderError, Result};

/// Size of the canonical RIFF/WAVE PCM header written by [`encode`].
pub const HEADER_LEN: usize = 44;

/// Wrap a PCM payload in a 44-byte RIFF/WAVE header.
///
/// The header's sample rate is `min(input_rate, output_rate)`, not the output
/// rate: decimation never upsamples, so this is the effective rate whenever the
/// requested output rate is above the input rate.
#[must_use]
pub fn encode(
    payload: &[u8],
    input_rate: u32,
    output_rate: u32,
    channels: u16,
    depth: BitDepth,
) -> Vec<u8> {
    let sample_rate = input_rate.min(output_rate);
    let bytes_per_sample = depth.bytes() as u16;
    let block_align = channels * bytes_per_sample;
    let byte_rate = sample_rate * u32::from(block_align);
    let data_len = payload.len() as u32;

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&depth.bits().to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    out.extend_from_slice(payload);
    out
}

/// Format and payload location recovered from a WAV header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavInfo {
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub data_offset: usize,
    pub data_len: usize,
}

impl WavInfo {
    /// Read the header of `wav` up to the start of its `data` chunk.
    ///
    /// Only integer PCM is accepted. A `data` chunk that claims more bytes
    /// than the buffer holds is truncated to what is there.
    pub fn parse(wav: &[u8]) -> Result<Self> {
        let reader = WavReader::new(Cursor::new(wav)).map_err(|e| malformed(&e.to_string()))?;
        let spec = reader.spec();
        if spec.sample_format != SampleFormat::Int {
            return Err(malformed("unsupported audio format, expected integer PCM"));
        }

        let bytes_per_sample = usize::from(spec.bits_per_sample).div_ceil(8);
        let claimed = reader.len() as usize * bytes_per_sample;
        let data_offset = reader.into_inner().position() as usize;

        Ok(Self {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
            data_offset,
            data_len: claimed.min(wav.len().saturating_sub(data_offset)),
        })
    }

    #[must_use]
    pub fn payload<'a>(&self, wav: &'a [u8]) -> &'a [u8] {
        &wav[self.data_offset..self.data_offset + self.data_len]
    }

    /// Number of whole samples (all channels) present in the payload.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.data_len / usize::from(self.bits_per_sample).div_ceil(8).max(1)
    }
}

/// Interleaved float samples decoded from a WAV buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Decode a WAV buffer into `[-1, 1]` floats for playback.
pub fn decode(wav: &[u8]) -> Result<DecodedAudio> {
    let reader = WavReader::new(Cursor::new(wav))
        .map_err(|e| RecorderError::Playback(format!("failed to read WAV: {e}")))?;
    let spec = reader.spec();

    let samples: Vec<f32> = if spec.sample_format == SampleFormat::Float {
        reader
            .into_samples::<f32>()
            .map(|s| s.map_err(|e| RecorderError::Playback(format!("WAV read error: {e}"))))
            .collect::<Result<Vec<f32>>>()?
    } else {
        let scale = f32::powi(2.0, i32::from(spec.bits_per_sample) - 1);
        reader
            .into_samples::<i32>()
            .map(|s| {
                s.map(|v| v as f32 / scale)
                    .map_err(|e| RecorderError::Playback(format!("WAV read error: {e}")))
            })
            .collect::<Result<Vec<f32>>>()?
    };

    Ok(DecodedAudio {
        samples,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    })
}

fn malformed(reason: &str) -> RecorderError {
    RecorderError::Encoder(format!("malformed WAV header: {reason}"))
}
