use std::io::Cursor;

use hound::WavReader;

use crate::codec::wav::WavInfo;
use crate::error::{RecorderError, Result};

/// Samples handed to the encoder per call.
pub const SAMPLES_PER_FRAME: usize = 1152;

/// Fixed output bitrate.
pub const BITRATE_KBPS: u32 = 128;

/// Parameters an MP3 encoder is constructed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderParams {
    pub channels: u16,
    pub sample_rate: u32,
    pub bitrate_kbps: u32,
}

/// An external MP3 encoder fed with interleaved 16-bit PCM.
pub trait Mp3Encoder {
    /// Encode one window of samples; may return an empty block while the
    /// encoder is still buffering.
    fn encode_buffer(&mut self, samples: &[i16]) -> Result<Vec<u8>>;

    /// Drain whatever the encoder still holds.
    fn flush(&mut self) -> Result<Vec<u8>>;
}

pub type EncoderFactory = Box<dyn Fn(&EncoderParams) -> Result<Box<dyn Mp3Encoder>>>;

/// Create the built-in encoder.
pub fn create_encoder(params: &EncoderParams) -> Result<Box<dyn Mp3Encoder>> {
    #[cfg(feature = "mp3")]
    {
        Ok(Box::new(lame::LameEncoder::new(params)?))
    }

    #[cfg(not(feature = "mp3"))]
    {
        let _ = params;
        Err(RecorderError::Encoder(
            "MP3 support not compiled in (enable the `mp3` feature)".to_string(),
        ))
    }
}

/// Encode a WAV buffer into an ordered sequence of MP3 blocks.
///
/// Only full windows of [`SAMPLES_PER_FRAME`] samples are submitted; a
/// shorter trailing window is neither padded nor encoded. The final element
/// is the encoder's flush output when it is non-empty.
pub fn encode<F>(wav: &[u8], make_encoder: F) -> Result<Vec<Vec<u8>>>
where
    F: FnOnce(&EncoderParams) -> Result<Box<dyn Mp3Encoder>>,
{
    let info = WavInfo::parse(wav)?;
    let samples = pcm_samples(wav, &info)?;

    let params = EncoderParams {
        channels: info.channels,
        sample_rate: info.sample_rate,
        bitrate_kbps: BITRATE_KBPS,
    };
    let mut encoder = make_encoder(&params)?;

    tracing::debug!(
        "mp3: {} samples, {} channel(s) @ {}Hz, {} full frames",
        samples.len(),
        params.channels,
        params.sample_rate,
        samples.len() / SAMPLES_PER_FRAME
    );

    let mut blocks = Vec::new();
    for window in samples.chunks_exact(SAMPLES_PER_FRAME) {
        let block = encoder.encode_buffer(window)?;
        if !block.is_empty() {
            blocks.push(block);
        }
    }

    let tail = encoder.flush()?;
    if !tail.is_empty() {
        blocks.push(tail);
    }

    Ok(blocks)
}

fn pcm_samples(wav: &[u8], info: &WavInfo) -> Result<Vec<i16>> {
    // 8-bit values come back from hound already centered on zero.
    let shift = match info.bits_per_sample {
        16 => 0,
        8 => 8,
        bits => {
            return Err(RecorderError::Encoder(format!(
                "unsupported bits per sample for MP3 encoding: {bits}"
            )));
        }
    };

    let reader = WavReader::new(Cursor::new(wav))
        .map_err(|e| RecorderError::Encoder(format!("failed to read WAV: {e}")))?;

    reader
        .into_samples::<i16>()
        .take(info.sample_count())
        .map(|s| {
            s.map(|v| v << shift)
                .map_err(|e| RecorderError::Encoder(format!("WAV read error: {e}")))
        })
        .collect()
}

#[cfg(feature = "mp3")]
mod lame {
    use mp3lame_encoder::{
        Bitrate, Builder, Encoder, FlushNoGap, InterleavedPcm, MonoPcm, Quality,
        max_required_buffer_size,
    };

    use super::{EncoderParams, Mp3Encoder};
    use crate::error::{RecorderError, Result};

    /// LAME-backed encoder.
    pub struct LameEncoder {
        inner: Encoder,
        channels: u16,
    }

    impl LameEncoder {
        pub fn new(params: &EncoderParams) -> Result<Self> {
            let mut builder = Builder::new().ok_or_else(|| {
                RecorderError::Encoder("failed to allocate LAME encoder".to_string())
            })?;

            builder
                .set_num_channels(params.channels as u8)
                .map_err(|e| RecorderError::Encoder(format!("invalid channel count: {e:?}")))?;
            builder
                .set_sample_rate(params.sample_rate)
                .map_err(|e| RecorderError::Encoder(format!("invalid sample rate: {e:?}")))?;
            builder
                .set_brate(bitrate(params.bitrate_kbps)?)
                .map_err(|e| RecorderError::Encoder(format!("invalid bitrate: {e:?}")))?;
            builder
                .set_quality(Quality::Good)
                .map_err(|e| RecorderError::Encoder(format!("invalid quality: {e:?}")))?;

            let inner = builder
                .build()
                .map_err(|e| RecorderError::Encoder(format!("failed to initialize LAME: {e:?}")))?;

            Ok(Self {
                inner,
                channels: params.channels,
            })
        }
    }

    impl Mp3Encoder for LameEncoder {
        fn encode_buffer(&mut self, samples: &[i16]) -> Result<Vec<u8>> {
            let mut out = Vec::with_capacity(max_required_buffer_size(samples.len()));
            let encoded = if self.channels == 1 {
                self.inner.encode_to_vec(MonoPcm(samples), &mut out)
            } else {
                self.inner.encode_to_vec(InterleavedPcm(samples), &mut out)
            };
            encoded.map_err(|e| RecorderError::Encoder(format!("LAME encode failed: {e:?}")))?;
            Ok(out)
        }

        fn flush(&mut self) -> Result<Vec<u8>> {
            let mut out = Vec::with_capacity(max_required_buffer_size(0));
            self.inner
                .flush_to_vec::<FlushNoGap>(&mut out)
                .map_err(|e| RecorderError::Encoder(format!("LAME flush failed: {e:?}")))?;
            Ok(out)
        }
    }

    fn bitrate(kbps: u32) -> Result<Bitrate> {
        Ok(match kbps {
            64 => Bitrate::Kbps64,
            96 => Bitrate::Kbps96,
            128 => Bitrate::Kbps128,
            160 => Bitrate::Kbps160,
            192 => Bitrate::Kbps192,
            256 => Bitrate::Kbps256,
            320 => Bitrate::Kbps320,
            other => {
                return Err(RecorderError::Encoder(format!(
                    "unsupported bitrate: {other} kbps"
                )));
            }
        })
    }
}
