use crate::config::BitDepth;

/// Quantize `[-1, 1]` float samples into integer PCM bytes.
///
/// Samples are clamped first. Negative values scale by the magnitude of the
/// type's minimum and positive values by its maximum, then truncate toward
/// zero. No dithering.
///
/// * 8-bit: unsigned offset-binary bytes, silence at `0x80`.
/// * 16-bit: little-endian signed integers.
#[must_use]
pub fn encode(samples: &[f32], depth: BitDepth) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * depth.bytes());
    match depth {
        BitDepth::Eight => out.extend(samples.iter().map(|&s| quantize_u8(s))),
        BitDepth::Sixteen => {
            for &s in samples {
                out.extend_from_slice(&quantize_i16(s).to_le_bytes());
            }
        }
    }
    out
}

#[must_use]
pub fn quantize_i16(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    let value = if s < 0.0 { s * 32768.0 } else { s * 32767.0 };
    value as i16
}

#[must_use]
pub fn quantize_u8(sample: f32) -> u8 {
    let s = sample.clamp(-1.0, 1.0);
    let value = if s < 0.0 { s * 128.0 } else { s * 127.0 };
    (value + 128.0) as u8
}
