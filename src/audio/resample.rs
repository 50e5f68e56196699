//! Integer-factor decimation.
//!
//! No interpolation and no anti-alias filtering: content above the new
//! Nyquist frequency aliases. Upsampling is never performed; an output rate at
//! or above the input rate passes the data through unchanged.

/// Decimation factor for a rate pair, never zero.
#[must_use]
pub fn factor(input_rate: u32, output_rate: u32) -> usize {
    if output_rate == 0 {
        return 1;
    }
    ((input_rate / output_rate) as usize).max(1)
}

/// Keep every Nth sample, where N = `max(floor(input / output), 1)`.
#[must_use]
pub fn compress(samples: &[f32], input_rate: u32, output_rate: u32) -> Vec<f32> {
    let n = factor(input_rate, output_rate);
    let len = samples.len() / n;
    samples.iter().step_by(n).take(len).copied().collect()
}

/// Decimate interleaved audio by whole frames so channels stay aligned.
///
/// With one channel this is identical to [`compress`].
#[must_use]
pub fn compress_frames(
    samples: &[f32],
    channels: usize,
    input_rate: u32,
    output_rate: u32,
) -> Vec<f32> {
    if channels <= 1 {
        return compress(samples, input_rate, output_rate);
    }

    let n = factor(input_rate, output_rate);
    let frames = samples.len() / channels;
    let out_frames = frames / n;
    let mut out = Vec::with_capacity(out_frames * channels);
    for frame in samples.chunks_exact(channels).step_by(n).take(out_frames) {
        out.extend_from_slice(frame);
    }
    out
}
