use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig, SupportedStreamConfigRange};

use crate::codec::DecodedAudio;
use crate::error::{RecorderError, Result};

/// Something that can render a decoded recording.
///
/// Audio is played at its own sample rate and channel count; no conversion
/// to the device's preferred format takes place.
pub trait PlaybackSink {
    /// Start playing `audio`, replacing anything already playing.
    fn play(&mut self, audio: DecodedAudio) -> Result<()>;

    /// Stop playback. Calling this when nothing plays is a no-op.
    fn stop(&mut self);

    fn is_playing(&self) -> bool;
}

/// Plays through the default cpal output device.
#[derive(Default)]
pub struct CpalPlayback {
    stream: Option<Stream>,
    finished: Arc<AtomicBool>,
}

impl CpalPlayback {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlaybackSink for CpalPlayback {
    fn play(&mut self, audio: DecodedAudio) -> Result<()> {
        self.stop();

        let device = cpal::default_host()
            .default_output_device()
            .ok_or_else(|| RecorderError::Playback("no output device available".to_string()))?;

        if !supports(&device, audio.channels, audio.sample_rate)? {
            return Err(RecorderError::Playback(format!(
                "output device does not support {} channel(s) @ {}Hz",
                audio.channels, audio.sample_rate
            )));
        }

        let config = StreamConfig {
            channels: audio.channels,
            sample_rate: audio.sample_rate,
            buffer_size: cpal::BufferSize::Default,
        };

        let finished = Arc::new(AtomicBool::new(audio.samples.is_empty()));
        let finished_in_callback = Arc::clone(&finished);
        let samples = audio.samples;
        let mut cursor = 0usize;

        let err_fn = |err: cpal::StreamError| {
            tracing::error!("playback stream error: {err}");
        };

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for out in data.iter_mut() {
                        *out = samples.get(cursor).copied().unwrap_or(0.0);
                        cursor += 1;
                    }
                    if cursor >= samples.len() {
                        finished_in_callback.store(true, Ordering::Relaxed);
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| RecorderError::Playback(format!("failed to build output stream: {e}")))?;

        stream
            .play()
            .map_err(|e| RecorderError::Playback(format!("failed to start playback: {e}")))?;

        tracing::debug!(
            "playback started: {} channel(s) @ {}Hz",
            config.channels,
            config.sample_rate
        );

        self.stream = Some(stream);
        self.finished = finished;
        Ok(())
    }

    fn stop(&mut self) {
        if self.stream.take().is_some() {
            tracing::debug!("playback stopped");
        }
        self.finished.store(true, Ordering::Relaxed);
    }

    fn is_playing(&self) -> bool {
        self.stream.is_some() && !self.finished.load(Ordering::Relaxed)
    }
}

fn supports(device: &cpal::Device, channels: u16, sample_rate: u32) -> Result<bool> {
    let mut configs = device
        .supported_output_configs()
        .map_err(|e| RecorderError::Playback(format!("failed to query output configs: {e}")))?;
    Ok(configs.any(|range| range_fits(&range, channels, sample_rate)))
}

fn range_fits(range: &SupportedStreamConfigRange, channels: u16, sample_rate: u32) -> bool {
    range.channels() == channels
        && range.min_sample_rate() <= sample_rate
        && sample_rate <= range.max_sample_rate()
}
