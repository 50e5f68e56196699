use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig, SupportedStreamConfig};
use crossbeam_channel::{Receiver, TryRecvError, bounded};

use crate::error::{RecorderError, Result};

/// Captured blocks waiting to be drained by the session.
const QUEUE_DEPTH: usize = 256;

/// One capture block as per-channel sample arrays.
pub type ChannelBlock = Vec<Vec<f32>>;

/// A connected or disconnected capture input.
///
/// While connected, the source queues fixed-size blocks which the owner drains
/// in FIFO order with [`CaptureSource::try_next_block`].
pub trait CaptureSource {
    fn connect(&mut self) -> Result<()>;
    fn disconnect(&mut self) -> Result<()>;
    fn try_next_block(&mut self) -> Option<ChannelBlock>;
}

/// Acquires capture streams from an input device.
#[allow(async_fn_in_trait)]
pub trait StreamProvider {
    type Source: CaptureSource;

    /// Native rate of the device, known before any stream is acquired.
    fn input_sample_rate(&self) -> u32;

    /// Open a stream delivering `channels` channels. Fails with
    /// [`RecorderError::DeviceAcquisition`] when the device is unavailable.
    async fn acquire(&mut self, channels: u16) -> Result<Self::Source>;
}

/// Cuts interleaved device audio into fixed-size per-channel blocks.
///
/// Output channel `c` reads device channel `min(c, device_channels - 1)`, so a
/// mono device feeds both sides of a stereo recording.
#[derive(Debug)]
pub struct BlockCutter {
    device_channels: usize,
    block_size: usize,
    pending: ChannelBlock,
}

impl BlockCutter {
    #[must_use]
    pub fn new(device_channels: u16, channels: u16, block_size: usize) -> Self {
        Self {
            device_channels: usize::from(device_channels.max(1)),
            block_size: block_size.max(1),
            pending: vec![Vec::with_capacity(block_size); usize::from(channels.max(1))],
        }
    }

    /// Feed interleaved device samples, emitting every block that fills up.
    pub fn feed(&mut self, interleaved: &[f32], mut emit: impl FnMut(ChannelBlock)) {
        for frame in interleaved.chunks_exact(self.device_channels) {
            for (c, channel) in self.pending.iter_mut().enumerate() {
                channel.push(frame[c.min(self.device_channels - 1)]);
            }

            if self.pending[0].len() == self.block_size {
                let fresh = vec![Vec::with_capacity(self.block_size); self.pending.len()];
                emit(std::mem::replace(&mut self.pending, fresh));
            }
        }
    }
}

/// Capture input backed by a cpal stream.
pub struct CpalCapture {
    stream: Stream,
    receiver: Receiver<ChannelBlock>,
    dropped: Arc<AtomicUsize>,
    connected: bool,
}

impl CaptureSource for CpalCapture {
    fn connect(&mut self) -> Result<()> {
        if self.connected {
            return Ok(());
        }
        self.stream
            .play()
            .map_err(|e| RecorderError::Audio(format!("failed to start audio stream: {e}")))?;
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        if !self.connected {
            return Ok(());
        }
        self.stream
            .pause()
            .map_err(|e| RecorderError::Audio(format!("failed to pause audio stream: {e}")))?;
        self.connected = false;
        Ok(())
    }

    fn try_next_block(&mut self) -> Option<ChannelBlock> {
        let dropped = self.dropped.swap(0, Ordering::Relaxed);
        if dropped > 0 {
            tracing::warn!("capture queue full, dropped {dropped} block(s)");
        }

        match self.receiver.try_recv() {
            Ok(block) => Some(block),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                tracing::debug!("capture callback gone");
                None
            }
        }
    }
}

/// Opens cpal input streams on a fixed device.
pub struct CpalStreamProvider {
    device: Device,
    supported: SupportedStreamConfig,
    block_size: usize,
}

impl CpalStreamProvider {
    /// Resolve `device_name` (or the default input device) and its native
    /// configuration.
    pub fn new(device_name: Option<&str>, block_size: usize) -> Result<Self> {
        let host = cpal::default_host();

        let device = if let Some(name) = device_name {
            host.input_devices()
                .map_err(|e| {
                    RecorderError::DeviceAcquisition(format!(
                        "failed to enumerate input devices: {e}"
                    ))
                })?
                .find(|d| device_label(d).as_deref() == Some(name))
                .ok_or_else(|| {
                    RecorderError::DeviceAcquisition(format!("input device not found: {name}"))
                })?
        } else {
            host.default_input_device().ok_or_else(|| {
                RecorderError::DeviceAcquisition("no default input device available".to_string())
            })?
        };

        let supported = device.default_input_config().map_err(|e| {
            RecorderError::DeviceAcquisition(format!("failed to get default input config: {e}"))
        })?;

        Ok(Self {
            device,
            supported,
            block_size,
        })
    }
}

impl StreamProvider for CpalStreamProvider {
    type Source = CpalCapture;

    fn input_sample_rate(&self) -> u32 {
        self.supported.sample_rate()
    }

    async fn acquire(&mut self, channels: u16) -> Result<CpalCapture> {
        let device_channels = self.supported.channels();
        let stream_config = StreamConfig {
            channels: device_channels,
            sample_rate: self.supported.sample_rate(),
            buffer_size: cpal::BufferSize::Default,
        };

        let (tx, rx) = bounded::<ChannelBlock>(QUEUE_DEPTH);
        let dropped = Arc::new(AtomicUsize::new(0));
        let dropped_in_callback = Arc::clone(&dropped);
        let mut cutter = BlockCutter::new(device_channels, channels, self.block_size);

        let err_fn = |err: cpal::StreamError| {
            tracing::error!("audio stream error: {err}");
        };

        let stream = self
            .device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                    // try_send keeps the audio callback from ever blocking
                    cutter.feed(data, |block| {
                        if tx.try_send(block).is_err() {
                            dropped_in_callback.fetch_add(1, Ordering::Relaxed);
                        }
                    });
                },
                err_fn,
                None,
            )
            .map_err(|e| {
                RecorderError::DeviceAcquisition(format!("failed to build input stream: {e}"))
            })?;

        // Some hosts start streams on creation; stay silent until connected.
        stream.pause().map_err(|e| {
            RecorderError::DeviceAcquisition(format!("failed to pause new input stream: {e}"))
        })?;

        tracing::debug!(
            "acquired input stream: device_channels={device_channels}, channels={channels}, rate={}",
            stream_config.sample_rate
        );

        Ok(CpalCapture {
            stream,
            receiver: rx,
            dropped,
            connected: false,
        })
    }
}

fn device_label(device: &Device) -> Option<String> {
    device
        .description()
        .ok()
        .map(|desc| desc.name().to_string())
}

/// Names of every input device on the default host.
pub fn list_input_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|e| RecorderError::Audio(format!("failed to enumerate input devices: {e}")))?;
    Ok(devices.filter_map(|d| device_label(&d)).collect())
}

#[must_use]
pub fn default_input_device_name() -> Option<String> {
    cpal::default_host()
        .default_input_device()
        .and_then(|d| device_label(&d))
}
