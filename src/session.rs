use std::borrow::Cow;
use std::path::PathBuf;
use std::time::Duration;

use crate::audio::buffer::{FrameCollector, flatten};
use crate::audio::capture::{CaptureSource, StreamProvider};
use crate::audio::playback::PlaybackSink;
use crate::audio::resample::compress_frames;
use crate::codec::mp3::{self, EncoderFactory, EncoderParams, Mp3Encoder};
use crate::codec::{pcm, wav};
use crate::config::{RecorderConfig, RecorderOptions};
use crate::error::{RecorderError, Result};
use crate::output::ArtifactWriter;

pub const PCM_MIME: &str = "application/octet-stream";
pub const WAV_MIME: &str = "audio/wav";
pub const MP3_MIME: &str = "audio/mp3";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Recording,
    Paused,
    Stopped,
}

/// Encoded bytes tagged with their MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioBlob {
    pub data: Vec<u8>,
    pub mime_type: &'static str,
}

/// Owns one recording: the capture wiring, the block buffer and the cached
/// encodings derived from it.
///
/// Capture only ever appends blocks. Encoding happens on demand in the output
/// accessors; PCM and WAV results are cached until the next [`start`].
///
/// [`start`]: RecordingSession::start
pub struct RecordingSession<P: StreamProvider> {
    config: RecorderConfig,
    provider: P,
    state: SessionState,
    source: Option<P::Source>,
    collector: FrameCollector,
    pcm: Option<Vec<u8>>,
    wav: Option<Vec<u8>>,
    mp3_encoder: EncoderFactory,
    playback: Option<Box<dyn PlaybackSink>>,
}

impl<P: StreamProvider> RecordingSession<P> {
    /// Create an idle session. The input rate is taken from the provider;
    /// invalid options fall back to their defaults.
    pub fn new(provider: P, options: &RecorderOptions) -> Self {
        let input_rate = provider.input_sample_rate();
        let config = RecorderConfig::resolve(options, input_rate);

        tracing::debug!(
            "session config: input={}Hz output={}Hz bits={} channels={}",
            config.input_sample_rate(),
            config.output_sample_rate(),
            config.sample_bits().bits(),
            config.channels()
        );

        Self {
            config,
            provider,
            state: SessionState::Idle,
            source: None,
            collector: FrameCollector::new(input_rate),
            pcm: None,
            wav: None,
            mp3_encoder: Box::new(mp3::create_encoder),
            playback: None,
        }
    }

    #[must_use]
    pub fn with_mp3_encoder<F>(mut self, factory: F) -> Self
    where
        F: Fn(&EncoderParams) -> Result<Box<dyn Mp3Encoder>> + 'static,
    {
        self.mp3_encoder = Box::new(factory);
        self
    }

    #[must_use]
    pub fn with_playback(mut self, sink: impl PlaybackSink + 'static) -> Self {
        self.playback = Some(Box::new(sink));
        self
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub const fn config(&self) -> &RecorderConfig {
        &self.config
    }

    #[must_use]
    pub const fn sample_count(&self) -> usize {
        self.collector.sample_count()
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.collector.duration()
    }

    /// Begin a new recording.
    ///
    /// Clears the buffer, the cached outputs and any running playback, then
    /// waits for the device stream. Does nothing while a recording is in
    /// progress (recording or paused).
    pub async fn start(&mut self) -> Result<()> {
        if matches!(self.state, SessionState::Recording | SessionState::Paused) {
            tracing::debug!("start ignored: already recording");
            return Ok(());
        }

        self.clear();
        self.state = SessionState::Recording;

        let mut source = match self.provider.acquire(self.config.channels()).await {
            Ok(source) => source,
            Err(e) => {
                self.state = SessionState::Idle;
                return Err(e);
            }
        };

        if let Err(e) = source.connect() {
            self.state = SessionState::Idle;
            return Err(e);
        }

        self.source = Some(source);
        tracing::info!("recording started");
        Ok(())
    }

    /// Disconnect capture, keeping everything recorded so far.
    pub fn pause(&mut self) -> Result<()> {
        if self.state != SessionState::Recording {
            return Ok(());
        }

        self.pump();
        if let Some(source) = self.source.as_mut() {
            source.disconnect()?;
        }
        self.state = SessionState::Paused;
        tracing::info!("recording paused");
        Ok(())
    }

    /// Reconnect capture after [`pause`](Self::pause).
    pub fn resume(&mut self) -> Result<()> {
        if self.state != SessionState::Paused {
            return Ok(());
        }

        if let Some(source) = self.source.as_mut() {
            source.connect()?;
        }
        self.state = SessionState::Recording;
        tracing::info!("recording resumed");
        Ok(())
    }

    /// Tear down the capture wiring. Buffered audio is retained; calling this
    /// again is a no-op.
    pub fn stop(&mut self) -> Result<()> {
        if !matches!(self.state, SessionState::Recording | SessionState::Paused) {
            return Ok(());
        }

        self.pump();
        let result = self
            .source
            .take()
            .map_or(Ok(()), |mut source| source.disconnect());
        self.state = SessionState::Stopped;

        tracing::info!(
            "recording stopped: {} samples, {:.2}s",
            self.collector.sample_count(),
            self.collector.duration_secs()
        );
        result
    }

    /// Drain queued capture blocks into the buffer, in arrival order.
    ///
    /// Returns the number of blocks appended. Only drains while recording.
    pub fn pump(&mut self) -> usize {
        if self.state != SessionState::Recording {
            return 0;
        }
        let Some(source) = self.source.as_mut() else {
            return 0;
        };

        let channels = self.config.channels();
        let mut appended = 0;
        while let Some(block) = source.try_next_block() {
            self.collector.push(&fit_channels(&block, channels));
            appended += 1;
        }
        appended
    }

    /// Append one block given as per-channel arrays.
    ///
    /// The block is fitted to the configured channel count: missing channels
    /// repeat the last one supplied and extra channels are ignored. A block
    /// with no channel arrays is dropped.
    pub fn push_block(&mut self, channels: &[Vec<f32>]) {
        if channels.is_empty() {
            tracing::debug!("ignoring block without channels");
            return;
        }
        self.collector.push(&fit_channels(channels, self.config.channels()));
    }

    /// Raw PCM: decimated, quantized, interleaved, no header.
    pub fn pcm(&mut self) -> &[u8] {
        let collector = &self.collector;
        let config = &self.config;
        self.pcm.get_or_insert_with(|| render_pcm(collector, config))
    }

    pub fn pcm_blob(&mut self) -> AudioBlob {
        AudioBlob {
            data: self.pcm().to_vec(),
            mime_type: PCM_MIME,
        }
    }

    /// Stop the session and write the PCM to `<name>.pcm`.
    pub fn download_pcm(&mut self, writer: &ArtifactWriter) -> Result<PathBuf> {
        self.stop()?;
        writer.write("pcm", self.pcm())
    }

    /// The PCM wrapped in a 44-byte WAV header.
    pub fn wav(&mut self) -> &[u8] {
        if self.wav.is_none() {
            let config = self.config;
            let payload = self.pcm();
            let container = wav::encode(
                payload,
                config.input_sample_rate(),
                config.output_sample_rate(),
                config.channels(),
                config.sample_bits(),
            );
            self.wav = Some(container);
        }
        self.wav.as_deref().unwrap_or_default()
    }

    pub fn wav_blob(&mut self) -> AudioBlob {
        AudioBlob {
            data: self.wav().to_vec(),
            mime_type: WAV_MIME,
        }
    }

    /// Stop the session and write the WAV to `<name>.wav`.
    pub fn download_wav(&mut self, writer: &ArtifactWriter) -> Result<PathBuf> {
        self.stop()?;
        writer.write("wav", self.wav())
    }

    /// Stop the session and encode the WAV into MP3 blocks.
    pub fn mp3(&mut self) -> Result<Vec<Vec<u8>>> {
        self.stop()?;
        self.wav();

        let container = self.wav.as_deref().unwrap_or_default();
        let factory = &self.mp3_encoder;
        mp3::encode(container, |params| factory(params))
    }

    pub fn mp3_blob(&mut self) -> Result<AudioBlob> {
        Ok(AudioBlob {
            data: self.mp3()?.concat(),
            mime_type: MP3_MIME,
        })
    }

    /// Stop the session and play the recording back from the start.
    pub fn play(&mut self) -> Result<()> {
        self.stop()?;
        if self.playback.is_none() {
            return Err(RecorderError::Playback(
                "no playback sink configured".to_string(),
            ));
        }

        self.wav();
        let audio = wav::decode(self.wav.as_deref().unwrap_or_default())?;

        if let Some(sink) = self.playback.as_mut() {
            sink.stop();
            sink.play(audio)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.playback.as_ref().is_some_and(|sink| sink.is_playing())
    }

    /// Release the device stream and the playback sink.
    pub fn destroy(mut self) {
        if let Err(e) = self.stop() {
            tracing::warn!("error while stopping capture: {e}");
        }
        if let Some(mut sink) = self.playback.take() {
            sink.stop();
        }
        tracing::debug!("session destroyed");
    }

    fn clear(&mut self) {
        self.collector.clear();
        self.pcm = None;
        self.wav = None;
        if let Some(sink) = self.playback.as_mut() {
            sink.stop();
        }
    }
}

fn fit_channels(block: &[Vec<f32>], channels: u16) -> Cow<'_, [Vec<f32>]> {
    let wanted = usize::from(channels);
    if block.len() == wanted || block.is_empty() {
        return Cow::Borrowed(block);
    }
    Cow::Owned(
        (0..wanted)
            .map(|c| block[c.min(block.len() - 1)].clone())
            .collect(),
    )
}

fn render_pcm(collector: &FrameCollector, config: &RecorderConfig) -> Vec<u8> {
    let samples = flatten(collector);
    let samples = compress_frames(
        &samples,
        usize::from(config.channels()),
        config.input_sample_rate(),
        config.output_sample_rate(),
    );
    let bytes = pcm::encode(&samples, config.sample_bits());

    tracing::debug!(
        "pcm: {} buffered samples -> {} samples -> {} bytes",
        collector.sample_count(),
        samples.len(),
        bytes.len()
    );
    bytes
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::rc::Rc;

    use super::*;
    use crate::audio::capture::ChannelBlock;
    use crate::codec::DecodedAudio;
    use crate::codec::wav::{HEADER_LEN, WavInfo};

    type Queue = Rc<RefCell<VecDeque<ChannelBlock>>>;

    struct FakeSource {
        queue: Queue,
        connected: Rc<Cell<bool>>,
    }

    impl CaptureSource for FakeSource {
        fn connect(&mut self) -> Result<()> {
            self.connected.set(true);
            Ok(())
        }

        fn disconnect(&mut self) -> Result<()> {
            self.connected.set(false);
            Ok(())
        }

        fn try_next_block(&mut self) -> Option<ChannelBlock> {
            if self.connected.get() {
                self.queue.borrow_mut().pop_front()
            } else {
                None
            }
        }
    }

    struct FakeProvider {
        rate: u32,
        queue: Queue,
        connected: Rc<Cell<bool>>,
        acquisitions: Rc<Cell<usize>>,
        fail: bool,
    }

    impl FakeProvider {
        fn new(rate: u32) -> Self {
            Self {
                rate,
                queue: Rc::default(),
                connected: Rc::default(),
                acquisitions: Rc::default(),
                fail: false,
            }
        }
    }

    impl StreamProvider for FakeProvider {
        type Source = FakeSource;

        fn input_sample_rate(&self) -> u32 {
            self.rate
        }

        async fn acquire(&mut self, _channels: u16) -> Result<FakeSource> {
            self.acquisitions.set(self.acquisitions.get() + 1);
            if self.fail {
                return Err(RecorderError::DeviceAcquisition(
                    "permission denied".to_string(),
                ));
            }
            Ok(FakeSource {
                queue: Rc::clone(&self.queue),
                connected: Rc::clone(&self.connected),
            })
        }
    }

    struct Handles {
        queue: Queue,
        connected: Rc<Cell<bool>>,
        acquisitions: Rc<Cell<usize>>,
    }

    fn session(rate: u32, options: &RecorderOptions) -> (RecordingSession<FakeProvider>, Handles) {
        let provider = FakeProvider::new(rate);
        let handles = Handles {
            queue: Rc::clone(&provider.queue),
            connected: Rc::clone(&provider.connected),
            acquisitions: Rc::clone(&provider.acquisitions),
        };
        (RecordingSession::new(provider, options), handles)
    }

    fn mono(samples: &[f32]) -> ChannelBlock {
        vec![samples.to_vec()]
    }

    struct FlushOnly;

    impl Mp3Encoder for FlushOnly {
        fn encode_buffer(&mut self, _samples: &[i16]) -> Result<Vec<u8>> {
            Ok(vec![0xAA])
        }

        fn flush(&mut self) -> Result<Vec<u8>> {
            Ok(vec![0xFF, 0xFB])
        }
    }

    #[derive(Default)]
    struct FakeSink {
        played: Rc<RefCell<Vec<DecodedAudio>>>,
        stops: Rc<Cell<usize>>,
    }

    impl PlaybackSink for FakeSink {
        fn play(&mut self, audio: DecodedAudio) -> Result<()> {
            self.played.borrow_mut().push(audio);
            Ok(())
        }

        fn stop(&mut self) {
            self.stops.set(self.stops.get() + 1);
        }

        fn is_playing(&self) -> bool {
            !self.played.borrow().is_empty()
        }
    }

    #[tokio::test]
    async fn start_connects_and_records() {
        let (mut s, h) = session(16000, &RecorderOptions::default());
        assert_eq!(s.state(), SessionState::Idle);

        s.start().await.unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(s.state(), SessionState::Recording);
        assert!(h.connected.get());

        h.queue.borrow_mut().push_back(mono(&[0.1, 0.2]));
        h.queue.borrow_mut().push_back(mono(&[0.3]));
        assert_eq!(s.pump(), 2);
        assert_eq!(s.sample_count(), 3);
    }

    #[tokio::test]
    async fn second_start_is_a_no_op() {
        let (mut s, h) = session(16000, &RecorderOptions::default());
        s.start().await.unwrap_or_else(|e| panic!("{e}"));
        h.queue.borrow_mut().push_back(mono(&[0.5; 160]));
        s.pump();
        let pcm_before = s.pcm().to_vec();
        let duration_before = s.duration();

        s.start().await.unwrap_or_else(|e| panic!("{e}"));

        assert_eq!(h.acquisitions.get(), 1);
        assert_eq!(s.sample_count(), 160);
        assert_eq!(s.duration(), duration_before);
        assert_eq!(s.pcm(), &pcm_before[..]);
    }

    #[tokio::test]
    async fn start_while_paused_is_a_no_op() {
        let (mut s, h) = session(16000, &RecorderOptions::default());
        s.start().await.unwrap_or_else(|e| panic!("{e}"));
        h.queue.borrow_mut().push_back(mono(&[0.25; 80]));
        s.pause().unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(s.state(), SessionState::Paused);

        s.start().await.unwrap_or_else(|e| panic!("{e}"));

        assert_eq!(s.state(), SessionState::Paused);
        assert_eq!(h.acquisitions.get(), 1);
        assert!(!h.connected.get());
        assert_eq!(s.sample_count(), 80);
    }

    #[tokio::test]
    async fn failed_acquisition_leaves_session_idle() {
        let mut provider = FakeProvider::new(48000);
        provider.fail = true;
        let mut s = RecordingSession::new(provider, &RecorderOptions::default());

        let err = s.start().await.unwrap_err();
        assert!(matches!(err, RecorderError::DeviceAcquisition(_)));
        assert_eq!(s.state(), SessionState::Idle);
        assert_eq!(s.pump(), 0);
    }

    #[tokio::test]
    async fn pause_and_resume_keep_buffer() {
        let (mut s, h) = session(100, &RecorderOptions::default());
        s.start().await.unwrap_or_else(|e| panic!("{e}"));
        h.queue.borrow_mut().push_back(mono(&[0.1; 100]));

        s.pause().unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(s.state(), SessionState::Paused);
        assert!(!h.connected.get());
        // Pause drains what was already queued.
        assert_eq!(s.sample_count(), 100);

        h.queue.borrow_mut().push_back(mono(&[0.2; 50]));
        assert_eq!(s.pump(), 0);
        assert_eq!(s.sample_count(), 100);

        s.resume().unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(s.state(), SessionState::Recording);
        assert_eq!(s.pump(), 1);
        assert_eq!(s.sample_count(), 150);
        assert_eq!(s.duration(), Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn pause_and_resume_outside_their_states_do_nothing() {
        let (mut s, _h) = session(16000, &RecorderOptions::default());
        s.pause().unwrap_or_else(|e| panic!("{e}"));
        s.resume().unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(s.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn stop_twice_keeps_data() {
        let (mut s, h) = session(16000, &RecorderOptions::default());
        s.start().await.unwrap_or_else(|e| panic!("{e}"));
        h.queue.borrow_mut().push_back(mono(&[0.25; 64]));

        s.stop().unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(s.state(), SessionState::Stopped);
        assert!(!h.connected.get());
        assert_eq!(s.sample_count(), 64);

        s.stop().unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(s.state(), SessionState::Stopped);
        assert_eq!(s.sample_count(), 64);
    }

    #[tokio::test]
    async fn restart_clears_buffer_and_cache() {
        let (mut s, h) = session(16000, &RecorderOptions::default());
        s.start().await.unwrap_or_else(|e| panic!("{e}"));
        h.queue.borrow_mut().push_back(mono(&[0.5; 10]));
        s.stop().unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(s.pcm().len(), 20);

        s.start().await.unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(s.sample_count(), 0);
        assert_eq!(s.duration(), Duration::ZERO);
        assert!(s.pcm().is_empty());
        assert_eq!(h.acquisitions.get(), 2);
    }

    #[tokio::test]
    async fn cached_pcm_survives_new_blocks_until_restart() {
        let (mut s, _h) = session(16000, &RecorderOptions::default());
        s.push_block(&mono(&[0.5; 4]));
        assert_eq!(s.pcm().len(), 8);

        s.push_block(&mono(&[0.5; 4]));
        assert_eq!(s.pcm().len(), 8);
        assert_eq!(s.sample_count(), 8);
    }

    #[test]
    fn pcm_pipeline_decimates_and_quantizes() {
        let options = RecorderOptions {
            sample_rate: Some(16000),
            ..RecorderOptions::default()
        };
        let (mut s, _h) = session(48000, &options);
        let samples: Vec<f32> = (0..9).map(|i| i as f32 / 10.0).collect();
        s.push_block(&mono(&samples));

        let pcm = s.pcm().to_vec();
        assert_eq!(pcm.len(), 3 * 2);
        let decoded: Vec<i16> = pcm
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect();
        assert_eq!(decoded, vec![0, pcm::quantize_i16(0.3), pcm::quantize_i16(0.6)]);
    }

    #[test]
    fn stereo_eight_bit_pipeline() {
        let options = RecorderOptions {
            sample_bits: Some(8),
            sample_rate: Some(24000),
            num_channels: Some(2),
        };
        let (mut s, _h) = session(48000, &options);
        s.push_block(&[vec![1.0, 0.0, -1.0, 0.0], vec![-1.0, 0.0, 1.0, 0.0]]);

        // Frames 0 and 2 survive decimation by two, channels stay paired.
        assert_eq!(s.pcm(), &[255, 0, 0, 255]);

        let wav = s.wav().to_vec();
        let info = WavInfo::parse(&wav).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(info.channels, 2);
        assert_eq!(info.bits_per_sample, 8);
        assert_eq!(info.sample_rate, 24000);
        assert_eq!(info.data_len, 4);
    }

    #[test]
    fn mono_block_in_stereo_session_is_duplicated() {
        let options = RecorderOptions {
            num_channels: Some(2),
            ..RecorderOptions::default()
        };
        let (mut s, _h) = session(16000, &options);
        s.push_block(&[vec![0.5; 3]]);

        assert_eq!(s.sample_count(), 6);
        assert_eq!(s.pcm().len(), 6 * 2);
        let info = WavInfo::parse(s.wav()).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(info.channels, 2);
        assert_eq!(info.data_len, 12);
    }

    #[test]
    fn extra_channels_are_ignored() {
        let (mut s, _h) = session(16000, &RecorderOptions::default());
        s.push_block(&[vec![1.0, 1.0], vec![-1.0, -1.0], vec![0.0, 0.0]]);
        s.push_block(&[]);

        assert_eq!(s.sample_count(), 2);
        assert_eq!(s.pcm(), &[0xFF, 0x7F, 0xFF, 0x7F]);
    }

    #[tokio::test]
    async fn pumped_blocks_are_fitted_to_channel_count() {
        let options = RecorderOptions {
            num_channels: Some(2),
            ..RecorderOptions::default()
        };
        let (mut s, h) = session(16000, &options);
        s.start().await.unwrap_or_else(|e| panic!("{e}"));
        h.queue.borrow_mut().push_back(mono(&[0.1, 0.2]));
        s.pump();
        assert_eq!(s.sample_count(), 4);
    }

    #[test]
    fn wav_round_trips_channel_count_and_payload_length() {
        let options = RecorderOptions {
            num_channels: Some(2),
            ..RecorderOptions::default()
        };
        let (mut s, _h) = session(44100, &options);
        s.push_block(&[vec![0.1; 4096], vec![-0.1; 4096]]);

        let payload_len = s.pcm().len();
        let blob = s.wav_blob();
        assert_eq!(blob.mime_type, WAV_MIME);
        assert_eq!(blob.data.len(), HEADER_LEN + payload_len);

        let info = WavInfo::parse(&blob.data).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(info.channels, 2);
        assert_eq!(info.data_len, payload_len);
        assert_eq!(info.data_len, 4096 * 2 * 2);
    }

    #[tokio::test]
    async fn mp3_of_empty_recording_is_flush_tail() {
        let (s, _h) = session(44100, &RecorderOptions::default());
        let mut s = s.with_mp3_encoder(|_| Ok(Box::new(FlushOnly) as Box<dyn Mp3Encoder>));
        let blocks = s.mp3().unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(blocks, vec![vec![0xFF, 0xFB]]);
    }

    #[tokio::test]
    async fn mp3_stops_session_first() {
        let (s, h) = session(44100, &RecorderOptions::default());
        let mut s = s.with_mp3_encoder(|_| Ok(Box::new(FlushOnly) as Box<dyn Mp3Encoder>));
        s.start().await.unwrap_or_else(|e| panic!("{e}"));
        h.queue.borrow_mut().push_back(mono(&[0.0; 2400]));

        let blob = s.mp3_blob().unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(s.state(), SessionState::Stopped);
        // 2400 samples: two full windows plus the flush tail.
        assert_eq!(blob.data, vec![0xAA, 0xAA, 0xFF, 0xFB]);
        assert_eq!(blob.mime_type, MP3_MIME);
    }

    #[test]
    fn mp3_encoder_failure_propagates_and_keeps_cache() {
        let (s, _h) = session(16000, &RecorderOptions::default());
        let mut s = s.with_mp3_encoder(|_| Err(RecorderError::Encoder("boom".to_string())));
        s.push_block(&mono(&[0.5; 8]));
        let wav_before = s.wav().to_vec();

        let err = s.mp3().unwrap_err();
        assert!(matches!(err, RecorderError::Encoder(_)));
        assert_eq!(s.wav(), &wav_before[..]);
    }

    #[tokio::test]
    async fn downloads_stop_and_write_files() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let writer = ArtifactWriter::in_dir(dir.path(), "recorder");
        let (mut s, h) = session(16000, &RecorderOptions::default());
        s.start().await.unwrap_or_else(|e| panic!("{e}"));
        h.queue.borrow_mut().push_back(mono(&[0.5; 16]));

        let pcm_path = s.download_pcm(&writer).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(s.state(), SessionState::Stopped);
        let written = std::fs::read(&pcm_path).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(written.len(), 32);

        let wav_path = s.download_wav(&writer).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(wav_path, dir.path().join("recorder.wav"));
        let written = std::fs::read(&wav_path).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(written.len(), HEADER_LEN + 32);
    }

    #[test]
    fn pcm_blob_is_untyped_bytes() {
        let (mut s, _h) = session(8000, &RecorderOptions::default());
        s.push_block(&mono(&[0.0; 3]));
        let blob = s.pcm_blob();
        assert_eq!(blob.mime_type, PCM_MIME);
        assert_eq!(blob.data, vec![0; 6]);
    }

    #[test]
    fn play_without_sink_is_an_error() {
        let (mut s, _h) = session(8000, &RecorderOptions::default());
        let err = s.play().unwrap_err();
        assert!(matches!(err, RecorderError::Playback(_)));
    }

    #[tokio::test]
    async fn play_decodes_wav_into_sink_and_start_stops_it() {
        let sink = FakeSink::default();
        let played = Rc::clone(&sink.played);
        let stops = Rc::clone(&sink.stops);

        let (s, _h) = session(8000, &RecorderOptions::default());
        let mut s = s.with_playback(sink);
        s.push_block(&mono(&[0.5, -0.5]));

        s.play().unwrap_or_else(|e| panic!("{e}"));
        assert!(s.is_playing());
        {
            let played = played.borrow();
            assert_eq!(played.len(), 1);
            assert_eq!(played[0].channels, 1);
            assert_eq!(played[0].sample_rate, 8000);
            assert_eq!(played[0].samples.len(), 2);
        }

        let stops_before = stops.get();
        s.start().await.unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(stops.get(), stops_before + 1);
    }

    #[tokio::test]
    async fn destroy_releases_capture() {
        let (mut s, h) = session(16000, &RecorderOptions::default());
        s.start().await.unwrap_or_else(|e| panic!("{e}"));
        assert!(h.connected.get());
        s.destroy();
        assert!(!h.connected.get());
    }
}
