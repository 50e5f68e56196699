use std::path::PathBuf;
use std::time::Duration;

use crate::audio::capture::CpalStreamProvider;
use crate::audio::playback::CpalPlayback;
use crate::config::Config;
use crate::error::Result;
use crate::output::ArtifactWriter;
use crate::session::RecordingSession;

/// How often queued capture blocks are drained into the session.
const PUMP_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Pcm,
    Wav,
    Mp3,
}

#[derive(Debug, Clone, Copy)]
pub struct RecordOptions {
    /// Stop after this long; record until Ctrl+C when `None`.
    pub limit: Option<Duration>,
    pub format: OutputFormat,
    pub play: bool,
}

/// Record from the configured device, then write the result to disk.
///
/// Returns the path of the written file.
pub async fn run_recording(config: Config, options: RecordOptions) -> Result<PathBuf> {
    let provider =
        CpalStreamProvider::new(config.audio.device.as_deref(), config.audio.block_size)?;
    let mut session =
        RecordingSession::new(provider, &config.recorder).with_playback(CpalPlayback::new());

    session.start().await?;

    let deadline = options.limit.map(|limit| tokio::time::Instant::now() + limit);
    let mut ticker = tokio::time::interval(PUMP_INTERVAL);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let appended = session.pump();
                if appended > 0 {
                    tracing::debug!(
                        "captured {:.1}s ({} samples)",
                        session.duration().as_secs_f64(),
                        session.sample_count()
                    );
                }
                if deadline.is_some_and(|d| tokio::time::Instant::now() >= d) {
                    tracing::info!("recording limit reached");
                    break;
                }
            }
            _ = &mut ctrl_c => {
                tracing::info!("received Ctrl+C, finishing recording");
                break;
            }
        }
    }

    let writer = ArtifactWriter::new(&config.output);
    let path = match options.format {
        OutputFormat::Pcm => session.download_pcm(&writer)?,
        OutputFormat::Wav => session.download_wav(&writer)?,
        OutputFormat::Mp3 => {
            let blob = session.mp3_blob()?;
            writer.write("mp3", &blob.data)?
        }
    };

    if options.play {
        session.play()?;
        tracing::info!("playing back {:.1}s", session.duration().as_secs_f64());
        let stop_playback = tokio::signal::ctrl_c();
        tokio::pin!(stop_playback);
        while session.is_playing() {
            tokio::select! {
                () = tokio::time::sleep(PUMP_INTERVAL) => {}
                _ = &mut stop_playback => break,
            }
        }
    }

    session.destroy();
    Ok(path)
}
