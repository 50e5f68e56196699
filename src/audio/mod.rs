//! Capture-side audio: device streams, block buffering, decimation, playback.
//!
//! ```text
//! cpal callback → BlockCutter → queue → FrameCollector → flatten → compress
//! ```

pub mod buffer;
pub mod capture;
pub mod playback;
pub mod resample;

pub use buffer::{FrameCollector, flatten};
pub use capture::{CaptureSource, ChannelBlock, CpalCapture, CpalStreamProvider, StreamProvider};
pub use playback::{CpalPlayback, PlaybackSink};
