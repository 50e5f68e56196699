pub mod audio;
pub mod codec;
pub mod config;
pub mod error;
pub mod output;
pub mod recording;
pub mod session;

pub use config::{BitDepth, RecorderConfig, RecorderOptions};
pub use error::{RecorderError, Result};
pub use session::{AudioBlob, RecordingSession, SessionState};
