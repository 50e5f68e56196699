use std::io;

#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    #[error("device acquisition error: {0}")]
    DeviceAcquisition(String),

    #[error("audio error: {0}")]
    Audio(String),

    #[error("encoder error: {0}")]
    Encoder(String),

    #[error("playback error: {0}")]
    Playback(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("output error: {0}")]
    Output(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, RecorderError>;
