//! Byte-level encodings of a recording: raw PCM, WAV, MP3.
//!
//! ```text
//! f32 samples → pcm::encode → wav::encode → mp3::encode
//! ```

pub mod mp3;
pub mod pcm;
pub mod wav;

pub use mp3::{EncoderParams, Mp3Encoder};
pub use wav::{DecodedAudio, WavInfo};
