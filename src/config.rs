use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{RecorderError, Result};

/// Output sample rates a recorder may be configured with.
pub const ALLOWED_SAMPLE_RATES: [u32; 6] = [11025, 16000, 22050, 24000, 44100, 48000];

/// Frames per channel in one capture block.
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

const fn default_block_size() -> usize {
    DEFAULT_BLOCK_SIZE
}

fn default_output_directory() -> String {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join("recordings").to_string_lossy().to_string()
}

fn default_output_name() -> String {
    "recorder".to_string()
}

/// Width of one encoded output sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitDepth {
    Eight,
    Sixteen,
}

impl BitDepth {
    #[must_use]
    pub const fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            8 => Some(Self::Eight),
            16 => Some(Self::Sixteen),
            _ => None,
        }
    }

    #[must_use]
    pub const fn bits(self) -> u16 {
        match self {
            Self::Eight => 8,
            Self::Sixteen => 16,
        }
    }

    #[must_use]
    pub const fn bytes(self) -> usize {
        match self {
            Self::Eight => 1,
            Self::Sixteen => 2,
        }
    }
}

/// Recorder options as supplied by the caller or the config file.
///
/// Every field is optional; values outside the recognized sets are not
/// errors, they are replaced by defaults in [`RecorderConfig::resolve`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RecorderOptions {
    pub sample_bits: Option<u32>,
    pub sample_rate: Option<u32>,
    pub num_channels: Option<u32>,
}

/// Validated, immutable recorder configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecorderConfig {
    sample_bits: BitDepth,
    input_sample_rate: u32,
    output_sample_rate: u32,
    channels: u16,
}

impl RecorderConfig {
    /// Resolve caller options against the device's native input rate.
    #[must_use]
    pub fn resolve(options: &RecorderOptions, input_sample_rate: u32) -> Self {
        let sample_bits = options
            .sample_bits
            .and_then(BitDepth::from_bits)
            .unwrap_or_else(|| {
                if let Some(bits) = options.sample_bits {
                    tracing::debug!("unsupported sample_bits {bits}, using 16");
                }
                BitDepth::Sixteen
            });

        let output_sample_rate = match options.sample_rate {
            Some(rate) if ALLOWED_SAMPLE_RATES.contains(&rate) => rate,
            Some(rate) => {
                tracing::debug!(
                    "unsupported sample_rate {rate}, using input rate {input_sample_rate}"
                );
                input_sample_rate
            }
            None => input_sample_rate,
        };

        let channels = match options.num_channels {
            Some(n @ (1 | 2)) => n as u16,
            Some(n) => {
                tracing::debug!("unsupported num_channels {n}, using 1");
                1
            }
            None => 1,
        };

        Self {
            sample_bits,
            input_sample_rate,
            output_sample_rate,
            channels,
        }
    }

    #[must_use]
    pub const fn sample_bits(&self) -> BitDepth {
        self.sample_bits
    }

    #[must_use]
    pub const fn input_sample_rate(&self) -> u32 {
        self.input_sample_rate
    }

    #[must_use]
    pub const fn output_sample_rate(&self) -> u32 {
        self.output_sample_rate
    }

    #[must_use]
    pub const fn channels(&self) -> u16 {
        self.channels
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub audio: AudioConfig,

    #[serde(default)]
    pub recorder: RecorderOptions,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    pub device: Option<String>,

    #[serde(default = "default_block_size")]
    pub block_size: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            block_size: default_block_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_directory")]
    pub directory: String,

    #[serde(default = "default_output_name")]
    pub name: String,

    #[serde(default)]
    pub timestamps: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            name: default_output_name(),
            timestamps: false,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(RecorderError::Config(format!(
                "config file not found: {}; create it or use --config to specify a path",
                path.display()
            )));
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            RecorderError::Config(format!(
                "failed to read config file {}: {e}",
                path.display()
            ))
        })?;

        let config: Self = serde_yaml_ng::from_str(&contents).map_err(|e| {
            RecorderError::Config(format!(
                "failed to parse config file {}: {e}",
                path.display()
            ))
        })?;

        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to the built-in defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("no config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    #[must_use]
    pub fn default_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from(".config"));
        config_dir.join("audiorec/config.yaml")
    }

    /// Expand `~` in a path string to the user's home directory.
    #[must_use]
    pub fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/")
            && let Some(home) = dirs::home_dir()
        {
            return home.join(rest);
        }
        PathBuf::from(path)
    }
}
