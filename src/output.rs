use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::config::{Config, OutputConfig};
use crate::error::{RecorderError, Result};

/// Writes finished recordings as `<name>.<ext>` files into one directory.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    output_dir: PathBuf,
    name: String,
    timestamps: bool,
}

impl ArtifactWriter {
    #[must_use]
    pub fn new(config: &OutputConfig) -> Self {
        Self {
            output_dir: Config::expand_path(&config.directory),
            name: config.name.clone(),
            timestamps: config.timestamps,
        }
    }

    #[must_use]
    pub fn in_dir(output_dir: &Path, name: &str) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            name: name.to_string(),
            timestamps: false,
        }
    }

    /// Destination for an artifact with extension `ext`.
    ///
    /// With timestamps enabled the local time is appended to the base name,
    /// e.g. `recorder-20240131-142500.wav`.
    #[must_use]
    pub fn path_for(&self, ext: &str) -> PathBuf {
        let stem = if self.timestamps {
            format!("{}-{}", self.name, Local::now().format("%Y%m%d-%H%M%S"))
        } else {
            self.name.clone()
        };
        self.output_dir.join(format!("{stem}.{ext}"))
    }

    /// Write `bytes` to the artifact path for `ext`, creating the directory.
    pub fn write(&self, ext: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.path_for(ext);

        fs::create_dir_all(&self.output_dir).map_err(|e| output_error(&self.output_dir, &e))?;
        fs::write(&path, bytes).map_err(|e| output_error(&path, &e))?;

        tracing::info!("wrote {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }
}

/// The one place download failures are turned into [`RecorderError::Output`].
pub fn output_error(path: &Path, err: &dyn std::fmt::Display) -> RecorderError {
    RecorderError::Output(format!("failed to write {}: {err}", path.display()))
}
