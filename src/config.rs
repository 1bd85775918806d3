// SPDX-License-Identifier: GPL-3.0-only

use crate::constants::{BitratePreset, capture, pipeline};
use crate::errors::{AppError, AppResult};
use crate::fec::FecConfig;
use crate::gpu::{VendorClass, VendorSelection};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directory name under the user config dir
const CONFIG_DIR: &str = "camera-sender";
const CONFIG_FILE: &str = "config.json";

/// Camera capture format (native MJPEG mode)
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Resolution width
    pub width: u32,
    /// Resolution height
    pub height: u32,
    /// Frames per second
    pub framerate: u32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            width: capture::DEFAULT_WIDTH,
            height: capture::DEFAULT_HEIGHT,
            framerate: capture::DEFAULT_FRAMERATE,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// V4L2 device node of the camera
    pub device: String,
    /// Capture format requested from the camera
    pub capture: CaptureSettings,
    /// Shard layout (k data, r parity)
    pub fec: FecConfig,
    /// Video encoder bitrate preset (Low, Medium, High)
    pub bitrate_preset: BitratePreset,
    /// How to pick one vendor when several GPUs are present
    pub vendor_selection: VendorSelection,
    /// Skip detection and use this vendor
    pub vendor_override: Option<VendorClass>,
    /// Overlay measured frame rate on the display sink
    pub fps_overlay: bool,
    /// Stop the stream when an access unit cannot be encoded
    pub halt_on_fec_failure: bool,
    /// Shard sets buffered between encoder and transport
    pub shard_queue_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: capture::DEFAULT_DEVICE.to_string(),
            capture: CaptureSettings::default(),
            fec: FecConfig::default(),
            bitrate_preset: BitratePreset::default(), // Default to Medium
            vendor_selection: VendorSelection::default(),
            vendor_override: None,
            fps_overlay: false,
            halt_on_fec_failure: false, // Drop the unit, keep streaming
            shard_queue_depth: pipeline::SHARD_QUEUE_DEPTH,
        }
    }
}

impl Config {
    /// Default location: `<config dir>/camera-sender/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load from `path`, or defaults when the file does not exist
    pub fn load(path: &Path) -> AppResult<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(AppError::Storage(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        let config: Self = serde_json::from_str(&text).map_err(|e| {
            AppError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Load from the default location, or defaults if it cannot be determined
    pub fn load_default() -> AppResult<Self> {
        match Self::default_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Write as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        info!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    /// Reject settings that cannot produce a working pipeline
    pub fn validate(&self) -> AppResult<()> {
        self.fec.validate()?;

        if self.capture.width == 0 || self.capture.height == 0 {
            return Err(AppError::Config(format!(
                "Invalid capture size {}x{}",
                self.capture.width, self.capture.height
            )));
        }
        if self.capture.framerate == 0 {
            return Err(AppError::Config("Framerate must be at least 1".to_string()));
        }
        if self.shard_queue_depth == 0 {
            return Err(AppError::Config(
                "Shard queue depth must be at least 1".to_string(),
            ));
        }
        if self.device.is_empty() {
            return Err(AppError::Config("No capture device given".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FecError;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.fec, FecConfig::new(10, 4));
        assert_eq!(config.vendor_selection, VendorSelection::PreferDiscrete);
    }

    #[test]
    fn test_zero_data_shards_rejected() {
        let config = Config {
            fec: FecConfig::new(0, 4),
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(AppError::Fec(FecError::InvalidConfiguration { k: 0, .. }))
        ));
    }

    #[test]
    fn test_too_many_shards_rejected() {
        let config = Config {
            fec: FecConfig::new(200, 57),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_queue_depth_rejected() {
        let config = Config {
            shard_queue_depth: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{ "device": "/dev/video2", "fec": { "data_shards": 8, "parity_shards": 2 } }"#)
                .unwrap();
        assert_eq!(config.device, "/dev/video2");
        assert_eq!(config.fec, FecConfig::new(8, 2));
        assert_eq!(config.capture, CaptureSettings::default());
        assert_eq!(config.shard_queue_depth, pipeline::SHARD_QUEUE_DEPTH);
    }

    #[test]
    fn test_missing_file_is_default() {
        let path = Path::new("/nonexistent/camera-sender/config.json");
        assert_eq!(Config::load(path).unwrap(), Config::default());
    }
}
