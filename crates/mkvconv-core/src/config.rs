//! Application configuration types.
//!
//! The top-level [`Config`] is deserialized from TOML. Every section defaults
//! sensibly so an empty file is valid, and command-line flags are applied on
//! top of whatever was loaded.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::job::{
    EncodeSettings, VideoRateControl, AUDIO_BITRATE_RANGE, VIDEO_BITRATE_RANGE,
};

/// Locations searched when no config path is given, in order.
pub const DEFAULT_CONFIG_PATHS: &[&str] = &["./mkvconv.toml", "~/.config/mkvconv/config.toml"];

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tools: ToolsConfig,
    pub conversion: ConversionConfig,
    pub output: OutputConfig,
}

impl Config {
    /// Parse a `Config` from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| Error::Config(format!("parse error: {e}")))
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        let config = Self::from_toml(&contents)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load from `custom_path` if given, otherwise from the first default
    /// location that exists, otherwise return defaults.
    ///
    /// An explicitly given path must exist; default locations are optional.
    pub fn load_or_default(custom_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = custom_path {
            return Self::load(path);
        }

        for path_str in DEFAULT_CONFIG_PATHS {
            let expanded = shellexpand::tilde(path_str);
            let path = Path::new(expanded.as_ref());
            if path.exists() {
                return Self::load(path);
            }
        }

        tracing::debug!("No config file found; using defaults");
        Ok(Self::default())
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !VIDEO_BITRATE_RANGE.contains(&self.conversion.video_bitrate) {
            warnings.push(format!(
                "conversion.video_bitrate {} is outside {}..={} Mbps and will be clamped",
                self.conversion.video_bitrate,
                VIDEO_BITRATE_RANGE.start(),
                VIDEO_BITRATE_RANGE.end()
            ));
        }

        if !AUDIO_BITRATE_RANGE.contains(&self.conversion.audio_bitrate) {
            warnings.push(format!(
                "conversion.audio_bitrate {} is outside {}..={} kbps and will be clamped",
                self.conversion.audio_bitrate,
                AUDIO_BITRATE_RANGE.start(),
                AUDIO_BITRATE_RANGE.end()
            ));
        }

        if let Some(ref path) = self.tools.ffmpeg_path {
            if !path.exists() {
                warnings.push(format!(
                    "tools.ffmpeg_path {} does not exist; falling back to discovery",
                    path.display()
                ));
            }
        }

        if let Some(ref dir) = self.output.directory {
            if !dir.is_dir() {
                warnings.push(format!(
                    "output.directory {} is not an existing directory",
                    dir.display()
                ));
            }
        }

        warnings
    }

    /// Encode settings from the conversion section, clamped into range.
    pub fn encode_settings(&self) -> EncodeSettings {
        EncodeSettings {
            video_bitrate: self.conversion.video_bitrate,
            audio_bitrate: self.conversion.audio_bitrate,
            rate_control: self.conversion.video_mode,
        }
        .clamped()
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Overrides for external tool locations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    /// Replaces the platform's install locations searched before `PATH`.
    pub ffmpeg_locations: Option<Vec<PathBuf>>,
}

/// Encode defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Video bitrate in Mbps.
    pub video_bitrate: u32,
    /// Audio bitrate in kbps.
    pub audio_bitrate: u32,
    pub video_mode: VideoRateControl,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        let settings = EncodeSettings::default();
        Self {
            video_bitrate: settings.video_bitrate,
            audio_bitrate: settings.audio_bitrate,
            video_mode: settings.rate_control,
        }
    }
}

/// Where converted files go when `--output` is not given.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: Option<PathBuf>,
}
