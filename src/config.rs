//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\podsync\config.toml
//! - macOS: ~/Library/Application Support/podsync/config.toml
//! - Linux: ~/.config/podsync/config.toml
//!
//! Settings are resolved once at startup and injected into the components
//! that need them (the device mount point into the lifecycle manager, the
//! preset and output template into the sync context).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::convert::EncoderPreset;
use crate::naming::DEFAULT_OUTPUT_TEMPLATE;

/// Mount point used when nothing is configured.
pub const DEFAULT_MOUNTPOINT: &str = "/media/IPOD";

/// Preset used when nothing is configured.
pub const DEFAULT_PRESET: &str = "iPod AAC 256k";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Device settings
    pub device: DeviceConfig,

    /// Transcoding settings
    pub conversion: ConversionConfig,

    /// Artwork settings
    pub artwork: ArtworkConfig,
}

/// Device settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Where the device is mounted
    pub mountpoint: PathBuf,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            mountpoint: PathBuf::from(DEFAULT_MOUNTPOINT),
        }
    }
}

/// Transcoding settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Title of the preset used for tracks the device can't play
    pub preset: String,

    /// Output file name template, e.g. "{Artist} - {Title}"
    pub output_template: String,

    /// Explicit ffmpeg binary (searched in common locations when unset)
    pub ffmpeg_path: Option<PathBuf>,

    /// Available encoding presets
    pub presets: Vec<EncoderPreset>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            preset: DEFAULT_PRESET.to_string(),
            output_template: DEFAULT_OUTPUT_TEMPLATE.to_string(),
            ffmpeg_path: None,
            presets: default_presets(),
        }
    }
}

/// Built-in presets, both playable on every click-wheel iPod.
pub fn default_presets() -> Vec<EncoderPreset> {
    vec![
        EncoderPreset::new("iPod AAC 256k", "m4a", &["-c:a", "aac", "-b:a", "256k"]),
        EncoderPreset::new(
            "iPod MP3 V0",
            "mp3",
            &["-c:a", "libmp3lame", "-q:a", "0", "-id3v2_version", "3"],
        ),
    ]
}

/// Artwork settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtworkConfig {
    /// Whether to look up and transfer thumbnails
    pub enabled: bool,

    /// Where extracted embedded covers are cached (user cache dir when unset)
    pub cache_dir: Option<PathBuf>,
}

impl Default for ArtworkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_dir: None,
        }
    }
}

impl ArtworkConfig {
    /// Resolved cache directory.
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from(".cache"))
                .join("podsync")
                .join("covers")
        })
    }
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("podsync"))
}

/// Get the full path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration from disk
///
/// Returns default config if file doesn't exist or can't be parsed.
/// Logs warnings but doesn't fail - we always return a usable config.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        tracing::warn!("Could not determine config directory, using defaults");
        return Config::default();
    };

    load_from(&path)
}

/// Load configuration from a specific file, falling back to defaults.
pub fn load_from(path: &Path) -> Config {
    if !path.exists() {
        tracing::info!("No config file found at {:?}, using defaults", path);
        return Config::default();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::info!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                tracing::error!("Failed to parse config file {:?}: {}", path, e);
                tracing::warn!("Using default configuration");
                Config::default()
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file {:?}: {}", path, e);
            Config::default()
        }
    }
}

/// Save configuration to disk
///
/// Creates the config directory if it doesn't exist.
pub fn save(config: &Config) -> Result<(), ConfigError> {
    let dir = config_dir().ok_or(ConfigError::NoConfigDir)?;
    save_to(config, &dir.join("config.toml"))
}

/// Save configuration to a specific file.
pub fn save_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDir(dir.to_path_buf(), e))?;
    }

    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    // Write atomically (write to temp, then rename)
    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, path)
        .map_err(|e| ConfigError::Rename(temp_path, path.to_path_buf(), e))?;

    tracing::info!("Saved config to {:?}", path);
    Ok(())
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),
}

// ============================================================================
// Tests
// ============================================================================
