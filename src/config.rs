//! Configuration management for the host, device and logging layers
//!
//! Configuration is loaded from a JSON file at startup. Every field has a
//! default, so partial files are accepted and a missing or malformed file
//! falls back to the built-in values.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Environment variable overriding the desktop config path
pub const CONFIG_PATH_ENV: &str = "AUDIO_LIFECYCLE_CONFIG";

/// Default desktop config path, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "assets/lifecycle_config.json";

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub host: HostConfig,
    pub device: DeviceConfig,
    pub logging: LoggingConfig,
}

/// Host event-loop parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Name given to the host thread
    pub thread_name: String,
    /// Whether the host starts in the background (paused) state
    pub start_paused: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            thread_name: "host-event-loop".to_string(),
            // Processes come up before their first activity is resumed
            start_paused: true,
        }
    }
}

/// Which device implementation `open_device` builds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceBackendKind {
    /// cpal on desktop, Oboe on Android
    #[default]
    Platform,
    /// In-memory device, no audio I/O
    Stub,
}

/// Audio output device parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub backend: DeviceBackendKind,
    /// Requested sample rate in Hz; the backend may fall back to the device default
    pub sample_rate: u32,
    /// Requested output channel count
    pub channels: u16,
    /// Frequency of the rendered tone; 0 renders silence
    pub tone_hz: f32,
    /// Peak amplitude of the rendered tone (0.0 to 1.0)
    pub amplitude: f32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            backend: DeviceBackendKind::Platform,
            sample_rate: 48_000,
            channels: 2,
            tone_hz: 0.0,
            amplitude: 0.2,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Maximum level: trace, debug, info, warn or error
    pub level: String,
    /// Tag used for logcat output on Android
    pub android_tag: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            android_tag: "AudioLifecycle".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or the defaults if the file is missing or
    /// its JSON is invalid.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration on Android
    ///
    /// APK assets are only reachable through the AssetManager, so Android
    /// builds run on defaults.
    #[cfg(target_os = "android")]
    pub fn load_android() -> Self {
        log::info!("[Config] Using default configuration on Android");
        Self::default()
    }

    /// Load configuration for non-Android platforms
    ///
    /// Reads the path from `AUDIO_LIFECYCLE_CONFIG`, falling back to
    /// `assets/lifecycle_config.json`.
    #[cfg(not(target_os = "android"))]
    pub fn load() -> Self {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_file(path)
    }
}
