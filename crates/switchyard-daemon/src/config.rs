//! Daemon configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Daemon settings
    #[serde(default)]
    pub daemon: DaemonConfig,
    /// Shared output sinks
    #[serde(default)]
    pub sinks: SinksConfig,
    /// Preview settings
    #[serde(default)]
    pub preview: PreviewConfig,
}

/// Daemon-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Socket path (optional, uses the runtime dir if not set)
    #[serde(default)]
    pub socket: Option<PathBuf>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self { log_level: default_log_level(), socket: None }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Shared sink settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinksConfig {
    /// Configure the shared video sink at start-up
    #[serde(default = "default_true")]
    pub video: bool,
    /// Configure the shared audio sink at start-up
    #[serde(default = "default_true")]
    pub audio: bool,
    #[serde(default = "default_video_name")]
    pub video_name: String,
    #[serde(default = "default_audio_name")]
    pub audio_name: String,
}

impl Default for SinksConfig {
    fn default() -> Self {
        Self {
            video: true,
            audio: true,
            video_name: default_video_name(),
            audio_name: default_audio_name(),
        }
    }
}

fn default_video_name() -> String {
    "video-out".to_string()
}

fn default_audio_name() -> String {
    "audio-out".to_string()
}

/// Preview settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// Start playing previews once they preroll
    #[serde(default = "default_true")]
    pub autoplay: bool,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self { autoplay: true }
    }
}

fn default_true() -> bool {
    true
}

/// Load configuration from file or defaults.
pub fn load_config() -> Result<Config> {
    load_from(&config_path()?)
}

/// Load configuration from `path`, using defaults if it doesn't exist.
pub fn load_from(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path:?}"))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {path:?}"))?;
        Ok(config)
    } else {
        info!(config_path = ?path, "Config file not found, using defaults");
        Ok(Config::default())
    }
}

/// Get the configuration file path.
fn config_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("com", "switchyard", "Switchyard")
        .context("Could not determine config directory")?;
    Ok(dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_from(&dir.path().join("config.toml")).unwrap();

        assert_eq!(config.daemon.log_level, "info");
        assert!(config.daemon.socket.is_none());
        assert!(config.sinks.video && config.sinks.audio);
        assert_eq!(config.sinks.video_name, "video-out");
        assert_eq!(config.sinks.audio_name, "audio-out");
        assert!(config.preview.autoplay);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[daemon]
log_level = "debug"
socket = "/tmp/switchyard.sock"

[sinks]
audio = false
"#,
        )
        .unwrap();

        let config = load_from(&path).unwrap();

        assert_eq!(config.daemon.log_level, "debug");
        assert_eq!(config.daemon.socket.as_deref(), Some(Path::new("/tmp/switchyard.sock")));
        assert!(config.sinks.video);
        assert!(!config.sinks.audio);
        assert_eq!(config.sinks.audio_name, "audio-out");
        assert!(config.preview.autoplay);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[preview]\nautoplay = \"sometimes\"\n").unwrap();

        let error = load_from(&path).unwrap_err();
        assert!(error.to_string().starts_with("Failed to parse config file"));
    }
}
