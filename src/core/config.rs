//! Application configuration management

use anyhow::{Context, Result};
use directories::{ProjectDirs, UserDirs};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub download: DownloadConfig,
    pub ui: Option<UiConfig>,
    pub advanced: AdvancedConfig,
}

/// Download defaults applied when a request leaves a field empty
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    pub output_directory: String,

    /// Audio container handed to SpotDL. m4a needs no FFmpeg post-processing.
    pub audio_format: String,

    pub bitrate: String,

    /// Playlist jobs allowed to run at the same time
    pub concurrent_jobs: usize,
}

/// UI-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    pub theme: String, // "light", "dark", "system"
    pub window_width: u32,
    pub window_height: u32,
    pub show_notifications: bool,
}

/// Advanced configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedConfig {
    pub log_level: String, // "error", "warn", "info", "debug", "trace"

    /// Explicit path to the spotdl executable, bypassing PATH discovery
    pub spotdl_binary: Option<String>,

    /// Explicit path to the yt-dlp executable, bypassing PATH discovery
    pub ytdlp_binary: Option<String>,

    /// Python interpreter used for the `python -m <tool>` fallback tiers
    pub python_binary: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            download: DownloadConfig::default(),
            ui: Some(UiConfig::default()),
            advanced: AdvancedConfig::default(),
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_directory: default_output_directory(),
            audio_format: "m4a".to_string(),
            bitrate: "320k".to_string(),
            concurrent_jobs: 1,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            theme: "dark".to_string(),
            window_width: 600,
            window_height: 900,
            show_notifications: true,
        }
    }
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            spotdl_binary: None,
            ytdlp_binary: None,
            python_binary: None,
        }
    }
}

/// Default download target: the platform Downloads folder plus a dedicated
/// subdirectory, falling back to a relative path on headless systems.
pub fn default_output_directory() -> String {
    let base = UserDirs::new()
        .and_then(|dirs| dirs.download_dir().map(|d| d.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("downloads"));

    base.join("spotcloud").to_string_lossy().to_string()
}

impl AppConfig {
    /// Load configuration from file, creating default if not exists
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

            let config: AppConfig =
                serde_json::from_str(&content).with_context(|| "Failed to parse config file")?;

            tracing::info!("Loaded configuration from: {:?}", config_path);
            Ok(config)
        } else {
            let config = Self::default();
            config.save()?;
            tracing::info!("Created default configuration at: {:?}", config_path);
            Ok(config)
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content =
            serde_json::to_string_pretty(self).with_context(|| "Failed to serialize config")?;

        std::fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        tracing::info!("Saved configuration to: {:?}", config_path);
        Ok(())
    }

    /// Get the path to the configuration file
    pub fn get_config_path() -> Result<PathBuf> {
        let project_dirs = ProjectDirs::from("com", "spotcloud", "spotcloud")
            .with_context(|| "Failed to get project directories")?;

        let config_dir = project_dirs.config_dir();
        Ok(config_dir.join("config.json"))
    }

    /// Reset configuration to defaults
    pub fn reset() -> Result<Self> {
        let config = Self::default();
        config.save()?;
        tracing::info!("Reset configuration to defaults");
        Ok(config)
    }

    /// Export configuration as JSON string
    pub fn export(&self) -> Result<String> {
        serde_json::to_string_pretty(self).with_context(|| "Failed to export configuration")
    }

    /// Import configuration from JSON string
    pub fn import(json: &str) -> Result<Self> {
        let config: AppConfig =
            serde_json::from_str(json).with_context(|| "Failed to parse imported configuration")?;

        config
            .validate()
            .with_context(|| "Imported configuration is invalid")?;

        config.save()?;
        tracing::info!("Imported and validated configuration from JSON");
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.download.output_directory.is_empty() {
            anyhow::bail!("Output directory must not be empty");
        }

        if self.download.concurrent_jobs == 0 {
            anyhow::bail!("Concurrent jobs must be greater than 0");
        }

        if self.download.concurrent_jobs > 4 {
            anyhow::bail!("Concurrent jobs should not exceed 4");
        }

        let valid_formats = ["m4a", "mp3", "flac", "opus", "ogg", "wav"];
        if !valid_formats.contains(&self.download.audio_format.as_str()) {
            anyhow::bail!("Invalid audio format: {}", self.download.audio_format);
        }

        if !is_valid_bitrate(&self.download.bitrate) {
            anyhow::bail!(
                "Invalid bitrate: {} (expected e.g. '128k' or '320k')",
                self.download.bitrate
            );
        }

        if let Some(ref ui) = self.ui {
            if !["light", "dark", "system"].contains(&ui.theme.as_str()) {
                anyhow::bail!("Invalid theme: must be 'light', 'dark', or 'system'");
            }

            if ui.window_width < 400 || ui.window_width > 4000 {
                anyhow::bail!("Window width should be between 400 and 4000 pixels");
            }

            if ui.window_height < 400 || ui.window_height > 3000 {
                anyhow::bail!("Window height should be between 400 and 3000 pixels");
            }
        }

        if !["error", "warn", "info", "debug", "trace"].contains(&self.advanced.log_level.as_str())
        {
            anyhow::bail!(
                "Invalid log level: must be 'error', 'warn', 'info', 'debug', or 'trace'"
            );
        }

        Ok(())
    }
}

/// Bitrates SpotDL accepts: two or three digits with a `k` suffix.
fn is_valid_bitrate(bitrate: &str) -> bool {
    use std::sync::OnceLock;

    static BITRATE_RE: OnceLock<regex::Regex> = OnceLock::new();
    let re = BITRATE_RE.get_or_init(|| regex::Regex::new(r"^[0-9]{2,3}k$").unwrap());
    re.is_match(bitrate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validation() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let json = config.export().unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(config.export().unwrap(), parsed.export().unwrap());
    }

    #[test]
    fn test_invalid_config_validation() {
        let mut config = AppConfig::default();

        config.download.concurrent_jobs = 0;
        assert!(config.validate().is_err());

        config.download.concurrent_jobs = 9;
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.download.audio_format = "wma".to_string();
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.download.bitrate = "320".to_string();
        assert!(config.validate().is_err());

        config = AppConfig::default();
        if let Some(ref mut ui) = config.ui {
            ui.theme = "invalid".to_string();
        }
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.advanced.log_level = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bitrate_validation() {
        assert!(is_valid_bitrate("320k"));
        assert!(is_valid_bitrate("96k"));
        assert!(!is_valid_bitrate("320"));
        assert!(!is_valid_bitrate("k"));
        assert!(!is_valid_bitrate("1024k"));
        assert!(!is_valid_bitrate("320kbps"));
    }

    #[test]
    fn test_default_output_directory_is_not_empty() {
        assert!(!default_output_directory().is_empty());
    }
}
