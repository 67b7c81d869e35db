//! SpotCloud - Core Library
//!
//! This library provides the backend for the SpotCloud playlist downloader:
//! download management, SpotDL/yt-dlp process integration, configuration,
//! and the headless self-test suite. The Tauri command handlers live in the
//! binary crate and call into this library.

pub mod core;
pub mod utils;

// Re-export commonly used types
pub use crate::core::{
    config::AppConfig,
    manager::DownloadManager,
    models::{
        AppError, AppResult, DownloadRequest, DownloadStats, DownloadTask, Service, TaskStatus,
    },
    runtime::{spawn_download_runtime, DownloadRuntimeHandle},
};

use std::sync::Arc;

/// Application state shared between Tauri commands
#[derive(Clone)]
pub struct AppState {
    pub download_manager: Arc<tokio::sync::RwLock<DownloadManager>>,
    pub config: Arc<tokio::sync::RwLock<AppConfig>>,
    pub download_runtime: DownloadRuntimeHandle,
}

impl AppState {
    pub fn new() -> anyhow::Result<Self> {
        let config = Self::load_or_initialize_config();

        let download_manager = DownloadManager::new(
            config.download.clone(),
            config.advanced.clone(),
        )
        .map_err(|e| anyhow::anyhow!("Failed to create download manager: {}", e))?;

        let download_manager = Arc::new(tokio::sync::RwLock::new(download_manager));
        let download_runtime = spawn_download_runtime(download_manager.clone());

        Ok(Self {
            download_manager,
            config: Arc::new(tokio::sync::RwLock::new(config)),
            download_runtime,
        })
    }

    fn load_or_initialize_config() -> AppConfig {
        match AppConfig::load() {
            Ok(cfg) => {
                if let Err(err) = cfg.validate() {
                    tracing::warn!(
                        "Invalid configuration detected ({}), falling back to defaults",
                        err
                    );
                    let default_cfg = AppConfig::default();
                    if let Err(save_err) = default_cfg.save() {
                        tracing::warn!("Failed to persist default configuration: {}", save_err);
                    }
                    default_cfg
                } else {
                    cfg
                }
            }
            Err(err) => {
                tracing::warn!(
                    "Failed to load configuration from disk: {}. Using defaults",
                    err
                );
                let default_cfg = AppConfig::default();
                if let Err(save_err) = default_cfg.save() {
                    tracing::warn!("Failed to persist default configuration: {}", save_err);
                }
                default_cfg
            }
        }
    }
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert_eq!(NAME, "spotcloud");
    }
}
