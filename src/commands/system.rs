//! System command handlers
//!
//! This module provides commands for checking the wrapped download tools,
//! validating playlist URLs before a job is created, and opening the
//! download folder in the platform file manager.

use std::path::Path;

use tauri::{command, State};
use tracing::{error, info, warn};

use spotcloud::core::models::{AppError, AppResult, Service};
use spotcloud::core::spotdl::SpotdlLauncher;
use spotcloud::utils::validation;
use spotcloud::AppState;

/// Check whether SpotDL can be launched on this machine
#[command]
pub async fn check_spotdl(state: State<'_, AppState>) -> Result<bool, String> {
    info!("🎵 Checking spotdl availability");

    let advanced = {
        let config = state.config.read().await;
        config.advanced.clone()
    };

    match SpotdlLauncher::discover(
        advanced.spotdl_binary.as_deref(),
        advanced.python_binary.as_deref(),
    ) {
        Ok(launcher) => {
            let available = launcher.check_available().await;
            if available {
                info!("✅ spotdl is available via {}", launcher.describe());
            } else {
                warn!("⚠️ spotdl entry point found but not runnable");
            }
            Ok(available)
        }
        Err(e) => {
            warn!("⚠️ {}", e);
            Ok(false)
        }
    }
}

/// Check whether yt-dlp is available for SoundCloud set resolution
#[command]
pub async fn check_yt_dlp(state: State<'_, AppState>) -> Result<bool, String> {
    info!("📺 Checking yt-dlp availability");

    let advanced = {
        let config = state.config.read().await;
        config.advanced.clone()
    };

    if let Some(ref binary) = advanced.ytdlp_binary {
        return check_tool_availability(binary, &["--version"])
            .await
            .map_err(|e| e.to_string());
    }

    for candidate in ["yt-dlp", "yt-dlp.exe"] {
        if which::which(candidate).is_ok() {
            return check_tool_availability(candidate, &["--version"])
                .await
                .map_err(|e| e.to_string());
        }
    }

    // Executable missing; the python module tier may still work
    let python = advanced
        .python_binary
        .clone()
        .unwrap_or_else(spotcloud::core::spotdl::default_python);
    check_tool_availability(&python, &["-m", "yt_dlp", "--version"])
        .await
        .map_err(|e| e.to_string())
}

/// Validate a playlist URL for the chosen service.
/// The error string is user-facing guidance.
#[command]
pub async fn validate_playlist_url(service: Service, url: String) -> Result<(), String> {
    validation::validate_playlist_url(service, &url).map_err(|e| e.to_string())
}

/// Default download directory suggested in the output-folder field
#[command]
pub async fn default_output_directory() -> Result<String, String> {
    Ok(spotcloud::core::config::default_output_directory())
}

/// Open the configured download folder in the platform file manager
#[command]
pub async fn open_download_folder(state: State<'_, AppState>) -> Result<(), String> {
    let folder_path = {
        let config = state.config.read().await;
        config.download.output_directory.clone()
    };

    info!("📁 Opening download folder: {}", folder_path);

    match open_folder_impl(&folder_path).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("❌ Failed to open download folder: {}", e);
            Err(e.to_string())
        }
    }
}

// Implementation functions

async fn open_folder_impl(folder_path: &str) -> AppResult<()> {
    if !Path::new(folder_path).exists() {
        tokio::fs::create_dir_all(folder_path)
            .await
            .map_err(AppError::Io)?;
    }

    #[cfg(target_os = "windows")]
    let opener = "explorer";

    #[cfg(target_os = "macos")]
    let opener = "open";

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    let opener = "xdg-open";

    let output = tokio::process::Command::new(opener)
        .arg(folder_path)
        .output()
        .await
        .map_err(|e| AppError::System(format!("Failed to open folder: {}", e)))?;

    if !output.status.success() {
        let error = String::from_utf8_lossy(&output.stderr);
        return Err(AppError::System(format!(
            "{} command failed: {}",
            opener, error
        )));
    }

    Ok(())
}

async fn check_tool_availability(tool_name: &str, args: &[&str]) -> AppResult<bool> {
    let output = tokio::process::Command::new(tool_name)
        .args(args)
        .output()
        .await;

    match output {
        Ok(output) => Ok(output.status.success()),
        Err(e) => match e.kind() {
            std::io::ErrorKind::NotFound => Ok(false),
            _ => Err(AppError::System(format!(
                "Failed to check {}: {}",
                tool_name, e
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_check_tool_availability() {
        #[cfg(target_os = "windows")]
        let result = check_tool_availability("cmd", &["/c", "exit 0"]).await;

        #[cfg(not(target_os = "windows"))]
        let result = check_tool_availability("true", &[]).await;

        assert!(result.is_ok());
        assert!(result.unwrap());
    }

    #[tokio::test]
    async fn test_check_nonexistent_tool() {
        let result = check_tool_availability("nonexistent_tool_12345", &["--version"]).await;
        assert!(result.is_ok());
        assert!(!result.unwrap());
    }
}
