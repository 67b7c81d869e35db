//! Configuration command handlers

use tauri::{command, State};
use tracing::{error, info};

use spotcloud::core::config::AppConfig;
use spotcloud::AppState;

#[command]
pub async fn get_config(state: State<'_, AppState>) -> Result<AppConfig, String> {
    let config = state.config.read().await;
    Ok(config.clone())
}

/// Validate, persist, and apply a new configuration
#[command]
pub async fn update_config(
    config: AppConfig,
    state: State<'_, AppState>,
) -> Result<AppConfig, String> {
    if let Err(e) = config.validate() {
        error!("❌ Rejected invalid configuration: {}", e);
        return Err(e.to_string());
    }

    config.save().map_err(|e| e.to_string())?;

    {
        let mut manager = state.download_manager.write().await;
        manager.update_config(config.download.clone(), config.advanced.clone());
    }

    let mut current = state.config.write().await;
    *current = config.clone();

    info!("📝 Configuration updated");
    Ok(config)
}

#[command]
pub async fn reset_config(state: State<'_, AppState>) -> Result<AppConfig, String> {
    let config = AppConfig::reset().map_err(|e| e.to_string())?;

    {
        let mut manager = state.download_manager.write().await;
        manager.update_config(config.download.clone(), config.advanced.clone());
    }

    let mut current = state.config.write().await;
    *current = config.clone();

    info!("♻️ Configuration reset to defaults");
    Ok(config)
}

#[command]
pub async fn export_config(state: State<'_, AppState>) -> Result<String, String> {
    let config = state.config.read().await;
    config.export().map_err(|e| e.to_string())
}

#[command]
pub async fn import_config(json: String, state: State<'_, AppState>) -> Result<AppConfig, String> {
    let config = AppConfig::import(&json).map_err(|e| e.to_string())?;

    {
        let mut manager = state.download_manager.write().await;
        manager.update_config(config.download.clone(), config.advanced.clone());
    }

    let mut current = state.config.write().await;
    *current = config.clone();

    info!("📥 Configuration imported");
    Ok(config)
}
