//! Download management commands

use tauri::{command, State};
use tracing::{error, info};

use spotcloud::core::models::{DownloadRequest, DownloadStats, DownloadTask};
use spotcloud::AppState;

/// Register a playlist job and start it in the background
#[command]
pub async fn start_playlist_download(
    request: DownloadRequest,
    state: State<'_, AppState>,
) -> Result<DownloadTask, String> {
    info!(
        "⬇️ Starting {} playlist download: {}",
        request.service.label(),
        request.url
    );

    let task = {
        let manager = state.download_manager.read().await;
        manager.add_task(request).await.map_err(|e| e.to_string())?
    };

    // Control calls go through the runtime queue so this command thread never
    // holds the manager lock across an await.
    match state.download_runtime.start_task(task.id.clone()).await {
        Ok(()) => {
            info!("✅ Download started for task: {}", task.id);
            Ok(task)
        }
        Err(e) => {
            error!("❌ Failed to start download for {}: {}", task.id, e);
            Err(format!("Failed to start download: {}", e))
        }
    }
}

#[command]
pub async fn cancel_download(task_id: String, state: State<'_, AppState>) -> Result<(), String> {
    info!("🛑 Cancelling download for task: {}", task_id);

    match state.download_runtime.cancel_task(task_id.clone()).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("❌ Failed to cancel task {}: {}", task_id, e);
            Err(format!("Failed to cancel download: {}", e))
        }
    }
}

#[command]
pub async fn cancel_all_downloads(state: State<'_, AppState>) -> Result<usize, String> {
    info!("🛑 Cancelling all downloads");

    state
        .download_runtime
        .cancel_all()
        .await
        .map_err(|e| format!("Failed to cancel downloads: {}", e))
}

#[command]
pub async fn remove_download(task_id: String, state: State<'_, AppState>) -> Result<(), String> {
    let manager = state.download_manager.read().await;
    manager
        .remove_task(&task_id)
        .await
        .map_err(|e| e.to_string())
}

#[command]
pub async fn get_download_tasks(state: State<'_, AppState>) -> Result<Vec<DownloadTask>, String> {
    let manager = state.download_manager.read().await;
    Ok(manager.get_tasks().await)
}

#[command]
pub async fn get_download_stats(state: State<'_, AppState>) -> Result<DownloadStats, String> {
    let manager = state.download_manager.read().await;
    Ok(manager.get_stats().await)
}

#[command]
pub async fn clear_completed_tasks(state: State<'_, AppState>) -> Result<usize, String> {
    let manager = state.download_manager.read().await;
    Ok(manager.clear_completed().await)
}
