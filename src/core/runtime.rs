//! Download runtime command router.
//!
//! A thin async command queue that serializes download control calls so Tauri
//! command threads never hold the manager write lock across an await.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::debug;

use crate::core::manager::DownloadManager;
use crate::core::models::{AppError, AppResult};

/// Commands understood by the runtime router.
#[derive(Debug)]
pub enum RuntimeCommand {
    Start {
        task_id: String,
        respond_to: oneshot::Sender<AppResult<()>>,
    },
    Cancel {
        task_id: String,
        respond_to: oneshot::Sender<AppResult<()>>,
    },
    CancelAll {
        respond_to: oneshot::Sender<AppResult<usize>>,
    },
}

/// Handle exposed to Tauri commands and the rest of the backend.
#[derive(Clone)]
pub struct DownloadRuntimeHandle {
    sender: mpsc::Sender<RuntimeCommand>,
}

impl DownloadRuntimeHandle {
    pub fn new(sender: mpsc::Sender<RuntimeCommand>) -> Self {
        Self { sender }
    }

    async fn send_command<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<AppResult<T>>) -> RuntimeCommand,
    ) -> AppResult<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .await
            .map_err(|e| AppError::System(format!("Download runtime unavailable: {}", e)))?;
        rx.await
            .map_err(|_| AppError::System("Download runtime dropped response".to_string()))?
    }

    pub async fn start_task(&self, task_id: String) -> AppResult<()> {
        self.send_command(|tx| RuntimeCommand::Start {
            task_id,
            respond_to: tx,
        })
        .await
    }

    pub async fn cancel_task(&self, task_id: String) -> AppResult<()> {
        self.send_command(|tx| RuntimeCommand::Cancel {
            task_id,
            respond_to: tx,
        })
        .await
    }

    pub async fn cancel_all(&self) -> AppResult<usize> {
        self.send_command(|tx| RuntimeCommand::CancelAll { respond_to: tx })
            .await
    }
}

/// Spawn the router loop, creating a dedicated runtime thread when called
/// outside a tokio context (e.g. before the Tauri builder runs).
pub fn spawn_download_runtime(manager: Arc<RwLock<DownloadManager>>) -> DownloadRuntimeHandle {
    let (tx, rx) = mpsc::channel(256);

    let router_future = router_loop(manager, rx);

    match Handle::try_current() {
        Ok(handle) => {
            tracing::info!("[RUNTIME] Spawning router in existing tokio runtime");
            handle.spawn(router_future);
        }
        Err(_) => {
            tracing::info!("[RUNTIME] No tokio runtime found, creating dedicated thread");
            std::thread::Builder::new()
                .name("download-runtime".into())
                .spawn(move || {
                    let runtime = tokio::runtime::Builder::new_multi_thread()
                        .enable_all()
                        .thread_name("download-runtime-worker")
                        .build()
                        .expect("download runtime");
                    runtime.block_on(router_future);
                })
                .expect("spawn download runtime thread");
        }
    }

    DownloadRuntimeHandle::new(tx)
}

async fn router_loop(
    manager: Arc<RwLock<DownloadManager>>,
    mut rx: mpsc::Receiver<RuntimeCommand>,
) {
    while let Some(command) = rx.recv().await {
        debug!("[RUNTIME] Processing command: {:?}", command);
        handle_command(&manager, command).await;
    }
    debug!("Download runtime channel closed, exiting router loop");
}

async fn handle_command(manager: &Arc<RwLock<DownloadManager>>, command: RuntimeCommand) {
    match command {
        RuntimeCommand::Start {
            task_id,
            respond_to,
        } => {
            let result = {
                let guard = manager.read().await;
                guard.start_task_impl(&task_id).await
            };
            let _ = respond_to.send(result);
        }
        RuntimeCommand::Cancel {
            task_id,
            respond_to,
        } => {
            let result = {
                let guard = manager.read().await;
                guard.cancel_task_impl(&task_id).await
            };
            let _ = respond_to.send(result);
        }
        RuntimeCommand::CancelAll { respond_to } => {
            let result = {
                let guard = manager.read().await;
                guard.cancel_all_impl().await
            };
            let _ = respond_to.send(result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{AdvancedConfig, DownloadConfig};

    #[tokio::test]
    async fn test_start_unknown_task_reports_error() {
        let manager = DownloadManager::new(DownloadConfig::default(), AdvancedConfig::default())
            .expect("manager");
        let manager = Arc::new(RwLock::new(manager));
        let handle = spawn_download_runtime(manager);

        let result = handle.start_task("no-such-task".to_string()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_cancel_all_with_no_tasks() {
        let manager = DownloadManager::new(DownloadConfig::default(), AdvancedConfig::default())
            .expect("manager");
        let manager = Arc::new(RwLock::new(manager));
        let handle = spawn_download_runtime(manager);

        let cancelled = handle.cancel_all().await.expect("cancel all");
        assert_eq!(cancelled, 0);
    }
}
