//! Download manager - core business logic for playlist download jobs
//!
//! Orchestrates the per-service pipelines (Spotify playlists go straight to
//! SpotDL, SoundCloud sets are resolved into track queries first), limits
//! concurrent jobs, and emits progress events toward the UI.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex, RwLock, Semaphore};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::config::{AdvancedConfig, DownloadConfig};
use crate::core::models::{
    AppError, AppResult, DownloadRequest, DownloadStats, DownloadTask, Service, TaskStatus,
};
use crate::core::soundcloud::{self, ResolverOptions};
use crate::core::spotdl::{self, DownloadArgs, SpotdlLauncher};
use crate::utils::validation;

/// Events that can be emitted by the download manager
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum DownloadEvent {
    TaskCreated {
        task_id: String,
        task: DownloadTask,
    },
    TaskStarted {
        task_id: String,
    },
    /// One line of child process output for the UI log
    LogLine {
        task_id: String,
        line: String,
    },
    /// A SoundCloud set has been expanded into track queries
    TracksResolved {
        task_id: String,
        total: usize,
    },
    TrackStarted {
        task_id: String,
        index: usize,
        total: usize,
        query: String,
    },
    TrackFailed {
        task_id: String,
        query: String,
    },
    TaskCompleted {
        task_id: String,
        missing_tracks: Vec<String>,
    },
    TaskFailed {
        task_id: String,
        error: String,
    },
    TaskCancelled {
        task_id: String,
    },
    StatsUpdated {
        stats: DownloadStats,
    },
}

/// Channel for communication between download manager and UI
pub type EventSender = mpsc::UnboundedSender<DownloadEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<DownloadEvent>;

/// Main download manager that orchestrates all download operations
pub struct DownloadManager {
    /// Download defaults applied to new tasks
    download_config: DownloadConfig,

    /// Tool overrides for spotdl/yt-dlp discovery
    advanced_config: AdvancedConfig,

    /// Map of all download tasks
    tasks: Arc<RwLock<HashMap<String, DownloadTask>>>,

    /// Join handles of currently running jobs
    active_jobs: Arc<Mutex<HashMap<String, tokio::task::JoinHandle<()>>>>,

    /// Event channel for communicating with the UI
    event_sender: Option<EventSender>,

    /// Semaphore to limit concurrent playlist jobs
    job_semaphore: Arc<Semaphore>,

    /// Flag to indicate if manager is running
    is_running: bool,
}

impl DownloadManager {
    /// Create a new download manager with the given configuration
    pub fn new(
        download_config: DownloadConfig,
        advanced_config: AdvancedConfig,
    ) -> AppResult<Self> {
        if download_config.concurrent_jobs == 0 {
            return Err(AppError::Config(
                "concurrent_jobs must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            job_semaphore: Arc::new(Semaphore::new(download_config.concurrent_jobs)),
            download_config,
            advanced_config,
            tasks: Arc::new(RwLock::new(HashMap::new())),
            active_jobs: Arc::new(Mutex::new(HashMap::new())),
            event_sender: None,
            is_running: false,
        })
    }

    /// Start the manager
    pub async fn start(&mut self) -> AppResult<()> {
        if self.is_running {
            return Ok(());
        }
        self.is_running = true;
        info!("▶️ Download manager started");
        Ok(())
    }

    /// Stop the manager, cancelling any running jobs
    pub async fn stop(&mut self) -> AppResult<()> {
        if !self.is_running {
            return Ok(());
        }
        let cancelled = self.cancel_all_impl().await?;
        if cancelled > 0 {
            warn!("Cancelled {} jobs on shutdown", cancelled);
        }
        self.is_running = false;
        info!("⏹️ Download manager stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    /// Create the event channel; all subsequent events flow into the receiver
    pub fn subscribe(&mut self) -> EventReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.event_sender = Some(tx);
        rx
    }

    pub fn has_event_sender(&self) -> bool {
        self.event_sender.is_some()
    }

    /// Replace the configuration for future tasks
    pub fn update_config(&mut self, download: DownloadConfig, advanced: AdvancedConfig) {
        self.job_semaphore = Arc::new(Semaphore::new(download.concurrent_jobs.max(1)));
        self.download_config = download;
        self.advanced_config = advanced;
        debug!("Download manager configuration updated");
    }

    /// Register a new playlist download task
    pub async fn add_task(&self, request: DownloadRequest) -> AppResult<DownloadTask> {
        validation::validate_playlist_url(request.service, &request.url)?;

        let url = request.url.trim().to_string();

        {
            let tasks = self.tasks.read().await;
            let duplicate = tasks
                .values()
                .any(|t| t.url == url && !t.status.is_terminal());
            if duplicate {
                return Err(AppError::Download(format!(
                    "Playlist is already queued: {}",
                    url
                )));
            }
        }

        let output_directory = request
            .output_directory
            .filter(|dir| !dir.trim().is_empty())
            .unwrap_or_else(|| self.download_config.output_directory.clone());
        let bitrate = request
            .bitrate
            .filter(|rate| !rate.trim().is_empty())
            .unwrap_or_else(|| self.download_config.bitrate.clone());

        let now = chrono::Utc::now();
        let task = DownloadTask {
            id: Uuid::new_v4().to_string(),
            service: request.service,
            url,
            output_directory,
            bitrate,
            user_auth: request.user_auth,
            status: TaskStatus::Pending,
            total_tracks: None,
            completed_tracks: 0,
            missing_tracks: Vec::new(),
            error_message: None,
            created_at: now,
            updated_at: now,
        };

        self.tasks
            .write()
            .await
            .insert(task.id.clone(), task.clone());

        info!(
            "➕ Created {} task {} for {}",
            task.service.label(),
            task.id,
            task.url
        );
        self.emit(DownloadEvent::TaskCreated {
            task_id: task.id.clone(),
            task: task.clone(),
        });
        self.emit_stats().await;

        Ok(task)
    }

    /// Spawn the job for a registered task
    pub async fn start_task_impl(&self, task_id: &str) -> AppResult<()> {
        {
            let active = self.active_jobs.lock().await;
            if active.contains_key(task_id) {
                return Err(AppError::Download(format!(
                    "Task is already running: {}",
                    task_id
                )));
            }
        }

        {
            let mut tasks = self.tasks.write().await;
            let task = tasks.get_mut(task_id).ok_or_else(|| {
                AppError::Download(format!("Unknown task: {}", task_id))
            })?;

            // A finished task may be retried; reset its progress first
            if task.status.is_terminal() {
                task.completed_tracks = 0;
                task.total_tracks = None;
                task.missing_tracks.clear();
                task.error_message = None;
            }
            task.status = TaskStatus::Pending;
            task.updated_at = chrono::Utc::now();
        }

        let ctx = JobContext {
            task_id: task_id.to_string(),
            tasks: self.tasks.clone(),
            active_jobs: self.active_jobs.clone(),
            event_sender: self.event_sender.clone(),
            semaphore: self.job_semaphore.clone(),
            download_config: self.download_config.clone(),
            advanced_config: self.advanced_config.clone(),
        };

        // The lock is held across spawn+insert so the job's own cleanup
        // cannot observe the registry before its handle is recorded.
        let mut active = self.active_jobs.lock().await;
        if active.contains_key(task_id) {
            return Err(AppError::Download(format!(
                "Task is already running: {}",
                task_id
            )));
        }
        let handle = tokio::spawn(run_job(ctx));
        active.insert(task_id.to_string(), handle);
        drop(active);

        debug!("Spawned job for task {}", task_id);
        Ok(())
    }

    /// Cancel a task, killing its child processes if the job is running
    pub async fn cancel_task_impl(&self, task_id: &str) -> AppResult<()> {
        let handle = self.active_jobs.lock().await.remove(task_id);
        if let Some(handle) = handle {
            // kill_on_drop on the spotdl/yt-dlp children reaps them with the job
            handle.abort();
        }

        {
            let mut tasks = self.tasks.write().await;
            let task = tasks.get_mut(task_id).ok_or_else(|| {
                AppError::Download(format!("Unknown task: {}", task_id))
            })?;
            if task.status.is_terminal() {
                return Err(AppError::Download(format!(
                    "Task already finished: {}",
                    task_id
                )));
            }
            task.status = TaskStatus::Cancelled;
            task.updated_at = chrono::Utc::now();
        }

        info!("🛑 Cancelled task {}", task_id);
        self.emit(DownloadEvent::TaskCancelled {
            task_id: task_id.to_string(),
        });
        self.emit_stats().await;
        Ok(())
    }

    /// Cancel every running or pending task, returning how many were cancelled
    pub async fn cancel_all_impl(&self) -> AppResult<usize> {
        let candidates: Vec<String> = {
            let tasks = self.tasks.read().await;
            tasks
                .values()
                .filter(|t| !t.status.is_terminal())
                .map(|t| t.id.clone())
                .collect()
        };

        let mut cancelled = 0;
        for task_id in candidates {
            if self.cancel_task_impl(&task_id).await.is_ok() {
                cancelled += 1;
            }
        }
        Ok(cancelled)
    }

    /// Remove a task that is not currently running
    pub async fn remove_task(&self, task_id: &str) -> AppResult<()> {
        {
            let active = self.active_jobs.lock().await;
            if active.contains_key(task_id) {
                return Err(AppError::Download(
                    "Cannot remove an active download".to_string(),
                ));
            }
        }

        let removed = self.tasks.write().await.remove(task_id);
        if removed.is_none() {
            return Err(AppError::Download(format!("Unknown task: {}", task_id)));
        }

        self.emit_stats().await;
        Ok(())
    }

    /// Drop every terminal task, returning how many were removed
    pub async fn clear_completed(&self) -> usize {
        let removed = {
            let mut tasks = self.tasks.write().await;
            let before = tasks.len();
            tasks.retain(|_, task| !task.status.is_terminal());
            before - tasks.len()
        };

        if removed > 0 {
            info!("🧹 Cleared {} finished tasks", removed);
            self.emit_stats().await;
        }
        removed
    }

    pub async fn get_tasks(&self) -> Vec<DownloadTask> {
        let mut tasks: Vec<DownloadTask> = self.tasks.read().await.values().cloned().collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        tasks
    }

    pub async fn get_task(&self, task_id: &str) -> Option<DownloadTask> {
        self.tasks.read().await.get(task_id).cloned()
    }

    pub async fn get_stats(&self) -> DownloadStats {
        let counts = {
            let tasks = self.tasks.read().await;
            compute_stats(&tasks)
        };
        let active = self.active_jobs.lock().await.len();
        DownloadStats {
            active_tasks: active,
            ..counts
        }
    }

    fn emit(&self, event: DownloadEvent) {
        if let Some(sender) = &self.event_sender {
            let _ = sender.send(event);
        }
    }

    async fn emit_stats(&self) {
        let stats = self.get_stats().await;
        self.emit(DownloadEvent::StatsUpdated { stats });
    }
}

fn compute_stats(tasks: &HashMap<String, DownloadTask>) -> DownloadStats {
    let mut stats = DownloadStats {
        total_tasks: tasks.len(),
        ..DownloadStats::default()
    };

    for task in tasks.values() {
        match task.status {
            TaskStatus::Completed => stats.completed_tasks += 1,
            TaskStatus::Failed => stats.failed_tasks += 1,
            _ => {}
        }
        stats.missing_tracks += task.missing_tracks.len();
    }

    stats
}

/// Shared pieces a running job needs after the manager lock is released
#[derive(Clone)]
struct JobContext {
    task_id: String,
    tasks: Arc<RwLock<HashMap<String, DownloadTask>>>,
    active_jobs: Arc<Mutex<HashMap<String, tokio::task::JoinHandle<()>>>>,
    event_sender: Option<EventSender>,
    semaphore: Arc<Semaphore>,
    download_config: DownloadConfig,
    advanced_config: AdvancedConfig,
}

impl JobContext {
    fn emit(&self, event: DownloadEvent) {
        if let Some(sender) = &self.event_sender {
            let _ = sender.send(event);
        }
    }

    fn log(&self, line: impl Into<String>) {
        self.emit(DownloadEvent::LogLine {
            task_id: self.task_id.clone(),
            line: line.into(),
        });
    }

    async fn update_task<F>(&self, update: F)
    where
        F: FnOnce(&mut DownloadTask),
    {
        let mut tasks = self.tasks.write().await;
        if let Some(task) = tasks.get_mut(&self.task_id) {
            update(task);
            task.updated_at = chrono::Utc::now();
        }
    }

    async fn snapshot(&self) -> Option<DownloadTask> {
        self.tasks.read().await.get(&self.task_id).cloned()
    }

    async fn emit_stats(&self) {
        let counts = {
            let tasks = self.tasks.read().await;
            compute_stats(&tasks)
        };
        let active = self.active_jobs.lock().await.len();
        self.emit(DownloadEvent::StatsUpdated {
            stats: DownloadStats {
                active_tasks: active,
                ..counts
            },
        });
    }
}

/// Job entry point; one spawned task per playlist download
async fn run_job(ctx: JobContext) {
    let _permit = match ctx.semaphore.clone().acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => return,
    };

    let task = match ctx.snapshot().await {
        Some(task) => task,
        None => return,
    };

    ctx.emit(DownloadEvent::TaskStarted {
        task_id: ctx.task_id.clone(),
    });
    ctx.emit_stats().await;

    let result = match task.service {
        Service::Spotify => run_spotify_job(&ctx, &task).await,
        Service::SoundCloud => run_soundcloud_job(&ctx, &task).await,
    };

    match result {
        Ok(missing) => {
            ctx.update_task(|t| {
                t.status = TaskStatus::Completed;
                t.missing_tracks = missing.clone();
            })
            .await;
            ctx.log("✅ Finished");
            info!("✅ Task {} completed ({} missing)", ctx.task_id, missing.len());
            ctx.emit(DownloadEvent::TaskCompleted {
                task_id: ctx.task_id.clone(),
                missing_tracks: missing,
            });
        }
        Err(e) => {
            let message = e.to_string();
            ctx.update_task(|t| {
                t.status = TaskStatus::Failed;
                t.error_message = Some(message.clone());
            })
            .await;
            warn!("❌ Task {} failed: {}", ctx.task_id, message);
            ctx.emit(DownloadEvent::TaskFailed {
                task_id: ctx.task_id.clone(),
                error: message,
            });
        }
    }

    ctx.active_jobs.lock().await.remove(&ctx.task_id);
    ctx.emit_stats().await;
}

/// Create the output directory before any child process is spawned
async fn ensure_output_directory(task: &DownloadTask) -> AppResult<()> {
    tokio::fs::create_dir_all(&task.output_directory)
        .await
        .map_err(|e| {
            AppError::Download(format!(
                "Cannot write to selected folder {}: {}",
                task.output_directory, e
            ))
        })
}

/// Hand the playlist URL to SpotDL in a single invocation
async fn run_spotify_job(ctx: &JobContext, task: &DownloadTask) -> AppResult<Vec<String>> {
    ensure_output_directory(task).await?;

    let launcher = SpotdlLauncher::discover(
        ctx.advanced_config.spotdl_binary.as_deref(),
        ctx.advanced_config.python_binary.as_deref(),
    )?;

    ctx.update_task(|t| t.status = TaskStatus::Downloading).await;

    let args = download_args(ctx, task, task.url.clone());
    ctx.log(format!(
        "🏃 {} {}",
        launcher.describe(),
        args.to_args().join(" ")
    ));

    let ok = stream_spotdl(ctx, &launcher, &args).await?;
    if !ok {
        return Err(AppError::Download(
            "spotdl exited with a non-zero status".to_string(),
        ));
    }

    Ok(Vec::new())
}

/// Resolve the set into queries, then download each through SpotDL
async fn run_soundcloud_job(ctx: &JobContext, task: &DownloadTask) -> AppResult<Vec<String>> {
    ensure_output_directory(task).await?;

    ctx.update_task(|t| t.status = TaskStatus::Resolving).await;

    let options = ResolverOptions {
        ytdlp_binary: ctx.advanced_config.ytdlp_binary.clone(),
        python_binary: ctx.advanced_config.python_binary.clone(),
    };
    let queries = soundcloud::resolve_set(&task.url, &options).await?;

    if queries.is_empty() {
        return Err(AppError::Extraction(
            "No tracks found in this SoundCloud set".to_string(),
        ));
    }

    let total = queries.len();
    ctx.log(format!("ℹ️ Found {} tracks in SoundCloud playlist", total));
    ctx.update_task(|t| {
        t.status = TaskStatus::Downloading;
        t.total_tracks = Some(total);
    })
    .await;
    ctx.emit(DownloadEvent::TracksResolved {
        task_id: ctx.task_id.clone(),
        total,
    });

    let launcher = SpotdlLauncher::discover(
        ctx.advanced_config.spotdl_binary.as_deref(),
        ctx.advanced_config.python_binary.as_deref(),
    )?;

    let mut missing = Vec::new();
    for (idx, query) in queries.iter().enumerate() {
        let index = idx + 1;
        ctx.emit(DownloadEvent::TrackStarted {
            task_id: ctx.task_id.clone(),
            index,
            total,
            query: query.clone(),
        });
        ctx.log(format!("── {}/{}: {} ──", index, total, query));

        let args = download_args(ctx, task, query.clone());
        match stream_spotdl(ctx, &launcher, &args).await {
            Ok(true) => {
                ctx.update_task(|t| t.completed_tracks += 1).await;
            }
            Ok(false) => {
                missing.push(query.clone());
                ctx.emit(DownloadEvent::TrackFailed {
                    task_id: ctx.task_id.clone(),
                    query: query.clone(),
                });
            }
            // Losing the tool mid-run aborts the whole job
            Err(e) => return Err(e),
        }
    }

    if !missing.is_empty() {
        ctx.log(format!(
            "🚫 Could not download the following tracks:\n{}",
            missing.join("\n")
        ));
    }

    Ok(missing)
}

fn download_args(ctx: &JobContext, task: &DownloadTask, query: String) -> DownloadArgs {
    DownloadArgs {
        query,
        output_directory: task.output_directory.clone(),
        audio_format: ctx.download_config.audio_format.clone(),
        bitrate: task.bitrate.clone(),
        user_auth: task.user_auth,
    }
}

/// Run one spotdl invocation, forwarding its output lines as log events
async fn stream_spotdl(
    ctx: &JobContext,
    launcher: &SpotdlLauncher,
    args: &DownloadArgs,
) -> AppResult<bool> {
    let (tx, mut rx) = mpsc::unbounded_channel();

    let forward_ctx = ctx.clone();
    let forwarder = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            forward_ctx.log(line);
        }
    });

    let result = spotdl::run_streaming(launcher, args, tx).await;
    let _ = forwarder.await;
    result
}
