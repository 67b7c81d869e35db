//! Core data models for the playlist downloader

use serde::{Deserialize, Serialize};

/// Streaming service a playlist URL belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Service {
    Spotify,

    SoundCloud,
}

impl Service {
    /// Human-readable label used in logs and the UI
    pub fn label(&self) -> &'static str {
        match self {
            Service::Spotify => "Spotify",
            Service::SoundCloud => "SoundCloud",
        }
    }
}

/// Task status enumeration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum TaskStatus {
    Pending,

    /// SoundCloud sets only: the set is being expanded into track queries
    Resolving,

    Downloading,

    Completed,

    Failed,

    Cancelled,
}

impl TaskStatus {
    /// Whether the task has reached a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

/// Request payload for starting a playlist download job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadRequest {
    pub service: Service,

    pub url: String,

    /// Falls back to the configured output directory when omitted
    pub output_directory: Option<String>,

    /// Falls back to the configured bitrate when omitted
    pub bitrate: Option<String>,

    /// Pass `--user-auth` to SpotDL (private Spotify playlists)
    pub user_auth: bool,
}

/// One playlist download job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadTask {
    pub id: String,

    pub service: Service,

    pub url: String,

    pub output_directory: String,

    pub bitrate: String,

    pub user_auth: bool,

    pub status: TaskStatus,

    /// Known once a SoundCloud set has been resolved; Spotify playlists are
    /// downloaded as a single SpotDL invocation and never report a count
    pub total_tracks: Option<usize>,

    pub completed_tracks: usize,

    /// Queries that could not be matched/downloaded
    pub missing_tracks: Vec<String>,

    pub error_message: Option<String>,

    pub created_at: chrono::DateTime<chrono::Utc>,

    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Download statistics across all tasks
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DownloadStats {
    pub total_tasks: usize,

    pub active_tasks: usize,

    pub completed_tasks: usize,

    pub failed_tasks: usize,

    pub missing_tracks: usize,
}

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("{tool} not found: {hint}")]
    ToolMissing { tool: String, hint: String },

    #[error("Playlist extraction failed: {0}")]
    Extraction(String),

    #[error("Download error: {0}")]
    Download(String),

    #[error("System error: {0}")]
    System(String),
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Resolving.is_terminal());
        assert!(!TaskStatus::Downloading.is_terminal());
    }

    #[test]
    fn test_service_labels() {
        assert_eq!(Service::Spotify.label(), "Spotify");
        assert_eq!(Service::SoundCloud.label(), "SoundCloud");
    }
}
