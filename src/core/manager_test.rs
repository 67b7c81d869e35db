//! Download manager unit tests
//!
//! Exercise the task registry, status bookkeeping, and event emission without
//! touching spotdl or yt-dlp.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use crate::core::config::{AdvancedConfig, DownloadConfig};
    use crate::core::manager::{DownloadEvent, DownloadManager};
    use crate::core::models::{AppError, DownloadRequest, Service, TaskStatus};

    fn create_test_config() -> DownloadConfig {
        DownloadConfig {
            output_directory: "./test_downloads".to_string(),
            audio_format: "m4a".to_string(),
            bitrate: "320k".to_string(),
            concurrent_jobs: 2,
        }
    }

    fn create_manager() -> DownloadManager {
        DownloadManager::new(create_test_config(), AdvancedConfig::default()).expect("manager")
    }

    fn spotify_request() -> DownloadRequest {
        DownloadRequest {
            service: Service::Spotify,
            url: "https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M".to_string(),
            output_directory: None,
            bitrate: None,
            user_auth: false,
        }
    }

    #[tokio::test]
    async fn test_manager_creation() {
        let manager = create_manager();
        assert!(!manager.is_running());
        assert!(!manager.has_event_sender());
        assert!(manager.get_tasks().await.is_empty());
    }

    #[tokio::test]
    async fn test_zero_concurrency_rejected() {
        let mut config = create_test_config();
        config.concurrent_jobs = 0;
        let result = DownloadManager::new(config, AdvancedConfig::default());
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn test_start_stop_manager() {
        let mut manager = create_manager();

        manager.start().await.expect("start");
        assert!(manager.is_running());

        // Starting twice is harmless
        manager.start().await.expect("restart");
        assert!(manager.is_running());

        manager.stop().await.expect("stop");
        assert!(!manager.is_running());
    }

    #[tokio::test]
    async fn test_add_task_applies_config_defaults() {
        let manager = create_manager();

        let task = manager.add_task(spotify_request()).await.expect("add");

        assert!(!task.id.is_empty());
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.output_directory, "./test_downloads");
        assert_eq!(task.bitrate, "320k");
        assert_eq!(task.completed_tracks, 0);
        assert!(task.total_tracks.is_none());
        assert_eq!(manager.get_tasks().await.len(), 1);
    }

    #[tokio::test]
    async fn test_add_task_keeps_request_overrides() {
        let manager = create_manager();

        let output_dir = tempfile::tempdir().expect("tempdir");
        let output_path = output_dir.path().to_string_lossy().to_string();

        let request = DownloadRequest {
            output_directory: Some(output_path.clone()),
            bitrate: Some("128k".to_string()),
            user_auth: true,
            ..spotify_request()
        };
        let task = manager.add_task(request).await.expect("add");

        assert_eq!(task.output_directory, output_path);
        assert_eq!(task.bitrate, "128k");
        assert!(task.user_auth);
    }

    #[tokio::test]
    async fn test_add_task_rejects_invalid_url() {
        let manager = create_manager();

        let request = DownloadRequest {
            url: "https://open.spotify.com/track/4cOdK2wGLETKBW3PvgPWqT".to_string(),
            ..spotify_request()
        };
        let result = manager.add_task(request).await;
        assert!(matches!(result, Err(AppError::InvalidUrl(_))));
        assert!(manager.get_tasks().await.is_empty());
    }

    #[tokio::test]
    async fn test_add_duplicate_url_rejected() {
        let manager = create_manager();

        manager.add_task(spotify_request()).await.expect("first");
        let result = manager.add_task(spotify_request()).await;
        assert!(matches!(result, Err(AppError::Download(_))));
        assert_eq!(manager.get_tasks().await.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_task() {
        let manager = create_manager();

        let task = manager.add_task(spotify_request()).await.expect("add");
        assert_eq!(manager.get_tasks().await.len(), 1);

        manager.remove_task(&task.id).await.expect("remove");
        assert!(manager.get_tasks().await.is_empty());
    }

    #[tokio::test]
    async fn test_remove_unknown_task_fails() {
        let manager = create_manager();
        assert!(manager.remove_task("missing").await.is_err());
    }

    #[tokio::test]
    async fn test_cancel_pending_task() {
        let manager = create_manager();

        let task = manager.add_task(spotify_request()).await.expect("add");
        manager.cancel_task_impl(&task.id).await.expect("cancel");

        let task = manager.get_task(&task.id).await.expect("task");
        assert_eq!(task.status, TaskStatus::Cancelled);

        // A terminal task cannot be cancelled again
        assert!(manager.cancel_task_impl(&task.id).await.is_err());
    }

    #[tokio::test]
    async fn test_cancel_unknown_task_fails() {
        let manager = create_manager();
        assert!(manager.cancel_task_impl("missing").await.is_err());
    }

    #[tokio::test]
    async fn test_stats_counts() {
        let manager = create_manager();

        let first = manager.add_task(spotify_request()).await.expect("first");
        let request = DownloadRequest {
            service: Service::SoundCloud,
            url: "https://soundcloud.com/user/sets/summer-mix".to_string(),
            output_directory: None,
            bitrate: None,
            user_auth: false,
        };
        manager.add_task(request).await.expect("second");

        let stats = manager.get_stats().await;
        assert_eq!(stats.total_tasks, 2);
        assert_eq!(stats.completed_tasks, 0);
        assert_eq!(stats.failed_tasks, 0);
        assert_eq!(stats.active_tasks, 0);

        manager.cancel_task_impl(&first.id).await.expect("cancel");
        let stats = manager.get_stats().await;
        assert_eq!(stats.total_tasks, 2);
    }

    #[tokio::test]
    async fn test_clear_completed_drops_terminal_tasks() {
        let manager = create_manager();

        let first = manager.add_task(spotify_request()).await.expect("first");
        let request = DownloadRequest {
            service: Service::SoundCloud,
            url: "https://soundcloud.com/user/sets/summer-mix".to_string(),
            output_directory: None,
            bitrate: None,
            user_auth: false,
        };
        manager.add_task(request).await.expect("second");

        manager.cancel_task_impl(&first.id).await.expect("cancel");

        let removed = manager.clear_completed().await;
        assert_eq!(removed, 1);
        assert_eq!(manager.get_tasks().await.len(), 1);
    }

    #[tokio::test]
    async fn test_task_events_are_emitted() {
        let mut manager = create_manager();
        let mut events = manager.subscribe();
        assert!(manager.has_event_sender());

        let task = manager.add_task(spotify_request()).await.expect("add");

        match timeout(Duration::from_secs(1), events.recv()).await {
            Ok(Some(DownloadEvent::TaskCreated { task_id, .. })) => {
                assert_eq!(task_id, task.id);
            }
            other => panic!("expected TaskCreated, got {:?}", other),
        }

        match timeout(Duration::from_secs(1), events.recv()).await {
            Ok(Some(DownloadEvent::StatsUpdated { stats })) => {
                assert_eq!(stats.total_tasks, 1);
            }
            other => panic!("expected StatsUpdated, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_tasks_sorted_by_creation() {
        let manager = create_manager();

        let first = manager.add_task(spotify_request()).await.expect("first");
        tokio::time::sleep(Duration::from_millis(5)).await;
        let request = DownloadRequest {
            service: Service::SoundCloud,
            url: "https://soundcloud.com/user/sets/summer-mix".to_string(),
            output_directory: None,
            bitrate: None,
            user_auth: false,
        };
        let second = manager.add_task(request).await.expect("second");

        let tasks = manager.get_tasks().await;
        assert_eq!(tasks[0].id, first.id);
        assert_eq!(tasks[1].id, second.id);
    }
}
