// Prevents additional console window on Windows in release, DO NOT REMOVE!!
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use tauri::Manager;
use tracing::{error, info};

mod commands;

use commands::*;
use spotcloud::AppState;

/// The first CLI argument `test` switches to the headless self-test suite
/// instead of opening the GUI.
fn is_selftest_invocation(args: &[String]) -> bool {
    args.get(1).map(String::as_str) == Some("test")
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if is_selftest_invocation(&args) {
        std::process::exit(spotcloud::core::selftest::run());
    }

    spotcloud::utils::logging::init_tracing();
    info!("🚀 Starting SpotCloud");

    let app_state = match AppState::new() {
        Ok(state) => state,
        Err(e) => {
            error!("❌ Failed to initialize application state: {}", e);
            std::process::exit(1);
        }
    };

    tauri::Builder::default()
        .manage(app_state)
        .invoke_handler(tauri::generate_handler![
            // Download commands
            start_playlist_download,
            cancel_download,
            cancel_all_downloads,
            remove_download,
            get_download_tasks,
            get_download_stats,
            clear_completed_tasks,
            // Configuration commands
            get_config,
            update_config,
            reset_config,
            export_config,
            import_config,
            // System commands
            check_spotdl,
            check_yt_dlp,
            validate_playlist_url,
            default_output_directory,
            open_download_folder,
        ])
        .setup(|app| {
            info!("🔧 Setting up application");

            let state: tauri::State<AppState> = app.state();
            let app_handle = app.handle();

            // Bridge manager events to the frontend
            let manager = state.download_manager.clone();
            let event_handle = app_handle.clone();
            tauri::async_runtime::spawn(async move {
                let mut events = {
                    let mut manager = manager.write().await;
                    let events = manager.subscribe();
                    if let Err(e) = manager.start().await {
                        error!("❌ Download manager failed to start: {}", e);
                    }
                    events
                };

                while let Some(event) = events.recv().await {
                    if let Err(e) = event_handle.emit_all("download_event", &event) {
                        error!("Failed to emit download event: {}", e);
                    }
                }
            });

            if let Err(e) = app.emit_all("app_ready", true) {
                error!("Failed to emit app_ready event: {}", e);
            } else {
                info!("✅ App ready event emitted");
            }

            Ok(())
        })
        .on_window_event(|event| {
            if let tauri::WindowEvent::CloseRequested { .. } = event.event() {
                info!("📦 Application closing requested");
            }
        })
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selftest_dispatch() {
        let gui = vec!["spotcloud".to_string()];
        assert!(!is_selftest_invocation(&gui));

        let test_mode = vec!["spotcloud".to_string(), "test".to_string()];
        assert!(is_selftest_invocation(&test_mode));

        // Only the exact token switches modes
        let other = vec!["spotcloud".to_string(), "tests".to_string()];
        assert!(!is_selftest_invocation(&other));

        let later = vec![
            "spotcloud".to_string(),
            "gui".to_string(),
            "test".to_string(),
        ];
        assert!(!is_selftest_invocation(&later));
    }
}
