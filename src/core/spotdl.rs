//! SpotDL process integration
//!
//! Builds the download invocation for one search query or playlist URL and
//! streams child output line-by-line to the UI log. SpotDL is located through
//! a fallback chain: configured override, `spotdl` on PATH, `python -m spotdl`.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::core::models::{AppError, AppResult};

/// How the SpotDL entry point is invoked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpotdlLauncher {
    /// A spotdl executable (from PATH or a configured override)
    Executable(PathBuf),

    /// `<python> -m spotdl` through the given interpreter
    PythonModule(String),
}

/// Platform default Python interpreter name
pub fn default_python() -> String {
    if cfg!(target_os = "windows") {
        "python".to_string()
    } else {
        "python3".to_string()
    }
}

impl SpotdlLauncher {
    /// Resolve the launcher: override, PATH executable, Python module.
    pub fn discover(
        override_path: Option<&str>,
        python_override: Option<&str>,
    ) -> AppResult<Self> {
        if let Some(path) = override_path {
            debug!("Using configured spotdl binary: {}", path);
            return Ok(Self::Executable(PathBuf::from(path)));
        }

        if let Ok(path) = which::which("spotdl") {
            debug!("Found spotdl on PATH: {}", path.display());
            return Ok(Self::Executable(path));
        }

        let python = python_override
            .map(str::to_string)
            .unwrap_or_else(default_python);
        if which::which(&python).is_ok() {
            debug!("Falling back to `{} -m spotdl`", python);
            return Ok(Self::PythonModule(python));
        }

        Err(AppError::ToolMissing {
            tool: "spotdl".to_string(),
            hint: "run `pip install spotdl`".to_string(),
        })
    }

    /// Base command with the spotdl entry point, no arguments yet
    fn base_command(&self) -> Command {
        match self {
            Self::Executable(path) => Command::new(path),
            Self::PythonModule(python) => {
                let mut cmd = Command::new(python);
                cmd.arg("-m").arg("spotdl");
                cmd
            }
        }
    }

    /// Printable form for log lines
    pub fn describe(&self) -> String {
        match self {
            Self::Executable(path) => path.to_string_lossy().to_string(),
            Self::PythonModule(python) => format!("{} -m spotdl", python),
        }
    }

    /// Probe the entry point with `--version`
    pub async fn check_available(&self) -> bool {
        let output = self.base_command().arg("--version").output().await;
        match output {
            Ok(output) => output.status.success(),
            Err(_) => false,
        }
    }
}

/// Arguments for downloading one query or URL, mirroring the spotdl CLI
#[derive(Debug, Clone)]
pub struct DownloadArgs {
    pub query: String,
    pub output_directory: String,
    pub audio_format: String,
    pub bitrate: String,
    pub user_auth: bool,
}

impl DownloadArgs {
    /// Argument vector appended after the spotdl entry point
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "download".to_string(),
            self.query.clone(),
            "--output".to_string(),
            self.output_directory.clone(),
            "--format".to_string(),
            self.audio_format.clone(),
            "--bitrate".to_string(),
            self.bitrate.clone(),
        ];
        if self.user_auth {
            args.push("--user-auth".to_string());
        }
        args
    }
}

/// Spawn spotdl for one query and forward every stdout/stderr line to `lines`.
///
/// Returns `Ok(true)` when the child exits with status zero. The channel is a
/// plain line stream; the caller decides what reaches the UI.
pub async fn run_streaming(
    launcher: &SpotdlLauncher,
    args: &DownloadArgs,
    lines: mpsc::UnboundedSender<String>,
) -> AppResult<bool> {
    let mut cmd = launcher.base_command();
    cmd.args(args.to_args())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => AppError::ToolMissing {
            tool: "spotdl".to_string(),
            hint: "run `pip install spotdl`".to_string(),
        },
        _ => AppError::System(format!("Failed to spawn spotdl: {}", e)),
    })?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| AppError::System("No stdout handle on spotdl child".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| AppError::System("No stderr handle on spotdl child".to_string()))?;

    let stdout_lines = lines.clone();
    let stdout_task = tokio::spawn(async move {
        let mut reader = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = reader.next_line().await {
            if stdout_lines.send(line).is_err() {
                break;
            }
        }
    });

    let stderr_lines = lines;
    let stderr_task = tokio::spawn(async move {
        let mut reader = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = reader.next_line().await {
            if stderr_lines.send(line).is_err() {
                break;
            }
        }
    });

    let status = child
        .wait()
        .await
        .map_err(|e| AppError::System(format!("Failed to wait for spotdl: {}", e)))?;

    // Drain remaining output before reporting the exit status
    let _ = stdout_task.await;
    let _ = stderr_task.await;

    if !status.success() {
        warn!("spotdl exited with status {} for: {}", status, args.query);
    }

    Ok(status.success())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_args(user_auth: bool) -> DownloadArgs {
        DownloadArgs {
            query: "query".to_string(),
            output_directory: "/tmp".to_string(),
            audio_format: "m4a".to_string(),
            bitrate: "128k".to_string(),
            user_auth,
        }
    }

    #[test]
    fn test_build_args_with_user_auth() {
        let args = sample_args(true).to_args();
        assert!(args.contains(&"--user-auth".to_string()));
        assert!(args.contains(&"128k".to_string()));
        assert_eq!(args[0], "download");
        assert_eq!(args[1], "query");
    }

    #[test]
    fn test_build_args_without_user_auth() {
        let args = sample_args(false).to_args();
        assert!(!args.contains(&"--user-auth".to_string()));
        assert!(args.contains(&"m4a".to_string()));
    }

    #[test]
    fn test_discover_prefers_override() {
        let launcher = SpotdlLauncher::discover(Some("/opt/spotdl/bin/spotdl"), None).unwrap();
        assert_eq!(
            launcher,
            SpotdlLauncher::Executable(PathBuf::from("/opt/spotdl/bin/spotdl"))
        );
    }

    #[test]
    fn test_describe_python_module() {
        let launcher = SpotdlLauncher::PythonModule("python3".to_string());
        assert_eq!(launcher.describe(), "python3 -m spotdl");
    }

    #[test]
    fn test_default_python_name() {
        let python = default_python();
        if cfg!(target_os = "windows") {
            assert_eq!(python, "python");
        } else {
            assert_eq!(python, "python3");
        }
    }
}
