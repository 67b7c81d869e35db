//! SoundCloud set resolution via yt-dlp
//!
//! SoundCloud sets are expanded into YouTube-searchable `"Artist - Title"`
//! queries with yt-dlp's JSON dump; each query is then handed to SpotDL.
//! Extraction tiers are tried until one yields at least one track, each tier
//! attempting the cheap flat playlist dump first and retrying with full
//! extraction when flat comes back empty.

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::core::models::{AppError, AppResult};
use crate::core::spotdl::default_python;

/// Subset of the yt-dlp info-dict we care about
#[derive(Debug, Deserialize)]
pub struct SetInfo {
    #[serde(default)]
    pub entries: Option<Vec<SetEntry>>,
}

/// One playlist entry from the info-dict
#[derive(Debug, Deserialize)]
pub struct SetEntry {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub uploader: Option<String>,
}

/// Overrides for the extraction tiers, taken from the advanced config
#[derive(Debug, Clone, Default)]
pub struct ResolverOptions {
    pub ytdlp_binary: Option<String>,
    pub python_binary: Option<String>,
}

/// Strip URL parameters and fragments that confuse yt-dlp
pub fn sanitize_set_url(url: &str) -> String {
    let without_query = url.split('?').next().unwrap_or(url);
    let without_fragment = without_query.split('#').next().unwrap_or(without_query);
    without_fragment.to_string()
}

/// Turn a parsed info-dict into `"Uploader - Title"` search queries.
/// Entries without a title are skipped; without an uploader the title stands
/// alone.
pub fn queries_from_info(info: &SetInfo) -> Vec<String> {
    let mut queries = Vec::new();

    for entry in info.entries.as_deref().unwrap_or_default() {
        let title = entry.title.as_deref().unwrap_or("").trim();
        if title.is_empty() {
            continue;
        }

        let uploader = entry.uploader.as_deref().unwrap_or("").trim();
        if uploader.is_empty() {
            queries.push(title.to_string());
        } else {
            queries.push(format!("{} - {}", uploader, title));
        }
    }

    queries
}

/// One way of invoking yt-dlp
#[derive(Debug, Clone)]
enum ExtractorTier {
    /// A yt-dlp executable (from PATH or a configured override)
    Executable(String),

    /// `<python> -m yt_dlp` through the given interpreter
    PythonModule(String),
}

impl ExtractorTier {
    fn label(&self) -> String {
        match self {
            Self::Executable(path) => path.clone(),
            Self::PythonModule(python) => format!("{} -m yt_dlp", python),
        }
    }

    fn command(&self) -> tokio::process::Command {
        match self {
            Self::Executable(path) => tokio::process::Command::new(path),
            Self::PythonModule(python) => {
                let mut cmd = tokio::process::Command::new(python);
                cmd.arg("-m").arg("yt_dlp");
                cmd
            }
        }
    }
}

/// The tiers to try, in order
fn extractor_tiers(options: &ResolverOptions) -> Vec<ExtractorTier> {
    let mut tiers = Vec::new();

    if let Some(ref path) = options.ytdlp_binary {
        tiers.push(ExtractorTier::Executable(path.clone()));
    } else if let Ok(path) = which::which("yt-dlp") {
        tiers.push(ExtractorTier::Executable(
            path.to_string_lossy().to_string(),
        ));
    } else if let Ok(path) = which::which("yt-dlp.exe") {
        tiers.push(ExtractorTier::Executable(
            path.to_string_lossy().to_string(),
        ));
    }

    let python = options
        .python_binary
        .clone()
        .unwrap_or_else(default_python);
    if which::which(&python).is_ok() {
        tiers.push(ExtractorTier::PythonModule(python));
    }

    tiers
}

/// Resolve every track of a SoundCloud set into a SpotDL search query.
pub async fn resolve_set(url: &str, options: &ResolverOptions) -> AppResult<Vec<String>> {
    let url = sanitize_set_url(url.trim());

    if !url.starts_with("http") {
        return Err(AppError::InvalidUrl(
            "The URL does not appear to be a full SoundCloud link. Please paste the \
             entire playlist URL, including https://soundcloud.com/…"
                .to_string(),
        ));
    }

    let tiers = extractor_tiers(options);
    if tiers.is_empty() {
        return Err(AppError::ToolMissing {
            tool: "yt-dlp".to_string(),
            hint: "install the yt-dlp executable or `pip install yt-dlp`".to_string(),
        });
    }

    let mut errors: Vec<String> = Vec::new();

    for tier in &tiers {
        debug!("Trying SoundCloud extraction via {}", tier.label());

        // Flat extraction is cheap; full extraction copes with sets where the
        // flat API returns an empty entry list.
        match extract_queries(tier, &url, true).await {
            Ok(queries) if !queries.is_empty() => {
                info!(
                    "Resolved {} tracks via {} (flat)",
                    queries.len(),
                    tier.label()
                );
                return Ok(queries);
            }
            Ok(_) => match extract_queries(tier, &url, false).await {
                Ok(queries) if !queries.is_empty() => {
                    info!(
                        "Resolved {} tracks via {} (full)",
                        queries.len(),
                        tier.label()
                    );
                    return Ok(queries);
                }
                Ok(_) => {
                    errors.push(format!(
                        "{} returned no entries even after full extraction",
                        tier.label()
                    ));
                }
                Err(e) => errors.push(format!("{} error: {}", tier.label(), e)),
            },
            Err(e) => errors.push(format!("{} error: {}", tier.label(), e)),
        }
    }

    warn!("All extraction tiers failed for {}", url);
    Err(AppError::Extraction(format!(
        "yt-dlp could not extract the SoundCloud set: {}",
        errors.join("; ")
    )))
}

/// Run one yt-dlp invocation and parse its JSON dump into queries
async fn extract_queries(tier: &ExtractorTier, url: &str, flat: bool) -> AppResult<Vec<String>> {
    let mut cmd = tier.command();
    if flat {
        cmd.arg("--flat-playlist");
    }
    cmd.arg("-J").arg(url);

    let output = cmd
        .output()
        .await
        .map_err(|e| AppError::System(format!("Failed to run {}: {}", tier.label(), e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let message = if stderr.is_empty() { stdout } else { stderr };
        return Err(AppError::Extraction(message));
    }

    let info: SetInfo = serde_json::from_slice(&output.stdout)
        .map_err(|e| AppError::Extraction(format!("Invalid yt-dlp JSON: {}", e)))?;

    Ok(queries_from_info(&info))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_INFO_JSON: &str =
        r#"{"entries": [{"title": "Foo", "uploader": "Bar"}, {"title": "Baz"}]}"#;

    #[test]
    fn test_sanitize_strips_params_and_fragment() {
        let url = "https://soundcloud.com/user/playlist?utm_source=clip#frag";
        assert_eq!(
            sanitize_set_url(url),
            "https://soundcloud.com/user/playlist"
        );
    }

    #[test]
    fn test_sanitize_leaves_clean_urls_alone() {
        let url = "https://soundcloud.com/user/sets/mix";
        assert_eq!(sanitize_set_url(url), url);
    }

    #[test]
    fn test_queries_from_info() {
        let info: SetInfo = serde_json::from_str(SAMPLE_INFO_JSON).unwrap();
        assert_eq!(
            queries_from_info(&info),
            vec!["Bar - Foo".to_string(), "Baz".to_string()]
        );
    }

    #[test]
    fn test_queries_skip_untitled_entries() {
        let info: SetInfo = serde_json::from_str(
            r#"{"entries": [{"uploader": "NoTitle"}, {"title": "  "}, {"title": "Kept"}]}"#,
        )
        .unwrap();
        assert_eq!(queries_from_info(&info), vec!["Kept".to_string()]);
    }

    #[test]
    fn test_queries_from_missing_entries() {
        let info: SetInfo = serde_json::from_str("{}").unwrap();
        assert!(queries_from_info(&info).is_empty());
    }

    #[tokio::test]
    async fn test_resolve_rejects_partial_clipboard_paste() {
        let result = resolve_set("m_source=clipboard&utm_medium=text", &ResolverOptions::default())
            .await;
        assert!(matches!(result, Err(AppError::InvalidUrl(_))));
    }
}
