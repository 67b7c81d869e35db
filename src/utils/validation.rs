//! Playlist URL validation helpers

use std::sync::OnceLock;

use url::Url;

use crate::core::models::{AppError, AppResult, Service};

/// Whether the string parses as an http(s) URL
pub fn is_http_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

/// Extract the playlist id from a Spotify playlist URL
pub fn spotify_playlist_id(url: &str) -> Option<String> {
    static PLAYLIST_RE: OnceLock<regex::Regex> = OnceLock::new();
    let re = PLAYLIST_RE.get_or_init(|| {
        regex::Regex::new(r"open\.spotify\.com/playlist/([A-Za-z0-9]+)").unwrap()
    });

    re.captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Check a playlist URL before a job is created.
///
/// The error text is user-facing guidance, shown verbatim in the UI.
pub fn validate_playlist_url(service: Service, url: &str) -> AppResult<()> {
    let url = url.trim();

    match service {
        Service::Spotify => {
            if !url.contains("open.spotify.com/playlist/") || spotify_playlist_id(url).is_none() {
                return Err(AppError::InvalidUrl(
                    "Enter a valid Spotify playlist URL.".to_string(),
                ));
            }
        }
        Service::SoundCloud => {
            if !is_http_url(url) {
                return Err(AppError::InvalidUrl(
                    "The URL does not appear to be a full SoundCloud link. Please paste \
                     the entire playlist URL, including https://soundcloud.com/…"
                        .to_string(),
                ));
            }
            if !url.contains("soundcloud.com/") {
                return Err(AppError::InvalidUrl(
                    "Enter a valid SoundCloud playlist URL.".to_string(),
                ));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_spotify_playlist() {
        assert!(validate_playlist_url(
            Service::Spotify,
            "https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M"
        )
        .is_ok());
    }

    #[test]
    fn test_spotify_track_url_rejected() {
        assert!(validate_playlist_url(
            Service::Spotify,
            "https://open.spotify.com/track/4cOdK2wGLETKBW3PvgPWqT"
        )
        .is_err());
    }

    #[test]
    fn test_valid_soundcloud_set() {
        assert!(validate_playlist_url(
            Service::SoundCloud,
            "https://soundcloud.com/user/sets/summer-mix"
        )
        .is_ok());
    }

    #[test]
    fn test_partial_clipboard_paste_rejected() {
        let result =
            validate_playlist_url(Service::SoundCloud, "m_source=clipboard&utm_medium=text");
        assert!(matches!(result, Err(AppError::InvalidUrl(_))));
    }

    #[test]
    fn test_wrong_host_rejected_for_soundcloud() {
        assert!(
            validate_playlist_url(Service::SoundCloud, "https://example.com/sets/mix").is_err()
        );
    }

    #[test]
    fn test_spotify_playlist_id_extraction() {
        assert_eq!(
            spotify_playlist_id("https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M?si=abc"),
            Some("37i9dQZF1DXcBWIGoYBM5M".to_string())
        );
        assert_eq!(spotify_playlist_id("https://example.com/playlist"), None);
    }

    #[test]
    fn test_is_http_url() {
        assert!(is_http_url("https://soundcloud.com/user"));
        assert!(is_http_url("http://soundcloud.com/user"));
        assert!(!is_http_url("ftp://soundcloud.com/user"));
        assert!(!is_http_url("soundcloud.com/user"));
    }
}
