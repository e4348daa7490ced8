//! URL utilities for validating input and routing URLs to a source

use crate::error::MediaToolError;
use url::Url;

/// Hosts served by the niconico backend
pub const NICONICO_DOMAINS: &[&str] = &["nicovideo.jp", "nico.ms"];

/// Hosts served by the YouTube backend
pub const YOUTUBE_DOMAINS: &[&str] = &["youtube.com", "youtu.be"];

/// Parse a user-supplied URL, accepting only http(s)
pub fn parse_media_url(url: &str) -> Result<Url, MediaToolError> {
    let parsed = Url::parse(url.trim())?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(MediaToolError::InvalidUrl(format!(
            "unsupported scheme '{}' in {}",
            other, url
        ))),
    }
}

/// Check whether the URL's host is one of `domains` or a subdomain of one
pub fn host_matches(url: &str, domains: &[&str]) -> bool {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.to_lowercase();
    domains
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{}", d)))
}

/// Check if URL points at niconico
pub fn is_niconico_url(url: &str) -> bool {
    host_matches(url, NICONICO_DOMAINS)
}

/// Check if URL points at YouTube
pub fn is_youtube_url(url: &str) -> bool {
    host_matches(url, YOUTUBE_DOMAINS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_media_url() {
        assert!(parse_media_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ").is_ok());
        assert!(parse_media_url(" http://nico.ms/sm9 ").is_ok());
        assert!(matches!(
            parse_media_url("ftp://example.com/video.mp4"),
            Err(MediaToolError::InvalidUrl(_))
        ));
        assert!(matches!(
            parse_media_url("not a url"),
            Err(MediaToolError::UrlError(_))
        ));
    }

    #[test]
    fn test_is_niconico_url() {
        assert!(is_niconico_url("https://www.nicovideo.jp/watch/sm9"));
        assert!(is_niconico_url("https://live.nicovideo.jp/watch/lv1"));
        assert!(is_niconico_url("https://NICO.MS/sm9"));
        assert!(!is_niconico_url("https://notnicovideo.jp/watch/sm9"));
        assert!(!is_niconico_url("https://www.youtube.com/watch?v=x"));
        assert!(!is_niconico_url("sm9"));
    }

    #[test]
    fn test_is_youtube_url() {
        assert!(is_youtube_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_youtube_url("https://youtu.be/dQw4w9WgXcQ"));
        assert!(is_youtube_url("https://music.youtube.com/playlist?list=PLxxxx"));
        assert!(!is_youtube_url("https://example.com"));
    }
}
