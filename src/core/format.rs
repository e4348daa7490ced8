//! Output format classification and ffmpeg capability probing

use crate::error::MediaToolError;
use crate::utils::process::run_tool;
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Extensions assumed to be usable when ffmpeg cannot be queried
pub const FALLBACK_FORMATS: &[&str] = &[
    "mp3", "wav", "ogg", "flac", "aac", "mp4", "avi", "mkv", "mov", "wmv", "webm", "m4a", "mpg",
    "mpeg", "flv",
];

const AUDIO_ONLY: &[&str] = &[
    "mp3", "wav", "ogg", "flac", "aac", "m4a", "opus", "wma", "aiff",
];

const VIDEO_CONTAINERS: &[&str] = &["mp4", "webm"];

/// Flag column of `ffmpeg -formats` followed by the rest of the line
static FORMAT_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*([DEd]+)\s+(.+)$").unwrap());

static SUPPORTED: OnceCell<Arc<SupportedFormats>> = OnceCell::new();

/// How the transcoder treats a target extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatCategory {
    /// Video stream is dropped, audio is transcoded
    AudioOnly,
    /// Video is re-encoded for the container (mp4, webm)
    VideoContainer,
    /// Streams are copied into the new container unchanged
    PassThrough,
}

impl FormatCategory {
    /// Classify a normalized extension
    pub fn of(ext: &str) -> Self {
        if AUDIO_ONLY.contains(&ext) {
            FormatCategory::AudioOnly
        } else if VIDEO_CONTAINERS.contains(&ext) {
            FormatCategory::VideoContainer
        } else {
            FormatCategory::PassThrough
        }
    }
}

/// A lowercase extension together with its category
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FormatSpec {
    ext: String,
    category: FormatCategory,
}

impl FormatSpec {
    /// Normalize an extension (`".MP4"` -> `"mp4"`) and classify it
    pub fn new(ext: &str) -> Result<Self, MediaToolError> {
        let ext = normalize_ext(ext);
        if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(MediaToolError::UnsupportedFormat(ext));
        }
        let category = FormatCategory::of(&ext);
        Ok(Self { ext, category })
    }

    pub fn ext(&self) -> &str {
        &self.ext
    }

    pub fn category(&self) -> FormatCategory {
        self.category
    }

    /// Case-insensitive comparison against a raw extension
    pub fn matches(&self, ext: &str) -> bool {
        normalize_ext(ext) == self.ext
    }
}

impl FromStr for FormatSpec {
    type Err = MediaToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for FormatSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ext)
    }
}

/// Extensions ffmpeg can read and write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedFormats {
    formats: BTreeSet<String>,
    probed: bool,
}

impl SupportedFormats {
    /// The fixed set used when probing fails
    pub fn fallback() -> Self {
        Self {
            formats: FALLBACK_FORMATS.iter().map(|s| s.to_string()).collect(),
            probed: false,
        }
    }

    pub fn contains(&self, ext: &str) -> bool {
        self.formats.contains(&normalize_ext(ext))
    }

    /// Resolve an extension into a `FormatSpec`, rejecting anything ffmpeg cannot handle
    pub fn resolve(&self, ext: &str) -> Result<FormatSpec, MediaToolError> {
        let spec = FormatSpec::new(ext)?;
        if self.contains(spec.ext()) {
            Ok(spec)
        } else {
            Err(MediaToolError::UnsupportedFormat(spec.ext))
        }
    }

    /// Whether the set came from ffmpeg rather than the fallback
    pub fn is_probed(&self) -> bool {
        self.probed
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.formats.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }
}

impl Default for SupportedFormats {
    fn default() -> Self {
        Self::fallback()
    }
}

/// Lowercase and strip a leading dot
pub fn normalize_ext(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

/// Extract extensions from `ffmpeg -formats` output.
///
/// Only lines whose flag column marks demuxing (`D`) count, and only tokens
/// starting with `.` are taken as extensions.
pub fn parse_formats_listing(listing: &str) -> BTreeSet<String> {
    let mut supported = BTreeSet::new();

    for line in listing.lines() {
        let Some(caps) = FORMAT_LINE.captures(line) else {
            continue;
        };
        if !caps[1].contains('D') {
            continue;
        }
        for token in caps[2].split_whitespace() {
            let Some(ext) = token.strip_prefix('.') else {
                continue;
            };
            let ext = ext.trim_end_matches(',').to_lowercase();
            if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
                supported.insert(ext);
            }
        }
    }

    supported
}

/// Fail fast when ffmpeg cannot be executed
pub async fn ensure_available(ffmpeg: &Path) -> Result<(), MediaToolError> {
    let output = run_tool("ffmpeg", ffmpeg, ["-version"]).await?;
    if output.status.success() {
        debug!("ffmpeg available at {}", ffmpeg.display());
        Ok(())
    } else {
        Err(MediaToolError::Environment(format!(
            "ffmpeg at {} is not functional ({})",
            ffmpeg.display(),
            output.status
        )))
    }
}

/// Ask ffmpeg which formats it supports, falling back to a fixed set on any failure
pub async fn probe_supported_formats(ffmpeg: &Path) -> SupportedFormats {
    match query_formats(ffmpeg).await {
        Ok(formats) => {
            info!("ffmpeg reports {} supported formats", formats.len());
            SupportedFormats {
                formats,
                probed: true,
            }
        }
        Err(e) => {
            warn!("Format probe failed, using built-in list: {}", e);
            SupportedFormats::fallback()
        }
    }
}

async fn query_formats(ffmpeg: &Path) -> Result<BTreeSet<String>, MediaToolError> {
    ensure_available(ffmpeg).await?;
    let output = run_tool("ffmpeg", ffmpeg, ["-hide_banner", "-formats"])
        .await?
        .check("ffmpeg")?;

    let formats = parse_formats_listing(&output.combined_log());
    if formats.is_empty() {
        return Err(MediaToolError::Generic(
            "No formats found in ffmpeg output".to_string(),
        ));
    }
    Ok(formats)
}

/// Probe once and cache the result for the rest of the process
pub async fn init_supported_formats(ffmpeg: &Path) -> Arc<SupportedFormats> {
    if let Some(existing) = SUPPORTED.get() {
        return existing.clone();
    }
    let probed = Arc::new(probe_supported_formats(ffmpeg).await);
    // A concurrent initializer may have won; keep whichever was stored first.
    let _ = SUPPORTED.set(probed);
    supported_formats()
}

/// The cached supported-format set, or the fallback if nothing was probed yet
pub fn supported_formats() -> Arc<SupportedFormats> {
    SUPPORTED
        .get()
        .cloned()
        .unwrap_or_else(|| Arc::new(SupportedFormats::fallback()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "File formats:
 D. = Demuxing supported
 .E = Muxing supported
 --
 D  aac             raw ADTS AAC (Advanced Audio Coding) .aac
 DE matroska,webm   Matroska / WebM .mkv .webm
  E mp4             MP4 (MPEG-4 Part 14) .mp4
 DE mp3             MP3 (MPEG audio layer 3) .MP3
 D  foo             No extension listed
";

    #[test]
    fn test_format_category() {
        assert_eq!(FormatCategory::of("mp3"), FormatCategory::AudioOnly);
        assert_eq!(FormatCategory::of("m4a"), FormatCategory::AudioOnly);
        assert_eq!(FormatCategory::of("mp4"), FormatCategory::VideoContainer);
        assert_eq!(FormatCategory::of("webm"), FormatCategory::VideoContainer);
        assert_eq!(FormatCategory::of("mkv"), FormatCategory::PassThrough);
        assert_eq!(FormatCategory::of("mov"), FormatCategory::PassThrough);
    }

    #[test]
    fn test_format_spec_normalization() {
        let spec = FormatSpec::new(".MP4").unwrap();
        assert_eq!(spec.ext(), "mp4");
        assert_eq!(spec.category(), FormatCategory::VideoContainer);
        assert!(spec.matches("Mp4"));
        assert!(!spec.matches("webm"));
        assert_eq!(spec.to_string(), "mp4");

        assert!(FormatSpec::new("").is_err());
        assert!(FormatSpec::new("m p4").is_err());
        assert_eq!(
            "flac".parse::<FormatSpec>().unwrap().category(),
            FormatCategory::AudioOnly
        );
    }

    #[test]
    fn test_parse_formats_listing() {
        let formats = parse_formats_listing(LISTING);
        let expected: BTreeSet<String> = ["aac", "mkv", "webm", "mp3"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(formats, expected);
    }

    #[test]
    fn test_parse_formats_listing_empty() {
        assert!(parse_formats_listing("").is_empty());
        assert!(parse_formats_listing(" D  aac  raw ADTS AAC").is_empty());
    }

    #[test]
    fn test_fallback_set() {
        let formats = SupportedFormats::fallback();
        assert_eq!(formats.len(), 15);
        assert!(!formats.is_probed());
        assert!(formats.contains("MKV"));
        assert!(formats.contains(".mp3"));
        assert!(!formats.contains("zzz"));
    }

    #[test]
    fn test_resolve() {
        let formats = SupportedFormats::fallback();
        assert_eq!(formats.resolve("WEBM").unwrap().ext(), "webm");
        let err = formats.resolve("zzz").unwrap_err();
        assert!(matches!(err, MediaToolError::UnsupportedFormat(ref f) if f == "zzz"));
    }

    #[tokio::test]
    async fn test_missing_binary_falls_back() {
        let formats = probe_supported_formats(Path::new("/nonexistent/ffmpeg")).await;
        assert_eq!(formats, SupportedFormats::fallback());
    }

    #[tokio::test]
    async fn test_ensure_available_missing_binary() {
        let err = ensure_available(Path::new("/nonexistent/ffmpeg"))
            .await
            .unwrap_err();
        assert!(err.is_environment());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_parses_ffmpeg_format_listing() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("ffmpeg");
        std::fs::write(
            &script,
            format!(
                "#!/bin/sh\nif [ \"$1\" = \"-version\" ]; then exit 0; fi\ncat <<'EOF'\n{}EOF\n",
                LISTING
            ),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let formats = probe_supported_formats(&script).await;
        assert!(formats.is_probed());
        assert!(formats.contains("mkv"));
        assert!(!formats.contains("mp4"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_ensure_available_nonzero_exit() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("ffmpeg");
        std::fs::write(&script, "#!/bin/sh\nexit 1\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        assert!(ensure_available(&script).await.unwrap_err().is_environment());
        assert_eq!(probe_supported_formats(&script).await, SupportedFormats::fallback());
    }
}
