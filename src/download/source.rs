//! Download sources and the shapes of what they return

use crate::core::format::{normalize_ext, FormatSpec};
use crate::error::MediaToolError;
use crate::utils::url::is_niconico_url;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// A URL plus the format the caller wants to end up with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub format: FormatSpec,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, format: FormatSpec) -> Self {
        Self {
            url: url.into(),
            format,
        }
    }
}

/// One file saved by a source, with the extension it was actually saved as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedItem {
    pub path: PathBuf,
    pub format: String,
}

impl DownloadedItem {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .map(normalize_ext)
            .unwrap_or_default();
        Self { path, format }
    }
}

/// Raw result of a source fetch, in the order the source reported the items
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    pub items: Vec<DownloadedItem>,
    /// The URL resolved to a playlist or other multi-item collection
    pub playlist: bool,
}

impl DownloadResult {
    pub fn single(item: DownloadedItem) -> Self {
        Self {
            items: vec![item],
            playlist: false,
        }
    }

    pub fn playlist(items: Vec<DownloadedItem>) -> Self {
        Self {
            items,
            playlist: true,
        }
    }
}

/// Final paths of a download after format reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Single(PathBuf),
    Multiple(Vec<PathBuf>),
}

impl DownloadOutcome {
    pub fn from_paths(paths: Vec<PathBuf>, playlist: bool) -> Self {
        match (playlist, paths.len()) {
            (false, 1) => DownloadOutcome::Single(paths.into_iter().next().unwrap_or_default()),
            _ => DownloadOutcome::Multiple(paths),
        }
    }

    pub fn into_paths(self) -> Vec<PathBuf> {
        match self {
            DownloadOutcome::Single(path) => vec![path],
            DownloadOutcome::Multiple(paths) => paths,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            DownloadOutcome::Single(_) => 1,
            DownloadOutcome::Multiple(paths) => paths.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Which site-specific backend handles a URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// YouTube and anything not claimed by another source
    YouTube,
    /// niconico (nicovideo.jp, nico.ms)
    NicoNico,
}

impl SourceKind {
    /// Route a URL by its host
    pub fn for_url(url: &str) -> Self {
        if is_niconico_url(url) {
            SourceKind::NicoNico
        } else {
            SourceKind::YouTube
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::YouTube => "youtube",
            SourceKind::NicoNico => "niconico",
        }
    }
}

/// A backend that fetches a remote URL to local disk
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Name of the source (for logging)
    fn name(&self) -> &'static str;

    /// Download everything the URL resolves to into `download_dir`
    async fn fetch(
        &self,
        request: &DownloadRequest,
        download_dir: &Path,
    ) -> Result<DownloadResult, MediaToolError>;
}
