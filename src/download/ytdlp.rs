//! yt-dlp invocation and parsing of its info JSON

use crate::core::format::{FormatCategory, FormatSpec};
use crate::download::source::{DownloadResult, DownloadedItem, SourceKind};
use crate::error::MediaToolError;
use crate::utils::filename::to_safe_filename;
use crate::utils::process::run_tool;
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Output template handed to yt-dlp, relative to the download directory
pub const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

/// Containers yt-dlp can merge separate video and audio streams into
const MERGE_CONTAINERS: &[&str] = &["mp4", "webm", "mkv", "mov", "flv", "avi"];

/// How yt-dlp should pick and post-process streams for a requested format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSelection {
    /// Value for `-f`
    pub expression: String,
    /// Value for `--merge-output-format`
    pub merge_output: Option<String>,
    /// Value for `--audio-format` (implies `-x`)
    pub extract_audio: Option<&'static str>,
}

impl FormatSelection {
    /// Pick the closest native match so a later transcode is rarely needed
    pub fn for_format(kind: SourceKind, format: &FormatSpec) -> Self {
        let ext = format.ext();
        match format.category() {
            FormatCategory::AudioOnly => {
                Self {
                    expression: "bestaudio/best".to_string(),
                    merge_output: None,
                    extract_audio: extraction_codec(ext),
                }
            }
            FormatCategory::VideoContainer | FormatCategory::PassThrough => {
                let expression = match (kind, ext) {
                    (SourceKind::YouTube, "mp4") => {
                        "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best".to_string()
                    }
                    (SourceKind::YouTube, "webm") => {
                        "bestvideo[ext=webm]+bestaudio[ext=webm]/best[ext=webm]/best".to_string()
                    }
                    _ => "bestvideo+bestaudio/best".to_string(),
                };
                Self {
                    expression,
                    merge_output: MERGE_CONTAINERS
                        .contains(&ext)
                        .then(|| ext.to_string()),
                    extract_audio: None,
                }
            }
        }
    }

    fn push_args(&self, args: &mut Vec<OsString>) {
        args.push("-f".into());
        args.push(self.expression.clone().into());
        if let Some(container) = &self.merge_output {
            args.push("--merge-output-format".into());
            args.push(container.into());
        }
        if let Some(codec) = self.extract_audio {
            args.push("-x".into());
            args.push("--audio-format".into());
            args.push(codec.into());
        }
    }
}

/// `--audio-format` value producing files with extension `ext`, if yt-dlp has one
fn extraction_codec(ext: &str) -> Option<&'static str> {
    match ext {
        "mp3" => Some("mp3"),
        "m4a" => Some("m4a"),
        "aac" => Some("aac"),
        "flac" => Some("flac"),
        "opus" => Some("opus"),
        "wav" => Some("wav"),
        "ogg" => Some("vorbis"),
        _ => None,
    }
}

/// Handle to a yt-dlp binary
#[derive(Debug, Clone)]
pub struct YtDlp {
    binary: PathBuf,
}

impl YtDlp {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Full argument list for one download
    pub fn build_args(
        &self,
        url: &str,
        download_dir: &Path,
        selection: &FormatSelection,
        extra: &[&str],
    ) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["--no-simulate", "--dump-single-json", "--no-progress", "-o"]
            .iter()
            .map(OsString::from)
            .collect();
        args.push(download_dir.join(OUTPUT_TEMPLATE).into_os_string());
        selection.push_args(&mut args);
        args.extend(extra.iter().map(OsString::from));
        args.push("--".into());
        args.push(url.into());
        args
    }

    /// Download `url` into `download_dir` and describe what was saved
    pub async fn download(
        &self,
        url: &str,
        download_dir: &Path,
        selection: &FormatSelection,
        extra: &[&str],
    ) -> Result<DownloadResult, MediaToolError> {
        let args = self.build_args(url, download_dir, selection, extra);
        info!("Downloading {} with format '{}'", url, selection.expression);

        let output = run_tool("yt-dlp", &self.binary, &args)
            .await?
            .check("yt-dlp")?;
        if !output.stderr.trim().is_empty() {
            debug!("yt-dlp: {}", output.stderr.trim());
        }

        let result = parse_info_json(&output.stdout, download_dir)?;
        info!(
            "yt-dlp saved {} file(s) for {}",
            result.items.len(),
            url
        );
        Ok(result)
    }
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

#[derive(Debug, Deserialize)]
struct InfoDict {
    #[serde(rename = "_type")]
    kind: Option<String>,
    title: Option<String>,
    ext: Option<String>,
    #[serde(rename = "_filename")]
    underscore_filename: Option<String>,
    filename: Option<String>,
    requested_downloads: Option<Vec<RequestedDownload>>,
    entries: Option<Vec<Option<InfoDict>>>,
}

#[derive(Debug, Deserialize)]
struct RequestedDownload {
    filepath: Option<String>,
}

impl InfoDict {
    fn is_playlist(&self) -> bool {
        self.kind.as_deref() == Some("playlist") || self.entries.is_some()
    }

    /// Final file path: post-processed path first, then the template result,
    /// then a path rebuilt from title and extension
    fn local_path(&self, download_dir: &Path) -> Result<PathBuf, MediaToolError> {
        let reported = self
            .requested_downloads
            .iter()
            .flatten()
            .find_map(|d| d.filepath.clone())
            .or_else(|| self.underscore_filename.clone())
            .or_else(|| self.filename.clone());
        if let Some(path) = reported {
            return Ok(PathBuf::from(path));
        }

        match (&self.title, &self.ext) {
            (Some(title), Some(ext)) => Ok(download_dir.join(to_safe_filename(title, ext))),
            _ => Err(MediaToolError::Metadata(
                "yt-dlp reported neither a file path nor title and extension".to_string(),
            )),
        }
    }

    fn collect_items(
        &self,
        download_dir: &Path,
        items: &mut Vec<DownloadedItem>,
    ) -> Result<(), MediaToolError> {
        if self.is_playlist() {
            for entry in self.entries.iter().flatten().flatten() {
                entry.collect_items(download_dir, items)?;
            }
        } else {
            items.push(DownloadedItem::new(self.local_path(download_dir)?));
        }
        Ok(())
    }
}

/// Turn the single JSON document printed by `--dump-single-json` into a result
pub fn parse_info_json(json: &str, download_dir: &Path) -> Result<DownloadResult, MediaToolError> {
    let json = json
        .lines()
        .rev()
        .find(|line| line.trim_start().starts_with('{'))
        .ok_or_else(|| MediaToolError::Metadata("yt-dlp printed no JSON".to_string()))?;
    let info: InfoDict = serde_json::from_str(json)?;

    let mut items = Vec::new();
    info.collect_items(download_dir, &mut items)?;

    if info.is_playlist() {
        if items.is_empty() {
            return Err(MediaToolError::Metadata(format!(
                "playlist '{}' has no downloadable entries",
                info.title.as_deref().unwrap_or("untitled")
            )));
        }
        Ok(DownloadResult::playlist(items))
    } else {
        Ok(DownloadResult {
            items,
            playlist: false,
        })
    }
}
