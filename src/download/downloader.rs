//! Download-then-normalize: fetch from a source, then make every item match
//! the requested format

use crate::core::format::FormatSpec;
use crate::core::transcoder::Transcoder;
use crate::download::source::{DownloadOutcome, DownloadRequest, DownloadedItem, MediaSource};
use crate::error::MediaToolError;
use chrono::{DateTime, Local};
use std::fs::{File, FileTimes};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// Format requested when the caller gives none
pub const DEFAULT_DOWNLOAD_FORMAT: &str = "mp4";

/// Downloads URLs through one source and reconciles the results
pub struct Downloader {
    source: Arc<dyn MediaSource>,
    transcoder: Arc<Transcoder>,
    download_dir: PathBuf,
    timestamp: Option<DateTime<Local>>,
}

impl Downloader {
    pub fn new(
        source: Arc<dyn MediaSource>,
        transcoder: Arc<Transcoder>,
        download_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source,
            transcoder,
            download_dir: download_dir.into(),
            timestamp: None,
        }
    }

    /// Stamp final files with this time instead of the current time
    pub fn with_timestamp(mut self, timestamp: DateTime<Local>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Download `url` and return one file per resolved item, each in `format`
    /// (mp4 when `None`)
    pub async fn download(
        &self,
        url: &str,
        format: Option<&str>,
    ) -> Result<DownloadOutcome, MediaToolError> {
        let format = self
            .transcoder
            .formats()
            .resolve(format.unwrap_or(DEFAULT_DOWNLOAD_FORMAT))?;
        let request = DownloadRequest::new(url, format);

        tokio::fs::create_dir_all(&self.download_dir).await?;
        info!(
            "Fetching {} via {} into {}",
            url,
            self.source.name(),
            self.download_dir.display()
        );
        let result = self.source.fetch(&request, &self.download_dir).await?;

        let mut paths = Vec::with_capacity(result.items.len());
        for item in &result.items {
            let path = self.reconcile(item, &request.format).await?;
            stamp_file_times(&path, self.timestamp);
            paths.push(path);
        }

        Ok(DownloadOutcome::from_paths(paths, result.playlist))
    }

    /// Transcode an item whose actual format differs from the requested one,
    /// deleting the intermediate file once the conversion succeeded. A failed
    /// deletion only warns; the converted file is still the result.
    async fn reconcile(
        &self,
        item: &DownloadedItem,
        format: &FormatSpec,
    ) -> Result<PathBuf, MediaToolError> {
        if format.matches(&item.format) {
            debug!("{} already matches {}", item.path.display(), format);
            return Ok(item.path.clone());
        }

        info!(
            "Downloaded {} as {}, converting to {}",
            item.path.display(),
            item.format,
            format
        );
        let converted = self.transcoder.convert(&item.path, format.ext()).await?;

        if converted != item.path {
            match tokio::fs::remove_file(&item.path).await {
                Ok(()) => debug!("Removed intermediate {}", item.path.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(
                    "Could not remove intermediate {}: {}",
                    item.path.display(),
                    e
                ),
            }
        }
        Ok(converted)
    }
}

/// Set access and modification time of `path` to `timestamp` (now when `None`).
/// Failures are logged and otherwise ignored.
pub fn stamp_file_times(path: &Path, timestamp: Option<DateTime<Local>>) {
    let time = timestamp.map(SystemTime::from).unwrap_or_else(SystemTime::now);
    let times = FileTimes::new().set_accessed(time).set_modified(time);

    let stamped = File::options()
        .write(true)
        .open(path)
        .and_then(|file| file.set_times(times));
    if let Err(e) = stamped {
        warn!("Could not update file times on {}: {}", path.display(), e);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::core::format::SupportedFormats;
    use crate::core::transcoder::tests::{fake_ffmpeg, invocations};
    use crate::core::transcoder::TranscoderSettings;
    use crate::download::source::DownloadResult;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::TempDir;

    /// Writes the configured files into the download directory
    struct FakeSource {
        files: Vec<&'static str>,
        playlist: bool,
    }

    #[async_trait]
    impl MediaSource for FakeSource {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn fetch(
            &self,
            _request: &DownloadRequest,
            download_dir: &Path,
        ) -> Result<DownloadResult, MediaToolError> {
            let mut items = Vec::new();
            for name in &self.files {
                let path = download_dir.join(name);
                fs::write(&path, b"media")?;
                items.push(DownloadedItem::new(path));
            }
            Ok(DownloadResult {
                items,
                playlist: self.playlist,
            })
        }
    }

    async fn downloader(
        temp: &TempDir,
        files: Vec<&'static str>,
        playlist: bool,
        ffmpeg_ok: bool,
    ) -> (Downloader, PathBuf) {
        let (ffmpeg, log) = fake_ffmpeg(temp.path(), ffmpeg_ok);
        (with_ffmpeg(temp, files, playlist, ffmpeg).await, log)
    }

    async fn with_ffmpeg(
        temp: &TempDir,
        files: Vec<&'static str>,
        playlist: bool,
        ffmpeg: PathBuf,
    ) -> Downloader {
        let settings = TranscoderSettings::new(ffmpeg).with_output_dir(temp.path().join("out"));
        let transcoder = Transcoder::new(settings, Arc::new(SupportedFormats::fallback()))
            .await
            .unwrap();
        Downloader::new(
            Arc::new(FakeSource { files, playlist }),
            Arc::new(transcoder),
            temp.path().join("dl"),
        )
    }

    /// ffmpeg stand-in that writes its output, then runs `after_input` on its
    /// input path (`$4` after `-hide_banner -y -i`)
    fn ffmpeg_touching_input(dir: &Path, after_input: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("ffmpeg-touching-input");
        fs::write(
            &script,
            format!(
                "#!/bin/sh\nif [ \"$1\" = \"-version\" ]; then exit 0; fi\n\
                 for last; do :; done\necho converted > \"$last\"\n{}\nexit 0\n",
                after_input
            ),
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    #[tokio::test]
    async fn test_intermediate_already_gone_is_tolerated() {
        let temp = TempDir::new().unwrap();
        let ffmpeg = ffmpeg_touching_input(temp.path(), "rm -f \"$4\"");
        let downloader = with_ffmpeg(&temp, vec!["Clip.webm"], false, ffmpeg).await;

        let outcome = downloader
            .download("https://youtu.be/x", Some("mp3"))
            .await
            .unwrap();

        let expected = temp.path().join("out").join("Clip.mp3");
        assert_eq!(outcome, DownloadOutcome::Single(expected.clone()));
        assert!(expected.is_file());
        assert!(!temp.path().join("dl").join("Clip.webm").exists());
    }

    #[tokio::test]
    async fn test_undeletable_intermediate_still_returns_converted() {
        let temp = TempDir::new().unwrap();
        // A directory in place of the intermediate makes remove_file fail
        let ffmpeg = ffmpeg_touching_input(temp.path(), "rm -f \"$4\"\nmkdir \"$4\"");
        let downloader = with_ffmpeg(&temp, vec!["Clip.webm"], false, ffmpeg).await;

        let outcome = downloader
            .download("https://youtu.be/x", Some("mp3"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            DownloadOutcome::Single(temp.path().join("out").join("Clip.mp3"))
        );
        assert!(temp.path().join("dl").join("Clip.webm").is_dir());
    }

    #[tokio::test]
    async fn test_matching_format_is_not_transcoded() {
        let temp = TempDir::new().unwrap();
        let (downloader, log) = downloader(&temp, vec!["Clip.MP4"], false, true).await;

        let outcome = downloader.download("https://youtu.be/x", None).await.unwrap();

        assert_eq!(
            outcome,
            DownloadOutcome::Single(temp.path().join("dl").join("Clip.MP4"))
        );
        assert_eq!(invocations(&log), vec!["-version".to_string()]);
    }

    #[tokio::test]
    async fn test_mismatched_format_is_converted_and_intermediate_removed() {
        let temp = TempDir::new().unwrap();
        let (downloader, _log) = downloader(&temp, vec!["Clip.webm"], false, true).await;

        let outcome = downloader
            .download("https://youtu.be/x", Some("mp3"))
            .await
            .unwrap();

        let expected = temp.path().join("out").join("Clip.mp3");
        assert_eq!(outcome, DownloadOutcome::Single(expected.clone()));
        assert!(expected.is_file());
        assert!(!temp.path().join("dl").join("Clip.webm").exists());
    }

    #[tokio::test]
    async fn test_playlist_returns_every_item() {
        let temp = TempDir::new().unwrap();
        let (downloader, _log) =
            downloader(&temp, vec!["One.mp4", "Two.webm", "Three.mp4"], true, true).await;

        let paths = downloader
            .download("https://youtube.com/playlist?list=PL1", Some("mp4"))
            .await
            .unwrap()
            .into_paths();

        assert_eq!(
            paths,
            vec![
                temp.path().join("dl").join("One.mp4"),
                temp.path().join("out").join("Two.mp4"),
                temp.path().join("dl").join("Three.mp4"),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_conversion_keeps_intermediate() {
        let temp = TempDir::new().unwrap();
        let (downloader, _log) = downloader(&temp, vec!["Clip.webm"], false, false).await;

        let err = downloader
            .download("https://youtu.be/x", Some("mp3"))
            .await
            .unwrap_err();

        assert!(err.is_process_failure());
        assert!(temp.path().join("dl").join("Clip.webm").is_file());
        assert!(!temp.path().join("out").join("Clip.mp3").exists());
    }

    #[tokio::test]
    async fn test_unsupported_format_rejected_before_fetch() {
        let temp = TempDir::new().unwrap();
        let (downloader, _log) = downloader(&temp, vec!["Clip.mp4"], false, true).await;

        let err = downloader
            .download("https://youtu.be/x", Some("zzz"))
            .await
            .unwrap_err();

        assert!(matches!(err, MediaToolError::UnsupportedFormat(_)));
        assert!(!temp.path().join("dl").exists());
    }

    #[tokio::test]
    async fn test_files_are_stamped() {
        let temp = TempDir::new().unwrap();
        let (downloader, _log) = downloader(&temp, vec!["Clip.mp4"], false, true).await;
        let stamp = Local.with_ymd_and_hms(2021, 3, 4, 5, 6, 7).single().unwrap();
        let downloader = downloader.with_timestamp(stamp);

        let path = match downloader.download("https://youtu.be/x", None).await.unwrap() {
            DownloadOutcome::Single(path) => path,
            other => panic!("unexpected outcome {:?}", other),
        };

        let modified = fs::metadata(&path).unwrap().modified().unwrap();
        assert_eq!(modified, SystemTime::from(stamp));
    }

    #[test]
    fn test_stamp_missing_file_is_ignored() {
        stamp_file_times(Path::new("/nonexistent/file.mp4"), None);
    }
}
