//! YouTube source, also used for any URL no other source claims

use crate::download::source::{DownloadRequest, DownloadResult, MediaSource, SourceKind};
use crate::download::ytdlp::{FormatSelection, YtDlp};
use crate::error::MediaToolError;
use crate::utils::url::is_youtube_url;
use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

/// Player client forced on every YouTube request
const EXTRACTOR_ARGS: &[&str] = &["--extractor-args", "youtube:player_client=default"];

/// Primary source, driving yt-dlp with ext-filtered format expressions
#[derive(Debug, Clone, Default)]
pub struct YouTubeSource {
    ytdlp: YtDlp,
}

impl YouTubeSource {
    pub fn new(ytdlp: YtDlp) -> Self {
        Self { ytdlp }
    }
}

#[async_trait]
impl MediaSource for YouTubeSource {
    fn name(&self) -> &'static str {
        SourceKind::YouTube.as_str()
    }

    async fn fetch(
        &self,
        request: &DownloadRequest,
        download_dir: &Path,
    ) -> Result<DownloadResult, MediaToolError> {
        if !is_youtube_url(&request.url) {
            debug!("{} is not a YouTube URL, letting yt-dlp pick an extractor", request.url);
        }
        let selection = FormatSelection::for_format(SourceKind::YouTube, &request.format);
        self.ytdlp
            .download(&request.url, download_dir, &selection, EXTRACTOR_ARGS)
            .await
    }
}
