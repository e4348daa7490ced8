//! niconico source

use crate::download::source::{DownloadRequest, DownloadResult, MediaSource, SourceKind};
use crate::download::ytdlp::{FormatSelection, YtDlp};
use crate::error::MediaToolError;
use async_trait::async_trait;
use std::path::Path;

/// Alternate source for nicovideo.jp and nico.ms; the site serves a single
/// container so selection never filters on extension
#[derive(Debug, Clone, Default)]
pub struct NicoNicoSource {
    ytdlp: YtDlp,
}

impl NicoNicoSource {
    pub fn new(ytdlp: YtDlp) -> Self {
        Self { ytdlp }
    }
}

#[async_trait]
impl MediaSource for NicoNicoSource {
    fn name(&self) -> &'static str {
        SourceKind::NicoNico.as_str()
    }

    async fn fetch(
        &self,
        request: &DownloadRequest,
        download_dir: &Path,
    ) -> Result<DownloadResult, MediaToolError> {
        let selection = FormatSelection::for_format(SourceKind::NicoNico, &request.format);
        self.ytdlp
            .download(&request.url, download_dir, &selection, &[])
            .await
    }
}
