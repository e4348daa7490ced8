//! Sequential batch orchestration for downloads and conversions

use crate::core::preferences::Preferences;
use crate::core::transcoder::Transcoder;
use crate::download::downloader::Downloader;
use crate::download::niconico::NicoNicoSource;
use crate::download::source::{MediaSource, SourceKind};
use crate::download::youtube::YouTubeSource;
use crate::download::ytdlp::YtDlp;
use crate::error::MediaToolError;
use crate::utils::url::parse_media_url;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// An item that produced output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSuccess {
    pub item: String,
    pub paths: Vec<PathBuf>,
}

/// An item that failed, with the rendered error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub item: String,
    pub error: String,
}

/// Outcome of a whole batch, each list in input order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub successes: Vec<ItemSuccess>,
    pub failures: Vec<ItemFailure>,
}

impl BatchReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn total(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    /// Every produced path, flattened
    pub fn all_paths(&self) -> Vec<PathBuf> {
        self.successes
            .iter()
            .flat_map(|s| s.paths.iter().cloned())
            .collect()
    }

    fn record(&mut self, item: &str, result: Result<Vec<PathBuf>, MediaToolError>) -> BatchEvent {
        match result {
            Ok(paths) => {
                let success = ItemSuccess {
                    item: item.to_string(),
                    paths,
                };
                self.successes.push(success.clone());
                BatchEvent::Succeeded(success)
            }
            Err(e) => {
                warn!("{} failed: {}", item, e);
                let failure = ItemFailure {
                    item: item.to_string(),
                    error: e.to_string(),
                };
                self.failures.push(failure.clone());
                BatchEvent::Failed(failure)
            }
        }
    }
}

/// Progress notifications emitted while a batch runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    Started {
        index: usize,
        total: usize,
        item: String,
    },
    Succeeded(ItemSuccess),
    Failed(ItemFailure),
}

/// Runs batches of downloads or conversions one item at a time
pub struct Pipeline {
    preferences: Preferences,
    transcoder: Arc<Transcoder>,
    primary: Arc<dyn MediaSource>,
    alternate: Arc<dyn MediaSource>,
}

impl Pipeline {
    /// YouTube as the primary source and niconico as the alternate, both
    /// driving `ytdlp`
    pub fn new(preferences: Preferences, transcoder: Arc<Transcoder>, ytdlp: YtDlp) -> Self {
        Self {
            preferences,
            transcoder,
            primary: Arc::new(YouTubeSource::new(ytdlp.clone())),
            alternate: Arc::new(NicoNicoSource::new(ytdlp)),
        }
    }

    /// Replace both sources
    pub fn with_sources(
        mut self,
        primary: Arc<dyn MediaSource>,
        alternate: Arc<dyn MediaSource>,
    ) -> Self {
        self.primary = primary;
        self.alternate = alternate;
        self
    }

    /// Source responsible for `url`
    pub fn route_source(&self, url: &str) -> Arc<dyn MediaSource> {
        match SourceKind::for_url(url) {
            SourceKind::NicoNico => Arc::clone(&self.alternate),
            SourceKind::YouTube => Arc::clone(&self.primary),
        }
    }

    /// Download every URL in order, continuing past failures
    pub async fn download_batch(&self, urls: &[String], format: Option<&str>) -> BatchReport {
        self.download_batch_with(urls, format, |_| {}).await
    }

    /// [`Pipeline::download_batch`], reporting progress to `on_event`
    pub async fn download_batch_with<F>(
        &self,
        urls: &[String],
        format: Option<&str>,
        mut on_event: F,
    ) -> BatchReport
    where
        F: FnMut(BatchEvent) + Send,
    {
        info!("Downloading {} URL(s)", urls.len());
        let mut report = BatchReport::default();

        for (index, url) in urls.iter().enumerate() {
            on_event(BatchEvent::Started {
                index,
                total: urls.len(),
                item: url.clone(),
            });
            let result = self.download_one(url, format).await;
            on_event(report.record(url, result));
        }

        info!(
            "Download batch finished: {} succeeded, {} failed",
            report.successes.len(),
            report.failures.len()
        );
        report
    }

    async fn download_one(
        &self,
        url: &str,
        format: Option<&str>,
    ) -> Result<Vec<PathBuf>, MediaToolError> {
        let url = parse_media_url(url)?;
        let downloader = Downloader::new(
            self.route_source(url.as_str()),
            Arc::clone(&self.transcoder),
            &self.preferences.download_dir,
        );
        Ok(downloader.download(url.as_str(), format).await?.into_paths())
    }

    /// Convert every file in order, continuing past failures. `format`
    /// defaults to the preferences' default format.
    pub async fn convert_batch(&self, inputs: &[PathBuf], format: Option<&str>) -> BatchReport {
        self.convert_batch_with(inputs, format, |_| {}).await
    }

    /// [`Pipeline::convert_batch`], reporting progress to `on_event`
    pub async fn convert_batch_with<F>(
        &self,
        inputs: &[PathBuf],
        format: Option<&str>,
        mut on_event: F,
    ) -> BatchReport
    where
        F: FnMut(BatchEvent) + Send,
    {
        let format = format.unwrap_or(self.preferences.default_format.as_str());
        info!("Converting {} file(s) to {}", inputs.len(), format);
        let mut report = BatchReport::default();

        for (index, input) in inputs.iter().enumerate() {
            let item = input.display().to_string();
            on_event(BatchEvent::Started {
                index,
                total: inputs.len(),
                item: item.clone(),
            });
            let result = self.convert_one(input, format).await;
            on_event(report.record(&item, result));
        }

        info!(
            "Convert batch finished: {} succeeded, {} failed",
            report.successes.len(),
            report.failures.len()
        );
        report
    }

    async fn convert_one(&self, input: &Path, format: &str) -> Result<Vec<PathBuf>, MediaToolError> {
        Ok(vec![self.transcoder.convert(input, format).await?])
    }

    /// Run a download batch on a background task
    pub fn spawn_download_batch(
        self: Arc<Self>,
        urls: Vec<String>,
        format: Option<String>,
    ) -> JoinHandle<BatchReport> {
        tokio::spawn(async move { self.download_batch(&urls, format.as_deref()).await })
    }

    /// Run a convert batch on a background task
    pub fn spawn_convert_batch(
        self: Arc<Self>,
        inputs: Vec<PathBuf>,
        format: Option<String>,
    ) -> JoinHandle<BatchReport> {
        tokio::spawn(async move { self.convert_batch(&inputs, format.as_deref()).await })
    }
}
