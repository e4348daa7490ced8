//! # media-tool
//!
//! Download videos with `yt-dlp` and normalize them to a requested format
//! with `ffmpeg`.
//!
//! ## Features
//!
//! - Supported formats probed from the local ffmpeg build
//! - YouTube and niconico downloads, single videos or playlists
//! - Automatic conversion when the downloaded format differs from the request
//! - Sequential batches that keep going past failed items
//! - Flat JSON preferences with validation
//!
//! ## Example
//!
//! ```rust,no_run
//! use media_tool::core::format::init_supported_formats;
//! use media_tool::download::YtDlp;
//! use media_tool::{Pipeline, Preferences, Transcoder, TranscoderSettings};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let prefs = Preferences::load(&Preferences::default_path())?;
//!     let formats = init_supported_formats(Path::new("ffmpeg")).await;
//!     let settings = TranscoderSettings::new("ffmpeg").with_output_dir(&prefs.output_dir);
//!     let transcoder = Transcoder::new(settings, formats).await?;
//!
//!     let pipeline = Pipeline::new(prefs, Arc::new(transcoder), YtDlp::default());
//!     let report = pipeline
//!         .download_batch(&["https://youtu.be/VIDEO".to_string()], Some("mp3"))
//!         .await;
//!     for path in report.all_paths() {
//!         println!("Saved: {}", path.display());
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod core;
pub mod download;
pub mod error;
pub mod utils;

// Re-export main types
pub use crate::core::{
    BatchReport, FormatCategory, FormatSpec, Pipeline, Preferences, SupportedFormats, Transcoder,
    TranscoderSettings,
};
pub use download::{DownloadOutcome, Downloader, MediaSource};
pub use error::MediaToolError;

/// Result type alias for media-tool operations
pub type Result<T> = std::result::Result<T, MediaToolError>;
