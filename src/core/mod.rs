//! Core functionality for media-tool

pub mod format;
pub mod pipeline;
pub mod preferences;
pub mod transcoder;

pub use format::{FormatCategory, FormatSpec, SupportedFormats};
pub use pipeline::{BatchEvent, BatchReport, ItemFailure, ItemSuccess, Pipeline};
pub use preferences::{LogLevel, PreferenceKey, Preferences};
pub use transcoder::{ConversionJob, OutputPlacement, Transcoder, TranscoderSettings};
