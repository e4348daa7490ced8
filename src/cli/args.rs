//! Command line argument parsing

use crate::core::preferences::Preferences;
use crate::core::transcoder::{OutputPlacement, TranscoderSettings};
use crate::download::ytdlp::YtDlp;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// media-tool - download videos with yt-dlp and convert media with ffmpeg
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Preferences file (defaults to <config dir>/media-tool/config.json)
    #[arg(long, global = true, value_name = "PATH", env = "MEDIA_TOOL_CONFIG")]
    pub config: Option<PathBuf>,

    /// ffmpeg binary
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        env = "MEDIA_TOOL_FFMPEG",
        default_value = "ffmpeg"
    )]
    pub ffmpeg: PathBuf,

    /// yt-dlp binary
    #[arg(
        long = "yt-dlp",
        global = true,
        value_name = "PATH",
        env = "MEDIA_TOOL_YT_DLP",
        default_value = "yt-dlp"
    )]
    pub yt_dlp: PathBuf,

    /// Write converted files next to their input instead of OUTPUT_DIR
    #[arg(long, global = true)]
    pub beside_input: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet output (only errors)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Convert local files to another format
    Convert {
        /// Files to convert
        #[arg(required = true, value_name = "FILE")]
        inputs: Vec<PathBuf>,

        /// Target format (defaults to DEFAULT_FORMAT from preferences)
        #[arg(short, long, value_name = "EXT")]
        format: Option<String>,
    },
    /// Download URLs, converting to the requested format when needed
    Download {
        /// Video or playlist URLs
        #[arg(required = true, value_name = "URL")]
        urls: Vec<String>,

        /// Target format (defaults to mp4)
        #[arg(short, long, value_name = "EXT")]
        format: Option<String>,
    },
    /// Edit the preferences file interactively
    Settings,
}

impl Args {
    /// Preferences file to read and write
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Preferences::default_path)
    }

    /// Transcoder configuration for these flags and preferences
    pub fn transcoder_settings(&self, preferences: &Preferences) -> TranscoderSettings {
        let placement = if self.beside_input {
            OutputPlacement::BesideInput
        } else {
            OutputPlacement::OutputDir(preferences.output_dir.clone())
        };
        TranscoderSettings::new(&self.ffmpeg).with_placement(placement)
    }

    pub fn ytdlp(&self) -> YtDlp {
        YtDlp::new(&self.yt_dlp)
    }

    /// Get output verbosity level
    pub fn verbosity_level(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }
}

/// Output verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerbosityLevel {
    /// Quiet (only errors)
    Quiet,
    /// Normal
    #[default]
    Normal,
    /// Verbose (debug info)
    Verbose,
}
