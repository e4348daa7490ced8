//! ffmpeg-backed conversion of local media files

use crate::core::format::{ensure_available, FormatCategory, FormatSpec, SupportedFormats};
use crate::error::MediaToolError;
use crate::utils::process::run_tool;
use std::ffi::OsString;
use std::fs::Metadata;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where converted files are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputPlacement {
    /// Into a fixed directory (normally the configured output directory)
    OutputDir(PathBuf),
    /// Next to the input file
    BesideInput,
}

/// Transcoder configuration
#[derive(Debug, Clone)]
pub struct TranscoderSettings {
    /// ffmpeg binary
    pub ffmpeg: PathBuf,
    /// Output location policy
    pub placement: OutputPlacement,
    /// Reject inputs whose own extension is not a supported format
    pub strict_input: bool,
}

impl TranscoderSettings {
    pub fn new(ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            placement: OutputPlacement::BesideInput,
            strict_input: true,
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.placement = OutputPlacement::OutputDir(dir.into());
        self
    }

    pub fn with_placement(mut self, placement: OutputPlacement) -> Self {
        self.placement = placement;
        self
    }

    pub fn with_strict_input(mut self, strict: bool) -> Self {
        self.strict_input = strict;
        self
    }
}

impl Default for TranscoderSettings {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

/// A single pending conversion of `input` into `format`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionJob {
    pub input: PathBuf,
    pub format: FormatSpec,
}

impl ConversionJob {
    pub fn new(input: impl Into<PathBuf>, format: FormatSpec) -> Self {
        Self {
            input: input.into(),
            format,
        }
    }
}

/// Wraps one ffmpeg invocation per conversion
#[derive(Debug, Clone)]
pub struct Transcoder {
    settings: TranscoderSettings,
    formats: Arc<SupportedFormats>,
}

impl Transcoder {
    /// Create a transcoder, failing with an environment error when ffmpeg is unusable
    pub async fn new(
        settings: TranscoderSettings,
        formats: Arc<SupportedFormats>,
    ) -> Result<Self, MediaToolError> {
        ensure_available(&settings.ffmpeg).await?;
        Ok(Self { settings, formats })
    }

    pub fn formats(&self) -> &SupportedFormats {
        &self.formats
    }

    /// Where `input` ends up once converted to `format`
    pub fn output_path(&self, input: &Path, format: &FormatSpec) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_os_string())
            .unwrap_or_else(|| OsString::from("output"));
        let mut file_name = stem;
        file_name.push(".");
        file_name.push(format.ext());

        match &self.settings.placement {
            OutputPlacement::OutputDir(dir) => dir.join(file_name),
            OutputPlacement::BesideInput => input
                .parent()
                .map(|p| p.join(&file_name))
                .unwrap_or_else(|| PathBuf::from(&file_name)),
        }
    }

    /// Convert `input` to `format` and return the new file's path.
    ///
    /// The input is never deleted here; callers that own an intermediate file
    /// remove it themselves once this succeeds.
    pub async fn convert(&self, input: &Path, format: &str) -> Result<PathBuf, MediaToolError> {
        let format = self.formats.resolve(format)?;

        if !input.is_file() {
            return Err(MediaToolError::FileNotFound(input.to_path_buf()));
        }

        if self.settings.strict_input {
            let input_ext = input
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or_default();
            if !self.formats.contains(input_ext) {
                return Err(MediaToolError::UnsupportedFormat(format!(
                    "input {}",
                    input.display()
                )));
            }
        }

        self.run(&ConversionJob::new(input, format)).await
    }

    /// Execute an already validated job
    pub async fn run(&self, job: &ConversionJob) -> Result<PathBuf, MediaToolError> {
        let output = self.output_path(&job.input, &job.format);

        if is_same_file(&job.input, &output) {
            info!(
                "{} is already {}, nothing to convert",
                job.input.display(),
                job.format
            );
            return Ok(job.input.clone());
        }

        remove_if_exists(&output).await?;
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        info!("Converting {} -> {}", job.input.display(), output.display());
        let args = build_args(&job.input, &output, &job.format);
        let result = run_tool("ffmpeg", &self.settings.ffmpeg, &args)
            .await
            .and_then(|o| o.check("ffmpeg"));

        match result {
            Ok(_) if output.is_file() => {
                debug!("ffmpeg wrote {}", output.display());
                Ok(output)
            }
            Ok(out) => Err(MediaToolError::ProcessFailed {
                tool: "ffmpeg".to_string(),
                code: out.status.code(),
                log: format!("no output written to {}\n{}", output.display(), out.combined_log()),
            }),
            Err(e) => {
                if let Err(cleanup) = remove_if_exists(&output).await {
                    warn!("Could not remove partial output {}: {}", output.display(), cleanup);
                }
                Err(e)
            }
        }
    }
}

/// ffmpeg arguments for converting `input` into `output` as `format`
pub fn build_args(input: &Path, output: &Path, format: &FormatSpec) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-hide_banner", "-y", "-i"].iter().map(OsString::from).collect();
    args.push(input.as_os_str().to_os_string());

    let codec: &[&str] = match format.category() {
        FormatCategory::AudioOnly => {
            args.push("-vn".into());
            audio_codec_args(format.ext())
        }
        FormatCategory::VideoContainer if format.ext() == "webm" => &[
            "-c:v", "libvpx-vp9", "-crf", "32", "-b:v", "0", "-c:a", "libopus", "-b:a", "128k",
        ],
        FormatCategory::VideoContainer => &[
            "-c:v", "libx264", "-preset", "medium", "-crf", "23", "-c:a", "aac", "-b:a", "192k",
            "-movflags", "+faststart",
        ],
        FormatCategory::PassThrough => &["-c", "copy"],
    };
    args.extend(codec.iter().map(OsString::from));

    args.push(output.as_os_str().to_os_string());
    args
}

fn audio_codec_args(ext: &str) -> &'static [&'static str] {
    match ext {
        "mp3" => &["-c:a", "libmp3lame", "-q:a", "2"],
        "aac" | "m4a" => &["-c:a", "aac", "-b:a", "192k"],
        "ogg" => &["-c:a", "libvorbis", "-q:a", "5"],
        "opus" => &["-c:a", "libopus", "-b:a", "128k"],
        "flac" => &["-c:a", "flac"],
        "wav" => &["-c:a", "pcm_s16le"],
        _ => &[],
    }
}

/// Whether writing `output` would clobber `input`: the same path, or an
/// existing file that is the input under another spelling (case-insensitive
/// filesystems, links)
fn is_same_file(input: &Path, output: &Path) -> bool {
    if same_location(input, output) {
        return true;
    }
    match (std::fs::metadata(input), std::fs::metadata(output)) {
        (Ok(a), Ok(b)) => same_identity(&a, &b, input, output),
        _ => false,
    }
}

#[cfg(unix)]
fn same_identity(a: &Metadata, b: &Metadata, _input: &Path, _output: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    a.dev() == b.dev() && a.ino() == b.ino()
}

#[cfg(not(unix))]
fn same_identity(a: &Metadata, b: &Metadata, input: &Path, output: &Path) -> bool {
    if a.len() != b.len() {
        return false;
    }
    match (input.canonicalize(), output.canonicalize()) {
        (Ok(a), Ok(b)) => a.to_string_lossy().to_lowercase() == b.to_string_lossy().to_lowercase(),
        _ => false,
    }
}

fn same_location(input: &Path, output: &Path) -> bool {
    let Ok(input) = input.canonicalize() else {
        return false;
    };
    let (Some(parent), Some(name)) = (output.parent(), output.file_name()) else {
        return false;
    };
    let parent = if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    };
    parent
        .canonicalize()
        .map(|p| p.join(name) == input)
        .unwrap_or(false)
}

async fn remove_if_exists(path: &Path) -> Result<(), MediaToolError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
