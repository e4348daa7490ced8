//! Main entry point for the media-tool CLI

use anyhow::Context;
use clap::Parser;
use media_tool::cli::settings::edit_preferences;
use media_tool::cli::{Args, Command, OutputFormatter, VerbosityLevel};
use media_tool::core::format::{ensure_available, init_supported_formats};
use media_tool::{BatchReport, Pipeline, Preferences, SupportedFormats, Transcoder};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Parse command line arguments
    let args = Args::parse();

    let config_path = args.config_path();
    let preferences = Preferences::load(&config_path)
        .with_context(|| format!("Failed to read preferences from {}", config_path.display()))?;

    // Initialize logging
    init_logging(&preferences, args.verbosity_level())?;
    info!("Starting media-tool with args: {:?}", args);

    let formatter = OutputFormatter::new(args.verbosity_level());

    if let Err(e) = ensure_available(&args.ffmpeg).await {
        formatter.error(&e.to_string());
        return Ok(ExitCode::FAILURE);
    }
    let formats = init_supported_formats(&args.ffmpeg).await;
    debug!(
        "{} supported formats ({})",
        formats.len(),
        if formats.is_probed() { "probed" } else { "fallback" }
    );

    match args.command.clone() {
        Command::Settings => run_settings(&config_path, &preferences, &formats, &formatter),
        Command::Convert { inputs, format } => {
            let Some(pipeline) = build_pipeline(&args, preferences, formats, &formatter).await?
            else {
                return Ok(ExitCode::FAILURE);
            };
            Ok(run_convert(&pipeline, &inputs, format.as_deref(), &formatter).await)
        }
        Command::Download { urls, format } => {
            let Some(pipeline) = build_pipeline(&args, preferences, formats, &formatter).await?
            else {
                return Ok(ExitCode::FAILURE);
            };
            Ok(run_download(&pipeline, &urls, format.as_deref(), &formatter).await)
        }
    }
}

/// Validate preferences and wire up the transcoder and sources.
/// Returns `None` after reporting invalid preferences.
async fn build_pipeline(
    args: &Args,
    preferences: Preferences,
    formats: Arc<SupportedFormats>,
    formatter: &OutputFormatter,
) -> anyhow::Result<Option<Pipeline>> {
    if let Err(e) = preferences.validate(&formats) {
        formatter.error(&e.to_string());
        formatter.info("Run `media-tool settings` to fix them");
        return Ok(None);
    }

    let transcoder = Transcoder::new(args.transcoder_settings(&preferences), formats)
        .await
        .context("Failed to set up ffmpeg")?;
    Ok(Some(Pipeline::new(
        preferences,
        Arc::new(transcoder),
        args.ytdlp(),
    )))
}

async fn run_convert(
    pipeline: &Pipeline,
    inputs: &[PathBuf],
    format: Option<&str>,
    formatter: &OutputFormatter,
) -> ExitCode {
    let start_time = Instant::now();
    let report = pipeline
        .convert_batch_with(inputs, format, |event| formatter.handle_event(&event))
        .await;
    finish("Converted", &report, start_time, formatter)
}

async fn run_download(
    pipeline: &Pipeline,
    urls: &[String],
    format: Option<&str>,
    formatter: &OutputFormatter,
) -> ExitCode {
    let start_time = Instant::now();
    let report = pipeline
        .download_batch_with(urls, format, |event| formatter.handle_event(&event))
        .await;
    finish("Downloaded", &report, start_time, formatter)
}

fn finish(
    verb: &str,
    report: &BatchReport,
    start_time: Instant,
    formatter: &OutputFormatter,
) -> ExitCode {
    formatter.stop_spinner();
    formatter.print_batch_summary(verb, report, start_time.elapsed());
    if report.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run_settings(
    config_path: &Path,
    preferences: &Preferences,
    formats: &SupportedFormats,
    formatter: &OutputFormatter,
) -> anyhow::Result<ExitCode> {
    formatter.info(&format!("Preferences file: {}", config_path.display()));
    formatter.print_preferences(preferences);

    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut output = std::io::stdout();
    let edited = edit_preferences(preferences, formats, &mut input, &mut output)?;

    edited
        .save(config_path, formats)
        .with_context(|| format!("Failed to save preferences to {}", config_path.display()))?;
    formatter.success(&format!("Saved {}", config_path.display()));
    Ok(ExitCode::SUCCESS)
}

/// Initialize logging system: `RUST_LOG` wins, then the verbosity flags,
/// then LOG_LEVEL from preferences
fn init_logging(preferences: &Preferences, verbosity: VerbosityLevel) -> anyhow::Result<()> {
    let default_level = match verbosity {
        VerbosityLevel::Verbose => "debug",
        VerbosityLevel::Quiet => "error",
        VerbosityLevel::Normal => preferences.log_level().as_filter(),
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(())
}
