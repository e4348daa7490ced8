//! Output formatting and progress display

use crate::cli::args::VerbosityLevel;
use crate::core::pipeline::{BatchEvent, BatchReport};
use crate::core::preferences::{PreferenceKey, Preferences};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

/// Output formatter for media-tool
pub struct OutputFormatter {
    verbosity: VerbosityLevel,
    spinner: Mutex<Option<ProgressBar>>,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            spinner: Mutex::new(None),
        }
    }

    /// Show a spinner while an item is processed
    pub fn start_spinner(&self, message: &str) {
        if self.verbosity == VerbosityLevel::Quiet {
            return;
        }

        let style = ProgressStyle::with_template("{spinner:.green} [{elapsed}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style);
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(120));

        if let Ok(mut slot) = self.spinner.lock() {
            if let Some(previous) = slot.replace(spinner) {
                previous.finish_and_clear();
            }
        }
    }

    /// Remove the spinner, if any
    pub fn stop_spinner(&self) {
        if let Ok(mut slot) = self.spinner.lock() {
            if let Some(spinner) = slot.take() {
                spinner.finish_and_clear();
            }
        }
    }

    /// Print info message
    pub fn info(&self, message: &str) {
        if self.verbosity != VerbosityLevel::Quiet {
            println!("ℹ️  {}", message);
        }
    }

    /// Print success message
    pub fn success(&self, message: &str) {
        if self.verbosity != VerbosityLevel::Quiet {
            println!("✅ {}", message);
        }
    }

    /// Print warning message
    pub fn warning(&self, message: &str) {
        if self.verbosity != VerbosityLevel::Quiet {
            eprintln!("⚠️  {}", message.yellow());
        }
    }

    /// Print error message
    pub fn error(&self, message: &str) {
        eprintln!("❌ {}", message.red());
    }

    /// Print debug message
    pub fn debug(&self, message: &str) {
        if self.verbosity == VerbosityLevel::Verbose {
            println!("🐛 {}", message.dimmed());
        }
    }

    /// Render one batch progress event
    pub fn handle_event(&self, event: &BatchEvent) {
        match event {
            BatchEvent::Started { index, total, item } => {
                self.debug(&format!("Starting {}", item));
                self.start_spinner(&format!("[{}/{}] {}", index + 1, total, item));
            }
            BatchEvent::Succeeded(success) => {
                self.stop_spinner();
                for path in &success.paths {
                    self.success(&format!("{}", path.display().to_string().bold()));
                }
                if success.paths.is_empty() {
                    self.warning(&format!("{} produced no files", success.item));
                }
            }
            BatchEvent::Failed(failure) => {
                self.stop_spinner();
                self.error(&format!("{}: {}", failure.item, failure.error));
            }
        }
    }

    /// Print the closing summary line of a batch
    pub fn print_batch_summary(&self, verb: &str, report: &BatchReport, elapsed: Duration) {
        if self.verbosity == VerbosityLevel::Quiet && !report.has_failures() {
            return;
        }

        println!();
        let line = summary_line(verb, report, elapsed);
        if report.has_failures() {
            println!("📊 {}", line.yellow());
        } else {
            println!("📊 {}", line.green());
        }
    }

    /// Print the current preferences
    pub fn print_preferences(&self, preferences: &Preferences) {
        if self.verbosity == VerbosityLevel::Quiet {
            return;
        }

        for key in PreferenceKey::ALL {
            println!("  {:<16} {}", key.as_str().cyan(), preferences.get(key));
        }
        println!();
    }
}

/// e.g. "Converted 2 of 3 item(s) in 4s, 1 failed"
pub fn summary_line(verb: &str, report: &BatchReport, elapsed: Duration) -> String {
    let mut line = format!(
        "{} {} of {} item(s) in {}",
        verb,
        report.successes.len(),
        report.total(),
        format_elapsed(elapsed)
    );
    if report.has_failures() {
        line.push_str(&format!(", {} failed", report.failures.len()));
    }
    line
}

/// Elapsed time rounded down to whole seconds
pub fn format_elapsed(duration: Duration) -> String {
    humantime::format_duration(Duration::from_secs(duration.as_secs())).to_string()
}
