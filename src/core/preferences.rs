//! User preferences persisted as a flat JSON object

use crate::core::format::{normalize_ext, SupportedFormats};
use crate::error::MediaToolError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// Log verbosity stored in the preferences file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub const ALL: [LogLevel; 4] = [
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warning,
        LogLevel::Error,
    ];

    /// Spelling used in the preferences file
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }

    /// Directive understood by `tracing_subscriber::EnvFilter`
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = MediaToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LogLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == s.trim())
            .ok_or_else(|| MediaToolError::InvalidLogLevel(s.to_string()))
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four recognized keys of the preferences file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceKey {
    OutputDir,
    DownloadDir,
    DefaultFormat,
    LogLevel,
}

impl PreferenceKey {
    pub const ALL: [PreferenceKey; 4] = [
        PreferenceKey::OutputDir,
        PreferenceKey::DownloadDir,
        PreferenceKey::DefaultFormat,
        PreferenceKey::LogLevel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PreferenceKey::OutputDir => "OUTPUT_DIR",
            PreferenceKey::DownloadDir => "DOWNLOAD_DIR",
            PreferenceKey::DefaultFormat => "DEFAULT_FORMAT",
            PreferenceKey::LogLevel => "LOG_LEVEL",
        }
    }
}

impl fmt::Display for PreferenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-editable defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Where converted files are written
    #[serde(rename = "OUTPUT_DIR")]
    pub output_dir: PathBuf,
    /// Where downloads are saved
    #[serde(rename = "DOWNLOAD_DIR")]
    pub download_dir: PathBuf,
    /// Format used by `convert` when none is given
    #[serde(rename = "DEFAULT_FORMAT")]
    pub default_format: String,
    /// One of DEBUG, INFO, WARNING, ERROR
    #[serde(rename = "LOG_LEVEL")]
    pub log_level: String,
}

impl Default for Preferences {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            output_dir: dirs::document_dir().unwrap_or_else(|| home.clone()),
            download_dir: dirs::download_dir().unwrap_or(home),
            default_format: "mp3".to_string(),
            log_level: LogLevel::default().as_str().to_string(),
        }
    }
}

impl Preferences {
    /// `<config dir>/media-tool/config.json`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join("media-tool"))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.json")
    }

    /// Load preferences from `path`; a missing file yields the defaults.
    ///
    /// Unknown keys are ignored and absent keys keep their default value.
    /// No validation happens here, see [`Preferences::validate`].
    pub fn load(path: &Path) -> Result<Self, MediaToolError> {
        if !path.exists() {
            debug!("No preferences at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let prefs = serde_json::from_str(&contents)?;
        debug!("Loaded preferences from {}", path.display());
        Ok(prefs)
    }

    /// Validate and write the preferences as pretty-printed JSON
    pub fn save(&self, path: &Path, formats: &SupportedFormats) -> Result<(), MediaToolError> {
        self.validate(formats)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        std::fs::write(path, json)?;
        info!("Saved preferences to {}", path.display());
        Ok(())
    }

    /// Every key whose value is currently invalid, in file order
    pub fn invalid_keys(&self, formats: &SupportedFormats) -> Vec<PreferenceKey> {
        PreferenceKey::ALL
            .into_iter()
            .filter(|key| match key {
                PreferenceKey::OutputDir => !self.output_dir.is_dir(),
                PreferenceKey::DownloadDir => !self.download_dir.is_dir(),
                PreferenceKey::DefaultFormat => {
                    normalize_ext(&self.default_format) != self.default_format
                        || !formats.contains(&self.default_format)
                }
                PreferenceKey::LogLevel => self.log_level.parse::<LogLevel>().is_err(),
            })
            .collect()
    }

    /// Fail listing every offending key
    pub fn validate(&self, formats: &SupportedFormats) -> Result<(), MediaToolError> {
        let invalid = self.invalid_keys(formats);
        if invalid.is_empty() {
            Ok(())
        } else {
            Err(MediaToolError::InvalidPreferences(
                invalid.iter().map(|k| k.as_str().to_string()).collect(),
            ))
        }
    }

    /// Parsed log level, `INFO` when the stored value is invalid
    pub fn log_level(&self) -> LogLevel {
        self.log_level.parse().unwrap_or_default()
    }

    /// Current value of `key` as text
    pub fn get(&self, key: PreferenceKey) -> String {
        match key {
            PreferenceKey::OutputDir => self.output_dir.display().to_string(),
            PreferenceKey::DownloadDir => self.download_dir.display().to_string(),
            PreferenceKey::DefaultFormat => self.default_format.clone(),
            PreferenceKey::LogLevel => self.log_level.clone(),
        }
    }

    /// Replace the value of `key` without validating it
    pub fn set(&mut self, key: PreferenceKey, value: &str) {
        let value = value.trim();
        match key {
            PreferenceKey::OutputDir => self.output_dir = expand_home(value),
            PreferenceKey::DownloadDir => self.download_dir = expand_home(value),
            PreferenceKey::DefaultFormat => self.default_format = normalize_ext(value),
            PreferenceKey::LogLevel => self.log_level = value.to_uppercase(),
        }
    }
}

fn expand_home(value: &str) -> PathBuf {
    match (value.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ if value == "~" => dirs::home_dir().unwrap_or_else(|| PathBuf::from(value)),
        _ => PathBuf::from(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn valid_prefs(dir: &Path) -> Preferences {
        Preferences {
            output_dir: dir.to_path_buf(),
            download_dir: dir.to_path_buf(),
            default_format: "mp3".to_string(),
            log_level: "INFO".to_string(),
        }
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert!("VERBOSE".parse::<LogLevel>().is_err());
        assert!("info".parse::<LogLevel>().is_err());
        assert_eq!(LogLevel::Warning.as_filter(), "warn");
    }

    #[test]
    fn test_defaults() {
        let prefs = Preferences::default();
        assert_eq!(prefs.default_format, "mp3");
        assert_eq!(prefs.log_level, "INFO");
        assert_eq!(prefs.log_level(), LogLevel::Info);
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = Preferences::load(&dir.path().join("config.json")).unwrap();
        assert_eq!(prefs, Preferences::default());
    }

    #[test]
    fn test_load_ignores_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"DEFAULT_FORMAT": "mkv", "BASE_DIR": "/somewhere", "THEME": "dark"}"#,
        )
        .unwrap();

        let prefs = Preferences::load(&path).unwrap();
        assert_eq!(prefs.default_format, "mkv");
        assert_eq!(prefs.log_level, "INFO");
    }

    #[test]
    fn test_validate_rejects_unknown_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let json = serde_json::json!({
            "OUTPUT_DIR": dir.path(),
            "DOWNLOAD_DIR": dir.path(),
            "DEFAULT_FORMAT": "zzz",
            "LOG_LEVEL": "INFO",
        });
        fs::write(&path, json.to_string()).unwrap();

        let prefs = Preferences::load(&path).unwrap();
        let err = prefs.validate(&SupportedFormats::fallback()).unwrap_err();
        match err {
            MediaToolError::InvalidPreferences(keys) => assert_eq!(keys, vec!["DEFAULT_FORMAT"]),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_validate_requires_normalized_format() {
        let dir = tempfile::tempdir().unwrap();
        let mut prefs = valid_prefs(dir.path());
        prefs.default_format = ".MP3".to_string();

        assert_eq!(
            prefs.invalid_keys(&SupportedFormats::fallback()),
            vec![PreferenceKey::DefaultFormat]
        );
        assert!(prefs
            .save(&dir.path().join("config.json"), &SupportedFormats::fallback())
            .is_err());

        prefs.set(PreferenceKey::DefaultFormat, ".MP3");
        assert!(prefs.validate(&SupportedFormats::fallback()).is_ok());
    }

    #[test]
    fn test_validate_lists_every_bad_key() {
        let prefs = Preferences {
            output_dir: PathBuf::from("/nonexistent/out"),
            download_dir: PathBuf::from("/nonexistent/dl"),
            default_format: "mp4".to_string(),
            log_level: "LOUD".to_string(),
        };
        assert_eq!(
            prefs.invalid_keys(&SupportedFormats::fallback()),
            vec![
                PreferenceKey::OutputDir,
                PreferenceKey::DownloadDir,
                PreferenceKey::LogLevel
            ]
        );
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let prefs = valid_prefs(dir.path());

        prefs.save(&path, &SupportedFormats::fallback()).unwrap();
        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let keys: Vec<&String> = raw.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 4);
        assert_eq!(raw["DEFAULT_FORMAT"], "mp3");

        assert_eq!(Preferences::load(&path).unwrap(), prefs);
    }

    #[test]
    fn test_save_refuses_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut prefs = valid_prefs(dir.path());
        prefs.default_format = "zzz".to_string();

        assert!(prefs.save(&path, &SupportedFormats::fallback()).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_get_and_set() {
        let dir = tempfile::tempdir().unwrap();
        let mut prefs = valid_prefs(dir.path());

        prefs.set(PreferenceKey::DefaultFormat, " .MKV ");
        prefs.set(PreferenceKey::LogLevel, "debug");
        assert_eq!(prefs.get(PreferenceKey::DefaultFormat), "mkv");
        assert_eq!(prefs.log_level(), LogLevel::Debug);

        prefs.set(PreferenceKey::OutputDir, "/tmp/media");
        assert_eq!(prefs.output_dir, PathBuf::from("/tmp/media"));
    }
}
