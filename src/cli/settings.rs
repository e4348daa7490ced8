//! Interactive preference editor

use crate::core::format::SupportedFormats;
use crate::core::preferences::{LogLevel, PreferenceKey, Preferences};
use crate::error::MediaToolError;
use std::io::{BufRead, Write};

/// Prompt for every preference, then re-prompt the invalid ones until all
/// values validate. A blank answer keeps the current value.
pub fn edit_preferences<R, W>(
    current: &Preferences,
    formats: &SupportedFormats,
    input: &mut R,
    output: &mut W,
) -> Result<Preferences, MediaToolError>
where
    R: BufRead,
    W: Write,
{
    let mut edited = current.clone();
    let mut keys = PreferenceKey::ALL.to_vec();

    loop {
        for key in &keys {
            if let Some(answer) = prompt(*key, &edited, formats, input, output)? {
                edited.set(*key, &answer);
            }
        }

        keys = edited.invalid_keys(formats);
        if keys.is_empty() {
            return Ok(edited);
        }

        let names: Vec<&str> = keys.iter().map(|k| k.as_str()).collect();
        writeln!(output, "Invalid config values: {}", names.join(", "))?;
    }
}

/// Ask for one value; `None` when the answer is blank
fn prompt<R, W>(
    key: PreferenceKey,
    preferences: &Preferences,
    formats: &SupportedFormats,
    input: &mut R,
    output: &mut W,
) -> Result<Option<String>, MediaToolError>
where
    R: BufRead,
    W: Write,
{
    write!(output, "{} [{}]{}: ", key, preferences.get(key), hint(key, formats))?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(MediaToolError::Generic(
            "input closed before preferences were valid".to_string(),
        ));
    }

    let answer = line.trim();
    Ok((!answer.is_empty()).then(|| answer.to_string()))
}

fn hint(key: PreferenceKey, formats: &SupportedFormats) -> String {
    match key {
        PreferenceKey::DefaultFormat => {
            format!(" ({})", formats.iter().collect::<Vec<_>>().join(" "))
        }
        PreferenceKey::LogLevel => {
            let levels: Vec<&str> = LogLevel::ALL.iter().map(|l| l.as_str()).collect();
            format!(" ({})", levels.join(" "))
        }
        PreferenceKey::OutputDir | PreferenceKey::DownloadDir => String::new(),
    }
}
