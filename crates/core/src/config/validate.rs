use std::collections::HashSet;

use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Engine timeout is not 0
/// - Admission size bounds are ordered
/// - Format lists hold non-empty, uppercase, unique tokens and share none
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.engine.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "engine.timeout_secs cannot be 0".to_string(),
        ));
    }

    let admission = &config.session.admission;
    if let (Some(min), Some(max)) = (admission.min_size_bytes, admission.max_size_bytes) {
        if min > max {
            return Err(ConfigError::ValidationError(format!(
                "session.admission.min_size_bytes ({}) exceeds max_size_bytes ({})",
                min, max
            )));
        }
    }

    let audio = check_format_list("formats.audio", &config.formats.audio)?;
    let video = check_format_list("formats.video", &config.formats.video)?;
    if let Some(shared) = audio.intersection(&video).next() {
        return Err(ConfigError::ValidationError(format!(
            "format {} is listed as both audio and video",
            shared
        )));
    }

    Ok(())
}

fn check_format_list<'a>(
    field: &str,
    formats: &'a [String],
) -> Result<HashSet<&'a str>, ConfigError> {
    let mut seen = HashSet::new();
    for format in formats {
        if format.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{} contains an empty format",
                field
            )));
        }
        if *format != format.to_uppercase() {
            return Err(ConfigError::ValidationError(format!(
                "{} entry {} must be uppercase",
                field, format
            )));
        }
        if !seen.insert(format.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "{} lists {} twice",
                field, format
            )));
        }
    }
    Ok(seen)
}
