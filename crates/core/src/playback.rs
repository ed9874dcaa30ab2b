//! Playback labels for converted audio.

use serde::{Deserialize, Serialize};

use crate::media::extract_extension;

/// Names longer than this are shortened for display.
const DISPLAY_NAME_MAX: usize = 35;
const DISPLAY_NAME_HEAD: usize = 24;

/// Formats whole seconds as `MM:SS`, or `H:MM:SS` once an hour is reached.
///
/// ```
/// use ffmfy_core::playback::format_playback_time;
///
/// assert_eq!(format_playback_time(5), "00:05");
/// assert_eq!(format_playback_time(3723), "1:02:03");
/// ```
pub fn format_playback_time(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

/// Shortens a long file name to its head, an ellipsis, and its tail.
///
/// The tail keeps the extension plus a few characters before it, so the
/// format stays visible.
pub fn display_name(file_name: &str) -> String {
    let chars: Vec<char> = file_name.chars().collect();
    if chars.len() <= DISPLAY_NAME_MAX {
        return file_name.to_string();
    }

    let tail_len = (extract_extension(file_name).chars().count() + 6).min(chars.len());
    let head: String = chars[..DISPLAY_NAME_HEAD].iter().collect();
    let tail: String = chars[chars.len() - tail_len..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Where playback of an output file currently is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackPosition {
    pub elapsed_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    /// Elapsed time label, e.g. `"01:05"`.
    pub elapsed_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_label: Option<String>,
    /// Percent played, when the duration is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent: Option<f64>,
}

impl PlaybackPosition {
    pub fn new(elapsed_secs: f64, duration_secs: Option<f64>) -> Self {
        let elapsed_secs = elapsed_secs.max(0.0);
        let duration_secs = duration_secs.filter(|d| d.is_finite() && *d > 0.0);

        Self {
            elapsed_secs,
            duration_secs,
            elapsed_label: format_playback_time(elapsed_secs.floor() as u64),
            duration_label: duration_secs.map(|d| format_playback_time(d.floor() as u64)),
            percent: duration_secs.map(|d| (elapsed_secs / d * 100.0).min(100.0)),
        }
    }
}
