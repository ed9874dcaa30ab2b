//! Error types for the admission module.

use thiserror::Error;

/// Why a candidate file was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    /// Nothing was dropped or picked.
    #[error("No file selected")]
    NoFileSelected,

    /// The file matched none of the allowed type patterns.
    #[error("Invalid file type: {extension}")]
    UnsupportedFileType { extension: String },

    /// The file is smaller than the minimum size.
    #[error("File too small: size must be between {} and {} bytes", bound(.min), bound(.max))]
    FileTooSmall { min: Option<u64>, max: Option<u64> },

    /// The file is larger than the maximum size.
    #[error("File too large: size must be between {} and {} bytes", bound(.min), bound(.max))]
    FileTooLarge { min: Option<u64>, max: Option<u64> },
}

/// Renders an optional size bound; absent bounds show as `NaN`.
fn bound(value: &Option<u64>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "NaN".to_string(),
    }
}

impl AdmissionError {
    /// Short machine-readable reason, used for metrics labels and API bodies.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NoFileSelected => "no_file_selected",
            Self::UnsupportedFileType { .. } => "unsupported_file_type",
            Self::FileTooSmall { .. } => "file_too_small",
            Self::FileTooLarge { .. } => "file_too_large",
        }
    }
}
