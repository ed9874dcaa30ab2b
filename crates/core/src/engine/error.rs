//! Error types for the engine module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by a conversion engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// FFmpeg binary not found.
    #[error("FFmpeg not found at path: {path}")]
    FfmpegNotFound { path: PathBuf },

    /// FFprobe binary not found.
    #[error("FFprobe not found at path: {path}")]
    FfprobeNotFound { path: PathBuf },

    /// An operation was attempted before `load` succeeded.
    #[error("Engine is not loaded")]
    NotLoaded,

    /// The engine could not be brought up.
    #[error("Engine load failed: {reason}")]
    LoadFailed { reason: String },

    /// The conversion command failed.
    #[error("Engine execution failed: {reason}")]
    ExecFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// The conversion command ran for too long.
    #[error("Engine execution timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// A file was requested that the engine does not hold.
    #[error("File not found in engine: {name}")]
    FileNotFound { name: String },

    /// A file name that cannot live in the engine's flat file space.
    #[error("Invalid engine file name: {name}")]
    InvalidFileName { name: String },

    /// Failed to probe a media file.
    #[error("Failed to probe media file: {reason}")]
    ProbeFailed { reason: String },

    /// I/O error inside the engine.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Creates an execution failure with optional captured stderr.
    pub fn exec_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::ExecFailed {
            reason: reason.into(),
            stderr,
        }
    }

    /// Creates a load failure.
    pub fn load_failed(reason: impl Into<String>) -> Self {
        Self::LoadFailed {
            reason: reason.into(),
        }
    }

    /// Creates a probe failure.
    pub fn probe_failed(reason: impl Into<String>) -> Self {
        Self::ProbeFailed {
            reason: reason.into(),
        }
    }
}
