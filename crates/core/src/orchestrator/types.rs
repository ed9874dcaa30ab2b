//! Types for the conversion orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::admission::{AdmissionError, CandidateFile};
use crate::engine::EngineError;
use crate::media::MediaType;
use crate::playback::display_name;

/// Errors returned by session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The candidate file was refused by admission.
    #[error(transparent)]
    Admission(#[from] AdmissionError),

    /// The input file is not a supported audio or video format.
    #[error("Unsupported media format: {extension}")]
    UnsupportedMedia { extension: String },

    /// The requested output format is not offered for this input.
    #[error("Output format {format} is not available for {media_type} input")]
    UnsupportedOutputFormat {
        format: String,
        media_type: MediaType,
    },

    /// The operation is not valid in the current session state.
    #[error("invalid session state: expected {expected}, got {actual}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    /// Conversion was requested before input and output format were chosen.
    #[error("Select an input file and an output format first")]
    MissingSelection,

    /// The engine has not finished loading.
    #[error("Conversion engine is not ready")]
    EngineNotReady,

    /// The engine failed to load.
    #[error("Failed to load the conversion engine: {reason}")]
    EngineLoadFailed { reason: String },

    /// The engine failed while converting.
    #[error("Conversion failed: {0}")]
    EngineExecFailed(#[source] EngineError),

    /// The derived output name is not a supported media file.
    #[error("Output file {file_name} is not a supported media type")]
    OutputClassificationFailed { file_name: String },

    /// The session moved on while the conversion ran; its result was dropped.
    #[error("Conversion result discarded: the input was replaced")]
    Superseded,
}

impl SessionError {
    /// Short machine-readable label, used in failure states and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Admission(e) => e.reason(),
            Self::UnsupportedMedia { .. } => "unsupported_media",
            Self::UnsupportedOutputFormat { .. } => "unsupported_output_format",
            Self::InvalidState { .. } => "invalid_state",
            Self::MissingSelection => "missing_selection",
            Self::EngineNotReady => "engine_not_ready",
            Self::EngineLoadFailed { .. } => "engine_load_failed",
            Self::EngineExecFailed(_) => "engine_exec_failed",
            Self::OutputClassificationFailed { .. } => "output_classification_failed",
            Self::Superseded => "superseded",
        }
    }
}

/// Lifecycle of the conversion engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EngineStatus {
    NotLoaded,
    Loading,
    Ready,
    Failed { reason: String },
}

impl EngineStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// An admitted and classified input file.
#[derive(Debug, Clone)]
pub struct LoadedInput {
    pub file: CandidateFile,
    /// Uppercase extension token, e.g. `"WAV"`.
    pub format: String,
    pub media_type: MediaType,
    /// Formats this input may be converted to.
    pub output_formats: Vec<String>,
}

/// A conversion in flight.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub id: Uuid,
    pub input: LoadedInput,
    /// Lowercase output format used for the file name.
    pub output_format: String,
    pub output_name: String,
    pub output_media_type: MediaType,
    pub created_at: DateTime<Utc>,
}

/// A conversion that passed its preconditions and waits for the engine run.
#[derive(Debug)]
#[must_use = "the session stays in Converting until the conversion is finished"]
pub struct PendingConversion {
    pub(crate) job: ConversionJob,
    pub(crate) generation: u64,
}

impl PendingConversion {
    pub fn job(&self) -> &ConversionJob {
        &self.job
    }
}

/// The product of a successful conversion.
#[derive(Clone)]
pub struct ConversionResult {
    pub job_id: Uuid,
    pub output_name: String,
    pub output_media_type: MediaType,
    pub bytes: Arc<[u8]>,
    /// Playback duration, when the engine could probe it.
    pub duration_secs: Option<f64>,
    pub completed_at: DateTime<Utc>,
}

impl std::fmt::Debug for ConversionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionResult")
            .field("job_id", &self.job_id)
            .field("output_name", &self.output_name)
            .field("output_media_type", &self.output_media_type)
            .field("size_bytes", &self.bytes.len())
            .field("duration_secs", &self.duration_secs)
            .field("completed_at", &self.completed_at)
            .finish()
    }
}

/// State of the conversion session.
///
/// ```text
/// Idle -> Loaded -> FormatSelected -> Converting -> Completed
///                         ^                |            |
///                         |                v            |
///                         |             Failed -> Idle  |
///                         +-----------------------------+
///
/// Loading a new input moves any state to Loaded.
/// ```
///
/// Every variant carries only the data valid in it, so replacing the state
/// clears everything derived from the previous input at once.
#[derive(Debug, Clone, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Loaded {
        input: LoadedInput,
    },
    FormatSelected {
        input: LoadedInput,
        output_format: String,
    },
    Converting {
        job: ConversionJob,
        /// Percent in `0..=100`, as reported by the engine.
        progress: f64,
    },
    Completed {
        job: ConversionJob,
        result: ConversionResult,
    },
    Failed {
        reason: &'static str,
        message: String,
    },
}

impl SessionState {
    /// Returns the state type as a string.
    pub fn state_type(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Loaded { .. } => "loaded",
            SessionState::FormatSelected { .. } => "format_selected",
            SessionState::Converting { .. } => "converting",
            SessionState::Completed { .. } => "completed",
            SessionState::Failed { .. } => "failed",
        }
    }

    /// The current input, if one is loaded.
    pub fn input(&self) -> Option<&LoadedInput> {
        match self {
            SessionState::Loaded { input } | SessionState::FormatSelected { input, .. } => {
                Some(input)
            }
            SessionState::Converting { job, .. } | SessionState::Completed { job, .. } => {
                Some(&job.input)
            }
            SessionState::Idle | SessionState::Failed { .. } => None,
        }
    }

    pub fn is_converting(&self) -> bool {
        matches!(self, SessionState::Converting { .. })
    }

    /// Builds the failed state for an error.
    pub fn failed(error: &SessionError) -> Self {
        SessionState::Failed {
            reason: error.reason(),
            message: error.to_string(),
        }
    }
}

/// Summary of the loaded input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSummary {
    pub name: String,
    /// `name` shortened for narrow displays.
    pub display_name: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub format: String,
    pub media_type: MediaType,
    pub output_formats: Vec<String>,
}

impl From<&LoadedInput> for InputSummary {
    fn from(input: &LoadedInput) -> Self {
        Self {
            name: input.file.name.clone(),
            display_name: display_name(&input.file.name),
            size_bytes: input.file.size_bytes,
            mime_type: input.file.mime_type.clone(),
            format: input.format.clone(),
            media_type: input.media_type,
            output_formats: input.output_formats.clone(),
        }
    }
}

/// Summary of a finished conversion output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSummary {
    pub name: String,
    pub display_name: String,
    pub media_type: MediaType,
    pub size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    pub completed_at: DateTime<Utc>,
}

/// Failure details shown until acknowledged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureSummary {
    pub reason: String,
    pub message: String,
}

/// Read model of the session for API consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: String,
    pub generation: u64,
    pub engine: EngineStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<InputSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FailureSummary>,
}

impl SessionSnapshot {
    pub(crate) fn build(state: &SessionState, generation: u64, engine: EngineStatus) -> Self {
        let mut snapshot = Self {
            state: state.state_type().to_string(),
            generation,
            engine,
            input: state.input().map(InputSummary::from),
            output_format: None,
            job_id: None,
            progress: None,
            output: None,
            error: None,
        };

        match state {
            SessionState::Idle | SessionState::Loaded { .. } => {}
            SessionState::FormatSelected { output_format, .. } => {
                snapshot.output_format = Some(output_format.clone());
            }
            SessionState::Converting { job, progress } => {
                snapshot.output_format = Some(job.output_format.to_uppercase());
                snapshot.job_id = Some(job.id);
                snapshot.progress = Some(*progress);
            }
            SessionState::Completed { job, result } => {
                snapshot.output_format = Some(job.output_format.to_uppercase());
                snapshot.job_id = Some(job.id);
                snapshot.progress = Some(100.0);
                snapshot.output = Some(OutputSummary {
                    name: result.output_name.clone(),
                    display_name: display_name(&result.output_name),
                    media_type: result.output_media_type,
                    size_bytes: result.bytes.len() as u64,
                    duration_secs: result.duration_secs,
                    completed_at: result.completed_at,
                });
            }
            SessionState::Failed { reason, message } => {
                snapshot.error = Some(FailureSummary {
                    reason: reason.to_string(),
                    message: message.clone(),
                });
            }
        }

        snapshot
    }
}

/// Event published to session subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The session moved to a new state.
    StateChanged { snapshot: SessionSnapshot },
    /// Conversion progress in percent.
    Progress { job_id: Uuid, progress: f64 },
    /// The engine status changed.
    EngineStatus { status: EngineStatus },
}
