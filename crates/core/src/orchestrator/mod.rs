//! Conversion orchestrator for a single media conversion session.
//!
//! The orchestrator owns the session state machine:
//! - **Input**: admission and classification; a new input replaces everything
//! - **Format**: the output format is picked from those offered for the input
//! - **Conversion**: one engine run per job, progress forwarded as percent

mod config;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use runner::ConversionOrchestrator;
pub use types::{
    ConversionJob, ConversionResult, EngineStatus, FailureSummary, InputSummary, LoadedInput,
    OutputSummary, PendingConversion, SessionError, SessionEvent, SessionSnapshot, SessionState,
};
