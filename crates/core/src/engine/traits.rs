//! Trait definitions for the engine module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::error::EngineError;

/// Event emitted by an engine while it works.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// Conversion progress as a fraction in `0.0..=1.0`.
    Progress { ratio: f64 },
    /// A log line produced by the engine.
    Log { message: String },
}

/// A media conversion engine with its own flat file space.
///
/// The contract mirrors an in-process ffmpeg: files are written into the
/// engine by name, a command line is executed against those names, and the
/// produced file is read back. Progress and log output are delivered through
/// [`ConversionEngine::subscribe`].
#[async_trait]
pub trait ConversionEngine: Send + Sync {
    /// Returns the name of this engine implementation.
    fn name(&self) -> &str;

    /// Brings the engine up. Must succeed before any other file or exec call.
    async fn load(&self) -> Result<(), EngineError>;

    /// Whether `load` has completed successfully.
    fn is_loaded(&self) -> bool;

    /// Stores `data` under `name`, replacing any previous file.
    async fn write_file(&self, name: &str, data: &[u8]) -> Result<(), EngineError>;

    /// Runs a command line such as `["-i", "in.wav", "out.mp3"]`.
    ///
    /// The operand after each `-i` and the trailing output are stored file
    /// names, taken literally even when they look like options or URLs.
    async fn exec(&self, args: &[String]) -> Result<(), EngineError>;

    /// Reads back a file produced by `exec`.
    async fn read_file(&self, name: &str) -> Result<Vec<u8>, EngineError>;

    /// Removes a file. Missing files are not an error.
    async fn delete_file(&self, _name: &str) -> Result<(), EngineError> {
        Ok(())
    }

    /// Duration of a stored media file in seconds, when the engine can tell.
    async fn probe_duration(&self, _name: &str) -> Result<Option<f64>, EngineError> {
        Ok(None)
    }

    /// Subscribes to progress and log events.
    fn subscribe(&self) -> broadcast::Receiver<EngineEvent>;
}
