//! Testing utilities and mock implementations.
//!
//! This module provides a mock conversion engine and fixtures, allowing the
//! orchestrator and the HTTP surface to be tested without an ffmpeg binary.
//!
//! # Example
//!
//! ```rust,ignore
//! use ffmfy_core::testing::{fixtures, MockEngine};
//!
//! let engine = Arc::new(MockEngine::new());
//! let orchestrator = ConversionOrchestrator::new(engine.clone(), OrchestratorConfig::default());
//! orchestrator.load_engine().await?;
//! orchestrator.load_input(Some(fixtures::audio_file("song.wav", 2048))).await?;
//! ```

mod mock_engine;

pub use mock_engine::MockEngine;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::admission::{mime_from_extension, CandidateFile};

    /// Create a candidate file of `size` bytes with a MIME type derived from
    /// its extension.
    pub fn candidate_file(name: &str, size: usize) -> CandidateFile {
        CandidateFile::new(name, mime_from_extension(name), vec![0u8; size])
    }

    /// Create an audio candidate file.
    pub fn audio_file(name: &str, size: usize) -> CandidateFile {
        let extension = crate::media::extract_extension(name).to_lowercase();
        CandidateFile::new(name, format!("audio/{}", extension), vec![1u8; size])
    }

    /// Create a video candidate file.
    pub fn video_file(name: &str, size: usize) -> CandidateFile {
        let extension = crate::media::extract_extension(name).to_lowercase();
        CandidateFile::new(name, format!("video/{}", extension), vec![2u8; size])
    }

    /// Create a candidate file with an explicit MIME type.
    pub fn file_with_mime(name: &str, mime_type: &str, size: usize) -> CandidateFile {
        CandidateFile::new(name, mime_type, vec![0u8; size])
    }
}
