//! Engine module: the external media conversion engine.
//!
//! The orchestrator talks to the engine only through the
//! [`ConversionEngine`] trait, which mirrors an in-process ffmpeg: write a
//! file, execute a command line, read the result back. [`FfmpegEngine`] backs
//! that contract with a native ffmpeg binary and a private working directory.
//!
//! # Example
//!
//! ```ignore
//! use ffmfy_core::engine::{ConversionEngine, EngineConfig, FfmpegEngine};
//!
//! let engine = FfmpegEngine::new(EngineConfig::default());
//! engine.load().await?;
//!
//! engine.write_file("song.wav", &bytes).await?;
//! engine.exec(&["-i".into(), "song.wav".into(), "song.mp3".into()]).await?;
//! let mp3 = engine.read_file("song.mp3").await?;
//! ```

mod config;
mod error;
mod ffmpeg;
mod traits;

pub use config::EngineConfig;
pub use error::EngineError;
pub use ffmpeg::FfmpegEngine;
pub use traits::{ConversionEngine, EngineEvent};
