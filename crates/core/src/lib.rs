pub mod admission;
pub mod config;
pub mod engine;
pub mod media;
pub mod metrics;
pub mod orchestrator;
pub mod playback;
pub mod testing;

pub use admission::{
    validate, AdmissionConstraints, AdmissionError, CandidateFile, TypePattern,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, FormatsConfig,
    SanitizedConfig, ServerConfig,
};
pub use engine::{ConversionEngine, EngineConfig, EngineError, EngineEvent, FfmpegEngine};
pub use media::{
    classify, derive_output_name, extract_extension, output_formats_for, MediaClassifier,
    MediaType, SUPPORTED_AUDIO_FORMATS, SUPPORTED_VIDEO_FORMATS,
};
pub use orchestrator::{
    ConversionOrchestrator, ConversionResult, EngineStatus, OrchestratorConfig, SessionError,
    SessionEvent, SessionSnapshot,
};
pub use playback::{format_playback_time, PlaybackPosition};
