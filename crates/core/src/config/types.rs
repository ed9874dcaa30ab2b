use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::admission::AdmissionConstraints;
use crate::engine::EngineConfig;
use crate::media::{MediaClassifier, SUPPORTED_AUDIO_FORMATS, SUPPORTED_VIDEO_FORMATS};
use crate::orchestrator::OrchestratorConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub session: OrchestratorConfig,
    #[serde(default)]
    pub formats: FormatsConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Largest accepted upload body in bytes.
    #[serde(default = "default_max_upload")]
    pub max_upload_bytes: usize,
    /// Directory with a browser UI to serve at `/`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload(),
            static_dir: None,
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

fn default_max_upload() -> usize {
    512 * 1024 * 1024 // 512 MiB
}

/// Supported format lists.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FormatsConfig {
    #[serde(default = "default_audio_formats")]
    pub audio: Vec<String>,
    #[serde(default = "default_video_formats")]
    pub video: Vec<String>,
}

impl Default for FormatsConfig {
    fn default() -> Self {
        Self {
            audio: default_audio_formats(),
            video: default_video_formats(),
        }
    }
}

fn default_audio_formats() -> Vec<String> {
    SUPPORTED_AUDIO_FORMATS.iter().map(|f| f.to_string()).collect()
}

fn default_video_formats() -> Vec<String> {
    SUPPORTED_VIDEO_FORMATS.iter().map(|f| f.to_string()).collect()
}

impl FormatsConfig {
    /// Builds a classifier over these lists.
    pub fn classifier(&self) -> MediaClassifier {
        MediaClassifier::new(self.audio.clone(), self.video.clone())
    }
}

/// Sanitized config for API responses (filesystem paths hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: SanitizedServerConfig,
    pub engine: SanitizedEngineConfig,
    pub admission: AdmissionConstraints,
    pub picker_check_delay_ms: u64,
    pub formats: FormatsConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedServerConfig {
    pub port: u16,
    pub max_upload_bytes: usize,
    pub static_ui: bool,
}

/// Sanitized engine config (binary and work paths hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedEngineConfig {
    pub timeout_secs: u64,
    pub ffmpeg_log_level: String,
    pub extra_args_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: SanitizedServerConfig {
                port: config.server.port,
                max_upload_bytes: config.server.max_upload_bytes,
                static_ui: config.server.static_dir.is_some(),
            },
            engine: SanitizedEngineConfig {
                timeout_secs: config.engine.timeout_secs,
                ffmpeg_log_level: config.engine.ffmpeg_log_level.clone(),
                extra_args_configured: !config.engine.extra_ffmpeg_args.is_empty(),
            },
            admission: config.session.admission.clone(),
            picker_check_delay_ms: config.session.picker_check_delay_ms,
            formats: config.formats.clone(),
        }
    }
}
