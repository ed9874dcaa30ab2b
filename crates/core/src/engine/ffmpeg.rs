//! FFmpeg-based engine implementation.
//!
//! The engine's file space is a private working directory; `exec` runs the
//! ffmpeg binary inside it and passes stored file names as `./<name>`.

use async_trait::async_trait;
use regex_lite::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::broadcast;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

use super::config::EngineConfig;
use super::error::EngineError;
use super::traits::{ConversionEngine, EngineEvent};

/// FFmpeg-based engine implementation.
pub struct FfmpegEngine {
    config: EngineConfig,
    loaded: AtomicBool,
    events: broadcast::Sender<EngineEvent>,
}

impl FfmpegEngine {
    /// Creates a new engine with the given configuration.
    pub fn new(config: EngineConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            config,
            loaded: AtomicBool::new(false),
            events,
        }
    }

    /// Creates an engine with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn ensure_loaded(&self) -> Result<(), EngineError> {
        if self.loaded.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(EngineError::NotLoaded)
        }
    }

    /// Maps an engine file name to a path inside the working directory.
    fn resolve(&self, name: &str) -> Result<PathBuf, EngineError> {
        if !is_flat_file_name(name) {
            return Err(EngineError::InvalidFileName {
                name: name.to_string(),
            });
        }
        Ok(self.config.work_dir.join(name))
    }

    /// Builds the full ffmpeg argument list for a user command line.
    fn build_args(&self, args: &[String]) -> Vec<String> {
        let mut full = vec![
            "-y".to_string(), // Overwrite output
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
            "-progress".to_string(),
            "pipe:2".to_string(),
            "-nostats".to_string(),
        ];
        full.extend(self.config.extra_ffmpeg_args.iter().cloned());
        full.extend(anchor_file_operands(args));
        full
    }

    /// Emits an event; nobody listening is fine.
    fn emit(&self, event: EngineEvent) {
        let _ = self.events.send(event);
    }

    /// Runs ffprobe on a path and returns its duration.
    async fn probe_path(&self, path: &Path) -> Result<Option<f64>, EngineError> {
        let output = Command::new(&self.config.ffprobe_path)
            .args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .arg(path)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    EngineError::FfprobeNotFound {
                        path: self.config.ffprobe_path.clone(),
                    }
                } else {
                    EngineError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(EngineError::probe_failed(format!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        parse_probe_duration(&String::from_utf8_lossy(&output.stdout))
    }

    /// Duration of the `-i` input of a command line, if it can be probed.
    async fn input_duration(&self, args: &[String]) -> Option<f64> {
        let input = args
            .iter()
            .position(|a| a == "-i")
            .and_then(|idx| args.get(idx + 1))?;
        let path = self.resolve(input).ok()?;

        match self.probe_path(&path).await {
            Ok(duration) => duration.filter(|d| *d > 0.0),
            Err(e) => {
                debug!("Could not probe {} for progress: {}", input, e);
                None
            }
        }
    }
}

/// Whether `name` is a plain file name with no directory components.
fn is_flat_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

/// Prefixes the stored-file operands of a command line with `./`.
///
/// The operand after each `-i` and the trailing output of a command with an
/// input name files in the working directory. Unprefixed, ffmpeg reads a
/// leading `-` as an option and `proto:` as a protocol URL.
fn anchor_file_operands(args: &[String]) -> Vec<String> {
    let has_input = args.iter().any(|a| a == "-i");
    let last = args.len().checked_sub(1);

    args.iter()
        .enumerate()
        .map(|(idx, arg)| {
            let is_input = idx > 0 && args[idx - 1] == "-i";
            let is_output = has_input && !is_input && Some(idx) == last;
            if (is_input || is_output) && is_flat_file_name(arg) {
                format!("./{}", arg)
            } else {
                arg.clone()
            }
        })
        .collect()
}

/// Extracts `format.duration` from ffprobe JSON output.
fn parse_probe_duration(output: &str) -> Result<Option<f64>, EngineError> {
    #[derive(Deserialize)]
    struct ProbeOutput {
        format: ProbeFormat,
    }

    #[derive(Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }

    let probe: ProbeOutput = serde_json::from_str(output)
        .map_err(|e| EngineError::probe_failed(format!("Failed to parse ffprobe output: {}", e)))?;

    Ok(probe
        .format
        .duration
        .as_ref()
        .and_then(|d| d.parse::<f64>().ok()))
}

/// Line parser for ffmpeg's `-progress` key/value protocol.
struct ProgressParser {
    time_regex: Option<Regex>,
    key_value_regex: Option<Regex>,
    duration_secs: Option<f64>,
}

/// What a single stderr line turned out to be.
#[derive(Debug, PartialEq)]
enum ParsedLine {
    Progress(f64),
    Finished,
    ProtocolNoise,
    Log,
}

impl ProgressParser {
    fn new(duration_secs: Option<f64>) -> Self {
        Self {
            time_regex: Regex::new(r"^out_time_(?:ms|us)=(\d+)").ok(),
            key_value_regex: Regex::new(r"^[a-z_0-9]+=\S*$").ok(),
            duration_secs,
        }
    }

    fn parse(&self, line: &str) -> ParsedLine {
        let line = line.trim();

        if line == "progress=end" {
            return ParsedLine::Finished;
        }

        if let Some(ref re) = self.time_regex {
            if let Some(caps) = re.captures(line) {
                let micros = caps
                    .get(1)
                    .and_then(|m| m.as_str().parse::<f64>().ok())
                    .unwrap_or(0.0);
                return match self.duration_secs {
                    // out_time_ms is reported in microseconds despite its name
                    Some(duration) => {
                        ParsedLine::Progress((micros / 1_000_000.0 / duration).clamp(0.0, 1.0))
                    }
                    None => ParsedLine::ProtocolNoise,
                };
            }
        }

        match self.key_value_regex {
            Some(ref re) if re.is_match(line) => ParsedLine::ProtocolNoise,
            _ => ParsedLine::Log,
        }
    }
}

#[async_trait]
impl ConversionEngine for FfmpegEngine {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn load(&self) -> Result<(), EngineError> {
        let output = Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    EngineError::FfmpegNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    EngineError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(EngineError::load_failed(format!(
                "ffmpeg -version exited with code: {:?}",
                output.status.code()
            )));
        }

        if let Some(version) = String::from_utf8_lossy(&output.stdout).lines().next() {
            info!("Loaded {}", version);
        }

        // ffprobe is only needed for progress and durations
        if let Err(e) = Command::new(&self.config.ffprobe_path)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
        {
            warn!(
                "ffprobe unavailable at {:?} ({}), progress will not be reported",
                self.config.ffprobe_path, e
            );
        }

        tokio::fs::create_dir_all(&self.config.work_dir)
            .await
            .map_err(|e| {
                EngineError::load_failed(format!(
                    "Failed to create work dir {:?}: {}",
                    self.config.work_dir, e
                ))
            })?;

        self.loaded.store(true, Ordering::Release);
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    async fn write_file(&self, name: &str, data: &[u8]) -> Result<(), EngineError> {
        self.ensure_loaded()?;
        let path = self.resolve(name)?;
        tokio::fs::write(&path, data).await?;
        debug!("Wrote {} ({} bytes)", name, data.len());
        Ok(())
    }

    async fn exec(&self, args: &[String]) -> Result<(), EngineError> {
        self.ensure_loaded()?;
        let start = Instant::now();

        let duration_secs = self.input_duration(args).await;
        let parser = ProgressParser::new(duration_secs);
        let full_args = self.build_args(args);

        debug!("Running {:?} {:?}", self.config.ffmpeg_path, full_args);

        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(&full_args)
            .current_dir(&self.config.work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    EngineError::FfmpegNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    EngineError::Io(e)
                }
            })?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EngineError::exec_failed("stderr was not captured", None))?;
        let mut reader = BufReader::new(stderr);

        self.emit(EngineEvent::Progress { ratio: 0.0 });

        let timeout_duration = Duration::from_secs(self.config.timeout_secs);
        let result = timeout(timeout_duration, async {
            let mut error_output = String::new();
            let mut buf = Vec::new();

            // Echoed metadata is not always UTF-8; stderr is read to EOF regardless.
            loop {
                buf.clear();
                if reader.read_until(b'\n', &mut buf).await? == 0 {
                    break;
                }
                let line = String::from_utf8_lossy(&buf)
                    .trim_end_matches(|c: char| c == '\r' || c == '\n')
                    .to_string();

                match parser.parse(&line) {
                    ParsedLine::Progress(ratio) => self.emit(EngineEvent::Progress { ratio }),
                    ParsedLine::Finished => self.emit(EngineEvent::Progress { ratio: 1.0 }),
                    ParsedLine::ProtocolNoise => {}
                    ParsedLine::Log => {
                        if line.contains("Error") || line.contains("error") {
                            error_output.push_str(&line);
                            error_output.push('\n');
                        }
                        self.emit(EngineEvent::Log { message: line });
                    }
                }
            }

            let status = child.wait().await?;
            Ok::<(std::process::ExitStatus, String), std::io::Error>((status, error_output))
        })
        .await;

        match result {
            Ok(Ok((status, error_output))) => {
                if !status.success() {
                    return Err(EngineError::exec_failed(
                        format!("FFmpeg exited with code: {:?}", status.code()),
                        if error_output.is_empty() {
                            None
                        } else {
                            Some(error_output)
                        },
                    ));
                }
            }
            Ok(Err(e)) => return Err(EngineError::Io(e)),
            Err(_) => {
                let _ = child.kill().await;
                return Err(EngineError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                });
            }
        }

        debug!("ffmpeg finished in {} ms", start.elapsed().as_millis());
        Ok(())
    }

    async fn read_file(&self, name: &str) -> Result<Vec<u8>, EngineError> {
        self.ensure_loaded()?;
        let path = self.resolve(name)?;
        tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                EngineError::FileNotFound {
                    name: name.to_string(),
                }
            } else {
                EngineError::Io(e)
            }
        })
    }

    async fn delete_file(&self, name: &str) -> Result<(), EngineError> {
        self.ensure_loaded()?;
        let path = self.resolve(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(EngineError::Io(e)),
        }
    }

    async fn probe_duration(&self, name: &str) -> Result<Option<f64>, EngineError> {
        self.ensure_loaded()?;
        let path = self.resolve(name)?;
        if !path.exists() {
            return Err(EngineError::FileNotFound {
                name: name.to_string(),
            });
        }
        self.probe_path(&path).await
    }

    fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }
}
