//! Mock conversion engine for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Notify, RwLock};

use crate::engine::{ConversionEngine, EngineError, EngineEvent};

/// Mock implementation of the ConversionEngine trait.
///
/// Provides controllable behavior for testing:
/// - Track written files and executed command lines
/// - Simulate load and exec failures
/// - Emit scripted progress ratios
/// - Hold an exec open until the test releases it
///
/// # Example
///
/// ```rust,ignore
/// use ffmfy_core::testing::MockEngine;
///
/// let engine = MockEngine::new();
/// engine.set_progress_steps(vec![0.25, 0.5, 1.0]).await;
/// engine.set_output_bytes(b"ID3".to_vec()).await;
///
/// // Run a conversion through the orchestrator...
///
/// let execs = engine.recorded_execs().await;
/// assert_eq!(execs[0], vec!["-i", "song.wav", "song.mp3"]);
/// ```
#[derive(Debug)]
pub struct MockEngine {
    /// Files held by the engine.
    files: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    /// Names passed to write_file, in order.
    writes: Arc<RwLock<Vec<String>>>,
    /// Argument lists passed to exec, in order.
    execs: Arc<RwLock<Vec<Vec<String>>>>,
    loaded: AtomicBool,
    load_calls: AtomicUsize,
    /// If set, the next load fails with this reason.
    next_load_error: Arc<RwLock<Option<String>>>,
    /// If set, the next exec fails with this error.
    next_exec_error: Arc<RwLock<Option<EngineError>>>,
    /// Ratios emitted as progress events during exec.
    progress_steps: Arc<RwLock<Vec<f64>>>,
    /// Bytes written as exec output; defaults to a copy of the input.
    output_bytes: Arc<RwLock<Option<Vec<u8>>>>,
    /// Duration reported by probe_duration.
    duration_secs: Arc<RwLock<Option<f64>>>,
    /// Simulated exec duration in milliseconds.
    exec_delay_ms: Arc<RwLock<u64>>,
    /// When set, exec waits for a notification before finishing.
    exec_gate: Arc<RwLock<Option<Arc<Notify>>>>,
    exec_started: Arc<Notify>,
    events: broadcast::Sender<EngineEvent>,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEngine {
    /// Create a new mock engine that loads successfully.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            files: Arc::new(RwLock::new(HashMap::new())),
            writes: Arc::new(RwLock::new(Vec::new())),
            execs: Arc::new(RwLock::new(Vec::new())),
            loaded: AtomicBool::new(false),
            load_calls: AtomicUsize::new(0),
            next_load_error: Arc::new(RwLock::new(None)),
            next_exec_error: Arc::new(RwLock::new(None)),
            progress_steps: Arc::new(RwLock::new(vec![0.5, 1.0])),
            output_bytes: Arc::new(RwLock::new(None)),
            duration_secs: Arc::new(RwLock::new(None)),
            exec_delay_ms: Arc::new(RwLock::new(0)),
            exec_gate: Arc::new(RwLock::new(None)),
            exec_started: Arc::new(Notify::new()),
            events,
        }
    }

    /// Get all recorded exec argument lists.
    pub async fn recorded_execs(&self) -> Vec<Vec<String>> {
        self.execs.read().await.clone()
    }

    /// Get the names of all written files.
    pub async fn recorded_writes(&self) -> Vec<String> {
        self.writes.read().await.clone()
    }

    /// Get the number of exec calls.
    pub async fn exec_count(&self) -> usize {
        self.execs.read().await.len()
    }

    /// Get the number of load calls.
    pub fn load_count(&self) -> usize {
        self.load_calls.load(Ordering::SeqCst)
    }

    /// Whether the engine currently holds a file.
    pub async fn has_file(&self, name: &str) -> bool {
        self.files.read().await.contains_key(name)
    }

    /// Configure the next load to fail.
    pub async fn fail_next_load(&self, reason: impl Into<String>) {
        *self.next_load_error.write().await = Some(reason.into());
    }

    /// Configure the next exec to fail with the given error.
    pub async fn set_next_exec_error(&self, error: EngineError) {
        *self.next_exec_error.write().await = Some(error);
    }

    /// Set the progress ratios emitted during exec.
    pub async fn set_progress_steps(&self, steps: Vec<f64>) {
        *self.progress_steps.write().await = steps;
    }

    /// Set the bytes exec produces.
    pub async fn set_output_bytes(&self, bytes: Vec<u8>) {
        *self.output_bytes.write().await = Some(bytes);
    }

    /// Set the duration reported for produced files.
    pub async fn set_duration(&self, secs: f64) {
        *self.duration_secs.write().await = Some(secs);
    }

    /// Set the simulated exec duration.
    pub async fn set_exec_delay(&self, delay: Duration) {
        *self.exec_delay_ms.write().await = delay.as_millis() as u64;
    }

    /// Make exec wait until the returned handle is notified.
    pub async fn hold_exec(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.exec_gate.write().await = Some(Arc::clone(&gate));
        gate
    }

    /// Wait until an exec call has started.
    pub async fn wait_exec_started(&self) {
        self.exec_started.notified().await;
    }

    fn emit(&self, event: EngineEvent) {
        let _ = self.events.send(event);
    }

    fn ensure_loaded(&self) -> Result<(), EngineError> {
        if self.loaded.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(EngineError::NotLoaded)
        }
    }
}

#[async_trait]
impl ConversionEngine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn load(&self) -> Result<(), EngineError> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(reason) = self.next_load_error.write().await.take() {
            return Err(EngineError::load_failed(reason));
        }

        self.loaded.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    async fn write_file(&self, name: &str, data: &[u8]) -> Result<(), EngineError> {
        self.ensure_loaded()?;
        self.writes.write().await.push(name.to_string());
        self.files
            .write()
            .await
            .insert(name.to_string(), data.to_vec());
        Ok(())
    }

    async fn exec(&self, args: &[String]) -> Result<(), EngineError> {
        self.ensure_loaded()?;
        self.execs.write().await.push(args.to_vec());
        self.exec_started.notify_one();

        let gate = self.exec_gate.read().await.clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let delay_ms = *self.exec_delay_ms.read().await;
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        if let Some(err) = self.next_exec_error.write().await.take() {
            self.emit(EngineEvent::Log {
                message: format!("mock failure: {}", err),
            });
            return Err(err);
        }

        let (input, output) = match args {
            [flag, input, output] if flag == "-i" => (input, output),
            _ => {
                return Err(EngineError::exec_failed(
                    format!("unexpected arguments: {:?}", args),
                    None,
                ))
            }
        };

        let input_bytes = self
            .files
            .read()
            .await
            .get(input)
            .cloned()
            .ok_or_else(|| EngineError::FileNotFound {
                name: input.clone(),
            })?;

        self.emit(EngineEvent::Log {
            message: format!("Input #0, from '{}'", input),
        });
        for ratio in self.progress_steps.read().await.iter() {
            self.emit(EngineEvent::Progress { ratio: *ratio });
        }

        let output_bytes = self
            .output_bytes
            .read()
            .await
            .clone()
            .unwrap_or(input_bytes);
        self.files
            .write()
            .await
            .insert(output.clone(), output_bytes);

        Ok(())
    }

    async fn read_file(&self, name: &str) -> Result<Vec<u8>, EngineError> {
        self.ensure_loaded()?;
        self.files
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::FileNotFound {
                name: name.to_string(),
            })
    }

    async fn delete_file(&self, name: &str) -> Result<(), EngineError> {
        self.ensure_loaded()?;
        self.files.write().await.remove(name);
        Ok(())
    }

    async fn probe_duration(&self, name: &str) -> Result<Option<f64>, EngineError> {
        self.ensure_loaded()?;
        if !self.files.read().await.contains_key(name) {
            return Err(EngineError::FileNotFound {
                name: name.to_string(),
            });
        }
        Ok(*self.duration_secs.read().await)
    }

    fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }
}
