//! Conversion orchestrator implementation.
//!
//! Drives a single session through the state machine:
//! - Input: admission and classification, replacing any previous input
//! - Format: picking one of the output formats offered for the input
//! - Conversion: write, exec and read against the engine, exactly once per job

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::admission::{receive_file, validate, CandidateFile};
use crate::engine::{ConversionEngine, EngineError, EngineEvent};
use crate::media::{derive_output_name, MediaClassifier};
use crate::metrics::{
    ADMISSIONS_TOTAL, CONVERSIONS_TOTAL, CONVERSION_DURATION, ENGINE_LOADS, OUTPUT_BYTES,
};
use crate::playback::PlaybackPosition;

use super::config::OrchestratorConfig;
use super::types::{
    ConversionJob, ConversionResult, EngineStatus, LoadedInput, PendingConversion, SessionError,
    SessionEvent, SessionSnapshot, SessionState,
};

/// Session state plus the generation it belongs to.
///
/// The generation changes whenever the input is replaced or the session is
/// reset; a conversion only applies its result to the generation it started in.
#[derive(Debug, Default)]
struct Session {
    state: SessionState,
    generation: u64,
}

/// The conversion orchestrator - owns the session and drives the engine.
pub struct ConversionOrchestrator<E>
where
    E: ConversionEngine + ?Sized + 'static,
{
    config: OrchestratorConfig,
    classifier: MediaClassifier,
    engine: Arc<E>,
    engine_status: RwLock<EngineStatus>,
    /// Held for the whole engine run, so only one job drives the engine.
    engine_events: Mutex<broadcast::Receiver<EngineEvent>>,
    session: RwLock<Session>,
    events: broadcast::Sender<SessionEvent>,
}

impl<E> ConversionOrchestrator<E>
where
    E: ConversionEngine + ?Sized + 'static,
{
    /// Create a new orchestrator around an engine handle.
    pub fn new(engine: Arc<E>, config: OrchestratorConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let engine_events = Mutex::new(engine.subscribe());
        let engine_status = if engine.is_loaded() {
            EngineStatus::Ready
        } else {
            EngineStatus::NotLoaded
        };

        Self {
            config,
            classifier: MediaClassifier::default(),
            engine,
            engine_status: RwLock::new(engine_status),
            engine_events,
            session: RwLock::new(Session::default()),
            events,
        }
    }

    /// Use custom format lists instead of the built-in ones.
    pub fn with_classifier(mut self, classifier: MediaClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn classifier(&self) -> &MediaClassifier {
        &self.classifier
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn engine_status(&self) -> EngineStatus {
        self.engine_status.read().await.clone()
    }

    /// Current read model of the session.
    pub async fn snapshot(&self) -> SessionSnapshot {
        let session = self.session.read().await;
        let engine = self.engine_status.read().await.clone();
        SessionSnapshot::build(&session.state, session.generation, engine)
    }

    /// Load the engine. Calling it again after a failure retries the load.
    pub async fn load_engine(&self) -> Result<(), SessionError> {
        {
            let mut status = self.engine_status.write().await;
            if status.is_ready() {
                debug!("Engine {} already loaded", self.engine.name());
                return Ok(());
            }
            *status = EngineStatus::Loading;
        }
        self.publish(SessionEvent::EngineStatus {
            status: EngineStatus::Loading,
        });

        info!("Loading conversion engine {}", self.engine.name());

        let (status, result) = match self.engine.load().await {
            Ok(()) => {
                ENGINE_LOADS.with_label_values(&["success"]).inc();
                info!("Conversion engine {} ready", self.engine.name());
                (EngineStatus::Ready, Ok(()))
            }
            Err(e) => {
                ENGINE_LOADS.with_label_values(&["failed"]).inc();
                error!("Failed to load conversion engine: {}", e);
                let reason = e.to_string();
                (
                    EngineStatus::Failed {
                        reason: reason.clone(),
                    },
                    Err(SessionError::EngineLoadFailed { reason }),
                )
            }
        };

        *self.engine_status.write().await = status.clone();
        self.publish(SessionEvent::EngineStatus { status });
        result
    }

    /// Admit and classify a new input file.
    ///
    /// On success the session moves to `Loaded`, dropping any output format,
    /// progress or result of the previous input. On failure the session is
    /// left untouched.
    pub async fn load_input(
        &self,
        file: Option<CandidateFile>,
    ) -> Result<SessionSnapshot, SessionError> {
        let file = match validate(file, &self.config.admission) {
            Ok(file) => file,
            Err(e) => {
                ADMISSIONS_TOTAL.with_label_values(&[e.reason()]).inc();
                warn!("Input refused: {}", e);
                return Err(e.into());
            }
        };

        let media_type = self.classifier.classify(&file.name);
        if !media_type.is_supported() {
            let err = SessionError::UnsupportedMedia {
                extension: file.extension().to_string(),
            };
            ADMISSIONS_TOTAL.with_label_values(&[err.reason()]).inc();
            warn!("Input refused: {}", err);
            return Err(err);
        }
        ADMISSIONS_TOTAL.with_label_values(&["accepted"]).inc();

        let input = LoadedInput {
            format: file.extension().to_uppercase(),
            media_type,
            output_formats: self.classifier.output_formats_for(media_type),
            file,
        };

        info!(
            "Loaded {} input {} ({} bytes)",
            input.media_type, input.file.name, input.file.size_bytes
        );

        let snapshot = {
            let mut session = self.session.write().await;
            if session.state.is_converting() {
                info!("Input replaced while converting, the running result will be discarded");
            }
            session.generation += 1;
            session.state = SessionState::Loaded { input };
            self.snapshot_of(&session).await
        };

        self.publish_state(&snapshot);
        Ok(snapshot)
    }

    /// Wait for a file source to deliver a selection, then load it.
    ///
    /// A source that delivers nothing within the picker check delay counts as
    /// an empty selection.
    pub async fn pick_input<F>(&self, selection: F) -> Result<SessionSnapshot, SessionError>
    where
        F: Future<Output = Option<CandidateFile>>,
    {
        let file = receive_file(selection, self.config.picker_check_delay())
            .await
            .ok();
        self.load_input(file).await
    }

    /// Pick the output format for the loaded input.
    ///
    /// Picking again after a finished conversion discards its output.
    pub async fn select_output_format(
        &self,
        format: &str,
    ) -> Result<SessionSnapshot, SessionError> {
        let snapshot = {
            let mut session = self.session.write().await;
            let input = match &session.state {
                SessionState::Loaded { input } | SessionState::FormatSelected { input, .. } => {
                    input.clone()
                }
                SessionState::Completed { job, .. } => job.input.clone(),
                other => {
                    return Err(SessionError::InvalidState {
                        expected: "loaded",
                        actual: other.state_type(),
                    })
                }
            };

            let wanted = format.trim().to_uppercase();
            if !input.output_formats.contains(&wanted) {
                return Err(SessionError::UnsupportedOutputFormat {
                    format: wanted,
                    media_type: input.media_type,
                });
            }

            debug!("Output format {} selected for {}", wanted, input.file.name);
            session.state = SessionState::FormatSelected {
                input,
                output_format: wanted,
            };
            self.snapshot_of(&session).await
        };

        self.publish_state(&snapshot);
        Ok(snapshot)
    }

    /// Run the conversion for the selected input and output format.
    ///
    /// Rejected without any state change unless the session is in
    /// `FormatSelected` and the engine is ready. The engine is invoked exactly
    /// once; its result is applied only if the input was not replaced
    /// meanwhile.
    pub async fn convert(&self) -> Result<ConversionResult, SessionError> {
        let pending = self.begin_conversion().await?;
        self.finish_conversion(pending).await
    }

    /// Check the conversion preconditions and move the session to `Converting`.
    ///
    /// The returned handle is completed by [`Self::finish_conversion`]; until
    /// then the session stays in `Converting` (a new input or a reset still
    /// moves it on).
    pub async fn begin_conversion(&self) -> Result<PendingConversion, SessionError> {
        let (job, generation, snapshot) = {
            let mut session = self.session.write().await;
            let (input, output_format) = match &session.state {
                SessionState::FormatSelected {
                    input,
                    output_format,
                } => (input.clone(), output_format.clone()),
                SessionState::Idle | SessionState::Loaded { .. } => {
                    return Err(SessionError::MissingSelection)
                }
                other => {
                    return Err(SessionError::InvalidState {
                        expected: "format_selected",
                        actual: other.state_type(),
                    })
                }
            };

            if !self.engine_status.read().await.is_ready() {
                return Err(SessionError::EngineNotReady);
            }

            let output_format = output_format.to_lowercase();
            let output_name = derive_output_name(&input.file.name, &input.format, &output_format);
            let output_media_type = self.classifier.classify(&output_name);

            let job = ConversionJob {
                id: Uuid::new_v4(),
                input,
                output_format,
                output_name,
                output_media_type,
                created_at: Utc::now(),
            };

            session.state = SessionState::Converting {
                job: job.clone(),
                progress: 0.0,
            };
            let snapshot = self.snapshot_of(&session).await;
            (job, session.generation, snapshot)
        };
        self.publish_state(&snapshot);

        Ok(PendingConversion { job, generation })
    }

    /// Run the engine for a started conversion and apply its result.
    pub async fn finish_conversion(
        &self,
        pending: PendingConversion,
    ) -> Result<ConversionResult, SessionError> {
        let PendingConversion { job, generation } = pending;

        info!(
            "Converting {} -> {} (job {})",
            job.input.file.name, job.output_name, job.id
        );

        if !job.output_media_type.is_supported() {
            let err = SessionError::OutputClassificationFailed {
                file_name: job.output_name.clone(),
            };
            error!("{}", err);
            self.fail_job(generation, job.id, &err).await;
            CONVERSIONS_TOTAL
                .with_label_values(&["failed", job.output_media_type.as_str()])
                .inc();
            return Err(err);
        }

        let start = Instant::now();
        let outcome = self.drive_engine(&job, generation).await;
        let elapsed = start.elapsed().as_secs_f64();

        match outcome {
            Ok((bytes, duration_secs)) => {
                let result = ConversionResult {
                    job_id: job.id,
                    output_name: job.output_name.clone(),
                    output_media_type: job.output_media_type,
                    bytes: bytes.into(),
                    duration_secs,
                    completed_at: Utc::now(),
                };

                let snapshot = {
                    let mut session = self.session.write().await;
                    if Self::owns_session(&session, generation, job.id) {
                        session.state = SessionState::Completed {
                            job: job.clone(),
                            result: result.clone(),
                        };
                        Some(self.snapshot_of(&session).await)
                    } else {
                        None
                    }
                };

                let media_type = job.output_media_type.as_str();
                match snapshot {
                    Some(snapshot) => {
                        CONVERSIONS_TOTAL
                            .with_label_values(&["success", media_type])
                            .inc();
                        CONVERSION_DURATION
                            .with_label_values(&["success"])
                            .observe(elapsed);
                        OUTPUT_BYTES
                            .with_label_values(&[media_type])
                            .observe(result.bytes.len() as f64);
                        info!(
                            "Conversion {} finished in {:.2}s ({} bytes)",
                            job.id,
                            elapsed,
                            result.bytes.len()
                        );
                        self.publish_state(&snapshot);
                        Ok(result)
                    }
                    None => {
                        CONVERSIONS_TOTAL
                            .with_label_values(&["superseded", media_type])
                            .inc();
                        info!("Discarding result of job {}, session moved on", job.id);
                        Err(SessionError::Superseded)
                    }
                }
            }
            Err(e) => {
                let err = SessionError::EngineExecFailed(e);
                error!("Conversion {} failed: {}", job.id, err);
                let outcome = if self.fail_job(generation, job.id, &err).await {
                    "failed"
                } else {
                    "superseded"
                };
                CONVERSIONS_TOTAL
                    .with_label_values(&[outcome, job.output_media_type.as_str()])
                    .inc();
                CONVERSION_DURATION
                    .with_label_values(&["failed"])
                    .observe(elapsed);
                Err(err)
            }
        }
    }

    /// Dismiss a failure, returning the session to `Idle`.
    pub async fn acknowledge(&self) -> Result<SessionSnapshot, SessionError> {
        let snapshot = {
            let mut session = self.session.write().await;
            if !matches!(session.state, SessionState::Failed { .. }) {
                return Err(SessionError::InvalidState {
                    expected: "failed",
                    actual: session.state.state_type(),
                });
            }
            session.state = SessionState::Idle;
            self.snapshot_of(&session).await
        };

        self.publish_state(&snapshot);
        Ok(snapshot)
    }

    /// Drop everything and return to `Idle`.
    pub async fn reset(&self) -> SessionSnapshot {
        let snapshot = {
            let mut session = self.session.write().await;
            session.generation += 1;
            session.state = SessionState::Idle;
            self.snapshot_of(&session).await
        };

        debug!("Session reset");
        self.publish_state(&snapshot);
        snapshot
    }

    /// The finished conversion result, if any.
    pub async fn output(&self) -> Option<ConversionResult> {
        match &self.session.read().await.state {
            SessionState::Completed { result, .. } => Some(result.clone()),
            _ => None,
        }
    }

    /// Playback labels for the finished output at `elapsed_secs`.
    pub async fn playback_position(
        &self,
        elapsed_secs: f64,
    ) -> Result<PlaybackPosition, SessionError> {
        match &self.session.read().await.state {
            SessionState::Completed { result, .. } => {
                Ok(PlaybackPosition::new(elapsed_secs, result.duration_secs))
            }
            other => Err(SessionError::InvalidState {
                expected: "completed",
                actual: other.state_type(),
            }),
        }
    }

    /// Runs the engine for a job while forwarding its events.
    async fn drive_engine(
        &self,
        job: &ConversionJob,
        generation: u64,
    ) -> Result<(Vec<u8>, Option<f64>), EngineError> {
        let mut events = self.engine_events.lock().await;

        // Events left over from an earlier run belong to another job
        loop {
            match events.try_recv() {
                Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }

        let input_name = engine_input_name(job);
        let run = self.run_engine(job, &input_name);
        tokio::pin!(run);

        let mut events_open = true;
        let outcome = loop {
            tokio::select! {
                result = &mut run => break result,
                event = events.recv(), if events_open => match event {
                    Ok(event) => self.handle_engine_event(job, generation, event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        debug!("Skipped {} engine events", skipped);
                    }
                    Err(RecvError::Closed) => events_open = false,
                },
            }
        };

        loop {
            match events.try_recv() {
                Ok(event) => self.handle_engine_event(job, generation, event).await,
                Err(TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }

        for name in [input_name.as_str(), job.output_name.as_str()] {
            if let Err(e) = self.engine.delete_file(name).await {
                warn!("Failed to remove {} from engine: {}", name, e);
            }
        }

        outcome
    }

    /// write -> exec -> read, then probe the output for its duration.
    async fn run_engine(
        &self,
        job: &ConversionJob,
        input_name: &str,
    ) -> Result<(Vec<u8>, Option<f64>), EngineError> {
        self.engine
            .write_file(input_name, &job.input.file.bytes())
            .await?;

        let args = vec![
            "-i".to_string(),
            input_name.to_string(),
            job.output_name.clone(),
        ];
        self.engine.exec(&args).await?;

        let bytes = self.engine.read_file(&job.output_name).await?;

        let duration_secs = match self.engine.probe_duration(&job.output_name).await {
            Ok(duration) => duration,
            Err(e) => {
                debug!("Could not probe {}: {}", job.output_name, e);
                None
            }
        };

        Ok((bytes, duration_secs))
    }

    async fn handle_engine_event(&self, job: &ConversionJob, generation: u64, event: EngineEvent) {
        match event {
            EngineEvent::Progress { ratio } => {
                let progress = ratio * 100.0;
                {
                    let mut session = self.session.write().await;
                    if !Self::owns_session(&session, generation, job.id) {
                        return;
                    }
                    if let SessionState::Converting { progress: p, .. } = &mut session.state {
                        *p = progress;
                    }
                }
                self.publish(SessionEvent::Progress {
                    job_id: job.id,
                    progress,
                });
            }
            EngineEvent::Log { message } => {
                debug!(target: "ffmfy::engine", "{}", message);
            }
        }
    }

    /// Moves a still-current job to `Failed`. Returns whether it was current.
    async fn fail_job(&self, generation: u64, job_id: Uuid, err: &SessionError) -> bool {
        let snapshot = {
            let mut session = self.session.write().await;
            if !Self::owns_session(&session, generation, job_id) {
                return false;
            }
            session.state = SessionState::failed(err);
            self.snapshot_of(&session).await
        };

        self.publish_state(&snapshot);
        true
    }

    fn owns_session(session: &Session, generation: u64, job_id: Uuid) -> bool {
        session.generation == generation
            && matches!(&session.state, SessionState::Converting { job, .. } if job.id == job_id)
    }

    async fn snapshot_of(&self, session: &Session) -> SessionSnapshot {
        let engine = self.engine_status.read().await.clone();
        SessionSnapshot::build(&session.state, session.generation, engine)
    }

    fn publish_state(&self, snapshot: &SessionSnapshot) {
        self.publish(SessionEvent::StateChanged {
            snapshot: snapshot.clone(),
        });
    }

    /// Sends an event; having no subscribers is fine.
    fn publish(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}

/// Name the input is stored under inside the engine.
///
/// Converting to the input's own format would make input and output collide.
fn engine_input_name(job: &ConversionJob) -> String {
    if job.input.file.name == job.output_name {
        format!("source-{}", job.input.file.name)
    } else {
        job.input.file.name.clone()
    }
}
