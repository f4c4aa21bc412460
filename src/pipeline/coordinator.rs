//! The capture-analyze-render pipeline.
//!
//! One [`Pipeline`] owns one capture session, one dispatcher and one result
//! holder. All operations take `&self`, so a pipeline shared behind an `Arc`
//! can be stopped while a submission is awaiting the service.

use std::sync::Arc;

use super::error::PipelineError;
use super::state::{Action, PipelineState};
use crate::analysis::{AnalysisMode, AnalysisResult, Dispatcher, InferenceClient, PipelineKind};
use crate::camera::{CameraSettings, CaptureDevice, CaptureSession};
use crate::frame::{Frame, FrameExtractor, DEFAULT_JPEG_QUALITY};
use crate::results::{ResultHolder, ResultSnapshot};

/// What `stop()` does to a request that is still in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopPolicy {
    /// The request completes and its outcome is still delivered
    #[default]
    LetComplete,
    /// The request is cancelled and its outcome discarded
    CancelInFlight,
}

/// Construction options for a pipeline.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub camera: CameraSettings,
    pub jpeg_quality: u8,
    pub stop_policy: StopPolicy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            camera: CameraSettings::default(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            stop_policy: StopPolicy::default(),
        }
    }
}

#[derive(Debug)]
pub struct Pipeline {
    kind: PipelineKind,
    session: CaptureSession,
    extractor: FrameExtractor,
    dispatcher: Dispatcher,
    results: ResultHolder,
    stop_policy: StopPolicy,
}

impl Pipeline {
    pub fn new(
        kind: PipelineKind,
        device: Arc<dyn CaptureDevice>,
        client: InferenceClient,
        options: PipelineOptions,
    ) -> Self {
        Self {
            kind,
            session: CaptureSession::new(device, options.camera),
            extractor: FrameExtractor::new(options.jpeg_quality),
            dispatcher: Dispatcher::new(kind, client),
            results: ResultHolder::new(),
            stop_policy: options.stop_policy,
        }
    }

    pub fn kind(&self) -> PipelineKind {
        self.kind
    }

    pub fn stop_policy(&self) -> StopPolicy {
        self.stop_policy
    }

    pub fn is_streaming(&self) -> bool {
        self.session.is_active()
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PipelineState {
        PipelineState::derive(
            self.session.is_active(),
            self.dispatcher.is_in_flight(),
            self.results.snapshot().has_success(),
        )
    }

    /// What the rendering surface should show right now.
    pub fn snapshot(&self) -> ResultSnapshot {
        self.results.snapshot()
    }

    /// Acquire the camera. Once access is granted, the result held when
    /// `start` was accepted is cleared; one delivered while the grant was
    /// pending is kept.
    ///
    /// # Errors
    /// * `PipelineError::DeviceAccess` - access denied; nothing changes
    /// * `PipelineError::IllegalTransition` - already streaming or processing
    pub async fn start(&self) -> Result<(), PipelineError> {
        self.ensure(Action::Start)?;
        let stale = self.results.generation();

        if let Err(e) = self.session.start().await {
            log::warn!("{} pipeline: camera access failed: {}", self.kind, e);
            return Err(PipelineError::DeviceAccess(e));
        }

        if !self.results.clear_if_unchanged(stale) {
            log::debug!("{} pipeline: keeping result delivered during start", self.kind);
        }
        log::info!("{} pipeline: {}", self.kind, self.state());
        Ok(())
    }

    /// Release the camera. Legal in every state and idempotent.
    ///
    /// A request in flight is left alone under [`StopPolicy::LetComplete`]
    /// and cancelled under [`StopPolicy::CancelInFlight`].
    pub fn stop(&self) {
        self.session.stop();
        self.results.clear_error();

        if self.stop_policy == StopPolicy::CancelInFlight && self.dispatcher.cancel_in_flight() {
            log::info!("{} pipeline: cancelled in-flight request on stop", self.kind);
        }
    }

    /// Grab the current live frame and run detection on it.
    pub async fn capture(&self) -> Result<AnalysisResult, PipelineError> {
        self.ensure(Action::Capture)?;
        let frame = self.extractor.from_live_frame(&self.session)?;
        self.dispatch(frame, self.kind.detection_mode()).await
    }

    /// Grab the current live frame and ask for a narrative analysis of it.
    pub async fn analyze_live(&self) -> Result<AnalysisResult, PipelineError> {
        self.ensure(Action::AnalyzeLive)?;
        let frame = self.extractor.from_live_frame(&self.session)?;
        self.dispatch(frame, AnalysisMode::AiDirect).await
    }

    /// Validate an uploaded file and run detection on it.
    ///
    /// `file_bytes` is only read; the frame carries its own copy.
    pub async fn upload(&self, file_bytes: &[u8]) -> Result<AnalysisResult, PipelineError> {
        self.ensure(Action::Upload)?;
        let frame = self.extractor.from_uploaded_file(file_bytes)?;
        self.dispatch(frame, self.kind.detection_mode()).await
    }

    /// Ask for a narrative about the held result and attach it.
    ///
    /// The held findings are never replaced: a failed enrichment is recorded
    /// in the error field only.
    pub async fn enrich(&self) -> Result<AnalysisResult, PipelineError> {
        self.ensure(Action::Enrich)?;

        let image = self
            .results
            .snapshot()
            .result
            .and_then(|r| r.annotated_image().map(str::to_string))
            .ok_or(PipelineError::IllegalTransition {
                action: Action::Enrich,
                state: PipelineState::Idle,
            })?;
        let frame = Frame::from_data_uri(&image)?;

        let outcome = self
            .dispatcher
            .submit(frame, AnalysisMode::AiOnExistingResult)
            .await?;

        match (outcome.narrative(), outcome.error_message()) {
            (Some(narrative), _) => {
                self.results.attach_narrative(narrative);
            }
            (None, Some(error)) => self.results.set_error(error),
            (None, None) => {}
        }
        Ok(outcome)
    }

    fn ensure(&self, action: Action) -> Result<(), PipelineError> {
        let state = self.state();
        if state.permits(action, self.session.is_active()) {
            return Ok(());
        }
        if state == PipelineState::Processing {
            log::debug!("{} pipeline: {} rejected while processing", self.kind, action);
            return Err(PipelineError::RequestInProgress);
        }
        log::warn!("{} pipeline: cannot {} while {}", self.kind, action, state);
        Err(PipelineError::IllegalTransition { action, state })
    }

    async fn dispatch(
        &self,
        frame: Frame,
        mode: AnalysisMode,
    ) -> Result<AnalysisResult, PipelineError> {
        let result = self.dispatcher.submit(frame, mode).await?;

        // Delivered even if the session was stopped while waiting
        self.results.set(result.clone());
        if result.is_success() {
            log::info!("{} pipeline: {} succeeded", self.kind, mode);
        } else {
            log::warn!(
                "{} pipeline: {} failed: {}",
                self.kind,
                mode,
                result.error_message().unwrap_or_default()
            );
        }
        Ok(result)
    }
}
