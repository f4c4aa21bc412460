//! Analysis request dispatcher.
//!
//! The only network-facing component of a pipeline. At most one request is in
//! flight per dispatcher; every transport or payload problem is folded into a
//! failed [`AnalysisResult`] instead of an error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use serde::de::DeserializeOwned;
use tokio::sync::watch;

use super::client::{InferenceClient, InferenceError};
use super::mode::{AnalysisMode, PipelineKind};
use super::result::{AnalysisResult, Findings};
use super::wire::{AnalyzeRequest, AnalyzeResponse, DetectRequest, FaceResponse, ObjectResponse};
use crate::frame::Frame;

/// A frame bound to the endpoint and mode it is sent with.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub frame: Frame,
    pub endpoint: String,
    pub mode: AnalysisMode,
}

/// Submissions that were not carried out.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("An analysis request is already in progress")]
    RequestInProgress,

    #[error("Analysis request was cancelled")]
    Cancelled,

    #[error("Mode '{mode}' is not available on the {kind} pipeline")]
    UnsupportedMode {
        mode: AnalysisMode,
        kind: PipelineKind,
    },
}

/// Resets the in-flight flag when the submission ends, however it ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct Dispatcher {
    kind: PipelineKind,
    client: InferenceClient,
    in_flight: AtomicBool,
    /// Cancellation token of the request currently in flight
    cancel: Mutex<Option<watch::Sender<bool>>>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("kind", &self.kind)
            .field("base_url", &self.client.base_url())
            .field("in_flight", &self.is_in_flight())
            .finish()
    }
}

impl Dispatcher {
    pub fn new(kind: PipelineKind, client: InferenceClient) -> Self {
        Self {
            kind,
            client,
            in_flight: AtomicBool::new(false),
            cancel: Mutex::new(None),
        }
    }

    pub fn kind(&self) -> PipelineKind {
        self.kind
    }

    pub fn client(&self) -> &InferenceClient {
        &self.client
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Send `frame` for analysis in `mode` and interpret the answer.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::RequestInProgress` without touching the network
    /// if another submission is pending, `DispatchError::Cancelled` if
    /// [`Dispatcher::cancel_in_flight`] fired before the answer arrived, and
    /// `DispatchError::UnsupportedMode` for a detection mode of the other kind.
    pub async fn submit(
        &self,
        frame: Frame,
        mode: AnalysisMode,
    ) -> Result<AnalysisResult, DispatchError> {
        if !mode.supported_by(self.kind) {
            return Err(DispatchError::UnsupportedMode {
                mode,
                kind: self.kind,
            });
        }

        let _guard = match InFlightGuard::acquire(&self.in_flight) {
            Some(guard) => guard,
            None => {
                log::debug!("Rejected {} submission: request already in flight", mode);
                return Err(DispatchError::RequestInProgress);
            }
        };

        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        *self.cancel_slot() = Some(cancel_tx);

        let request = self.build_request(frame, mode);
        log::info!("Submitting {} request to {}", mode, request.endpoint);

        let outcome = tokio::select! {
            result = self.execute(&request) => Ok(result),
            Ok(_) = cancel_rx.wait_for(|cancelled| *cancelled) => {
                log::info!("{} request to {} cancelled", mode, request.endpoint);
                Err(DispatchError::Cancelled)
            }
        };

        self.cancel_slot().take();
        outcome
    }

    /// Cancel the request in flight, if any. Returns whether one was signalled.
    pub fn cancel_in_flight(&self) -> bool {
        match self.cancel_slot().as_ref() {
            Some(tx) => tx.send(true).is_ok(),
            None => false,
        }
    }

    fn cancel_slot(&self) -> std::sync::MutexGuard<'_, Option<watch::Sender<bool>>> {
        self.cancel.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn build_request(&self, frame: Frame, mode: AnalysisMode) -> AnalysisRequest {
        let endpoints = self.client.endpoints();
        let path = if mode.is_narrative() {
            &endpoints.analyze_path
        } else {
            &endpoints.detect_path
        };
        AnalysisRequest {
            frame,
            endpoint: self.client.url(path),
            mode,
        }
    }

    async fn execute(&self, request: &AnalysisRequest) -> AnalysisResult {
        let mode = request.mode;
        let image = request.frame.encoded_image();
        let endpoints = self.client.endpoints();

        let response = match mode.analysis_type() {
            Some(analysis_type) => {
                let body = AnalyzeRequest {
                    image,
                    analysis_type,
                };
                self.client.post_json(&endpoints.analyze_path, &body).await
            }
            None => {
                let body = DetectRequest { image };
                self.client.post_json(&endpoints.detect_path, &body).await
            }
        };

        match response {
            Ok(text) => {
                log::debug!("{} response: {} bytes", mode, text.len());
                interpret(mode, &text, image)
            }
            Err(e) => self.transport_failure(mode, e).await,
        }
    }

    async fn transport_failure(&self, mode: AnalysisMode, error: InferenceError) -> AnalysisResult {
        let status = self.client.probe_health().await;
        log::warn!("{} request failed: {} (backend: {})", mode, error, status);
        AnalysisResult::failed(
            mode,
            format!("Network error: {}. Backend status: {}", error, status),
        )
    }
}

/// Turn a 2xx response body into a result for `mode`.
///
/// `submitted_image` stands in as the result image for narrative modes,
/// which return text only.
fn interpret(mode: AnalysisMode, body: &str, submitted_image: &str) -> AnalysisResult {
    match mode {
        AnalysisMode::Face => {
            let response: FaceResponse = match parse(mode, body) {
                Ok(r) => r,
                Err(failure) => return failure,
            };
            if !response.success {
                return service_failure(mode, response.error);
            }
            match response.result_image {
                Some(image) => AnalysisResult::succeeded(
                    mode,
                    image,
                    Findings::Face {
                        face_count: response.face_count.unwrap_or(0),
                        features_detected: response.features_detected.unwrap_or(false),
                    },
                ),
                None => malformed(mode, "missing result_image"),
            }
        }
        AnalysisMode::Object => {
            let response: ObjectResponse = match parse(mode, body) {
                Ok(r) => r,
                Err(failure) => return failure,
            };
            if !response.success {
                return service_failure(mode, response.error);
            }
            match response.result_image {
                Some(image) => {
                    let labels = response.detected_objects.unwrap_or_default();
                    let object_count = response.object_count.unwrap_or(labels.len());
                    AnalysisResult::succeeded(
                        mode,
                        image,
                        Findings::Object {
                            labels,
                            object_count,
                        },
                    )
                }
                None => malformed(mode, "missing result_image"),
            }
        }
        AnalysisMode::AiDirect | AnalysisMode::AiOnExistingResult => {
            let response: AnalyzeResponse = match parse(mode, body) {
                Ok(r) => r,
                Err(failure) => return failure,
            };
            if !response.success {
                return service_failure(mode, response.error);
            }
            match response.analysis {
                Some(text) => AnalysisResult::succeeded(
                    mode,
                    submitted_image.to_string(),
                    Findings::Narrative(text),
                ),
                None => malformed(mode, "missing analysis"),
            }
        }
    }
}

fn parse<T: DeserializeOwned>(mode: AnalysisMode, body: &str) -> Result<T, AnalysisResult> {
    serde_json::from_str(body).map_err(|e| malformed(mode, &e.to_string()))
}

fn malformed(mode: AnalysisMode, detail: &str) -> AnalysisResult {
    log::warn!("Malformed {} response: {}", mode, detail);
    AnalysisResult::failed(
        mode,
        format!("Failed to parse {} response: {}", mode.label(), detail),
    )
}

fn service_failure(mode: AnalysisMode, error: Option<String>) -> AnalysisResult {
    let error = error.unwrap_or_else(|| "Unknown error".to_string());
    log::warn!("{} reported failure: {}", mode.label(), error);
    AnalysisResult::failed(mode, format!("{} failed: {}", mode.label(), error))
}
