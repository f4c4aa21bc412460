//! Remote analysis of frames.
//!
//! [`InferenceClient`] speaks HTTP to one inference service; [`Dispatcher`]
//! enforces one request in flight per pipeline and turns every answer
//! (or lack of one) into an [`AnalysisResult`].

mod client;
mod dispatcher;
mod mode;
mod result;
mod wire;

pub use client::{
    default_base_url, BackendStatus, ClientOptions, Endpoints, InferenceClient, InferenceError,
    ANALYZE_PATH, DEFAULT_CONNECT_TIMEOUT, DEFAULT_FACE_URL, DEFAULT_OBJECT_URL, HEALTH_PATH,
};
pub use dispatcher::{AnalysisRequest, DispatchError, Dispatcher};
pub use mode::{AnalysisMode, PipelineKind};
pub use result::{AnalysisResult, Findings};
