//! Errors returned by pipeline operations.
//!
//! None of these is fatal: each leaves the pipeline in a well-defined state
//! from which any legal action can be taken again.

use super::state::{Action, PipelineState};
use crate::analysis::DispatchError;
use crate::camera::CameraError;
use crate::frame::FrameError;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Camera permission denied or camera unavailable
    #[error("Camera unavailable: {0}")]
    DeviceAccess(#[from] CameraError),

    /// No live session, no frame yet, or an unreadable upload
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// A submission is already pending (double click)
    #[error("An analysis request is already in progress")]
    RequestInProgress,

    /// The in-flight request was cancelled by `stop()`
    #[error("Analysis was cancelled")]
    Cancelled,

    #[error("Cannot {action} while {state}")]
    IllegalTransition { action: Action, state: PipelineState },

    #[error(transparent)]
    Dispatch(DispatchError),
}

impl From<DispatchError> for PipelineError {
    fn from(e: DispatchError) -> Self {
        match e {
            DispatchError::RequestInProgress => PipelineError::RequestInProgress,
            DispatchError::Cancelled => PipelineError::Cancelled,
            other => PipelineError::Dispatch(other),
        }
    }
}

impl PipelineError {
    /// Whether the error reflects a rejected double submission rather than a
    /// fault, and so should not be shown as a failure.
    pub fn is_silent(&self) -> bool {
        matches!(self, PipelineError::RequestInProgress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_error_mapping() {
        assert!(matches!(
            PipelineError::from(DispatchError::RequestInProgress),
            PipelineError::RequestInProgress
        ));
        assert!(matches!(
            PipelineError::from(DispatchError::Cancelled),
            PipelineError::Cancelled
        ));
    }

    #[test]
    fn test_display() {
        let err = PipelineError::IllegalTransition {
            action: Action::Enrich,
            state: PipelineState::Idle,
        };
        assert_eq!(err.to_string(), "Cannot enrich while idle");
        assert_eq!(
            PipelineError::from(FrameError::NoActiveSession).to_string(),
            "No active capture session"
        );
        assert!(PipelineError::from(CameraError::PermissionDenied)
            .to_string()
            .starts_with("Camera unavailable"));
    }

    #[test]
    fn test_only_double_submission_is_silent() {
        assert!(PipelineError::RequestInProgress.is_silent());
        assert!(!PipelineError::Cancelled.is_silent());
        assert!(!PipelineError::from(FrameError::NoActiveSession).is_silent());
    }
}
