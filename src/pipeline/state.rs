//! Lifecycle states and the transition table.

use std::fmt;

/// Mutually exclusive lifecycle states of a pipeline.
///
/// Derived from the session, the dispatcher and the result holder rather
/// than stored, so it can never disagree with them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// No session, no pending request, no successful result
    Idle,
    /// Session active, no successful result
    Streaming,
    /// A submission is in flight
    Processing,
    /// A successful result is held; the session may or may not be active
    ResultReady,
}

/// User intents forwarded by the rendering surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    Stop,
    Capture,
    Upload,
    /// Narrative analysis of a freshly captured live frame
    AnalyzeLive,
    /// Narrative analysis of the held result
    Enrich,
}

impl PipelineState {
    pub fn derive(session_active: bool, processing: bool, has_success: bool) -> Self {
        if processing {
            PipelineState::Processing
        } else if has_success {
            PipelineState::ResultReady
        } else if session_active {
            PipelineState::Streaming
        } else {
            PipelineState::Idle
        }
    }

    /// Whether `action` is legal in this state.
    ///
    /// `session_active` disambiguates `ResultReady`, which can be reached
    /// with or without a live session.
    pub fn permits(self, action: Action, session_active: bool) -> bool {
        use PipelineState::*;
        match action {
            // Stopping is always allowed; an in-flight request outlives it
            Action::Stop => true,
            Action::Start => !session_active && matches!(self, Idle | ResultReady),
            Action::Capture | Action::AnalyzeLive => {
                session_active && matches!(self, Streaming | ResultReady)
            }
            Action::Upload => self != Processing,
            Action::Enrich => self == ResultReady,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::Streaming => "streaming",
            PipelineState::Processing => "processing",
            PipelineState::ResultReady => "result ready",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Start => "start",
            Action::Stop => "stop",
            Action::Capture => "capture",
            Action::Upload => "upload",
            Action::AnalyzeLive => "analyze live frame",
            Action::Enrich => "enrich",
        };
        f.write_str(name)
    }
}
