//! Result state holder.
//!
//! Holds the latest analysis outcome of one pipeline together with an
//! optional narrative and a non-blocking error field. Readers get a
//! [`ResultSnapshot`] taken under a single lock, so they never observe a
//! result from one submission paired with a narrative or error from another.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::analysis::AnalysisResult;

/// Everything the rendering surface needs, captured at one instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSnapshot {
    pub result: Option<Arc<AnalysisResult>>,
    /// Narrative attached to `result`
    pub narrative: Option<String>,
    /// Error to show until the next action
    pub error: Option<String>,
}

impl ResultSnapshot {
    /// Whether a successful result is held.
    pub fn has_success(&self) -> bool {
        self.result.as_ref().is_some_and(|r| r.is_success())
    }
}

#[derive(Debug, Default)]
pub struct ResultHolder {
    state: Mutex<Held>,
}

#[derive(Debug, Default)]
struct Held {
    snapshot: ResultSnapshot,
    /// Bumped on every delivered result
    generation: u64,
}

impl ResultHolder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the held result wholesale.
    ///
    /// Any narrative belonged to the previous result and is dropped; the error
    /// field mirrors the new result's error message.
    pub fn set(&self, result: AnalysisResult) {
        let error = result.error_message().map(str::to_string);
        let narrative = result.narrative().map(str::to_string);
        let mut held = self.lock();
        held.snapshot = ResultSnapshot {
            result: Some(Arc::new(result)),
            narrative,
            error,
        };
        held.generation += 1;
    }

    /// Attach a narrative to the held result without touching its findings.
    ///
    /// Returns `false` (and changes nothing) when no result is held.
    pub fn attach_narrative(&self, narrative: impl Into<String>) -> bool {
        let mut held = self.lock();
        if held.snapshot.result.is_none() {
            return false;
        }
        held.snapshot.narrative = Some(narrative.into());
        held.snapshot.error = None;
        true
    }

    /// Record an error without replacing the held result.
    pub fn set_error(&self, message: impl Into<String>) {
        self.lock().snapshot.error = Some(message.into());
    }

    pub fn clear_error(&self) {
        self.lock().snapshot.error = None;
    }

    /// Return to the no-result state.
    pub fn clear(&self) {
        self.lock().snapshot = ResultSnapshot::default();
    }

    /// Marker for [`ResultHolder::clear_if_unchanged`].
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Clear only if no result was delivered since `generation` was read.
    ///
    /// Returns whether the holder was cleared.
    pub fn clear_if_unchanged(&self, generation: u64) -> bool {
        let mut held = self.lock();
        if held.generation != generation {
            return false;
        }
        held.snapshot = ResultSnapshot::default();
        true
    }

    pub fn snapshot(&self) -> ResultSnapshot {
        self.lock().snapshot.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Held> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
