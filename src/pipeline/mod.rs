//! Pipeline coordination.
//!
//! [`Pipeline`] ties a capture session, the frame extractor, the dispatcher
//! and the result holder together and gates every user action through the
//! [`PipelineState`] transition table.

mod coordinator;
mod error;
mod state;

pub use coordinator::{Pipeline, PipelineOptions, StopPolicy};
pub use error::PipelineError;
pub use state::{Action, PipelineState};
