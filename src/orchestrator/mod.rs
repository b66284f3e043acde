//! Application-level orchestration.
//!
//! This module owns the pipeline state and stage sequencing. `Pipeline` drives stages
//! directly for the text and JSON modes; the controller serves the interactive UI and
//! serializes runs coming in over a command channel.

mod controller;
mod pipeline;
mod state;

#[cfg(feature = "tui")]
pub(crate) use controller::{run_controller, UiCommand};
pub use pipeline::Pipeline;
pub use state::PipelineState;
