//! Step implementations for the workflow state machine.
//!
//! Each step is a standalone async function that reads/writes
//! `WorkflowContext`, appends its trace name, and updates `ctx.step` to drive
//! the state machine forward. Collaborator failures are trapped with
//! `ctx.fail`, never propagated.

mod error_handling;
mod image_analysis;
mod image_generation;
mod input_processing;
mod response_synthesis;
mod routing;
mod text_generation;

pub(crate) use error_handling::error_handling;
pub(crate) use image_analysis::image_analysis;
pub(crate) use image_generation::image_generation;
pub(crate) use input_processing::input_processing;
pub(crate) use response_synthesis::response_synthesis;
pub(crate) use routing::routing;
pub(crate) use text_generation::text_generation;

pub const INPUT_PROCESSING: &str = "input_processing";
pub const ROUTING: &str = "routing";
pub const IMAGE_ANALYSIS: &str = "image_analysis";
pub const TEXT_GENERATION: &str = "text_generation";
pub const IMAGE_GENERATION: &str = "image_generation";
pub const RESPONSE_SYNTHESIS: &str = "response_synthesis";
pub const ERROR_HANDLING: &str = "error_handling";
