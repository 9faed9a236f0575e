//! Single state machine driver for the workflow.
//!
//! One function, one loop, one match. Dispatches the step named by
//! `ctx.step` until a step reports the workflow finished.

use super::{
    context::WorkflowContext,
    state::{StepResult, WorkflowStep},
    steps,
};

/// Execute the state machine to completion.
///
/// Every path ends in `ResponseSynthesis` or `ErrorHandling`; both return
/// `StepResult::Finished`, leaving `ctx.state` ready for the envelope builder.
pub(crate) async fn execute(ctx: &mut WorkflowContext) {
    loop {
        let result = match ctx.step {
            WorkflowStep::InputProcessing => steps::input_processing(ctx).await,

            WorkflowStep::Route => steps::routing(ctx).await,

            WorkflowStep::ImageAnalysis => steps::image_analysis(ctx).await,

            WorkflowStep::TextGeneration => steps::text_generation(ctx).await,

            WorkflowStep::ImageGeneration => steps::image_generation(ctx).await,

            WorkflowStep::ResponseSynthesis => steps::response_synthesis(ctx).await,

            WorkflowStep::ErrorHandling => steps::error_handling(ctx).await,

            WorkflowStep::End => StepResult::Finished,
        };

        match result {
            StepResult::Continue => continue,
            StepResult::Finished => return,
        }
    }
}
