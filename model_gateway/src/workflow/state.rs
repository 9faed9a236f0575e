//! State machine types for the request-routing workflow.

/// Position of a request in the workflow.
///
/// ```text
/// InputProcessing → Route → { ImageAnalysis | TextGeneration | ImageGeneration }
///                                   → ResponseSynthesis → End
///            any failure → ErrorHandling → End
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorkflowStep {
    // ── Shared initial states ───────────────────────────────────
    /// Entry state for every request.
    InputProcessing,
    /// Input is ready; classify and dispatch.
    Route,

    // ── Operation branches ──────────────────────────────────────
    ImageAnalysis,
    TextGeneration,
    ImageGeneration,

    // ── Terminal ────────────────────────────────────────────────
    ResponseSynthesis,
    ErrorHandling,
    /// Processing is complete. The driver breaks out of the loop.
    End,
}

/// The result of executing a single step.
pub(crate) enum StepResult {
    /// The step updated `ctx.step`. The driver should continue the loop.
    Continue,
    /// Terminal: the workflow state is final.
    Finished,
}
