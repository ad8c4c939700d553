// mandi/src/core/control.rs

//! Flow signals returned by stage handlers and the outcome of a whole run.

/// Returned by each handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageControl {
  Continue,
  /// Halt the run. Remaining handlers and stages are not executed.
  Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOutcome {
  /// Every stage ran or was skipped.
  Completed,
  /// A handler returned `StageControl::Stop`.
  Stopped,
}
