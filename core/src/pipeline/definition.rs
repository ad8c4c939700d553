// mandi/src/pipeline/definition.rs

//! The `Pipeline<T, Err>` struct and its structural editing methods.

use crate::core::context::Handler;
use crate::core::step::{SkipCondition, StageDef};
use crate::error::PipelineError;
use std::collections::HashMap;

/// When a handler runs relative to the other handlers of its stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
  Before,
  On,
  After,
}

impl Phase {
  pub(crate) const ORDER: [Phase; 3] = [Phase::Before, Phase::On, Phase::After];

  pub(crate) fn label(self) -> &'static str {
    match self {
      Phase::Before => "before",
      Phase::On => "on",
      Phase::After => "after",
    }
  }
}

/// An ordered list of named stages with async handlers, run against a shared
/// `ContextData<T>`.
///
/// `Err` is the error type handlers return; it must absorb `PipelineError` so wiring
/// mistakes found at run time (a required stage with no handlers) surface through the
/// same channel.
pub struct Pipeline<T, Err>
where
  T: 'static + Send + Sync,
  Err: std::error::Error + From<PipelineError> + Send + Sync + 'static,
{
  pub(crate) stages: Vec<StageDef<T>>,
  pub(crate) handlers: HashMap<(String, Phase), Vec<Handler<T, Err>>>,
}

impl<T, Err> Pipeline<T, Err>
where
  T: 'static + Send + Sync,
  Err: std::error::Error + From<PipelineError> + Send + Sync + 'static,
{
  pub fn new(stages: impl IntoIterator<Item = StageDef<T>>) -> Self {
    Self {
      stages: stages.into_iter().collect(),
      handlers: HashMap::new(),
    }
  }

  pub fn stage_names(&self) -> Vec<&str> {
    self.stages.iter().map(|s| s.name.as_str()).collect()
  }

  pub(crate) fn position(&self, stage: &str) -> Result<usize, PipelineError> {
    self
      .stages
      .iter()
      .position(|s| s.name == stage)
      .ok_or_else(|| PipelineError::StageNotFound { stage: stage.to_string() })
  }

  pub(crate) fn handler_count(&self, stage: &str) -> usize {
    Phase::ORDER
      .iter()
      .map(|phase| {
        self
          .handlers
          .get(&(stage.to_string(), *phase))
          .map_or(0, Vec::len)
      })
      .sum()
  }

  pub fn insert_before(&mut self, existing: &str, stage: StageDef<T>) -> Result<(), PipelineError> {
    let idx = self.position(existing)?;
    self.stages.insert(idx, stage);
    Ok(())
  }

  pub fn insert_after(&mut self, existing: &str, stage: StageDef<T>) -> Result<(), PipelineError> {
    let idx = self.position(existing)?;
    self.stages.insert(idx + 1, stage);
    Ok(())
  }

  /// Removes a stage and its handlers. Removing an unknown stage is a no-op.
  pub fn remove_stage(&mut self, stage: &str) {
    if let Ok(idx) = self.position(stage) {
      self.stages.remove(idx);
      self.handlers.retain(|(name, _), _| name != stage);
    }
  }

  pub fn set_skip_condition(&mut self, stage: &str, skip_if: Option<SkipCondition<T>>) -> Result<(), PipelineError> {
    let idx = self.position(stage)?;
    self.stages[idx].skip_if = skip_if;
    Ok(())
  }
}
