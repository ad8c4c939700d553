// mandi/src/pipeline/hooks.rs

//! Handler registration for pipeline stages.

use crate::core::context::Handler;
use crate::core::context_data::ContextData;
use crate::core::control::StageControl;
use crate::error::PipelineError;
use crate::pipeline::definition::{Phase, Pipeline};
use std::future::Future;

impl<T, Err> Pipeline<T, Err>
where
  T: 'static + Send + Sync,
  Err: std::error::Error + From<PipelineError> + Send + Sync + 'static,
{
  /// Registers a handler for `stage` in the given phase.
  ///
  /// The handler's own error type only needs to convert into the pipeline's `Err`.
  /// Panics if the stage is not part of the pipeline; a misspelled stage name is a
  /// setup bug, not a runtime condition.
  pub fn add_handler<F, HandlerErr>(
    &mut self,
    stage: &str,
    phase: Phase,
    handler_fn: impl Fn(ContextData<T>) -> F + Send + Sync + 'static,
  ) -> &mut Self
  where
    F: Future<Output = Result<StageControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<Err> + Send + Sync + 'static,
  {
    if let Err(e) = self.position(stage) {
      panic!("mandi pipeline setup error: {}", e);
    }
    let boxed: Handler<T, Err> = Box::new(move |ctx| {
      let fut = handler_fn(ctx);
      Box::pin(async move { fut.await.map_err(Into::into) })
    });
    self
      .handlers
      .entry((stage.to_string(), phase))
      .or_default()
      .push(boxed);
    self
  }

  pub fn before<F, HandlerErr>(
    &mut self,
    stage: &str,
    handler_fn: impl Fn(ContextData<T>) -> F + Send + Sync + 'static,
  ) -> &mut Self
  where
    F: Future<Output = Result<StageControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<Err> + Send + Sync + 'static,
  {
    self.add_handler(stage, Phase::Before, handler_fn)
  }

  pub fn on<F, HandlerErr>(
    &mut self,
    stage: &str,
    handler_fn: impl Fn(ContextData<T>) -> F + Send + Sync + 'static,
  ) -> &mut Self
  where
    F: Future<Output = Result<StageControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<Err> + Send + Sync + 'static,
  {
    self.add_handler(stage, Phase::On, handler_fn)
  }

  pub fn after<F, HandlerErr>(
    &mut self,
    stage: &str,
    handler_fn: impl Fn(ContextData<T>) -> F + Send + Sync + 'static,
  ) -> &mut Self
  where
    F: Future<Output = Result<StageControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<Err> + Send + Sync + 'static,
  {
    self.add_handler(stage, Phase::After, handler_fn)
  }
}
