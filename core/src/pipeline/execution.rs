// mandi/src/pipeline/execution.rs

//! `Pipeline::run`.

use crate::core::context_data::ContextData;
use crate::core::control::{PipelineOutcome, StageControl};
use crate::error::PipelineError;
use crate::pipeline::definition::{Phase, Pipeline};
use tracing::{event, instrument, span, Instrument, Level};

impl<T, Err> Pipeline<T, Err>
where
  T: 'static + Send + Sync,
  Err: std::error::Error + From<PipelineError> + Send + Sync + 'static,
{
  /// Runs every stage in order against `ctx`.
  ///
  /// For each stage: evaluate `skip_if`, then run the `before`, `on` and `after`
  /// handlers in registration order. The first handler error aborts the run and is
  /// returned as-is. A non-optional stage with no handlers at all fails with
  /// `PipelineError::HandlerMissing`.
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(context_type = %std::any::type_name::<T>(), num_stages = self.stages.len()),
    err(Display)
  )]
  pub async fn run(&self, ctx: ContextData<T>) -> Result<PipelineOutcome, Err> {
    event!(Level::DEBUG, "Pipeline run starting.");

    for (stage_idx, stage) in self.stages.iter().enumerate() {
      let stage_span = span!(
        Level::DEBUG,
        "pipeline_stage",
        stage = stage.name.as_str(),
        stage_index = stage_idx
      );

      if let Some(skip) = &stage.skip_if {
        if skip(&ctx) {
          stage_span.in_scope(|| event!(Level::TRACE, "Stage skipped by condition."));
          continue;
        }
      }

      if self.handler_count(&stage.name) == 0 {
        if stage.optional {
          stage_span.in_scope(|| event!(Level::TRACE, "Optional stage has no handlers, skipping."));
          continue;
        }
        stage_span.in_scope(|| event!(Level::ERROR, "Non-optional stage has no handlers."));
        return Err(Err::from(PipelineError::HandlerMissing {
          stage: stage.name.clone(),
        }));
      }

      for phase in Phase::ORDER {
        let Some(handlers) = self.handlers.get(&(stage.name.clone(), phase)) else {
          continue;
        };
        for (handler_idx, handler) in handlers.iter().enumerate() {
          // The span is attached to the future, never held across the await.
          match handler(ctx.clone()).instrument(stage_span.clone()).await {
            Ok(StageControl::Continue) => {}
            Ok(StageControl::Stop) => {
              stage_span.in_scope(|| {
                event!(Level::DEBUG, phase = phase.label(), handler_idx, "Pipeline stopped by handler.")
              });
              return Ok(PipelineOutcome::Stopped);
            }
            Err(e) => {
              stage_span.in_scope(|| {
                event!(Level::WARN, phase = phase.label(), handler_idx, error = %e, "Stage handler failed.")
              });
              return Err(e);
            }
          }
        }
      }
    }

    event!(Level::DEBUG, "Pipeline run completed.");
    Ok(PipelineOutcome::Completed)
  }
}
