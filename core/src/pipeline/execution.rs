// core/src/pipeline/execution.rs

//! `Pipeline::run()`: executes the steps and their handlers in order.

use crate::error::PipelineError;
use crate::pipeline::context_data::ContextData;
use crate::pipeline::control::{PipelineControl, PipelineResult};
use crate::pipeline::definition::{Handler, Pipeline};
use tracing::{event, info_span, Instrument, Level};

enum PhaseOutcome<Err> {
  Continue,
  Stopped,
  Failed(Err),
}

async fn run_phase<TData, Err>(
  phase: &'static str,
  handlers: Option<&Vec<Handler<TData, Err>>>,
  ctx_data: &ContextData<TData>,
) -> PhaseOutcome<Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + Send + Sync + 'static,
{
  let Some(handlers) = handlers else {
    return PhaseOutcome::Continue;
  };
  for (handler_idx, handler_fn) in handlers.iter().enumerate() {
    let handler_span = tracing::debug_span!("handler", phase, handler_index = handler_idx);
    match handler_fn(ctx_data.clone()).instrument(handler_span).await {
      Ok(PipelineControl::Continue) => {}
      Ok(PipelineControl::Stop) => {
        event!(Level::INFO, phase, "Pipeline stopped by a handler.");
        return PhaseOutcome::Stopped;
      }
      Err(e) => {
        event!(Level::WARN, phase, error = %e, "Handler failed.");
        return PhaseOutcome::Failed(e);
      }
    }
  }
  PhaseOutcome::Continue
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<PipelineError> + Send + Sync + 'static,
{
  /// Executes the pipeline against `ctx_data`.
  ///
  /// Handler errors are returned as-is. A non-optional step with no handlers
  /// at all yields `PipelineError::HandlerMissing` converted into `Err`.
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    event!(Level::DEBUG, pipeline = %self.name, "Pipeline execution starting.");

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();

      if let Some(skip_cond_fn) = &step_def.skip_if {
        if skip_cond_fn(ctx_data.clone()) {
          event!(Level::DEBUG, pipeline = %self.name, step = step_name, "Step skipped.");
          continue;
        }
      }

      let before = self.before.get(step_name).filter(|v| !v.is_empty());
      let on = self.on.get(step_name).filter(|v| !v.is_empty());
      let after = self.after.get(step_name).filter(|v| !v.is_empty());

      if before.is_none() && on.is_none() && after.is_none() {
        if step_def.optional {
          continue;
        }
        event!(Level::ERROR, pipeline = %self.name, step = step_name, "Non-optional step has no handlers.");
        return Err(Err::from(PipelineError::HandlerMissing {
          step_name: step_def.name.clone(),
        }));
      }

      let step_span = info_span!("pipeline_step", pipeline = %self.name, step = step_name, step_index = step_idx);
      let outcome = async {
        for (phase, handlers) in [("before", before), ("on", on), ("after", after)] {
          match run_phase(phase, handlers, &ctx_data).await {
            PhaseOutcome::Continue => {}
            other => return other,
          }
        }
        PhaseOutcome::Continue
      }
      .instrument(step_span)
      .await;

      match outcome {
        PhaseOutcome::Continue => {}
        PhaseOutcome::Stopped => return Ok(PipelineResult::Stopped),
        PhaseOutcome::Failed(e) => return Err(e),
      }
    }

    event!(Level::DEBUG, pipeline = %self.name, "Pipeline execution completed.");
    Ok(PipelineResult::Completed)
  }
}
