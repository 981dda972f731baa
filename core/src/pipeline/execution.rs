// core/src/pipeline/execution.rs

//! `Pipeline::run`: walks the steps in order and drives each phase.

use crate::core::context::Handler;
use crate::core::context_data::ContextData;
use crate::core::control::{PipelineControl, PipelineResult};
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;
use tracing::{event, info_span, instrument, Instrument, Level};

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Runs every step against `ctx_data`.
  ///
  /// A step whose `skip_if` returns true is passed over. A required step with
  /// no handlers fails the run with `FlowError::HandlerMissing`. The first
  /// handler error aborts the run and is returned as is.
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(
      context_type = %std::any::type_name::<TData>(),
      num_steps = self.steps.len(),
    ),
    err(Display)
  )]
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    event!(Level::DEBUG, "Pipeline execution starting.");

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();

      if let Some(skip_if) = &step_def.skip_if {
        if skip_if(ctx_data.clone()) {
          event!(Level::DEBUG, step_name, "Step skipped by its skip condition.");
          continue;
        }
      }

      let hooks = match self.hooks.get(step_name) {
        Some(hooks) if !hooks.is_empty() => hooks,
        _ if step_def.optional => {
          event!(Level::DEBUG, step_name, "Optional step has no handlers, skipping.");
          continue;
        }
        _ => {
          event!(Level::ERROR, step_name, "Required step has no handlers.");
          return Err(Err::from(FlowError::HandlerMissing {
            step_name: step_def.name.clone(),
          }));
        }
      };

      let step_span = info_span!("pipeline_step", step_name, step_index = step_idx);
      for (phase, handlers) in [("before", &hooks.before), ("on", &hooks.on), ("after", &hooks.after)] {
        let control = run_phase(handlers, &ctx_data)
          .instrument(step_span.clone())
          .await
          .map_err(|e| {
            event!(Level::ERROR, step_name, phase, error = %e, "Handler failed.");
            e
          })?;
        if control == PipelineControl::Stop {
          event!(Level::INFO, step_name, phase, "Pipeline stopped by a handler.");
          return Ok(PipelineResult::Stopped);
        }
      }
    }

    event!(Level::DEBUG, "Pipeline execution completed.");
    Ok(PipelineResult::Completed)
  }
}

async fn run_phase<TData, Err>(
  handlers: &[Handler<TData, Err>],
  ctx_data: &ContextData<TData>,
) -> Result<PipelineControl, Err>
where
  TData: 'static + Send + Sync,
{
  for handler in handlers {
    if handler(ctx_data.clone()).await? == PipelineControl::Stop {
      return Ok(PipelineControl::Stop);
    }
  }
  Ok(PipelineControl::Continue)
}
