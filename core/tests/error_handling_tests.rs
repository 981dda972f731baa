// core/tests/error_handling_tests.rs
mod common;

use common::*;
use flow::{ContextData, FlowError, Pipeline, PipelineControl};
use serial_test::serial;

#[tokio::test]
#[serial]
async fn required_step_without_handler_fails() {
  setup_tracing();
  let pipeline = Pipeline::<TrailContext, TestError>::new(&[("missing", false, None)]);
  let result = pipeline.run(ContextData::new(TrailContext::default())).await;
  match result.unwrap_err() {
    TestError::Flow(s) => {
      assert!(s.contains("HandlerMissing"));
      assert!(s.contains("missing"));
    }
    other => panic!("expected a flow error, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn pipeline_can_use_flow_error_directly() {
  setup_tracing();
  let mut pipeline = Pipeline::<TrailContext, FlowError>::new(&[("fail", false, None)]);
  pipeline.on_root("fail", |_ctx: ContextData<TrailContext>| {
    Box::pin(async move { Err::<PipelineControl, _>(FlowError::Internal("boom".to_string())) })
  });

  match pipeline.run(ContextData::new(TrailContext::default())).await {
    Err(FlowError::Internal(s)) => assert_eq!(s, "boom"),
    other => panic!("expected FlowError::Internal, got {:?}", other),
  }
}

#[test]
fn anyhow_errors_become_handler_errors() {
  let err: FlowError = anyhow::anyhow!("database unavailable").into();
  assert!(matches!(err, FlowError::HandlerError { .. }));
  assert!(err.to_string().contains("database unavailable"));
}
