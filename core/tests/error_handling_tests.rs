// tests/error_handling_tests.rs
mod common;
use common::*;
use serial_test::serial;
use std::error::Error as _;
use storeflow::{ContextData, FlowError, Pipeline, PipelineControl};

#[tokio::test]
#[serial]
async fn test_pipeline_run_catches_handler_missing() {
  setup_tracing();
  let pipeline = Pipeline::<TestContext, TestError>::new(&[("missing", false, None)]);
  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx).await;
  match result.unwrap_err() {
    TestError::Flow(s) => {
      assert!(s.contains("HandlerMissing"));
      assert!(s.contains("missing"));
    }
    other => panic!("Expected TestError::Flow(HandlerMissing), got {:?}", other),
  }
}

// A pipeline whose error type IS FlowError.
#[tokio::test]
#[serial]
async fn test_pipeline_with_flow_error_type() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, FlowError>::new(&[("task", false, None)]);

  pipeline.on_step("task", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.write().counter = 1;
      Ok::<PipelineControl, FlowError>(PipelineControl::Continue)
    })
  });

  let ctx = ContextData::new(TestContext::default());
  assert!(pipeline.run(ctx.clone()).await.is_ok());
  assert_eq!(ctx.read().counter, 1);

  let mut failing_pipeline = Pipeline::<TestContext, FlowError>::new(&[("fail_task", false, None)]);
  failing_pipeline.on_step("fail_task", |_ctx| async move {
    Err::<PipelineControl, anyhow::Error>(anyhow::anyhow!("Intentional failure"))
  });
  let fail_result = failing_pipeline.run(ContextData::new(TestContext::default())).await;
  match fail_result.unwrap_err() {
    err @ FlowError::HandlerError { .. } => {
      assert_eq!(err.source().map(|s| s.to_string()), Some("Intentional failure".to_string()));
    }
    other => panic!("Expected FlowError::HandlerError, got {:?}", other),
  }
}

#[test]
fn test_flow_error_messages() {
  let missing = FlowError::HandlerMissing {
    step_name: "reserve_items".to_string(),
  };
  assert_eq!(missing.to_string(), "Handler missing for non-optional step: reserve_items");

  let commit = FlowError::CommitFailed {
    source: anyhow::anyhow!("connection reset"),
  };
  assert!(commit.to_string().contains("connection reset"));
}
