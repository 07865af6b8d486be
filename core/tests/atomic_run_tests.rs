// tests/atomic_run_tests.rs
mod common;

use common::*;
use serial_test::serial;
use std::sync::Arc;
use storeflow::{ContextData, Pipeline, PipelineControl, PipelineResult};

fn recording_pipeline(
  fail_at: Option<&'static str>,
  stop_at: Option<&'static str>,
) -> Pipeline<AtomicTestContext, TestError> {
  let mut pipeline =
    Pipeline::<AtomicTestContext, TestError>::new(&[("first", false, None), ("second", false, None)]);
  for step in ["first", "second"] {
    pipeline.on_step(step, move |ctx: ContextData<AtomicTestContext>| async move {
      ctx.write().steps_executed.push(step.to_string());
      if fail_at == Some(step) {
        return Err(TestError::Handler(format!("{} failed", step)));
      }
      if stop_at == Some(step) {
        return Ok(PipelineControl::Stop);
      }
      Ok(PipelineControl::Continue)
    });
  }
  pipeline
}

#[tokio::test]
#[serial]
async fn test_completed_run_commits_once() {
  setup_tracing();
  let boundary = Arc::new(RecordingBoundary::default());
  let ctx = ContextData::new(AtomicTestContext::new(boundary.clone()));

  let result = recording_pipeline(None, None).run_atomic(ctx.clone()).await;

  assert_eq!(result.unwrap(), PipelineResult::Completed);
  assert_eq!(boundary.calls(), vec![BoundaryCall::Commit]);
  assert_eq!(ctx.read().steps_executed, vec!["first", "second"]);
}

#[tokio::test]
#[serial]
async fn test_handler_error_rolls_back_and_returns_error() {
  setup_tracing();
  let boundary = Arc::new(RecordingBoundary::default());
  let ctx = ContextData::new(AtomicTestContext::new(boundary.clone()));

  let result = recording_pipeline(Some("second"), None).run_atomic(ctx.clone()).await;

  assert_eq!(result.unwrap_err(), TestError::Handler("second failed".to_string()));
  assert_eq!(boundary.calls(), vec![BoundaryCall::Rollback]);
}

#[tokio::test]
#[serial]
async fn test_stopped_run_rolls_back() {
  setup_tracing();
  let boundary = Arc::new(RecordingBoundary::default());
  let ctx = ContextData::new(AtomicTestContext::new(boundary.clone()));

  let result = recording_pipeline(None, Some("first")).run_atomic(ctx.clone()).await;

  assert_eq!(result.unwrap(), PipelineResult::Stopped);
  assert_eq!(boundary.calls(), vec![BoundaryCall::Rollback]);
  assert_eq!(ctx.read().steps_executed, vec!["first"]);
}

#[tokio::test]
#[serial]
async fn test_commit_failure_surfaces_as_commit_failed() {
  setup_tracing();
  let boundary = Arc::new(RecordingBoundary::failing_commit());
  let ctx = ContextData::new(AtomicTestContext::new(boundary.clone()));

  let result = recording_pipeline(None, None).run_atomic(ctx).await;

  match result {
    Err(TestError::Flow(s)) => assert!(s.contains("CommitFailed")),
    other => panic!("Expected CommitFailed, got {:?}", other),
  }
  assert_eq!(boundary.calls(), vec![BoundaryCall::Commit]);
}

#[tokio::test]
#[serial]
async fn test_rollback_failure_keeps_original_handler_error() {
  setup_tracing();
  let boundary = Arc::new(RecordingBoundary::failing_rollback());
  let ctx = ContextData::new(AtomicTestContext::new(boundary.clone()));

  let result = recording_pipeline(Some("first"), None).run_atomic(ctx).await;

  assert_eq!(result.unwrap_err(), TestError::Handler("first failed".to_string()));
  assert_eq!(boundary.calls(), vec![BoundaryCall::Rollback]);
}

#[tokio::test]
#[serial]
async fn test_rollback_failure_after_stop_is_reported() {
  setup_tracing();
  let boundary = Arc::new(RecordingBoundary::failing_rollback());
  let ctx = ContextData::new(AtomicTestContext::new(boundary.clone()));

  let result = recording_pipeline(None, Some("second")).run_atomic(ctx).await;

  assert!(matches!(result, Err(TestError::Flow(ref s)) if s.contains("RollbackFailed")));
}
