// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::sync::Arc;
use storeflow::{AtomicContext, ContextData, FlowError, PipelineControl, TransactionBoundary};
use tracing::Level;

// --- Common Context Structs ---
#[derive(Clone, Debug, Default)]
pub struct TestContext {
  pub counter: i32,
  pub message: String,
  pub steps_executed: Vec<String>,
  pub should_stop_at: Option<String>,
}

// --- Common Error Type for Tests ---
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("Flow error: {0}")]
  Flow(String),

  #[error("Test handler failed: {0}")]
  Handler(String),
}

impl From<FlowError> for TestError {
  fn from(fe: FlowError) -> Self {
    TestError::Flow(format!("{:?}", fe))
  }
}

// --- Common Handler Creators ---
pub fn create_simple_handler(
  step_name: &'static str,
  message_to_append: &'static str,
) -> storeflow::Handler<TestContext, TestError> {
  Box::new(move |ctx: ContextData<TestContext>| {
    let step_name_owned = step_name.to_string();
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.counter += 1;
      guard.message.push_str(message_to_append);
      guard.steps_executed.push(step_name_owned.clone());
      tracing::debug!(target: "test_handlers", step = %step_name_owned, counter = guard.counter, "executed");
      if guard.should_stop_at.as_deref() == Some(step_name_owned.as_str()) {
        return Ok(PipelineControl::Stop);
      }
      Ok(PipelineControl::Continue)
    })
  })
}

pub fn create_failing_handler(
  step_name: &'static str,
  error_message: &'static str,
) -> storeflow::Handler<TestContext, TestError> {
  Box::new(move |ctx: ContextData<TestContext>| {
    let step_name_owned = step_name.to_string();
    let error_message_owned = error_message.to_string();
    Box::pin(async move {
      ctx.write().steps_executed.push(step_name_owned.clone());
      tracing::warn!(target: "test_handlers", step = %step_name_owned, "failing with: '{}'", error_message_owned);
      Err(TestError::Handler(error_message_owned))
    })
  })
}

// --- Recording transaction boundary ---
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryCall {
  Commit,
  Rollback,
}

#[derive(Default)]
pub struct RecordingBoundary {
  pub calls: Mutex<Vec<BoundaryCall>>,
  pub fail_commit: bool,
  pub fail_rollback: bool,
}

impl RecordingBoundary {
  pub fn failing_commit() -> Self {
    Self {
      fail_commit: true,
      ..Default::default()
    }
  }

  pub fn failing_rollback() -> Self {
    Self {
      fail_rollback: true,
      ..Default::default()
    }
  }

  pub fn calls(&self) -> Vec<BoundaryCall> {
    self.calls.lock().clone()
  }
}

#[async_trait]
impl TransactionBoundary for RecordingBoundary {
  async fn commit(&self) -> anyhow::Result<()> {
    self.calls.lock().push(BoundaryCall::Commit);
    if self.fail_commit {
      anyhow::bail!("commit refused");
    }
    Ok(())
  }

  async fn rollback(&self) -> anyhow::Result<()> {
    self.calls.lock().push(BoundaryCall::Rollback);
    if self.fail_rollback {
      anyhow::bail!("rollback refused");
    }
    Ok(())
  }
}

/// Context whose runs are settled against a `RecordingBoundary`.
pub struct AtomicTestContext {
  pub boundary: Arc<RecordingBoundary>,
  pub steps_executed: Vec<String>,
}

impl AtomicTestContext {
  pub fn new(boundary: Arc<RecordingBoundary>) -> Self {
    Self {
      boundary,
      steps_executed: Vec::new(),
    }
  }
}

impl AtomicContext for AtomicTestContext {
  fn boundary(&self) -> Arc<dyn TransactionBoundary> {
    self.boundary.clone()
  }
}

// --- Helper for Tracing Setup ---
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
