// tests/context_management_tests.rs
mod common;

use common::*;
use serial_test::serial;
use storeflow::{ContextData, Pipeline, PipelineControl};

#[tokio::test]
#[serial]
async fn test_context_data_is_shared_and_modified() {
  setup_tracing();
  let mut pipeline =
    Pipeline::<TestContext, TestError>::new(&[("step1_modify", false, None), ("step2_read_modify", false, None)]);

  pipeline.on_step("step1_modify", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.counter = 10;
      guard.message = "SetByStep1".to_string();
      Ok::<PipelineControl, TestError>(PipelineControl::Continue)
    })
  });

  pipeline.on_step("step2_read_modify", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      assert_eq!(guard.counter, 10);
      assert_eq!(guard.message, "SetByStep1");
      guard.counter += 5;
      guard.message.push_str("_ThenStep2");
      Ok::<PipelineControl, TestError>(PipelineControl::Continue)
    })
  });

  let initial_ctx = ContextData::new(TestContext::default());
  pipeline.run(initial_ctx.clone()).await.unwrap();

  let final_guard = initial_ctx.read();
  assert_eq!(final_guard.counter, 15);
  assert_eq!(final_guard.message, "SetByStep1_ThenStep2");
}

#[tokio::test]
#[serial]
async fn test_context_data_clone_shares_data() {
  setup_tracing();
  let original_ctx = ContextData::new(TestContext {
    counter: 1,
    ..Default::default()
  });
  let cloned_ctx = original_ctx.clone();

  {
    original_ctx.write().counter = 5;
  }
  assert_eq!(cloned_ctx.read().counter, 5);

  cloned_ctx.write_with(|c| c.counter = 10);
  assert_eq!(original_ctx.read_with(|c| c.counter), 10);
}

#[tokio::test]
#[serial]
async fn test_handler_awaits_between_lock_scopes() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("slow_step", false, None)]);

  pipeline.on_step("slow_step", |ctx: ContextData<TestContext>| async move {
    let initial_count = ctx.read_with(|c| c.counter);

    tokio::time::sleep(std::time::Duration::from_millis(1)).await;

    ctx.write_with(|c| c.counter = initial_count + 1);
    Ok::<_, TestError>(PipelineControl::Continue)
  });

  let ctx = ContextData::new(TestContext::default());
  let handle = tokio::spawn({
    let ctx = ctx.clone();
    async move { pipeline.run(ctx).await }
  });
  handle.await.unwrap().unwrap();
  assert_eq!(ctx.read().counter, 1);
}

#[test]
fn test_try_write_fails_while_read_guard_held() {
  let ctx = ContextData::new(TestContext::default());
  let _reader = ctx.read();
  assert!(ctx.try_write().is_none());
  assert!(ctx.try_read().is_some());
}
