// src/lib.rs

//! Storeflow: an async, type-safe step-pipeline engine for multi-step business workflows.
//!
//! A workflow is a `Pipeline<TData, Err>`:
//!  - Ordered, named steps with `before`/`on`/`after` hooks.
//!  - Optional steps and `skip_if` conditions evaluated against the shared context.
//!  - Early stop (`PipelineControl::Stop`) from any handler.
//!  - A type-keyed `Registry` that dispatches a context to the pipeline registered for its type.
//!  - Atomic runs: a context exposing a `TransactionBoundary` is committed only when every
//!    step completed and rolled back on any error or early stop.

pub mod atomic;
pub mod core;
pub mod error;
pub mod pipeline;
pub mod registry;

// --- Re-exports for the Public API ---

pub use crate::core::context_data::ContextData;
pub use crate::core::control::{PipelineControl, PipelineResult};
pub use crate::core::handler::Handler;
pub use crate::core::step::{SkipCondition, StepDef};

pub use crate::pipeline::Pipeline;

pub use crate::atomic::{AtomicContext, TransactionBoundary};
pub use crate::error::{FlowError, FlowResult};
pub use crate::registry::Registry;

/*
    Typical wiring:
    1. Define a context data struct `MyCtx` holding the workflow input, its transaction
       handle and the fields each step fills in.
    2. Build a `Pipeline<MyCtx, MyError>` from step definitions and register handlers with
       `.on_step()`, `.before_step()`, `.after_step()`.
    3. Register the pipeline with a `Registry<MyError>` at startup.
    4. Per request: wrap a fresh `MyCtx` in `ContextData::new` and call
       `registry.run_atomic(ctx.clone()).await` (or `run` for non-transactional work),
       then read the results back out of `ctx`.
*/
