// storeflow/src/core/handler.rs

//! The boxed handler type stored for every step hook.

use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use std::future::Future;
use std::pin::Pin;

/// A pipeline step handler.
///
/// Receives a clone of the shared `ContextData<TData>` and resolves to the control signal for
/// the pipeline. Handlers must release any `read()`/`write()` guard before awaiting: the guards
/// are blocking and not `Send`.
pub type Handler<TData, Err> = Box<
  dyn Fn(ContextData<TData>) -> Pin<Box<dyn Future<Output = Result<PipelineControl, Err>> + Send>>
    + Send
    + Sync,
>;
