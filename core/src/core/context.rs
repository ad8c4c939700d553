// mandi/src/core/context.rs

//! The boxed handler type stored by a pipeline.

use crate::core::context_data::ContextData;
use crate::core::control::StageControl;
use std::future::Future;
use std::pin::Pin;

pub type HandlerFuture<Err> = Pin<Box<dyn Future<Output = Result<StageControl, Err>> + Send>>;

/// An async stage handler.
///
/// Handlers receive a clone of the run's `ContextData<T>`. They read what they need,
/// drop the guard, await any I/O, then write results back under a fresh guard.
pub type Handler<T, Err> = Box<dyn Fn(ContextData<T>) -> HandlerFuture<Err> + Send + Sync>;
