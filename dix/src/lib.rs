//! # Fibre DIX
//!
//! A runtime dependency-injection resolver. Register *providers* (functions
//! whose return values become bound values) and *consumers* (functions whose
//! parameters are dependencies), and the resolver invokes each function as
//! soon as every one of its dependencies is available.
//!
//! ## Core Concepts
//!
//! - **Key**: every value is addressed by its semantic type plus a group
//!   (namespace). The group defaults to [`DEFAULT_GROUP`].
//! - **Parameters**: `Arc<T>` is resolved by exact key, [`Iface<dyn Trait>`]
//!   by capability (see [`Dix::implement`]), and structs declared with
//!   [`aggregate!`] field by field, each field in its own group.
//! - **Re-invocation**: a function runs again only when at least one of its
//!   inputs is a *different instance* than last time. Re-binding an equal but
//!   new value triggers it; re-binding the same `Arc` does not.
//! - **Errors**: a function's trailing `Result` error aborts the registration
//!   that triggered it. Missing dependencies are never errors.
//!
//! ## Quick Start
//!
//! ```
//! use fibre_dix::{aggregate, values, BoxError, Dix};
//! use std::sync::{Arc, Mutex};
//!
//! struct Config {
//!   prefix: String,
//! }
//!
//! struct Logger {
//!   prefix: String,
//!   lines: Mutex<Vec<String>>,
//! }
//!
//! aggregate! {
//!   struct LoggerDeps {
//!     #[group = "test"]
//!     cfg: Arc<Config>,
//!   }
//! }
//!
//! let dix = Dix::new();
//!
//! // A provider: builds a Logger from the "test" Config.
//! dix.provide(|deps: LoggerDeps| -> Result<Arc<Logger>, BoxError> {
//!   Ok(Arc::new(Logger {
//!     prefix: deps.cfg.prefix.clone(),
//!     lines: Mutex::new(Vec::new()),
//!   }))
//! }).unwrap();
//!
//! // A consumer: runs once a Logger exists.
//! dix.provide(|logger: Arc<Logger>| {
//!   let line = format!("{}You've been invoked", logger.prefix);
//!   logger.lines.lock().unwrap().push(line);
//! }).unwrap();
//!
//! // Nothing has run yet. Binding the config resolves the whole chain.
//! dix.inject(values! { "test" => Arc::new(Config { prefix: "[foo0] ".into() }) }).unwrap();
//!
//! let logger = dix.get::<Logger>(None).unwrap();
//! assert_eq!(*logger.lines.lock().unwrap(), vec!["[foo0] You've been invoked".to_string()]);
//! ```
//!
//! Set `DIX_TRACE=true` (or call [`set_trace`]) to log every resolution step
//! through `tracing`.

mod container;
mod core;
mod describe;
mod dix;
mod error;
mod function;
mod global;
mod macros;
mod node;
mod options;
#[doc(hidden)]
pub mod param;
mod value;

pub use crate::core::{
  group_of, is_double_indirect, key_of, FieldDescriptor, SemanticType, StructDescriptor,
  TypeDescriptor, TypeKey, Wrapper, DEFAULT_GROUP,
};
pub use describe::{BindingInfo, Description, NodeInfo};
pub use dix::{Dix, Registration, Values};
pub use error::{BoxError, Error, Result};
pub use function::{Arg, CallError, DynFunction, Function, IntoFunction, Origin, Output, Signature};
pub use global::{global, graph, inject, provide};
pub use node::Evaluation;
pub use options::{environment, is_trace, set_trace, Options, TRACE_ENV};
pub use param::{Aggregate, Field, Iface, Outputs, Param, Produce, Returns};
pub use value::{InstanceId, Resolved, Value};
