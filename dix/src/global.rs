//! The process-wide resolver instance and its free-function shortcuts.

use crate::describe::Description;
use crate::dix::{Dix, Registration};
use crate::error::Result;
use crate::function::IntoFunction;
use once_cell::sync::Lazy;

// Created on first access, with options taken from the environment.
static GLOBAL_DIX: Lazy<Dix> = Lazy::new(Dix::default);

/// Provides a reference to the global resolver.
///
/// # Examples
///
/// ```
/// use fibre_dix::global;
/// use std::sync::Arc;
///
/// struct Banner(&'static str);
///
/// global().inject(Arc::new(Banner("hello"))).unwrap();
/// assert_eq!(global().get::<Banner>(None).unwrap().0, "hello");
/// ```
pub fn global() -> &'static Dix {
  &GLOBAL_DIX
}

/// Registers values or a function with the global resolver.
pub fn inject(registration: impl Into<Registration>) -> Result<()> {
  global().inject(registration)
}

/// Registers a closure with the global resolver.
#[track_caller]
pub fn provide<F, Args>(f: F) -> Result<()>
where
  F: IntoFunction<Args>,
{
  global().provide(f)
}

/// Describes the global resolver's bindings and nodes.
pub fn graph() -> Description {
  global().describe()
}
