//! The registration driver: the public entry point of the resolver.

use crate::container::Container;
use crate::core::{group_of, SemanticType, TypeKey};
use crate::describe::Description;
use crate::error::{Error, Result};
use crate::function::{DynFunction, Function, IntoFunction, Origin};
use crate::node::{Evaluation, Node};
use crate::options::Options;
use crate::value::Value;
use parking_lot::ReentrantMutex;
use std::any::Any;
use std::sync::Arc;

/// A set of values to bind, each under an optional group label.
#[derive(Debug, Clone, Default)]
pub struct Values {
  entries: Vec<(Option<String>, Value)>,
}

impl Values {
  pub fn new() -> Self {
    Self::default()
  }

  /// A single value in the default group.
  pub fn single<T: Any + Send + Sync>(value: Arc<T>) -> Self {
    Self::new().bind_default(value)
  }

  pub fn bind<T: Any + Send + Sync>(mut self, label: impl Into<String>, value: Arc<T>) -> Self {
    self.entries.push((Some(label.into()), Value::new(value)));
    self
  }

  pub fn bind_default<T: Any + Send + Sync>(mut self, value: Arc<T>) -> Self {
    self.entries.push((None, Value::new(value)));
    self
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

/// Anything [`Dix::inject`] accepts.
pub enum Registration {
  Values(Values),
  Function(Box<dyn Function>),
}

impl Registration {
  /// A single value in the default group.
  pub fn value<T: Any + Send + Sync>(value: Arc<T>) -> Self {
    Registration::Values(Values::single(value))
  }

  /// Wraps a closure, recording the caller's location as its origin.
  #[track_caller]
  pub fn function<F, Args>(f: F) -> Self
  where
    F: IntoFunction<Args>,
  {
    let origin = Origin::caller(std::any::type_name::<F>());
    Registration::Function(f.into_function(origin))
  }
}

impl From<Values> for Registration {
  fn from(values: Values) -> Self {
    Registration::Values(values)
  }
}

impl<T: Any + Send + Sync> From<Arc<T>> for Registration {
  fn from(value: Arc<T>) -> Self {
    Registration::value(value)
  }
}

impl From<DynFunction> for Registration {
  fn from(function: DynFunction) -> Self {
    Registration::Function(Box::new(function))
  }
}

/// A dependency-injection resolver.
///
/// Every registration runs resolution to completion before returning: nodes are
/// re-evaluated until no new value becomes available.
pub struct Dix {
  container: Container,
  gate: ReentrantMutex<()>,
  options: Options,
}

impl Default for Dix {
  fn default() -> Self {
    Self::with_options(Options::default())
  }
}

impl Dix {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_options(options: Options) -> Self {
    Self {
      container: Container::default(),
      gate: ReentrantMutex::new(()),
      options,
    }
  }

  pub fn options(&self) -> &Options {
    &self.options
  }

  /// Registers values or a function, then resolves.
  ///
  /// Returns the first fatal error; dependencies that are not available yet are
  /// not errors.
  pub fn inject(&self, registration: impl Into<Registration>) -> Result<()> {
    let _gate = self.gate.lock();
    match registration.into() {
      Registration::Values(values) => {
        for (label, value) in values.entries {
          let key = TypeKey::new(value.ty(), group_of(label.as_deref()));
          if self.options.tracing_enabled() {
            tracing::debug!(key = %key, instance = %value.id(), "binding value");
          }
          self.container.register_value(key, value);
        }
      }
      Registration::Function(function) => {
        let node = Node::new(function, self.options.strict)?;
        if self.options.tracing_enabled() {
          tracing::debug!(node = %node.origin(), "registering function");
        }
        self.container.register_node(Arc::new(node));
      }
    }
    self.evaluate_all()
  }

  /// Registers a closure as a provider and/or consumer.
  #[track_caller]
  pub fn provide<F, Args>(&self, f: F) -> Result<()>
  where
    F: IntoFunction<Args>,
  {
    self.inject(Registration::function(f))
  }

  /// Declares that values of type `C` satisfy the interface `I`, then resolves.
  ///
  /// ```
  /// use fibre_dix::{Dix, Iface};
  /// use std::sync::Arc;
  ///
  /// trait Greeter: Send + Sync {
  ///   fn greet(&self) -> String;
  /// }
  /// struct English;
  /// impl Greeter for English {
  ///   fn greet(&self) -> String { "Hello!".into() }
  /// }
  ///
  /// let dix = Dix::new();
  /// dix.implement::<dyn Greeter, English>(|english| english).unwrap();
  /// dix.inject(Arc::new(English)).unwrap();
  /// assert_eq!(dix.get_iface::<dyn Greeter>(None).unwrap().greet(), "Hello!");
  /// ```
  pub fn implement<I, C>(&self, cast: impl Fn(Arc<C>) -> Arc<I> + Send + Sync + 'static) -> Result<()>
  where
    I: ?Sized + Send + Sync + 'static,
    C: Any + Send + Sync,
  {
    let _gate = self.gate.lock();
    self.container.register_capability::<I, C>(cast);
    self.evaluate_all()
  }

  /// Evaluates every node in registration order until no new value becomes available.
  pub fn evaluate_all(&self) -> Result<()> {
    let _gate = self.gate.lock();
    let trace = self.options.tracing_enabled();
    let max_passes = self.options.max_passes.max(1);

    for pass in 1..=max_passes {
      self.container.take_dirty();
      let mut invoked = 0usize;
      for node in self.container.nodes() {
        if node.evaluate(&self.container, trace)? == Evaluation::Invoked {
          invoked += 1;
        }
      }
      if trace {
        tracing::debug!(pass, invoked, "evaluation pass finished");
      }
      if !self.container.is_dirty() {
        return Ok(());
      }
    }

    tracing::warn!(passes = max_passes, "resolution did not settle");
    Err(Error::ResolutionDidNotSettle { passes: max_passes })
  }

  /// The value bound to `T` in the given group, if any.
  pub fn get<T: Any + Send + Sync>(&self, group: Option<&str>) -> Option<Arc<T>> {
    self
      .container
      .lookup_concrete(&TypeKey::of::<T>(group))
      .and_then(|resolved| resolved.downcast::<T>())
  }

  /// The first value in the given group that satisfies the interface `I`.
  pub fn get_iface<I: ?Sized + Send + Sync + 'static>(&self, group: Option<&str>) -> Option<Arc<I>> {
    self
      .container
      .lookup_capability(SemanticType::of::<I>(), &group_of(group))
      .and_then(|resolved| resolved.capability_view::<I>())
  }

  pub fn contains<T: Any + Send + Sync>(&self, group: Option<&str>) -> bool {
    !self.container.is_absent(&TypeKey::of::<T>(group))
  }

  pub fn describe(&self) -> Description {
    Description::capture(&self.container)
  }
}
