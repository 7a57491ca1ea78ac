//! Bound values and their identity tokens.

use crate::core::SemanticType;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Identifies one instance held by the container.
///
/// The token is the address of the value's allocation. Nodes keep the values
/// they were last invoked with alive, so an address used as a comparison
/// baseline is never recycled for a different instance.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(usize);

impl fmt::Debug for InstanceId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:#x}", self.0)
  }
}

impl fmt::Display for InstanceId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:#x}", self.0)
  }
}

/// A type-erased, shared instance together with its concrete type.
#[derive(Clone)]
pub struct Value {
  ty: SemanticType,
  data: Arc<dyn Any + Send + Sync>,
}

impl Value {
  pub fn new<T: Any + Send + Sync>(data: Arc<T>) -> Self {
    Self {
      ty: SemanticType::of::<T>(),
      data,
    }
  }

  pub fn ty(&self) -> SemanticType {
    self.ty
  }

  pub fn id(&self) -> InstanceId {
    InstanceId(Arc::as_ptr(&self.data) as *const () as usize)
  }

  /// True if both values are the very same instance (not merely equal).
  pub fn same_instance(&self, other: &Value) -> bool {
    self.id() == other.id()
  }

  pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
    self.data.clone().downcast::<T>().ok()
  }

  pub(crate) fn data(&self) -> &Arc<dyn Any + Send + Sync> {
    &self.data
  }
}

impl fmt::Debug for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}#{}", self.ty, self.id())
  }
}

/// A value found by a container lookup, plus the handle a parameter is built from.
///
/// For concrete lookups the handle is the value itself. For capability lookups
/// it is an `Arc<I>` view of the value, boxed as `Any`.
#[derive(Clone)]
pub struct Resolved {
  value: Value,
  handle: Arc<dyn Any + Send + Sync>,
}

impl Resolved {
  pub(crate) fn concrete(value: Value) -> Self {
    let handle = value.data().clone();
    Self { value, handle }
  }

  pub(crate) fn capability(value: Value, handle: Arc<dyn Any + Send + Sync>) -> Self {
    Self { value, handle }
  }

  pub fn value(&self) -> &Value {
    &self.value
  }

  pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
    self.handle.clone().downcast::<T>().ok()
  }

  pub fn capability_view<I: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<I>> {
    self.handle.downcast_ref::<Arc<I>>().cloned()
  }
}

impl fmt::Debug for Resolved {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Debug::fmt(&self.value, f)
  }
}
