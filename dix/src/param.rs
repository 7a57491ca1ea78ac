//! Mapping between Rust types and type descriptors.
//!
//! - `Arc<T>` is a pointer to a concrete type, resolved by exact key.
//! - [`Iface<I>`] is an interface (`dyn Trait`), resolved by capability.
//! - Structs declared with [`aggregate!`](crate::aggregate) bundle labeled fields.

use crate::core::{StructDescriptor, TypeDescriptor};
use crate::error::BoxError;
use crate::function::{Arg, Output};
use crate::value::{Resolved, Value};
use std::any::Any;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// A type that can appear as a function parameter.
pub trait Param: Sized + 'static {
  fn descriptor() -> TypeDescriptor;

  fn from_arg(arg: Arg) -> Option<Self>;
}

/// A type that can appear as a field of an aggregate.
pub trait Field: Sized + 'static {
  /// Whether the field can be left empty when strict mode skips it.
  const OPTIONAL: bool = false;

  fn descriptor() -> TypeDescriptor;

  fn from_slot(slot: Option<Resolved>) -> Option<Self>;

  fn into_slot(self) -> Option<Value>;
}

/// A single returned item.
pub trait Produce: Sized + 'static {
  fn descriptor() -> TypeDescriptor;

  fn into_output(self) -> Output;
}

/// The non-error part of a function's return type.
pub trait Outputs: Sized + 'static {
  fn descriptors() -> Vec<TypeDescriptor>;

  fn into_outputs(self) -> Vec<Output>;
}

/// A complete function return type: `()` or `Result<impl Outputs, E>`.
pub trait Returns: Sized + 'static {
  fn descriptors() -> Vec<TypeDescriptor>;

  fn into_outputs(self) -> Result<Vec<Output>, BoxError>;
}

/// A struct whose fields are injected individually. Implemented by [`aggregate!`](crate::aggregate).
pub trait Aggregate: Sized + 'static {
  fn structure() -> StructDescriptor;

  fn assemble(slots: Vec<Option<Resolved>>) -> Option<Self>;

  fn disassemble(self) -> Vec<Option<Value>>;
}

/// A shared handle to an interface implementation.
pub struct Iface<I: ?Sized>(Arc<I>);

impl<I: ?Sized> Iface<I> {
  pub fn new(inner: Arc<I>) -> Self {
    Iface(inner)
  }

  pub fn into_inner(self) -> Arc<I> {
    self.0
  }
}

impl<I: ?Sized> Clone for Iface<I> {
  fn clone(&self) -> Self {
    Iface(self.0.clone())
  }
}

impl<I: ?Sized> Deref for Iface<I> {
  type Target = I;

  fn deref(&self) -> &I {
    &self.0
  }
}

impl<I: ?Sized> fmt::Debug for Iface<I> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Iface<{}>", std::any::type_name::<I>())
  }
}

// --- Pointers ---

impl<T: Any + Send + Sync> Param for Arc<T> {
  fn descriptor() -> TypeDescriptor {
    TypeDescriptor::pointer::<T>()
  }

  fn from_arg(arg: Arg) -> Option<Self> {
    match arg {
      Arg::Simple(resolved) => resolved.downcast::<T>(),
      Arg::Aggregate(_) => None,
    }
  }
}

impl<T: Any + Send + Sync> Field for Arc<T> {
  fn descriptor() -> TypeDescriptor {
    TypeDescriptor::pointer::<T>()
  }

  fn from_slot(slot: Option<Resolved>) -> Option<Self> {
    slot?.downcast::<T>()
  }

  fn into_slot(self) -> Option<Value> {
    Some(Value::new(self))
  }
}

impl<T: Any + Send + Sync> Produce for Arc<T> {
  fn descriptor() -> TypeDescriptor {
    TypeDescriptor::pointer::<T>()
  }

  fn into_output(self) -> Output {
    Output::Single(Value::new(self))
  }
}

impl<T: Any + Send + Sync> Outputs for Arc<T> {
  fn descriptors() -> Vec<TypeDescriptor> {
    vec![<Self as Produce>::descriptor()]
  }

  fn into_outputs(self) -> Vec<Output> {
    vec![self.into_output()]
  }
}

// --- Interfaces ---

impl<I: ?Sized + Send + Sync + 'static> Param for Iface<I> {
  fn descriptor() -> TypeDescriptor {
    TypeDescriptor::interface::<I>()
  }

  fn from_arg(arg: Arg) -> Option<Self> {
    match arg {
      Arg::Simple(resolved) => resolved.capability_view::<I>().map(Iface),
      Arg::Aggregate(_) => None,
    }
  }
}

impl<I: ?Sized + Send + Sync + 'static> Field for Iface<I> {
  fn descriptor() -> TypeDescriptor {
    TypeDescriptor::interface::<I>()
  }

  fn from_slot(slot: Option<Resolved>) -> Option<Self> {
    slot?.capability_view::<I>().map(Iface)
  }

  // Interface fields are rejected as provider outputs before anything is invoked.
  fn into_slot(self) -> Option<Value> {
    None
  }
}

// --- Optional fields ---

impl<F: Field> Field for Option<F> {
  const OPTIONAL: bool = true;

  fn descriptor() -> TypeDescriptor {
    F::descriptor()
  }

  fn from_slot(slot: Option<Resolved>) -> Option<Self> {
    match slot {
      None => Some(None),
      Some(resolved) => F::from_slot(Some(resolved)).map(Some),
    }
  }

  fn into_slot(self) -> Option<Value> {
    self.and_then(F::into_slot)
  }
}

// --- Return types ---

impl Outputs for () {
  fn descriptors() -> Vec<TypeDescriptor> {
    Vec::new()
  }

  fn into_outputs(self) -> Vec<Output> {
    Vec::new()
  }
}

macro_rules! impl_outputs_tuple {
  ($($item:ident),+) => {
    impl<$($item: Produce),+> Outputs for ($($item,)+) {
      fn descriptors() -> Vec<TypeDescriptor> {
        vec![$(<$item as Produce>::descriptor()),+]
      }

      #[allow(non_snake_case)]
      fn into_outputs(self) -> Vec<Output> {
        let ($($item,)+) = self;
        vec![$($item.into_output()),+]
      }
    }
  };
}

impl_outputs_tuple!(P1);
impl_outputs_tuple!(P1, P2);
impl_outputs_tuple!(P1, P2, P3);
impl_outputs_tuple!(P1, P2, P3, P4);

impl Returns for () {
  fn descriptors() -> Vec<TypeDescriptor> {
    Vec::new()
  }

  fn into_outputs(self) -> Result<Vec<Output>, BoxError> {
    Ok(Vec::new())
  }
}

impl<O, E> Returns for Result<O, E>
where
  O: Outputs,
  E: Into<BoxError> + 'static,
{
  fn descriptors() -> Vec<TypeDescriptor> {
    let mut descriptors = O::descriptors();
    descriptors.push(TypeDescriptor::Error);
    descriptors
  }

  fn into_outputs(self) -> Result<Vec<Output>, BoxError> {
    self.map(O::into_outputs).map_err(Into::into)
  }
}

// --- Aggregate glue used by `aggregate!` ---

#[doc(hidden)]
pub fn aggregate_descriptor<S: Aggregate>() -> TypeDescriptor {
  TypeDescriptor::Struct(S::structure())
}

#[doc(hidden)]
pub fn aggregate_from_arg<S: Aggregate>(arg: Arg) -> Option<S> {
  match arg {
    Arg::Aggregate(slots) => S::assemble(slots),
    Arg::Simple(_) => None,
  }
}

#[doc(hidden)]
pub fn aggregate_into_output<S: Aggregate>(aggregate: S) -> Output {
  Output::Fields(aggregate.disassemble())
}
