//! Registered functions: their signatures, call arguments and produced outputs.

use crate::core::TypeDescriptor;
use crate::error::BoxError;
use crate::param::{Param, Returns};
use crate::value::{Resolved, Value};
use std::fmt;
use std::marker::PhantomData;
use std::panic::Location;

/// Where a function was registered, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
  pub name: String,
  pub file: &'static str,
  pub line: u32,
}

impl Origin {
  #[track_caller]
  pub fn caller(name: impl Into<String>) -> Self {
    let location = Location::caller();
    Self {
      name: name.into(),
      file: location.file(),
      line: location.line(),
    }
  }
}

impl fmt::Display for Origin {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    // Keep the last two path components, which is enough to find the file.
    let parts: Vec<&str> = self.file.rsplitn(3, ['/', '\\']).collect();
    let file = match parts.as_slice() {
      [name, dir, _] => format!("{}/{}", dir, name),
      _ => self.file.to_owned(),
    };
    write!(f, "{}:{} {}", file, self.line, self.name)
  }
}

/// The declared parameter and return types of a function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
  pub inputs: Vec<TypeDescriptor>,
  pub outputs: Vec<TypeDescriptor>,
}

/// One resolved parameter.
#[derive(Debug, Clone)]
pub enum Arg {
  Simple(Resolved),
  /// One slot per struct field in declaration order; `None` for fields that were skipped.
  Aggregate(Vec<Option<Resolved>>),
}

/// One produced, non-error return value.
#[derive(Debug, Clone)]
pub enum Output {
  Single(Value),
  /// One slot per struct field in declaration order; `None` leaves the field unbound.
  Fields(Vec<Option<Value>>),
}

#[derive(Debug)]
pub enum CallError {
  /// The function body returned an error.
  Failed(BoxError),
  /// A resolved argument could not be converted to the declared parameter type.
  Mismatch { index: usize, expected: &'static str },
}

/// A function the resolver can register as a node.
pub trait Function: Send + Sync + 'static {
  fn origin(&self) -> &Origin;

  fn signature(&self) -> Signature;

  fn invoke(&self, args: Vec<Arg>) -> Result<Vec<Output>, CallError>;
}

/// Conversion of a closure into a registrable [`Function`].
///
/// Implemented for `Fn` closures of up to eight [`Param`] arguments whose return
/// type implements [`Returns`].
pub trait IntoFunction<Args>: Sized {
  fn into_function(self, origin: Origin) -> Box<dyn Function>;
}

/// A closure whose signature is derived from its Rust types.
pub struct TypedFunction<F, Args, Ret> {
  f: F,
  origin: Origin,
  _marker: PhantomData<fn(Args) -> Ret>,
}

fn bind<P: Param>(arg: Option<Arg>, index: usize) -> Result<P, CallError> {
  arg
    .and_then(P::from_arg)
    .ok_or(CallError::Mismatch {
      index,
      expected: std::any::type_name::<P>(),
    })
}

macro_rules! impl_function {
  ($($arg:ident),*) => {
    impl<Func, Ret, $($arg,)*> IntoFunction<($($arg,)*)> for Func
    where
      Func: Fn($($arg),*) -> Ret + Send + Sync + 'static,
      Ret: Returns,
      $($arg: Param,)*
    {
      fn into_function(self, origin: Origin) -> Box<dyn Function> {
        Box::new(TypedFunction::<Func, ($($arg,)*), Ret> {
          f: self,
          origin,
          _marker: PhantomData,
        })
      }
    }

    impl<Func, Ret, $($arg,)*> Function for TypedFunction<Func, ($($arg,)*), Ret>
    where
      Func: Fn($($arg),*) -> Ret + Send + Sync + 'static,
      Ret: Returns,
      $($arg: Param,)*
    {
      fn origin(&self) -> &Origin {
        &self.origin
      }

      fn signature(&self) -> Signature {
        Signature {
          inputs: vec![$(<$arg as Param>::descriptor()),*],
          outputs: Ret::descriptors(),
        }
      }

      #[allow(non_snake_case, unused_mut, unused_variables, unused_assignments)]
      fn invoke(&self, args: Vec<Arg>) -> Result<Vec<Output>, CallError> {
        let mut args = args.into_iter();
        let mut index = 0usize;
        $(
          let $arg = bind::<$arg>(args.next(), index)?;
          index += 1;
        )*
        (self.f)($($arg),*).into_outputs().map_err(CallError::Failed)
      }
    }
  };
}

impl_function!();
impl_function!(A1);
impl_function!(A1, A2);
impl_function!(A1, A2, A3);
impl_function!(A1, A2, A3, A4);
impl_function!(A1, A2, A3, A4, A5);
impl_function!(A1, A2, A3, A4, A5, A6);
impl_function!(A1, A2, A3, A4, A5, A6, A7);
impl_function!(A1, A2, A3, A4, A5, A6, A7, A8);

type DynBody = Box<dyn Fn(Vec<Arg>) -> Result<Vec<Output>, BoxError> + Send + Sync>;

/// A function with an explicitly declared signature.
///
/// The body receives one [`Arg`] per declared input and must return one
/// [`Output`] per declared non-error output.
///
/// ```
/// use fibre_dix::{Arg, Dix, DynFunction, Output, TypeDescriptor, Value};
/// use std::sync::Arc;
///
/// struct Port(u16);
/// struct Addr(String);
///
/// let dix = Dix::new();
/// let make_addr = DynFunction::new("make_addr", |args| {
///   let port = match &args[0] {
///     Arg::Simple(port) => port.downcast::<Port>().unwrap(),
///     _ => unreachable!(),
///   };
///   let addr = Arc::new(Addr(format!("0.0.0.0:{}", port.0)));
///   Ok(vec![Output::Single(Value::new(addr))])
/// })
/// .input(TypeDescriptor::pointer::<Port>())
/// .output(TypeDescriptor::pointer::<Addr>())
/// .output(TypeDescriptor::Error);
///
/// dix.inject(make_addr).unwrap();
/// dix.inject(Arc::new(Port(8080))).unwrap();
/// assert_eq!(dix.get::<Addr>(None).unwrap().0, "0.0.0.0:8080");
/// ```
pub struct DynFunction {
  origin: Origin,
  inputs: Vec<TypeDescriptor>,
  outputs: Vec<TypeDescriptor>,
  body: DynBody,
}

impl DynFunction {
  #[track_caller]
  pub fn new(
    name: impl Into<String>,
    body: impl Fn(Vec<Arg>) -> Result<Vec<Output>, BoxError> + Send + Sync + 'static,
  ) -> Self {
    Self {
      origin: Origin::caller(name),
      inputs: Vec::new(),
      outputs: Vec::new(),
      body: Box::new(body),
    }
  }

  pub fn input(mut self, ty: TypeDescriptor) -> Self {
    self.inputs.push(ty);
    self
  }

  pub fn output(mut self, ty: TypeDescriptor) -> Self {
    self.outputs.push(ty);
    self
  }
}

impl Function for DynFunction {
  fn origin(&self) -> &Origin {
    &self.origin
  }

  fn signature(&self) -> Signature {
    Signature {
      inputs: self.inputs.clone(),
      outputs: self.outputs.clone(),
    }
  }

  fn invoke(&self, args: Vec<Arg>) -> Result<Vec<Output>, CallError> {
    (self.body)(args).map_err(CallError::Failed)
  }
}

impl fmt::Debug for DynFunction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DynFunction")
      .field("origin", &self.origin)
      .field("inputs", &self.inputs)
      .field("outputs", &self.outputs)
      .finish()
  }
}
