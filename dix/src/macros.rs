//! Public macros for declaring aggregates, capabilities and value sets.

/// Declares a struct whose fields are injected individually.
///
/// Fields may be `Arc<T>`, `Iface<dyn Trait>`, or `Option` of either. A
/// `#[group = "label"]` attribute puts the field in that namespace; unlabeled
/// fields use the default group, or are skipped entirely in strict mode (which
/// requires them to be `Option`).
///
/// The same struct can be returned by a provider, binding each field under its
/// group. Only `Arc` fields are allowed there.
///
/// # Examples
///
/// ```
/// use fibre_dix::{aggregate, values, BoxError, Dix};
/// use std::sync::Arc;
///
/// struct Config { prefix: String }
///
/// aggregate! {
///   struct Deps {
///     #[group = "test"]
///     cfg: Arc<Config>,
///   }
/// }
///
/// let dix = Dix::new();
/// dix.provide(|deps: Deps| -> Result<Arc<String>, BoxError> {
///   Ok(Arc::new(format!("{}ready", deps.cfg.prefix)))
/// }).unwrap();
/// dix.inject(values! { "test" => Arc::new(Config { prefix: "[foo0] ".into() }) }).unwrap();
///
/// assert_eq!(*dix.get::<String>(None).unwrap(), "[foo0] ready");
/// ```
#[macro_export]
macro_rules! aggregate {
  (
    $(#[$meta:meta])*
    $vis:vis struct $name:ident {
      $(
        $(#[group = $group:literal])?
        $fvis:vis $field:ident : $fty:ty
      ),* $(,)?
    }
  ) => {
    $(#[$meta])*
    $vis struct $name {
      $( $fvis $field: $fty, )*
    }

    impl $crate::Aggregate for $name {
      fn structure() -> $crate::StructDescriptor {
        $crate::StructDescriptor::of::<$name>(vec![
          $({
            let field = $crate::FieldDescriptor::new(
              stringify!($field),
              <$fty as $crate::Field>::descriptor(),
            );
            $( let field = field.group($group); )?
            if <$fty as $crate::Field>::OPTIONAL {
              field.optional()
            } else {
              field
            }
          }),*
        ])
      }

      #[allow(unused_mut, unused_variables)]
      fn assemble(slots: Vec<Option<$crate::Resolved>>) -> Option<Self> {
        let mut slots = slots.into_iter();
        Some(Self {
          $( $field: <$fty as $crate::Field>::from_slot(slots.next()?)?, )*
        })
      }

      fn disassemble(self) -> Vec<Option<$crate::Value>> {
        vec![ $( <$fty as $crate::Field>::into_slot(self.$field) ),* ]
      }
    }

    impl $crate::Param for $name {
      fn descriptor() -> $crate::TypeDescriptor {
        $crate::param::aggregate_descriptor::<Self>()
      }

      fn from_arg(arg: $crate::Arg) -> Option<Self> {
        $crate::param::aggregate_from_arg::<Self>(arg)
      }
    }

    impl $crate::Produce for $name {
      fn descriptor() -> $crate::TypeDescriptor {
        $crate::param::aggregate_descriptor::<Self>()
      }

      fn into_output(self) -> $crate::Output {
        $crate::param::aggregate_into_output(self)
      }
    }

    impl $crate::Outputs for $name {
      fn descriptors() -> Vec<$crate::TypeDescriptor> {
        vec![$crate::param::aggregate_descriptor::<Self>()]
      }

      fn into_outputs(self) -> Vec<$crate::Output> {
        vec![$crate::param::aggregate_into_output(self)]
      }
    }
  };
}

/// Declares that one or more concrete types satisfy an interface.
///
/// ```
/// use fibre_dix::{implements, Dix};
/// use std::sync::Arc;
///
/// trait Hello: Send + Sync { fn hello(&self) -> &'static str; }
/// struct Config;
/// impl Hello for Config { fn hello(&self) -> &'static str { "Hello Config" } }
///
/// let dix = Dix::new();
/// implements!(dix, Config => dyn Hello).unwrap();
/// dix.inject(Arc::new(Config)).unwrap();
/// assert_eq!(dix.get_iface::<dyn Hello>(None).unwrap().hello(), "Hello Config");
/// ```
#[macro_export]
macro_rules! implements {
  ($dix:expr, $concrete:ty => $($iface:ty),+ $(,)?) => {
    (|| -> $crate::Result<()> {
      $(
        $dix.implement::<$iface, $concrete>(
          |concrete: ::std::sync::Arc<$concrete>| -> ::std::sync::Arc<$iface> { concrete },
        )?;
      )+
      Ok(())
    })()
  };
}

/// Builds a [`Values`](crate::Values) set from `label => Arc` pairs.
///
/// An empty label binds into the default group.
#[macro_export]
macro_rules! values {
  ($($label:expr => $value:expr),* $(,)?) => {
    $crate::Values::new()$(.bind($label, $value))*
  };
}
