use fibre_dix::{
  aggregate, Arg, BoxError, Dix, DynFunction, Error, FieldDescriptor, Iface, Options, Output,
  StructDescriptor, TypeDescriptor, Value, Wrapper,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

// --- Test Fixtures ---

trait Hello: Send + Sync {}

#[allow(dead_code)]
struct Config {
  prefix: String,
}

struct Logger;

#[derive(Debug)]
struct Counter(usize);

aggregate! {
  struct HelloBundle {
    #[group = "test"]
    hello: Iface<dyn Hello>,
  }
}

#[derive(Debug)]
struct Boom;

impl std::fmt::Display for Boom {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str("boom")
  }
}

impl std::error::Error for Boom {}

fn config() -> Arc<Config> {
  Arc::new(Config {
    prefix: "[err] ".into(),
  })
}

// --- Invocation Errors ---

#[test]
fn test_provider_error_is_wrapped_and_retried_on_identical_inputs() {
  // Arrange
  let dix = Dix::new();
  let calls = Arc::new(AtomicUsize::new(0));
  let failing = Arc::new(AtomicBool::new(true));
  let (c, f) = (calls.clone(), failing.clone());
  dix
    .provide(move |_cfg: Arc<Config>| -> Result<Arc<Logger>, Boom> {
      c.fetch_add(1, Ordering::SeqCst);
      if f.load(Ordering::SeqCst) {
        Err(Boom)
      } else {
        Ok(Arc::new(Logger))
      }
    })
    .unwrap();

  // Act
  let err = dix.inject(config()).unwrap_err();

  // Assert
  assert!(matches!(err, Error::ProviderInvocation { .. }));
  assert_eq!(err.provider_error().unwrap().to_string(), "boom");
  assert!(err.to_string().contains("Config"));
  assert_eq!(calls.load(Ordering::SeqCst), 1);

  // The value that triggered the failure stays bound.
  assert!(dix.contains::<Config>(None));
  assert!(!dix.contains::<Logger>(None));

  // Last inputs were never recorded, so the same inputs invoke again.
  assert!(dix.evaluate_all().is_err());
  assert_eq!(calls.load(Ordering::SeqCst), 2);

  failing.store(false, Ordering::SeqCst);
  dix.evaluate_all().unwrap();
  assert_eq!(calls.load(Ordering::SeqCst), 3);
  assert!(dix.contains::<Logger>(None));

  // Now recorded: nothing changes, nothing runs.
  dix.evaluate_all().unwrap();
  assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_failure_stops_the_current_pass() {
  // Arrange
  let dix = Dix::new();
  let later = Arc::new(AtomicUsize::new(0));
  let l = later.clone();
  dix
    .provide(|_cfg: Arc<Config>| -> Result<(), BoxError> { Err("refused".into()) })
    .unwrap();
  dix
    .provide(move |_cfg: Arc<Config>| {
      l.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();

  // Act
  let err = dix.inject(config()).unwrap_err();

  // Assert
  assert!(err.to_string().contains("refused"));
  assert_eq!(later.load(Ordering::SeqCst), 0);
}

// --- Malformed Declarations ---

#[test]
fn test_struct_with_value_fields_is_malformed_output() {
  // Arrange: a provider returning a Config struct by value.
  let dix = Dix::new();
  let called = Arc::new(AtomicBool::new(false));
  let c = called.clone();
  let by_value = StructDescriptor::of::<Config>(vec![FieldDescriptor::new(
    "prefix",
    TypeDescriptor::concrete::<String>(),
  )]);
  let provider = DynFunction::new("new_config", move |_| {
    c.store(true, Ordering::SeqCst);
    Ok(Vec::new())
  })
  .output(TypeDescriptor::Struct(by_value))
  .output(TypeDescriptor::Error);

  // Act
  let err = dix.inject(provider).unwrap_err();

  // Assert
  assert!(matches!(err, Error::MalformedType { .. }), "{err}");
  assert!(err.to_string().contains("should be a pointer"));
  assert!(!called.load(Ordering::SeqCst));
  assert!(dix.describe().nodes.is_empty());
}

#[test]
fn test_interface_field_in_returned_aggregate_is_malformed() {
  let dix = Dix::new();

  let err = dix
    .provide(|_cfg: Arc<Config>| -> Result<HelloBundle, BoxError> { unreachable!() })
    .unwrap_err();

  assert!(matches!(err, Error::MalformedType { .. }), "{err}");
}

#[test]
fn test_double_pointer_output_is_malformed() {
  let dix = Dix::new();
  let provider = DynFunction::new("double", |_| Ok(Vec::new()))
    .output(TypeDescriptor::pointer::<Logger>().wrap(Wrapper::Pointer))
    .output(TypeDescriptor::Error);

  let err = dix.inject(provider).unwrap_err();

  assert!(matches!(err, Error::MalformedType { .. }), "{err}");
}

#[test]
fn test_non_pointer_return_kinds_are_unsupported() {
  let dix = Dix::new();
  let provider = DynFunction::new("hello", |_| Ok(Vec::new()))
    .output(TypeDescriptor::interface::<dyn Hello>())
    .output(TypeDescriptor::Error);

  let err = dix.inject(provider).unwrap_err();

  assert!(matches!(err, Error::UnsupportedReturnKind { .. }), "{err}");
}

#[test]
fn test_unsupported_parameter_kind_is_malformed() {
  let dix = Dix::new();
  let consumer = DynFunction::new("loggers", |_| Ok(Vec::new()))
    .input(TypeDescriptor::pointer::<Logger>().wrap(Wrapper::Slice));

  let err = dix.inject(consumer).unwrap_err();

  assert!(matches!(err, Error::MalformedType { .. }), "{err}");
}

#[test]
fn test_trailing_non_error_return_is_invalid_signature() {
  // Arrange
  let dix = Dix::new();
  let called = Arc::new(AtomicBool::new(false));
  let c = called.clone();
  let provider = DynFunction::new("no_error", move |_| {
    c.store(true, Ordering::SeqCst);
    Ok(vec![Output::Single(Value::new(Arc::new(Logger)))])
  })
  .input(TypeDescriptor::pointer::<Config>())
  .output(TypeDescriptor::pointer::<Logger>());

  // Registration succeeds: the signature is only checked once the node is ready.
  dix.inject(provider).unwrap();

  // Act
  let err = dix.inject(config()).unwrap_err();

  // Assert
  assert!(matches!(err, Error::InvalidSignature { .. }), "{err}");
  assert!(!called.load(Ordering::SeqCst));
}

#[test]
fn test_returned_value_must_match_declared_type() {
  let dix = Dix::new();
  let provider = DynFunction::new("liar", |args: Vec<Arg>| {
    assert_eq!(args.len(), 1);
    Ok(vec![Output::Single(Value::new(Arc::new(Counter(0))))])
  })
  .input(TypeDescriptor::pointer::<Config>())
  .output(TypeDescriptor::pointer::<Logger>())
  .output(TypeDescriptor::Error);
  dix.inject(provider).unwrap();

  let err = dix.inject(config()).unwrap_err();

  assert!(matches!(err, Error::MalformedType { .. }), "{err}");
  assert!(!dix.contains::<Logger>(None));
  assert!(!dix.contains::<Counter>(None));
}

// --- Fixpoint Bound ---

#[test]
fn test_self_feeding_provider_does_not_settle() {
  // Arrange: every invocation replaces its own input with a fresh instance.
  let dix = Dix::with_options(Options::new().max_passes(5));
  dix
    .provide(|counter: Arc<Counter>| -> Result<Arc<Counter>, BoxError> {
      Ok(Arc::new(Counter(counter.0 + 1)))
    })
    .unwrap();

  // Act
  let err = dix.inject(Arc::new(Counter(0))).unwrap_err();

  // Assert
  assert!(matches!(err, Error::ResolutionDidNotSettle { passes: 5 }), "{err}");
  assert_eq!(dix.get::<Counter>(None).unwrap().0, 5);
}
