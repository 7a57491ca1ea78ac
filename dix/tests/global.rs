use fibre_dix::{
  environment, global, graph, inject, is_trace, provide, set_trace, values, BoxError, Dix, Options, TypeKey,
  TRACE_ENV,
};
use serial_test::serial;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// --- Test Fixtures ---

struct GreetingConfig {
  name: String,
}

struct Greeting(String);

struct Token(u64);

// --- Global Resolver Tests ---

#[test]
#[serial]
fn test_global_resolver_resolves_across_free_functions() {
  // Arrange
  provide(|config: Arc<GreetingConfig>| -> Result<Arc<Greeting>, BoxError> {
    Ok(Arc::new(Greeting(format!("Hello, {}!", config.name))))
  })
  .unwrap();
  assert!(global().get::<Greeting>(None).is_none());

  // Act
  inject(Arc::new(GreetingConfig {
    name: "World".to_string(),
  }))
  .unwrap();

  // Assert
  assert_eq!(global().get::<Greeting>(None).unwrap().0, "Hello, World!");

  let description = graph();
  assert!(description.binding(&TypeKey::of::<GreetingConfig>(None)).is_some());
  assert!(description.binding(&TypeKey::of::<Greeting>(None)).is_some());
  assert!(description
    .nodes
    .iter()
    .any(|node| node.origin.contains("global.rs") && node.invoked));
}

#[test]
#[serial]
fn test_global_is_a_single_instance() {
  inject(values! { "session" => Arc::new(Token(7)) }).unwrap();

  assert!(std::ptr::eq(global(), global()));
  assert_eq!(global().get::<Token>(Some("session")).unwrap().0, 7);
}

/// Registers a small chain on `dix`, re-binds one input with the same and then a
/// new instance, and reports how often the consumer ran.
fn run_chain(dix: &Dix) -> usize {
  let calls = Arc::new(AtomicUsize::new(0));
  let c = calls.clone();
  dix
    .provide(move |_token: Arc<Token>, greeting: Arc<Greeting>| {
      assert_eq!(greeting.0, "Hello, Trace!");
      c.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();
  dix
    .provide(|config: Arc<GreetingConfig>| -> Result<Arc<Greeting>, BoxError> {
      Ok(Arc::new(Greeting(format!("Hello, {}!", config.name))))
    })
    .unwrap();

  let token = Arc::new(Token(1));
  dix.inject(token.clone()).unwrap();
  dix
    .inject(Arc::new(GreetingConfig {
      name: "Trace".into(),
    }))
    .unwrap();
  dix.inject(token).unwrap();
  dix.inject(Arc::new(Token(2))).unwrap();
  calls.load(Ordering::SeqCst)
}

#[test]
#[serial]
fn test_trace_flag_is_process_wide() {
  // Arrange
  let _ = tracing_subscriber::fmt()
    .with_env_filter("fibre_dix=debug")
    .with_test_writer()
    .try_init();
  let untraced_calls = run_chain(&Dix::with_options(Options::new().trace(false)));

  // Act
  set_trace();

  // Assert
  assert!(is_trace());
  assert_eq!(std::env::var(TRACE_ENV).as_deref(), Ok("true"));
  assert!(Dix::new().options().trace);
  assert!(environment().contains(&(TRACE_ENV.to_string(), "true".to_string())));
  assert!(graph().to_string().contains("DIX_TRACE=true"));

  // Tracing is diagnostic only: the same chain invokes the same number of times.
  let traced_calls = run_chain(&Dix::new());
  assert_eq!(untraced_calls, 2);
  assert_eq!(traced_calls, untraced_calls);
}
