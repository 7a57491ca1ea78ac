use fibre_dix::{aggregate, values, Dix, Error, Options};
use std::sync::{Arc, Mutex};

// --- Test Fixtures ---

struct Config {
  prefix: String,
}

struct Logger;

aggregate! {
  struct Mixed {
    #[group = "test"]
    cfg: Arc<Config>,
    logger: Option<Arc<Logger>>,
  }
}

aggregate! {
  struct Unlabeled {
    logger: Arc<Logger>,
  }
}

aggregate! {
  struct EmptyLabel {
    #[group = ""]
    cfg: Arc<Config>,
  }
}

fn config(prefix: &str) -> Arc<Config> {
  Arc::new(Config {
    prefix: prefix.to_string(),
  })
}

// --- Strict Mode Tests ---

#[test]
fn test_strict_mode_never_populates_unlabeled_fields() {
  // Arrange
  let dix = Dix::with_options(Options::new().strict(true));
  dix.inject(Arc::new(Logger)).unwrap();

  let seen = Arc::new(Mutex::new(Vec::new()));
  let sink = seen.clone();
  dix
    .provide(move |mixed: Mixed| {
      sink
        .lock()
        .unwrap()
        .push((mixed.cfg.prefix.clone(), mixed.logger.is_some()));
    })
    .unwrap();

  // Act
  dix.inject(values! { "test" => config("[strict] ") }).unwrap();

  // Assert: invoked once the labeled field resolved, logger left empty.
  assert_eq!(*seen.lock().unwrap(), vec![("[strict] ".to_string(), false)]);

  // A new Logger is not part of the comparison set, so nothing re-runs.
  dix.inject(Arc::new(Logger)).unwrap();
  assert_eq!(seen.lock().unwrap().len(), 1);
}

#[test]
fn test_lenient_mode_requires_unlabeled_fields() {
  // Arrange
  let dix = Dix::new();
  let seen = Arc::new(Mutex::new(Vec::new()));
  let sink = seen.clone();
  dix
    .provide(move |mixed: Mixed| {
      sink.lock().unwrap().push(mixed.logger.is_some());
    })
    .unwrap();

  // Act & Assert
  dix.inject(values! { "test" => config("[lenient] ") }).unwrap();
  assert!(seen.lock().unwrap().is_empty());

  dix.inject(Arc::new(Logger)).unwrap();
  assert_eq!(*seen.lock().unwrap(), vec![true]);
}

#[test]
fn test_strict_mode_rejects_required_unlabeled_field() {
  let dix = Dix::with_options(Options::new().strict(true));

  let err = dix.provide(|_deps: Unlabeled| {}).unwrap_err();

  assert!(matches!(err, Error::MalformedType { .. }), "{err}");
  assert!(err.to_string().contains("logger"));
}

#[test]
fn test_empty_label_is_eligible_in_strict_mode() {
  // Arrange
  let dix = Dix::with_options(Options::new().strict(true));
  let seen = Arc::new(Mutex::new(None));
  let sink = seen.clone();
  dix
    .provide(move |deps: EmptyLabel| {
      *sink.lock().unwrap() = Some(deps.cfg.prefix.clone());
    })
    .unwrap();

  // Act: an empty label means the default group.
  dix.inject(config("[default] ")).unwrap();

  // Assert
  assert_eq!(seen.lock().unwrap().as_deref(), Some("[default] "));
}
