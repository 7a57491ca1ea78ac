use fibre_dix::{aggregate, graph, implements, inject, provide, values, BoxError, Iface};
use std::collections::HashMap;
use std::sync::Arc;

// --- Domain ---
trait Hello: Send + Sync {
  fn hello(&self) -> String;
}

struct Config {
  prefix: String,
}

impl Hello for Config {
  fn hello(&self) -> String {
    format!("Hello Config {}", self.prefix)
  }
}

struct Logger {
  prefix: String,
}

impl Logger {
  fn log(&self, message: &str) {
    println!("{}{}", self.prefix, message);
  }
}

aggregate! {
  struct MM {
    #[group = "test"]
    cfg: Arc<Config>,
  }
}

fn main() -> Result<(), BoxError> {
  // The consumer is registered before anything it needs exists.
  provide(|logger: Arc<Logger>| {
    logger.log("You've been invoked");
  })?;

  provide(|mm: MM| -> Result<Arc<Logger>, BoxError> {
    Ok(Arc::new(Logger {
      prefix: mm.cfg.prefix.clone(),
    }))
  })?;

  implements!(fibre_dix::global(), Config => dyn Hello)?;
  provide(|hello: Iface<dyn Hello>| {
    println!("{}", hello.hello());
  })?;

  // Binding the "test" config resolves the Logger chain.
  inject(values! {
    "test" => Arc::new(Config { prefix: "[foo0] ".to_string() }),
  })?;

  // A default-group config satisfies the Hello consumer.
  inject(Arc::new(Config {
    prefix: "[default] ".to_string(),
  }))?;

  // Any Arc can be bound, including whole maps.
  let mut settings = HashMap::new();
  settings.insert("mode", "demo");
  inject(Arc::new(settings))?;

  println!("\n{}", graph());
  Ok(())
}
