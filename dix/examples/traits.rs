use fibre_dix::{aggregate, BoxError, Dix, Iface};
use std::sync::Arc;

// --- Abstraction and Implementations ---
trait MessageSender: Send + Sync {
  fn send(&self, to: &str, message: &str) -> String;
}

struct EmailSender;
impl MessageSender for EmailSender {
  fn send(&self, to: &str, message: &str) -> String {
    format!("Sending email to {}: '{}'", to, message)
  }
}

struct SmsSender;
impl MessageSender for SmsSender {
  fn send(&self, to: &str, message: &str) -> String {
    format!("Sending SMS to {}: '{}'", to, message)
  }
}

aggregate! {
  struct Channels {
    #[group = "email"]
    email: Iface<dyn MessageSender>,
    #[group = "sms"]
    sms: Option<Iface<dyn MessageSender>>,
  }
}

struct Notifier {
  log: Vec<String>,
}

fn main() -> Result<(), BoxError> {
  let dix = Dix::new();
  dix.implement::<dyn MessageSender, EmailSender>(|sender| sender)?;
  dix.implement::<dyn MessageSender, SmsSender>(|sender| sender)?;

  dix.provide(|channels: Channels| -> Result<Arc<Notifier>, BoxError> {
    let mut log = vec![channels.email.send("admin@example.com", "Server is down!")];
    if let Some(sms) = &channels.sms {
      log.push(sms.send("555-1234", "Server is down!"));
    }
    Ok(Arc::new(Notifier { log }))
  })?;

  dix.inject(
    fibre_dix::Values::new()
      .bind("email", Arc::new(EmailSender))
      .bind("sms", Arc::new(SmsSender)),
  )?;

  let notifier = dix.get::<Notifier>(None).ok_or("notifier was not built")?;
  for line in &notifier.log {
    println!("{}", line);
  }
  assert_eq!(notifier.log.len(), 2);
  Ok(())
}
