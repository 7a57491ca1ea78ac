//! Resolver configuration and the process-wide trace flag.

use once_cell::sync::Lazy;
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};

/// Environment variable enabling trace diagnostics.
pub const TRACE_ENV: &str = "DIX_TRACE";

const ENV_PREFIX: &str = "DIX_";

const DEFAULT_MAX_PASSES: usize = 64;

static TRACE: Lazy<AtomicBool> = Lazy::new(|| AtomicBool::new(trace_from_env()));

fn parse_bool(raw: &str) -> Option<bool> {
  match raw.trim().to_ascii_lowercase().as_str() {
    "1" | "t" | "true" | "yes" | "on" => Some(true),
    "0" | "f" | "false" | "no" | "off" | "" => Some(false),
    _ => None,
  }
}

fn trace_from_env() -> bool {
  env::var(TRACE_ENV)
    .ok()
    .and_then(|raw| parse_bool(&raw))
    .unwrap_or(false)
}

/// Whether trace diagnostics are enabled process-wide.
pub fn is_trace() -> bool {
  TRACE.load(Ordering::Relaxed)
}

/// Enables trace diagnostics for every container in the process.
pub fn set_trace() {
  env::set_var(TRACE_ENV, "true");
  TRACE.store(true, Ordering::Relaxed);
}

/// Every `DIX_*` environment variable, sorted by name.
///
/// Variables whose name or value is not valid unicode are left out.
pub fn environment() -> Vec<(String, String)> {
  prefixed(
    env::vars_os().filter_map(|(name, value)| Some((name.into_string().ok()?, value.into_string().ok()?))),
  )
}

fn prefixed(vars: impl IntoIterator<Item = (String, String)>) -> Vec<(String, String)> {
  let mut vars: Vec<(String, String)> = vars
    .into_iter()
    .filter(|(name, _)| name.starts_with(ENV_PREFIX))
    .collect();
  vars.sort();
  vars
}

/// Options controlling how a [`Dix`](crate::Dix) resolves dependencies.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
  feature = "serde",
  derive(serde::Deserialize),
  serde(default, deny_unknown_fields)
)]
pub struct Options {
  /// Only consider struct-parameter fields that carry a group label.
  pub strict: bool,
  /// Emit per-node diagnostics. Also on whenever the process-wide flag is set.
  pub trace: bool,
  /// Upper bound on evaluation passes per registration.
  pub max_passes: usize,
}

impl Default for Options {
  fn default() -> Self {
    Self {
      strict: false,
      trace: is_trace(),
      max_passes: DEFAULT_MAX_PASSES,
    }
  }
}

impl Options {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn strict(mut self, strict: bool) -> Self {
    self.strict = strict;
    self
  }

  pub fn trace(mut self, trace: bool) -> Self {
    self.trace = trace;
    self
  }

  pub fn max_passes(mut self, max_passes: usize) -> Self {
    self.max_passes = max_passes;
    self
  }

  pub(crate) fn tracing_enabled(&self) -> bool {
    self.trace || is_trace()
  }
}
