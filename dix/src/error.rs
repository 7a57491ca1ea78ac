use thiserror::Error;

/// The error type returned by provider and consumer functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The main error type for `fibre_dix`.
///
/// A dependency that is not available yet is not an error; neither is a skipped
/// re-invocation with unchanged inputs.
#[derive(Debug, Error)]
pub enum Error {
  #[error("malformed type in {origin}: {reason}")]
  MalformedType { origin: String, reason: String },

  #[error("provide type kind error in {origin}: unsupported return kind `{kind}`")]
  UnsupportedReturnKind { origin: String, kind: String },

  #[error("invalid signature in {origin}: the last returned value should be an error, got `{found}`")]
  InvalidSignature { origin: String, found: String },

  #[error("func error, func: {origin}, params: [{params}]: {source}")]
  ProviderInvocation {
    origin: String,
    params: String,
    #[source]
    source: BoxError,
  },

  #[error("argument {index} of {origin} could not be bound as `{expected}`")]
  ArgumentMismatch {
    origin: String,
    index: usize,
    expected: String,
  },

  #[error("resolution did not settle after {passes} evaluation passes")]
  ResolutionDidNotSettle { passes: usize },
}

impl Error {
  /// The error returned by the provider itself, if this is an invocation failure.
  pub fn provider_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
    match self {
      Error::ProviderInvocation { source, .. } => Some(source.as_ref()),
      _ => None,
    }
  }
}

/// A specialized `Result` type for `fibre_dix` operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
