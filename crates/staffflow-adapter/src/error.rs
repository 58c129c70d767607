use thiserror::Error;

/// Errors from a call to an external system.
///
/// The orchestrator records these on the failing step; they never abort a
/// workflow run.
#[derive(Debug, Error)]
pub enum AdapterError {
  /// The backend answered but refused the operation.
  #[error("{message}")]
  Rejected { message: String },

  /// The call did not finish within the configured bound.
  #[error("timeout")]
  Timeout { timeout_ms: u64 },

  /// HTTP transport failed.
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  /// The backend's reply could not be understood.
  #[error("invalid response: {message}")]
  InvalidResponse { message: String },

  /// The adapter was configured with unusable settings.
  #[error("invalid adapter configuration: {message}")]
  InvalidConfig { message: String },

  /// No adapter is registered for the step's backend.
  #[error("no adapter registered for backend '{backend}'")]
  NotRegistered { backend: String },

  /// The adapter panicked while handling the call.
  #[error("adapter panicked: {message}")]
  Panicked { message: String },
}

impl AdapterError {
  pub fn rejected(message: impl Into<String>) -> Self {
    Self::Rejected {
      message: message.into(),
    }
  }
}
