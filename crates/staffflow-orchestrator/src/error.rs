//! Error types for orchestration.

use thiserror::Error;

/// Errors surfaced to callers of the orchestrator.
///
/// Adapter failures are not in this list: they are recorded on the failing
/// step and never propagate.
#[derive(Debug, Error)]
pub enum OrchestratorError {
  /// The referenced request or step does not exist.
  #[error("not found: {0}")]
  NotFound(String),

  /// The operation is not valid for the entity's current status.
  #[error("invalid state: {message}")]
  InvalidState { message: String },

  /// No workflow definition exists for the request's type.
  #[error("unknown workflow type '{0}'")]
  UnknownWorkflowType(String),

  /// Caller-supplied request data is unusable.
  #[error("invalid request: {message}")]
  InvalidRequest { message: String },

  /// The local store failed; no progress can be made without it.
  #[error("persistence error: {0}")]
  Persistence(#[source] staffflow_store::Error),
}

impl OrchestratorError {
  pub(crate) fn invalid_state(message: impl Into<String>) -> Self {
    Self::InvalidState {
      message: message.into(),
    }
  }
}

impl From<staffflow_store::Error> for OrchestratorError {
  fn from(err: staffflow_store::Error) -> Self {
    match err {
      staffflow_store::Error::NotFound(what) => Self::NotFound(what),
      other => Self::Persistence(other),
    }
  }
}
