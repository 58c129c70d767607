use thiserror::Error;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
  /// Failed to read a configuration file.
  #[error("failed to read config file: {0}")]
  Io(#[from] std::io::Error),

  /// Configuration file is not valid JSON for the expected shape.
  #[error("failed to parse config: {0}")]
  Parse(#[from] serde_json::Error),

  /// A workflow catalog failed validation.
  #[error("invalid workflow '{workflow_type}': {message}")]
  InvalidCatalog {
    workflow_type: String,
    message: String,
  },
}
