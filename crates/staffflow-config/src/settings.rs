use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Process settings, loaded from `config.json` in the data directory.
///
/// Every field has a default so an absent or partial file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
  /// SQLite connection URL. Defaults to `staffflow.db` in the data directory.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub database_url: Option<String>,

  /// Upper bound for a single adapter call.
  #[serde(default = "default_adapter_timeout_ms")]
  pub adapter_timeout_ms: u64,

  /// Optional workflow catalog replacing the built-in definitions.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub workflows_file: Option<PathBuf>,

  /// Adapter configuration keyed by backend name.
  #[serde(default = "default_adapters")]
  pub adapters: BTreeMap<String, AdapterSettings>,

  #[serde(default)]
  pub notification: NotificationSettings,

  /// Upper bound for delivering one notification.
  #[serde(default = "default_notification_timeout_ms")]
  pub notification_timeout_ms: u64,

  /// Actor recorded on activity entries written by the orchestrator itself.
  #[serde(default = "default_system_actor")]
  pub system_actor: String,
}

/// How to reach one backend system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AdapterSettings {
  /// Another bot reachable over HTTP.
  Http {
    base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bearer_token: Option<String>,
  },
  /// Local deterministic adapter.
  Stub {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    identifier_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fail_with: Option<String>,
  },
}

/// Where request summaries are sent after creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationSettings {
  #[default]
  None,
  Webhook {
    url: String,
  },
}

fn default_adapter_timeout_ms() -> u64 {
  30_000
}

fn default_notification_timeout_ms() -> u64 {
  10_000
}

fn default_system_actor() -> String {
  "staffflow".to_string()
}

fn default_adapters() -> BTreeMap<String, AdapterSettings> {
  let stub = |template: &str| AdapterSettings::Stub {
    identifier_template: Some(template.to_string()),
    fail_with: None,
  };

  BTreeMap::from([
    ("directory".to_string(), stub("{first}.{last}@example.com")),
    ("ticketing".to_string(), stub("zd-{id}")),
    ("crm".to_string(), stub("crm-{id}")),
  ])
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      database_url: None,
      adapter_timeout_ms: default_adapter_timeout_ms(),
      workflows_file: None,
      adapters: default_adapters(),
      notification: NotificationSettings::default(),
      notification_timeout_ms: default_notification_timeout_ms(),
      system_actor: default_system_actor(),
    }
  }
}

impl Settings {
  /// Load settings from a JSON file.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
  }

  /// Load settings from `path` if it exists, otherwise use defaults.
  pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
    if path.exists() {
      Self::load(path)
    } else {
      Ok(Self::default())
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_object_uses_defaults() {
    let settings: Settings = serde_json::from_str("{}").unwrap();
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.adapter_timeout_ms, 30_000);
    assert_eq!(settings.notification_timeout_ms, 10_000);
    assert!(settings.adapters.contains_key("directory"));
  }

  #[test]
  fn test_parse_http_adapter_and_webhook() {
    let settings: Settings = serde_json::from_str(
      r#"{
        "database_url": "sqlite://bots.db",
        "adapter_timeout_ms": 5000,
        "adapters": {
          "directory": { "type": "http", "base_url": "http://fred.internal" },
          "ticketing": { "type": "stub", "fail_with": "zendesk unavailable" }
        },
        "notification": { "type": "webhook", "url": "http://hr.internal/hooks/new-staff" }
      }"#,
    )
    .unwrap();

    assert_eq!(settings.database_url.as_deref(), Some("sqlite://bots.db"));
    assert_eq!(settings.adapters.len(), 2);
    assert_eq!(
      settings.adapters["directory"],
      AdapterSettings::Http {
        base_url: "http://fred.internal".to_string(),
        bearer_token: None,
      }
    );
    assert!(matches!(
      settings.notification,
      NotificationSettings::Webhook { .. }
    ));
  }

  #[test]
  fn test_load_or_default_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::load_or_default(&dir.path().join("config.json")).unwrap();
    assert_eq!(settings, Settings::default());
  }

  #[test]
  fn test_load_rejects_invalid_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(
      Settings::load(&path),
      Err(ConfigError::Parse(_))
    ));
  }
}
