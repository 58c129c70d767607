//! Deterministic local adapter.
//!
//! Used when a backend is not wired to a real service (local runs, demos) and
//! by tests. Identifiers are rendered from a template with the placeholders
//! `{first}`, `{last}`, `{id}` and `{section}`; names are lowercased.

use async_trait::async_trait;
use tracing::info;

use crate::adapter::{Adapter, AdapterReceipt, Subject};
use crate::error::AdapterError;

#[derive(Debug, Clone, PartialEq)]
enum Behavior {
  Succeed { identifier_template: Option<String> },
  Fail { message: String },
}

/// An adapter that succeeds or fails without leaving the process.
#[derive(Debug, Clone)]
pub struct StubAdapter {
  name: String,
  behavior: Behavior,
}

impl StubAdapter {
  /// A stub that succeeds, returning an identifier rendered from `template`.
  pub fn succeeding(name: impl Into<String>, template: Option<&str>) -> Self {
    Self {
      name: name.into(),
      behavior: Behavior::Succeed {
        identifier_template: template.map(str::to_string),
      },
    }
  }

  /// A stub that always rejects with `message`.
  pub fn failing(name: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      behavior: Behavior::Fail {
        message: message.into(),
      },
    }
  }

  fn respond(&self, subject: &Subject, operation: &str) -> Result<AdapterReceipt, AdapterError> {
    match &self.behavior {
      Behavior::Fail { message } => Err(AdapterError::rejected(message.clone())),
      Behavior::Succeed {
        identifier_template,
      } => {
        let identifier = identifier_template
          .as_deref()
          .map(|t| render_identifier(t, subject));
        info!(
          backend = %self.name,
          request_id = subject.request_id,
          operation,
          identifier = ?identifier,
          "stub adapter call"
        );
        Ok(AdapterReceipt {
          identifier,
          details: serde_json::json!({ "stub": true, "operation": operation }),
        })
      }
    }
  }
}

/// Render an identifier template for a subject.
pub fn render_identifier(template: &str, subject: &Subject) -> String {
  template
    .replace("{first}", &slug(subject.first_name()))
    .replace("{last}", &slug(subject.last_name()))
    .replace("{section}", &slug(&subject.section))
    .replace("{id}", &subject.request_id.to_string())
}

fn slug(value: &str) -> String {
  value
    .chars()
    .filter(|c| c.is_alphanumeric())
    .flat_map(char::to_lowercase)
    .collect()
}

#[async_trait]
impl Adapter for StubAdapter {
  fn name(&self) -> &str {
    &self.name
  }

  async fn provision(&self, subject: &Subject) -> Result<AdapterReceipt, AdapterError> {
    self.respond(subject, "provision")
  }

  async fn deprovision(&self, subject: &Subject) -> Result<AdapterReceipt, AdapterError> {
    let mut receipt = self.respond(subject, "deprovision")?;
    // Deprovisioning acts on the existing account when one is known.
    if let Some(email) = &subject.directory_email
      && receipt.identifier.is_none()
    {
      receipt.identifier = Some(email.clone());
    }
    Ok(receipt)
  }
}
