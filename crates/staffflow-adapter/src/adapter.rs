//! The capability interface every backend exposes to the orchestrator.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use staffflow_config::{Capability, Operation, WorkflowType};

use crate::error::AdapterError;

/// The staff member a provisioning call is about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
  pub request_id: i64,
  pub workflow_type: WorkflowType,
  pub full_name: String,
  pub position: String,
  pub section: String,
  pub effective_date: NaiveDate,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub personal_email: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub mobile: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub fixed_line: Option<String>,
  pub access: Vec<Capability>,
  /// Directory account, once known (created earlier in the run, or supplied
  /// for offboarding).
  #[serde(skip_serializing_if = "Option::is_none")]
  pub directory_email: Option<String>,
}

impl Subject {
  pub fn first_name(&self) -> &str {
    self.full_name.split_whitespace().next().unwrap_or_default()
  }

  pub fn last_name(&self) -> &str {
    let mut parts = self.full_name.split_whitespace();
    let first = parts.next();
    parts.last().or(first).unwrap_or_default()
  }
}

/// What a backend returns on success.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdapterReceipt {
  /// Identifier of the account/user in the backend, if it has one.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub identifier: Option<String>,
  /// Any further payload the backend returned.
  #[serde(default)]
  pub details: serde_json::Value,
}

impl AdapterReceipt {
  pub fn with_identifier(identifier: impl Into<String>) -> Self {
    Self {
      identifier: Some(identifier.into()),
      details: serde_json::Value::Null,
    }
  }
}

/// A backend system that can grant and revoke a staff member's access.
#[async_trait]
pub trait Adapter: Send + Sync {
  /// Backend name this adapter is registered under (e.g. "directory").
  fn name(&self) -> &str;

  async fn provision(&self, subject: &Subject) -> Result<AdapterReceipt, AdapterError>;

  async fn deprovision(&self, subject: &Subject) -> Result<AdapterReceipt, AdapterError>;

  /// Dispatch to [`provision`](Adapter::provision) or
  /// [`deprovision`](Adapter::deprovision).
  async fn invoke(
    &self,
    operation: Operation,
    subject: &Subject,
  ) -> Result<AdapterReceipt, AdapterError> {
    match operation {
      Operation::Provision => self.provision(subject).await,
      Operation::Deprovision => self.deprovision(subject).await,
    }
  }
}

#[cfg(test)]
pub(crate) fn test_subject(full_name: &str) -> Subject {
  Subject {
    request_id: 7,
    workflow_type: WorkflowType::onboarding(),
    full_name: full_name.to_string(),
    position: "Estimator".to_string(),
    section: "Sales".to_string(),
    effective_date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
    personal_email: None,
    mobile: None,
    fixed_line: None,
    access: vec![Capability::Directory],
    directory_email: None,
  }
}
