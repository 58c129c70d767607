//! Request notifications for HR/IT.
//!
//! A summary is sent after a request is created. Delivery is best effort:
//! the orchestrator logs and records a failed or timed out send but never
//! fails the request because of it.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use staffflow_config::{Capability, WorkflowType};
use staffflow_store::WorkflowRequest;
use tokio::sync::mpsc;

/// What HR/IT are told about a new request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestSummary {
  pub request_id: i64,
  pub workflow_type: WorkflowType,
  pub full_name: String,
  pub position: String,
  pub section: String,
  pub effective_date: NaiveDate,
  pub access: Vec<Capability>,
  pub created_by: String,
}

impl From<&WorkflowRequest> for RequestSummary {
  fn from(request: &WorkflowRequest) -> Self {
    Self {
      request_id: request.id,
      workflow_type: request.workflow_type.clone(),
      full_name: request.full_name.clone(),
      position: request.position.clone(),
      section: request.section.clone(),
      effective_date: request.effective_date,
      access: request.access.0.clone(),
      created_by: request.created_by.clone(),
    }
  }
}

/// Errors from a notification attempt.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("notification channel closed")]
  ChannelClosed,

  #[error("notification timed out after {timeout_ms}ms")]
  Timeout { timeout_ms: u64 },
}

/// Delivers request summaries.
#[async_trait]
pub trait NotificationSender: Send + Sync {
  async fn send(&self, summary: &RequestSummary) -> Result<(), NotifyError>;
}

/// A sender that discards all summaries.
#[derive(Debug, Clone, Default)]
pub struct NoopSender;

#[async_trait]
impl NotificationSender for NoopSender {
  async fn send(&self, _summary: &RequestSummary) -> Result<(), NotifyError> {
    Ok(())
  }
}

/// A sender that forwards summaries to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSender {
  sender: mpsc::UnboundedSender<RequestSummary>,
}

impl ChannelSender {
  pub fn new(sender: mpsc::UnboundedSender<RequestSummary>) -> Self {
    Self { sender }
  }
}

#[async_trait]
impl NotificationSender for ChannelSender {
  async fn send(&self, summary: &RequestSummary) -> Result<(), NotifyError> {
    self
      .sender
      .send(summary.clone())
      .map_err(|_| NotifyError::ChannelClosed)
  }
}

/// A sender that POSTs the summary as JSON to a webhook.
///
/// Every request, connect included, is bounded by the client timeout.
#[derive(Debug, Clone)]
pub struct WebhookSender {
  url: String,
  client: reqwest::Client,
}

impl WebhookSender {
  pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    Ok(Self {
      url: url.into(),
      client,
    })
  }
}

#[async_trait]
impl NotificationSender for WebhookSender {
  async fn send(&self, summary: &RequestSummary) -> Result<(), NotifyError> {
    self
      .client
      .post(&self.url)
      .json(summary)
      .send()
      .await?
      .error_for_status()?;
    Ok(())
  }
}

#[async_trait]
impl<T: NotificationSender + ?Sized> NotificationSender for std::sync::Arc<T> {
  async fn send(&self, summary: &RequestSummary) -> Result<(), NotifyError> {
    (**self).send(summary).await
  }
}
