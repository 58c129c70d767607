use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use staffflow_config::{Capability, WorkflowType};

/// Overall status of a workflow request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum RequestStatus {
  Pending,
  InProgress,
  Completed,
  Failed,
}

impl RequestStatus {
  pub const ALL: [RequestStatus; 4] = [
    RequestStatus::Pending,
    RequestStatus::InProgress,
    RequestStatus::Completed,
    RequestStatus::Failed,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      RequestStatus::Pending => "pending",
      RequestStatus::InProgress => "in_progress",
      RequestStatus::Completed => "completed",
      RequestStatus::Failed => "failed",
    }
  }
}

impl FromStr for RequestStatus {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    RequestStatus::ALL
      .into_iter()
      .find(|status| status.as_str() == s)
      .ok_or_else(|| {
        let known: Vec<_> = RequestStatus::ALL.iter().map(|s| s.as_str()).collect();
        format!("unknown status '{}' (expected one of {})", s, known.join(", "))
      })
  }
}

/// Status of a single ledger step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum StepStatus {
  Pending,
  InProgress,
  Completed,
  Failed,
  Skipped,
}

impl StepStatus {
  pub fn is_terminal(&self) -> bool {
    matches!(
      self,
      StepStatus::Completed | StepStatus::Failed | StepStatus::Skipped
    )
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      StepStatus::Pending => "pending",
      StepStatus::InProgress => "in_progress",
      StepStatus::Completed => "completed",
      StepStatus::Failed => "failed",
      StepStatus::Skipped => "skipped",
    }
  }
}

/// Kind of an activity log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ActivityType {
  RequestCreated,
  WorkflowStarted,
  WorkflowResumed,
  StepSkipped,
  ManualTaskQueued,
  StepStarted,
  StepCompleted,
  StepFailed,
  StepRetried,
  ManualTaskCompleted,
  StatusChanged,
  NotificationFailed,
}

/// Payload recorded on a step when it reaches a terminal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepResultData {
  /// An adapter granted access.
  Provisioned {
    backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    identifier: Option<String>,
    /// Adapter payload with no fixed shape.
    #[serde(default)]
    details: serde_json::Value,
  },
  /// An adapter revoked access.
  Deprovisioned {
    backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    identifier: Option<String>,
    #[serde(default)]
    details: serde_json::Value,
  },
  /// A human completed a manual task.
  ManualCompletion { notes: String, completed_by: String },
  /// The step did not apply or was waived.
  Skipped {
    reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    skipped_by: Option<String>,
  },
}

/// A workflow request as stored in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct WorkflowRequest {
  pub id: i64,
  pub workflow_type: WorkflowType,
  pub full_name: String,
  pub position: String,
  pub section: String,
  pub effective_date: NaiveDate,
  pub personal_email: Option<String>,
  pub mobile: Option<String>,
  pub fixed_line: Option<String>,
  pub access: Json<Vec<Capability>>,
  pub status: RequestStatus,
  pub directory_email: Option<String>,
  pub ticketing_user_id: Option<String>,
  pub wiki_username: Option<String>,
  pub crm_user_id: Option<String>,
  pub voip_extension: Option<String>,
  pub created_by: String,
  pub created_at: DateTime<Utc>,
  pub completed_at: Option<DateTime<Utc>>,
}

/// Data entered by a caller to create a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRequest {
  pub workflow_type: WorkflowType,
  pub full_name: String,
  pub position: String,
  pub section: String,
  pub effective_date: NaiveDate,
  #[serde(default)]
  pub personal_email: Option<String>,
  #[serde(default)]
  pub mobile: Option<String>,
  #[serde(default)]
  pub fixed_line: Option<String>,
  #[serde(default)]
  pub access: Vec<Capability>,
  /// Existing directory account, needed when offboarding.
  #[serde(default)]
  pub directory_email: Option<String>,
}

/// A step ledger row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct WorkflowStep {
  pub id: i64,
  pub request_id: i64,
  pub step_name: String,
  pub step_order: i64,
  pub status: StepStatus,
  pub requires_manual_action: bool,
  pub manual_action_instructions: Option<String>,
  pub backend: Option<String>,
  pub success: Option<bool>,
  pub result_data: Option<Json<StepResultData>>,
  pub error_message: Option<String>,
  pub attempts: i64,
  /// When the first attempt began.
  pub started_at: Option<DateTime<Utc>>,
  /// When the step first reached an outcome. Set once and kept across
  /// retries; the latest outcome is in `status` and `attempts`.
  pub completed_at: Option<DateTime<Utc>>,
  pub created_at: DateTime<Utc>,
}

/// A step row to insert when a request's ledger is generated.
#[derive(Debug, Clone, PartialEq)]
pub struct NewStep {
  pub step_name: String,
  pub step_order: i64,
  pub status: StepStatus,
  pub requires_manual_action: bool,
  pub manual_action_instructions: Option<String>,
  pub backend: Option<String>,
  pub result_data: Option<StepResultData>,
}

/// An audit log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ActivityLogEntry {
  pub id: i64,
  pub request_id: i64,
  pub step_id: Option<i64>,
  pub activity_type: ActivityType,
  pub description: String,
  pub created_by: String,
  pub metadata: Option<Json<serde_json::Value>>,
  pub created_at: DateTime<Utc>,
}

/// An audit log entry to append.
#[derive(Debug, Clone, PartialEq)]
pub struct NewActivity {
  pub request_id: i64,
  pub step_id: Option<i64>,
  pub activity_type: ActivityType,
  pub description: String,
  pub created_by: String,
  pub metadata: Option<serde_json::Value>,
}

impl NewActivity {
  pub fn new(
    request_id: i64,
    activity_type: ActivityType,
    description: impl Into<String>,
    created_by: impl Into<String>,
  ) -> Self {
    Self {
      request_id,
      step_id: None,
      activity_type,
      description: description.into(),
      created_by: created_by.into(),
      metadata: None,
    }
  }

  pub fn for_step(mut self, step_id: i64) -> Self {
    self.step_id = Some(step_id);
    self
  }

  pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
    self.metadata = Some(metadata);
    self
  }
}

/// A manual step awaiting a human, with a summary of its request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PendingManualTask {
  pub step_id: i64,
  pub request_id: i64,
  pub step_name: String,
  pub step_order: i64,
  pub status: StepStatus,
  pub manual_action_instructions: Option<String>,
  pub queued_at: DateTime<Utc>,
  pub workflow_type: WorkflowType,
  pub full_name: String,
  pub section: String,
  pub effective_date: NaiveDate,
}
