//! Orchestration results.

use serde::{Deserialize, Serialize};
use staffflow_store::{ActivityLogEntry, RequestStatus, WorkflowRequest, WorkflowStep};

/// Outcome of running a request's step ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartResult {
  pub request_id: i64,
  /// Request status after rollup.
  pub status: RequestStatus,
  /// True only when the rollup reached `completed`.
  pub success: bool,
  /// All steps of the request, in `step_order`.
  pub steps: Vec<WorkflowStep>,
}

/// A request with its ledger and audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestDetail {
  pub request: WorkflowRequest,
  pub steps: Vec<WorkflowStep>,
  pub activity: Vec<ActivityLogEntry>,
}
