//! Request status rollup.

use staffflow_store::{RequestStatus, StepStatus};

/// Derive a started request's status from its steps.
///
/// - any step `failed` → `failed` (sticky until that step is re-run)
/// - every step terminal → `completed`
/// - otherwise → `in_progress`
pub fn rollup(statuses: impl IntoIterator<Item = StepStatus>) -> RequestStatus {
  let mut all_terminal = true;
  for status in statuses {
    if status == StepStatus::Failed {
      return RequestStatus::Failed;
    }
    all_terminal &= status.is_terminal();
  }

  if all_terminal {
    RequestStatus::Completed
  } else {
    RequestStatus::InProgress
  }
}
