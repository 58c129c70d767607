//! Staffflow Store
//!
//! This crate provides the storage trait and SQLite implementation for
//! workflow requests, their step execution ledger, and the activity log.
//!
//! The [`Store`] trait defines operations for:
//! - Creating requests and moving them between statuses
//! - Generating and updating step ledger rows
//! - Appending to and reading the audit trail
//! - Querying the manual task queue

mod sqlite;
mod types;

pub use sqlite::SqliteStore;
pub use sqlx::types::Json;
pub use types::{
  ActivityLogEntry, ActivityType, NewActivity, NewRequest, NewStep, PendingManualTask,
  RequestStatus, StepResultData, StepStatus, WorkflowRequest, WorkflowStep,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use staffflow_config::ResultField;

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// The requested record was not found.
  #[error("not found: {0}")]
  NotFound(String),

  /// A database error occurred.
  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),

  /// Applying migrations failed.
  #[error("migration error: {0}")]
  Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Storage trait for requests, steps and activity.
#[async_trait]
pub trait Store: Send + Sync {
  /// Insert a request in `pending` status and return its id.
  async fn create_request(&self, request: &NewRequest, created_by: &str) -> Result<i64, Error>;

  /// Get a request by id.
  async fn get_request(&self, request_id: i64) -> Result<WorkflowRequest, Error>;

  /// List requests, newest first, optionally filtered by status.
  async fn list_requests(
    &self,
    status: Option<RequestStatus>,
  ) -> Result<Vec<WorkflowRequest>, Error>;

  /// Move a `pending` request to `in_progress` and hand its run lease to
  /// `token` in the same update.
  ///
  /// Returns `false` if the request was not `pending`.
  async fn start_run(
    &self,
    request_id: i64,
    token: &str,
    expires_at: DateTime<Utc>,
  ) -> Result<bool, Error>;

  /// Take or renew the run lease for `token`.
  ///
  /// Succeeds when the lease is free, already held by `token`, or expired at
  /// `now`. Returns `false` while another live token holds it.
  async fn claim_run(
    &self,
    request_id: i64,
    token: &str,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
  ) -> Result<bool, Error>;

  /// Drop the run lease if `token` still holds it.
  async fn release_run(&self, request_id: i64, token: &str) -> Result<(), Error>;

  /// Overwrite a request's status.
  async fn set_request_status(
    &self,
    request_id: i64,
    status: RequestStatus,
    completed_at: Option<DateTime<Utc>>,
  ) -> Result<(), Error>;

  /// Write an adapter identifier into one of the request's result columns.
  async fn set_result_field(
    &self,
    request_id: i64,
    field: ResultField,
    value: &str,
  ) -> Result<(), Error>;

  /// Insert the ledger rows for a request in one transaction.
  ///
  /// If the request already has steps nothing is inserted. Either way the
  /// request's steps are returned in `step_order`.
  async fn create_steps(
    &self,
    request_id: i64,
    steps: &[NewStep],
  ) -> Result<Vec<WorkflowStep>, Error>;

  /// Get a step by id.
  async fn get_step(&self, step_id: i64) -> Result<WorkflowStep, Error>;

  /// List a request's steps in `step_order`.
  async fn list_steps(&self, request_id: i64) -> Result<Vec<WorkflowStep>, Error>;

  /// Atomically move a step from `from` to `to`, returning `false` if it was
  /// not in `from`.
  async fn transition_step(
    &self,
    step_id: i64,
    from: StepStatus,
    to: StepStatus,
  ) -> Result<bool, Error>;

  /// Persist all mutable fields of a step.
  async fn update_step(&self, step: &WorkflowStep) -> Result<(), Error>;

  /// Append an audit entry and return its id.
  async fn append_activity(&self, activity: &NewActivity) -> Result<i64, Error>;

  /// List a request's audit entries, oldest first.
  async fn list_activity(&self, request_id: i64) -> Result<Vec<ActivityLogEntry>, Error>;

  /// Manual steps in `pending` or `in_progress`, with their request summary.
  async fn list_pending_manual_tasks(&self) -> Result<Vec<PendingManualTask>, Error>;
}
