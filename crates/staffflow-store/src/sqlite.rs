use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::types::Json;
use staffflow_config::ResultField;
use tracing::debug;

use crate::{
  ActivityLogEntry, Error, NewActivity, NewRequest, NewStep, PendingManualTask, RequestStatus,
  StepStatus, Store, WorkflowRequest, WorkflowStep,
};

const REQUEST_COLUMNS: &str = r#"
  id, workflow_type, full_name, position, section, effective_date,
  personal_email, mobile, fixed_line, access, status,
  directory_email, ticketing_user_id, wiki_username, crm_user_id, voip_extension,
  created_by, created_at, completed_at
"#;

const STEP_COLUMNS: &str = r#"
  id, request_id, step_name, step_order, status, requires_manual_action,
  manual_action_instructions, backend, success, result_data, error_message,
  attempts, started_at, completed_at, created_at
"#;

/// SQLite-based store implementation.
#[derive(Clone)]
pub struct SqliteStore {
  pool: SqlitePool,
}

impl SqliteStore {
  /// Create a new SQLite store with the given connection pool.
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }

  /// Open (creating if missing) the database at `url`.
  pub async fn connect(url: &str) -> Result<Self, Error> {
    let options = SqliteConnectOptions::from_str(url)?
      .create_if_missing(true)
      .foreign_keys(true);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    Ok(Self::new(pool))
  }

  /// A migrated store backed by a single in-memory connection.
  pub async fn in_memory() -> Result<Self, Error> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
      .max_connections(1)
      .idle_timeout(None)
      .max_lifetime(None)
      .connect_with(options)
      .await?;
    let store = Self::new(pool);
    store.migrate().await?;
    Ok(store)
  }

  /// Run database migrations.
  pub async fn migrate(&self) -> Result<(), Error> {
    sqlx::migrate!("../../migrations").run(&self.pool).await?;
    Ok(())
  }

  pub fn pool(&self) -> &SqlitePool {
    &self.pool
  }
}

fn result_column(field: ResultField) -> &'static str {
  match field {
    ResultField::DirectoryEmail => "directory_email",
    ResultField::TicketingUserId => "ticketing_user_id",
    ResultField::WikiUsername => "wiki_username",
    ResultField::CrmUserId => "crm_user_id",
    ResultField::VoipExtension => "voip_extension",
  }
}

#[async_trait]
impl Store for SqliteStore {
  async fn create_request(&self, request: &NewRequest, created_by: &str) -> Result<i64, Error> {
    let mut access = request.access.clone();
    access.sort();
    access.dedup();

    let result = sqlx::query(
      r#"
            INSERT INTO workflow_requests (
              workflow_type, full_name, position, section, effective_date,
              personal_email, mobile, fixed_line, access, status,
              directory_email, created_by, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
    )
    .bind(&request.workflow_type)
    .bind(&request.full_name)
    .bind(&request.position)
    .bind(&request.section)
    .bind(request.effective_date)
    .bind(&request.personal_email)
    .bind(&request.mobile)
    .bind(&request.fixed_line)
    .bind(Json(access))
    .bind(RequestStatus::Pending)
    .bind(&request.directory_email)
    .bind(created_by)
    .bind(Utc::now())
    .execute(&self.pool)
    .await?;

    let id = result.last_insert_rowid();
    debug!(request_id = id, "request inserted");
    Ok(id)
  }

  async fn get_request(&self, request_id: i64) -> Result<WorkflowRequest, Error> {
    sqlx::query_as(&format!(
      "SELECT {} FROM workflow_requests WHERE id = ?",
      REQUEST_COLUMNS
    ))
    .bind(request_id)
    .fetch_optional(&self.pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("request {}", request_id)))
  }

  async fn list_requests(
    &self,
    status: Option<RequestStatus>,
  ) -> Result<Vec<WorkflowRequest>, Error> {
    let requests = sqlx::query_as(&format!(
      "SELECT {} FROM workflow_requests WHERE (? IS NULL OR status = ?) ORDER BY id DESC",
      REQUEST_COLUMNS
    ))
    .bind(status)
    .bind(status)
    .fetch_all(&self.pool)
    .await?;
    Ok(requests)
  }

  async fn start_run(
    &self,
    request_id: i64,
    token: &str,
    expires_at: DateTime<Utc>,
  ) -> Result<bool, Error> {
    let result = sqlx::query(
      r#"
            UPDATE workflow_requests
            SET status = ?, run_token = ?, run_expires_at = ?
            WHERE id = ? AND status = ?
            "#,
    )
    .bind(RequestStatus::InProgress)
    .bind(token)
    .bind(expires_at.timestamp_millis())
    .bind(request_id)
    .bind(RequestStatus::Pending)
    .execute(&self.pool)
    .await?;

    Ok(result.rows_affected() == 1)
  }

  async fn claim_run(
    &self,
    request_id: i64,
    token: &str,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
  ) -> Result<bool, Error> {
    let result = sqlx::query(
      r#"
            UPDATE workflow_requests
            SET run_token = ?, run_expires_at = ?
            WHERE id = ?
              AND (run_token IS NULL OR run_token = ? OR run_expires_at <= ?)
            "#,
    )
    .bind(token)
    .bind(expires_at.timestamp_millis())
    .bind(request_id)
    .bind(token)
    .bind(now.timestamp_millis())
    .execute(&self.pool)
    .await?;

    let claimed = result.rows_affected() == 1;
    debug!(request_id, claimed, "run lease claim");
    Ok(claimed)
  }

  async fn release_run(&self, request_id: i64, token: &str) -> Result<(), Error> {
    sqlx::query(
      r#"
            UPDATE workflow_requests
            SET run_token = NULL, run_expires_at = NULL
            WHERE id = ? AND run_token = ?
            "#,
    )
    .bind(request_id)
    .bind(token)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn set_request_status(
    &self,
    request_id: i64,
    status: RequestStatus,
    completed_at: Option<DateTime<Utc>>,
  ) -> Result<(), Error> {
    let result = sqlx::query(
      r#"
            UPDATE workflow_requests
            SET status = ?, completed_at = ?
            WHERE id = ?
            "#,
    )
    .bind(status)
    .bind(completed_at)
    .bind(request_id)
    .execute(&self.pool)
    .await?;

    if result.rows_affected() == 0 {
      return Err(Error::NotFound(format!("request {}", request_id)));
    }
    Ok(())
  }

  async fn set_result_field(
    &self,
    request_id: i64,
    field: ResultField,
    value: &str,
  ) -> Result<(), Error> {
    let result = sqlx::query(&format!(
      "UPDATE workflow_requests SET {} = ? WHERE id = ?",
      result_column(field)
    ))
    .bind(value)
    .bind(request_id)
    .execute(&self.pool)
    .await?;

    if result.rows_affected() == 0 {
      return Err(Error::NotFound(format!("request {}", request_id)));
    }
    Ok(())
  }

  async fn create_steps(
    &self,
    request_id: i64,
    steps: &[NewStep],
  ) -> Result<Vec<WorkflowStep>, Error> {
    let mut tx = self.pool.begin().await?;

    let existing: i64 =
      sqlx::query_scalar("SELECT COUNT(*) FROM workflow_steps WHERE request_id = ?")
        .bind(request_id)
        .fetch_one(&mut *tx)
        .await?;

    if existing == 0 {
      let now = Utc::now();
      for step in steps {
        let completed_at = step.status.is_terminal().then_some(now);
        sqlx::query(
          r#"
                INSERT INTO workflow_steps (
                  request_id, step_name, step_order, status, requires_manual_action,
                  manual_action_instructions, backend, result_data, completed_at, created_at
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
        )
        .bind(request_id)
        .bind(&step.step_name)
        .bind(step.step_order)
        .bind(step.status)
        .bind(step.requires_manual_action)
        .bind(&step.manual_action_instructions)
        .bind(&step.backend)
        .bind(step.result_data.as_ref().map(Json))
        .bind(completed_at)
        .bind(now)
        .execute(&mut *tx)
        .await?;
      }
      debug!(request_id, count = steps.len(), "step ledger created");
    }

    tx.commit().await?;
    self.list_steps(request_id).await
  }

  async fn get_step(&self, step_id: i64) -> Result<WorkflowStep, Error> {
    sqlx::query_as(&format!(
      "SELECT {} FROM workflow_steps WHERE id = ?",
      STEP_COLUMNS
    ))
    .bind(step_id)
    .fetch_optional(&self.pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("step {}", step_id)))
  }

  async fn list_steps(&self, request_id: i64) -> Result<Vec<WorkflowStep>, Error> {
    let steps = sqlx::query_as(&format!(
      "SELECT {} FROM workflow_steps WHERE request_id = ? ORDER BY step_order ASC",
      STEP_COLUMNS
    ))
    .bind(request_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(steps)
  }

  async fn transition_step(
    &self,
    step_id: i64,
    from: StepStatus,
    to: StepStatus,
  ) -> Result<bool, Error> {
    let result = sqlx::query(
      r#"
            UPDATE workflow_steps
            SET status = ?
            WHERE id = ? AND status = ?
            "#,
    )
    .bind(to)
    .bind(step_id)
    .bind(from)
    .execute(&self.pool)
    .await?;

    Ok(result.rows_affected() == 1)
  }

  async fn update_step(&self, step: &WorkflowStep) -> Result<(), Error> {
    let result = sqlx::query(
      r#"
            UPDATE workflow_steps
            SET status = ?, success = ?, result_data = ?, error_message = ?,
                attempts = ?, started_at = ?, completed_at = ?
            WHERE id = ?
            "#,
    )
    .bind(step.status)
    .bind(step.success)
    .bind(&step.result_data)
    .bind(&step.error_message)
    .bind(step.attempts)
    .bind(step.started_at)
    .bind(step.completed_at)
    .bind(step.id)
    .execute(&self.pool)
    .await?;

    if result.rows_affected() == 0 {
      return Err(Error::NotFound(format!("step {}", step.id)));
    }
    Ok(())
  }

  async fn append_activity(&self, activity: &NewActivity) -> Result<i64, Error> {
    let result = sqlx::query(
      r#"
            INSERT INTO activity_log (
              request_id, step_id, activity_type, description, created_by, metadata, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
    )
    .bind(activity.request_id)
    .bind(activity.step_id)
    .bind(activity.activity_type)
    .bind(&activity.description)
    .bind(&activity.created_by)
    .bind(activity.metadata.as_ref().map(Json))
    .bind(Utc::now())
    .execute(&self.pool)
    .await?;

    Ok(result.last_insert_rowid())
  }

  async fn list_activity(&self, request_id: i64) -> Result<Vec<ActivityLogEntry>, Error> {
    let entries = sqlx::query_as(
      r#"
            SELECT id, request_id, step_id, activity_type, description, created_by, metadata, created_at
            FROM activity_log
            WHERE request_id = ?
            ORDER BY id ASC
            "#,
    )
    .bind(request_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(entries)
  }

  async fn list_pending_manual_tasks(&self) -> Result<Vec<PendingManualTask>, Error> {
    let tasks = sqlx::query_as(
      r#"
            SELECT s.id AS step_id, s.request_id, s.step_name, s.step_order, s.status,
                   s.manual_action_instructions, s.created_at AS queued_at,
                   r.workflow_type, r.full_name, r.section, r.effective_date
            FROM workflow_steps s
            JOIN workflow_requests r ON r.id = s.request_id
            WHERE s.requires_manual_action = 1
              AND s.status IN ('pending', 'in_progress')
            ORDER BY s.request_id ASC, s.step_order ASC
            "#,
    )
    .fetch_all(&self.pool)
    .await?;
    Ok(tasks)
  }
}
