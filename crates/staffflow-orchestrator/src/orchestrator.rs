//! The workflow orchestrator.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::json;
use staffflow_adapter::{AdapterError, AdapterReceipt, AdapterRegistry, Subject};
use staffflow_config::{Operation, Settings, StepCatalog, StepDef, WorkflowDef, WorkflowType};
use staffflow_store::{
  ActivityType, Json, NewActivity, NewRequest, NewStep, PendingManualTask, RequestStatus,
  StepResultData, StepStatus, Store, WorkflowRequest, WorkflowStep,
};
use tracing::{debug, error, info, instrument, warn};

use crate::error::OrchestratorError;
use crate::notify::{NoopSender, NotificationSender, NotifyError, RequestSummary};
use crate::result::{RequestDetail, StartResult};
use crate::rollup::rollup;

const CAPABILITY_NOT_REQUESTED: &str = "capability not requested";

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
  /// Upper bound on a single adapter call.
  pub adapter_timeout: Duration,
  /// How long a run owns its request without renewing the lease.
  ///
  /// The lease is renewed before every automatable step, so this must be
  /// longer than `adapter_timeout`.
  pub run_lease: Duration,
  /// Upper bound on delivering one notification.
  pub notification_timeout: Duration,
  /// Actor recorded on activity the orchestrator writes itself.
  pub system_actor: String,
}

impl Default for OrchestratorConfig {
  fn default() -> Self {
    Self {
      adapter_timeout: Duration::from_secs(30),
      run_lease: Duration::from_secs(60),
      notification_timeout: Duration::from_secs(10),
      system_actor: "staffflow".to_string(),
    }
  }
}

impl From<&Settings> for OrchestratorConfig {
  fn from(settings: &Settings) -> Self {
    let adapter_timeout = Duration::from_millis(settings.adapter_timeout_ms);
    Self {
      adapter_timeout,
      run_lease: adapter_timeout * 2,
      notification_timeout: Duration::from_millis(settings.notification_timeout_ms),
      system_actor: settings.system_actor.clone(),
    }
  }
}

/// Drives workflow requests through their step ledgers.
///
/// Each automatable step calls its backend adapter in a spawned task bounded
/// by [`OrchestratorConfig::adapter_timeout`]. Adapter failures are recorded
/// on the step and never abort the run. Manual steps are left `pending` for a
/// human. Request status is only ever written by the shared rollup.
///
/// A run (`start`, `resume` or `retry_step`) holds a lease on its request
/// for its whole duration, and claims each `pending` step before calling its
/// adapter, so no two runs ever execute the same step.
pub struct Orchestrator<S, N = NoopSender> {
  store: S,
  catalog: Arc<StepCatalog>,
  adapters: AdapterRegistry,
  config: OrchestratorConfig,
  sender: N,
}

impl<S: Store> Orchestrator<S> {
  /// Create an orchestrator with default config and no notifications.
  pub fn new(store: S, catalog: Arc<StepCatalog>, adapters: AdapterRegistry) -> Self {
    Self {
      store,
      catalog,
      adapters,
      config: OrchestratorConfig::default(),
      sender: NoopSender,
    }
  }
}

impl<S: Store, N: NotificationSender> Orchestrator<S, N> {
  pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
    self.config = config;
    self
  }

  /// Replace the notification sender.
  pub fn with_sender<M: NotificationSender>(self, sender: M) -> Orchestrator<S, M> {
    Orchestrator {
      store: self.store,
      catalog: self.catalog,
      adapters: self.adapters,
      config: self.config,
      sender,
    }
  }

  pub fn store(&self) -> &S {
    &self.store
  }

  pub fn catalog(&self) -> &StepCatalog {
    &self.catalog
  }

  /// Validate and persist a new request in `pending` status.
  #[instrument(
    name = "request_create",
    skip(self, request),
    fields(workflow_type = %request.workflow_type)
  )]
  pub async fn create_request(
    &self,
    request: NewRequest,
    created_by: &str,
  ) -> Result<i64, OrchestratorError> {
    self.workflow_def(&request.workflow_type)?;
    for (field, value) in [
      ("full_name", &request.full_name),
      ("position", &request.position),
      ("section", &request.section),
    ] {
      if value.trim().is_empty() {
        return Err(OrchestratorError::InvalidRequest {
          message: format!("{field} must not be empty"),
        });
      }
    }

    let request_id = self.store.create_request(&request, created_by).await?;
    self
      .record(NewActivity::new(
        request_id,
        ActivityType::RequestCreated,
        format!(
          "{} request created for {}",
          request.workflow_type, request.full_name
        ),
        created_by,
      ))
      .await?;

    info!(request_id, created_by, "request_created");

    let stored = self.store.get_request(request_id).await?;
    self.notify(&stored).await?;

    Ok(request_id)
  }

  /// Start a pending request: generate its ledger and run every step once.
  #[instrument(name = "workflow_start", skip(self))]
  pub async fn start(&self, request_id: i64) -> Result<StartResult, OrchestratorError> {
    let request = self.store.get_request(request_id).await?;
    let def = self.workflow_def(&request.workflow_type)?;

    let token = run_token();
    if !self
      .store
      .start_run(request_id, &token, self.lease_expiry())
      .await?
    {
      return Err(OrchestratorError::invalid_state(format!(
        "request {request_id} is not pending"
      )));
    }

    self
      .record(NewActivity::new(
        request_id,
        ActivityType::WorkflowStarted,
        format!("{} workflow started", request.workflow_type),
        &self.config.system_actor,
      ))
      .await?;

    info!(
      request_id,
      workflow_type = %request.workflow_type,
      steps = def.steps.len(),
      "workflow_started"
    );

    self.drive(&request, def, &token).await
  }

  /// Continue an `in_progress` request whose run was interrupted.
  ///
  /// Terminal and manual steps are left alone; automatable steps still
  /// `pending`, or `in_progress` under a lapsed lease, are executed. Refused
  /// while another run holds a live lease on the request.
  #[instrument(name = "workflow_resume", skip(self))]
  pub async fn resume(&self, request_id: i64) -> Result<StartResult, OrchestratorError> {
    let request = self.store.get_request(request_id).await?;
    if request.status != RequestStatus::InProgress {
      return Err(OrchestratorError::invalid_state(format!(
        "request {request_id} is {}, only in_progress requests can be resumed",
        request.status.as_str()
      )));
    }
    let def = self.workflow_def(&request.workflow_type)?;

    let token = run_token();
    self.claim_run(request_id, &token).await?;

    self
      .record(NewActivity::new(
        request_id,
        ActivityType::WorkflowResumed,
        format!("{} workflow resumed", request.workflow_type),
        &self.config.system_actor,
      ))
      .await?;

    info!(request_id, "workflow_resumed");

    self.drive(&request, def, &token).await
  }

  /// Mark a manual step done and re-evaluate the request.
  #[instrument(name = "manual_task_complete", skip(self, notes))]
  pub async fn complete_manual_task(
    &self,
    step_id: i64,
    notes: &str,
    completed_by: &str,
  ) -> Result<WorkflowStep, OrchestratorError> {
    let mut step = self.store.get_step(step_id).await?;
    if !step.requires_manual_action {
      return Err(OrchestratorError::invalid_state(format!(
        "step {step_id} ({}) is not a manual task",
        step.step_name
      )));
    }
    if step.status.is_terminal() {
      return Err(OrchestratorError::invalid_state(format!(
        "step {step_id} ({}) is already {}",
        step.step_name,
        step.status.as_str()
      )));
    }
    if !self
      .store
      .transition_step(step_id, step.status, StepStatus::Completed)
      .await?
    {
      return Err(OrchestratorError::invalid_state(format!(
        "step {step_id} changed while being completed"
      )));
    }

    let now = Utc::now();
    step.status = StepStatus::Completed;
    step.success = Some(true);
    step.result_data = Some(Json(StepResultData::ManualCompletion {
      notes: notes.to_string(),
      completed_by: completed_by.to_string(),
    }));
    step.started_at.get_or_insert(now);
    step.completed_at = Some(now);
    self.store.update_step(&step).await?;

    self
      .record(
        NewActivity::new(
          step.request_id,
          ActivityType::ManualTaskCompleted,
          format!("Manual task completed: {}", step.step_name),
          completed_by,
        )
        .for_step(step_id)
        .with_metadata(json!({ "notes": notes })),
      )
      .await?;

    info!(
      request_id = step.request_id,
      step_id,
      step_name = %step.step_name,
      completed_by,
      "manual_task_completed"
    );

    self.apply_rollup(step.request_id).await?;
    Ok(step)
  }

  /// Mark a non-terminal manual step as not applicable.
  #[instrument(name = "step_skip", skip(self, reason))]
  pub async fn skip_step(
    &self,
    step_id: i64,
    reason: &str,
    skipped_by: &str,
  ) -> Result<WorkflowStep, OrchestratorError> {
    let mut step = self.store.get_step(step_id).await?;
    if !step.requires_manual_action {
      return Err(OrchestratorError::invalid_state(format!(
        "step {step_id} ({}) is automatable; only manual steps can be skipped",
        step.step_name
      )));
    }
    if step.status.is_terminal() {
      return Err(OrchestratorError::invalid_state(format!(
        "step {step_id} ({}) is already {}",
        step.step_name,
        step.status.as_str()
      )));
    }
    if !self
      .store
      .transition_step(step_id, step.status, StepStatus::Skipped)
      .await?
    {
      return Err(OrchestratorError::invalid_state(format!(
        "step {step_id} changed while being skipped"
      )));
    }

    step.status = StepStatus::Skipped;
    step.success = None;
    step.result_data = Some(Json(StepResultData::Skipped {
      reason: reason.to_string(),
      skipped_by: Some(skipped_by.to_string()),
    }));
    step.completed_at = Some(Utc::now());
    self.store.update_step(&step).await?;

    self
      .record(
        NewActivity::new(
          step.request_id,
          ActivityType::StepSkipped,
          format!("Step skipped: {} ({reason})", step.step_name),
          skipped_by,
        )
        .for_step(step_id),
      )
      .await?;

    info!(request_id = step.request_id, step_id, skipped_by, "step_skipped");

    self.apply_rollup(step.request_id).await?;
    Ok(step)
  }

  /// Re-run a failed automatable step.
  ///
  /// This is the only way a `failed` step, and so a `failed` request, can
  /// recover. Refused while another run holds the request's lease.
  #[instrument(name = "step_retry", skip(self))]
  pub async fn retry_step(
    &self,
    step_id: i64,
    retried_by: &str,
  ) -> Result<WorkflowStep, OrchestratorError> {
    let step = self.store.get_step(step_id).await?;
    if step.requires_manual_action {
      return Err(OrchestratorError::invalid_state(format!(
        "step {step_id} ({}) is a manual task",
        step.step_name
      )));
    }
    if step.status != StepStatus::Failed {
      return Err(OrchestratorError::invalid_state(format!(
        "step {step_id} ({}) is {}, only failed steps can be retried",
        step.step_name,
        step.status.as_str()
      )));
    }

    let request = self.store.get_request(step.request_id).await?;
    let def = self.workflow_def(&request.workflow_type)?;

    let token = run_token();
    self.claim_run(request.id, &token).await?;
    let outcome = self.retry_claimed(def, step, retried_by).await;
    self.store.release_run(request.id, &token).await?;

    let step = outcome?;
    self.apply_rollup(step.request_id).await?;
    Ok(step)
  }

  async fn retry_claimed(
    &self,
    def: &WorkflowDef,
    mut step: WorkflowStep,
    retried_by: &str,
  ) -> Result<WorkflowStep, OrchestratorError> {
    let step_id = step.id;
    if !self
      .store
      .transition_step(step_id, StepStatus::Failed, StepStatus::InProgress)
      .await?
    {
      return Err(OrchestratorError::invalid_state(format!(
        "step {step_id} changed while being retried"
      )));
    }
    step.status = StepStatus::InProgress;

    self
      .record(
        NewActivity::new(
          step.request_id,
          ActivityType::StepRetried,
          format!("Step retried: {}", step.step_name),
          retried_by,
        )
        .for_step(step_id)
        .with_metadata(json!({ "previous_error": step.error_message })),
      )
      .await?;

    info!(request_id = step.request_id, step_id, retried_by, "step_retried");

    self.execute_step(def, step).await
  }

  /// A request with its steps and audit trail.
  pub async fn get_request(&self, request_id: i64) -> Result<RequestDetail, OrchestratorError> {
    let request = self.store.get_request(request_id).await?;
    let steps = self.store.list_steps(request_id).await?;
    let activity = self.store.list_activity(request_id).await?;
    Ok(RequestDetail {
      request,
      steps,
      activity,
    })
  }

  pub async fn list_requests(
    &self,
    status: Option<RequestStatus>,
  ) -> Result<Vec<WorkflowRequest>, OrchestratorError> {
    Ok(self.store.list_requests(status).await?)
  }

  /// Manual steps awaiting a human, across all requests.
  pub async fn list_pending_manual_tasks(
    &self,
  ) -> Result<Vec<PendingManualTask>, OrchestratorError> {
    Ok(self.store.list_pending_manual_tasks().await?)
  }

  fn workflow_def(&self, workflow_type: &WorkflowType) -> Result<&WorkflowDef, OrchestratorError> {
    self
      .catalog
      .get(workflow_type)
      .ok_or_else(|| OrchestratorError::UnknownWorkflowType(workflow_type.to_string()))
  }

  /// Run the ledger under `token`, then give the lease back.
  async fn drive(
    &self,
    request: &WorkflowRequest,
    def: &WorkflowDef,
    token: &str,
  ) -> Result<StartResult, OrchestratorError> {
    let outcome = self.run_ledger(request, def, token).await;
    let released = self.store.release_run(request.id, token).await;
    let result = outcome?;
    released?;
    Ok(result)
  }

  async fn run_ledger(
    &self,
    request: &WorkflowRequest,
    def: &WorkflowDef,
    token: &str,
  ) -> Result<StartResult, OrchestratorError> {
    let (steps, created) = self.generate_steps(request, def).await?;
    self.run_steps(def, steps, created, token).await?;
    self.finish(request.id).await
  }

  /// Take or renew the run lease, failing if another run holds it.
  async fn claim_run(&self, request_id: i64, token: &str) -> Result<(), OrchestratorError> {
    if self
      .store
      .claim_run(request_id, token, self.lease_expiry(), Utc::now())
      .await?
    {
      return Ok(());
    }
    warn!(request_id, "run_lease_held");
    Err(OrchestratorError::invalid_state(format!(
      "request {request_id} is being run by another worker"
    )))
  }

  fn lease_expiry(&self) -> DateTime<Utc> {
    let lease = chrono::Duration::from_std(self.config.run_lease)
      .unwrap_or_else(|_| chrono::Duration::seconds(60));
    Utc::now() + lease
  }

  /// Create the request's ledger unless it already has one.
  ///
  /// Returns the steps and whether they were created by this call.
  async fn generate_steps(
    &self,
    request: &WorkflowRequest,
    def: &WorkflowDef,
  ) -> Result<(Vec<WorkflowStep>, bool), OrchestratorError> {
    let existing = self.store.list_steps(request.id).await?;
    if !existing.is_empty() {
      return Ok((existing, false));
    }

    let new_steps: Vec<NewStep> = def
      .steps
      .iter()
      .map(|step_def| new_step(step_def, request))
      .collect();
    let steps = self.store.create_steps(request.id, &new_steps).await?;

    for step in steps.iter().filter(|s| s.status == StepStatus::Skipped) {
      self
        .record(
          NewActivity::new(
            request.id,
            ActivityType::StepSkipped,
            format!("Step skipped: {} ({CAPABILITY_NOT_REQUESTED})", step.step_name),
            &self.config.system_actor,
          )
          .for_step(step.id),
        )
        .await?;
    }

    Ok((steps, true))
  }

  /// Walk the ledger in order, executing automatable steps.
  ///
  /// Each `pending` step is claimed with a conditional transition and passed
  /// over if something else got to it first. A step already `in_progress` was
  /// abandoned by a run whose lease lapsed, and is run again under ours.
  async fn run_steps(
    &self,
    def: &WorkflowDef,
    steps: Vec<WorkflowStep>,
    queue_manual: bool,
    token: &str,
  ) -> Result<(), OrchestratorError> {
    for mut step in steps {
      if step.status.is_terminal() {
        continue;
      }

      if step.requires_manual_action {
        if queue_manual {
          self
            .record(
              NewActivity::new(
                step.request_id,
                ActivityType::ManualTaskQueued,
                format!("Manual task queued: {}", step.step_name),
                &self.config.system_actor,
              )
              .for_step(step.id),
            )
            .await?;
          info!(
            request_id = step.request_id,
            step_id = step.id,
            step_name = %step.step_name,
            "manual_task_queued"
          );
        }
        continue;
      }

      self.claim_run(step.request_id, token).await?;

      if step.status == StepStatus::Pending {
        if !self
          .store
          .transition_step(step.id, StepStatus::Pending, StepStatus::InProgress)
          .await?
        {
          debug!(
            request_id = step.request_id,
            step_id = step.id,
            step_name = %step.step_name,
            "step_already_claimed"
          );
          continue;
        }
        step.status = StepStatus::InProgress;
      }

      self.execute_step(def, step).await?;
    }
    Ok(())
  }

  /// Run one automatable step, already claimed `in_progress`, against its
  /// adapter and record the outcome.
  async fn execute_step(
    &self,
    def: &WorkflowDef,
    mut step: WorkflowStep,
  ) -> Result<WorkflowStep, OrchestratorError> {
    // Reloaded so identifiers from earlier steps reach this adapter.
    let request = self.store.get_request(step.request_id).await?;
    let subject = subject_for(&request);

    let now = Utc::now();
    step.status = StepStatus::InProgress;
    step.attempts += 1;
    step.started_at.get_or_insert(now);
    step.success = None;
    step.error_message = None;
    self.store.update_step(&step).await?;

    self
      .record(
        NewActivity::new(
          step.request_id,
          ActivityType::StepStarted,
          format!("Step started: {}", step.step_name),
          &self.config.system_actor,
        )
        .for_step(step.id)
        .with_metadata(json!({ "attempt": step.attempts, "backend": step.backend })),
      )
      .await?;

    let step_def = def.steps.iter().find(|d| d.name == step.step_name);
    let outcome = match step_def {
      Some(step_def) => self
        .call_adapter(step_def, subject)
        .await
        .map(|receipt| (step_def, receipt)),
      None => Err(AdapterError::InvalidConfig {
        message: format!(
          "step '{}' is not defined for workflow '{}'",
          step.step_name, def.workflow_type
        ),
      }),
    };

    step.completed_at.get_or_insert_with(Utc::now);
    match outcome {
      Ok((step_def, receipt)) => {
        let identifier = receipt.identifier.clone();
        step.status = StepStatus::Completed;
        step.success = Some(true);
        step.result_data = Some(Json(result_data(step_def, receipt)));
        self.store.update_step(&step).await?;

        if let (Some(field), Some(value)) = (step_def.result_field, identifier.as_deref()) {
          self
            .store
            .set_result_field(step.request_id, field, value)
            .await?;
        }

        self
          .record(
            NewActivity::new(
              step.request_id,
              ActivityType::StepCompleted,
              format!("Step completed: {}", step.step_name),
              &self.config.system_actor,
            )
            .for_step(step.id)
            .with_metadata(json!({ "identifier": identifier })),
          )
          .await?;

        info!(
          request_id = step.request_id,
          step_id = step.id,
          step_name = %step.step_name,
          identifier = ?identifier,
          "step_completed"
        );
      }
      Err(e) => {
        step.status = StepStatus::Failed;
        step.success = Some(false);
        step.error_message = Some(e.to_string());
        self.store.update_step(&step).await?;

        self
          .record(
            NewActivity::new(
              step.request_id,
              ActivityType::StepFailed,
              format!("Step failed: {}: {e}", step.step_name),
              &self.config.system_actor,
            )
            .for_step(step.id)
            .with_metadata(json!({ "error": e.to_string(), "backend": step.backend })),
          )
          .await?;

        warn!(
          request_id = step.request_id,
          step_id = step.id,
          step_name = %step.step_name,
          error = %e,
          "step_failed"
        );
      }
    }

    Ok(step)
  }

  /// Invoke the step's adapter in its own task, bounded by the timeout.
  async fn call_adapter(
    &self,
    step_def: &StepDef,
    subject: Subject,
  ) -> Result<AdapterReceipt, AdapterError> {
    let backend = step_def
      .backend
      .as_deref()
      .ok_or_else(|| AdapterError::InvalidConfig {
        message: format!("step '{}' has no backend", step_def.name),
      })?;
    let adapter = self.adapters.require(backend)?;
    let operation = step_def.operation;
    let timeout = self.config.adapter_timeout;

    let handle = tokio::spawn(async move { adapter.invoke(operation, &subject).await });
    let abort = handle.abort_handle();

    match tokio::time::timeout(timeout, handle).await {
      Ok(Ok(result)) => result,
      Ok(Err(join_error)) => {
        let message = if join_error.is_panic() {
          panic_message(join_error.into_panic())
        } else {
          join_error.to_string()
        };
        error!(backend, panic = %message, "adapter_panicked");
        Err(AdapterError::Panicked { message })
      }
      Err(_) => {
        abort.abort();
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        warn!(backend, timeout_ms, "adapter_timeout");
        Err(AdapterError::Timeout { timeout_ms })
      }
    }
  }

  /// Recompute and persist the request status from its steps.
  ///
  /// The single writer of request status once a request has started.
  async fn apply_rollup(&self, request_id: i64) -> Result<RequestStatus, OrchestratorError> {
    let request = self.store.get_request(request_id).await?;
    if request.status == RequestStatus::Pending {
      return Ok(request.status);
    }

    let steps = self.store.list_steps(request_id).await?;
    let status = rollup(steps.iter().map(|s| s.status));
    if status == request.status {
      return Ok(status);
    }

    let completed_at = (status == RequestStatus::Completed).then(Utc::now);
    self
      .store
      .set_request_status(request_id, status, completed_at)
      .await?;

    self
      .record(
        NewActivity::new(
          request_id,
          ActivityType::StatusChanged,
          format!(
            "Request status changed from {} to {}",
            request.status.as_str(),
            status.as_str()
          ),
          &self.config.system_actor,
        )
        .with_metadata(json!({ "from": request.status, "to": status })),
      )
      .await?;

    info!(
      request_id,
      from = request.status.as_str(),
      to = status.as_str(),
      "request_status_changed"
    );

    Ok(status)
  }

  async fn finish(&self, request_id: i64) -> Result<StartResult, OrchestratorError> {
    let status = self.apply_rollup(request_id).await?;
    let steps = self.store.list_steps(request_id).await?;

    match status {
      RequestStatus::Completed => info!(request_id, "workflow_completed"),
      RequestStatus::Failed => error!(request_id, "workflow_failed"),
      _ => info!(
        request_id,
        status = status.as_str(),
        "workflow_awaiting_manual_tasks"
      ),
    }

    Ok(StartResult {
      request_id,
      status,
      success: status == RequestStatus::Completed,
      steps,
    })
  }

  async fn notify(&self, request: &WorkflowRequest) -> Result<(), OrchestratorError> {
    let summary = RequestSummary::from(request);
    let timeout = self.config.notification_timeout;
    let sent = match tokio::time::timeout(timeout, self.sender.send(&summary)).await {
      Ok(sent) => sent,
      Err(_) => Err(NotifyError::Timeout {
        timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
      }),
    };
    if let Err(e) = sent {
      warn!(request_id = request.id, error = %e, "notification_failed");
      self
        .record(NewActivity::new(
          request.id,
          ActivityType::NotificationFailed,
          format!("Notification failed: {e}"),
          &self.config.system_actor,
        ))
        .await?;
    }
    Ok(())
  }

  async fn record(&self, activity: NewActivity) -> Result<(), OrchestratorError> {
    self.store.append_activity(&activity).await?;
    Ok(())
  }
}

fn run_token() -> String {
  uuid::Uuid::new_v4().to_string()
}

fn new_step(step_def: &StepDef, request: &WorkflowRequest) -> NewStep {
  let applies = step_def.applies_to(&request.access.0);
  NewStep {
    step_name: step_def.name.clone(),
    step_order: step_def.order,
    status: if applies {
      StepStatus::Pending
    } else {
      StepStatus::Skipped
    },
    requires_manual_action: step_def.requires_manual_action,
    manual_action_instructions: step_def.manual_action_instructions.clone(),
    backend: step_def.backend.clone(),
    result_data: (!applies).then(|| StepResultData::Skipped {
      reason: CAPABILITY_NOT_REQUESTED.to_string(),
      skipped_by: None,
    }),
  }
}

fn subject_for(request: &WorkflowRequest) -> Subject {
  Subject {
    request_id: request.id,
    workflow_type: request.workflow_type.clone(),
    full_name: request.full_name.clone(),
    position: request.position.clone(),
    section: request.section.clone(),
    effective_date: request.effective_date,
    personal_email: request.personal_email.clone(),
    mobile: request.mobile.clone(),
    fixed_line: request.fixed_line.clone(),
    access: request.access.0.clone(),
    directory_email: request.directory_email.clone(),
  }
}

fn result_data(step_def: &StepDef, receipt: AdapterReceipt) -> StepResultData {
  let backend = step_def.backend.clone().unwrap_or_default();
  match step_def.operation {
    Operation::Provision => StepResultData::Provisioned {
      backend,
      identifier: receipt.identifier,
      details: receipt.details,
    },
    Operation::Deprovision => StepResultData::Deprovisioned {
      backend,
      identifier: receipt.identifier,
      details: receipt.details,
    },
  }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
  if let Some(message) = payload.downcast_ref::<&str>() {
    message.to_string()
  } else if let Some(message) = payload.downcast_ref::<String>() {
    message.clone()
  } else {
    "unknown panic".to_string()
  }
}
