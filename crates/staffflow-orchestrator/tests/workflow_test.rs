//! Integration tests for starting and resuming workflows.

mod common;

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use common::{
  CountingAdapter, FlakyAdapter, PanickingAdapter, RecordingAdapter, SlowAdapter, count,
  default_registry, new_request, orchestrator, orchestrator_with_config, three_step_catalog,
};
use staffflow_adapter::{AdapterRegistry, StubAdapter};
use staffflow_config::{Capability, StepCatalog, WorkflowType};
use staffflow_orchestrator::{OrchestratorConfig, OrchestratorError};
use staffflow_store::{ActivityType, RequestStatus, StepResultData, StepStatus, Store};

fn statuses(steps: &[staffflow_store::WorkflowStep]) -> Vec<StepStatus> {
  steps.iter().map(|s| s.status).collect()
}

#[tokio::test]
async fn test_onboarding_with_timeout_and_manual_step() {
  let mut adapters = AdapterRegistry::new();
  adapters
    .register(StubAdapter::succeeding("directory", Some("{first}@co.com")))
    .register(SlowAdapter {
      name: "ticketing".to_string(),
    });
  let orch = orchestrator(three_step_catalog(), adapters).await;

  let id = orch
    .create_request(new_request(WorkflowType::onboarding()), "hr@co.com")
    .await
    .unwrap();
  let result = orch.start(id).await.unwrap();

  assert_eq!(result.status, RequestStatus::Failed);
  assert!(!result.success);
  assert_eq!(
    statuses(&result.steps),
    vec![StepStatus::Completed, StepStatus::Failed, StepStatus::Pending]
  );

  let directory = &result.steps[0];
  assert_eq!(directory.success, Some(true));
  assert!(matches!(
    directory.result_data.as_deref(),
    Some(StepResultData::Provisioned { identifier: Some(email), .. }) if email == "alice@co.com"
  ));

  let ticketing = &result.steps[1];
  assert_eq!(ticketing.success, Some(false));
  assert_eq!(ticketing.error_message.as_deref(), Some("timeout"));

  let detail = orch.get_request(id).await.unwrap();
  assert_eq!(detail.request.status, RequestStatus::Failed);
  assert_eq!(detail.request.directory_email.as_deref(), Some("alice@co.com"));
  assert_eq!(detail.request.ticketing_user_id, None);
  assert!(detail.activity.len() >= 3);
  assert_eq!(count(&detail.activity, ActivityType::StepCompleted), 1);
  assert_eq!(count(&detail.activity, ActivityType::StepFailed), 1);
  assert_eq!(count(&detail.activity, ActivityType::ManualTaskQueued), 1);

  // Completing the unrelated manual task does not clear the failure.
  let wiki = orch
    .complete_manual_task(result.steps[2].id, "done manually", "admin@co.com")
    .await
    .unwrap();
  assert_eq!(wiki.status, StepStatus::Completed);
  assert_eq!(wiki.success, Some(true));
  assert!(wiki.completed_at.is_some());

  let detail = orch.get_request(id).await.unwrap();
  assert_eq!(detail.request.status, RequestStatus::Failed);
  assert_eq!(detail.request.completed_at, None);
}

#[tokio::test]
async fn test_all_automatable_succeed_leaves_request_in_progress() {
  let orch = orchestrator(Arc::new(StepCatalog::builtin()), default_registry()).await;
  let id = orch
    .create_request(new_request(WorkflowType::onboarding()), "hr@co.com")
    .await
    .unwrap();

  let result = orch.start(id).await.unwrap();
  assert_eq!(result.status, RequestStatus::InProgress);
  assert!(!result.success);
  assert_eq!(
    statuses(&result.steps),
    vec![
      StepStatus::Completed,
      StepStatus::Completed,
      StepStatus::Pending,
      StepStatus::Pending,
      StepStatus::Completed,
      StepStatus::Pending,
    ]
  );

  let request = orch.store().get_request(id).await.unwrap();
  assert_eq!(request.directory_email.as_deref(), Some("alice.smith@example.com"));
  assert_eq!(request.ticketing_user_id, Some(format!("zd-{id}")));
  assert_eq!(request.crm_user_id, Some(format!("crm-{id}")));
}

#[tokio::test]
async fn test_manual_steps_never_auto_complete() {
  let mut adapters = AdapterRegistry::new();
  adapters
    .register(StubAdapter::failing("directory", "down"))
    .register(PanickingAdapter {
      name: "ticketing".to_string(),
    })
    .register(StubAdapter::succeeding("crm", None));
  let orch = orchestrator(Arc::new(StepCatalog::builtin()), adapters).await;
  let id = orch
    .create_request(new_request(WorkflowType::onboarding()), "hr@co.com")
    .await
    .unwrap();

  let result = orch.start(id).await.unwrap();
  for step in result.steps.iter().filter(|s| s.requires_manual_action) {
    assert_eq!(step.status, StepStatus::Pending, "{}", step.step_name);
    assert_eq!(step.success, None);
    assert_eq!(step.attempts, 0);
  }
}

#[tokio::test]
async fn test_partial_failure_isolation() {
  let mut adapters = default_registry();
  adapters.register(StubAdapter::failing("directory", "google workspace down"));
  let orch = orchestrator(Arc::new(StepCatalog::builtin()), adapters).await;
  let id = orch
    .create_request(new_request(WorkflowType::onboarding()), "hr@co.com")
    .await
    .unwrap();

  let result = orch.start(id).await.unwrap();
  assert_eq!(result.status, RequestStatus::Failed);

  let step = |name: &str| result.steps.iter().find(|s| s.step_name == name).unwrap();
  let directory = step("create_directory_account");
  assert_eq!(directory.status, StepStatus::Failed);
  assert_eq!(directory.error_message.as_deref(), Some("google workspace down"));

  let ticketing = step("create_ticketing_user");
  assert_eq!(ticketing.status, StepStatus::Completed);
  assert!(matches!(
    ticketing.result_data.as_deref(),
    Some(StepResultData::Provisioned { backend, identifier: Some(_), .. }) if backend == "ticketing"
  ));
  assert_eq!(step("create_crm_user").status, StepStatus::Completed);
}

#[tokio::test]
async fn test_panicking_adapter_is_recorded() {
  let mut adapters = default_registry();
  adapters.register(PanickingAdapter {
    name: "ticketing".to_string(),
  });
  let orch = orchestrator(three_step_catalog(), adapters).await;
  let id = orch
    .create_request(new_request(WorkflowType::onboarding()), "hr@co.com")
    .await
    .unwrap();

  let result = orch.start(id).await.unwrap();
  let ticketing = &result.steps[1];
  assert_eq!(ticketing.status, StepStatus::Failed);
  assert_eq!(
    ticketing.error_message.as_deref(),
    Some("adapter panicked: vendor sdk exploded")
  );
  assert_eq!(result.steps[0].status, StepStatus::Completed);
}

#[tokio::test]
async fn test_unregistered_backend_fails_step() {
  let mut adapters = AdapterRegistry::new();
  adapters
    .register(StubAdapter::succeeding("directory", None))
    .register(StubAdapter::succeeding("ticketing", None));
  let orch = orchestrator(Arc::new(StepCatalog::builtin()), adapters).await;
  let id = orch
    .create_request(new_request(WorkflowType::onboarding()), "hr@co.com")
    .await
    .unwrap();

  let result = orch.start(id).await.unwrap();
  let crm = result
    .steps
    .iter()
    .find(|s| s.step_name == "create_crm_user")
    .unwrap();
  assert_eq!(crm.status, StepStatus::Failed);
  assert_eq!(
    crm.error_message.as_deref(),
    Some("no adapter registered for backend 'crm'")
  );
}

#[tokio::test]
async fn test_directory_email_reaches_later_adapters() {
  let seen = Arc::new(Mutex::new(Vec::new()));
  let mut adapters = AdapterRegistry::new();
  adapters
    .register(StubAdapter::succeeding("directory", Some("{first}@co.com")))
    .register(RecordingAdapter {
      name: "ticketing".to_string(),
      seen: seen.clone(),
    });
  let orch = orchestrator(three_step_catalog(), adapters).await;
  let id = orch
    .create_request(new_request(WorkflowType::onboarding()), "hr@co.com")
    .await
    .unwrap();

  orch.start(id).await.unwrap();

  let seen = seen.lock().unwrap();
  assert_eq!(seen.len(), 1);
  assert_eq!(seen[0].directory_email.as_deref(), Some("alice@co.com"));
  assert_eq!(seen[0].request_id, id);
}

#[tokio::test]
async fn test_unrequested_capabilities_are_skipped() {
  let orch = orchestrator(Arc::new(StepCatalog::builtin()), default_registry()).await;
  let mut request = new_request(WorkflowType::onboarding());
  request.access = vec![Capability::Directory];
  let id = orch.create_request(request, "hr@co.com").await.unwrap();

  let result = orch.start(id).await.unwrap();
  assert_eq!(
    statuses(&result.steps),
    vec![
      StepStatus::Completed,
      StepStatus::Skipped,
      StepStatus::Skipped,
      StepStatus::Skipped,
      StepStatus::Skipped,
      StepStatus::Pending,
    ]
  );
  assert_eq!(result.status, RequestStatus::InProgress);
  assert!(result.steps[1..5].iter().all(|s| s.attempts == 0));
  assert!(matches!(
    result.steps[1].result_data.as_deref(),
    Some(StepResultData::Skipped { reason, skipped_by: None }) if reason == "capability not requested"
  ));

  let detail = orch.get_request(id).await.unwrap();
  assert_eq!(count(&detail.activity, ActivityType::StepSkipped), 4);
  assert_eq!(count(&detail.activity, ActivityType::ManualTaskQueued), 1);

  orch
    .complete_manual_task(result.steps[5].id, "laptop handed over", "it@co.com")
    .await
    .unwrap();
  let request = orch.store().get_request(id).await.unwrap();
  assert_eq!(request.status, RequestStatus::Completed);
  assert!(request.completed_at.is_some());
}

#[tokio::test]
async fn test_offboarding_deprovisions() {
  let orch = orchestrator(Arc::new(StepCatalog::builtin()), default_registry()).await;
  let mut request = new_request(WorkflowType::offboarding());
  request.directory_email = Some("alice@co.com".to_string());
  let id = orch.create_request(request, "hr@co.com").await.unwrap();

  let result = orch.start(id).await.unwrap();
  let directory = &result.steps[0];
  assert_eq!(directory.step_name, "suspend_directory_account");
  assert_eq!(directory.status, StepStatus::Completed);
  assert!(matches!(
    directory.result_data.as_deref(),
    Some(StepResultData::Deprovisioned { backend, .. }) if backend == "directory"
  ));
}

#[tokio::test]
async fn test_start_twice_is_rejected() {
  let orch = orchestrator(three_step_catalog(), default_registry()).await;
  let id = orch
    .create_request(new_request(WorkflowType::onboarding()), "hr@co.com")
    .await
    .unwrap();

  orch.start(id).await.unwrap();
  let err = orch.start(id).await.unwrap_err();
  assert!(matches!(err, OrchestratorError::InvalidState { .. }));

  let steps = orch.store().list_steps(id).await.unwrap();
  assert_eq!(steps.len(), 3);
  let detail = orch.get_request(id).await.unwrap();
  assert_eq!(count(&detail.activity, ActivityType::WorkflowStarted), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_start_runs_once() {
  let orch = Arc::new(orchestrator(three_step_catalog(), default_registry()).await);
  let id = orch
    .create_request(new_request(WorkflowType::onboarding()), "hr@co.com")
    .await
    .unwrap();

  let a = tokio::spawn({
    let orch = orch.clone();
    async move { orch.start(id).await }
  });
  let b = tokio::spawn({
    let orch = orch.clone();
    async move { orch.start(id).await }
  });
  let results = [a.await.unwrap(), b.await.unwrap()];

  assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
  assert!(results.iter().any(|r| matches!(
    r,
    Err(OrchestratorError::InvalidState { .. })
  )));
  assert_eq!(orch.store().list_steps(id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_start_missing_request() {
  let orch = orchestrator(three_step_catalog(), default_registry()).await;
  assert!(matches!(
    orch.start(404).await,
    Err(OrchestratorError::NotFound(_))
  ));
}

#[tokio::test]
async fn test_resume_reruns_interrupted_step() {
  let orch = orchestrator(Arc::new(StepCatalog::builtin()), default_registry()).await;
  let id = orch
    .create_request(new_request(WorkflowType::onboarding()), "hr@co.com")
    .await
    .unwrap();
  orch.start(id).await.unwrap();

  // Simulate a crash while the directory call was in flight.
  let mut directory = orch.store().list_steps(id).await.unwrap().remove(0);
  directory.status = StepStatus::InProgress;
  directory.completed_at = None;
  orch.store().update_step(&directory).await.unwrap();

  let result = orch.resume(id).await.unwrap();
  assert_eq!(result.status, RequestStatus::InProgress);
  assert_eq!(result.steps[0].status, StepStatus::Completed);
  assert_eq!(result.steps[0].attempts, 2);
  assert_eq!(result.steps[1].attempts, 1);

  let detail = orch.get_request(id).await.unwrap();
  assert_eq!(count(&detail.activity, ActivityType::WorkflowResumed), 1);
  assert_eq!(count(&detail.activity, ActivityType::ManualTaskQueued), 3);
}

#[tokio::test]
async fn test_resume_generates_missing_ledger() {
  let orch = orchestrator(three_step_catalog(), default_registry()).await;
  let id = orch
    .create_request(new_request(WorkflowType::onboarding()), "hr@co.com")
    .await
    .unwrap();

  // Crash after the status flip but before any steps were written.
  let expired = Utc::now() - chrono::Duration::seconds(1);
  assert!(orch.store().start_run(id, "worker-a", expired).await.unwrap());

  let result = orch.resume(id).await.unwrap();
  assert_eq!(
    statuses(&result.steps),
    vec![StepStatus::Completed, StepStatus::Completed, StepStatus::Pending]
  );
  let detail = orch.get_request(id).await.unwrap();
  assert_eq!(count(&detail.activity, ActivityType::ManualTaskQueued), 1);
}

#[tokio::test]
async fn test_resume_requires_in_progress() {
  let orch = orchestrator(three_step_catalog(), default_registry()).await;
  let id = orch
    .create_request(new_request(WorkflowType::onboarding()), "hr@co.com")
    .await
    .unwrap();

  assert!(matches!(
    orch.resume(id).await,
    Err(OrchestratorError::InvalidState { .. })
  ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_resume_during_live_start_does_not_rerun_steps() {
  let mut adapters = default_registry();
  let (directory, calls) = CountingAdapter::new("directory", Duration::from_millis(300));
  adapters.register(directory);
  let config = OrchestratorConfig {
    adapter_timeout: Duration::from_secs(5),
    ..OrchestratorConfig::default()
  };
  let orch = Arc::new(orchestrator_with_config(three_step_catalog(), adapters, config).await);
  let id = orch
    .create_request(new_request(WorkflowType::onboarding()), "hr@co.com")
    .await
    .unwrap();

  let start = tokio::spawn({
    let orch = orch.clone();
    async move { orch.start(id).await }
  });
  tokio::time::sleep(Duration::from_millis(100)).await;

  assert!(matches!(
    orch.resume(id).await,
    Err(OrchestratorError::InvalidState { .. })
  ));

  let result = start.await.unwrap().unwrap();
  assert_eq!(calls.load(Ordering::SeqCst), 1);
  assert_eq!(result.steps[0].status, StepStatus::Completed);
  assert_eq!(result.steps[0].attempts, 1);

  let detail = orch.get_request(id).await.unwrap();
  assert_eq!(count(&detail.activity, ActivityType::WorkflowResumed), 0);
  assert_eq!(count(&detail.activity, ActivityType::StepStarted), 2);
}

#[tokio::test]
async fn test_resume_refused_while_run_lease_is_live() {
  let mut adapters = default_registry();
  let (directory, calls) = CountingAdapter::new("directory", Duration::ZERO);
  adapters.register(directory);
  let orch = orchestrator(three_step_catalog(), adapters).await;
  let id = orch
    .create_request(new_request(WorkflowType::onboarding()), "hr@co.com")
    .await
    .unwrap();

  // Another worker started the request and is still within its lease.
  let expires_at = Utc::now() + chrono::Duration::seconds(60);
  assert!(orch.store().start_run(id, "worker-a", expires_at).await.unwrap());

  assert!(matches!(
    orch.resume(id).await,
    Err(OrchestratorError::InvalidState { .. })
  ));
  assert_eq!(calls.load(Ordering::SeqCst), 0);
  assert!(orch.store().list_steps(id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_resume_takes_over_expired_run_lease() {
  let mut adapters = default_registry();
  let (directory, calls) = CountingAdapter::new("directory", Duration::ZERO);
  adapters.register(directory);
  let orch = orchestrator(three_step_catalog(), adapters).await;
  let id = orch
    .create_request(new_request(WorkflowType::onboarding()), "hr@co.com")
    .await
    .unwrap();

  // The worker that started the request died and its lease ran out.
  let expired = Utc::now() - chrono::Duration::seconds(1);
  assert!(orch.store().start_run(id, "worker-a", expired).await.unwrap());

  let result = orch.resume(id).await.unwrap();
  assert_eq!(calls.load(Ordering::SeqCst), 1);
  assert_eq!(
    statuses(&result.steps),
    vec![StepStatus::Completed, StepStatus::Completed, StepStatus::Pending]
  );

  // The lease was released, so the next resume is allowed and finds no work.
  orch.resume(id).await.unwrap();
  assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_retry_refused_while_run_lease_is_live() {
  let mut adapters = default_registry();
  adapters.register(StubAdapter::failing("ticketing", "down"));
  let orch = orchestrator(three_step_catalog(), adapters).await;
  let id = orch
    .create_request(new_request(WorkflowType::onboarding()), "hr@co.com")
    .await
    .unwrap();
  let result = orch.start(id).await.unwrap();
  let ticketing = result.steps[1].id;

  let now = Utc::now();
  assert!(
    orch
      .store()
      .claim_run(id, "worker-b", now + chrono::Duration::seconds(60), now)
      .await
      .unwrap()
  );

  assert!(matches!(
    orch.retry_step(ticketing, "it@co.com").await,
    Err(OrchestratorError::InvalidState { .. })
  ));
  let step = orch.store().get_step(ticketing).await.unwrap();
  assert_eq!(step.status, StepStatus::Failed);
  assert_eq!(step.attempts, 1);
}

#[tokio::test]
async fn test_every_transition_is_audited() {
  let mut adapters = default_registry();
  adapters.register(FlakyAdapter::new("ticketing", 1));
  let orch = orchestrator(three_step_catalog(), adapters).await;
  let id = orch
    .create_request(new_request(WorkflowType::onboarding()), "hr@co.com")
    .await
    .unwrap();
  let result = orch.start(id).await.unwrap();

  let detail = orch.get_request(id).await.unwrap();
  for step in &result.steps {
    assert!(
      detail.activity.iter().any(|a| a.step_id == Some(step.id)),
      "no activity for {}",
      step.step_name
    );
  }
  assert_eq!(count(&detail.activity, ActivityType::RequestCreated), 1);
  assert_eq!(count(&detail.activity, ActivityType::WorkflowStarted), 1);
  assert_eq!(count(&detail.activity, ActivityType::StepStarted), 2);

  let changes: Vec<_> = detail
    .activity
    .iter()
    .filter(|a| a.activity_type == ActivityType::StatusChanged)
    .collect();
  assert_eq!(changes.len(), 1);
  assert_eq!(
    changes[0].metadata.as_deref().map(|m| m["to"].clone()),
    Some(serde_json::json!("failed"))
  );
}

#[tokio::test]
async fn test_third_workflow_type_from_config() {
  let catalog = StepCatalog::from_json(
    r#"{
      "workflows": [{
        "workflow_type": "role_change",
        "steps": [
          { "name": "update_directory_groups", "order": 1, "backend": "directory" },
          {
            "name": "brief_new_team",
            "order": 2,
            "requires_manual_action": true,
            "manual_action_instructions": "Introduce the staff member to their new team."
          }
        ]
      }]
    }"#,
  )
  .unwrap();
  let orch = orchestrator(Arc::new(catalog), default_registry()).await;

  let id = orch
    .create_request(new_request(WorkflowType::new("role_change")), "hr@co.com")
    .await
    .unwrap();
  let result = orch.start(id).await.unwrap();
  assert_eq!(
    statuses(&result.steps),
    vec![StepStatus::Completed, StepStatus::Pending]
  );
}
