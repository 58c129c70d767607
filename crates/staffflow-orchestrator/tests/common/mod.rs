//! Shared fixtures for orchestrator integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use staffflow_adapter::{Adapter, AdapterError, AdapterReceipt, AdapterRegistry, Subject};
use staffflow_config::{
  Capability, Operation, ResultField, Settings, StepCatalog, StepDef, WorkflowDef, WorkflowType,
};
use staffflow_orchestrator::{Orchestrator, OrchestratorConfig};
use staffflow_store::{ActivityType, NewRequest, SqliteStore};

/// Directory (auto), ticketing (auto), wiki (manual).
pub fn three_step_catalog() -> Arc<StepCatalog> {
  let onboarding = WorkflowDef {
    workflow_type: WorkflowType::onboarding(),
    steps: vec![
      StepDef::automated("create_directory_account", 1, "directory", Operation::Provision)
        .writes(ResultField::DirectoryEmail),
      StepDef::automated("create_ticketing_user", 2, "ticketing", Operation::Provision)
        .writes(ResultField::TicketingUserId),
      StepDef::manual("create_wiki_account", 3, "Create a wiki account"),
    ],
  };
  Arc::new(StepCatalog::from_workflows(vec![onboarding]).unwrap())
}

/// Stub adapters from the default settings.
pub fn default_registry() -> AdapterRegistry {
  AdapterRegistry::from_settings(&Settings::default().adapters).unwrap()
}

pub fn new_request(workflow_type: WorkflowType) -> NewRequest {
  NewRequest {
    workflow_type,
    full_name: "Alice Smith".to_string(),
    position: "Estimator".to_string(),
    section: "Sales".to_string(),
    effective_date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
    personal_email: Some("alice@home.example".to_string()),
    mobile: None,
    fixed_line: None,
    access: Capability::ALL.to_vec(),
    directory_email: None,
  }
}

pub async fn orchestrator(
  catalog: Arc<StepCatalog>,
  adapters: AdapterRegistry,
) -> Orchestrator<SqliteStore> {
  orchestrator_with_config(
    catalog,
    adapters,
    OrchestratorConfig {
      adapter_timeout: Duration::from_millis(200),
      ..OrchestratorConfig::default()
    },
  )
  .await
}

pub async fn orchestrator_with_config(
  catalog: Arc<StepCatalog>,
  adapters: AdapterRegistry,
  config: OrchestratorConfig,
) -> Orchestrator<SqliteStore> {
  let store = SqliteStore::in_memory().await.unwrap();
  Orchestrator::new(store, catalog, adapters).with_config(config)
}

pub fn count(activity: &[staffflow_store::ActivityLogEntry], kind: ActivityType) -> usize {
  activity.iter().filter(|a| a.activity_type == kind).count()
}

/// Sleeps far longer than any test timeout before answering.
pub struct SlowAdapter {
  pub name: String,
}

#[async_trait]
impl Adapter for SlowAdapter {
  fn name(&self) -> &str {
    &self.name
  }

  async fn provision(&self, _subject: &Subject) -> Result<AdapterReceipt, AdapterError> {
    tokio::time::sleep(Duration::from_secs(30)).await;
    Ok(AdapterReceipt::default())
  }

  async fn deprovision(&self, subject: &Subject) -> Result<AdapterReceipt, AdapterError> {
    self.provision(subject).await
  }
}

/// Panics on every call.
pub struct PanickingAdapter {
  pub name: String,
}

#[async_trait]
impl Adapter for PanickingAdapter {
  fn name(&self) -> &str {
    &self.name
  }

  async fn provision(&self, _subject: &Subject) -> Result<AdapterReceipt, AdapterError> {
    panic!("vendor sdk exploded");
  }

  async fn deprovision(&self, _subject: &Subject) -> Result<AdapterReceipt, AdapterError> {
    panic!("vendor sdk exploded");
  }
}

/// Rejects the first `failures` calls, then succeeds.
pub struct FlakyAdapter {
  pub name: String,
  pub failures: AtomicUsize,
}

impl FlakyAdapter {
  pub fn new(name: &str, failures: usize) -> Self {
    Self {
      name: name.to_string(),
      failures: AtomicUsize::new(failures),
    }
  }
}

#[async_trait]
impl Adapter for FlakyAdapter {
  fn name(&self) -> &str {
    &self.name
  }

  async fn provision(&self, subject: &Subject) -> Result<AdapterReceipt, AdapterError> {
    let remaining = self.failures.load(Ordering::SeqCst);
    if remaining > 0 {
      self.failures.store(remaining - 1, Ordering::SeqCst);
      return Err(AdapterError::rejected("backend unavailable"));
    }
    Ok(AdapterReceipt::with_identifier(format!(
      "{}-{}",
      self.name, subject.request_id
    )))
  }

  async fn deprovision(&self, subject: &Subject) -> Result<AdapterReceipt, AdapterError> {
    self.provision(subject).await
  }
}

/// Succeeds and keeps every subject it was called with.
pub struct RecordingAdapter {
  pub name: String,
  pub seen: Arc<Mutex<Vec<Subject>>>,
}

#[async_trait]
impl Adapter for RecordingAdapter {
  fn name(&self) -> &str {
    &self.name
  }

  async fn provision(&self, subject: &Subject) -> Result<AdapterReceipt, AdapterError> {
    self.seen.lock().unwrap().push(subject.clone());
    Ok(AdapterReceipt::with_identifier("recorded"))
  }

  async fn deprovision(&self, subject: &Subject) -> Result<AdapterReceipt, AdapterError> {
    self.provision(subject).await
  }
}

/// Counts calls, taking `delay` to answer each one.
pub struct CountingAdapter {
  pub name: String,
  pub delay: Duration,
  pub calls: Arc<AtomicUsize>,
}

impl CountingAdapter {
  pub fn new(name: &str, delay: Duration) -> (Self, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let adapter = Self {
      name: name.to_string(),
      delay,
      calls: calls.clone(),
    };
    (adapter, calls)
  }
}

#[async_trait]
impl Adapter for CountingAdapter {
  fn name(&self) -> &str {
    &self.name
  }

  async fn provision(&self, subject: &Subject) -> Result<AdapterReceipt, AdapterError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(self.delay).await;
    Ok(AdapterReceipt::with_identifier(format!(
      "{}-{}",
      self.name, subject.request_id
    )))
  }

  async fn deprovision(&self, subject: &Subject) -> Result<AdapterReceipt, AdapterError> {
    self.provision(subject).await
  }
}
