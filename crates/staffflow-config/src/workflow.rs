use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::enums::{Capability, Operation, ResultField};
use crate::error::ConfigError;
use crate::step::StepDef;

/// Key identifying a workflow definition, e.g. `onboarding`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type), sqlx(transparent))]
pub struct WorkflowType(String);

impl WorkflowType {
  pub const ONBOARDING: &'static str = "onboarding";
  pub const OFFBOARDING: &'static str = "offboarding";

  pub fn new(name: impl Into<String>) -> Self {
    Self(name.into())
  }

  pub fn onboarding() -> Self {
    Self::new(Self::ONBOARDING)
  }

  pub fn offboarding() -> Self {
    Self::new(Self::OFFBOARDING)
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for WorkflowType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for WorkflowType {
  fn from(value: &str) -> Self {
    Self::new(value)
  }
}

/// The ordered step list for one workflow type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDef {
  pub workflow_type: WorkflowType,
  pub steps: Vec<StepDef>,
}

impl WorkflowDef {
  /// Check the step list and sort it by `order`.
  pub fn validate(mut self) -> Result<Self, ConfigError> {
    let invalid = |message: String| ConfigError::InvalidCatalog {
      workflow_type: self.workflow_type.to_string(),
      message,
    };

    if self.steps.is_empty() {
      return Err(invalid("workflow has no steps".to_string()));
    }

    let mut names = HashSet::new();
    let mut orders = HashSet::new();
    for step in &self.steps {
      if !names.insert(step.name.as_str()) {
        return Err(invalid(format!("duplicate step name '{}'", step.name)));
      }
      if !orders.insert(step.order) {
        return Err(invalid(format!("duplicate step order {}", step.order)));
      }
      match (step.requires_manual_action, &step.backend) {
        (false, None) => {
          return Err(invalid(format!(
            "automatable step '{}' has no backend",
            step.name
          )));
        }
        (true, Some(backend)) => {
          return Err(invalid(format!(
            "manual step '{}' must not name a backend (got '{}')",
            step.name, backend
          )));
        }
        _ => {}
      }
    }

    self.steps.sort_by_key(|s| s.order);
    Ok(self)
  }
}

#[derive(Deserialize)]
struct CatalogFile {
  workflows: Vec<WorkflowDef>,
}

/// Lookup of workflow definitions keyed by workflow type.
#[derive(Debug, Clone, Default)]
pub struct StepCatalog {
  workflows: HashMap<WorkflowType, WorkflowDef>,
}

impl StepCatalog {
  /// Build a catalog from definitions, validating each one.
  pub fn from_workflows(defs: Vec<WorkflowDef>) -> Result<Self, ConfigError> {
    let mut workflows = HashMap::with_capacity(defs.len());
    for def in defs {
      let def = def.validate()?;
      let key = def.workflow_type.clone();
      if workflows.insert(key.clone(), def).is_some() {
        return Err(ConfigError::InvalidCatalog {
          workflow_type: key.to_string(),
          message: "workflow type defined twice".to_string(),
        });
      }
    }
    Ok(Self { workflows })
  }

  /// Parse a catalog from JSON of the form `{ "workflows": [...] }`.
  pub fn from_json(json: &str) -> Result<Self, ConfigError> {
    let file: CatalogFile = serde_json::from_str(json)?;
    Self::from_workflows(file.workflows)
  }

  /// Load a catalog from a JSON file.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Self::from_json(&content)
  }

  pub fn get(&self, workflow_type: &WorkflowType) -> Option<&WorkflowDef> {
    self.workflows.get(workflow_type)
  }

  /// All workflow types, sorted by name.
  pub fn workflow_types(&self) -> Vec<&WorkflowType> {
    let mut types: Vec<_> = self.workflows.keys().collect();
    types.sort();
    types
  }

  /// The built-in onboarding and offboarding definitions.
  pub fn builtin() -> Self {
    let onboarding = WorkflowDef {
      workflow_type: WorkflowType::onboarding(),
      steps: vec![
        StepDef::automated("create_directory_account", 1, "directory", Operation::Provision)
          .gated_by(Capability::Directory)
          .writes(ResultField::DirectoryEmail),
        StepDef::automated("create_ticketing_user", 2, "ticketing", Operation::Provision)
          .gated_by(Capability::Ticketing)
          .writes(ResultField::TicketingUserId),
        StepDef::manual(
          "create_wiki_account",
          3,
          "Create a wiki account and add the user to their section's space.",
        )
        .gated_by(Capability::Wiki),
        StepDef::manual(
          "setup_voip_extension",
          4,
          "Allocate a VOIP extension and record it against the staff member.",
        )
        .gated_by(Capability::Voip),
        StepDef::automated("create_crm_user", 5, "crm", Operation::Provision)
          .gated_by(Capability::Crm)
          .writes(ResultField::CrmUserId),
        StepDef::manual(
          "prepare_equipment",
          6,
          "Prepare laptop, phone and building access for the start date.",
        ),
      ],
    };

    let offboarding = WorkflowDef {
      workflow_type: WorkflowType::offboarding(),
      steps: vec![
        StepDef::automated("suspend_directory_account", 1, "directory", Operation::Deprovision)
          .gated_by(Capability::Directory),
        StepDef::automated("suspend_ticketing_user", 2, "ticketing", Operation::Deprovision)
          .gated_by(Capability::Ticketing),
        StepDef::manual(
          "remove_wiki_access",
          3,
          "Remove the user from all wiki spaces.",
        )
        .gated_by(Capability::Wiki),
        StepDef::manual(
          "release_voip_extension",
          4,
          "Release the VOIP extension and forward calls to the section lead.",
        )
        .gated_by(Capability::Voip),
        StepDef::automated("deactivate_crm_user", 5, "crm", Operation::Deprovision)
          .gated_by(Capability::Crm),
        StepDef::manual(
          "collect_equipment",
          6,
          "Collect laptop, phone and building access on the last day.",
        ),
      ],
    };

    Self::from_workflows(vec![onboarding, offboarding])
      .expect("built-in workflow definitions are valid")
  }
}
