use serde::{Deserialize, Serialize};

use crate::enums::{Capability, Operation, ResultField};

/// One entry of a workflow's static step list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDef {
  pub name: String,
  /// Execution position; ascending, unique within a workflow.
  pub order: i64,
  #[serde(default)]
  pub requires_manual_action: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub manual_action_instructions: Option<String>,
  /// Adapter key for automatable steps (e.g. "directory").
  #[serde(skip_serializing_if = "Option::is_none")]
  pub backend: Option<String>,
  #[serde(default = "default_operation")]
  pub operation: Operation,
  /// When set, the step only applies if the request asked for this capability.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub capability: Option<Capability>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub result_field: Option<ResultField>,
}

fn default_operation() -> Operation {
  Operation::Provision
}

impl StepDef {
  /// An automatable step calling `backend`.
  pub fn automated(name: &str, order: i64, backend: &str, operation: Operation) -> Self {
    Self {
      name: name.to_string(),
      order,
      requires_manual_action: false,
      manual_action_instructions: None,
      backend: Some(backend.to_string()),
      operation,
      capability: None,
      result_field: None,
    }
  }

  /// A step that only a human can complete.
  pub fn manual(name: &str, order: i64, instructions: &str) -> Self {
    Self {
      name: name.to_string(),
      order,
      requires_manual_action: true,
      manual_action_instructions: Some(instructions.to_string()),
      backend: None,
      operation: Operation::Provision,
      capability: None,
      result_field: None,
    }
  }

  pub fn gated_by(mut self, capability: Capability) -> Self {
    self.capability = Some(capability);
    self
  }

  pub fn writes(mut self, field: ResultField) -> Self {
    self.result_field = Some(field);
    self
  }

  /// Whether this step applies to a request asking for `access`.
  pub fn applies_to(&self, access: &[Capability]) -> bool {
    match self.capability {
      Some(cap) => access.contains(&cap),
      None => true,
    }
  }
}
