//! Staffflow Config
//!
//! This crate contains the serializable configuration types for staffflow:
//! the static step definitions that make up each workflow type, and the
//! process settings (database, adapters, notifications).
//!
//! Step catalogs can be loaded from:
//! - The built-in onboarding/offboarding definitions ([`StepCatalog::builtin`])
//! - JSON files (via CLI with `--workflows=workflows.json`)
//!
//! A catalog is validated once at load and is immutable afterwards. The
//! orchestrator looks workflow definitions up by [`WorkflowType`], so a new
//! workflow type is a configuration change only.

mod enums;
mod error;
mod settings;
mod step;
mod workflow;

pub use enums::{Capability, Operation, ResultField};
pub use error::ConfigError;
pub use settings::{AdapterSettings, NotificationSettings, Settings};
pub use step::StepDef;
pub use workflow::{StepCatalog, WorkflowDef, WorkflowType};
