//! Workflow orchestration for staffflow.
//!
//! This crate provides the [`Orchestrator`] which handles:
//! - Creating requests and generating their step ledgers
//! - Running automatable steps against backend adapters, each bounded by a timeout
//! - Queuing manual steps for humans and accepting their completion
//! - Rolling step outcomes up into the request status
//!
//! Request status is derived by one pure function, [`rollup`], and written in
//! one place after every terminal step transition, whichever operation caused
//! it.

mod error;
mod notify;
mod orchestrator;
mod result;
mod rollup;

pub use error::OrchestratorError;
pub use notify::{
  ChannelSender, NoopSender, NotificationSender, NotifyError, RequestSummary, WebhookSender,
};
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use result::{RequestDetail, StartResult};
pub use rollup::rollup;
