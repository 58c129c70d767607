//! Staffflow Adapters
//!
//! Each backend system (identity directory, ticketing, wiki, CRM, ...) is
//! reached through the narrow [`Adapter`] interface: grant access with
//! `provision`, revoke it with `deprovision`. The orchestrator only ever
//! sees this trait, so backends are swappable and mockable.
//!
//! Implementations provided here:
//! - [`HttpAdapter`] delegates to another bot's REST endpoint
//! - [`StubAdapter`] answers locally with rendered identifiers

mod adapter;
mod error;
mod http;
mod registry;
mod stub;

pub use adapter::{Adapter, AdapterReceipt, Subject};
pub use error::AdapterError;
pub use http::HttpAdapter;
pub use registry::AdapterRegistry;
pub use stub::{StubAdapter, render_identifier};
