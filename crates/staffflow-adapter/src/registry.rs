use std::collections::HashMap;
use std::sync::Arc;

use staffflow_config::AdapterSettings;

use crate::adapter::Adapter;
use crate::error::AdapterError;
use crate::http::HttpAdapter;
use crate::stub::StubAdapter;

/// Adapters keyed by backend name.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
  adapters: HashMap<String, Arc<dyn Adapter>>,
}

impl AdapterRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Build adapters from settings, keyed by backend name.
  pub fn from_settings<'a>(
    settings: impl IntoIterator<Item = (&'a String, &'a AdapterSettings)>,
  ) -> Result<Self, AdapterError> {
    let mut registry = Self::new();
    for (name, adapter) in settings {
      match adapter {
        AdapterSettings::Http {
          base_url,
          bearer_token,
        } => {
          registry.register(HttpAdapter::new(
            name.clone(),
            base_url,
            bearer_token.clone(),
          )?);
        }
        AdapterSettings::Stub {
          fail_with: Some(message),
          ..
        } => {
          registry.register(StubAdapter::failing(name.clone(), message.clone()));
        }
        AdapterSettings::Stub {
          identifier_template,
          fail_with: None,
        } => {
          registry.register(StubAdapter::succeeding(
            name.clone(),
            identifier_template.as_deref(),
          ));
        }
      }
    }
    Ok(registry)
  }

  /// Register an adapter under its own name, replacing any previous one.
  pub fn register(&mut self, adapter: impl Adapter + 'static) -> &mut Self {
    let name = adapter.name().to_string();
    self.adapters.insert(name, Arc::new(adapter));
    self
  }

  /// Register a shared adapter under `name`.
  pub fn register_arc(&mut self, name: impl Into<String>, adapter: Arc<dyn Adapter>) -> &mut Self {
    self.adapters.insert(name.into(), adapter);
    self
  }

  pub fn get(&self, backend: &str) -> Option<Arc<dyn Adapter>> {
    self.adapters.get(backend).cloned()
  }

  /// Look up an adapter, failing with [`AdapterError::NotRegistered`].
  pub fn require(&self, backend: &str) -> Result<Arc<dyn Adapter>, AdapterError> {
    self
      .get(backend)
      .ok_or_else(|| AdapterError::NotRegistered {
        backend: backend.to_string(),
      })
  }

  /// Registered backend names, sorted.
  pub fn names(&self) -> Vec<&str> {
    let mut names: Vec<_> = self.adapters.keys().map(String::as_str).collect();
    names.sort();
    names
  }
}

impl std::fmt::Debug for AdapterRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AdapterRegistry")
      .field("adapters", &self.names())
      .finish()
  }
}
