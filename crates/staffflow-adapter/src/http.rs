//! Adapter that delegates to another bot over HTTP.
//!
//! The remote service exposes `POST {base_url}/provision` and
//! `POST {base_url}/deprovision`, takes the [`Subject`] as a JSON body and
//! answers with:
//!
//! ```json
//! { "success": true, "identifier": "alice@co.com", "data": { ... } }
//! { "success": false, "error": "user already exists" }
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::adapter::{Adapter, AdapterReceipt, Subject};
use crate::error::AdapterError;

#[derive(Debug, Deserialize)]
struct WireResult {
  success: bool,
  #[serde(default)]
  identifier: Option<String>,
  #[serde(default)]
  error: Option<String>,
  #[serde(default)]
  data: serde_json::Value,
}

/// HTTP client for one remote backend.
#[derive(Debug, Clone)]
pub struct HttpAdapter {
  name: String,
  base_url: Url,
  bearer_token: Option<String>,
  client: Client,
}

impl HttpAdapter {
  pub fn new(
    name: impl Into<String>,
    base_url: &str,
    bearer_token: Option<String>,
  ) -> Result<Self, AdapterError> {
    Self::with_client(name, base_url, bearer_token, Client::new())
  }

  pub fn with_client(
    name: impl Into<String>,
    base_url: &str,
    bearer_token: Option<String>,
    client: Client,
  ) -> Result<Self, AdapterError> {
    // Url::join replaces the last path segment unless the base ends in '/'.
    let normalized = if base_url.ends_with('/') {
      base_url.to_string()
    } else {
      format!("{}/", base_url)
    };
    let base_url = Url::parse(&normalized).map_err(|e| AdapterError::InvalidConfig {
      message: format!("invalid base url '{}': {}", base_url, e),
    })?;

    Ok(Self {
      name: name.into(),
      base_url,
      bearer_token,
      client,
    })
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  async fn call(&self, action: &str, subject: &Subject) -> Result<AdapterReceipt, AdapterError> {
    let url = self
      .base_url
      .join(action)
      .map_err(|e| AdapterError::InvalidConfig {
        message: e.to_string(),
      })?;

    debug!(backend = %self.name, %url, request_id = subject.request_id, "calling backend");

    let mut request = self.client.post(url).json(subject);
    if let Some(token) = &self.bearer_token {
      request = request.bearer_auth(token);
    }

    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;

    let result: WireResult = match serde_json::from_str(&body) {
      Ok(result) => result,
      Err(e) => {
        warn!(backend = %self.name, %status, "unparseable backend response");
        return Err(AdapterError::InvalidResponse {
          message: format!("HTTP {}: {}", status.as_u16(), e),
        });
      }
    };

    if !result.success {
      return Err(AdapterError::rejected(result.error.unwrap_or_else(|| {
        format!("{} failed with HTTP {}", action, status.as_u16())
      })));
    }

    if !status.is_success() {
      return Err(AdapterError::InvalidResponse {
        message: format!("success reported with HTTP {}", status.as_u16()),
      });
    }

    Ok(AdapterReceipt {
      identifier: result.identifier,
      details: result.data,
    })
  }
}

#[async_trait]
impl Adapter for HttpAdapter {
  fn name(&self) -> &str {
    &self.name
  }

  async fn provision(&self, subject: &Subject) -> Result<AdapterReceipt, AdapterError> {
    self.call("provision", subject).await
  }

  async fn deprovision(&self, subject: &Subject) -> Result<AdapterReceipt, AdapterError> {
    self.call("deprovision", subject).await
  }
}
