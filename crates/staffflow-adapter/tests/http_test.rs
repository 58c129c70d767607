//! Integration tests for HttpAdapter against a mock bot.

use chrono::NaiveDate;
use serde_json::json;
use staffflow_adapter::{Adapter, AdapterError, HttpAdapter, Subject};
use staffflow_config::{Capability, WorkflowType};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn subject() -> Subject {
  Subject {
    request_id: 12,
    workflow_type: WorkflowType::onboarding(),
    full_name: "Alice Smith".to_string(),
    position: "Estimator".to_string(),
    section: "Sales".to_string(),
    effective_date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
    personal_email: Some("alice@home.example".to_string()),
    mobile: None,
    fixed_line: None,
    access: vec![Capability::Directory, Capability::Ticketing],
    directory_email: None,
  }
}

#[tokio::test]
async fn test_provision_success() {
  let server = MockServer::start().await;

  Mock::given(method("POST"))
    .and(path("/provision"))
    .and(body_partial_json(json!({ "full_name": "Alice Smith", "request_id": 12 })))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "success": true,
      "identifier": "alice@co.com",
      "data": { "org_unit": "/Sales" }
    })))
    .expect(1)
    .mount(&server)
    .await;

  let adapter = HttpAdapter::new("directory", &server.uri(), None).unwrap();
  let receipt = adapter.provision(&subject()).await.unwrap();

  assert_eq!(receipt.identifier.as_deref(), Some("alice@co.com"));
  assert_eq!(receipt.details["org_unit"], "/Sales");
}

#[tokio::test]
async fn test_deprovision_sends_bearer_token() {
  let server = MockServer::start().await;

  Mock::given(method("POST"))
    .and(path("/bots/zac/deprovision"))
    .and(header("authorization", "Bearer s3cret"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
    .expect(1)
    .mount(&server)
    .await;

  let base = format!("{}/bots/zac", server.uri());
  let adapter = HttpAdapter::new("ticketing", &base, Some("s3cret".to_string())).unwrap();
  let receipt = adapter.deprovision(&subject()).await.unwrap();

  assert_eq!(receipt.identifier, None);
}

#[tokio::test]
async fn test_explicit_failure_is_rejected() {
  let server = MockServer::start().await;

  Mock::given(method("POST"))
    .and(path("/provision"))
    .respond_with(ResponseTemplate::new(409).set_body_json(json!({
      "success": false,
      "error": "user already exists"
    })))
    .mount(&server)
    .await;

  let adapter = HttpAdapter::new("ticketing", &server.uri(), None).unwrap();
  let err = adapter.provision(&subject()).await.unwrap_err();

  assert!(matches!(err, AdapterError::Rejected { .. }));
  assert_eq!(err.to_string(), "user already exists");
}

#[tokio::test]
async fn test_non_json_error_page() {
  let server = MockServer::start().await;

  Mock::given(method("POST"))
    .and(path("/provision"))
    .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
    .mount(&server)
    .await;

  let adapter = HttpAdapter::new("crm", &server.uri(), None).unwrap();
  let err = adapter.provision(&subject()).await.unwrap_err();

  match err {
    AdapterError::InvalidResponse { message } => assert!(message.starts_with("HTTP 502")),
    other => panic!("unexpected error: {other}"),
  }
}

#[tokio::test]
async fn test_unreachable_backend() {
  // Nothing listens on port 9 (discard) in the test environment.
  let adapter = HttpAdapter::new("crm", "http://127.0.0.1:9", None).unwrap();
  let err = adapter.provision(&subject()).await.unwrap_err();
  assert!(matches!(err, AdapterError::Http(_)));
}
