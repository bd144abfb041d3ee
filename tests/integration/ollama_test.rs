//! Reasoning service client and orchestrator tests against a wiremock server.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use sqltutor::feedback::{
    FeedbackCache, FeedbackOrchestrator, FeedbackSource, RetryPolicy, SubmissionContext,
};
use sqltutor::llm::{GenerationOptions, LlmClient, OllamaClient, OllamaConfig};
use sqltutor::sandbox::{ExecutionResult, ResultSet, Value};
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::service::{answer, generate_requests, mount_failures, mount_generate};

fn client(server: &MockServer, timeout: Duration) -> OllamaClient {
    OllamaClient::new(
        OllamaConfig::new("llama3.2:3b")
            .with_url(server.uri())
            .with_timeout(timeout),
    )
    .unwrap()
}

fn orchestrator(client: OllamaClient, attempt_timeout: Duration) -> FeedbackOrchestrator {
    FeedbackOrchestrator::new(
        Arc::new(client),
        Arc::new(FeedbackCache::default()),
        RetryPolicy {
            max_retries: 3,
            attempt_timeout,
            retry_delay: Duration::ZERO,
        },
    )
}

fn ctx() -> SubmissionContext {
    let set = ResultSet::new(
        vec!["name".to_string()],
        vec![vec![Value::from("Alice Johnson")]],
    );
    SubmissionContext::new("SELECT name FROM users WHERE id = 1", "Find the first user")
        .with_outcome(&ExecutionResult::Success(set), true)
}

#[tokio::test]
async fn test_generate_request_shape() {
    let server = MockServer::start().await;
    mount_generate(&server, answer("Looks good.")).await;
    let client = client(&server, Duration::from_secs(5));

    let text = assert_ok!(client.generate("Explain SELECT").await);
    assert_eq!(text, "Looks good.");

    let requests = generate_requests(&server).await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method.as_str(), "POST");

    let body: serde_json::Value = requests[0].body_json().unwrap();
    assert_eq!(body["model"], "llama3.2:3b");
    assert_eq!(body["prompt"], "Explain SELECT");
    assert_eq!(body["stream"], false);
    let defaults = GenerationOptions::default();
    assert_eq!(body["options"]["num_predict"], defaults.num_predict);
}

#[tokio::test]
async fn test_generate_non_200_is_error() {
    let server = MockServer::start().await;
    mount_generate(&server, ResponseTemplate::new(503).set_body_string("overloaded")).await;
    let client = client(&server, Duration::from_secs(5));

    let err = assert_err!(client.generate("anything").await);
    assert_eq!(err.category(), "Feedback Service Error");
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn test_liveness_check_hits_tags() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "models": [] })))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client(&server, Duration::from_secs(5)).is_available().await);
}

#[tokio::test]
async fn test_liveness_fails_without_tags() {
    let server = MockServer::start().await;
    assert!(!client(&server, Duration::from_secs(5)).is_available().await);
}

#[tokio::test]
async fn test_orchestrator_retries_through_failures() {
    let server = MockServer::start().await;
    mount_failures(&server, 500, 2).await;
    mount_generate(&server, answer("  Nicely filtered by id.  ")).await;
    let orchestrator = orchestrator(
        client(&server, Duration::from_secs(5)),
        Duration::from_secs(5),
    );

    let payload = orchestrator.get_feedback(&ctx()).await;
    assert_eq!(payload.feedback, "Nicely filtered by id.");
    assert_eq!(payload.source, FeedbackSource::Service);
    assert_eq!(generate_requests(&server).await.len(), 3);

    // Served from the cache the second time.
    orchestrator.get_feedback(&ctx()).await;
    assert_eq!(generate_requests(&server).await.len(), 3);
}

#[tokio::test]
async fn test_orchestrator_falls_back_after_three_failures() {
    let server = MockServer::start().await;
    mount_generate(&server, ResponseTemplate::new(500)).await;
    let orchestrator = orchestrator(
        client(&server, Duration::from_secs(5)),
        Duration::from_secs(5),
    );

    let payload = orchestrator.get_feedback(&ctx()).await;
    assert_eq!(payload.source, FeedbackSource::Fallback);
    assert!(payload.feedback.contains("1 row"));
    assert_eq!(generate_requests(&server).await.len(), 3);
    assert!(orchestrator.cache().is_empty());
}

#[tokio::test]
async fn test_slow_service_times_out_per_attempt() {
    let server = MockServer::start().await;
    mount_generate(&server, answer("too late").set_delay(Duration::from_secs(3))).await;
    let orchestrator = orchestrator(
        client(&server, Duration::from_secs(5)),
        Duration::from_millis(200),
    );

    let start = std::time::Instant::now();
    let payload = orchestrator.get_feedback(&ctx()).await;
    assert_eq!(payload.source, FeedbackSource::Fallback);
    assert!(start.elapsed() < Duration::from_secs(3));
}
