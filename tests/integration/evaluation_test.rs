//! End-to-end evaluation tests: classifier, sandbox, grading, and feedback
//! wired together with a wiremock server as the reasoning service.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use sqltutor::error::TutorError;
use sqltutor::evaluation::{Evaluator, Exercise, InMemoryStore, SubmissionMode, PREVIEW_ROWS};
use sqltutor::feedback::{FeedbackCache, FeedbackOrchestrator, FeedbackSource, RetryPolicy};
use sqltutor::llm::{OllamaClient, OllamaConfig};
use sqltutor::sandbox::{SandboxExecutor, SandboxLimits};
use tokio_util::sync::CancellationToken;
use wiremock::{MockServer, ResponseTemplate};

use super::service::{answer, generate_requests, mount_generate};

fn evaluator(server: &MockServer) -> Evaluator {
    let client = OllamaClient::new(
        OllamaConfig::new("llama3.2:3b")
            .with_url(server.uri())
            .with_timeout(Duration::from_secs(5)),
    )
    .unwrap();
    let orchestrator = FeedbackOrchestrator::new(
        Arc::new(client),
        Arc::new(FeedbackCache::default()),
        RetryPolicy {
            max_retries: 3,
            attempt_timeout: Duration::from_secs(5),
            retry_delay: Duration::ZERO,
        },
    );
    Evaluator::new(
        SandboxExecutor::new(SandboxLimits::default()),
        Arc::new(orchestrator),
    )
}

fn users_over_30() -> Exercise {
    Exercise::new("over-30", "Find the names of users older than 30")
        .with_expected_sql("SELECT name FROM users WHERE age > 30")
        .with_difficulty("beginner")
}

#[tokio::test]
async fn test_correct_submission_gets_service_feedback() {
    let server = MockServer::start().await;
    mount_generate(&server, answer("Good use of WHERE.")).await;
    let evaluator = evaluator(&server);

    let evaluation = evaluator
        .evaluate(
            &users_over_30(),
            "SELECT name FROM users WHERE age >= 31 ORDER BY name",
            SubmissionMode::Submit,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(evaluation.is_correct);
    assert_eq!(evaluation.score, 100);
    assert_eq!(evaluation.feedback.feedback, "Good use of WHERE.");
    assert_eq!(evaluation.feedback.source, FeedbackSource::Service);
    assert_eq!(evaluation.preview.unwrap().row_count(), 3);

    let requests = generate_requests(&server).await;
    let body: serde_json::Value = requests[0].body_json().unwrap();
    let prompt = body["prompt"].as_str().unwrap();
    assert!(prompt.contains("Find the names of users older than 30"));
    assert!(prompt.contains("Correct: yes"));
}

#[tokio::test]
async fn test_failed_query_with_service_down_uses_fallback() {
    let server = MockServer::start().await;
    mount_generate(&server, ResponseTemplate::new(500)).await;
    let evaluator = evaluator(&server);

    let evaluation = evaluator
        .evaluate(
            &users_over_30(),
            "SELECT nme FROM users",
            SubmissionMode::Submit,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(!evaluation.is_correct);
    assert_eq!(evaluation.score, 0);
    assert!(evaluation.preview.is_none());
    assert_eq!(evaluation.feedback.source, FeedbackSource::Fallback);
    assert!(evaluation.feedback.feedback.contains("no such column: nme"));
    assert_eq!(generate_requests(&server).await.len(), 3);
}

#[tokio::test]
async fn test_rejected_statement_never_reaches_service() {
    let server = MockServer::start().await;
    mount_generate(&server, answer("unused")).await;
    let evaluator = evaluator(&server);

    for sql in [
        "DELETE FROM users",
        "SELECT 1; SELECT 2",
        "   ",
        "EXPLAIN SELECT * FROM users",
    ] {
        let err = evaluator
            .evaluate(
                &users_over_30(),
                sql,
                SubmissionMode::Submit,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TutorError::RejectedStatement(_)), "{sql}");
    }
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_preview_is_bounded() {
    let server = MockServer::start().await;
    mount_generate(&server, answer("ok")).await;
    let evaluator = evaluator(&server);
    let exercise = Exercise::new("cross", "Pair every user with every enrollment");

    let evaluation = evaluator
        .evaluate(
            &exercise,
            "SELECT u.id, e.id FROM users u, enrollments e",
            SubmissionMode::Run,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let preview = evaluation.preview.unwrap();
    assert_eq!(preview.row_count(), PREVIEW_ROWS);
    assert!(preview.truncated);
    assert_eq!(evaluation.execution.result_set().unwrap().row_count(), 35);
    assert!(generate_requests(&server).await.is_empty());
}

#[tokio::test]
async fn test_exercise_flow_records_submit_only() {
    let server = MockServer::start().await;
    mount_generate(&server, answer("Nice.")).await;
    let evaluator = evaluator(&server);
    let store = InMemoryStore::with_exercises([users_over_30()]);
    let cancel = CancellationToken::new();

    evaluator
        .evaluate_exercise(
            &store,
            &store,
            "student-7",
            "over-30",
            "SELECT name FROM users",
            SubmissionMode::Run,
            &cancel,
        )
        .await
        .unwrap();
    let evaluation = evaluator
        .evaluate_exercise(
            &store,
            &store,
            "student-7",
            "over-30",
            "SELECT name FROM users WHERE age > 30",
            SubmissionMode::Submit,
            &cancel,
        )
        .await
        .unwrap();

    let attempts = store.attempts();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].user_id, "student-7");
    assert!(attempts[0].is_correct);
    assert_eq!(attempts[0].feedback, evaluation.feedback);
}

#[tokio::test]
async fn test_concurrent_evaluations_share_cache() {
    let server = MockServer::start().await;
    mount_generate(&server, answer("Same feedback.")).await;
    let evaluator = Arc::new(evaluator(&server));

    // Warm the cache so concurrent callers all hit it.
    evaluator
        .evaluate(
            &users_over_30(),
            "SELECT name FROM users WHERE age > 30",
            SubmissionMode::Submit,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let evaluator = Arc::clone(&evaluator);
            tokio::spawn(async move {
                evaluator
                    .evaluate(
                        &users_over_30(),
                        "select name from users where age > 30",
                        SubmissionMode::Submit,
                        &CancellationToken::new(),
                    )
                    .await
            })
        })
        .collect();

    for handle in handles {
        let evaluation = handle.await.unwrap().unwrap();
        assert_eq!(evaluation.feedback.feedback, "Same feedback.");
    }
    assert_eq!(generate_requests(&server).await.len(), 1);
}
