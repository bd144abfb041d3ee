//! Sandbox execution integration tests.
//!
//! Exercise the classifier and executor together against the seeded store.

use std::time::Duration;

use sqltutor::safety::classify_sql;
use sqltutor::sandbox::{
    equivalent, normalize, ExecutionResult, SandboxExecutor, SandboxLimits, Value, SEED_TABLES,
    TIMEOUT_MESSAGE,
};
use tokio_util::sync::CancellationToken;

fn executor(max_rows: usize, timeout: Duration) -> SandboxExecutor {
    SandboxExecutor::new(SandboxLimits {
        max_rows,
        query_timeout: timeout,
    })
}

#[tokio::test]
async fn test_every_seed_table_is_queryable() {
    let executor = SandboxExecutor::default();
    for table in SEED_TABLES {
        let sql = format!("SELECT COUNT(*) AS n FROM {table}");
        assert!(classify_sql(&sql).is_allowed());

        let result = executor.execute(&sql).await;
        let set = result.result_set().unwrap();
        assert_eq!(set.columns, vec!["n".to_string()]);
        assert!(matches!(set.rows[0][0], Value::Int(n) if n > 0));
    }
}

#[tokio::test]
async fn test_join_across_seed_tables() {
    let executor = SandboxExecutor::default();
    let result = executor
        .execute(
            "SELECT u.name, c.title FROM enrollments e \
             JOIN users u ON u.id = e.user_id \
             JOIN courses c ON c.id = e.course_id \
             WHERE e.grade IS NULL",
        )
        .await;

    let set = result.result_set().unwrap();
    assert_eq!(set.columns, vec!["name".to_string(), "title".to_string()]);
    assert_eq!(set.row_count(), 1);
}

#[tokio::test]
async fn test_each_call_sees_fresh_seed() {
    let executor = SandboxExecutor::default();
    let first = executor.execute("SELECT * FROM users").await;
    let second = executor.execute("SELECT * FROM users").await;
    assert_eq!(first, second);
    assert_eq!(normalize(first.result_set().unwrap()), normalize(second.result_set().unwrap()));
}

#[tokio::test]
async fn test_row_cap_sets_truncated() {
    let result = executor(2, Duration::from_secs(5))
        .execute("SELECT * FROM enrollments")
        .await;
    let set = result.result_set().unwrap();
    assert_eq!(set.row_count(), 2);
    assert!(set.truncated);
}

#[tokio::test]
async fn test_runaway_query_times_out() {
    let sql = "SELECT COUNT(*) FROM (WITH RECURSIVE n(x) AS \
               (SELECT 1 UNION ALL SELECT x + 1 FROM n) SELECT x FROM n)";
    assert!(classify_sql(sql).is_allowed());

    let start = std::time::Instant::now();
    let result = executor(100, Duration::from_millis(150)).execute(sql).await;
    assert_eq!(result, ExecutionResult::error(TIMEOUT_MESSAGE));
    assert!(start.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_cancellation_mid_query() {
    let sql = "SELECT COUNT(*) FROM (WITH RECURSIVE n(x) AS \
               (SELECT 1 UNION ALL SELECT x + 1 FROM n) SELECT x FROM n)";
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let result = executor(100, Duration::from_secs(10))
        .execute_cancellable(sql, &cancel)
        .await;
    assert!(!result.is_success());
}

#[tokio::test]
async fn test_reordered_projection_is_equivalent() {
    let executor = SandboxExecutor::default();
    let a = executor
        .execute("SELECT id, title FROM courses ORDER BY id")
        .await;
    let b = executor
        .execute("SELECT title, id FROM courses ORDER BY title DESC")
        .await;
    assert!(equivalent(a.result_set().unwrap(), b.result_set().unwrap()));
}
