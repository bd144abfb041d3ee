//! Evaluation pipeline for sqltutor.
//!
//! Composes classification, sandbox execution, grading, and feedback into a
//! single call that is independent of storage and transport. The only errors
//! that escape are caller problems (a rejected statement, an unknown
//! exercise) and cancellation.

mod store;

pub use store::{AttemptRecord, AttemptRecorder, ExerciseRepository, InMemoryStore};

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::{Result, TutorError};
use crate::feedback::{fallback_payload, FeedbackOrchestrator, FeedbackPayload, SubmissionContext};
use crate::safety::{SqlClassifier, Verdict};
use crate::sandbox::{equivalent, ExecutionResult, ResultSet, SandboxExecutor};

/// Rows included in the result preview.
pub const PREVIEW_ROWS: usize = 10;

/// Score for a correct submission.
pub const FULL_SCORE: u8 = 100;

/// How a submission should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionMode {
    /// Execute and preview only; deterministic feedback, nothing recorded.
    Run,
    /// Full evaluation with tutor feedback; the attempt is recorded.
    #[default]
    Submit,
}

impl std::str::FromStr for SubmissionMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "run" => Ok(Self::Run),
            "submit" => Ok(Self::Submit),
            _ => Err(format!("Invalid mode: {s}. Expected: run or submit")),
        }
    }
}

/// An exercise as resolved by the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: String,
    pub prompt: String,
    #[serde(default)]
    pub expected_sql: Option<String>,
    #[serde(default)]
    pub expected_result: Option<ResultSet>,
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
}

fn default_difficulty() -> String {
    "beginner".to_string()
}

impl Exercise {
    /// Creates an exercise with only a prompt.
    pub fn new(id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            expected_sql: None,
            expected_result: None,
            difficulty: default_difficulty(),
        }
    }

    /// Sets the reference SQL.
    pub fn with_expected_sql(mut self, sql: impl Into<String>) -> Self {
        self.expected_sql = Some(sql.into());
        self
    }

    /// Sets the reference result.
    pub fn with_expected_result(mut self, result: ResultSet) -> Self {
        self.expected_result = Some(result);
        self
    }

    /// Sets the difficulty tag.
    pub fn with_difficulty(mut self, difficulty: impl Into<String>) -> Self {
        self.difficulty = difficulty.into();
        self
    }
}

/// Structured outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub is_correct: bool,
    pub score: u8,
    pub feedback: FeedbackPayload,
    /// First rows of the result, or `None` when execution failed.
    pub preview: Option<ResultSet>,
    pub execution: ExecutionResult,
}

/// Runs submissions through classifier, sandbox, grading, and feedback.
pub struct Evaluator {
    classifier: SqlClassifier,
    executor: SandboxExecutor,
    orchestrator: Arc<FeedbackOrchestrator>,
}

impl Evaluator {
    /// Creates a new evaluator.
    pub fn new(executor: SandboxExecutor, orchestrator: Arc<FeedbackOrchestrator>) -> Self {
        Self {
            classifier: SqlClassifier::new(),
            executor,
            orchestrator,
        }
    }

    pub fn orchestrator(&self) -> &Arc<FeedbackOrchestrator> {
        &self.orchestrator
    }

    /// Classifies `sql` without running it.
    pub fn classify(&self, sql: &str) -> Verdict {
        self.classifier.classify(sql)
    }

    /// Evaluates `sql` as an answer to `exercise`.
    ///
    /// Fails only with `RejectedStatement` or `Cancelled`.
    pub async fn evaluate(
        &self,
        exercise: &Exercise,
        sql: &str,
        mode: SubmissionMode,
        cancel: &CancellationToken,
    ) -> Result<Evaluation> {
        let start = Instant::now();

        if let Verdict::Reject(reason) = self.classifier.classify(sql) {
            tracing::info!(exercise = %exercise.id, %reason, "Submission rejected");
            return Err(TutorError::rejected(reason.to_string()));
        }

        let execution = self.executor.execute_cancellable(sql, cancel).await;
        if cancel.is_cancelled() {
            return Err(TutorError::Cancelled);
        }

        let is_correct = self.grade(exercise, &execution, cancel).await;
        if cancel.is_cancelled() {
            return Err(TutorError::Cancelled);
        }

        let ctx = SubmissionContext::new(sql, exercise.prompt.as_str())
            .with_difficulty(exercise.difficulty.as_str())
            .with_expected_sql(exercise.expected_sql.clone())
            .with_expected_result(exercise.expected_result.clone())
            .with_outcome(&execution, is_correct);

        let feedback = match mode {
            SubmissionMode::Run => fallback_payload(&ctx),
            SubmissionMode::Submit => {
                self.orchestrator
                    .get_feedback_cancellable(&ctx, cancel)
                    .await?
            }
        };

        tracing::info!(
            exercise = %exercise.id,
            ?mode,
            is_correct,
            executed = execution.is_success(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Submission evaluated"
        );

        Ok(Evaluation {
            is_correct,
            score: if is_correct { FULL_SCORE } else { 0 },
            feedback,
            preview: execution.result_set().map(|set| set.preview(PREVIEW_ROWS)),
            execution,
        })
    }

    /// Resolves an exercise, evaluates the submission, and records the attempt.
    ///
    /// Recording happens only in `Submit` mode; a failed write is logged and
    /// does not fail the evaluation.
    #[allow(clippy::too_many_arguments)]
    pub async fn evaluate_exercise(
        &self,
        exercises: &dyn ExerciseRepository,
        attempts: &dyn AttemptRecorder,
        user_id: &str,
        exercise_id: &str,
        sql: &str,
        mode: SubmissionMode,
        cancel: &CancellationToken,
    ) -> Result<Evaluation> {
        let exercise = exercises.find_exercise(exercise_id).await?.ok_or_else(|| {
            TutorError::persistence(format!("Exercise '{exercise_id}' not found"))
        })?;

        let evaluation = self.evaluate(&exercise, sql, mode, cancel).await?;

        if mode == SubmissionMode::Submit {
            let record = AttemptRecord {
                user_id: user_id.to_string(),
                exercise_id: exercise.id.clone(),
                sql: sql.to_string(),
                is_correct: evaluation.is_correct,
                feedback: evaluation.feedback.clone(),
                result_snapshot: evaluation.preview.clone(),
                score: evaluation.score,
            };
            if let Err(e) = attempts.record_attempt(record).await {
                tracing::error!(
                    user = user_id,
                    exercise = exercise_id,
                    error = %e,
                    "Failed to record attempt"
                );
            }
        }

        Ok(evaluation)
    }

    /// Decides correctness from the execution outcome and the exercise's reference.
    async fn grade(
        &self,
        exercise: &Exercise,
        execution: &ExecutionResult,
        cancel: &CancellationToken,
    ) -> bool {
        let Some(actual) = execution.result_set() else {
            return false;
        };

        if let Some(expected) = &exercise.expected_result {
            return equivalent(actual, expected);
        }

        if let Some(expected_sql) = &exercise.expected_sql {
            if !self.classifier.classify(expected_sql).is_allowed() {
                tracing::warn!(
                    exercise = %exercise.id,
                    "Reference SQL is not a permitted statement"
                );
                return true;
            }
            let reference = self.executor.execute_cancellable(expected_sql, cancel).await;
            return match reference.into_result() {
                Ok(expected) => equivalent(actual, &expected),
                Err(e) => {
                    tracing::warn!(
                        exercise = %exercise.id,
                        error = %e,
                        "Reference SQL failed to run"
                    );
                    true
                }
            };
        }

        true
    }
}
