//! Deterministic feedback used when the reasoning service cannot answer.
//!
//! Every context maps to exactly one payload, with no network involved.

use super::{FeedbackPayload, FeedbackSource, SubmissionContext};

/// Produces the fallback payload for a submission.
pub fn fallback_payload(ctx: &SubmissionContext) -> FeedbackPayload {
    if let Some(error) = ctx.validation_error() {
        return FeedbackPayload {
            feedback: format!("Your query could not be executed: {error}"),
            suggestions: vec![
                "Review your SQL syntax, table names, and column names.".to_string(),
                "Only read-only SELECT statements are allowed in this exercise.".to_string(),
            ],
            explanation: None,
            next_steps: Vec::new(),
            source: FeedbackSource::Fallback,
        };
    }

    match ctx.result() {
        Some(result) if ctx.is_correct() => FeedbackPayload {
            feedback: format!(
                "Well done! Your query ran successfully and returned {}.",
                rows_phrase(result.row_count())
            ),
            suggestions: vec![
                "Try adding a WHERE clause to filter the results.".to_string(),
                "Experiment with selecting different columns.".to_string(),
            ],
            explanation: None,
            next_steps: vec!["Move on to the next exercise when you are ready.".to_string()],
            source: FeedbackSource::Fallback,
        },
        _ => FeedbackPayload {
            feedback: "Your query was processed, but the tutor is unavailable right now."
                .to_string(),
            suggestions: vec![
                "Compare your result with what the exercise asks for.".to_string(),
                "Re-read the exercise prompt and try again.".to_string(),
            ],
            explanation: None,
            next_steps: Vec::new(),
            source: FeedbackSource::Fallback,
        },
    }
}

fn rows_phrase(count: usize) -> String {
    if count == 1 {
        "1 row".to_string()
    } else {
        format!("{count} rows")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::{ExecutionResult, ResultSet, Value};

    fn result(rows: usize) -> ExecutionResult {
        ExecutionResult::Success(ResultSet::new(
            vec!["id".to_string()],
            (0..rows as i64).map(|i| vec![Value::Int(i)]).collect(),
        ))
    }

    #[test]
    fn test_error_fallback_names_the_error() {
        let ctx = SubmissionContext::new("SELECT * FROM orders", "List orders").with_outcome(
            &ExecutionResult::error("SQL Error: no such table: orders"),
            false,
        );
        let payload = fallback_payload(&ctx);

        assert!(payload.feedback.contains("SQL Error: no such table: orders"));
        assert_eq!(payload.suggestions.len(), 2);
        assert!(payload.suggestions[1].contains("SELECT"));
        assert_eq!(payload.source, FeedbackSource::Fallback);
    }

    #[test]
    fn test_correct_fallback_cites_row_count() {
        let ctx = SubmissionContext::new("SELECT id FROM users", "List ids")
            .with_outcome(&result(5), true);
        let payload = fallback_payload(&ctx);

        assert!(payload.feedback.contains("5 rows"));
        assert!(payload.suggestions.iter().any(|s| s.contains("WHERE")));
        assert!(!payload.next_steps.is_empty());
    }

    #[test]
    fn test_correct_fallback_singular_row() {
        let ctx = SubmissionContext::new("SELECT 1", "One").with_outcome(&result(1), true);
        assert!(fallback_payload(&ctx).feedback.contains("returned 1 row."));
    }

    #[test]
    fn test_incorrect_fallback_is_generic() {
        let ctx = SubmissionContext::new("SELECT id FROM users", "List names")
            .with_outcome(&result(5), false);
        let payload = fallback_payload(&ctx);

        assert!(payload.feedback.contains("tutor is unavailable"));
        assert_eq!(payload.suggestions.len(), 2);
    }

    #[test]
    fn test_unexecuted_context_is_generic() {
        let ctx = SubmissionContext::new("SELECT 1", "One");
        assert!(fallback_payload(&ctx).feedback.contains("tutor is unavailable"));
    }

    #[test]
    fn test_fallback_is_never_empty() {
        let contexts = [
            SubmissionContext::new("", ""),
            SubmissionContext::new("SELECT 1", "One").with_outcome(&result(0), true),
            SubmissionContext::new("SELECT 1", "One")
                .with_outcome(&ExecutionResult::error(""), false),
        ];
        for ctx in &contexts {
            assert!(!fallback_payload(ctx).feedback.is_empty());
        }
    }
}
