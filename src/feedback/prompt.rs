//! Prompt construction for feedback requests.
//!
//! Builds a bounded prompt from a submission: the exercise, the (truncated)
//! SQL, the verdict, and either the error or a result summary.

use super::SubmissionContext;

/// Maximum characters of student SQL included in a prompt.
pub const MAX_PROMPT_SQL_CHARS: usize = 500;

/// Maximum characters of the exercise prompt included.
pub const MAX_PROMPT_EXERCISE_CHARS: usize = 1_000;

/// Maximum characters of an error message included.
const MAX_PROMPT_ERROR_CHARS: usize = 300;

/// Maximum column names listed in the result summary.
const MAX_SUMMARY_COLUMNS: usize = 12;

/// Builds the feedback prompt for a submission.
pub fn build_feedback_prompt(ctx: &SubmissionContext) -> String {
    let outcome = match (ctx.validation_error(), ctx.result()) {
        (Some(error), _) => format!("Error: {}", truncate(error, MAX_PROMPT_ERROR_CHARS)),
        (None, Some(result)) => {
            let mut columns: Vec<&str> = result
                .columns
                .iter()
                .take(MAX_SUMMARY_COLUMNS)
                .map(String::as_str)
                .collect();
            if result.columns.len() > MAX_SUMMARY_COLUMNS {
                columns.push("...");
            }
            format!(
                "Result: {} row(s) returned{} with columns [{}]",
                result.row_count(),
                if result.truncated { " (truncated)" } else { "" },
                columns.join(", ")
            )
        }
        (None, None) => "Result: not executed".to_string(),
    };

    format!(
        "You are a patient SQL tutor reviewing a student's answer to an exercise.\n\n\
         EXERCISE ({difficulty}):\n{exercise}\n\n\
         STUDENT SQL:\n{sql}\n\n\
         Correct: {correct}\n{outcome}\n\n\
         INSTRUCTIONS:\n\
         - Reply in 2 to 4 short sentences of plain text\n\
         - If the query failed, explain the error in simple terms\n\
         - If the query is correct, praise it and suggest one improvement\n\
         - Do not reveal a complete solution",
        difficulty = ctx.difficulty(),
        exercise = truncate(ctx.exercise_prompt(), MAX_PROMPT_EXERCISE_CHARS),
        sql = truncate(ctx.sql().trim(), MAX_PROMPT_SQL_CHARS),
        correct = if ctx.is_correct() { "yes" } else { "no" },
        outcome = outcome,
    )
}

/// Truncates to `max` characters on a char boundary, marking the cut.
fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
