//! Feedback orchestration.
//!
//! The single entry point for turning a submission into feedback:
//! cache lookup, bounded retries against the reasoning service under a
//! per-attempt deadline, and deterministic fallback. Never fails except on
//! caller cancellation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use super::{
    build_feedback_prompt, fallback_payload, fingerprint, FeedbackCache, FeedbackPayload,
    SubmissionContext,
};
use crate::error::{Result, TutorError};
use crate::llm::LlmClient;

/// Retry and deadline settings for reasoning service calls.
///
/// Resolved once at startup from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of calls per cache miss.
    pub max_retries: u32,
    /// Deadline for each call.
    pub attempt_timeout: Duration,
    /// Pause between a failed call and the next one.
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            attempt_timeout: Duration::from_secs(30),
            retry_delay: Duration::from_secs(2),
        }
    }
}

/// Coordinates cache, reasoning service, and fallback.
pub struct FeedbackOrchestrator {
    client: Option<Arc<dyn LlmClient>>,
    cache: Arc<FeedbackCache>,
    policy: RetryPolicy,
}

enum Attempt {
    Answered(FeedbackPayload),
    Unusable,
    Failed(TutorError),
}

impl FeedbackOrchestrator {
    /// Creates an orchestrator that calls `client` on cache misses.
    pub fn new(client: Arc<dyn LlmClient>, cache: Arc<FeedbackCache>, policy: RetryPolicy) -> Self {
        Self {
            client: Some(client),
            cache,
            policy,
        }
    }

    /// Creates an orchestrator with no reasoning service; misses use the fallback.
    pub fn offline(cache: Arc<FeedbackCache>) -> Self {
        Self {
            client: None,
            cache,
            policy: RetryPolicy::default(),
        }
    }

    pub fn cache(&self) -> &Arc<FeedbackCache> {
        &self.cache
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Returns feedback for a submission. Always yields a usable payload.
    pub async fn get_feedback(&self, ctx: &SubmissionContext) -> FeedbackPayload {
        match self.get_feedback_cancellable(ctx, &CancellationToken::new()).await {
            Ok(payload) => payload,
            Err(_) => fallback_payload(ctx),
        }
    }

    /// Returns feedback for a submission, giving up if `cancel` fires.
    ///
    /// The only error is `TutorError::Cancelled`; a cancelled call leaves the
    /// cache untouched.
    pub async fn get_feedback_cancellable(
        &self,
        ctx: &SubmissionContext,
        cancel: &CancellationToken,
    ) -> Result<FeedbackPayload> {
        let key = fingerprint(ctx);

        if let Some(hit) = self.cache.get(&key) {
            tracing::debug!(fingerprint = key.short(), "Feedback cache hit");
            return Ok((*hit).clone());
        }

        let Some(client) = self.client.as_ref() else {
            tracing::debug!(fingerprint = key.short(), "No reasoning service, using fallback");
            return Ok(fallback_payload(ctx));
        };

        let prompt = build_feedback_prompt(ctx);
        let start = Instant::now();
        let max_attempts = self.policy.max_retries.max(1);

        for attempt in 1..=max_attempts {
            let outcome = tokio::select! {
                biased;

                _ = cancel.cancelled() => return Err(TutorError::Cancelled),
                outcome = self.attempt(client.as_ref(), &prompt) => outcome,
            };

            match outcome {
                Attempt::Answered(payload) => {
                    tracing::info!(
                        fingerprint = key.short(),
                        attempt,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Feedback generated"
                    );
                    let cached = self.cache.put(key, payload);
                    return Ok((*cached).clone());
                }
                Attempt::Unusable => {
                    tracing::warn!(
                        fingerprint = key.short(),
                        attempt,
                        "Reasoning service returned no usable text"
                    );
                    break;
                }
                Attempt::Failed(e) => {
                    tracing::warn!(
                        fingerprint = key.short(),
                        attempt,
                        max_attempts,
                        error = %e,
                        "Feedback attempt failed"
                    );
                }
            }

            if attempt < max_attempts {
                tokio::select! {
                    biased;

                    _ = cancel.cancelled() => return Err(TutorError::Cancelled),
                    _ = tokio::time::sleep(self.policy.retry_delay) => {}
                }
            }
        }

        tracing::warn!(
            fingerprint = key.short(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Reasoning service unavailable, using fallback feedback"
        );
        Ok(fallback_payload(ctx))
    }

    /// Makes one call under the per-attempt deadline.
    async fn attempt(&self, client: &dyn LlmClient, prompt: &str) -> Attempt {
        let timeout = self.policy.attempt_timeout;
        match tokio::time::timeout(timeout, client.generate(prompt)).await {
            Ok(Ok(text)) => match FeedbackPayload::from_service_text(&text) {
                Some(payload) => Attempt::Answered(payload),
                None => Attempt::Unusable,
            },
            Ok(Err(e)) => Attempt::Failed(e),
            Err(_) => Attempt::Failed(TutorError::feedback_service(format!(
                "Request timed out after {} ms",
                timeout.as_millis()
            ))),
        }
    }
}
