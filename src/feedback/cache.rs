//! Content-addressed feedback cache.
//!
//! Maps a submission fingerprint to a previously produced payload. Entries
//! expire after a fixed TTL; an expired entry is evicted by the lookup that
//! finds it, under the same lock, so a concurrent writer cannot be undone.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::{FeedbackPayload, SubmissionContext};

/// Default entry lifetime.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

const FIELD_SEPARATOR: char = '\u{1f}';

/// Hex SHA-256 digest identifying a submission for caching.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex digits, for logs.
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Computes the cache key for a submission.
///
/// Covers the trimmed, case-folded SQL, the exercise prompt, the correctness
/// flag, the validation error, and the result shape (sorted column set and
/// row count). Row contents are deliberately left out.
pub fn fingerprint(ctx: &SubmissionContext) -> Fingerprint {
    let sql = ctx.sql().trim().to_lowercase();
    let error = ctx.validation_error().unwrap_or("-");
    let shape = match ctx.result() {
        Some(set) => {
            let mut columns: Vec<&str> = set.columns.iter().map(String::as_str).collect();
            columns.sort_unstable();
            columns.dedup();
            format!("{}|{}", columns.join(","), set.row_count())
        }
        None => "-".to_string(),
    };

    let mut hasher = Sha256::new();
    for field in [
        sql.as_str(),
        ctx.exercise_prompt(),
        if ctx.is_correct() { "1" } else { "0" },
        error,
        shape.as_str(),
    ] {
        hasher.update(field.as_bytes());
        hasher.update([FIELD_SEPARATOR as u8]);
    }

    Fingerprint(hex::encode(hasher.finalize()))
}

#[derive(Debug)]
struct CacheEntry {
    payload: Arc<FeedbackPayload>,
    created_at: Instant,
}

/// Process-wide feedback cache shared by all evaluations.
#[derive(Debug)]
pub struct FeedbackCache {
    ttl: Duration,
    entries: Mutex<HashMap<Fingerprint, CacheEntry>>,
}

impl Default for FeedbackCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl FeedbackCache {
    /// Creates an empty cache with the given TTL.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the payload for `key` unless missing or expired.
    ///
    /// An expired entry is removed before reporting the miss.
    pub fn get(&self, key: &Fingerprint) -> Option<Arc<FeedbackPayload>> {
        let mut entries = self.lock();
        let expired = match entries.get(key) {
            None => return None,
            Some(entry) => entry.created_at.elapsed() > self.ttl,
        };

        if expired {
            entries.remove(key);
            None
        } else {
            entries.get(key).map(|entry| Arc::clone(&entry.payload))
        }
    }

    /// Inserts or replaces the payload for `key`, stamped with the current time.
    pub fn put(&self, key: Fingerprint, payload: FeedbackPayload) -> Arc<FeedbackPayload> {
        self.put_at(key, payload, Instant::now())
    }

    fn put_at(
        &self,
        key: Fingerprint,
        payload: FeedbackPayload,
        created_at: Instant,
    ) -> Arc<FeedbackPayload> {
        let payload = Arc::new(payload);
        self.lock().insert(
            key,
            CacheEntry {
                payload: Arc::clone(&payload),
                created_at,
            },
        );
        payload
    }

    /// Removes every expired entry, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.created_at.elapsed() <= self.ttl);
        before - entries.len()
    }

    /// Number of stored entries, expired or not.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Fingerprint, CacheEntry>> {
        // A panic while holding the lock cannot leave a half-written entry.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
