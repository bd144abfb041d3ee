//! Persistence seams used by exercise evaluation.
//!
//! The engine only needs to look up exercises and record attempts. Real
//! storage lives with the host application; `InMemoryStore` backs tests and
//! the command-line tool.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde::Serialize;

use super::Exercise;
use crate::error::Result;
use crate::feedback::FeedbackPayload;
use crate::sandbox::ResultSet;

/// One recorded submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptRecord {
    pub user_id: String,
    pub exercise_id: String,
    pub sql: String,
    pub is_correct: bool,
    pub feedback: FeedbackPayload,
    pub result_snapshot: Option<ResultSet>,
    pub score: u8,
}

/// Resolves exercises by id.
#[async_trait]
pub trait ExerciseRepository: Send + Sync {
    /// Returns the exercise, or `None` if no exercise has this id.
    async fn find_exercise(&self, id: &str) -> Result<Option<Exercise>>;
}

/// Stores submitted attempts.
#[async_trait]
pub trait AttemptRecorder: Send + Sync {
    async fn record_attempt(&self, record: AttemptRecord) -> Result<()>;
}

/// Process-local exercise and attempt storage.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    exercises: Mutex<HashMap<String, Exercise>>,
    attempts: Mutex<Vec<AttemptRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the given exercises.
    pub fn with_exercises(exercises: impl IntoIterator<Item = Exercise>) -> Self {
        let store = Self::new();
        for exercise in exercises {
            store.add_exercise(exercise);
        }
        store
    }

    /// Inserts or replaces an exercise.
    pub fn add_exercise(&self, exercise: Exercise) {
        lock(&self.exercises).insert(exercise.id.clone(), exercise);
    }

    /// Returns a snapshot of all recorded attempts, oldest first.
    pub fn attempts(&self) -> Vec<AttemptRecord> {
        lock(&self.attempts).clone()
    }

    /// Returns the attempts for one user and exercise.
    pub fn attempts_for(&self, user_id: &str, exercise_id: &str) -> Vec<AttemptRecord> {
        lock(&self.attempts)
            .iter()
            .filter(|a| a.user_id == user_id && a.exercise_id == exercise_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ExerciseRepository for InMemoryStore {
    async fn find_exercise(&self, id: &str) -> Result<Option<Exercise>> {
        Ok(lock(&self.exercises).get(id).cloned())
    }
}

#[async_trait]
impl AttemptRecorder for InMemoryStore {
    async fn record_attempt(&self, record: AttemptRecord) -> Result<()> {
        tracing::debug!(
            user = %record.user_id,
            exercise = %record.exercise_id,
            is_correct = record.is_correct,
            "Recording attempt"
        );
        lock(&self.attempts).push(record);
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
