use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

use crate::model::answer::AnswerRecord;
use crate::model::ids::ResultId;
use crate::model::quiz::{Quiz, QuizKind};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizResultError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("{records} answer records for a quiz of {questions} questions")]
    RecordCountMismatch { records: usize, questions: usize },
}

/// Outcome of a finished quiz run.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizResult {
    id: ResultId,
    quiz_kind: QuizKind,
    quiz_key: String,
    score: usize,
    total: usize,
    pass_threshold: usize,
    records: Vec<AnswerRecord>,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    total_time_spent: Duration,
}

impl QuizResult {
    /// Build the result of a quiz from its answer records.
    ///
    /// The score is recounted from the records rather than trusted from the caller.
    ///
    /// # Errors
    ///
    /// Returns `QuizResultError::InvalidTimeRange` if `completed_at < started_at` and
    /// `QuizResultError::RecordCountMismatch` unless every question has a record.
    pub fn from_records(
        quiz: &Quiz,
        records: Vec<AnswerRecord>,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, QuizResultError> {
        if completed_at < started_at {
            return Err(QuizResultError::InvalidTimeRange);
        }
        if records.len() != quiz.len() {
            return Err(QuizResultError::RecordCountMismatch {
                records: records.len(),
                questions: quiz.len(),
            });
        }

        let score = records.iter().filter(|r| r.is_correct).count();
        let total_time_spent = records.iter().map(|r| r.response_time).sum();

        Ok(Self {
            id: ResultId::generate(),
            quiz_kind: quiz.kind(),
            quiz_key: quiz.key().to_owned(),
            score,
            total: quiz.len(),
            pass_threshold: quiz.pass_threshold(),
            records,
            started_at,
            completed_at,
            total_time_spent,
        })
    }

    #[must_use]
    pub fn id(&self) -> ResultId {
        self.id
    }

    #[must_use]
    pub fn quiz_kind(&self) -> QuizKind {
        self.quiz_kind
    }

    #[must_use]
    pub fn quiz_key(&self) -> &str {
        &self.quiz_key
    }

    #[must_use]
    pub fn score(&self) -> usize {
        self.score
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// `round(100 * score / total)`, rounding halves up.
    #[must_use]
    pub fn percentage(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        let pct = (200 * self.score + self.total) / (2 * self.total);
        u32::try_from(pct).unwrap_or(100)
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.score >= self.pass_threshold
    }

    #[must_use]
    pub fn pass_threshold(&self) -> usize {
        self.pass_threshold
    }

    #[must_use]
    pub fn records(&self) -> &[AnswerRecord] {
        &self.records
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    /// Sum of per-question response times.
    #[must_use]
    pub fn total_time_spent(&self) -> Duration {
        self.total_time_spent
    }

    /// Better-than comparison for personal bests: higher score, then less time.
    #[must_use]
    pub fn beats(&self, other: &QuizResult) -> bool {
        (self.percentage(), std::cmp::Reverse(self.total_time_spent))
            > (other.percentage(), std::cmp::Reverse(other.total_time_spent))
    }
}
