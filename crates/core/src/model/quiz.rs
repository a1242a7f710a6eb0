use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::model::question::Question;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz must contain at least one question")]
    NoQuestions,

    #[error("pass threshold {threshold} exceeds question count {questions}")]
    ThresholdTooHigh { threshold: usize, questions: usize },

    #[error("time limit must be > 0 seconds")]
    InvalidTimeLimit,
}

//
// ─── KIND ──────────────────────────────────────────────────────────────────────
//

/// Name of the strategy that produced a quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizKind {
    Category,
    Random,
    Bookmarked,
    Speed,
    MixedCategories,
    Final,
    HardOnly,
    EasyOnly,
    Progressive,
    Adaptive,
}

impl QuizKind {
    pub const ALL: [QuizKind; 10] = [
        QuizKind::Category,
        QuizKind::Random,
        QuizKind::Bookmarked,
        QuizKind::Speed,
        QuizKind::MixedCategories,
        QuizKind::Final,
        QuizKind::HardOnly,
        QuizKind::EasyOnly,
        QuizKind::Progressive,
        QuizKind::Adaptive,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuizKind::Category => "category",
            QuizKind::Random => "random",
            QuizKind::Bookmarked => "bookmarked",
            QuizKind::Speed => "speed",
            QuizKind::MixedCategories => "mixed_categories",
            QuizKind::Final => "final",
            QuizKind::HardOnly => "hard_only",
            QuizKind::EasyOnly => "easy_only",
            QuizKind::Progressive => "progressive",
            QuizKind::Adaptive => "adaptive",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|k| k.as_str() == normalized)
    }
}

impl fmt::Display for QuizKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── QUIZ ──────────────────────────────────────────────────────────────────────
//

/// A fully specified quiz: ordered questions, pass threshold, optional time limit.
///
/// Question order is fixed at construction; progressive and adaptive quizzes rely on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    kind: QuizKind,
    key: String,
    questions: Vec<Question>,
    pass_threshold: usize,
    time_limit: Option<Duration>,
}

impl Quiz {
    /// # Errors
    ///
    /// Returns `QuizError::NoQuestions` for an empty list and
    /// `QuizError::ThresholdTooHigh` if `pass_threshold > questions.len()`.
    pub fn new(
        kind: QuizKind,
        key: impl Into<String>,
        questions: Vec<Question>,
        pass_threshold: usize,
    ) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::NoQuestions);
        }
        if pass_threshold > questions.len() {
            return Err(QuizError::ThresholdTooHigh {
                threshold: pass_threshold,
                questions: questions.len(),
            });
        }

        Ok(Self {
            kind,
            key: key.into(),
            questions,
            pass_threshold,
            time_limit: None,
        })
    }

    /// Attach a per-question countdown.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidTimeLimit` for a zero limit.
    pub fn with_time_limit_seconds(mut self, seconds: u64) -> Result<Self, QuizError> {
        if seconds == 0 {
            return Err(QuizError::InvalidTimeLimit);
        }
        self.time_limit = Some(Duration::from_secs(seconds));
        Ok(self)
    }

    #[must_use]
    pub fn kind(&self) -> QuizKind {
        self.kind
    }

    /// Stable key used for best-result lookup (e.g. `category:animals`).
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn pass_threshold(&self) -> usize {
        self.pass_threshold
    }

    #[must_use]
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit
    }

    #[must_use]
    pub fn time_limit_seconds(&self) -> Option<u64> {
        self.time_limit.map(|d| d.as_secs())
    }
}
