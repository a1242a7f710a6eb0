use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::model::question::Question;

/// Classification of a judged answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerKind {
    /// Matched the canonical answer after normalization.
    Exact,
    /// Matched a `/`-delimited alternative or a synonym.
    Alternative,
    /// Accepted by edit-distance similarity.
    Approximate,
    /// Rejected, but very close (likely a misspelling).
    Typo,
    /// Rejected, partially similar.
    Partial,
    /// Rejected, nothing in common.
    WrongWord,
    /// Nothing was entered.
    Empty,
    /// The countdown ran out before an answer was submitted.
    Timeout,
}

impl AnswerKind {
    #[must_use]
    pub fn is_correct(self) -> bool {
        matches!(
            self,
            AnswerKind::Exact | AnswerKind::Alternative | AnswerKind::Approximate
        )
    }
}

/// Immutable record of one submitted (or timed-out) answer.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerRecord {
    pub question_index: usize,
    pub question: Question,
    pub user_input: String,
    pub correct_answer: String,
    pub is_correct: bool,
    pub kind: AnswerKind,
    pub similarity: f64,
    pub response_time: Duration,
    /// Countdown remaining at submission; `None` for untimed quizzes.
    pub remaining_time: Option<Duration>,
}

impl AnswerRecord {
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.kind == AnswerKind::Timeout
    }
}
