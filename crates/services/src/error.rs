//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{CategoryKey, QuizError, QuizKind, QuizResultError, Tier};
use quiz_core::settings::SettingsError;
use storage::StorageError;

use crate::sessions::SessionState;

/// Invalid engine configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("primary→target weight must be in [0, 1], got {0}")]
    DirectionWeight(f64),
    #[error("question kind weights for {tier} tier sum to zero")]
    ZeroKindWeights { tier: Tier },
    #[error("multiple-choice needs at least 2 options, got {0}")]
    OptionCount(usize),
    #[error("{kind} quiz must have at least one question")]
    ZeroQuestions { kind: QuizKind },
    #[error("{kind} pass rule exceeds the quiz size")]
    PassAboveSize { kind: QuizKind },
    #[error("speed quiz time limit must be > 0 seconds")]
    ZeroTimeLimit,
    #[error("final unlock ratio must be in (0, 1], got {0}")]
    UnlockRatio(f64),
    #[error("final quiz split must add up to 100, got {0}")]
    FinalSplit(usize),
    #[error(transparent)]
    Matching(#[from] SettingsError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Why a quiz type cannot be started right now.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizUnavailable {
    #[error("the vocabulary pool is empty")]
    EmptyPool,
    #[error("unknown category `{key}`")]
    UnknownCategory { key: CategoryKey },
    #[error("category `{key}` has no words")]
    EmptyCategory { key: CategoryKey },
    #[error("needs at least {need} words, found {have}")]
    PoolTooSmall { have: usize, need: usize },
    #[error("needs at least {need} bookmarked words, found {have}")]
    NotEnoughBookmarks { have: usize, need: usize },
    #[error("choose at least {need} categories, got {have}")]
    NotEnoughCategories { have: usize, need: usize },
    #[error("complete {required} of {total} categories to unlock (completed {completed})")]
    FinalLocked {
        completed: usize,
        total: usize,
        required: usize,
    },
    #[error("needs at least {need} {tier} words, found {have}")]
    NotEnoughTierItems { tier: Tier, have: usize, need: usize },
    #[error("needs at least {need} words with a difficulty rating, found {have}")]
    NotEnoughTagged { have: usize, need: usize },
    #[error("no learner profile available")]
    NoLearnerProfile,
    #[error("no results history available")]
    NoResultsHistory,
    #[error(transparent)]
    Quiz(#[from] QuizError),
}

/// Precondition violations of the quiz session state machine.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("cannot {operation} while the session is {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },
    #[error("answer cannot be empty")]
    EmptyAnswer,
    #[error(transparent)]
    Result(#[from] QuizResultError),
}

/// Errors emitted by `QuizEngine`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    #[error("no quiz is in progress")]
    NoActiveSession,
    #[error("a quiz is already in progress")]
    SessionInProgress,
    #[error(transparent)]
    Unavailable(#[from] QuizUnavailable),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
