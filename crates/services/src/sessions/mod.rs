mod progress;
mod service;
mod workflow;

use std::fmt;

pub use progress::SessionProgress;
pub use service::{Advance, AnswerOutcome, QuizSession};
pub use workflow::{EngineAdvance, QuizEngine, QuizSummary};

/// Lifecycle of a quiz session.
///
/// `Idle → AwaitingAnswer → Feedback → (AwaitingAnswer | Finished)`, with
/// `Cancelled` reachable from `AwaitingAnswer` and `Feedback`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Idle,
    AwaitingAnswer,
    Feedback,
    Finished,
    Cancelled,
}

impl SessionState {
    /// Whether a quiz is under way (started, not yet finished or cancelled).
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, SessionState::AwaitingAnswer | SessionState::Feedback)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionState::Idle => "idle",
            SessionState::AwaitingAnswer => "awaiting an answer",
            SessionState::Feedback => "showing feedback",
            SessionState::Finished => "finished",
            SessionState::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}
