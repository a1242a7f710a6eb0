#![forbid(unsafe_code)]

pub mod catalog;
pub mod error;
pub mod generator;
pub mod sessions;
pub mod settings;
pub mod timer;

pub use quiz_core::Clock;
pub use sessions as session;

pub use catalog::{QuizAvailability, QuizCatalog, QuizType};
pub use error::{ConfigError, EngineError, QuizUnavailable, SessionError};
pub use generator::{KindPolicy, QuestionGenerator};
pub use sessions::{
    Advance, AnswerOutcome, EngineAdvance, QuizEngine, QuizSession, QuizSummary,
    SessionProgress, SessionState,
};
pub use settings::EngineSettings;
pub use timer::{QuizTimer, TIMER_SAMPLE_INTERVAL, TimerState};
