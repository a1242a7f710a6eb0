//! Domain model and answer checking for the vocabulary quiz engine.
#![forbid(unsafe_code)]

pub mod error;
pub mod matching;
pub mod model;
pub mod settings;
pub mod time;

pub use error::Error;
pub use matching::{AnswerChecker, CheckOutcome};
pub use settings::MatchingSettings;
pub use time::Clock;
