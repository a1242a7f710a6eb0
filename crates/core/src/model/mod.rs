mod answer;
mod ids;
mod question;
mod quiz;
mod results;
mod vocabulary;

pub use answer::{AnswerKind, AnswerRecord};
pub use ids::{CategoryKey, ItemId, ResultId};
pub use question::{Direction, Question, QuestionError, QuestionKind};
pub use quiz::{Quiz, QuizError, QuizKind};
pub use results::{QuizResult, QuizResultError};
pub use vocabulary::{
    Category, ExampleSentence, FrequencyTier, GrammaticalType, PoolEntry, Tier, VocabularyDraft,
    VocabularyError, VocabularyItem, VocabularyPool,
};
