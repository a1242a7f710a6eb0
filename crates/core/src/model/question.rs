use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::ids::{CategoryKey, ItemId};
use crate::model::vocabulary::{Tier, VocabularyItem};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("multiple-choice options must contain the correct answer exactly once (found {found})")]
    CorrectAnswerCount { found: usize },

    #[error("multiple-choice options must be distinct")]
    DuplicateOption,

    #[error("multiple-choice needs at least two options, got {0}")]
    TooFewOptions(usize),

    #[error("item has no example sentence")]
    MissingExample,
}

//
// ─── KIND & DIRECTION ──────────────────────────────────────────────────────────
//

/// How a question is asked and answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice,
    FreeText,
    SentenceTranslation,
}

impl QuestionKind {
    pub const ALL: [QuestionKind; 3] = [
        QuestionKind::MultipleChoice,
        QuestionKind::FreeText,
        QuestionKind::SentenceTranslation,
    ];
}

/// Which language is the prompt and which is the expected answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    PrimaryToTarget,
    TargetToPrimary,
}

impl Direction {
    /// The term shown to the learner.
    #[must_use]
    pub fn prompt_term(self, item: &VocabularyItem) -> &str {
        match self {
            Direction::PrimaryToTarget => item.primary_term(),
            Direction::TargetToPrimary => item.target_term(),
        }
    }

    /// The term the learner is expected to produce.
    #[must_use]
    pub fn answer_term(self, item: &VocabularyItem) -> &str {
        match self {
            Direction::PrimaryToTarget => item.target_term(),
            Direction::TargetToPrimary => item.primary_term(),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::PrimaryToTarget => f.write_str("primary→target"),
            Direction::TargetToPrimary => f.write_str("target→primary"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum QuestionDetail {
    MultipleChoice { options: Vec<String> },
    FreeText,
    SentenceTranslation { prompt_sentence: String },
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A single quiz question built from one vocabulary item.
///
/// The correct answer is derived from the direction at construction time and the
/// value is never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    item_id: ItemId,
    tier: Tier,
    direction: Direction,
    prompt: String,
    correct_answer: String,
    alternatives: Vec<String>,
    detail: QuestionDetail,
    source_category: Option<CategoryKey>,
}

impl Question {
    /// Open-text question on the bare term.
    ///
    /// Synonyms are accepted as alternatives when the expected answer is the target term.
    #[must_use]
    pub fn free_text(
        item: &VocabularyItem,
        direction: Direction,
        source_category: Option<CategoryKey>,
    ) -> Self {
        let alternatives = match direction {
            Direction::PrimaryToTarget => item.synonyms().to_vec(),
            Direction::TargetToPrimary => Vec::new(),
        };
        Self {
            item_id: item.id(),
            tier: item.difficulty_tier(),
            direction,
            prompt: direction.prompt_term(item).to_owned(),
            correct_answer: direction.answer_term(item).to_owned(),
            alternatives,
            detail: QuestionDetail::FreeText,
            source_category,
        }
    }

    /// Multiple-choice question with caller-ordered options.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the options do not contain the correct answer exactly
    /// once, contain duplicates, or are fewer than two.
    pub fn multiple_choice(
        item: &VocabularyItem,
        direction: Direction,
        options: Vec<String>,
        source_category: Option<CategoryKey>,
    ) -> Result<Self, QuestionError> {
        if options.len() < 2 {
            return Err(QuestionError::TooFewOptions(options.len()));
        }
        let correct_answer = direction.answer_term(item).to_owned();
        let found = options.iter().filter(|o| **o == correct_answer).count();
        if found != 1 {
            return Err(QuestionError::CorrectAnswerCount { found });
        }
        for (i, option) in options.iter().enumerate() {
            if options[i + 1..].contains(option) {
                return Err(QuestionError::DuplicateOption);
            }
        }

        Ok(Self {
            item_id: item.id(),
            tier: item.difficulty_tier(),
            direction,
            prompt: direction.prompt_term(item).to_owned(),
            correct_answer,
            alternatives: Vec::new(),
            detail: QuestionDetail::MultipleChoice { options },
            source_category,
        })
    }

    /// Translate the item's example sentence.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::MissingExample` when the item has no example sentence.
    pub fn sentence_translation(
        item: &VocabularyItem,
        direction: Direction,
        source_category: Option<CategoryKey>,
    ) -> Result<Self, QuestionError> {
        let example = item.example().ok_or(QuestionError::MissingExample)?;
        let (prompt_sentence, expected) = match direction {
            Direction::PrimaryToTarget => (&example.primary, &example.target),
            Direction::TargetToPrimary => (&example.target, &example.primary),
        };

        Ok(Self {
            item_id: item.id(),
            tier: item.difficulty_tier(),
            direction,
            prompt: direction.prompt_term(item).to_owned(),
            correct_answer: expected.clone(),
            alternatives: Vec::new(),
            detail: QuestionDetail::SentenceTranslation {
                prompt_sentence: prompt_sentence.clone(),
            },
            source_category,
        })
    }

    #[must_use]
    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    /// Author-assigned tier of the underlying item.
    #[must_use]
    pub fn tier(&self) -> Tier {
        self.tier
    }

    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        match self.detail {
            QuestionDetail::MultipleChoice { .. } => QuestionKind::MultipleChoice,
            QuestionDetail::FreeText => QuestionKind::FreeText,
            QuestionDetail::SentenceTranslation { .. } => QuestionKind::SentenceTranslation,
        }
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The term in the prompt language.
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    /// Extra accepted answers besides the canonical one (synonyms).
    #[must_use]
    pub fn alternatives(&self) -> &[String] {
        &self.alternatives
    }

    /// Shuffled options; empty unless this is a multiple-choice question.
    #[must_use]
    pub fn options(&self) -> &[String] {
        match &self.detail {
            QuestionDetail::MultipleChoice { options } => options,
            _ => &[],
        }
    }

    #[must_use]
    pub fn prompt_sentence(&self) -> Option<&str> {
        match &self.detail {
            QuestionDetail::SentenceTranslation { prompt_sentence } => Some(prompt_sentence.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub fn expected_translation(&self) -> Option<&str> {
        match self.detail {
            QuestionDetail::SentenceTranslation { .. } => Some(self.correct_answer.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub fn source_category(&self) -> Option<&CategoryKey> {
        self.source_category.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dog() -> VocabularyItem {
        VocabularyItem::new(ItemId::new(1), "dog", "perro", "noun", Tier::Easy)
            .unwrap()
            .with_synonyms(["can"])
    }

    #[test]
    fn correct_answer_follows_direction() {
        let forward = Question::free_text(&dog(), Direction::PrimaryToTarget, None);
        assert_eq!(forward.prompt(), "dog");
        assert_eq!(forward.correct_answer(), "perro");
        assert_eq!(forward.alternatives(), ["can".to_owned()]);

        let reverse = Question::free_text(&dog(), Direction::TargetToPrimary, None);
        assert_eq!(reverse.prompt(), "perro");
        assert_eq!(reverse.correct_answer(), "dog");
        assert!(reverse.alternatives().is_empty());
    }

    #[test]
    fn multiple_choice_validates_options() {
        let item = dog();
        let ok = Question::multiple_choice(
            &item,
            Direction::PrimaryToTarget,
            vec!["gato".into(), "perro".into(), "pez".into(), "vaca".into()],
            None,
        )
        .unwrap();
        assert_eq!(ok.kind(), QuestionKind::MultipleChoice);
        assert_eq!(ok.options().len(), 4);

        let missing = Question::multiple_choice(
            &item,
            Direction::PrimaryToTarget,
            vec!["gato".into(), "pez".into()],
            None,
        )
        .unwrap_err();
        assert_eq!(missing, QuestionError::CorrectAnswerCount { found: 0 });

        let dup = Question::multiple_choice(
            &item,
            Direction::PrimaryToTarget,
            vec!["gato".into(), "perro".into(), "gato".into()],
            None,
        )
        .unwrap_err();
        assert_eq!(dup, QuestionError::DuplicateOption);
    }

    #[test]
    fn sentence_translation_needs_example() {
        let err =
            Question::sentence_translation(&dog(), Direction::PrimaryToTarget, None).unwrap_err();
        assert_eq!(err, QuestionError::MissingExample);

        let item = dog().with_example("The dog runs.", "El perro corre.").unwrap();
        let q = Question::sentence_translation(&item, Direction::TargetToPrimary, None).unwrap();
        assert_eq!(q.prompt_sentence(), Some("El perro corre."));
        assert_eq!(q.expected_translation(), Some("The dog runs."));
        assert_eq!(q.correct_answer(), "The dog runs.");
    }
}
