//! Tunable constants for answer matching.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("{name} must be in (0, 1], got {value}")]
    ThresholdOutOfRange { name: &'static str, value: f64 },

    #[error("typo similarity ({typo}) must be above wrong-word similarity ({wrong_word})")]
    InvertedMissBands { typo: f64, wrong_word: f64 },
}

/// Similarity thresholds used by the answer checker.
///
/// The defaults are empirically chosen and kept overridable rather than derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingSettings {
    term_threshold: f64,
    sentence_threshold: f64,
    fuzzy_min_len: usize,
    typo_similarity: f64,
    wrong_word_similarity: f64,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            term_threshold: 0.8,
            sentence_threshold: 0.7,
            fuzzy_min_len: 6,
            typo_similarity: 0.7,
            wrong_word_similarity: 0.3,
        }
    }
}

impl MatchingSettings {
    /// # Errors
    ///
    /// Returns `SettingsError` if a threshold is outside `(0, 1]` or the miss bands
    /// are inverted.
    pub fn new(
        term_threshold: f64,
        sentence_threshold: f64,
        fuzzy_min_len: usize,
        typo_similarity: f64,
        wrong_word_similarity: f64,
    ) -> Result<Self, SettingsError> {
        let settings = Self {
            term_threshold,
            sentence_threshold,
            fuzzy_min_len,
            typo_similarity,
            wrong_word_similarity,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Re-check invariants, e.g. after deserializing a partial override.
    ///
    /// # Errors
    ///
    /// See [`MatchingSettings::new`].
    pub fn validate(&self) -> Result<(), SettingsError> {
        for (name, value) in [
            ("term_threshold", self.term_threshold),
            ("sentence_threshold", self.sentence_threshold),
            ("typo_similarity", self.typo_similarity),
            ("wrong_word_similarity", self.wrong_word_similarity),
        ] {
            if !value.is_finite() || value <= 0.0 || value > 1.0 {
                return Err(SettingsError::ThresholdOutOfRange { name, value });
            }
        }
        if self.typo_similarity <= self.wrong_word_similarity {
            return Err(SettingsError::InvertedMissBands {
                typo: self.typo_similarity,
                wrong_word: self.wrong_word_similarity,
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn term_threshold(&self) -> f64 {
        self.term_threshold
    }

    #[must_use]
    pub fn sentence_threshold(&self) -> f64 {
        self.sentence_threshold
    }

    /// Expected answers must be longer than this (in characters) for fuzzy acceptance.
    #[must_use]
    pub fn fuzzy_min_len(&self) -> usize {
        self.fuzzy_min_len
    }

    #[must_use]
    pub fn typo_similarity(&self) -> f64 {
        self.typo_similarity
    }

    #[must_use]
    pub fn wrong_word_similarity(&self) -> f64 {
        self.wrong_word_similarity
    }
}
