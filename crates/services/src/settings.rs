//! Engine configuration: question generation, quiz rules, and answer matching.
//!
//! Every empirically chosen constant lives here with its default so a host can
//! override it from JSON without touching the algorithms.

use serde::{Deserialize, Serialize};

use quiz_core::MatchingSettings;
use quiz_core::model::{Direction, QuestionKind, QuizKind, Tier};

use crate::error::ConfigError;

//
// ─── GENERATOR ─────────────────────────────────────────────────────────────────
//

/// How the translation direction of each question is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DirectionPolicy {
    /// Random, with the given probability of primary→target.
    Weighted { primary_to_target: f64 },
    /// Always the same direction.
    Fixed { direction: Direction },
}

impl Default for DirectionPolicy {
    fn default() -> Self {
        Self::Weighted {
            primary_to_target: 0.7,
        }
    }
}

/// Relative weights of question kinds for one difficulty tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindWeights {
    pub multiple_choice: u32,
    pub free_text: u32,
    pub sentence_translation: u32,
}

impl KindWeights {
    #[must_use]
    pub const fn new(multiple_choice: u32, free_text: u32, sentence_translation: u32) -> Self {
        Self {
            multiple_choice,
            free_text,
            sentence_translation,
        }
    }

    #[must_use]
    pub fn weight(&self, kind: QuestionKind) -> u32 {
        match kind {
            QuestionKind::MultipleChoice => self.multiple_choice,
            QuestionKind::FreeText => self.free_text,
            QuestionKind::SentenceTranslation => self.sentence_translation,
        }
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.multiple_choice + self.free_text + self.sentence_translation
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    pub direction: DirectionPolicy,
    pub easy_kinds: KindWeights,
    pub medium_kinds: KindWeights,
    pub hard_kinds: KindWeights,
    /// Options per multiple-choice question, correct answer included.
    pub option_count: usize,
    /// Distractor terms must have at least this many characters.
    pub min_distractor_len: usize,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            direction: DirectionPolicy::default(),
            easy_kinds: KindWeights::new(6, 3, 1),
            medium_kinds: KindWeights::new(4, 4, 2),
            hard_kinds: KindWeights::new(2, 5, 3),
            option_count: 4,
            min_distractor_len: 3,
        }
    }
}

impl GeneratorSettings {
    #[must_use]
    pub fn kind_weights(&self, tier: Tier) -> &KindWeights {
        match tier {
            Tier::Easy => &self.easy_kinds,
            Tier::Medium => &self.medium_kinds,
            Tier::Hard => &self.hard_kinds,
        }
    }

    /// # Errors
    ///
    /// Returns `ConfigError` for an out-of-range direction weight, all-zero kind
    /// weights, or fewer than two options.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let DirectionPolicy::Weighted { primary_to_target } = self.direction {
            if !(0.0..=1.0).contains(&primary_to_target) {
                return Err(ConfigError::DirectionWeight(primary_to_target));
            }
        }
        for tier in Tier::ALL {
            if self.kind_weights(tier).total() == 0 {
                return Err(ConfigError::ZeroKindWeights { tier });
            }
        }
        if self.option_count < 2 {
            return Err(ConfigError::OptionCount(self.option_count));
        }
        Ok(())
    }
}

//
// ─── QUIZ RULES ────────────────────────────────────────────────────────────────
//

/// How many correct answers are needed to pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassRule {
    /// A fixed count at the nominal quiz size, scaled down for shorter quizzes.
    Absolute(usize),
    /// A percentage of the questions actually asked, rounded up.
    Percent(u32),
}

/// Nominal size and pass rule of one quiz type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizRule {
    pub questions: usize,
    pub pass: PassRule,
}

impl QuizRule {
    #[must_use]
    pub const fn absolute(questions: usize, threshold: usize) -> Self {
        Self {
            questions,
            pass: PassRule::Absolute(threshold),
        }
    }

    #[must_use]
    pub const fn percent(questions: usize, percent: u32) -> Self {
        Self {
            questions,
            pass: PassRule::Percent(percent),
        }
    }

    /// Pass threshold for a quiz that ended up with `len` questions. Never exceeds `len`.
    #[must_use]
    pub fn threshold_for(&self, len: usize) -> usize {
        let raw = match self.pass {
            PassRule::Absolute(n) if len >= self.questions => n,
            PassRule::Absolute(n) => (len * n).div_ceil(self.questions.max(1)),
            PassRule::Percent(p) => (len * p as usize).div_ceil(100),
        };
        raw.min(len)
    }
}

/// Question counts per tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TierMix {
    pub easy: usize,
    pub medium: usize,
    pub hard: usize,
}

impl TierMix {
    #[must_use]
    pub const fn new(easy: usize, medium: usize, hard: usize) -> Self {
        Self { easy, medium, hard }
    }

    #[must_use]
    pub fn get(&self, tier: Tier) -> usize {
        match tier {
            Tier::Easy => self.easy,
            Tier::Medium => self.medium,
            Tier::Hard => self.hard,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.easy + self.medium + self.hard
    }
}

/// Rule table for the adaptive quiz.
///
/// - `struggling` when the learner tagged more hard than easy items,
/// - `confident` when easy tags exceed twice the hard tags,
/// - `balanced` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveRules {
    pub struggling: TierMix,
    pub confident: TierMix,
    pub balanced: TierMix,
    pub min_tagged: usize,
}

impl Default for AdaptiveRules {
    fn default() -> Self {
        Self {
            struggling: TierMix::new(6, 7, 2),
            confident: TierMix::new(3, 6, 6),
            balanced: TierMix::new(5, 5, 5),
            min_tagged: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    pub category: QuizRule,
    pub random: QuizRule,
    pub bookmarked: QuizRule,
    pub speed: QuizRule,
    pub mixed_categories: QuizRule,
    pub final_quiz: QuizRule,
    pub hard_only: QuizRule,
    pub easy_only: QuizRule,
    pub progressive: QuizRule,
    pub adaptive: QuizRule,

    pub speed_seconds_per_question: u64,
    pub speed_min_pool: usize,
    pub min_bookmarks: usize,
    pub min_mixed_categories: usize,
    /// Share of all categories that must be completed before the final quiz unlocks.
    pub final_unlock_ratio: f64,
    /// Final quiz tier split, in percent of the nominal question count.
    pub final_split: TierMix,
    pub min_single_tier_items: usize,
    pub progressive_min_per_tier: usize,
    pub adaptive_rules: AdaptiveRules,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            category: QuizRule::absolute(15, 12),
            random: QuizRule::percent(20, 70),
            bookmarked: QuizRule::percent(15, 70),
            speed: QuizRule::absolute(10, 7),
            mixed_categories: QuizRule::percent(20, 70),
            final_quiz: QuizRule::absolute(50, 42),
            hard_only: QuizRule::percent(15, 60),
            easy_only: QuizRule::percent(20, 80),
            progressive: QuizRule::percent(20, 70),
            adaptive: QuizRule::percent(15, 75),

            speed_seconds_per_question: 10,
            speed_min_pool: 10,
            min_bookmarks: 3,
            min_mixed_categories: 2,
            final_unlock_ratio: 0.75,
            final_split: TierMix::new(40, 40, 20),
            min_single_tier_items: 5,
            progressive_min_per_tier: 3,
            adaptive_rules: AdaptiveRules::default(),
        }
    }
}

impl CatalogSettings {
    #[must_use]
    pub fn rule(&self, kind: QuizKind) -> &QuizRule {
        match kind {
            QuizKind::Category => &self.category,
            QuizKind::Random => &self.random,
            QuizKind::Bookmarked => &self.bookmarked,
            QuizKind::Speed => &self.speed,
            QuizKind::MixedCategories => &self.mixed_categories,
            QuizKind::Final => &self.final_quiz,
            QuizKind::HardOnly => &self.hard_only,
            QuizKind::EasyOnly => &self.easy_only,
            QuizKind::Progressive => &self.progressive,
            QuizKind::Adaptive => &self.adaptive,
        }
    }

    /// # Errors
    ///
    /// Returns `ConfigError` for empty quizzes, thresholds above the quiz size,
    /// a zero speed limit, an unlock ratio outside `(0, 1]` or a final split that
    /// does not add up to 100.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for kind in QuizKind::ALL {
            let rule = self.rule(kind);
            if rule.questions == 0 {
                return Err(ConfigError::ZeroQuestions { kind });
            }
            let too_high = match rule.pass {
                PassRule::Absolute(n) => n > rule.questions,
                PassRule::Percent(p) => p > 100,
            };
            if too_high {
                return Err(ConfigError::PassAboveSize { kind });
            }
        }
        if self.speed_seconds_per_question == 0 {
            return Err(ConfigError::ZeroTimeLimit);
        }
        if !self.final_unlock_ratio.is_finite()
            || self.final_unlock_ratio <= 0.0
            || self.final_unlock_ratio > 1.0
        {
            return Err(ConfigError::UnlockRatio(self.final_unlock_ratio));
        }
        if self.final_split.total() != 100 {
            return Err(ConfigError::FinalSplit(self.final_split.total()));
        }
        Ok(())
    }
}

//
// ─── ENGINE ────────────────────────────────────────────────────────────────────
//

/// All engine settings, loadable from partial JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub matching: MatchingSettings,
    pub generator: GeneratorSettings,
    pub catalog: CatalogSettings,
}

impl EngineSettings {
    /// Parse and validate settings; missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Json` for malformed input, or a validation error.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// # Errors
    ///
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.matching.validate()?;
        self.generator.validate()?;
        self.catalog.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(EngineSettings::default().validate().is_ok());
    }

    #[test]
    fn thresholds_scale_and_never_exceed_length() {
        let category = QuizRule::absolute(15, 12);
        assert_eq!(category.threshold_for(15), 12);
        assert_eq!(category.threshold_for(10), 8);
        assert_eq!(category.threshold_for(1), 1);

        let random = QuizRule::percent(20, 70);
        assert_eq!(random.threshold_for(20), 14);
        assert_eq!(random.threshold_for(7), 5);

        let easy = QuizRule::percent(20, 80);
        assert_eq!(easy.threshold_for(6), 5);

        for len in 1..=60 {
            for rule in [
                QuizRule::absolute(50, 42),
                QuizRule::percent(15, 60),
                QuizRule::percent(20, 100),
            ] {
                let t = rule.threshold_for(len);
                assert!(t <= len && t > 0, "len {len} threshold {t}");
            }
        }
    }

    #[test]
    fn partial_json_overrides_defaults() {
        let settings = EngineSettings::from_json_str(
            r#"{
                "matching": { "term_threshold": 0.9 },
                "generator": { "direction": { "mode": "fixed", "direction": "target_to_primary" } },
                "catalog": { "speed": { "questions": 5, "pass": { "absolute": 4 } } }
            }"#,
        )
        .unwrap();

        assert_eq!(settings.matching.term_threshold(), 0.9);
        assert_eq!(
            settings.generator.direction,
            DirectionPolicy::Fixed {
                direction: Direction::TargetToPrimary
            }
        );
        assert_eq!(settings.catalog.speed, QuizRule::absolute(5, 4));
        assert_eq!(settings.catalog.category, QuizRule::absolute(15, 12));
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let err = EngineSettings::from_json_str(r#"{"catalog":{"final_split":{"easy":50,"medium":50,"hard":10}}}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::FinalSplit(110)));

        let err = EngineSettings::from_json_str(r#"{"generator":{"option_count":1}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::OptionCount(1)));

        let err = EngineSettings::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }
}
