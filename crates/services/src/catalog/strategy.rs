use rand::Rng;
use std::collections::BTreeSet;
use tracing::debug;

use quiz_core::model::{CategoryKey, ItemId, PoolEntry, QuestionKind, Quiz, QuizKind, Tier};

use super::context::QuizContext;
use super::selection::{adaptive_mix, even_mix, first_by_tier, percent_mix, select_by_tier};
use crate::error::QuizUnavailable;
use crate::generator::{KindPolicy, QuestionGenerator};
use crate::settings::{CatalogSettings, GeneratorSettings};

//
// ─── QUIZ TYPES ────────────────────────────────────────────────────────────────
//

/// A quiz request: the strategy plus its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizType {
    Category { key: CategoryKey },
    Random,
    Bookmarked,
    Speed,
    MixedCategories { keys: Vec<CategoryKey> },
    Final,
    HardOnly,
    EasyOnly,
    Progressive,
    Adaptive,
}

impl QuizType {
    #[must_use]
    pub fn category(key: impl Into<CategoryKey>) -> Self {
        Self::Category { key: key.into() }
    }

    #[must_use]
    pub fn mixed<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<CategoryKey>,
    {
        Self::MixedCategories {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> QuizKind {
        match self {
            QuizType::Category { .. } => QuizKind::Category,
            QuizType::Random => QuizKind::Random,
            QuizType::Bookmarked => QuizKind::Bookmarked,
            QuizType::Speed => QuizKind::Speed,
            QuizType::MixedCategories { .. } => QuizKind::MixedCategories,
            QuizType::Final => QuizKind::Final,
            QuizType::HardOnly => QuizKind::HardOnly,
            QuizType::EasyOnly => QuizKind::EasyOnly,
            QuizType::Progressive => QuizKind::Progressive,
            QuizType::Adaptive => QuizKind::Adaptive,
        }
    }

    /// Stable key used for best-result lookups, e.g. `category:animals` or
    /// `mixed:animals+food`. Mixed keys are sorted so the selection order does not matter.
    #[must_use]
    pub fn quiz_key(&self) -> String {
        match self {
            QuizType::Category { key } => format!("category:{key}"),
            QuizType::MixedCategories { keys } => {
                let keys: BTreeSet<&str> = keys.iter().map(CategoryKey::as_str).collect();
                format!("mixed:{}", keys.into_iter().collect::<Vec<_>>().join("+"))
            }
            other => other.kind().as_str().to_owned(),
        }
    }
}

//
// ─── CATALOG ───────────────────────────────────────────────────────────────────
//

/// Turns a `QuizType` into a ready-to-run `Quiz`, or explains why it cannot.
#[derive(Debug, Clone, Copy)]
pub struct QuizCatalog<'a> {
    settings: &'a CatalogSettings,
    generator: &'a GeneratorSettings,
}

impl<'a> QuizCatalog<'a> {
    #[must_use]
    pub fn new(settings: &'a CatalogSettings, generator: &'a GeneratorSettings) -> Self {
        Self {
            settings,
            generator,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &CatalogSettings {
        self.settings
    }

    /// Check a strategy's preconditions without generating anything.
    ///
    /// # Errors
    ///
    /// Returns the first unmet precondition.
    pub fn check(&self, quiz_type: &QuizType, ctx: &QuizContext<'_>) -> Result<(), QuizUnavailable> {
        let s = self.settings;
        let pool = ctx.pool;
        if pool.is_empty() {
            return Err(QuizUnavailable::EmptyPool);
        }

        match quiz_type {
            QuizType::Category { key } => check_category(ctx, key),
            QuizType::Random => Ok(()),
            QuizType::Bookmarked => {
                let learner = ctx.learner.ok_or(QuizUnavailable::NoLearnerProfile)?;
                let have = bookmarked_entries(ctx, learner.bookmarks()).len();
                at_least(have, s.min_bookmarks, |have, need| {
                    QuizUnavailable::NotEnoughBookmarks { have, need }
                })
            }
            QuizType::Speed => at_least(pool.len(), s.speed_min_pool, |have, need| {
                QuizUnavailable::PoolTooSmall { have, need }
            }),
            QuizType::MixedCategories { keys } => {
                let distinct: BTreeSet<&CategoryKey> = keys.iter().collect();
                for key in &distinct {
                    check_category(ctx, key)?;
                }
                at_least(distinct.len(), s.min_mixed_categories, |have, need| {
                    QuizUnavailable::NotEnoughCategories { have, need }
                })
            }
            QuizType::Final => {
                let results = ctx.results.ok_or(QuizUnavailable::NoResultsHistory)?;
                let total = pool.category_count();
                let required = final_unlock_requirement(total, s.final_unlock_ratio);
                if results.completed_categories < required {
                    return Err(QuizUnavailable::FinalLocked {
                        completed: results.completed_categories,
                        total,
                        required,
                    });
                }
                Ok(())
            }
            QuizType::HardOnly => check_tier(ctx, Tier::Hard, s.min_single_tier_items),
            QuizType::EasyOnly => check_tier(ctx, Tier::Easy, s.min_single_tier_items),
            QuizType::Progressive => Tier::ALL
                .into_iter()
                .try_for_each(|tier| check_tier(ctx, tier, s.progressive_min_per_tier)),
            QuizType::Adaptive => {
                let learner = ctx.learner.ok_or(QuizUnavailable::NoLearnerProfile)?;
                at_least(
                    learner.tagged_counts().total(),
                    s.adaptive_rules.min_tagged,
                    |have, need| QuizUnavailable::NotEnoughTagged { have, need },
                )
            }
        }
    }

    /// Build a quiz for `quiz_type`.
    ///
    /// # Errors
    ///
    /// Returns `QuizUnavailable` when a precondition fails or nothing could be generated.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        quiz_type: &QuizType,
        ctx: &QuizContext<'_>,
        rng: &mut R,
    ) -> Result<Quiz, QuizUnavailable> {
        self.check(quiz_type, ctx)?;

        let s = self.settings;
        let pool = ctx.pool;
        let kind = quiz_type.kind();
        let rule = s.rule(kind);
        let generator = QuestionGenerator::new(self.generator);

        let questions = match quiz_type {
            QuizType::Category { key } => generator.for_category(pool, key, rule.questions, rng),
            QuizType::Random => generator.random(pool, rule.questions, rng),
            QuizType::Bookmarked => {
                let bookmarks = ctx.learner.map(|l| l.bookmarks()).unwrap_or_default();
                let entries = bookmarked_entries(ctx, bookmarks);
                generator.shuffled(entries, rule.questions, pool, rng)
            }
            QuizType::Speed => generator
                .with_kinds(KindPolicy::Only(QuestionKind::MultipleChoice))
                .random(pool, rule.questions, rng),
            QuizType::MixedCategories { keys } => {
                let distinct: Vec<CategoryKey> = keys
                    .iter()
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .cloned()
                    .collect();
                generator.mixed(pool, &distinct, rule.questions, rng)
            }
            QuizType::Final => {
                let mix = percent_mix(rule.questions, &s.final_split);
                let entries = select_by_tier(ctx, &mix, rng);
                generator.shuffled(entries, rule.questions, pool, rng)
            }
            QuizType::HardOnly => {
                generator.shuffled(ctx.entries_in_tier(Tier::Hard), rule.questions, pool, rng)
            }
            QuizType::EasyOnly => {
                generator.shuffled(ctx.entries_in_tier(Tier::Easy), rule.questions, pool, rng)
            }
            QuizType::Progressive => {
                let entries = first_by_tier(ctx, &even_mix(rule.questions));
                generator.ordered(&entries, pool, rng)
            }
            QuizType::Adaptive => {
                let counts = ctx
                    .learner
                    .map(|l| l.tagged_counts())
                    .unwrap_or_default();
                let mix = adaptive_mix(counts, &s.adaptive_rules);
                debug!(?counts, ?mix, "adaptive tier mix");
                let mut entries = select_by_tier(ctx, &mix, rng);
                entries.truncate(rule.questions);
                generator.ordered(&entries, pool, rng)
            }
        };

        let threshold = rule.threshold_for(questions.len());
        let quiz = Quiz::new(kind, quiz_type.quiz_key(), questions, threshold)?;
        match quiz_type {
            QuizType::Speed => Ok(quiz.with_time_limit_seconds(s.speed_seconds_per_question)?),
            _ => Ok(quiz),
        }
    }
}

/// Number of completed categories needed to unlock the final quiz.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn final_unlock_requirement(total_categories: usize, ratio: f64) -> usize {
    (total_categories as f64 * ratio).ceil() as usize
}

fn at_least(
    have: usize,
    need: usize,
    err: impl FnOnce(usize, usize) -> QuizUnavailable,
) -> Result<(), QuizUnavailable> {
    if have < need { Err(err(have, need)) } else { Ok(()) }
}

fn check_category(ctx: &QuizContext<'_>, key: &CategoryKey) -> Result<(), QuizUnavailable> {
    if !ctx.pool.has_category(key) {
        return Err(QuizUnavailable::UnknownCategory { key: key.clone() });
    }
    if ctx.pool.in_category(key).next().is_none() {
        return Err(QuizUnavailable::EmptyCategory { key: key.clone() });
    }
    Ok(())
}

fn check_tier(ctx: &QuizContext<'_>, tier: Tier, need: usize) -> Result<(), QuizUnavailable> {
    at_least(ctx.tier_counts().get(tier), need, |have, need| {
        QuizUnavailable::NotEnoughTierItems { tier, have, need }
    })
}

/// Bookmarked items that exist in the pool, in bookmark order.
fn bookmarked_entries<'a>(
    ctx: &QuizContext<'a>,
    bookmarks: &[ItemId],
) -> Vec<&'a PoolEntry> {
    let pool = ctx.pool;
    bookmarks.iter().filter_map(|id| pool.find(*id)).collect()
}
