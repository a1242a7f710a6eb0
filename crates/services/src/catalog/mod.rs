//! Quiz type catalog: one strategy per quiz kind, each turning the vocabulary
//! pool (and optionally learner and results data) into a `Quiz`.

mod context;
mod selection;
mod strategy;

pub use context::{LearnerSnapshot, QuizContext, QuizData, ResultsSnapshot, TierCounts};
pub use selection::{adaptive_mix, even_mix, percent_mix};
pub use strategy::{QuizCatalog, QuizType, final_unlock_requirement};

use quiz_core::model::QuizKind;

use crate::error::QuizUnavailable;

/// Whether a quiz kind can be started, and why not.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizAvailability {
    pub kind: QuizKind,
    pub available: bool,
    pub reason: Option<QuizUnavailable>,
}

impl QuizCatalog<'_> {
    /// Availability of every quiz kind.
    ///
    /// Kinds that take parameters are judged against the whole pool: `category`
    /// needs any non-empty category, `mixed_categories` needs enough categories to choose from.
    #[must_use]
    pub fn list_available(&self, ctx: &QuizContext<'_>) -> Vec<QuizAvailability> {
        QuizKind::ALL
            .into_iter()
            .map(|kind| {
                let reason = self.availability(kind, ctx).err();
                QuizAvailability {
                    kind,
                    available: reason.is_none(),
                    reason,
                }
            })
            .collect()
    }

    fn availability(&self, kind: QuizKind, ctx: &QuizContext<'_>) -> Result<(), QuizUnavailable> {
        let pool = ctx.pool;
        let quiz_type = match kind {
            QuizKind::Category => {
                let key = pool
                    .category_keys()
                    .find(|key| pool.in_category(key).next().is_some())
                    .ok_or(QuizUnavailable::EmptyPool)?;
                QuizType::Category { key: key.clone() }
            }
            QuizKind::MixedCategories => QuizType::MixedCategories {
                keys: pool
                    .category_keys()
                    .filter(|key| pool.in_category(key).next().is_some())
                    .cloned()
                    .collect(),
            },
            QuizKind::Random => QuizType::Random,
            QuizKind::Bookmarked => QuizType::Bookmarked,
            QuizKind::Speed => QuizType::Speed,
            QuizKind::Final => QuizType::Final,
            QuizKind::HardOnly => QuizType::HardOnly,
            QuizKind::EasyOnly => QuizType::EasyOnly,
            QuizKind::Progressive => QuizType::Progressive,
            QuizKind::Adaptive => QuizType::Adaptive,
        };
        self.check(&quiz_type, ctx)
    }
}
