use std::collections::{HashMap, HashSet};

use quiz_core::model::{ItemId, PoolEntry, Tier, VocabularyPool};

/// Item counts per difficulty tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TierCounts {
    pub easy: usize,
    pub medium: usize,
    pub hard: usize,
}

impl TierCounts {
    #[must_use]
    pub fn get(&self, tier: Tier) -> usize {
        match tier {
            Tier::Easy => self.easy,
            Tier::Medium => self.medium,
            Tier::Hard => self.hard,
        }
    }

    pub fn add(&mut self, tier: Tier) {
        match tier {
            Tier::Easy => self.easy += 1,
            Tier::Medium => self.medium += 1,
            Tier::Hard => self.hard += 1,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.easy + self.medium + self.hard
    }
}

/// Learner state for the items of one pool, fetched before generating a quiz.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LearnerSnapshot {
    tiers: HashMap<ItemId, Tier>,
    bookmarks: Vec<ItemId>,
}

impl LearnerSnapshot {
    #[must_use]
    pub fn new(
        tiers: impl IntoIterator<Item = (ItemId, Tier)>,
        bookmarks: impl IntoIterator<Item = ItemId>,
    ) -> Self {
        let mut seen = HashSet::new();
        Self {
            tiers: tiers.into_iter().collect(),
            bookmarks: bookmarks.into_iter().filter(|id| seen.insert(*id)).collect(),
        }
    }

    /// Learner-assigned tier, if the item was tagged.
    #[must_use]
    pub fn tier_of(&self, id: ItemId) -> Option<Tier> {
        self.tiers.get(&id).copied()
    }

    #[must_use]
    pub fn bookmarks(&self) -> &[ItemId] {
        &self.bookmarks
    }

    #[must_use]
    pub fn is_bookmarked(&self, id: ItemId) -> bool {
        self.bookmarks.contains(&id)
    }

    /// How the learner's tags are distributed over the tiers.
    #[must_use]
    pub fn tagged_counts(&self) -> TierCounts {
        let mut counts = TierCounts::default();
        for tier in self.tiers.values() {
            counts.add(*tier);
        }
        counts
    }
}

/// Results-store facts the catalog needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResultsSnapshot {
    pub completed_categories: usize,
}

/// Owned snapshot of all collaborator data, loaded once per quiz request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuizData {
    pub pool: VocabularyPool,
    pub learner: LearnerSnapshot,
    pub results: ResultsSnapshot,
}

impl QuizData {
    #[must_use]
    pub fn context(&self) -> QuizContext<'_> {
        QuizContext::new(&self.pool)
            .with_learner(&self.learner)
            .with_results(&self.results)
    }
}

/// Everything a strategy may look at. Collaborators that were not supplied are `None`.
#[derive(Debug, Clone, Copy)]
pub struct QuizContext<'a> {
    pub pool: &'a VocabularyPool,
    pub learner: Option<&'a LearnerSnapshot>,
    pub results: Option<&'a ResultsSnapshot>,
}

impl<'a> QuizContext<'a> {
    #[must_use]
    pub fn new(pool: &'a VocabularyPool) -> Self {
        Self {
            pool,
            learner: None,
            results: None,
        }
    }

    #[must_use]
    pub fn with_learner(mut self, learner: &'a LearnerSnapshot) -> Self {
        self.learner = Some(learner);
        self
    }

    #[must_use]
    pub fn with_results(mut self, results: &'a ResultsSnapshot) -> Self {
        self.results = Some(results);
        self
    }

    /// The learner's tier when tagged, otherwise the author's.
    #[must_use]
    pub fn effective_tier(&self, entry: &PoolEntry) -> Tier {
        self.learner
            .and_then(|learner| learner.tier_of(entry.item.id()))
            .unwrap_or_else(|| entry.item.difficulty_tier())
    }

    /// Pool entries with the given effective tier, in pool order.
    #[must_use]
    pub fn entries_in_tier(&self, tier: Tier) -> Vec<&'a PoolEntry> {
        let pool = self.pool;
        pool.entries()
            .iter()
            .filter(|entry| self.effective_tier(entry) == tier)
            .collect()
    }

    #[must_use]
    pub fn tier_counts(&self) -> TierCounts {
        let mut counts = TierCounts::default();
        for entry in self.pool.entries() {
            counts.add(self.effective_tier(entry));
        }
        counts
    }
}
