use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::{HashSet, VecDeque};
use tracing::{debug, warn};

use quiz_core::matching::normalize_term;
use quiz_core::model::{CategoryKey, Direction, PoolEntry, Question, QuestionKind, VocabularyPool};

use crate::settings::{DirectionPolicy, GeneratorSettings};

/// Which question kinds the generator may produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KindPolicy {
    /// Weighted random by the item's difficulty tier.
    #[default]
    Weighted,
    /// Always this kind, falling back to free text when the item cannot support it.
    Only(QuestionKind),
}

/// Builds questions from vocabulary entries.
///
/// Every public entry point returns at most one question per item; duplicates in the
/// input are skipped. Distractors are always drawn from the whole `pool`.
#[derive(Debug, Clone, Copy)]
pub struct QuestionGenerator<'a> {
    settings: &'a GeneratorSettings,
    kinds: KindPolicy,
}

impl<'a> QuestionGenerator<'a> {
    #[must_use]
    pub fn new(settings: &'a GeneratorSettings) -> Self {
        Self {
            settings,
            kinds: KindPolicy::Weighted,
        }
    }

    #[must_use]
    pub fn with_kinds(mut self, kinds: KindPolicy) -> Self {
        self.kinds = kinds;
        self
    }

    /// Up to `count` shuffled questions from a single category.
    pub fn for_category<R: Rng + ?Sized>(
        &self,
        pool: &VocabularyPool,
        key: &CategoryKey,
        count: usize,
        rng: &mut R,
    ) -> Vec<Question> {
        let entries: Vec<&PoolEntry> = pool.in_category(key).collect();
        self.shuffled(entries, count, pool, rng)
    }

    /// Up to `count` questions drawn from the whole pool after a global shuffle.
    pub fn random<R: Rng + ?Sized>(
        &self,
        pool: &VocabularyPool,
        count: usize,
        rng: &mut R,
    ) -> Vec<Question> {
        self.shuffled(pool.entries().iter().collect(), count, pool, rng)
    }

    /// Shuffle `entries`, then build up to `count` questions.
    pub fn shuffled<R: Rng + ?Sized>(
        &self,
        mut entries: Vec<&PoolEntry>,
        count: usize,
        pool: &VocabularyPool,
        rng: &mut R,
    ) -> Vec<Question> {
        entries.shuffle(rng);
        self.build(entries, count, pool, rng)
    }

    /// One question per entry, in exactly the given order.
    pub fn ordered<R: Rng + ?Sized>(
        &self,
        entries: &[&PoolEntry],
        pool: &VocabularyPool,
        rng: &mut R,
    ) -> Vec<Question> {
        self.build(entries.iter().copied(), usize::MAX, pool, rng)
    }

    /// Up to `count` questions from several categories, drawn round-robin so every
    /// category is represented, then shuffled. Each question keeps its source category;
    /// an item listed in several of the categories is drawn once.
    pub fn mixed<R: Rng + ?Sized>(
        &self,
        pool: &VocabularyPool,
        keys: &[CategoryKey],
        count: usize,
        rng: &mut R,
    ) -> Vec<Question> {
        let mut queues: Vec<VecDeque<&PoolEntry>> = keys
            .iter()
            .map(|key| {
                let mut entries: Vec<&PoolEntry> = pool.in_category(key).collect();
                entries.shuffle(rng);
                entries.into()
            })
            .collect();

        let mut picked = HashSet::new();
        let mut picks = Vec::new();
        while picks.len() < count && queues.iter().any(|q| !q.is_empty()) {
            for queue in &mut queues {
                if picks.len() == count {
                    break;
                }
                while let Some(entry) = queue.pop_front() {
                    if picked.insert(entry.item.id()) {
                        picks.push(entry);
                        break;
                    }
                }
            }
        }

        picks.shuffle(rng);
        self.build(picks, count, pool, rng)
    }

    fn build<'p, R: Rng + ?Sized>(
        &self,
        entries: impl IntoIterator<Item = &'p PoolEntry>,
        limit: usize,
        pool: &VocabularyPool,
        rng: &mut R,
    ) -> Vec<Question> {
        let mut seen = HashSet::new();
        let mut questions = Vec::new();
        for entry in entries {
            if questions.len() >= limit {
                break;
            }
            if !seen.insert(entry.item.id()) {
                continue;
            }
            questions.push(self.question_for(entry, pool, rng));
        }
        questions
    }

    /// Build a single question, falling back to free text when the item cannot
    /// support the chosen kind.
    pub fn question_for<R: Rng + ?Sized>(
        &self,
        entry: &PoolEntry,
        pool: &VocabularyPool,
        rng: &mut R,
    ) -> Question {
        let item = &entry.item;
        let category = Some(entry.category.clone());
        let direction = self.pick_direction(rng);

        match self.pick_kind(entry, rng) {
            QuestionKind::FreeText => Question::free_text(item, direction, category),
            QuestionKind::SentenceTranslation => {
                match Question::sentence_translation(item, direction, category.clone()) {
                    Ok(question) => question,
                    Err(_) => {
                        debug!(item = %item.id(), "no example sentence, using free text");
                        Question::free_text(item, direction, category)
                    }
                }
            }
            QuestionKind::MultipleChoice => {
                let Some(options) = self.options(entry, direction, pool, rng) else {
                    warn!(item = %item.id(), "not enough distractors, using free text");
                    return Question::free_text(item, direction, category);
                };
                match Question::multiple_choice(item, direction, options, category.clone()) {
                    Ok(question) => question,
                    Err(err) => {
                        warn!(item = %item.id(), %err, "invalid options, using free text");
                        Question::free_text(item, direction, category)
                    }
                }
            }
        }
    }

    fn pick_direction<R: Rng + ?Sized>(&self, rng: &mut R) -> Direction {
        match self.settings.direction {
            DirectionPolicy::Fixed { direction } => direction,
            DirectionPolicy::Weighted { primary_to_target } => {
                if rng.random::<f64>() < primary_to_target {
                    Direction::PrimaryToTarget
                } else {
                    Direction::TargetToPrimary
                }
            }
        }
    }

    fn pick_kind<R: Rng + ?Sized>(&self, entry: &PoolEntry, rng: &mut R) -> QuestionKind {
        if let KindPolicy::Only(kind) = self.kinds {
            return kind;
        }
        let weights = self.settings.kind_weights(entry.item.difficulty_tier());
        let total = weights.total();
        if total == 0 {
            return QuestionKind::FreeText;
        }
        let mut roll = rng.random_range(0..total);
        for kind in QuestionKind::ALL {
            let weight = weights.weight(kind);
            if roll < weight {
                return kind;
            }
            roll -= weight;
        }
        QuestionKind::FreeText
    }

    /// Shuffled options (correct answer plus distractors), or `None` if the pool is
    /// too small even with every filter relaxed.
    fn options<R: Rng + ?Sized>(
        &self,
        entry: &PoolEntry,
        direction: Direction,
        pool: &VocabularyPool,
        rng: &mut R,
    ) -> Option<Vec<String>> {
        let needed = self.settings.option_count.saturating_sub(1);
        let item = &entry.item;
        let correct = direction.answer_term(item);
        let correct_norm = normalize_term(correct);

        // Same grammatical type first, then any type, then any length.
        for (same_type, check_len) in [(true, true), (false, true), (false, false)] {
            let mut seen = HashSet::new();
            seen.insert(correct_norm.clone());
            let mut candidates: Vec<String> = pool
                .entries()
                .iter()
                .filter(|e| e.item.id() != item.id())
                .filter(|e| !same_type || e.item.grammatical_type() == item.grammatical_type())
                .map(|e| direction.answer_term(&e.item))
                .filter(|term| {
                    !check_len || term.chars().count() >= self.settings.min_distractor_len
                })
                .filter(|term| seen.insert(normalize_term(term)))
                .map(str::to_owned)
                .collect();

            if candidates.len() < needed {
                continue;
            }
            if !same_type {
                debug!(item = %item.id(), check_len, "relaxed distractor filter");
            }

            candidates.shuffle(rng);
            candidates.truncate(needed);
            candidates.push(correct.to_owned());
            candidates.shuffle(rng);
            return Some(candidates);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::AnswerChecker;
    use quiz_core::model::{Category, ItemId, Tier, VocabularyItem};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn word(id: u64, primary: &str, target: &str, ty: &str, tier: Tier) -> VocabularyItem {
        VocabularyItem::new(ItemId::new(id), primary, target, ty, tier).unwrap()
    }

    fn animals() -> Category {
        let words = vec![
            word(1, "dog", "perro", "noun", Tier::Easy),
            word(2, "cat", "gato", "noun", Tier::Easy),
            word(3, "horse", "caballo", "noun", Tier::Medium),
            word(4, "bird", "pájaro", "noun", Tier::Medium),
            word(5, "cow", "vaca", "noun", Tier::Easy),
            word(6, "butterfly", "mariposa", "noun", Tier::Hard)
                .with_example("The butterfly flies.", "La mariposa vuela.")
                .unwrap(),
            word(7, "to run", "correr", "verb", Tier::Medium),
            word(8, "ox", "buey", "noun", Tier::Hard),
        ];
        Category::new(CategoryKey::new("animals"), "Animals", words).unwrap()
    }

    fn food() -> Category {
        let words = vec![
            word(20, "bread", "pan", "noun", Tier::Easy),
            word(21, "apple", "manzana", "noun", Tier::Easy),
            word(22, "to eat", "comer", "verb", Tier::Easy),
            word(23, "cheese", "queso", "noun", Tier::Medium),
        ];
        Category::new(CategoryKey::new("food"), "Food", words).unwrap()
    }

    fn pool() -> VocabularyPool {
        VocabularyPool::from_categories([animals(), food()])
    }

    #[test]
    fn multiple_choice_has_four_distinct_options() {
        let settings = GeneratorSettings::default();
        let generator =
            QuestionGenerator::new(&settings).with_kinds(KindPolicy::Only(QuestionKind::MultipleChoice));
        let pool = pool();

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            for q in generator.random(&pool, 12, &mut rng) {
                assert_eq!(q.kind(), QuestionKind::MultipleChoice);
                assert_eq!(q.options().len(), 4);
                let hits = q.options().iter().filter(|o| *o == q.correct_answer()).count();
                assert_eq!(hits, 1);
                let unique: HashSet<_> = q.options().iter().collect();
                assert_eq!(unique.len(), 4);
            }
        }
    }

    #[test]
    fn choosing_a_lookalike_distractor_is_wrong() {
        let settings = GeneratorSettings::default();
        let generator =
            QuestionGenerator::new(&settings).with_kinds(KindPolicy::Only(QuestionKind::MultipleChoice));
        let checker = AnswerChecker::default();
        let family = Category::new(
            CategoryKey::new("family"),
            "Family",
            vec![
                word(1, "brother", "hermano", "noun", Tier::Easy),
                word(2, "sister", "hermana", "noun", Tier::Easy),
                word(3, "father", "padre", "noun", Tier::Easy),
                word(4, "mother", "madre", "noun", Tier::Easy),
                word(5, "uncle", "tío", "noun", Tier::Easy),
            ],
        )
        .unwrap();
        let pool = VocabularyPool::from_categories([family]);

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            for q in generator.random(&pool, 5, &mut rng) {
                for option in q.options() {
                    let outcome = checker.check(option, &q);
                    assert_eq!(outcome.is_correct, option == q.correct_answer(), "{option}");
                }
            }
        }
    }

    #[test]
    fn distractors_prefer_same_grammatical_type() {
        let settings = GeneratorSettings::default();
        let generator =
            QuestionGenerator::new(&settings).with_kinds(KindPolicy::Only(QuestionKind::MultipleChoice));
        let pool = pool();
        let nouns: HashSet<&str> = pool
            .entries()
            .iter()
            .filter(|e| e.item.grammatical_type().as_str() == "noun")
            .map(|e| e.item.target_term())
            .collect();
        let dog = pool.find(ItemId::new(1)).unwrap();

        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            let options = generator
                .options(dog, Direction::PrimaryToTarget, &pool, &mut rng)
                .unwrap();
            for option in &options {
                assert!(nouns.contains(option.as_str()), "{option} is not a noun");
                assert!(option.chars().count() >= 3);
            }
        }
    }

    #[test]
    fn distractor_filter_relaxes_then_falls_back_to_free_text() {
        let settings = GeneratorSettings::default();
        let generator =
            QuestionGenerator::new(&settings).with_kinds(KindPolicy::Only(QuestionKind::MultipleChoice));
        let mut rng = StdRng::seed_from_u64(1);

        let verbs = Category::new(
            CategoryKey::new("verbs"),
            "Verbs",
            vec![
                word(1, "to be", "ser", "verb", Tier::Easy),
                word(2, "to go", "ir", "verb", Tier::Easy),
                word(3, "dog", "perro", "noun", Tier::Easy),
                word(4, "house", "casa", "noun", Tier::Easy),
            ],
        )
        .unwrap();
        let small = VocabularyPool::from_categories([verbs]);
        let ser = small.find(ItemId::new(1)).unwrap();
        let q = generator.question_for(ser, &small, &mut rng);
        assert_eq!(q.kind(), QuestionKind::MultipleChoice);
        assert_eq!(q.options().len(), 4);

        let tiny = VocabularyPool::from_categories([Category::new(
            CategoryKey::new("tiny"),
            "Tiny",
            vec![word(1, "dog", "perro", "noun", Tier::Easy), word(2, "cat", "gato", "noun", Tier::Easy)],
        )
        .unwrap()]);
        let q = generator.question_for(&tiny.entries()[0], &tiny, &mut rng);
        assert_eq!(q.kind(), QuestionKind::FreeText);
    }

    #[test]
    fn sentence_translation_falls_back_without_example() {
        let settings = GeneratorSettings::default();
        let generator = QuestionGenerator::new(&settings)
            .with_kinds(KindPolicy::Only(QuestionKind::SentenceTranslation));
        let pool = pool();
        let mut rng = StdRng::seed_from_u64(9);

        let with_example = generator.question_for(pool.find(ItemId::new(6)).unwrap(), &pool, &mut rng);
        assert_eq!(with_example.kind(), QuestionKind::SentenceTranslation);

        let without = generator.question_for(pool.find(ItemId::new(1)).unwrap(), &pool, &mut rng);
        assert_eq!(without.kind(), QuestionKind::FreeText);
    }

    #[test]
    fn ordered_generation_preserves_order() {
        let settings = GeneratorSettings::default();
        let generator = QuestionGenerator::new(&settings);
        let pool = pool();
        let order = [1, 2, 3, 6];
        let entries: Vec<&PoolEntry> = order
            .iter()
            .map(|id| pool.find(ItemId::new(*id)).unwrap())
            .collect();

        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            let ids: Vec<u64> = generator
                .ordered(&entries, &pool, &mut rng)
                .iter()
                .map(|q| q.item_id().value())
                .collect();
            assert_eq!(ids, order);
        }
    }

    #[test]
    fn never_duplicates_items() {
        let settings = GeneratorSettings::default();
        let generator = QuestionGenerator::new(&settings);
        let pool = pool();
        let dog = pool.find(ItemId::new(1)).unwrap();
        let cat = pool.find(ItemId::new(2)).unwrap();
        let mut rng = StdRng::seed_from_u64(4);

        let questions = generator.ordered(&[dog, cat, dog, cat, dog], &pool, &mut rng);
        assert_eq!(questions.len(), 2);

        let all = generator.random(&pool, 100, &mut rng);
        assert_eq!(all.len(), pool.len());
        let ids: HashSet<_> = all.iter().map(Question::item_id).collect();
        assert_eq!(ids.len(), all.len());
    }

    #[test]
    fn single_category_and_mixed_generation_tag_sources() {
        let settings = GeneratorSettings::default();
        let generator = QuestionGenerator::new(&settings);
        let pool = pool();
        let mut rng = StdRng::seed_from_u64(11);
        let food_key = CategoryKey::new("food");
        let animals_key = CategoryKey::new("animals");

        let food_only = generator.for_category(&pool, &food_key, 15, &mut rng);
        assert_eq!(food_only.len(), 4);
        assert!(food_only.iter().all(|q| q.source_category() == Some(&food_key)));

        let mixed = generator.mixed(&pool, &[animals_key.clone(), food_key.clone()], 6, &mut rng);
        assert_eq!(mixed.len(), 6);
        let from_food = mixed.iter().filter(|q| q.source_category() == Some(&food_key)).count();
        let from_animals = mixed
            .iter()
            .filter(|q| q.source_category() == Some(&animals_key))
            .count();
        assert_eq!((from_animals, from_food), (3, 3));
    }

    #[test]
    fn shared_items_count_for_every_category() {
        let settings = GeneratorSettings::default();
        let generator = QuestionGenerator::new(&settings);
        let mut rng = StdRng::seed_from_u64(8);
        let pets = Category::new(
            CategoryKey::new("pets"),
            "Pets",
            vec![
                word(1, "dog", "perro", "noun", Tier::Easy),
                word(2, "cat", "gato", "noun", Tier::Easy),
                word(30, "hamster", "hámster", "noun", Tier::Medium),
            ],
        )
        .unwrap();
        let pool = VocabularyPool::from_categories([animals(), food(), pets]);
        let pets_key = CategoryKey::new("pets");

        let questions = generator.for_category(&pool, &pets_key, 15, &mut rng);
        let mut ids: Vec<u64> = questions.iter().map(|q| q.item_id().value()).collect();
        ids.sort_unstable();
        assert_eq!(ids, [1, 2, 30]);
        assert!(questions.iter().all(|q| q.source_category() == Some(&pets_key)));

        let animals_key = CategoryKey::new("animals");
        let mixed = generator.mixed(&pool, &[animals_key, pets_key], 20, &mut rng);
        assert_eq!(mixed.len(), 9);
        let unique: HashSet<_> = mixed.iter().map(Question::item_id).collect();
        assert_eq!(unique.len(), 9);
    }

    #[test]
    fn direction_policy_is_honored() {
        let pool = pool();
        let mut rng = StdRng::seed_from_u64(5);

        let fixed = GeneratorSettings {
            direction: DirectionPolicy::Fixed {
                direction: Direction::TargetToPrimary,
            },
            ..GeneratorSettings::default()
        };
        let questions = QuestionGenerator::new(&fixed).random(&pool, 12, &mut rng);
        assert!(questions.iter().all(|q| q.direction() == Direction::TargetToPrimary));

        let always_forward = GeneratorSettings {
            direction: DirectionPolicy::Weighted {
                primary_to_target: 1.0,
            },
            ..GeneratorSettings::default()
        };
        let questions = QuestionGenerator::new(&always_forward).random(&pool, 12, &mut rng);
        assert!(questions.iter().all(|q| q.direction() == Direction::PrimaryToTarget));
    }

    #[test]
    fn every_generated_question_accepts_its_own_answer() {
        let settings = GeneratorSettings::default();
        let generator = QuestionGenerator::new(&settings);
        let checker = AnswerChecker::default();
        let pool = pool();

        for seed in 0..25 {
            let mut rng = StdRng::seed_from_u64(seed);
            for q in generator.random(&pool, 12, &mut rng) {
                let outcome = checker.check(q.correct_answer(), &q);
                assert!(outcome.is_correct, "{q:?} rejected its own answer");
            }
        }
    }
}
