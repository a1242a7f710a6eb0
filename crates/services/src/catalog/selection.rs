use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::HashSet;

use quiz_core::model::{PoolEntry, Tier};

use super::context::{QuizContext, TierCounts};
use crate::settings::{AdaptiveRules, TierMix};

/// Pick the adaptive tier mix from the learner's tag distribution.
///
/// Pure rule table: identical counts always give the identical mix.
#[must_use]
pub fn adaptive_mix(counts: TierCounts, rules: &AdaptiveRules) -> TierMix {
    if counts.hard > counts.easy {
        rules.struggling
    } else if counts.easy > 2 * counts.hard {
        rules.confident
    } else {
        rules.balanced
    }
}

/// Split `total` questions into percentage shares; rounding leftovers go to the hard tier.
#[must_use]
pub fn percent_mix(total: usize, split: &TierMix) -> TierMix {
    let easy = total * split.easy / 100;
    let medium = total * split.medium / 100;
    TierMix::new(easy, medium, total.saturating_sub(easy + medium))
}

/// Split `total` into three near-equal parts, earlier tiers taking the remainder.
#[must_use]
pub fn even_mix(total: usize) -> TierMix {
    let base = total / 3;
    let extra = total % 3;
    TierMix::new(
        base + usize::from(extra > 0),
        base + usize::from(extra > 1),
        base,
    )
}

/// Draw `mix` entries per effective tier at random, in easy → medium → hard order.
///
/// A tier short of entries is topped up from whatever the other tiers have left,
/// so the result only falls short of `mix.total()` when the pool itself does.
pub fn select_by_tier<'a, R: Rng + ?Sized>(
    ctx: &QuizContext<'a>,
    mix: &TierMix,
    rng: &mut R,
) -> Vec<&'a PoolEntry> {
    let mut picked = Vec::with_capacity(mix.total());
    let mut leftovers = Vec::new();

    for tier in Tier::ALL {
        let mut entries = ctx.entries_in_tier(tier);
        entries.shuffle(rng);
        let take = mix.get(tier).min(entries.len());
        leftovers.extend(entries.split_off(take));
        picked.extend(entries);
    }

    let shortfall = mix.total().saturating_sub(picked.len());
    if shortfall > 0 {
        leftovers.shuffle(rng);
        picked.extend(leftovers.into_iter().take(shortfall));
    }
    dedupe(picked)
}

/// The first `mix` entries of each effective tier in pool order, easy → medium → hard.
#[must_use]
pub fn first_by_tier<'a>(ctx: &QuizContext<'a>, mix: &TierMix) -> Vec<&'a PoolEntry> {
    let picked = Tier::ALL
        .into_iter()
        .flat_map(|tier| {
            ctx.entries_in_tier(tier)
                .into_iter()
                .take(mix.get(tier))
                .collect::<Vec<_>>()
        })
        .collect();
    dedupe(picked)
}

fn dedupe(entries: Vec<&PoolEntry>) -> Vec<&PoolEntry> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|entry| seen.insert(entry.item.id()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{Category, CategoryKey, ItemId, VocabularyItem, VocabularyPool};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn counts(easy: usize, medium: usize, hard: usize) -> TierCounts {
        TierCounts { easy, medium, hard }
    }

    #[test]
    fn adaptive_rule_table() {
        let rules = AdaptiveRules::default();
        assert_eq!(adaptive_mix(counts(2, 5, 10), &rules), TierMix::new(6, 7, 2));
        assert_eq!(adaptive_mix(counts(10, 5, 2), &rules), TierMix::new(3, 6, 6));
        assert_eq!(adaptive_mix(counts(4, 5, 2), &rules), TierMix::new(5, 5, 5));
        assert_eq!(adaptive_mix(counts(0, 10, 0), &rules), TierMix::new(5, 5, 5));
        assert_eq!(
            adaptive_mix(counts(2, 5, 10), &rules),
            adaptive_mix(counts(2, 5, 10), &rules)
        );
    }

    #[test]
    fn mixes_add_up() {
        assert_eq!(percent_mix(50, &TierMix::new(40, 40, 20)), TierMix::new(20, 20, 10));
        assert_eq!(percent_mix(7, &TierMix::new(40, 40, 20)), TierMix::new(2, 2, 3));
        assert_eq!(even_mix(20), TierMix::new(7, 7, 6));
        assert_eq!(even_mix(15), TierMix::new(5, 5, 5));
        assert_eq!(even_mix(4), TierMix::new(2, 1, 1));
    }

    fn pool(easy: u64, medium: u64, hard: u64) -> VocabularyPool {
        let mut words = Vec::new();
        let mut id = 0;
        for (tier, n) in [(Tier::Easy, easy), (Tier::Medium, medium), (Tier::Hard, hard)] {
            for _ in 0..n {
                id += 1;
                words.push(
                    VocabularyItem::new(ItemId::new(id), format!("w{id}"), format!("p{id}"), "noun", tier)
                        .unwrap(),
                );
            }
        }
        VocabularyPool::from_categories([Category::new(CategoryKey::new("all"), "All", words).unwrap()])
    }

    #[test]
    fn select_by_tier_honours_mix_and_tops_up() {
        let pool = pool(10, 10, 1);
        let ctx = QuizContext::new(&pool);
        let mut rng = StdRng::seed_from_u64(7);

        let picked = select_by_tier(&ctx, &TierMix::new(3, 3, 3), &mut rng);
        assert_eq!(picked.len(), 9);
        let hard = picked
            .iter()
            .filter(|e| e.item.difficulty_tier() == Tier::Hard)
            .count();
        assert_eq!(hard, 1);

        let tiers: Vec<Tier> = picked[..4].iter().map(|e| e.item.difficulty_tier()).collect();
        assert_eq!(tiers, [Tier::Easy, Tier::Easy, Tier::Easy, Tier::Medium]);
    }

    #[test]
    fn select_by_tier_is_bounded_by_the_pool() {
        let pool = pool(2, 1, 0);
        let ctx = QuizContext::new(&pool);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(select_by_tier(&ctx, &TierMix::new(5, 5, 5), &mut rng).len(), 3);
    }

    #[test]
    fn first_by_tier_keeps_pool_order() {
        let pool = pool(4, 4, 4);
        let ctx = QuizContext::new(&pool);
        let ids: Vec<u64> = first_by_tier(&ctx, &TierMix::new(2, 1, 2))
            .iter()
            .map(|e| e.item.id().value())
            .collect();
        assert_eq!(ids, [1, 2, 5, 9, 10]);
    }
}
