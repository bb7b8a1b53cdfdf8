use std::collections::HashSet;

use flash_core::model::{Flashcard, normalize_answer};
use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};

/// Options shown for a fully populated question: the answer plus three distractors.
///
/// Pools with fewer than this many distinct headwords get fewer options.
pub const FULL_OPTION_COUNT: usize = 4;

const DISTRACTOR_COUNT: usize = FULL_OPTION_COUNT - 1;

/// Build the multiple-choice options for `cards[index]`.
///
/// Distractors are drawn uniformly, without replacement, from the headwords of
/// every other card in the session (answered or not). Headwords that collide
/// with the answer or with each other, ignoring case, are dropped first. The
/// combined list is shuffled so the answer's slot is uniform.
///
/// Returns an empty list if `index` is out of range.
pub fn generate_options<R: Rng + ?Sized>(
    cards: &[Flashcard],
    index: usize,
    rng: &mut R,
) -> Vec<String> {
    let Some(current) = cards.get(index) else {
        return Vec::new();
    };
    let answer = current.word.trim();

    let mut seen = HashSet::from([normalize_answer(answer)]);
    let candidates: Vec<&str> = cards
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != index)
        .map(|(_, card)| card.word.trim())
        .filter(|word| !word.is_empty() && seen.insert(normalize_answer(word)))
        .collect();

    let mut options = Vec::with_capacity(FULL_OPTION_COUNT);
    options.push(answer.to_owned());
    options.extend(
        candidates
            .choose_multiple(rng, DISTRACTOR_COUNT)
            .map(|word| (*word).to_owned()),
    );
    options.shuffle(rng);
    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use flash_core::model::{CategoryId, FlashcardDraft, FlashcardId};
    use flash_core::time::fixed_now;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn cards(words: &[&str]) -> Vec<Flashcard> {
        words
            .iter()
            .enumerate()
            .map(|(i, word)| {
                FlashcardDraft::new(CategoryId::new("c1"), *word, "x")
                    .validate()
                    .unwrap()
                    .assign_id(FlashcardId::new(format!("f{i}")), fixed_now())
            })
            .collect()
    }

    #[test]
    fn full_pool_yields_four_distinct_options() {
        let pool = cards(&["happy", "sad", "angry", "calm", "tired", "proud"]);
        let mut rng = StdRng::seed_from_u64(7);
        for index in 0..pool.len() {
            let options = generate_options(&pool, index, &mut rng);
            assert_eq!(options.len(), FULL_OPTION_COUNT);
            let unique: HashSet<_> = options.iter().collect();
            assert_eq!(unique.len(), FULL_OPTION_COUNT);
            let hits = options.iter().filter(|o| *o == &pool[index].word).count();
            assert_eq!(hits, 1);
        }
    }

    #[test]
    fn small_pool_degrades_without_panicking() {
        let mut rng = StdRng::seed_from_u64(1);
        let single = cards(&["happy"]);
        assert_eq!(generate_options(&single, 0, &mut rng), vec!["happy".to_owned()]);

        let pair = cards(&["happy", "sad"]);
        let mut options = generate_options(&pair, 1, &mut rng);
        options.sort();
        assert_eq!(options, vec!["happy".to_owned(), "sad".to_owned()]);
    }

    #[test]
    fn duplicate_headwords_are_not_offered_twice() {
        let pool = cards(&["Happy", "happy ", "sad", "SAD", "calm"]);
        let mut rng = StdRng::seed_from_u64(3);
        let options = generate_options(&pool, 0, &mut rng);
        let normalized: HashSet<_> = options.iter().map(|o| normalize_answer(o)).collect();
        assert_eq!(normalized.len(), options.len());
        assert_eq!(options.len(), 3);
    }

    #[test]
    fn out_of_range_index_yields_nothing() {
        let pool = cards(&["happy"]);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(generate_options(&pool, 5, &mut rng).is_empty());
    }

    #[test]
    fn answer_slot_is_not_fixed() {
        let pool = cards(&["happy", "sad", "angry", "calm"]);
        let mut rng = StdRng::seed_from_u64(42);
        let mut slots = HashSet::new();
        for _ in 0..200 {
            let options = generate_options(&pool, 0, &mut rng);
            let slot = options.iter().position(|o| o == "happy").unwrap();
            slots.insert(slot);
        }
        assert_eq!(slots.len(), FULL_OPTION_COUNT);
    }
}
