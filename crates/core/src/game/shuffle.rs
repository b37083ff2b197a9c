//! Uniform random permutation primitive.

use rand::Rng;

/// Return a shuffled copy of `input`, leaving the input untouched.
///
/// Fisher–Yates: walk from the last index down to 1, swapping each position
/// with a uniformly drawn index at or below it. Every one of the `n!`
/// orderings is equally likely, unlike comparator-based "random sort"
/// shuffles.
pub fn shuffled<T: Clone>(input: &[T], rng: &mut impl Rng) -> Vec<T> {
    let mut items = input.to_vec();
    shuffle_in_place(&mut items, rng);
    items
}

/// Shuffle a slice in place with the same algorithm as [`shuffled`].
pub fn shuffle_in_place<T>(items: &mut [T], rng: &mut impl Rng) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::HashMap;

    #[test]
    fn output_is_a_permutation_of_the_input() {
        let mut rng = StdRng::seed_from_u64(7);
        let input: Vec<u32> = (0..50).collect();

        let output = shuffled(&input, &mut rng);

        assert_eq!(output.len(), input.len());
        let mut sorted = output.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, input);
        // input untouched
        assert_eq!(input, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn empty_and_single_inputs_are_no_ops() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(shuffled::<u32>(&[], &mut rng).is_empty());
        assert_eq!(shuffled(&[9], &mut rng), vec![9]);
    }

    #[test]
    fn deterministic_under_a_fixed_seed() {
        let input: Vec<u32> = (0..10).collect();
        let a = shuffled(&input, &mut StdRng::seed_from_u64(99));
        let b = shuffled(&input, &mut StdRng::seed_from_u64(99));
        assert_eq!(a, b);
    }

    #[test]
    fn all_permutations_of_four_elements_appear_roughly_uniformly() {
        const RUNS: usize = 24_000;
        let input = [0u8, 1, 2, 3];
        let mut rng = StdRng::seed_from_u64(42);
        let mut counts: HashMap<Vec<u8>, usize> = HashMap::new();

        for _ in 0..RUNS {
            *counts.entry(shuffled(&input, &mut rng)).or_default() += 1;
        }

        assert_eq!(counts.len(), 24, "every ordering of 4 elements must occur");
        let expected = RUNS / 24;
        for (permutation, count) in counts {
            // generous tolerance: ±30% of the expected bucket size keeps the
            // test stable while still catching a biased shuffle
            assert!(
                count > expected * 7 / 10 && count < expected * 13 / 10,
                "permutation {permutation:?} occurred {count} times (expected ~{expected})"
            );
        }
    }
}
