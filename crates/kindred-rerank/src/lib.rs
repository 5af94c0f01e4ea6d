//! Stochastic reordering of ranked recommendation lists.
//!
//! A reranker never touches the input list; it returns a permutation of
//! original positions for the caller to apply. Dithering background:
//! <https://buildingrecommenders.wordpress.com/2015/11/11/dithering/>

use kindred_core::{BoundedTopN, Scored};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// Reorders an existing ranked list.
///
/// `rerank_permutation` returns original positions, of length
/// `min(max_length, list length)`; `max_length = 0` means the whole list.
/// The result is a selection without repetition.
pub trait PermutationReranker {
    fn rerank_permutation(&self, ranked: &[Scored], max_length: usize) -> Vec<usize>;
}

/// The identity permutation of length `n`.
pub fn base_permutation(n: usize) -> Vec<usize> {
    (0..n).collect()
}

/// Applies a permutation of original positions to a ranked list.
pub fn apply_permutation(ranked: &[Scored], perm: &[usize]) -> Vec<Scored> {
    perm.iter().map(|&pos| ranked[pos]).collect()
}

/// Re-ranks by adding gaussian noise to a logarithmic decay of the original
/// rank, trading a little relevance for variety between calls.
///
/// With variance 0 the output is the (truncated) identity and fully
/// deterministic. A shared instance is safe under concurrent calls; the
/// internal generator is mutex-guarded, so draw order across threads is
/// serialized but not reproducible unless callers coordinate.
pub struct DitheringReranker {
    noise: Option<Normal<f64>>,
    rng: Mutex<StdRng>,
}

impl DitheringReranker {
    /// # Panics
    ///
    /// Panics if `variance` is negative, NaN or infinite.
    pub fn new(variance: f64) -> Self {
        Self::with_rng(variance, StdRng::from_entropy())
    }

    /// Seeded constructor for reproducible output.
    pub fn with_seed(variance: f64, seed: u64) -> Self {
        Self::with_rng(variance, StdRng::seed_from_u64(seed))
    }

    fn with_rng(variance: f64, rng: StdRng) -> Self {
        assert!(
            variance >= 0.0 && variance.is_finite(),
            "variance must be a non-negative finite number"
        );
        let noise = if variance == 0.0 {
            None
        } else {
            Some(Normal::new(0.0, variance.sqrt()).expect("stdev must be finite"))
        };
        Self {
            noise,
            rng: Mutex::new(rng),
        }
    }
}

impl PermutationReranker for DitheringReranker {
    fn rerank_permutation(&self, ranked: &[Scored], max_length: usize) -> Vec<usize> {
        let m = ranked.len();
        let n = if max_length == 0 { m } else { max_length };

        let Some(noise) = self.noise else {
            return base_permutation(n.min(m));
        };

        // Perturbed score per original rank; keys encode M - i so that on
        // score ties the accumulator retains the originally higher-ranked
        // entry.
        let mut top = BoundedTopN::new(n);
        let mut rng = self.rng.lock();
        for i in 0..m {
            let score = ((i + 1) as f64).ln() + noise.sample(&mut *rng);
            let _ = top.insert((m - i) as u32, score);
        }
        drop(rng);

        top.into_sorted_vec()
            .iter()
            .map(|s| m - s.idx as usize)
            .collect()
    }
}

/// Uniformly random selection-without-repetition over the original
/// positions. The fully noise-dominated end of the dithering spectrum.
pub struct RandomReranker {
    rng: Mutex<StdRng>,
}

impl RandomReranker {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomReranker {
    fn default() -> Self {
        Self::new()
    }
}

impl PermutationReranker for RandomReranker {
    fn rerank_permutation(&self, ranked: &[Scored], max_length: usize) -> Vec<usize> {
        let m = ranked.len();
        let n = if max_length == 0 { m } else { max_length.min(m) };
        let mut rng = self.rng.lock();
        rand::seq::index::sample(&mut *rng, m, n).into_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranked_list(len: usize) -> Vec<Scored> {
        (0..len)
            .map(|i| Scored::new(i as u32, 1.0 / (i + 1) as f64))
            .collect()
    }

    fn assert_valid_permutation(perm: &[usize], m: usize, expected_len: usize) {
        assert_eq!(perm.len(), expected_len);
        let mut seen = vec![false; m];
        for &pos in perm {
            assert!(pos < m, "position {pos} out of range");
            assert!(!seen[pos], "position {pos} repeated");
            seen[pos] = true;
        }
    }

    #[test]
    fn test_zero_variance_is_identity() {
        let reranker = DitheringReranker::new(0.0);
        let list = ranked_list(6);
        assert_eq!(reranker.rerank_permutation(&list, 0), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(reranker.rerank_permutation(&list, 3), vec![0, 1, 2]);
        assert_eq!(reranker.rerank_permutation(&list, 10), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_dithering_emits_valid_permutation() {
        let reranker = DitheringReranker::with_seed(1.5, 99);
        let list = ranked_list(20);
        assert_valid_permutation(&reranker.rerank_permutation(&list, 0), 20, 20);
        assert_valid_permutation(&reranker.rerank_permutation(&list, 7), 20, 7);
        assert_valid_permutation(&reranker.rerank_permutation(&list, 50), 20, 20);
    }

    #[test]
    fn test_dithering_is_reproducible_under_seed() {
        let list = ranked_list(12);
        let a = DitheringReranker::with_seed(2.0, 7).rerank_permutation(&list, 0);
        let b = DitheringReranker::with_seed(2.0, 7).rerank_permutation(&list, 0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_dithering_consumes_generator_state() {
        let reranker = DitheringReranker::with_seed(2.0, 7);
        let list = ranked_list(64);
        let first = reranker.rerank_permutation(&list, 0);
        let second = reranker.rerank_permutation(&list, 0);
        // Same instance, fresh draws: almost surely a different permutation.
        assert_ne!(first, second);
    }

    #[test]
    fn test_empty_list() {
        let reranker = DitheringReranker::with_seed(1.0, 3);
        assert!(reranker.rerank_permutation(&[], 0).is_empty());
        assert!(reranker.rerank_permutation(&[], 5).is_empty());
    }

    #[test]
    #[should_panic(expected = "non-negative")]
    fn test_negative_variance_rejected() {
        let _ = DitheringReranker::new(-1.0);
    }

    #[test]
    fn test_random_reranker_valid_and_reproducible() {
        let list = ranked_list(15);
        let a = RandomReranker::with_seed(11).rerank_permutation(&list, 6);
        assert_valid_permutation(&a, 15, 6);
        let b = RandomReranker::with_seed(11).rerank_permutation(&list, 6);
        assert_eq!(a, b);
    }

    #[test]
    fn test_apply_permutation() {
        let list = ranked_list(4);
        let out = apply_permutation(&list, &[2, 0, 3]);
        let ids: Vec<u32> = out.iter().map(|s| s.idx).collect();
        assert_eq!(ids, vec![2, 0, 3]);
    }
}
