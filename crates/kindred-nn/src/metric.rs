//! Example set-overlap metrics matching the `sim(intersection, |A|, |B|)`
//! signature. Any function with this shape plugs into [`SetSimilarity`].
//!
//! Degenerate inputs (two empty profiles) produce NaN; filtering such values
//! is the consumer's concern, never this crate's.
//!
//! [`SetSimilarity`]: crate::SetSimilarity

/// Jaccard coefficient: `|A ∩ B| / |A ∪ B|`.
pub fn jaccard(intersection: usize, na: usize, nb: usize) -> f64 {
    intersection as f64 / (na + nb - intersection) as f64
}

/// Set cosine: `|A ∩ B| / sqrt(|A| * |B|)`.
pub fn set_cosine(intersection: usize, na: usize, nb: usize) -> f64 {
    intersection as f64 / ((na as f64) * (nb as f64)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jaccard() {
        // intersection 1, sizes 2 and 2: 1 / (2 + 2 - 1)
        assert!((jaccard(1, 2, 2) - 1.0 / 3.0).abs() < 1e-12);
        assert!((jaccard(3, 3, 3) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_set_cosine() {
        // intersection 2, sizes 4 and 1: 2 / sqrt(4)
        assert!((set_cosine(2, 4, 1) - 1.0).abs() < 1e-12);
        assert!((set_cosine(1, 2, 2) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_profiles_pass_nan_through() {
        assert!(jaccard(0, 0, 0).is_nan());
        assert!(set_cosine(0, 0, 0).is_nan());
    }
}
