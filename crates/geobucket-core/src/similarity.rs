// crates/geobucket-core/src/similarity.rs

//! Pluggable string similarity for the fuzzy stage of the match cascade.

use std::collections::HashSet;

/// Any scoring function `(a, b) -> [0, 1]`, where `1.0` means identical.
///
/// Closures implement it too:
///
/// ```rust
/// use geobucket_core::similarity::Similarity;
///
/// let exact = |a: &str, b: &str| if a == b { 1.0 } else { 0.0 };
/// assert_eq!(exact.score("ajah", "ajah"), 1.0);
/// ```
pub trait Similarity: Send + Sync {
    fn score(&self, a: &str, b: &str) -> f64;
}

impl<F> Similarity for F
where
    F: Fn(&str, &str) -> f64 + Send + Sync,
{
    fn score(&self, a: &str, b: &str) -> f64 {
        self(a, b)
    }
}

/// Trigram overlap in the style of PostgreSQL's `pg_trgm`.
///
/// Each word is padded with two leading blanks and one trailing blank, the
/// set of 3-character windows is collected, and the score is
/// `|shared| / |union|`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrigramSimilarity;

impl TrigramSimilarity {
    pub fn trigrams(s: &str) -> HashSet<[char; 3]> {
        let mut out = HashSet::new();
        for word in s.split_whitespace() {
            let padded: Vec<char> = "  "
                .chars()
                .chain(word.chars().flat_map(char::to_lowercase))
                .chain(std::iter::once(' '))
                .collect();
            for w in padded.windows(3) {
                out.insert([w[0], w[1], w[2]]);
            }
        }
        out
    }
}

impl Similarity for TrigramSimilarity {
    fn score(&self, a: &str, b: &str) -> f64 {
        let ta = Self::trigrams(a);
        let tb = Self::trigrams(b);
        if ta.is_empty() || tb.is_empty() {
            return 0.0;
        }
        let shared = ta.intersection(&tb).count();
        let union = ta.len() + tb.len() - shared;
        shared as f64 / union as f64
    }
}
