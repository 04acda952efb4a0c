//! Cosine similarity between query tracks and the reference corpus.
//!
//! ```text
//! sim(q, c) = (q · c) / (‖q‖ ‖c‖)
//! ```
//!
//! A zero-length vector has similarity 0.0 to everything. No normalization
//! beyond cosine is applied, so tempo and loudness dominate the raw
//! magnitudes exactly as they would in any plain cosine comparison.

use crate::features::{FeatureMatrix, FeatureVector};
use rayon::prelude::*;

/// Norms at or below this are treated as zero vectors
const NORM_EPSILON: f64 = 1e-12;

/// Cosine similarity of two feature vectors, in [-1, 1]
#[must_use]
pub fn cosine_similarity(a: &FeatureVector, b: &FeatureVector) -> f64 {
    cosine_with_norms(a, a.norm(), b, b.norm())
}

#[inline]
fn cosine_with_norms(a: &FeatureVector, a_norm: f64, b: &FeatureVector, b_norm: f64) -> f64 {
    if a_norm <= NORM_EPSILON || b_norm <= NORM_EPSILON {
        return 0.0;
    }
    // Rounding can push identical vectors just past 1.0
    (a.dot(b) / (a_norm * b_norm)).clamp(-1.0, 1.0)
}

/// M×N similarity scores: one row per query vector, one column per corpus row
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    rows: Vec<Vec<f64>>,
}

impl SimilarityMatrix {
    #[must_use]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Scores of one query row against the whole corpus
    #[must_use]
    pub fn row(&self, index: usize) -> Option<&[f64]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// Number of query rows
    #[must_use]
    pub fn query_len(&self) -> usize {
        self.rows.len()
    }

    /// Number of corpus columns
    #[must_use]
    pub fn corpus_len(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// Take ownership of one row, dropping the rest
    #[must_use]
    pub fn into_row(mut self, index: usize) -> Option<Vec<f64>> {
        (index < self.rows.len()).then(|| self.rows.swap_remove(index))
    }
}

/// Score every query row against every corpus row.
///
/// Corpus norms are computed once per call; each query row is scored in
/// parallel over the corpus with rayon.
#[must_use]
pub fn similarity_matrix(query: &FeatureMatrix, corpus: &FeatureMatrix) -> SimilarityMatrix {
    let corpus_norms: Vec<f64> = corpus.rows().par_iter().map(FeatureVector::norm).collect();

    let rows = query
        .rows()
        .iter()
        .map(|q| {
            let q_norm = q.norm();
            corpus
                .rows()
                .par_iter()
                .zip(corpus_norms.par_iter())
                .map(|(c, &c_norm)| cosine_with_norms(q, q_norm, c, c_norm))
                .collect::<Vec<f64>>()
        })
        .collect();

    SimilarityMatrix { rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FEATURE_COUNT;

    fn unit(axis: usize, scale: f64) -> FeatureVector {
        let mut v = [0.0; FEATURE_COUNT];
        v[axis] = scale;
        FeatureVector(v)
    }

    #[test]
    fn test_identical_vectors_score_one() {
        let v = FeatureVector([0.3, 0.1, 0.9, 0.0, 0.2, 0.5, 118.0, -6.2, 1.0, 4.0]);
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_orthogonal_and_opposite() {
        assert_eq!(cosine_similarity(&unit(0, 1.0), &unit(1, 1.0)), 0.0);
        assert_eq!(cosine_similarity(&unit(0, 1.0), &unit(0, -3.0)), -1.0);
    }

    #[test]
    fn test_scale_invariance() {
        let a = FeatureVector([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]);
        let mut doubled = *a.as_array();
        doubled.iter_mut().for_each(|x| *x *= 2.0);
        assert!((cosine_similarity(&a, &FeatureVector(doubled)) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_vector_scores_zero() {
        let zero = FeatureVector([0.0; FEATURE_COUNT]);
        assert_eq!(cosine_similarity(&zero, &unit(3, 1.0)), 0.0);
        assert_eq!(cosine_similarity(&zero, &zero), 0.0);
    }

    #[test]
    fn test_matrix_shape_and_entries() {
        let query = FeatureMatrix::new(vec![unit(0, 1.0), unit(1, 1.0)]);
        let corpus = FeatureMatrix::new(vec![unit(0, 2.0), unit(1, 5.0), unit(2, 1.0)]);

        let sims = similarity_matrix(&query, &corpus);
        assert_eq!(sims.query_len(), 2);
        assert_eq!(sims.corpus_len(), 3);
        assert_eq!(sims.row(0).unwrap(), &[1.0, 0.0, 0.0]);
        assert_eq!(sims.row(1).unwrap(), &[0.0, 1.0, 0.0]);
        assert_eq!(sims.into_row(1).unwrap(), vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_empty_corpus_gives_empty_rows() {
        let query = FeatureMatrix::new(vec![unit(0, 1.0)]);
        let sims = similarity_matrix(&query, &FeatureMatrix::default());
        assert_eq!(sims.query_len(), 1);
        assert_eq!(sims.corpus_len(), 0);
    }
}
