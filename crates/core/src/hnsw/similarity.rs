//! Similarity kernels for HNSW search.
//!
//! Two metrics, both returning **higher = more similar**: cosine similarity
//! and a monotone-decreasing transform of euclidean distance. The engine
//! never compares raw distances; everywhere it asks "which is closer", it
//! takes the maximum similarity.
//!
//! Kernels process elements in chunks of 4 so release builds can
//! auto-vectorize them.

use crate::error::IndexError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Similarity metric used for vector comparison.
///
/// Both variants return a value where **higher is better** (more similar).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMetric {
    /// Cosine similarity: `Σ aᵢbᵢ / (‖a‖·‖b‖)`. Range: \[-1, 1\].
    /// Zero-norm inputs score 0.
    #[default]
    Cosine,
    /// Transformed euclidean distance: `1 / (1 + √Σ(aᵢ−bᵢ)²)`. Range: (0, 1\].
    Euclidean,
}

impl SimilarityMetric {
    /// Compute the similarity of two equal-length vectors.
    #[inline]
    pub fn similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            SimilarityMetric::Cosine => cosine_similarity(a, b),
            SimilarityMetric::Euclidean => euclidean_similarity(a, b),
        }
    }
}

impl FromStr for SimilarityMetric {
    type Err = IndexError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "cosine" => Ok(SimilarityMetric::Cosine),
            "euclidean" => Ok(SimilarityMetric::Euclidean),
            other => Err(IndexError::InvalidMetric(other.to_string())),
        }
    }
}

/// Cosine similarity with both norms computed on the fly.
///
/// Returns 0.0 when either vector has zero norm.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "vector dimensions must match");

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    let chunks = a.len() / 4;
    for i in 0..chunks {
        let base = i * 4;
        for j in 0..4 {
            let x = a[base + j];
            let y = b[base + j];
            dot += x * y;
            norm_a += x * x;
            norm_b += y * y;
        }
    }
    for i in (chunks * 4)..a.len() {
        dot += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Euclidean distance folded into a similarity: `1 / (1 + L2(a, b))`.
#[inline]
pub fn euclidean_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "vector dimensions must match");

    let mut sum_sq = 0.0f32;
    let chunks = a.len() / 4;
    for i in 0..chunks {
        let base = i * 4;
        let d0 = a[base] - b[base];
        let d1 = a[base + 1] - b[base + 1];
        let d2 = a[base + 2] - b[base + 2];
        let d3 = a[base + 3] - b[base + 3];
        sum_sq += d0 * d0 + d1 * d1 + d2 * d2 + d3 * d3;
    }
    for i in (chunks * 4)..a.len() {
        let d = a[i] - b[i];
        sum_sq += d * d;
    }

    1.0 / (1.0 + sum_sq.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical_unit_vector() {
        let v = vec![1.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&v, &v), 1.0);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_cosine_opposite() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![-1.0, -2.0, -3.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_norm_scores_zero() {
        let a = vec![0.0, 0.0, 0.0];
        let b = vec![1.0, 2.0, 3.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
        assert_eq!(cosine_similarity(&b, &a), 0.0);
    }

    #[test]
    fn test_cosine_near_neighbor() {
        // cos((1,0,0), (0.9,0.1,0)) = 0.9 / sqrt(0.82) ≈ 0.99388
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.9, 0.1, 0.0];
        let sim = cosine_similarity(&a, &b);
        assert!((sim - 0.99388).abs() < 1e-4, "got {sim}");
    }

    #[test]
    fn test_cosine_long_vector_remainder_lanes() {
        // length 7 exercises both the chunked and the tail loop
        let a = vec![0.5, -0.3, 0.8, 0.1, 0.9, -0.2, 0.6];
        let sim = cosine_similarity(&a, &a);
        assert!((sim - 1.0).abs() < 1e-6, "self similarity should be 1, got {sim}");
    }

    #[test]
    fn test_euclidean_identical_is_one() {
        let v = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(euclidean_similarity(&v, &v), 1.0);
    }

    #[test]
    fn test_euclidean_transform_value() {
        // distance 5 → similarity 1/6
        let a = vec![0.0, 0.0, 0.0];
        let b = vec![3.0, 4.0, 0.0];
        let sim = euclidean_similarity(&a, &b);
        assert!((sim - 1.0 / 6.0).abs() < 1e-6, "got {sim}");
    }

    #[test]
    fn test_euclidean_monotone_in_distance() {
        let origin = vec![0.0, 0.0];
        let near = vec![1.0, 0.0];
        let far = vec![5.0, 0.0];
        assert!(
            euclidean_similarity(&origin, &near) > euclidean_similarity(&origin, &far)
        );
    }

    #[test]
    fn test_metric_dispatch() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert_eq!(SimilarityMetric::Cosine.similarity(&a, &b), 0.0);
        let d = SimilarityMetric::Euclidean.similarity(&a, &b);
        assert!((d - 1.0 / (1.0 + 2.0f32.sqrt())).abs() < 1e-6);
    }

    #[test]
    fn test_parse_metric_names() {
        assert_eq!(
            "cosine".parse::<SimilarityMetric>().unwrap(),
            SimilarityMetric::Cosine
        );
        assert_eq!(
            "euclidean".parse::<SimilarityMetric>().unwrap(),
            SimilarityMetric::Euclidean
        );
    }

    #[test]
    fn test_parse_unknown_metric_rejected() {
        let err = "manhattan".parse::<SimilarityMetric>().unwrap_err();
        assert!(matches!(err, IndexError::InvalidMetric(ref name) if name == "manhattan"));
    }

    #[test]
    fn test_metric_serde_tag() {
        let json = serde_json::to_string(&SimilarityMetric::Euclidean).unwrap();
        assert_eq!(json, "\"euclidean\"");
        let back: SimilarityMetric = serde_json::from_str("\"cosine\"").unwrap();
        assert_eq!(back, SimilarityMetric::Cosine);
    }
}
