//! Brute-force similarity ranking over stored case embeddings.
//!
//! Every query is a full scan of [`VectorStore::scan_embeddings`]: O(N·D)
//! for N records of dimension D. There is no index and no state between
//! calls; the store owns all data.
//!
//! # Ranking
//!
//! 1. Score every candidate with [`cosine_similarity`].
//! 2. Drop the excluded case, non-finite scores, and anything below
//!    `min_score` (if set).
//! 3. Sort by score (desc), then `case_id` (asc), then record id (asc).
//! 4. Truncate to `max_results`.
//!
//! The secondary keys make equal scores come back in a stable order.

use crate::embedding::EmbeddingProvider;
use crate::error::{Error, Result};
use crate::models::SimilarityMatch;
use crate::store::VectorStore;

pub const DEFAULT_MIN_SCORE: f32 = 0.7;
pub const DEFAULT_MAX_RESULTS: usize = 5;
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`, or `0.0` when either vector has a zero
/// norm (including empty vectors). Sums are accumulated in `f64`, so large
/// finite components do not overflow. A NaN or infinite component yields NaN.
///
/// # Errors
///
/// [`Error::DimensionMismatch`] if the lengths differ.
///
/// ```text
///            a · b
/// cos(θ) = ─────────
///          ‖a‖ × ‖b‖
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(Error::DimensionMismatch {
            expected: a.len(),
            got: b.len(),
        });
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    let score = dot / (norm_a.sqrt() * norm_b.sqrt());
    if score.is_nan() {
        return Ok(f32::NAN);
    }
    Ok(score.clamp(-1.0, 1.0) as f32)
}

/// Thresholds for [`find_similar`].
#[derive(Debug, Clone, Copy)]
pub struct SimilarityOptions {
    pub min_score: f32,
    pub max_results: usize,
}

impl Default for SimilarityOptions {
    fn default() -> Self {
        Self {
            min_score: DEFAULT_MIN_SCORE,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

/// Find cases whose embeddings are close to `query_vec`.
///
/// The record owned by `exclude_case_id` is skipped; every returned score is
/// `>= options.min_score`.
pub async fn find_similar<S: VectorStore + ?Sized>(
    store: &S,
    query_vec: &[f32],
    exclude_case_id: Option<&str>,
    options: SimilarityOptions,
) -> Result<Vec<SimilarityMatch>> {
    rank(
        store,
        query_vec,
        exclude_case_id,
        Some(options.min_score),
        options.max_results,
    )
    .await
}

/// Embed free text and rank all stored cases against it.
///
/// No exclusion and no score threshold are applied. An empty store yields an
/// empty list.
pub async fn semantic_search<S: VectorStore + ?Sized>(
    store: &S,
    embedder: &dyn EmbeddingProvider,
    text: &str,
    max_results: usize,
) -> Result<Vec<SimilarityMatch>> {
    let query_vec = embedder.embed(text).await?;
    rank(store, &query_vec, None, None, max_results).await
}

/// Shared scan-and-rank used by [`find_similar`] and [`semantic_search`].
pub async fn rank<S: VectorStore + ?Sized>(
    store: &S,
    query_vec: &[f32],
    exclude_case_id: Option<&str>,
    min_score: Option<f32>,
    max_results: usize,
) -> Result<Vec<SimilarityMatch>> {
    let records = store.scan_embeddings().await?;

    let mut matches = Vec::new();
    for record in records {
        if exclude_case_id == Some(record.case_id.as_str()) {
            continue;
        }
        let score = cosine_similarity(query_vec, &record.vector)?;
        if !score.is_finite() || min_score.is_some_and(|min| score < min) {
            continue;
        }
        matches.push(SimilarityMatch {
            id: record.id,
            case_id: record.case_id,
            score,
            metadata: record.metadata,
        });
    }

    matches.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.case_id.cmp(&b.case_id))
            .then_with(|| a.id.cmp(&b.id))
    });
    matches.truncate(max_results);
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CaseMetadata, EmbeddingRecord, QueryType, RiskLevel};
    use crate::store::memory::InMemoryStore;
    use async_trait::async_trait;
    use chrono::Utc;

    fn record(id: &str, case_id: &str, vector: Vec<f32>) -> EmbeddingRecord {
        EmbeddingRecord {
            id: id.into(),
            case_id: case_id.into(),
            vector,
            metadata: CaseMetadata {
                title: format!("case {}", case_id),
                query: "example.com".into(),
                query_type: QueryType::Domain,
                risk_level: RiskLevel::Low,
                summary: String::new(),
                date: "2024-01-01".into(),
            },
            content_hash: String::new(),
            model: "test".into(),
            created_at: Utc::now(),
        }
    }

    async fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new();
        for r in [
            record("e1", "c1", vec![1.0, 0.0, 0.0]),
            record("e2", "c2", vec![0.9, 0.1, 0.0]),
            record("e3", "c3", vec![0.0, 1.0, 0.0]),
            record("e4", "c4", vec![0.8, 0.0, 0.2]),
            record("e5", "c5", vec![-1.0, 0.0, 0.0]),
        ] {
            store.put_embedding(&r).await.unwrap();
        }
        store
    }

    struct FixedEmbedder(Vec<f32>);

    #[async_trait]
    impl EmbeddingProvider for FixedEmbedder {
        fn model_name(&self) -> &str {
            "fixed"
        }
        fn dims(&self) -> usize {
            self.0.len()
        }
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(self.0.clone())
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FailingEmbedder {
        fn model_name(&self) -> &str {
            "failing"
        }
        fn dims(&self) -> usize {
            3
        }
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(Error::EmbeddingFailure("quota exhausted".into()))
        }
    }

    #[test]
    fn test_cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&v, &v).unwrap();
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal_and_opposite() {
        let sim = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap();
        assert!(sim.abs() < 1e-6);
        let sim = cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]).unwrap();
        assert!((sim + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]).unwrap(), 0.0);
        assert_eq!(cosine_similarity(&[3.0, 4.0], &[0.0, 0.0]).unwrap(), 0.0);
        assert_eq!(cosine_similarity(&[], &[]).unwrap(), 0.0);
    }

    #[test]
    fn test_cosine_large_components_do_not_overflow() {
        let v = vec![3e19f32, 3e19];
        let sim = cosine_similarity(&v, &v).unwrap();
        assert!((sim - 1.0).abs() < 1e-6);
        let sim = cosine_similarity(&[f32::MAX, 0.0], &[f32::MAX, f32::MAX]).unwrap();
        assert!((sim - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_nan_component_is_nan() {
        assert!(cosine_similarity(&[f32::NAN, 1.0], &[1.0, 0.0])
            .unwrap()
            .is_nan());
    }

    #[test]
    fn test_cosine_dimension_mismatch() {
        let err = cosine_similarity(&[1.0, 2.0], &[1.0]).unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: 2,
                got: 1
            }
        ));
    }

    #[tokio::test]
    async fn test_find_similar_excludes_and_thresholds() {
        let store = seeded().await;
        let results = find_similar(
            &store,
            &[1.0, 0.0, 0.0],
            Some("c1"),
            SimilarityOptions::default(),
        )
        .await
        .unwrap();

        assert!(results.iter().all(|m| m.case_id != "c1"));
        assert!(results.iter().all(|m| m.score >= DEFAULT_MIN_SCORE));
        let ids: Vec<&str> = results.iter().map(|m| m.case_id.as_str()).collect();
        assert_eq!(ids, vec!["c2", "c4"]);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn test_find_similar_respects_max_results() {
        let store = seeded().await;
        let results = find_similar(
            &store,
            &[1.0, 0.0, 0.0],
            None,
            SimilarityOptions {
                min_score: -1.0,
                max_results: 2,
            },
        )
        .await
        .unwrap();
        let ids: Vec<&str> = results.iter().map(|m| m.case_id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);
    }

    #[tokio::test]
    async fn test_equal_scores_break_ties_by_case_id() {
        let store = InMemoryStore::new();
        store
            .put_embedding(&record("e9", "zeta", vec![1.0, 1.0]))
            .await
            .unwrap();
        store
            .put_embedding(&record("e8", "alpha", vec![1.0, 1.0]))
            .await
            .unwrap();
        let results = rank(&store, &[1.0, 1.0], None, None, 10).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|m| m.case_id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "zeta"]);
    }

    #[tokio::test]
    async fn test_nan_vectors_never_match() {
        let store = InMemoryStore::new();
        for r in [
            record("e1", "nan", vec![f32::NAN, 1.0]),
            record("e2", "big", vec![3e19, 0.0]),
            record("e3", "far", vec![0.0, 1.0]),
        ] {
            store.put_embedding(&r).await.unwrap();
        }

        let results = find_similar(&store, &[1.0, 0.0], None, SimilarityOptions::default())
            .await
            .unwrap();
        let ids: Vec<&str> = results.iter().map(|m| m.case_id.as_str()).collect();
        assert_eq!(ids, vec!["big"]);
        assert!(results.iter().all(|m| m.score >= DEFAULT_MIN_SCORE));

        let ranked = rank(&store, &[1.0, 0.0], None, None, 10).await.unwrap();
        assert_eq!(ranked.len(), 2);
        assert!(ranked.iter().all(|m| m.score.is_finite()));
    }

    #[tokio::test]
    async fn test_mixed_dimensions_fail_the_scan() {
        let store = seeded().await;
        store
            .put_embedding(&record("bad", "c9", vec![1.0, 0.0]))
            .await
            .unwrap();
        let err = find_similar(&store, &[1.0, 0.0, 0.0], None, SimilarityOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
    }

    #[tokio::test]
    async fn test_semantic_search_no_threshold_no_exclusion() {
        let store = seeded().await;
        let embedder = FixedEmbedder(vec![1.0, 0.0, 0.0]);
        let results = semantic_search(&store, &embedder, "resolver", 10)
            .await
            .unwrap();
        assert_eq!(results.len(), 5);
        assert_eq!(results[0].case_id, "c1");
        assert_eq!(results[4].case_id, "c5");
        assert!(results[4].score < 0.0);
    }

    #[tokio::test]
    async fn test_semantic_search_empty_store() {
        let store = InMemoryStore::new();
        let embedder = FixedEmbedder(vec![0.5, 0.5]);
        let results = semantic_search(&store, &embedder, "anything", 10)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_semantic_search_propagates_embedding_failure() {
        let store = seeded().await;
        let err = semantic_search(&store, &FailingEmbedder, "x", 10)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EmbeddingFailure(_)));
    }
}
