//! Exact top-N similarity ranking over the vibe index.
//!
//! An intentional linear scan, O(N*D) per query: catalogs in the low tens
//! of thousands do not justify an approximate index. Rows are partitioned
//! across rayon workers, each keeping a bounded top-N heap, and the
//! per-partition winners are merged with a deterministic tie-break.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use rayon::prelude::*;

use crate::index::record::BookRecord;
use crate::index::VibeIndex;

/// Rows per rayon partition.
const PARTITION_SIZE: usize = 4096;

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("query dimension mismatch: index has {expected}, query has {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("cannot rank with a zero-norm query vector")]
    ZeroNormQuery,

    #[error("top_n must be at least 1")]
    InvalidTopN,
}

/// One ranked result: the record, its original catalog position, and its
/// cosine similarity to the query.
#[derive(Debug, Clone, Copy)]
pub struct Match<'a> {
    pub record: &'a BookRecord,
    pub position: usize,
    pub score: f32,
}

/// Candidate ordering: higher score wins; equal scores prefer the lower
/// catalog position, keeping results reproducible across runs.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    score: f32,
    position: usize,
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.position.cmp(&self.position))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Rank the whole catalog against `query` and return the `top_n` best
/// matches, sorted strictly descending by score. Never mutates the index;
/// `top_n` larger than the catalog returns everything.
pub fn top_matches<'a>(
    index: &'a VibeIndex,
    query: &[f32],
    top_n: usize,
) -> Result<Vec<Match<'a>>, QueryError> {
    if top_n == 0 {
        return Err(QueryError::InvalidTopN);
    }
    if query.len() != index.dims() {
        return Err(QueryError::DimensionMismatch {
            expected: index.dims(),
            got: query.len(),
        });
    }

    let query_norm = l2_norm(query);
    if query_norm < f32::EPSILON {
        return Err(QueryError::ZeroNormQuery);
    }

    // A count beyond the catalog returns everything; clamp before it can
    // drive heap allocations.
    let top_n = top_n.min(index.len());

    let mut merged: Vec<Candidate> = index
        .embeddings()
        .par_chunks(PARTITION_SIZE)
        .enumerate()
        .map(|(chunk_idx, rows)| {
            let base = chunk_idx * PARTITION_SIZE;
            partition_top(rows, base, query, query_norm, top_n)
        })
        .reduce(Vec::new, |mut acc, mut part| {
            acc.append(&mut part);
            acc
        });

    // Merge of at most top_n candidates per partition.
    merged.sort_by(|a, b| b.cmp(a));
    merged.truncate(top_n);

    Ok(merged
        .into_iter()
        .map(|c| Match {
            record: index.record(c.position),
            position: c.position,
            score: c.score,
        })
        .collect())
}

/// Bounded top-N over one partition using a min-heap of size `top_n`.
fn partition_top(
    rows: &[Vec<f32>],
    base: usize,
    query: &[f32],
    query_norm: f32,
    top_n: usize,
) -> Vec<Candidate> {
    let mut heap: BinaryHeap<Reverse<Candidate>> = BinaryHeap::with_capacity(top_n + 1);

    for (offset, row) in rows.iter().enumerate() {
        let candidate = Candidate {
            score: cosine_similarity(query, row, query_norm),
            position: base + offset,
        };

        if heap.len() < top_n {
            heap.push(Reverse(candidate));
        } else if let Some(Reverse(worst)) = heap.peek() {
            if candidate > *worst {
                heap.pop();
                heap.push(Reverse(candidate));
            }
        }
    }

    heap.into_iter().map(|Reverse(c)| c).collect()
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity with a precomputed query norm. A zero-norm catalog
/// row scores 0.0 rather than poisoning the ranking with NaN.
fn cosine_similarity(query: &[f32], target: &[f32], query_norm: f32) -> f32 {
    let target_norm = l2_norm(target);
    if target_norm < f32::EPSILON {
        return 0.0;
    }

    let dot: f32 = query.iter().zip(target).map(|(a, b)| a * b).sum();
    dot / (query_norm * target_norm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::record::CoverStatus;

    fn rec(title: &str) -> BookRecord {
        BookRecord {
            title: title.to_string(),
            author: "A".to_string(),
            description: String::new(),
            isbns: vec![],
            cover: CoverStatus::Unresolved,
        }
    }

    fn index_from(embeddings: Vec<Vec<f32>>) -> VibeIndex {
        let records = (0..embeddings.len()).map(|i| rec(&format!("book-{i}"))).collect();
        VibeIndex::new(records, embeddings).unwrap()
    }

    #[test]
    fn test_orthogonal_scenario() {
        // Records 0..2 with embeddings [1,0], [0,1], [0.7,0.7]; query [1,0]
        // must rank record 0 (1.0), then record 2 (~0.7071), excluding 1.
        let index = index_from(vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.7, 0.7]]);

        let results = top_matches(&index, &[1.0, 0.0], 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].position, 0);
        assert!((results[0].score - 1.0).abs() < 1e-6);
        assert_eq!(results[1].position, 2);
        assert!((results[1].score - 0.7071).abs() < 1e-3);
    }

    #[test]
    fn test_self_similarity_ranks_first_with_unit_score() {
        let index = index_from(vec![
            vec![0.3, 0.4, 0.5],
            vec![-0.2, 0.9, 0.1],
            vec![0.5, -0.5, 0.7],
        ]);

        for i in 0..index.len() {
            let own = index.embeddings()[i].clone();
            let results = top_matches(&index, &own, 1).unwrap();
            assert_eq!(results[0].position, i);
            assert!((results[0].score - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_returns_min_of_top_n_and_len() {
        let index = index_from(vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        let results = top_matches(&index, &[1.0, 0.0], 10).unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_huge_top_n_returns_whole_catalog() {
        // Counts far past the catalog size must not abort on allocation.
        let index = index_from(vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        let results = top_matches(&index, &[1.0, 0.0], usize::MAX).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].position, 0);
        assert_eq!(results[1].position, 1);
    }

    #[test]
    fn test_scores_sorted_descending() {
        let index = index_from(vec![
            vec![0.1, 1.0],
            vec![1.0, 0.0],
            vec![0.8, 0.2],
            vec![0.5, 0.5],
        ]);
        let results = top_matches(&index, &[1.0, 0.0], 4).unwrap();
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        assert_eq!(results[0].position, 1);
    }

    #[test]
    fn test_ties_broken_by_lower_position() {
        // Rows 1 and 3 are scalar multiples, identical cosine to the query.
        let index = index_from(vec![
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![2.0, 0.0],
        ]);
        let results = top_matches(&index, &[1.0, 0.0], 2).unwrap();
        assert_eq!(results[0].position, 1);
        assert_eq!(results[1].position, 3);

        let results = top_matches(&index, &[0.0, 1.0], 2).unwrap();
        assert_eq!(results[0].position, 0);
        assert_eq!(results[1].position, 2);
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let index = index_from(vec![vec![1.0, 0.0]]);
        let result = top_matches(&index, &[1.0, 0.0, 0.0], 1);
        assert!(matches!(
            result,
            Err(QueryError::DimensionMismatch { expected: 2, got: 3 })
        ));
    }

    #[test]
    fn test_zero_top_n_rejected() {
        let index = index_from(vec![vec![1.0, 0.0]]);
        assert!(matches!(top_matches(&index, &[1.0, 0.0], 0), Err(QueryError::InvalidTopN)));
    }

    #[test]
    fn test_zero_norm_query_rejected() {
        let index = index_from(vec![vec![1.0, 0.0]]);
        assert!(matches!(
            top_matches(&index, &[0.0, 0.0], 1),
            Err(QueryError::ZeroNormQuery)
        ));
    }

    #[test]
    fn test_zero_norm_row_scores_zero() {
        let index = index_from(vec![vec![0.0, 0.0], vec![1.0, 0.0]]);
        let results = top_matches(&index, &[1.0, 0.0], 2).unwrap();
        assert_eq!(results[0].position, 1);
        assert_eq!(results[1].position, 0);
        assert_eq!(results[1].score, 0.0);
    }

    #[test]
    fn test_deterministic_across_runs() {
        let n = 10_000;
        let embeddings: Vec<Vec<f32>> = (0..n)
            .map(|i| {
                let x = (i % 97) as f32 / 97.0;
                vec![x, 1.0 - x]
            })
            .collect();
        let index = index_from(embeddings);

        let first = top_matches(&index, &[0.6, 0.4], 25).unwrap();
        let second = top_matches(&index, &[0.6, 0.4], 25).unwrap();

        let a: Vec<(usize, f32)> = first.iter().map(|m| (m.position, m.score)).collect();
        let b: Vec<(usize, f32)> = second.iter().map(|m| (m.position, m.score)).collect();
        assert_eq!(a, b);
    }
}
