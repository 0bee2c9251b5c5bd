//! The vibe index: enriched book records paired positionally with a fixed
//! dimension embedding matrix.
//!
//! - `record`: `BookRecord`, cover tri-state, raw-catalog coalescing
//! - `builder`: cover enrichment + assembly of a `VibeIndex`
//! - `storage`: checksummed binary artifact with atomic writes

pub mod builder;
pub mod record;
pub mod storage;

use record::BookRecord;

/// Errors constructing an index. These are caller configuration errors and
/// fail fast; nothing partial is ever produced.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("record/embedding count mismatch: {records} records, {embeddings} embeddings")]
    CountMismatch { records: usize, embeddings: usize },

    #[error("embedding dimension mismatch at row {row}: expected {expected}, got {got}")]
    DimensionMismatch {
        row: usize,
        expected: usize,
        got: usize,
    },

    #[error("index has no records")]
    Empty,
}

/// An immutable catalog index. Position is the sole join key: record `i`
/// corresponds to embedding row `i`, and order is preserved through
/// persistence.
pub struct VibeIndex {
    records: Vec<BookRecord>,
    embeddings: Vec<Vec<f32>>,
    dims: usize,
}

impl VibeIndex {
    /// Pair records with their embedding matrix, validating the 1:1
    /// positional invariant and a uniform dimension.
    pub fn new(records: Vec<BookRecord>, embeddings: Vec<Vec<f32>>) -> Result<Self, IndexError> {
        if records.len() != embeddings.len() {
            return Err(IndexError::CountMismatch {
                records: records.len(),
                embeddings: embeddings.len(),
            });
        }
        if records.is_empty() {
            return Err(IndexError::Empty);
        }

        let dims = embeddings[0].len();
        for (row, emb) in embeddings.iter().enumerate() {
            if emb.len() != dims {
                return Err(IndexError::DimensionMismatch {
                    row,
                    expected: dims,
                    got: emb.len(),
                });
            }
        }

        Ok(Self {
            records,
            embeddings,
            dims,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Embedding dimension D shared by every row.
    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn records(&self) -> &[BookRecord] {
        &self.records
    }

    pub fn record(&self, i: usize) -> &BookRecord {
        &self.records[i]
    }

    pub fn embeddings(&self) -> &[Vec<f32>] {
        &self.embeddings
    }
}

#[cfg(test)]
mod tests {
    use super::record::CoverStatus;
    use super::*;

    fn rec(title: &str) -> BookRecord {
        BookRecord {
            title: title.to_string(),
            author: "A".to_string(),
            description: String::new(),
            isbns: vec![],
            cover: CoverStatus::Unresolved,
        }
    }

    #[test]
    fn test_new_validates_counts() {
        let result = VibeIndex::new(vec![rec("a")], vec![vec![1.0], vec![2.0]]);
        assert!(matches!(result, Err(IndexError::CountMismatch { records: 1, embeddings: 2 })));
    }

    #[test]
    fn test_new_validates_uniform_dims() {
        let result = VibeIndex::new(
            vec![rec("a"), rec("b")],
            vec![vec![1.0, 0.0], vec![1.0, 0.0, 0.0]],
        );
        assert!(matches!(
            result,
            Err(IndexError::DimensionMismatch { row: 1, expected: 2, got: 3 })
        ));
    }

    #[test]
    fn test_new_rejects_empty() {
        assert!(matches!(VibeIndex::new(vec![], vec![]), Err(IndexError::Empty)));
    }

    #[test]
    fn test_positional_pairing() {
        let index = VibeIndex::new(
            vec![rec("first"), rec("second")],
            vec![vec![1.0, 0.0], vec![0.0, 1.0]],
        )
        .unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(index.dims(), 2);
        assert_eq!(index.record(1).title, "second");
        assert_eq!(index.embeddings()[1], vec![0.0, 1.0]);
    }
}
