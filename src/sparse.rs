//! Labelled compressed-sparse-row input matrices.
//!
//! A real corpus is overwhelmingly zeros in document-word space, so the
//! entry point takes a sparse document-term matrix with string vocabulary
//! labels attached, rather than a dense one indexed only by position.

use crate::error::{LdaError, Result};

/// A compressed-sparse-row matrix of non-negative token counts.
///
/// Row labels (documents) and column labels (vocabulary) are carried
/// alongside the matrix and passed through to outputs unchanged.
#[derive(Debug, Clone)]
pub struct CsrMatrix {
    /// `row_ptr[d]..row_ptr[d+1]` indexes `col_idx`/`values` for document `d`.
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<u32>,
    n_cols: usize,
    row_labels: Vec<String>,
    col_labels: Option<Vec<String>>,
}

impl CsrMatrix {
    /// Build a CSR matrix from per-document `(word_id, count)` rows.
    ///
    /// `rows[d]` lists the non-zero `(word_id, count)` cells of document
    /// `d`; `word_id` must be `< n_cols`. `col_labels` are the vocabulary
    /// strings for each column, in column order; `MissingVocabulary` is
    /// returned if `None` is given, since the engine's error contract
    /// requires labelled columns.
    pub fn from_rows(
        rows: Vec<Vec<(usize, u32)>>,
        n_cols: usize,
        row_labels: Vec<String>,
        col_labels: Option<Vec<String>>,
    ) -> Result<CsrMatrix> {
        if col_labels.is_none() {
            return Err(LdaError::MissingVocabulary);
        }
        assert_eq!(rows.len(), row_labels.len(), "one label per row required");

        let mut row_ptr = Vec::with_capacity(rows.len() + 1);
        let mut col_idx = Vec::new();
        let mut values = Vec::new();
        row_ptr.push(0);
        for row in &rows {
            for &(w, c) in row {
                assert!(w < n_cols, "word id out of range");
                if c > 0 {
                    col_idx.push(w);
                    values.push(c);
                }
            }
            row_ptr.push(col_idx.len());
        }

        Ok(CsrMatrix {
            row_ptr,
            col_idx,
            values,
            n_cols,
            row_labels,
            col_labels,
        })
    }

    /// Number of documents (rows).
    pub fn n_rows(&self) -> usize {
        self.row_labels.len()
    }

    /// Vocabulary size (columns).
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Total number of token occurrences across the whole matrix.
    pub fn total_tokens(&self) -> u64 {
        self.values.iter().map(|&c| c as u64).sum()
    }

    /// Non-zero `(word_id, count)` cells of document `d`.
    pub fn row(&self, d: usize) -> impl Iterator<Item = (usize, u32)> + '_ {
        let start = self.row_ptr[d];
        let end = self.row_ptr[d + 1];
        self.col_idx[start..end]
            .iter()
            .copied()
            .zip(self.values[start..end].iter().copied())
    }

    /// Vocabulary labels, in column order.
    pub fn col_labels(&self) -> &[String] {
        self.col_labels.as_deref().unwrap_or(&[])
    }

    /// Document labels, in row order.
    pub fn row_labels(&self) -> &[String] {
        &self.row_labels
    }

    /// Length (token count) of each document.
    pub fn doc_lengths(&self) -> Vec<usize> {
        (0..self.n_rows())
            .map(|d| self.row(d).map(|(_, c)| c as usize).sum())
            .collect()
    }

    /// Total occurrence count of each vocabulary term across the corpus.
    pub fn term_frequency(&self) -> Vec<u64> {
        let mut freq = vec![0u64; self.n_cols];
        for (&w, &c) in self.col_idx.iter().zip(self.values.iter()) {
            freq[w] += c as u64;
        }
        freq
    }

    /// Validate that `self`'s column labels exactly match `expected`, in
    /// order, returning `VocabularyMismatch` otherwise.
    pub fn check_vocabulary(&self, expected: &[String]) -> Result<()> {
        let actual = self.col_labels();
        if actual.len() != expected.len() || actual != expected {
            return Err(LdaError::VocabularyMismatch {
                expected: expected.len(),
                actual: actual.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::CsrMatrix;

    fn small() -> CsrMatrix {
        CsrMatrix::from_rows(
            vec![vec![(0, 2), (1, 2)], vec![(2, 2), (3, 2)]],
            4,
            vec!["d0".into(), "d1".into()],
            Some(vec!["a".into(), "b".into(), "c".into(), "d".into()]),
        )
        .unwrap()
    }

    #[test]
    fn test_missing_vocabulary_is_an_error() {
        let err = CsrMatrix::from_rows(vec![vec![]], 1, vec!["d0".into()], None);
        assert!(matches!(err, Err(crate::error::LdaError::MissingVocabulary)));
    }

    #[test]
    fn test_total_tokens() {
        let m = small();
        assert_eq!(m.total_tokens(), 8);
    }

    #[test]
    fn test_doc_lengths() {
        let m = small();
        assert_eq!(m.doc_lengths(), vec![4, 4]);
    }

    #[test]
    fn test_term_frequency() {
        let m = small();
        assert_eq!(m.term_frequency(), vec![2, 2, 2, 2]);
    }

    #[test]
    fn test_vocabulary_mismatch() {
        let m = small();
        assert!(m.check_vocabulary(&["a".into(), "b".into()]).is_err());
        assert!(m
            .check_vocabulary(&["a".into(), "b".into(), "c".into(), "d".into()])
            .is_ok());
    }
}
