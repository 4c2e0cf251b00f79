//! The corpus token store.
//!
//! Expands a sparse document-term matrix into one flat array of token
//! records, plus two index structures (by-document and by-word) over it,
//! so a topic update made while iterating one view is immediately visible
//! through the other.

use crate::rand_utils::seeded_rng;
use crate::sparse::CsrMatrix;
use rand::Rng;

/// One token occurrence: a word in a document, with its two topic
/// assignments.
#[derive(Debug, Clone, Copy)]
pub struct TokenRecord {
    /// Word id, `w in [0, V)`.
    pub w: u32,
    /// Document id, `d in [0, D)`.
    pub d: u32,
    /// The topic this token is still counted under in `n_wk`/`n_k`. A
    /// word sweep reconciles this to `z_new` as it folds each token into
    /// the word-side tables; an inference-mode word sweep and the doc
    /// sweep never touch it.
    pub z_old: u32,
    /// The token's canonical, most recently decided topic. Can run ahead
    /// of `z_old` when a doc sweep moved the token but the word-side
    /// tables haven't yet been caught up to that move.
    pub z_new: u32,
}

/// The corpus token store.
///
/// `tokens` is laid out in document order, so the by-document view is
/// just a contiguous slice per document (`doc_offsets`). The by-word view
/// is a permutation of token indices sorted by word id (`by_word` /
/// `word_offsets`); both views index the same `tokens` vector, so a write
/// through `advance`/`commit` is visible from either iteration order.
#[derive(Debug, Clone)]
pub struct TokenStore {
    tokens: Vec<TokenRecord>,
    doc_offsets: Vec<usize>,
    by_word: Vec<usize>,
    word_offsets: Vec<usize>,
    n_docs: usize,
    n_words: usize,
    n_topics: usize,
}

impl TokenStore {
    /// Expand `dtm` into token records, seeding `z_old` and `z_new` to the
    /// same draw from `[0, n_topics)` so the initial assignment is what the
    /// count tables built from it (see `CountTables::init_from_store`)
    /// actually reflect.
    pub fn build(dtm: &CsrMatrix, n_topics: usize, seed: u64) -> TokenStore {
        let n_docs = dtm.n_rows();
        let n_words = dtm.n_cols();

        let mut tokens = Vec::with_capacity(dtm.total_tokens() as usize);
        let mut doc_offsets = Vec::with_capacity(n_docs + 1);
        doc_offsets.push(0);

        let mut rng = seeded_rng(seed, u64::MAX);
        for d in 0..n_docs {
            for (w, count) in dtm.row(d) {
                for _ in 0..count {
                    let z = rng.gen_range(0..n_topics) as u32;
                    tokens.push(TokenRecord {
                        w: w as u32,
                        d: d as u32,
                        z_old: z,
                        z_new: z,
                    });
                }
            }
            doc_offsets.push(tokens.len());
        }

        let (by_word, word_offsets) = build_word_index(&tokens, n_words);

        TokenStore {
            tokens,
            doc_offsets,
            by_word,
            word_offsets,
            n_docs,
            n_words,
            n_topics,
        }
    }

    /// Total number of tokens, `T`.
    pub fn n_tokens(&self) -> usize {
        self.tokens.len()
    }

    /// Number of documents, `D`.
    pub fn n_docs(&self) -> usize {
        self.n_docs
    }

    /// Vocabulary size, `V`.
    pub fn n_words(&self) -> usize {
        self.n_words
    }

    /// Number of topics, `K`.
    pub fn n_topics(&self) -> usize {
        self.n_topics
    }

    /// Tokens of document `d`, in no particular order within the document.
    pub fn iter_by_doc(&self, d: usize) -> &[TokenRecord] {
        &self.tokens[self.doc_offsets[d]..self.doc_offsets[d + 1]]
    }

    /// Global token indices belonging to document `d` — needed by the
    /// doc-proposal's "pick the topic of a uniformly chosen existing
    /// token in `d`" trick, which must address the token record, not just
    /// read its topic.
    pub fn doc_token_range(&self, d: usize) -> std::ops::Range<usize> {
        self.doc_offsets[d]..self.doc_offsets[d + 1]
    }

    /// Global token indices belonging to word `w`, in word-sweep order.
    pub fn word_token_indices(&self, w: usize) -> &[usize] {
        &self.by_word[self.word_offsets[w]..self.word_offsets[w + 1]]
    }

    /// Current topic assignment (`z_new`) of global token `t`.
    pub fn get_z(&self, t: usize) -> usize {
        self.tokens[t].z_new as usize
    }

    /// Read a token record by global index.
    pub fn token(&self, t: usize) -> &TokenRecord {
        &self.tokens[t]
    }

    /// Move `t`'s canonical topic to `k` without touching `z_old`, i.e.
    /// without telling the caller that `n_wk`/`n_k` now reflect `k` for
    /// this token. Used by the doc sweep (which only ever touches `n_dk`)
    /// and by an inference-mode word sweep (which must not perturb a
    /// fitted model's word counts).
    pub fn advance(&mut self, t: usize, k: usize) {
        self.tokens[t].z_new = k as u32;
    }

    /// Move `t`'s topic to `k` and mark it reflected in the word-side
    /// count tables: `z_old <- k`, `z_new <- k`. Used by a fit-mode word
    /// sweep once it has folded `k` into `n_wk`/`n_k`.
    pub fn commit(&mut self, t: usize, k: usize) {
        let tok = &mut self.tokens[t];
        tok.z_old = k as u32;
        tok.z_new = k as u32;
    }

    /// Document length (token count) of document `d`.
    pub fn doc_len(&self, d: usize) -> usize {
        self.doc_offsets[d + 1] - self.doc_offsets[d]
    }

    /// Occurrence count of word `w` across the whole corpus.
    pub fn word_count(&self, w: usize) -> usize {
        self.word_offsets[w + 1] - self.word_offsets[w]
    }
}

fn build_word_index(tokens: &[TokenRecord], n_words: usize) -> (Vec<usize>, Vec<usize>) {
    let mut counts = vec![0usize; n_words + 1];
    for tok in tokens {
        counts[tok.w as usize + 1] += 1;
    }
    for i in 1..counts.len() {
        counts[i] += counts[i - 1];
    }
    let word_offsets = counts.clone();

    let mut cursor = counts;
    let mut by_word = vec![0usize; tokens.len()];
    for (idx, tok) in tokens.iter().enumerate() {
        let w = tok.w as usize;
        by_word[cursor[w]] = idx;
        cursor[w] += 1;
    }
    (by_word, word_offsets)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_dtm() -> CsrMatrix {
        CsrMatrix::from_rows(
            vec![vec![(0, 2), (1, 1)], vec![(1, 1), (2, 2)]],
            3,
            vec!["d0".into(), "d1".into()],
            Some(vec!["a".into(), "b".into(), "c".into()]),
        )
        .unwrap()
    }

    #[test]
    fn test_token_count_matches_cell_sum() {
        let dtm = tiny_dtm();
        let store = TokenStore::build(&dtm, 2, 1);
        assert_eq!(store.n_tokens(), 6);
    }

    #[test]
    fn test_by_doc_and_by_word_cover_same_tokens() {
        let dtm = tiny_dtm();
        let store = TokenStore::build(&dtm, 2, 1);

        let mut from_doc: Vec<u32> = (0..store.n_docs())
            .flat_map(|d| store.iter_by_doc(d).iter().map(|t| t.w))
            .collect();
        let mut from_word: Vec<u32> = (0..store.n_words())
            .flat_map(|w| {
                store
                    .word_token_indices(w)
                    .iter()
                    .map(|&t| store.token(t).w)
            })
            .collect();
        from_doc.sort();
        from_word.sort();
        assert_eq!(from_doc, from_word);
    }

    #[test]
    fn test_commit_visible_through_word_view() {
        let dtm = tiny_dtm();
        let mut store = TokenStore::build(&dtm, 2, 1);
        let range = store.doc_token_range(0);
        let t = range.start;
        let w = store.token(t).w as usize;
        store.commit(t, 1);
        assert!(store
            .word_token_indices(w)
            .iter()
            .any(|&idx| idx == t && store.get_z(idx) == 1));
        assert_eq!(store.token(t).z_old, 1);
    }

    #[test]
    fn test_advance_leaves_z_old_behind() {
        let dtm = tiny_dtm();
        let mut store = TokenStore::build(&dtm, 2, 1);
        let t = 0;
        let before = store.token(t).z_old;
        store.advance(t, (before as usize + 1) % 2);
        assert_eq!(store.token(t).z_old, before);
        assert_eq!(store.get_z(t), (before as usize + 1) % 2);
    }

    #[test]
    fn test_doc_len_and_word_count() {
        let dtm = tiny_dtm();
        let store = TokenStore::build(&dtm, 2, 1);
        assert_eq!(store.doc_len(0), 3);
        assert_eq!(store.doc_len(1), 3);
        assert_eq!(store.word_count(1), 2);
    }
}
